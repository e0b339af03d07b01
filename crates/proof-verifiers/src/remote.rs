// Copyright 2022 Webb Technologies Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::time::Duration;

use bridge_relayer_types::RpcUrl;
use bridge_relayer_utils::Result;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    commitment: &'a str,
    nullifier: &'a str,
    proof: &'a str,
}

/// A verifier service reached with `POST <base>/verify`.
#[derive(Clone)]
pub struct RemoteProofVerifier {
    client: reqwest::Client,
    endpoint: url::Url,
}

impl std::fmt::Debug for RemoteProofVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteProofVerifier")
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

impl RemoteProofVerifier {
    /// Creates a new `RemoteProofVerifier` for the service at `base`.
    pub fn new(base: &RpcUrl, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: base.endpoint("verify")?,
        })
    }

    /// Reads the verdict out of a verifier answer.
    ///
    /// A boolean `valid` field is authoritative, otherwise `ok: true` counts
    /// as a pass. Anything else is a rejection.
    fn verdict(body: &serde_json::Value) -> bool {
        match body.get("valid") {
            Some(serde_json::Value::Bool(valid)) => *valid,
            _ => body.get("ok") == Some(&serde_json::Value::Bool(true)),
        }
    }
}

#[async_trait::async_trait]
impl super::ProofVerifier for RemoteProofVerifier {
    #[tracing::instrument(skip(self, commitment, proof), fields(endpoint = %self.endpoint))]
    async fn verify(
        &self,
        commitment: &str,
        nullifier: &str,
        proof: &str,
    ) -> bool {
        let request = VerifyRequest {
            commitment,
            nullifier,
            proof,
        };
        let response =
            match self.client.post(self.endpoint.clone()).json(&request).send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(error = %e, "Verifier call failed, rejecting proof");
                    return false;
                }
            };
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, "Verifier answered with an error, rejecting proof");
            return false;
        }
        match response.json::<serde_json::Value>().await {
            Ok(body) => Self::verdict(&body),
            Err(e) => {
                tracing::warn!(error = %e, "Verifier answer is not JSON, rejecting proof");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};

    use crate::ProofVerifier;

    use super::*;

    async fn serve(app: Router) -> SocketAddr {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = axum::Server::from_tcp(listener)
            .unwrap()
            .serve(app.into_make_service());
        tokio::spawn(server);
        addr
    }

    fn verifier(addr: SocketAddr) -> RemoteProofVerifier {
        let url: RpcUrl = url::Url::parse(&format!("http://{addr}/"))
            .unwrap()
            .into();
        RemoteProofVerifier::new(&url, Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn valid_field_wins_over_ok() {
        use serde_json::json;
        assert!(RemoteProofVerifier::verdict(&json!({ "valid": true })));
        assert!(!RemoteProofVerifier::verdict(&json!({ "valid": false, "ok": true })));
        assert!(RemoteProofVerifier::verdict(&json!({ "ok": true })));
        assert!(!RemoteProofVerifier::verdict(&json!({ "ok": "yes" })));
        assert!(!RemoteProofVerifier::verdict(&json!({})));
        assert!(!RemoteProofVerifier::verdict(&json!([true])));
    }

    #[tokio::test]
    async fn sends_the_proof_and_reads_the_verdict() {
        let app = Router::new().route(
            "/verify",
            post(|Json(body): Json<serde_json::Value>| async move {
                let valid = body["proof"] == "0x01"
                    && body["commitment"] == "0xaa"
                    && body["nullifier"] == "0xbb";
                Json(serde_json::json!({ "valid": valid }))
            }),
        );
        let v = verifier(serve(app).await);
        assert!(v.verify("0xaa", "0xbb", "0x01").await);
        assert!(!v.verify("0xaa", "0xbb", "0x02").await);
        assert!(v.is_production_grade());
    }

    #[tokio::test]
    async fn ok_fallback_is_accepted() {
        let app = Router::new().route(
            "/verify",
            post(|| async { Json(serde_json::json!({ "ok": true })) }),
        );
        let v = verifier(serve(app).await);
        assert!(v.verify("0xaa", "0xbb", "0x01").await);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn server_error_is_a_rejection() {
        let app = Router::new().route(
            "/verify",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "valid": true })),
                )
            }),
        );
        let v = verifier(serve(app).await);
        assert!(!v.verify("0xaa", "0xbb", "0x01").await);
        assert!(logs_contain("rejecting proof"));
    }

    #[tokio::test]
    async fn garbage_body_is_a_rejection() {
        let app = Router::new()
            .route("/verify", post(|| async { "definitely not json" }));
        let v = verifier(serve(app).await);
        assert!(!v.verify("0xaa", "0xbb", "0x01").await);
    }

    #[tokio::test]
    async fn unreachable_verifier_is_a_rejection() {
        // bind then drop, so nothing listens there.
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let v = verifier(addr);
        assert!(!v.verify("0xaa", "0xbb", "0x01").await);
    }
}
