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

use bridge_relayer_types::{
    RpcUrl, SecretString, SubmissionPayload, SubmissionReceipt,
};
use bridge_relayer_utils::{Error, Result};
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitRequest<'a> {
    bridge_program_id: &'a str,
    payload: &'a SubmissionPayload,
}

/// Submits bridge events to a destination node over HTTP.
#[derive(Clone)]
pub struct HttpSubmitter {
    client: reqwest::Client,
    endpoint: url::Url,
    bridge_program_id: String,
    api_key: Option<SecretString>,
}

impl std::fmt::Debug for HttpSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSubmitter")
            .field("endpoint", &self.endpoint.as_str())
            .field("bridge_program_id", &self.bridge_program_id)
            .finish()
    }
}

impl HttpSubmitter {
    /// Creates a new `HttpSubmitter` for the node at `node_url`.
    pub fn new(
        node_url: &RpcUrl,
        bridge_program_id: impl Into<String>,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: node_url.endpoint("bridge/submit")?,
            bridge_program_id: bridge_program_id.into(),
            api_key,
        })
    }
}

#[async_trait::async_trait]
impl super::DestinationSubmitter for HttpSubmitter {
    #[tracing::instrument(
        skip_all,
        fields(endpoint = %self.endpoint, nullifier = %payload.nullifier)
    )]
    async fn submit(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionReceipt> {
        let body = SubmitRequest {
            bridge_program_id: &self.bridge_program_id,
            payload,
        };
        let mut request = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose());
        }
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(Error::Submission {
                status: status.as_u16(),
                body: text,
            });
        }
        let receipt = serde_json::from_str(&text).unwrap_or_else(|_| {
            tracing::debug!("Destination answer is not JSON");
            serde_json::json!({ "ok": true, "status": status.as_u16() })
        });
        Ok(SubmissionReceipt(receipt))
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use parking_lot::Mutex;

    use crate::DestinationSubmitter;

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

    fn submitter(addr: SocketAddr, api_key: Option<&str>) -> HttpSubmitter {
        let url: RpcUrl = url::Url::parse(&format!("http://{addr}"))
            .unwrap()
            .into();
        HttpSubmitter::new(
            &url,
            "bridge-program",
            api_key.map(SecretString::from),
            Duration::from_secs(2),
        )
        .unwrap()
    }

    fn payload() -> SubmissionPayload {
        SubmissionPayload {
            commitment: "0xaa".into(),
            nullifier: "0xbb".into(),
            proof: "0x01".into(),
            amount: 42.0,
            recipient: Some("R".into()),
        }
    }

    type Seen = Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>;

    #[tokio::test]
    async fn posts_the_wrapped_payload_with_bearer_key() {
        let seen: Seen = Default::default();
        let app = Router::new()
            .route(
                "/bridge/submit",
                post(
                    |State(seen): State<Seen>,
                     headers: HeaderMap,
                     Json(body): Json<serde_json::Value>| async move {
                        let auth = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_owned);
                        seen.lock().push((auth, body));
                        Json(serde_json::json!({ "success": true, "txid": "dest-1" }))
                    },
                ),
            )
            .with_state(seen.clone());
        let s = submitter(serve(app).await, Some("secret-key"));

        let receipt = s.submit(&payload()).await.unwrap();
        assert_eq!(receipt.txid(), Some("dest-1"));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        let (auth, body) = &seen[0];
        assert_eq!(auth.as_deref(), Some("Bearer secret-key"));
        assert_eq!(body["bridgeProgramId"], "bridge-program");
        assert_eq!(body["payload"]["nullifier"], "0xbb");
        assert_eq!(body["payload"]["amount"], 42.0);
        assert_eq!(body["payload"]["recipient"], "R");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error_with_the_body() {
        let app = Router::new().route(
            "/bridge/submit",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "node syncing") }),
        );
        let s = submitter(serve(app).await, None);
        let err = s.submit(&payload()).await.unwrap_err();
        match err {
            Error::Submission { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "node syncing");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_success_still_counts() {
        let app = Router::new()
            .route("/bridge/submit", post(|| async { "accepted" }));
        let s = submitter(serve(app).await, None);
        let receipt = s.submit(&payload()).await.unwrap();
        assert_eq!(
            receipt.0,
            serde_json::json!({ "ok": true, "status": 200 })
        );
    }

    #[tokio::test]
    async fn unreachable_node_is_an_error() {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let err = submitter(addr, None).submit(&payload()).await.unwrap_err();
        assert!(matches!(err, Error::Reqwest(_)));
    }
}
