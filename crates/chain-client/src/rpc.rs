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

use bridge_relayer_types::{Block, RpcUrl, SecretString};
use bridge_relayer_utils::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// `getblockhash` answers with this code for heights past the tip.
const RPC_INVALID_PARAMETER: i64 = -8;

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: &'static str,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: serde_json::Value,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

impl RpcResponse {
    fn into_result<T: DeserializeOwned>(self, method: &str) -> Result<T> {
        if let Some(error) = self.error {
            return Err(Error::ChainRpc {
                method: method.to_owned(),
                message: format!("{} (code {})", error.message, error.code),
            });
        }
        serde_json::from_value(self.result).map_err(|e| Error::ChainRpc {
            method: method.to_owned(),
            message: format!("unexpected result: {e}"),
        })
    }
}

/// A client for a `zcashd`-style JSON-RPC 1.0 node.
#[derive(Clone)]
pub struct JsonRpcChainClient {
    client: reqwest::Client,
    url: RpcUrl,
    credentials: Option<(String, SecretString)>,
}

impl std::fmt::Debug for JsonRpcChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcChainClient")
            .field("url", &self.url)
            .field("user", &self.credentials.as_ref().map(|(u, _)| u))
            .finish()
    }
}

impl JsonRpcChainClient {
    /// Creates a new client. Basic auth is used when `user` is given.
    pub fn new(
        url: RpcUrl,
        user: Option<String>,
        password: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let credentials =
            user.map(|u| (u, password.unwrap_or_else(|| SecretString::from(""))));
        Ok(Self {
            client,
            url,
            credentials,
        })
    }

    async fn request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<RpcResponse> {
        let request = RpcRequest {
            jsonrpc: "1.0",
            id: "bridge-relayer",
            method,
            params,
        };
        let mut builder =
            self.client.post(self.url.as_url().clone()).json(&request);
        if let Some((user, password)) = &self.credentials {
            builder = builder.basic_auth(user, Some(password.expose()));
        }
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        // nodes answer RPC errors with a non-2xx status and a JSON body.
        serde_json::from_str(&text).map_err(|_| Error::ChainRpc {
            method: method.to_owned(),
            message: format!("HTTP {status}: {text}"),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        self.request(method, params).await?.into_result(method)
    }
}

#[async_trait::async_trait]
impl super::SourceChainClient for JsonRpcChainClient {
    #[tracing::instrument(skip(self))]
    async fn current_height(&self) -> Result<u64> {
        self.call("getblockcount", serde_json::json!([])).await
    }

    #[tracing::instrument(skip(self))]
    async fn block_at(&self, height: u64) -> Result<Block> {
        let response = self
            .request("getblockhash", serde_json::json!([height]))
            .await?;
        if matches!(&response.error, Some(e) if e.code == RPC_INVALID_PARAMETER)
        {
            return Err(Error::BlockNotFound(height));
        }
        let hash: String = response.into_result("getblockhash")?;
        let mut block: Block =
            self.call("getblock", serde_json::json!([hash, 2])).await?;
        if block.height != height {
            tracing::warn!(
                expected = height,
                got = block.height,
                "Node returned a block at another height"
            );
            return Err(Error::BlockNotFound(height));
        }
        block.hash.get_or_insert(hash);
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use crate::SourceChainClient;

    use super::*;

    async fn node(
        headers: HeaderMap,
        Json(req): Json<Value>,
    ) -> axum::response::Response {
        if headers.get("authorization").and_then(|v| v.to_str().ok())
            != Some("Basic dXNlcjpwYXNz")
        {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        assert_eq!(req["jsonrpc"], "1.0");
        let params = req["params"].clone();
        match req["method"].as_str() {
            Some("getblockcount") => {
                Json(json!({ "result": 2, "error": null, "id": req["id"] }))
                    .into_response()
            }
            Some("getblockhash") => match params[0].as_u64() {
                Some(h @ 1..=2) => Json(json!({ "result": format!("hash{h}"), "error": null }))
                    .into_response(),
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "result": null,
                        "error": { "code": RPC_INVALID_PARAMETER, "message": "Block height out of range" }
                    })),
                )
                    .into_response(),
            },
            Some("getblock") => {
                assert_eq!(params[1], 2);
                let height = if params[0] == "hash1" { 1 } else { 2 };
                Json(json!({
                    "result": {
                        "hash": params[0],
                        "height": height,
                        "tx": [{ "txid": "aa", "vout": [{ "n": 0, "scriptPubKey": { "asm": "OP_RETURN 00" } }] }]
                    },
                    "error": null
                }))
                .into_response()
            }
            _ => Json(json!({ "result": null, "error": { "code": -32601, "message": "Method not found" } }))
                .into_response(),
        }
    }

    async fn serve() -> SocketAddr {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/", post(node));
        let server = axum::Server::from_tcp(listener)
            .unwrap()
            .serve(app.into_make_service());
        tokio::spawn(server);
        addr
    }

    fn client(addr: SocketAddr, password: &str) -> JsonRpcChainClient {
        let url: RpcUrl = url::Url::parse(&format!("http://{addr}/"))
            .unwrap()
            .into();
        JsonRpcChainClient::new(
            url,
            Some("user".into()),
            Some(password.into()),
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn reads_tip_and_blocks() {
        let c = client(serve().await, "pass");
        assert_eq!(c.current_height().await.unwrap(), 2);
        let block = c.block_at(1).await.unwrap();
        assert_eq!(block.height, 1);
        assert_eq!(block.hash.as_deref(), Some("hash1"));
        assert_eq!(block.tx[0].txid, "aa");
        assert_eq!(block.tx[0].vout[0].asm(), Some("OP_RETURN 00"));
    }

    #[tokio::test]
    async fn height_past_tip_is_block_not_found() {
        let c = client(serve().await, "pass");
        let err = c.block_at(3).await.unwrap_err();
        assert!(matches!(err, Error::BlockNotFound(3)));
    }

    #[tokio::test]
    async fn bad_credentials_is_an_rpc_error() {
        let c = client(serve().await, "wrong");
        let err = c.current_height().await.unwrap_err();
        assert!(matches!(err, Error::ChainRpc { ref method, .. } if method == "getblockcount"));
        assert!(err.is_transient());
    }
}
