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

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use bridge_envelope::EnvelopeKey;
use bridge_relayer_config::BridgeRelayerConfig;
use bridge_relayer_context::RelayerContext;
use bridge_relayer_handlers::RelayerController;
use bridge_relayer_store::CheckpointStore;
use bridge_relayer_types::{Block, RpcUrl, SecretString, SourceTransaction, TxOutput};
use bridge_tx_extractor::{mock_bridge_tx, MarkerTag, MockBridgeTx};
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

/// The API key the test relayers are configured with.
pub const TEST_API_KEY: &str = "test-api-key";
/// Amount sealed in every transfer built by [`bridge_tx`].
pub const TEST_AMOUNT: f64 = 123_456.0;
/// Recipient sealed in every transfer built by [`bridge_tx`].
pub const TEST_RECIPIENT: &str = "miden1qmockrecipient";

/// Serves `app` on a random local port.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")
        .expect("failed to bind a local port");
    let addr = listener.local_addr().expect("no local addr");
    let server = axum::Server::from_tcp(listener)
        .expect("failed to serve on the listener")
        .serve(app.into_make_service());
    tokio::spawn(server);
    addr
}

/// The base url of a local server.
pub fn local_url(addr: SocketAddr) -> RpcUrl {
    url::Url::parse(&format!("http://{addr}"))
        .expect("valid url")
        .into()
}

type Blocks = Arc<RwLock<Vec<Block>>>;

/// A `zcashd` look-alike answering `getblockcount`, `getblockhash` and
/// `getblock` over JSON-RPC.
#[derive(Debug, Clone)]
pub struct FakeZcashNode {
    blocks: Blocks,
    addr: SocketAddr,
}

impl FakeZcashNode {
    /// Starts a node with an empty chain.
    pub async fn spawn() -> Self {
        let blocks = Blocks::default();
        let app = Router::new()
            .route("/", post(handle_rpc))
            .with_state(blocks.clone());
        let addr = serve(app).await;
        Self { blocks, addr }
    }

    /// The RPC url of this node.
    pub fn url(&self) -> RpcUrl {
        local_url(self.addr)
    }

    /// Mines a block holding `txs` and returns its height.
    pub fn push_block(&self, txs: Vec<SourceTransaction>) -> u64 {
        let mut blocks = self.blocks.write();
        let height = blocks.len() as u64 + 1;
        blocks.push(Block {
            height,
            hash: Some(format!("{height:064x}")),
            tx: txs,
        });
        height
    }

    /// Mines `n` empty blocks.
    pub fn push_empty_blocks(&self, n: usize) {
        for _ in 0..n {
            self.push_block(Vec::new());
        }
    }
}

async fn handle_rpc(
    State(blocks): State<Blocks>,
    Json(request): Json<Value>,
) -> Response {
    let (status, body) = answer_rpc(&blocks, &request);
    (status, Json(body)).into_response()
}

fn answer_rpc(blocks: &Blocks, request: &Value) -> (StatusCode, Value) {
    let id = request["id"].clone();
    let ok = |result: Value| {
        (
            StatusCode::OK,
            json!({ "result": result, "error": null, "id": id }),
        )
    };
    let err = |code: i64, message: &str| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({
                "result": null,
                "error": { "code": code, "message": message },
                "id": id,
            }),
        )
    };
    let params = &request["params"];
    let blocks = blocks.read();
    match request["method"].as_str().unwrap_or_default() {
        "getblockcount" => ok(json!(blocks.len())),
        "getblockhash" => {
            let block = params[0]
                .as_u64()
                .and_then(|h| h.checked_sub(1))
                .and_then(|i| blocks.get(i as usize));
            match block {
                Some(block) => ok(json!(block.hash)),
                None => err(-8, "Block height out of range"),
            }
        }
        "getblock" => {
            let block = blocks
                .iter()
                .find(|b| b.hash.as_deref() == params[0].as_str());
            match block {
                Some(block) => ok(json!(block)),
                None => err(-5, "Block not found"),
            }
        }
        _ => err(-32601, "Method not found"),
    }
}

#[derive(Debug, Clone, Default)]
struct DestinationState {
    submissions: Arc<Mutex<Vec<Value>>>,
    attempts: Arc<Mutex<usize>>,
    failing: Arc<AtomicBool>,
}

/// A destination node accepting `POST /bridge/submit`.
#[derive(Debug, Clone)]
pub struct FakeDestination {
    state: DestinationState,
    addr: SocketAddr,
}

impl FakeDestination {
    /// Starts a destination that accepts every submission.
    pub async fn spawn() -> Self {
        let state = DestinationState::default();
        let app = Router::new()
            .route("/bridge/submit", post(handle_submit))
            .with_state(state.clone());
        let addr = serve(app).await;
        Self { state, addr }
    }

    /// The node url of this destination.
    pub fn url(&self) -> RpcUrl {
        local_url(self.addr)
    }

    /// Makes the following submissions fail with `503`.
    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }

    /// Bodies of the accepted submissions.
    pub fn submissions(&self) -> Vec<Value> {
        self.state.submissions.lock().clone()
    }

    /// Every submission received, refused ones included.
    pub fn attempts(&self) -> usize {
        *self.state.attempts.lock()
    }
}

async fn handle_submit(
    State(state): State<DestinationState>,
    Json(body): Json<Value>,
) -> Response {
    *state.attempts.lock() += 1;
    if state.failing.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, "destination is down")
            .into_response();
    }
    let n = {
        let mut submissions = state.submissions.lock();
        submissions.push(body);
        submissions.len()
    };
    Json(json!({ "success": true, "txid": format!("dest-{n}") }))
        .into_response()
}

#[derive(Debug, Clone, Default)]
struct VerifierState {
    rejected: Arc<Mutex<HashSet<String>>>,
    down: Arc<AtomicBool>,
}

/// A proof verifier service answering `POST /verify`.
///
/// Every proof is valid unless its nullifier was rejected.
#[derive(Debug, Clone)]
pub struct FakeVerifier {
    state: VerifierState,
    addr: SocketAddr,
}

impl FakeVerifier {
    /// Starts a verifier that accepts every proof.
    pub async fn spawn() -> Self {
        let state = VerifierState::default();
        let app = Router::new()
            .route("/verify", post(handle_verify))
            .with_state(state.clone());
        let addr = serve(app).await;
        Self { state, addr }
    }

    /// The base url of this verifier.
    pub fn url(&self) -> RpcUrl {
        local_url(self.addr)
    }

    /// Proofs for `nullifier` are invalid from now on.
    pub fn reject(&self, nullifier: &str) {
        self.state.rejected.lock().insert(nullifier.to_owned());
    }

    /// Makes the verifier answer `503` to everything.
    pub fn set_down(&self, down: bool) {
        self.state.down.store(down, Ordering::SeqCst);
    }
}

async fn handle_verify(
    State(state): State<VerifierState>,
    Json(body): Json<Value>,
) -> Response {
    if state.down.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    let nullifier = body["nullifier"].as_str().unwrap_or_default();
    let valid = !state.rejected.lock().contains(nullifier);
    Json(json!({ "valid": valid })).into_response()
}

/// The fake nodes a relayer with real clients talks to.
#[derive(Debug, Clone)]
pub struct Network {
    /// Source chain.
    pub node: FakeZcashNode,
    /// Destination chain.
    pub destination: FakeDestination,
    /// Proof verifier.
    pub verifier: FakeVerifier,
}

impl Network {
    /// Starts all the fake nodes.
    pub async fn spawn() -> Self {
        Self {
            node: FakeZcashNode::spawn().await,
            destination: FakeDestination::spawn().await,
            verifier: FakeVerifier::spawn().await,
        }
    }

    /// A config using the real clients against this network.
    ///
    /// The checkpoint is kept at `checkpoint_file` and the HTTP server binds
    /// a random port.
    pub fn config(&self, checkpoint_file: &Path) -> BridgeRelayerConfig {
        let mut config = BridgeRelayerConfig::default();
        config.port = 0;
        config.api_key = Some(SecretString::from(TEST_API_KEY));
        config.source.rpc_url = Some(self.node.url());
        config.source.min_confirmations = 1;
        config.destination.node_url = Some(self.destination.url());
        config.verifier.url = Some(self.verifier.url());
        config.relayer.polling_interval = 20;
        config.relayer.retry_delay = 20;
        config.relayer.checkpoint_file = Some(checkpoint_file.to_path_buf());
        config.relayer.use_real_clients = true;
        config
    }
}

/// Builds a bridge transfer sealed with the development envelope key.
pub fn bridge_tx(nullifier: &str) -> SourceTransaction {
    let mock = MockBridgeTx::builder()
        .commitment(format!("0x{}", "aa".repeat(16)))
        .nullifier(nullifier)
        .proof(format!("0x{}", "00".repeat(64)))
        .amount(TEST_AMOUNT)
        .recipient(TEST_RECIPIENT)
        .build();
    bridge_tx_from(&mock)
}

/// Builds the source transaction of `mock` with the default marker and the
/// development envelope key.
pub fn bridge_tx_from(mock: &MockBridgeTx) -> SourceTransaction {
    mock_bridge_tx(mock, &MarkerTag::default(), &EnvelopeKey::default())
        .expect("failed to build a bridge transaction")
}

/// A transaction with a marker output whose payload is not hex.
pub fn malformed_bridge_tx() -> SourceTransaction {
    SourceTransaction {
        txid: "malformed".into(),
        vout: vec![TxOutput::with_asm(format!("{} zz", MarkerTag::default()))],
    }
}

/// A relayer process: context, controller and a running HTTP server.
#[derive(Debug)]
pub struct RelayerServer {
    /// Address the control API listens on.
    pub addr: SocketAddr,
    /// The context of the relayer.
    pub ctx: RelayerContext,
    /// The owner of the relayer instance.
    pub controller: Arc<RelayerController>,
    server: JoinHandle<()>,
}

impl RelayerServer {
    /// Starts the control API for `config`, without starting the relayer.
    pub async fn start<S: CheckpointStore>(
        config: BridgeRelayerConfig,
        store: S,
    ) -> Self {
        let ctx = RelayerContext::new(config, store)
            .expect("failed to create the context");
        let controller = Arc::new(RelayerController::new(ctx.clone()));
        let (addr, server) = bridge_relayer::service::build_web_services(
            controller.clone(),
            ctx.shutdown_signal(),
        )
        .expect("failed to bind the control API");
        tracing::debug!("Test relayer listening on {}", addr);
        Self {
            addr,
            ctx,
            controller,
            server: tokio::spawn(server),
        }
    }

    /// The url of an API route, like `/status`.
    pub fn api(&self, route: &str) -> String {
        format!("http://127.0.0.1:{}/api/v1{route}", self.addr.port())
    }

    /// Stops the relayer and the server.
    pub async fn shutdown(self) {
        self.ctx.shutdown();
        self.controller
            .shutdown()
            .await
            .expect("relayer did not stop cleanly");
        self.server.await.expect("server task failed");
    }
}
