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

//! Relays bridge transfers end to end, with the real clients talking to fake
//! nodes over HTTP.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use bridge_envelope::{EnvelopeKey, RecipientSecret};
use bridge_relay_engine::RelayerHandle;
use bridge_relayer_config::BridgeRelayerConfig;
use bridge_relayer_context::RelayerContext;
use bridge_relayer_store::{Checkpoint, JsonFileStore};
use bridge_relayer_tests::utils::{
    bridge_tx, bridge_tx_from, malformed_bridge_tx, Network, TEST_AMOUNT,
    TEST_RECIPIENT,
};
use bridge_relayer_types::SecretString;
use bridge_tx_extractor::{mock_bridge_tx, MarkerTag, MockBridgeTx};
use serde_json::{json, Value};

const N1: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
const N2: &str = "0xcccccccccccccccccccccccccccccccc";

struct Setup {
    network: Network,
    dir: tempfile::TempDir,
}

impl Setup {
    async fn new() -> Self {
        Self {
            network: Network::spawn().await,
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn checkpoint_file(&self) -> PathBuf {
        self.dir.path().join("relayer_state.json")
    }

    fn config(&self) -> BridgeRelayerConfig {
        self.network.config(&self.checkpoint_file())
    }

    fn spawn(&self, config: BridgeRelayerConfig) -> RelayerHandle {
        let store = JsonFileStore::open(self.checkpoint_file());
        let ctx = RelayerContext::new(config, store).unwrap();
        ctx.spawn_relayer(true).unwrap()
    }
}

async fn processed(handle: &RelayerHandle, height: u64) -> Checkpoint {
    tokio::time::timeout(
        Duration::from_secs(10),
        handle.wait_for_checkpoint(|cp| cp.last_processed_height >= height),
    )
    .await
    .expect("relayer did not reach the height in time")
    .unwrap()
}

fn state_file(path: &Path) -> Value {
    let raw = std::fs::read_to_string(path).unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[tokio::test]
#[tracing_test::traced_test]
async fn relays_a_bridge_transfer() {
    let s = Setup::new().await;
    s.network.node.push_block(vec![bridge_tx(N1)]);
    s.network.node.push_empty_blocks(1);

    let handle = s.spawn(s.config());
    let checkpoint = processed(&handle, 1).await;
    assert!(checkpoint.is_spent(N1));
    handle.stop().await.unwrap();

    let submissions = s.network.destination.submissions();
    assert_eq!(submissions.len(), 1);
    let body = &submissions[0];
    assert_eq!(body["bridgeProgramId"], "bridge");
    assert_eq!(body["payload"]["nullifier"], N1);
    assert_eq!(body["payload"]["amount"], TEST_AMOUNT);
    assert_eq!(body["payload"]["recipient"], TEST_RECIPIENT);

    // the tip block has no confirmation yet.
    assert_eq!(
        state_file(&s.checkpoint_file()),
        json!({ "lastProcessedBlock": 1, "nullifiers": [N1] })
    );
}

#[tokio::test]
async fn replayed_nullifier_is_relayed_once() {
    let s = Setup::new().await;
    s.network.node.push_block(vec![bridge_tx(N1)]);
    s.network.node.push_block(vec![bridge_tx(N1), bridge_tx(N2)]);
    s.network.node.push_empty_blocks(1);

    let handle = s.spawn(s.config());
    let checkpoint = processed(&handle, 2).await;
    handle.stop().await.unwrap();

    let nullifiers: Vec<_> = s
        .network
        .destination
        .submissions()
        .iter()
        .map(|b| b["payload"]["nullifier"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(nullifiers, [N1, N2]);
    assert_eq!(checkpoint.nullifiers.len(), 2);
}

#[tokio::test]
async fn malformed_transactions_are_skipped() {
    let s = Setup::new().await;
    s.network
        .node
        .push_block(vec![malformed_bridge_tx(), bridge_tx(N1)]);
    s.network.node.push_empty_blocks(1);

    let handle = s.spawn(s.config());
    let checkpoint = processed(&handle, 1).await;
    handle.stop().await.unwrap();

    assert_eq!(s.network.destination.submissions().len(), 1);
    assert!(checkpoint.is_spent(N1));
}

#[tokio::test]
async fn rejected_proofs_are_not_relayed() {
    let s = Setup::new().await;
    s.network.verifier.reject(N1);
    s.network.node.push_block(vec![bridge_tx(N1), bridge_tx(N2)]);
    s.network.node.push_empty_blocks(1);

    let handle = s.spawn(s.config());
    let checkpoint = processed(&handle, 1).await;
    handle.stop().await.unwrap();

    let submissions = s.network.destination.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0]["payload"]["nullifier"], N2);
    assert!(!checkpoint.is_spent(N1));
}

#[tokio::test]
async fn unreachable_verifier_fails_closed() {
    let s = Setup::new().await;
    s.network.verifier.set_down(true);
    s.network.node.push_block(vec![bridge_tx(N1)]);
    s.network.node.push_empty_blocks(1);

    let handle = s.spawn(s.config());
    let checkpoint = processed(&handle, 1).await;
    handle.stop().await.unwrap();

    assert_eq!(s.network.destination.attempts(), 0);
    assert!(checkpoint.nullifiers.is_empty());
}

#[tokio::test]
async fn failed_submission_leaves_the_nullifier_unspent() {
    let s = Setup::new().await;
    s.network.destination.set_failing(true);
    s.network.node.push_block(vec![bridge_tx(N1)]);
    s.network.node.push_empty_blocks(1);

    let handle = s.spawn(s.config());
    let checkpoint = processed(&handle, 1).await;
    assert_eq!(s.network.destination.attempts(), 1);
    assert!(!checkpoint.is_spent(N1));

    // a later transfer of the same nullifier goes through.
    s.network.destination.set_failing(false);
    s.network.node.push_block(vec![bridge_tx(N1)]);
    s.network.node.push_empty_blocks(1);
    let checkpoint = processed(&handle, 3).await;
    handle.stop().await.unwrap();

    assert!(checkpoint.is_spent(N1));
    assert_eq!(s.network.destination.submissions().len(), 1);
}

#[tokio::test]
async fn waits_for_confirmations() {
    let s = Setup::new().await;
    let mut config = s.config();
    config.source.min_confirmations = 3;
    s.network.node.push_block(vec![bridge_tx(N1)]);
    s.network.node.push_empty_blocks(2);

    let handle = s.spawn(config);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(handle.checkpoint().last_processed_height, 0);
    assert_eq!(s.network.destination.attempts(), 0);

    s.network.node.push_empty_blocks(1);
    let checkpoint = processed(&handle, 1).await;
    handle.stop().await.unwrap();

    assert!(checkpoint.is_spent(N1));
    assert_eq!(checkpoint.last_processed_height, 1);
}

#[tokio::test]
async fn resumes_from_the_checkpoint_file() {
    let s = Setup::new().await;
    s.network.node.push_block(vec![bridge_tx(N1)]);
    s.network.node.push_empty_blocks(1);

    let handle = s.spawn(s.config());
    processed(&handle, 1).await;
    handle.stop().await.unwrap();

    s.network.node.push_block(vec![bridge_tx(N1), bridge_tx(N2)]);
    s.network.node.push_empty_blocks(1);

    let handle = s.spawn(s.config());
    let checkpoint = processed(&handle, 3).await;
    handle.stop().await.unwrap();

    assert_eq!(s.network.destination.submissions().len(), 2);
    assert!(checkpoint.is_spent(N1) && checkpoint.is_spent(N2));
    assert_eq!(
        state_file(&s.checkpoint_file())["lastProcessedBlock"],
        json!(3)
    );
}

#[tokio::test]
async fn opens_envelopes_sealed_for_the_relayer_key() {
    let s = Setup::new().await;
    let secret_hex = "11".repeat(32);
    let secret = RecipientSecret::from_hex(&secret_hex).unwrap();
    let mut config = s.config();
    config.envelope.private_key = Some(SecretString::from(secret_hex));

    let mock = MockBridgeTx::builder()
        .commitment("0xaa")
        .nullifier(N1)
        .proof("0x01")
        .amount(7.5)
        .recipient(secret.public_key_hex())
        .build();
    s.network.node.push_block(vec![bridge_tx_from(&mock)]);
    s.network.node.push_empty_blocks(1);

    let handle = s.spawn(config);
    let checkpoint = processed(&handle, 1).await;
    handle.stop().await.unwrap();

    assert!(checkpoint.is_spent(N1));
    let submissions = s.network.destination.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0]["payload"]["amount"], 7.5);
    assert_eq!(
        submissions[0]["payload"]["recipient"],
        secret.public_key_hex()
    );
}

#[tokio::test]
async fn envelope_sealed_with_another_key_is_malformed() {
    let s = Setup::new().await;
    let mock = MockBridgeTx::builder()
        .commitment("0xaa")
        .nullifier(N1)
        .proof("0x01")
        .amount(TEST_AMOUNT)
        .recipient(TEST_RECIPIENT)
        .build();
    let tx = mock_bridge_tx(
        &mock,
        &MarkerTag::default(),
        &EnvelopeKey::from_secret("not the relayer key"),
    )
    .unwrap();
    s.network.node.push_block(vec![tx]);
    s.network.node.push_empty_blocks(1);

    let handle = s.spawn(s.config());
    let checkpoint = processed(&handle, 1).await;
    handle.stop().await.unwrap();

    assert_eq!(s.network.destination.attempts(), 0);
    assert!(checkpoint.nullifiers.is_empty());
}
