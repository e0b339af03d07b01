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

//! Runs the relayer against the simulated chain and destination, pushes one
//! mock bridge transfer and reports what happened to it.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use bridge_relayer_config::cli::{load_config, setup_logger};
use bridge_relayer_config::BridgeRelayerConfig;
use bridge_relayer_context::RelayerContext;
use bridge_relayer_store::JsonFileStore;
use bridge_tx_extractor::{mock_bridge_tx, MockBridgeTx};
use structopt::StructOpt;

/// Bridge Relayer Simulation
///
/// $ sim-run -vv
#[derive(Debug, StructOpt)]
#[structopt(name = "Bridge Relayer Simulation")]
struct SimOpts {
    /// A level of verbosity, and can be used multiple times
    #[structopt(short, long, parse(from_occurrences))]
    verbose: i32,
    /// Directory that contains configration files, defaults are used
    /// when omitted.
    #[structopt(
        short = "c",
        long = "config-dir",
        value_name = "PATH",
        parse(from_os_str)
    )]
    config_dir: Option<PathBuf>,
    /// How long to wait for the mock transfer to be relayed, in seconds.
    #[structopt(long, default_value = "3")]
    wait: u64,
}

#[paw::main]
#[tokio::main]
async fn main(args: SimOpts) -> anyhow::Result<()> {
    setup_logger(args.verbose.max(2), "sim_run")?;
    if dotenv::dotenv().is_ok() {
        tracing::trace!("Loaded .env file");
    }

    let mut config = match &args.config_dir {
        Some(dir) => load_config(Some(dir))?,
        None => BridgeRelayerConfig::default(),
    };
    config.relayer.polling_interval = 500;
    config.relayer.use_real_clients = false;
    config.source.min_confirmations = 0;

    let store = JsonFileStore::temporary()?;
    let ctx = RelayerContext::new(config, store)?;
    let handle = ctx.spawn_relayer(false)?;
    let mut events = handle.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!("Unprintable event: {}", e),
            }
        }
    });

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before the epoch")?
        .as_millis();
    let mock = MockBridgeTx::builder()
        .txid(format!("bridge_tx_{now}"))
        .commitment(format!("0x{}", "aa".repeat(16)))
        .nullifier(format!("0x{}", "bb".repeat(16)))
        .proof(format!("0x{}", "00".repeat(64)))
        .amount(123_456.0)
        .recipient("miden1qmockrecipient")
        .build();
    let keys = ctx.envelope_keys()?;
    let tx = mock_bridge_tx(&mock, &ctx.config.source.marker_tag, &keys.symmetric)?;
    let block = ctx.simulated_chain().push_block(vec![tx]);
    tracing::info!(
        height = block.height,
        txid = %mock.txid,
        "Pushed mock bridge transaction"
    );

    let relayed = tokio::time::timeout(
        Duration::from_secs(args.wait),
        handle.wait_for_checkpoint(|cp| cp.is_spent(&mock.nullifier)),
    )
    .await;
    let outcome = match relayed {
        Ok(Ok(checkpoint)) => {
            tracing::info!(
                last_processed_block = checkpoint.last_processed_height,
                "Mock transfer relayed"
            );
            Ok(())
        }
        Ok(Err(e)) => Err(anyhow::anyhow!("relayer stopped early: {e}")),
        Err(_) => Err(anyhow::anyhow!(
            "mock transfer not relayed within {}s",
            args.wait
        )),
    };

    for call in ctx.mocked_submitter().calls() {
        tracing::info!(
            nullifier = %call.nullifier,
            amount = call.amount,
            recipient = ?call.recipient,
            "Destination received"
        );
    }
    handle.stop().await?;
    printer.abort();
    outcome
}
