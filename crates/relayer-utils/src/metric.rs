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

use prometheus::core::{AtomicF64, GenericCounter, GenericGauge};
use prometheus::{Counter, Encoder, Gauge, Opts, Registry, TextEncoder};

/// A struct definition for collecting metrics in the relayer.
///
/// Every instance owns its own [`Registry`], so several relayers (or tests)
/// can live in the same process without clashing on metric names.
#[derive(Debug, Clone)]
pub struct Metrics {
    registry: Registry,
    /// Relay loop back off metric
    pub relay_loop_back_off: GenericCounter<AtomicF64>,
    /// Source chain blocks fully processed.
    pub blocks_processed: GenericCounter<AtomicF64>,
    /// Bridge transactions found in scanned blocks.
    pub bridge_txs_seen: GenericCounter<AtomicF64>,
    /// Bridge events successfully forwarded to the destination.
    pub events_relayed: GenericCounter<AtomicF64>,
    /// Bridge events skipped because their nullifier was already relayed.
    pub replays_rejected: GenericCounter<AtomicF64>,
    /// Bridge events whose proof did not verify.
    pub verification_rejections: GenericCounter<AtomicF64>,
    /// Submissions the destination refused after verification.
    pub submission_failures: GenericCounter<AtomicF64>,
    /// Bridge transactions with a payload that could not be decoded.
    pub malformed_txs: GenericCounter<AtomicF64>,
    /// Last source chain height the relayer durably processed.
    pub last_processed_height: GenericGauge<AtomicF64>,
}

fn counter(registry: &Registry, name: &str, help: &str) -> prometheus::Result<Counter> {
    let c = Counter::with_opts(Opts::new(name, help))?;
    registry.register(Box::new(c.clone()))?;
    Ok(c)
}

impl Metrics {
    /// Instantiates the various metrics and their counters, also creates a registry for the counters and
    /// registers the counters
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("bridge_relayer".into()), None)?;
        let relay_loop_back_off = counter(
            &registry,
            "relay_loop_back_off",
            "specifies how many times the relay loop backed off",
        )?;
        let blocks_processed = counter(
            &registry,
            "blocks_processed",
            "The total number of source chain blocks processed",
        )?;
        let bridge_txs_seen = counter(
            &registry,
            "bridge_txs_seen",
            "The total number of bridge transactions seen",
        )?;
        let events_relayed = counter(
            &registry,
            "events_relayed",
            "The total number of bridge events forwarded to the destination",
        )?;
        let replays_rejected = counter(
            &registry,
            "replays_rejected",
            "Bridge events skipped because their nullifier was already used",
        )?;
        let verification_rejections = counter(
            &registry,
            "verification_rejections",
            "Bridge events whose proof was rejected by the verifier",
        )?;
        let submission_failures = counter(
            &registry,
            "submission_failures",
            "Bridge events the destination failed to accept",
        )?;
        let malformed_txs = counter(
            &registry,
            "malformed_txs",
            "Bridge transactions with an undecodable payload or envelope",
        )?;
        let last_processed_height = Gauge::with_opts(Opts::new(
            "last_processed_height",
            "The last source chain height durably processed",
        ))?;
        registry.register(Box::new(last_processed_height.clone()))?;

        Ok(Self {
            registry,
            relay_loop_back_off,
            blocks_processed,
            bridge_txs_seen,
            events_relayed,
            replays_rejected,
            verification_rejections,
            submission_failures,
            malformed_txs,
            last_processed_height,
        })
    }

    /// Gathers the whole relayer metrics
    pub fn gather_metrics(&self) -> Result<String, GatherMetricsError> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder.encode(&metric_families, &mut buffer)?;

        Ok(String::from_utf8(buffer)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatherMetricsError {
    #[error(transparent)]
    PrometheusError(#[from] prometheus::Error),
    #[error(transparent)]
    FromUtf8Error(#[from] std::string::FromUtf8Error),
}
