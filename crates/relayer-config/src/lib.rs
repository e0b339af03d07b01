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

#![warn(missing_docs)]

//! # Relayer Configuration Module 🕸️
//!
//! A module for configuring the relayer.
//!
//! ## Overview
//!
//! Every `*.toml` and `*.json` file found under the config directory is
//! merged, then the environment (prefix `BRIDGE`) is layered on top.
//! Possible configuration include:
//! * `port`: The port the control API will listen on. Defaults to 3001
//! * `api-key`: Key required by the mutating control endpoints.
//! * `source`: How to reach the source chain and when a block is final.
//! * `destination`: Where verified bridge events are submitted.
//! * `verifier`: The remote proof verifier, if any.
//! * `envelope`: Keys used to open bridge envelopes.
//! * `relayer`: Loop timings, checkpoint location and client selection.
//!
//! Secrets may be written as `$ENV_VAR` to read them from the environment.

/// CLI configuration
#[cfg(feature = "cli")]
pub mod cli;
/// Default values of the configuration
pub mod defaults;
/// Utils for processing configuration
pub mod utils;

use std::path::PathBuf;
use std::time::Duration;

use bridge_relayer_types::{RpcUrl, SecretString};
use bridge_relayer_utils::{Error, Result};
use bridge_tx_extractor::MarkerTag;
use serde::{Deserialize, Serialize};

/// BridgeRelayerConfig is the configuration for the bridge relayer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BridgeRelayerConfig {
    /// HTTP control API port number
    ///
    /// default to 3001
    #[serde(default = "defaults::port", skip_serializing)]
    pub port: u16,
    /// API key the mutating endpoints ask for.
    ///
    /// When missing, every request is allowed.
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,
    /// Source chain configuration.
    #[serde(default)]
    pub source: SourceChainConfig,
    /// Destination node configuration.
    #[serde(default)]
    pub destination: DestinationConfig,
    /// Proof verifier configuration.
    #[serde(default)]
    pub verifier: VerifierConfig,
    /// Envelope keys.
    #[serde(default, skip_serializing)]
    pub envelope: EnvelopeConfig,
    /// Relay loop configuration.
    #[serde(default)]
    pub relayer: RelayerConfig,
}

impl Default for BridgeRelayerConfig {
    fn default() -> Self {
        Self {
            port: defaults::port(),
            api_key: None,
            source: Default::default(),
            destination: Default::default(),
            verifier: Default::default(),
            envelope: Default::default(),
            relayer: Default::default(),
        }
    }
}

impl BridgeRelayerConfig {
    /// Checks that everything the selected clients need is configured.
    pub fn verify(&self, use_real_clients: bool) -> Result<()> {
        if use_real_clients {
            if self.source.rpc_url.is_none() {
                return Err(Error::MissingConfig("source.rpc-url"));
            }
            if self.destination.node_url.is_none() {
                return Err(Error::MissingConfig("destination.node-url"));
            }
        }
        if self.source.marker_tag.is_empty() {
            return Err(Error::Generic("source.marker-tag must not be empty"));
        }
        if self.relayer.polling_interval == 0 {
            return Err(Error::Generic("relayer.polling-interval must not be 0"));
        }
        Ok(())
    }
}

/// SourceChainConfig is the configuration of the source chain node.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SourceChainConfig {
    /// JSON-RPC endpoint of the node.
    pub rpc_url: Option<RpcUrl>,
    /// JSON-RPC basic auth user.
    pub rpc_user: Option<String>,
    /// JSON-RPC basic auth password.
    #[serde(skip_serializing)]
    pub rpc_password: Option<SecretString>,
    /// Blocks required on top of a block before its bridge transactions are
    /// relayed.
    #[serde(default = "defaults::min_confirmations")]
    pub min_confirmations: u64,
    /// Script prefix of bridge outputs.
    #[serde(default)]
    pub marker_tag: MarkerTag,
    /// Request timeout in milliseconds.
    #[serde(default = "defaults::request_timeout")]
    pub request_timeout: u64,
}

impl Default for SourceChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            rpc_user: None,
            rpc_password: None,
            min_confirmations: defaults::min_confirmations(),
            marker_tag: MarkerTag::default(),
            request_timeout: defaults::request_timeout(),
        }
    }
}

/// DestinationConfig is the configuration of the destination node.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DestinationConfig {
    /// Base URL of the destination node.
    pub node_url: Option<RpcUrl>,
    /// Program that accepts bridge submissions.
    #[serde(default = "defaults::bridge_program_id")]
    pub bridge_program_id: String,
    /// Bearer key sent with every submission.
    #[serde(skip_serializing)]
    pub api_key: Option<SecretString>,
    /// Request timeout in milliseconds.
    #[serde(default = "defaults::request_timeout")]
    pub request_timeout: u64,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            node_url: None,
            bridge_program_id: defaults::bridge_program_id(),
            api_key: None,
            request_timeout: defaults::request_timeout(),
        }
    }
}

/// VerifierConfig is the configuration of the proof verifier.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct VerifierConfig {
    /// Base URL of the verifier service.
    ///
    /// Without it the stub verifier is used, which checks nothing.
    pub url: Option<RpcUrl>,
    /// Request timeout in milliseconds.
    #[serde(default = "defaults::verifier_timeout")]
    pub request_timeout: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            url: None,
            request_timeout: defaults::verifier_timeout(),
        }
    }
}

/// EnvelopeConfig holds the keys used to open envelopes.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct EnvelopeConfig {
    /// Shared symmetric secret. The well known development key is used when
    /// missing.
    pub key: Option<SecretString>,
    /// Hex secp256k1 secret key for recipient keyed envelopes.
    pub private_key: Option<SecretString>,
}

/// RelayerConfig is the configuration of the relay loop.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RelayerConfig {
    /// Pause between scans once the relayer caught up, in milliseconds.
    #[serde(default = "defaults::polling_interval")]
    pub polling_interval: u64,
    /// Pause after a failed scan or start, in milliseconds.
    #[serde(default = "defaults::retry_delay")]
    pub retry_delay: u64,
    /// Where the checkpoint is kept. Defaults to the data directory.
    pub checkpoint_file: Option<PathBuf>,
    /// Talk to real nodes instead of the in-memory simulation.
    #[serde(default)]
    pub use_real_clients: bool,
}

impl Default for RelayerConfig {
    fn default() -> Self {
        Self {
            polling_interval: defaults::polling_interval(),
            retry_delay: defaults::retry_delay(),
            checkpoint_file: None,
            use_real_clients: false,
        }
    }
}

impl RelayerConfig {
    /// The polling interval as a [`Duration`].
    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval)
    }

    /// The retry delay as a [`Duration`].
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay)
    }
}
