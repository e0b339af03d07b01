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

use std::path::{Path, PathBuf};

use bridge_relayer_utils::Result;
use config::{Config, File};

use crate::BridgeRelayerConfig;

/// A helper function that will search for all config files in the given directory and return them as a vec
/// of the paths.
///
/// Supported file extensions are:
/// - `.toml`.
/// - `.json`.
pub fn search_config_files<P: AsRef<Path>>(base_dir: P) -> Result<Vec<PathBuf>> {
    // A pattern that covers all toml or json files in the config directory and subdirectories.
    let toml_pattern = format!("{}/**/*.toml", base_dir.as_ref().display());
    let json_pattern = format!("{}/**/*.json", base_dir.as_ref().display());
    tracing::trace!(
        "Loading config files from {} and {}",
        toml_pattern,
        json_pattern
    );
    let toml_files = glob::glob(&toml_pattern)?;
    let json_files = glob::glob(&json_pattern)?;
    toml_files
        .chain(json_files)
        .map(|v| v.map_err(bridge_relayer_utils::Error::from))
        .collect()
}

/// Try to parse the [`BridgeRelayerConfig`] from the given config file(s).
pub fn parse_from_files(files: &[PathBuf]) -> Result<BridgeRelayerConfig> {
    let mut builder = Config::builder();
    for config_file in files {
        tracing::trace!("Loading config file: {}", config_file.display());
        // get file extension
        let ext = config_file
            .extension()
            .map(|e| e.to_str().unwrap_or(""))
            .unwrap_or("");
        let format = match ext {
            "toml" => config::FileFormat::Toml,
            "json" => config::FileFormat::Json,
            _ => {
                tracing::warn!("Unknown file extension: {}", ext);
                continue;
            }
        };
        builder = builder
            .add_source(File::from(config_file.as_path()).format(format));
    }

    // also merge in the environment (with a prefix of BRIDGE).
    let builder = builder
        .add_source(config::Environment::with_prefix("BRIDGE").separator("_"));
    let cfg = builder.build()?;
    // and finally deserialize the config and post-process it
    let config: std::result::Result<
        BridgeRelayerConfig,
        serde_path_to_error::Error<config::ConfigError>,
    > = serde_path_to_error::deserialize(cfg);
    match config {
        Ok(c) => postloading_process(c),
        Err(e) => {
            tracing::error!("{}", e);
            Err(e.into())
        }
    }
}

/// Load the configuration files and
///
/// Returns `Ok(BridgeRelayerConfig)` on success, or `Err(Error)` on failure.
///
/// # Arguments
///
/// * `path` - The path to the configuration directory
///
/// it is the same as using the [`search_config_files`] and [`parse_from_files`] functions combined.
pub fn load<P: AsRef<Path>>(path: P) -> Result<BridgeRelayerConfig> {
    parse_from_files(&search_config_files(path)?)
}

/// The postloading_process exists to validate configuration and warn about
/// settings that are unsafe outside of a simulation.
pub fn postloading_process(
    config: BridgeRelayerConfig,
) -> Result<BridgeRelayerConfig> {
    tracing::trace!("Checking configration sanity ...");
    config.verify(config.relayer.use_real_clients)?;

    if config.verifier.url.is_none() {
        tracing::warn!(
            "!!WARNING!!: No verifier.url configured, bridge proofs will only \
             be checked by the local stub verifier"
        );
    }
    if config.envelope.key.is_none() {
        tracing::warn!(
            "!!WARNING!!: No envelope.key configured, using the well known \
             development key"
        );
    }
    if config.api_key.is_none() {
        tracing::warn!(
            "!!WARNING!!: No api-key configured, the control API accepts \
             every request"
        );
    }
    if config.source.min_confirmations == 0 {
        tracing::warn!(
            "!!WARNING!!: source.min-confirmations is 0, bridge events are \
             relayed before any block is built on top of them"
        );
    }

    tracing::trace!(
        "postloaded config: {}",
        serde_json::to_string_pretty(&config)?
    );

    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn merges_toml_and_json_files() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "main.toml",
            r#"
port = 4000

[source]
rpc-url = "http://127.0.0.1:18232"
rpc-user = "zcash"
min-confirmations = 2
marker-tag = "OP_RETURN ZBRIDGE"

[relayer]
polling-interval = 1000
"#,
        );
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        write(
            &dir.path().join("nested"),
            "destination.json",
            r#"{ "destination": { "node-url": "http://127.0.0.1:57291", "bridge-program-id": "zbridge" } }"#,
        );

        let files = search_config_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        let config = parse_from_files(&files).unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.source.rpc_user.as_deref(), Some("zcash"));
        assert_eq!(config.source.min_confirmations, 2);
        assert_eq!(config.source.marker_tag.to_string(), "OP_RETURN ZBRIDGE");
        assert_eq!(config.relayer.polling_interval, 1000);
        assert_eq!(config.relayer.retry_delay, 5000);
        assert_eq!(config.destination.bridge_program_id, "zbridge");
        assert_eq!(
            config.destination.node_url.unwrap().as_str(),
            "http://127.0.0.1:57291/"
        );
    }

    #[test]
    fn wrong_types_name_the_field() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "main.toml",
            "[source]\nmin-confirmations = \"many\"\n",
        );
        let err = load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("source.min-confirmations"));
    }

    #[test]
    fn empty_dir_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(dir.path()).unwrap();
        assert_eq!(config.port, 3001);
    }
}
