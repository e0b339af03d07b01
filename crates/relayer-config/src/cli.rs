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

use anyhow::Context;
use bridge_relayer_store::JsonFileStore;
use directories_next::ProjectDirs;
use structopt::StructOpt;

use crate::BridgeRelayerConfig;

/// Package identifier, where the default configuration & checkpoint are defined.
/// If the user does not start the relayer with the `--config-dir`
/// it will default to read from the default location depending on the OS.
pub const PACKAGE_ID: [&str; 3] = ["tools", "webb", "bridge-relayer"];

/// The Bridge Relayer Command-line tool
///
/// Start the relayer from a config directory:
///
/// $ bridge-relayer -vvv -c <CONFIG_DIR_PATH>
#[derive(Debug, Default, StructOpt)]
#[structopt(name = "Bridge Relayer")]
pub struct Opts {
    /// A level of verbosity, and can be used multiple times
    #[structopt(short, long, parse(from_occurrences))]
    pub verbose: i32,
    /// Directory that contains configration files.
    #[structopt(
        short = "c",
        long = "config-dir",
        value_name = "PATH",
        parse(from_os_str)
    )]
    pub config_dir: Option<PathBuf>,
    /// Keep the checkpoint in a temporary directory
    /// that is deleted when the process exits.
    #[structopt(long)]
    pub tmp: bool,
    /// Throw away the saved checkpoint and scan from genesis.
    ///
    /// Every nullifier recorded so far is forgotten, so already relayed
    /// bridge events may be relayed again.
    #[structopt(long)]
    pub reset_checkpoint: bool,
}

/// Loads the configuration from the given directory.
///
/// Returns `Ok(Config)` on success, or `Err(anyhow::Error)` on failure.
///
/// # Arguments
///
/// * `config_dir` - An optional `PathBuf` representing the directory that contains the configuration.
pub fn load_config<P>(
    config_dir: Option<P>,
) -> Result<BridgeRelayerConfig, anyhow::Error>
where
    P: AsRef<Path>,
{
    tracing::debug!("Getting default dirs for bridge relayer");
    let dirs = ProjectDirs::from(PACKAGE_ID[0], PACKAGE_ID[1], PACKAGE_ID[2])
        .context("failed to get config")?;
    let path = match config_dir {
        Some(p) => p.as_ref().to_path_buf(),
        None => dirs.config_dir().to_path_buf(),
    };
    // return an error if the path is not a directory.
    if !path.is_dir() {
        return Err(anyhow::anyhow!("{} is not a directory", path.display()));
    }
    tracing::trace!("Loading Config from {} ..", path.display());
    let v = crate::utils::load(path)?;
    tracing::trace!("Config loaded..");
    Ok(v)
}

/// Sets up the logger for the relayer, based on the verbosity level passed in.
///
/// `RUST_LOG` style directives from the environment are kept on top of the
/// verbosity.
///
/// # Arguments
///
/// * `verbosity` - An i32 integer representing the verbosity level.
/// * `filter` - The crate the verbosity applies to, like `bridge_relayer`.
pub fn setup_logger(verbosity: i32, filter: &str) -> anyhow::Result<()> {
    use tracing::Level;
    let log_level = match verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env();
    for target in [filter, "bridge_relay_engine", "bridge_relayer_context"] {
        env_filter =
            env_filter.add_directive(format!("{target}={log_level}").parse()?);
    }
    let logger = tracing_subscriber::fmt()
        .with_target(true)
        .with_max_level(log_level)
        .with_env_filter(env_filter);
    // if we are not compiling for integration tests, we should use pretty logs
    #[cfg(not(feature = "integration-tests"))]
    let logger = logger.pretty();
    // otherwise, we should use json, which is easy to parse.
    #[cfg(feature = "integration-tests")]
    let logger = logger.json().flatten_event(true).with_current_span(false);

    logger
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to set up the logger: {e}"))?;
    Ok(())
}

/// Creates the checkpoint store for the relayer based on the options and
/// configuration passed in.
///
/// The checkpoint goes, in order of preference, to a temporary directory
/// (`--tmp`), to `relayer.checkpoint-file`, next to the config directory, or
/// to the OS data directory.
pub fn create_store(
    opts: &Opts,
    config: &BridgeRelayerConfig,
) -> anyhow::Result<JsonFileStore> {
    // check if we shall use the temp dir.
    if opts.tmp {
        tracing::debug!("Using temp dir for the checkpoint");
        let store = JsonFileStore::temporary()?;
        return Ok(store);
    }
    if let Some(file) = &config.relayer.checkpoint_file {
        return Ok(JsonFileStore::open(file));
    }
    let store_dir = match opts.config_dir.as_ref() {
        Some(config_dir) => match config_dir.parent() {
            Some(parent) => parent.join("store"),
            None => config_dir.join("store"),
        },
        None => {
            let dirs = ProjectDirs::from(
                PACKAGE_ID[0],
                PACKAGE_ID[1],
                PACKAGE_ID[2],
            )
            .context("failed to get data dir")?;
            dirs.data_local_dir().join("store")
        }
    };
    Ok(JsonFileStore::in_dir(store_dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let opts = Opts::from_iter([
            "bridge-relayer",
            "-vvv",
            "-c",
            "/etc/bridge",
            "--tmp",
            "--reset-checkpoint",
        ]);
        assert_eq!(opts.verbose, 3);
        assert_eq!(opts.config_dir, Some(PathBuf::from("/etc/bridge")));
        assert!(opts.tmp);
        assert!(opts.reset_checkpoint);
    }

    #[test]
    fn checkpoint_file_from_config_wins() {
        let mut config = BridgeRelayerConfig::default();
        config.relayer.checkpoint_file = Some("/var/lib/bridge/state.json".into());
        let store = create_store(&Opts::default(), &config).unwrap();
        assert_eq!(store.path(), Path::new("/var/lib/bridge/state.json"));
    }

    #[test]
    fn store_lives_next_to_the_config_dir() {
        let opts = Opts {
            config_dir: Some("/etc/bridge/config".into()),
            ..Default::default()
        };
        let store =
            create_store(&opts, &BridgeRelayerConfig::default()).unwrap();
        assert_eq!(
            store.path(),
            Path::new("/etc/bridge/store/relayer_state.json")
        );
    }

    #[test]
    fn tmp_store_is_temporary() {
        let opts = Opts {
            tmp: true,
            ..Default::default()
        };
        let store =
            create_store(&opts, &BridgeRelayerConfig::default()).unwrap();
        assert!(store.path().starts_with(std::env::temp_dir()));
    }
}
