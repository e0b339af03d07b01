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
use std::sync::Arc;

use bridge_relayer_utils::Error;
use tokio::io::AsyncWriteExt;

use super::{Checkpoint, CheckpointStore, DEFAULT_CHECKPOINT_FILE};

/// JsonFileStore keeps the [`Checkpoint`] in a pretty-printed JSON file.
///
/// Saves go through a sibling `<file>.tmp` that is flushed to disk and then
/// renamed over the real file, so a crash leaves either the old or the new
/// checkpoint behind, never a torn one.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    // keeps the directory of a temporary store alive.
    _tmp: Option<Arc<tempfile::TempDir>>,
}

impl JsonFileStore {
    /// Create a new JsonFileStore writing to `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            _tmp: None,
        }
    }

    /// Create a JsonFileStore using the default file name inside `dir`.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self::open(dir.as_ref().join(DEFAULT_CHECKPOINT_FILE))
    }

    /// Creates a temporary JsonFileStore, removed once the last clone is dropped.
    pub fn temporary() -> crate::Result<Self> {
        let dir = tempfile::tempdir()?;
        Ok(Self {
            path: dir.path().join(DEFAULT_CHECKPOINT_FILE),
            _tmp: Some(Arc::new(dir)),
        })
    }

    /// The checkpoint file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_CHECKPOINT_FILE.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn write_atomically(&self, bytes: &[u8]) -> std::io::Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&dir).await?;

        let tmp = self.tmp_path();
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;

        #[cfg(unix)]
        tokio::fs::File::open(&dir).await?.sync_all().await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl CheckpointStore for JsonFileStore {
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> crate::Result<Checkpoint> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No checkpoint on disk, starting from genesis");
                return Ok(Checkpoint::default());
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|e| {
            Error::Persistence(format!(
                "checkpoint at {} is corrupt: {e}",
                self.path.display()
            ))
        })
    }

    #[tracing::instrument(
        skip_all,
        fields(
            path = %self.path.display(),
            height = checkpoint.last_processed_height,
        )
    )]
    async fn save(&self, checkpoint: &Checkpoint) -> crate::Result<()> {
        let bytes = serde_json::to_vec_pretty(checkpoint)?;
        self.write_atomically(&bytes).await.map_err(|e| {
            Error::Persistence(format!(
                "writing {} failed: {e}",
                self.path.display()
            ))
        })?;
        tracing::trace!("Checkpoint saved");
        Ok(())
    }
}
