//! Local file-system store.
//!
//! Each key is one file under a root directory. The version token of a
//! file is the hex SHA-256 of its content, so any writer that changes the
//! bytes changes the version.
//!
//! A write holds an exclusive advisory lock on `.{key}.lock` for the whole
//! compare-and-swap, so stores in other processes (or other `FileStore`
//! values in this one) sharing the directory serialize with it. New content
//! goes to a uniquely named temp file that is persisted over the key, so
//! readers never observe a partial write.

use crate::error::{StoreError, StoreResult};
use crate::store::{DurableStore, VersionToken, VersionedBlob};
use async_trait::async_trait;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// File-system store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStoreConfig {
    /// Directory holding one file per key.
    pub root: PathBuf,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
        }
    }
}

/// Store backed by plain files.
pub struct FileStore {
    config: FileStoreConfig,
    /// Keeps this store's writers off the blocking pool while one holds the file lock.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Creates a file store rooted at `config.root`.
    pub fn new(config: FileStoreConfig) -> Self {
        Self {
            config,
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    fn validate_key(key: &str) -> StoreResult<()> {
        if key.is_empty()
            || key == "."
            || key == ".."
            || key.contains(['/', '\\'])
            || key.starts_with('.')
        {
            return Err(StoreError::Unavailable(format!(
                "invalid key for file store: {key:?}"
            )));
        }
        Ok(())
    }
}

/// Content-derived version token.
fn content_version(content: &[u8]) -> VersionToken {
    VersionToken::new(hex::encode(Sha256::digest(content)))
}

fn read_current(path: &Path) -> StoreResult<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Compare-and-swap under the per-key file lock. Blocking.
fn locked_put(
    root: &Path,
    key: &str,
    content: &[u8],
    expected: Option<&VersionToken>,
) -> StoreResult<VersionToken> {
    std::fs::create_dir_all(root)?;
    let path = root.join(key);
    let lock_path = root.join(format!(".{key}.lock"));

    let lock_file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)?;
    FileExt::lock_exclusive(&lock_file)?;

    let current = read_current(&path)?.map(|bytes| content_version(&bytes));
    if current.as_ref() != expected {
        debug!("Rejecting write to {:?}: version moved", path);
        return Err(StoreError::Conflict {
            key: key.to_string(),
        });
    }

    let mut temp = tempfile::NamedTempFile::new_in(root)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(&path).map_err(|e| e.error)?;

    drop(lock_file);
    Ok(content_version(content))
}

#[async_trait]
impl DurableStore for FileStore {
    fn provider_name(&self) -> &'static str {
        "filesystem"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<VersionedBlob>> {
        Self::validate_key(key)?;
        let path = self.config.root.join(key);
        let content = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let version = content_version(&content);
        Ok(Some(VersionedBlob { content, version }))
    }

    async fn put(
        &self,
        key: &str,
        content: &[u8],
        expected: Option<&VersionToken>,
    ) -> StoreResult<VersionToken> {
        Self::validate_key(key)?;
        let _guard = self.write_lock.lock().await;

        let root = self.config.root.clone();
        let owned_key = key.to_string();
        let owned_content = content.to_vec();
        let owned_expected = expected.cloned();
        let version = tokio::task::spawn_blocking(move || {
            locked_put(&root, &owned_key, &owned_content, owned_expected.as_ref())
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("file store write task failed: {e}")))??;

        debug!("Wrote {} ({} bytes)", key, content.len());
        Ok(version)
    }
}
