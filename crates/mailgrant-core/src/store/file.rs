//! File-backed storage: one file per key inside a directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::Storage;
use crate::error::Result;

/// Stores each key as a file under a base directory.
///
/// Writes go to a uniquely named temporary sibling that is flushed to disk
/// and renamed over the target, so readers see either the old or the new
/// content even while several writers race on one key. On Unix the files
/// are created with mode `0600`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_dir: PathBuf,
}

impl FileStorage {
    /// Creates storage rooted at `base_dir`. The directory is created on first write.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Returns the base directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir.join(file_name(key))
    }

    fn temp_path_for(&self, key: &str) -> PathBuf {
        static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        self.base_dir.join(format!(
            ".{}.tmp-{}-{nonce}-{seq}",
            file_name(key),
            std::process::id()
        ))
    }
}

/// Writes `value` to a file that must not exist yet and syncs it.
async fn write_new(path: &Path, value: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    let written = async {
        file.write_all(value).await?;
        file.sync_all().await
    }
    .await;

    if written.is_err() {
        let _ = fs::remove_file(path).await;
    }
    written
}

/// Maps a key to a file name that cannot escape the base directory.
fn file_name(key: &str) -> String {
    let name: String = key
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '@' | '.' | '_' | '-') {
                ch
            } else {
                '-'
            }
        })
        .collect();

    match name.as_str() {
        "" | "." | ".." => format!("_{name}"),
        _ => name,
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)).await {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.base_dir).await?;

        let path = self.path_for(key);
        let tmp = self.temp_path_for(key);

        write_new(&tmp, value).await?;
        if let Err(err) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(err.into());
        }

        debug!(path = %path.display(), "wrote token file");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(fs::try_exists(self.path_for(key)).await?)
    }
}
