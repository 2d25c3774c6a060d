//! Filesystem-backed cache of proxied stylesheets and font assets.
//!
//! The directory tree is the index: an entry lives at a path derived from its
//! kind and key, and its age is the file's modification time. Writes go to a
//! temporary sibling first and are renamed into place, so readers never
//! observe a half-written payload.

use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::NamedTempFile;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::fs;
use tracing::warn;

use crate::{
    application::cache::FontCache,
    domain::{freshness::is_fresh, resource::ResourceKind},
};

const STYLESHEET_EXTENSION: &str = "css";

/// Errors raised while locating, reading or writing cache entries.
#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error("invalid {kind} cache key `{key}`")]
    InvalidKey { kind: ResourceKind, key: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Presence and freshness of an entry at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Missing,
    Fresh { stored_at: OffsetDateTime },
    Stale { stored_at: OffsetDateTime },
}

#[derive(Debug)]
pub struct CacheStore {
    root: PathBuf,
    ttl: Duration,
}

impl CacheStore {
    /// Initialise a store rooted at the provided directory, creating it if necessary.
    pub fn new(root: PathBuf, ttl: Duration) -> Result<Self, io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root, ttl })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map `(kind, key)` to its canonical location under the cache root.
    ///
    /// Stylesheets live at `<root>/css/<key>.css`; assets mirror their request
    /// path, so `/s/roboto/v30/a.woff2` lives at `<root>/s/roboto/v30/a.woff2`.
    /// Keys that could escape the root or alias another key are rejected.
    pub fn locate(&self, kind: ResourceKind, key: &str) -> Result<PathBuf, CacheStoreError> {
        let invalid = || CacheStoreError::InvalidKey {
            kind,
            key: key.to_string(),
        };

        match kind {
            ResourceKind::Stylesheet => {
                if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric()) {
                    return Err(invalid());
                }
                Ok(self
                    .root
                    .join(kind.directory())
                    .join(format!("{key}.{STYLESHEET_EXTENSION}")))
            }
            ResourceKind::Asset => {
                let prefix = format!("/{}/", kind.directory());
                let relative = key.strip_prefix(prefix.as_str()).ok_or_else(invalid)?;

                let mut path = self.root.join(kind.directory());
                for segment in relative.split('/') {
                    if !is_plain_segment(segment) {
                        return Err(invalid());
                    }
                    path.push(segment);
                }
                Ok(path)
            }
        }
    }

    /// Inspect an entry against the current wall clock.
    pub async fn entry_state(&self, path: &Path) -> EntryState {
        self.entry_state_at(path, OffsetDateTime::now_utc()).await
    }

    /// Inspect an entry as of `now`. Never modifies the entry.
    pub async fn entry_state_at(&self, path: &Path, now: OffsetDateTime) -> EntryState {
        let metadata = match fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return EntryState::Missing,
            Err(err) if err.kind() == ErrorKind::NotFound => return EntryState::Missing,
            Err(err) => {
                warn!(
                    target = "fontproxy::cache",
                    op = "cache_store::entry_state",
                    result = "metadata_error",
                    path = %path.display(),
                    error = %err,
                    "Failed to stat cache entry; treating as missing"
                );
                return EntryState::Missing;
            }
        };

        let stored_at = match metadata.modified() {
            Ok(modified) => OffsetDateTime::from(modified),
            // Without a timestamp the age is unknown; force a refresh.
            Err(_) => OffsetDateTime::UNIX_EPOCH,
        };

        if is_fresh(stored_at, now, self.ttl) {
            EntryState::Fresh { stored_at }
        } else {
            EntryState::Stale { stored_at }
        }
    }

    /// True iff the entry exists and has not outlived the TTL.
    pub async fn is_fresh(&self, path: &Path) -> bool {
        matches!(self.entry_state(path).await, EntryState::Fresh { .. })
    }

    /// True iff the entry exists but has expired. The expired file is deleted
    /// before returning, so later reads miss until the entry is rewritten.
    pub async fn is_stale_existing(&self, path: &Path) -> bool {
        match self.entry_state(path).await {
            EntryState::Stale { .. } => {
                self.evict(path).await;
                true
            }
            EntryState::Missing | EntryState::Fresh { .. } => false,
        }
    }

    /// Delete an entry known to be stale, logging rather than failing.
    pub async fn evict(&self, path: &Path) {
        if let Err(err) = self.delete(path).await {
            warn!(
                target = "fontproxy::cache",
                op = "cache_store::evict",
                result = "delete_error",
                path = %path.display(),
                error = %err,
                "Failed to delete stale cache entry"
            );
        }
    }

    /// Read an entry's payload. The file may have vanished since it was
    /// inspected; callers treat any error as a miss.
    pub async fn read(&self, path: &Path) -> Result<Bytes, CacheStoreError> {
        let data = fs::read(path).await?;
        Ok(Bytes::from(data))
    }

    /// Persist a payload, replacing any existing entry atomically.
    pub async fn write(&self, path: &Path, payload: Bytes) -> Result<(), CacheStoreError> {
        let parent = path
            .parent()
            .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "cache path has no parent"))?
            .to_path_buf();
        fs::create_dir_all(&parent).await?;

        let destination = path.to_path_buf();
        tokio::task::spawn_blocking(move || -> io::Result<()> {
            let mut staged = NamedTempFile::new_in(&parent)?;
            staged.write_all(&payload)?;
            staged.flush()?;
            staged.persist(&destination).map_err(|err| err.error)?;
            Ok(())
        })
        .await
        .map_err(io::Error::other)??;

        Ok(())
    }

    /// Remove an entry. Missing files are treated as success.
    pub async fn delete(&self, path: &Path) -> Result<(), CacheStoreError> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(CacheStoreError::Io(err)),
        }
    }
}

#[async_trait]
impl FontCache for CacheStore {
    fn locate(&self, kind: ResourceKind, key: &str) -> Result<PathBuf, CacheStoreError> {
        CacheStore::locate(self, kind, key)
    }

    async fn is_fresh(&self, path: &Path) -> bool {
        CacheStore::is_fresh(self, path).await
    }

    async fn is_stale_existing(&self, path: &Path) -> bool {
        CacheStore::is_stale_existing(self, path).await
    }

    async fn read(&self, path: &Path) -> Result<Bytes, CacheStoreError> {
        CacheStore::read(self, path).await
    }

    async fn write(&self, path: &Path, payload: Bytes) -> Result<(), CacheStoreError> {
        CacheStore::write(self, path, payload).await
    }
}

fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty() && segment != "." && segment != ".." && !segment.contains('\\')
}
