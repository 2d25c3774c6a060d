//! Boundary to the on-disk entry store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{domain::resource::ResourceKind, infra::cache_store::CacheStoreError};

/// Storage the cache-aside pipeline reads from and fills.
#[async_trait]
pub trait FontCache: Send + Sync {
    fn locate(&self, kind: ResourceKind, key: &str) -> Result<PathBuf, CacheStoreError>;

    async fn is_fresh(&self, path: &Path) -> bool;

    /// True iff an expired entry was found; it is removed before returning.
    async fn is_stale_existing(&self, path: &Path) -> bool;

    async fn read(&self, path: &Path) -> Result<Bytes, CacheStoreError>;

    async fn write(&self, path: &Path, payload: Bytes) -> Result<(), CacheStoreError>;
}
