//! Blob storage boundary for processed datasets and the search index.
//!
//! Backends: `S3BlobStore` (data lake), `LocalBlobStore` (filesystem),
//! `MemoryBlobStore` (tests and ephemeral runs). Carried in `AppState` as
//! `Arc<dyn BlobStore>`.

pub mod local;
pub mod memory;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::models::search::SearchIndex;

pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
pub use s3::S3BlobStore;

pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Bytes, StorageError>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

/// `{prefix}/{source}/{dataset}/{YYYYmmdd_HHMMSS}/data.json`
pub fn dataset_key(prefix: &str, source: &str, dataset: &str, run_at: DateTime<Utc>) -> String {
    format!(
        "{}/{source}/{dataset}/{}/data.json",
        prefix.trim_end_matches('/'),
        run_at.format("%Y%m%d_%H%M%S")
    )
}

pub async fn put_json<T: Serialize + ?Sized>(
    store: &dyn BlobStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let body = serde_json::to_vec(value)?;
    store.put(key, Bytes::from(body), JSON_CONTENT_TYPE).await
}

/// Loads the served index. Never fails: a missing, unreadable or corrupt
/// object yields an empty index.
pub async fn load_index(store: &dyn BlobStore, key: &str) -> SearchIndex {
    let body = match store.get(key).await {
        Ok(body) => body,
        Err(e) => {
            error!(backend = store.backend(), key, "failed to load search index: {e}");
            return SearchIndex::empty();
        }
    };
    match serde_json::from_slice::<SearchIndex>(&body) {
        Ok(index) => {
            info!(
                backend = store.backend(),
                key,
                total_records = index.total_records,
                "search index loaded"
            );
            index
        }
        Err(e) => {
            error!(backend = store.backend(), key, "search index is corrupt: {e}");
            SearchIndex::empty()
        }
    }
}
