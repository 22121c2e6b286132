use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::Config;
use crate::matching::job::MatchScorer;
use crate::models::search::SearchIndex;
use crate::storage::BlobStore;
use crate::telemetry::TelemetrySink;

/// The index currently being served. Readers clone the inner `Arc` and search
/// without holding the lock; a run or reload replaces it wholesale.
#[derive(Clone)]
pub struct SharedIndex(Arc<RwLock<Arc<SearchIndex>>>);

impl Default for SharedIndex {
    fn default() -> Self {
        Self::new(SearchIndex::empty())
    }
}

impl SharedIndex {
    pub fn new(index: SearchIndex) -> Self {
        Self(Arc::new(RwLock::new(Arc::new(index))))
    }

    pub fn load(&self) -> Arc<SearchIndex> {
        self.0.read().clone()
    }

    pub fn swap(&self, index: SearchIndex) -> Arc<SearchIndex> {
        std::mem::replace(&mut *self.0.write(), Arc::new(index))
    }
}

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Data lake (or local/memory stand-in) for datasets and the index.
    pub store: Arc<dyn BlobStore>,
    pub index: SharedIndex,
    /// Pluggable job scorer. Default: KeywordMatchScorer.
    pub scorer: Arc<dyn MatchScorer>,
    pub telemetry: Arc<dyn TelemetrySink>,
}

#[cfg(test)]
impl AppState {
    /// In-memory state for handler tests.
    pub fn for_tests(index: SearchIndex, telemetry: Arc<dyn TelemetrySink>) -> Self {
        use crate::matching::job::KeywordMatchScorer;
        use crate::storage::MemoryBlobStore;

        AppState {
            config: Config::default(),
            store: Arc::new(MemoryBlobStore::default()),
            index: SharedIndex::new(index),
            scorer: Arc::new(KeywordMatchScorer::default()),
            telemetry,
        }
    }
}
