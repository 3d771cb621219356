//! Brute-force flat search: scores every document, O(n log k) per query.

use crate::error::Result;
use crate::filter::MetadataFilter;
use crate::index::{self, SearchEngine, SearchResult};
use crate::similarity::SimilarityMetric;
use crate::storage::VectorStore;

/// Exhaustive search over a store. Holds no index state, so results always
/// reflect the store's current content.
#[derive(Debug, Clone, Copy)]
pub struct FlatSearchEngine<'a> {
    store: &'a VectorStore,
    metric: SimilarityMetric,
}

impl<'a> FlatSearchEngine<'a> {
    pub fn new(store: &'a VectorStore, metric: SimilarityMetric) -> Self {
        Self { store, metric }
    }
}

impl SearchEngine for FlatSearchEngine<'_> {
    fn search(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>> {
        if !index::validate_query(self.store, query, k)? {
            return Ok(Vec::new());
        }
        Ok(index::rank(
            self.store,
            self.metric,
            query,
            k,
            filter,
            0..self.store.len(),
        ))
    }

    fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    fn store(&self) -> &VectorStore {
        self.store
    }
}
