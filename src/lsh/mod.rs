//! Approximate search with random-hyperplane locality-sensitive hashing.
//!
//! Each of `num_tables` tables hashes a vector to a `hashes_per_table`-bit
//! code, one bit per random hyperplane. A query is scored exactly against the
//! union of its buckets, so results can miss true neighbors but never carry
//! an approximate score.
//!
//! Random hyperplanes approximate angular distance. Dot-product and
//! Euclidean metrics are accepted, with weaker recall guarantees.

mod index;
mod table;

pub use index::LshIndex;
pub use table::HyperplaneTable;

use crate::error::{Result, VectorDbError};
use crate::filter::MetadataFilter;
use crate::index::{self as search, SearchEngine, SearchResult};
use crate::similarity::SimilarityMetric;
use crate::storage::VectorStore;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Hash code width limit
pub const MAX_HASHES_PER_TABLE: usize = 64;

/// LSH configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LshParams {
    /// Number of independent hash tables (L)
    pub num_tables: usize,
    /// Hyperplanes per table (H)
    pub hashes_per_table: usize,
    /// Seed for hyperplane sampling. `None` draws one at random.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for LshParams {
    fn default() -> Self {
        Self {
            num_tables: 10,
            hashes_per_table: 8,
            seed: None,
        }
    }
}

impl LshParams {
    pub fn new(num_tables: usize, hashes_per_table: usize) -> Self {
        Self {
            num_tables,
            hashes_per_table,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_tables == 0 {
            return Err(VectorDbError::invalid_argument(
                "num_tables must be at least 1",
            ));
        }
        if self.hashes_per_table == 0 || self.hashes_per_table > MAX_HASHES_PER_TABLE {
            return Err(VectorDbError::invalid_argument(format!(
                "hashes_per_table must be between 1 and {}, got {}",
                MAX_HASHES_PER_TABLE, self.hashes_per_table
            )));
        }
        Ok(())
    }
}

/// LSH search engine bound to a store.
///
/// The engine borrows the store, so the store cannot change while the engine
/// is alive. To keep an index across mutations, detach it with
/// [`into_index`](Self::into_index) and re-attach it with
/// [`resume`](Self::resume), which hashes only what was added in between.
#[derive(Debug)]
pub struct LshSearchEngine<'a> {
    store: &'a VectorStore,
    metric: SimilarityMetric,
    index: LshIndex,
}

impl<'a> LshSearchEngine<'a> {
    /// Build an index over every document in `store`.
    pub fn new(store: &'a VectorStore, metric: SimilarityMetric, params: LshParams) -> Result<Self> {
        if !metric.is_angular() {
            debug!(%metric, "LSH hyperplanes approximate angular distance; recall may be lower");
        }
        let index = LshIndex::build(store, params)?;
        debug!(
            documents = index.len(),
            tables = params.num_tables,
            hashes = params.hashes_per_table,
            seed = index.seed(),
            "built LSH index"
        );
        Ok(Self {
            store,
            metric,
            index,
        })
    }

    /// Re-attach a previously built index, catching it up with `store`.
    pub fn resume(store: &'a VectorStore, metric: SimilarityMetric, mut index: LshIndex) -> Self {
        index.sync(store);
        Self {
            store,
            metric,
            index,
        }
    }

    /// Detach the index, releasing the store borrow.
    pub fn into_index(self) -> LshIndex {
        self.index
    }

    pub fn index(&self) -> &LshIndex {
        &self.index
    }

    pub fn params(&self) -> LshParams {
        self.index.params()
    }
}

impl SearchEngine for LshSearchEngine<'_> {
    fn search(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>> {
        if !search::validate_query(self.store, query, k)? {
            return Ok(Vec::new());
        }
        let candidates = self.index.candidates(query);
        debug!(candidates = candidates.len(), k, "LSH candidate set");

        let positions = candidates
            .into_iter()
            .filter_map(|id| self.store.position(id));
        Ok(search::rank(
            self.store,
            self.metric,
            query,
            k,
            filter,
            positions,
        ))
    }

    fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    fn store(&self) -> &VectorStore {
        self.store
    }
}
