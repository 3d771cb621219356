//! Multi-table LSH index over a store's documents.

use super::table::HyperplaneTable;
use super::LshParams;
use crate::document::Document;
use crate::error::{Result, VectorDbError};
use crate::storage::VectorStore;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

/// `num_tables` hyperplane tables, created lazily once the dimension is known.
///
/// Hyperplanes are derived from a seed fixed at construction, so an index
/// rebuilt for the same dimension hashes every vector the same way.
#[derive(Debug, Clone)]
pub struct LshIndex {
    params: LshParams,
    seed: u64,
    dimension: Option<usize>,
    tables: Vec<HyperplaneTable>,
    /// Store instance and epoch the buckets were built against
    store_id: Option<u64>,
    epoch: u64,
    /// Smallest document id not yet hashed
    next_id: u64,
    len: usize,
}

impl LshIndex {
    /// Create an empty index. A missing seed is drawn at random here.
    pub fn new(params: LshParams) -> Result<Self> {
        params.validate()?;
        let seed = params.seed.unwrap_or_else(rand::random);
        Ok(Self {
            params,
            seed,
            dimension: None,
            tables: Vec::new(),
            store_id: None,
            epoch: 0,
            next_id: 0,
            len: 0,
        })
    }

    /// Create an index and hash every document in `store`.
    pub fn build(store: &VectorStore, params: LshParams) -> Result<Self> {
        let mut index = Self::new(params)?;
        index.store_id = Some(store.instance_id());
        index.epoch = store.epoch();
        index.sync(store);
        Ok(index)
    }

    /// Bring the index up to date with `store`.
    ///
    /// Documents added since the last sync are hashed incrementally. If this
    /// is a different store, the store was cleared or reloaded, or its
    /// dimension no longer matches, the buckets are rebuilt from scratch.
    pub fn sync(&mut self, store: &VectorStore) {
        let other_store = self.store_id != Some(store.instance_id());
        let stale_dimension = matches!(
            (self.dimension, store.dimension()),
            (Some(ours), Some(theirs)) if ours != theirs
        ) || (self.dimension.is_some() && store.dimension().is_none());

        if other_store || store.epoch() != self.epoch || stale_dimension {
            debug!(
                other_store,
                old_epoch = self.epoch,
                new_epoch = store.epoch(),
                "rebuilding LSH index"
            );
            self.reset();
            self.store_id = Some(store.instance_id());
            self.epoch = store.epoch();
        }

        let documents = store.documents();
        let start = documents.partition_point(|d| d.id < self.next_id);
        for doc in &documents[start..] {
            // Every stored document shares the store's dimension
            let _ = self.insert(doc);
        }
    }

    fn reset(&mut self) {
        self.dimension = None;
        self.tables.clear();
        self.next_id = 0;
        self.len = 0;
    }

    fn init_tables(&mut self, dimension: usize) {
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.tables = (0..self.params.num_tables)
            .map(|_| HyperplaneTable::random(&mut rng, dimension, self.params.hashes_per_table))
            .collect();
        self.dimension = Some(dimension);
    }

    /// Hash one document into every table.
    ///
    /// The first document fixes the index dimension. Each document should be
    /// inserted once; [`sync`](Self::sync) takes care of that for store content.
    pub fn insert(&mut self, doc: &Document) -> Result<()> {
        match self.dimension {
            None => self.init_tables(doc.dimension()),
            Some(expected) if expected != doc.dimension() => {
                return Err(VectorDbError::DimensionMismatch {
                    expected,
                    actual: doc.dimension(),
                })
            }
            Some(_) => {}
        }

        for table in &mut self.tables {
            table.insert(doc.id, &doc.embedding);
        }
        self.len += 1;
        self.next_id = self.next_id.max(doc.id + 1);
        Ok(())
    }

    /// Ids sharing the query's bucket in at least one table, ascending and
    /// without duplicates.
    pub fn candidates(&self, query: &[f32]) -> Vec<u64> {
        if self.dimension != Some(query.len()) {
            return Vec::new();
        }
        let mut ids: Vec<u64> = self
            .tables
            .iter()
            .flat_map(|t| t.bucket_for(query).iter().copied())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Number of documents hashed
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn params(&self) -> LshParams {
        self.params
    }

    /// The seed the hyperplanes are derived from
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn num_tables(&self) -> usize {
        self.tables.len()
    }

    /// Non-empty buckets across all tables
    pub fn bucket_count(&self) -> usize {
        self.tables.iter().map(HyperplaneTable::bucket_count).sum()
    }
}
