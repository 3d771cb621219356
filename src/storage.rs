//! In-memory document store with optional file persistence

use crate::document::{Document, Metadata};
use crate::error::{Result, VectorDbError};
use crate::filter::MetadataFilter;
use crate::persistence::snapshot;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Construction options for a [`VectorStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// File the store saves to and loads from.
    pub path: Option<PathBuf>,
    /// Save after every successful mutation when a path is bound.
    pub auto_save: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            auto_save: true,
        }
    }
}

impl StoreConfig {
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_auto_save(mut self, auto_save: bool) -> Self {
        self.auto_save = auto_save;
        self
    }
}

/// Ordered collection of documents with store-assigned ids.
///
/// The first successful insert locks the embedding dimension; every later
/// embedding must match it. Ids start at 0 and grow by one per insert.
/// [`clear`](Self::clear) resets both the id counter and the dimension lock,
/// so a cleared store behaves exactly like a new one.
///
/// The store has no interior mutability: share it across threads behind a
/// `RwLock` to get single-writer, multiple-reader access.
#[derive(Debug)]
pub struct VectorStore {
    documents: Vec<Document>,
    /// Document id -> position in `documents`
    positions: HashMap<u64, usize>,
    /// Next id to assign
    next_id: u64,
    /// Enforced embedding dimension
    dimension: Option<usize>,
    path: Option<PathBuf>,
    auto_save: bool,
    /// Bumped whenever content is replaced wholesale (clear, load)
    epoch: u64,
    /// Random per-instance identity
    instance_id: u64,
}

impl Default for VectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create an empty store bound to a storage path. Nothing is read from disk.
    pub fn with_storage(path: impl Into<PathBuf>, auto_save: bool) -> Self {
        Self::with_config(
            StoreConfig::default()
                .with_path(path)
                .with_auto_save(auto_save),
        )
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            documents: Vec::new(),
            positions: HashMap::new(),
            next_id: 0,
            dimension: None,
            path: config.path,
            auto_save: config.auto_save,
            epoch: 0,
            instance_id: rand::random(),
        }
    }

    /// Bind to `path` and load it if the file exists.
    ///
    /// A missing file gives an empty store; a file that exists but cannot be
    /// decoded is an error.
    pub fn open(path: impl Into<PathBuf>, auto_save: bool) -> Result<Self> {
        let mut store = Self::with_storage(path, auto_save);
        if store.path.as_deref().map_or(false, Path::exists) {
            store.try_load()?;
        }
        Ok(store)
    }

    /// Insert a document and return its id.
    pub fn insert(&mut self, embedding: Vec<f32>, metadata: Metadata) -> Result<u64> {
        let dimension = self.check_embedding(&embedding, self.dimension)?;
        let id = self.push(embedding, metadata, dimension);
        self.auto_save_after("insert");
        Ok(id)
    }

    /// Insert several documents at once.
    ///
    /// Every embedding is validated before anything is stored: either all
    /// documents are inserted or none are. Auto-save runs once at the end.
    pub fn insert_batch<I>(&mut self, items: I) -> Result<Vec<u64>>
    where
        I: IntoIterator<Item = (Vec<f32>, Metadata)>,
    {
        let items: Vec<(Vec<f32>, Metadata)> = items.into_iter().collect();
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let mut dimension = self.dimension;
        for (embedding, _) in &items {
            dimension = Some(self.check_embedding(embedding, dimension)?);
        }

        self.documents.reserve(items.len());
        let ids = items
            .into_iter()
            .map(|(embedding, metadata)| {
                let dim = embedding.len();
                self.push(embedding, metadata, dim)
            })
            .collect();
        self.auto_save_after("batch insert");
        Ok(ids)
    }

    /// Validate an embedding against `dimension` and return the dimension it establishes.
    fn check_embedding(&self, embedding: &[f32], dimension: Option<usize>) -> Result<usize> {
        if embedding.is_empty() {
            return Err(VectorDbError::invalid_argument("Embedding must be non-empty"));
        }
        match dimension {
            Some(expected) if embedding.len() != expected => Err(VectorDbError::DimensionMismatch {
                expected,
                actual: embedding.len(),
            }),
            _ => Ok(embedding.len()),
        }
    }

    fn push(&mut self, embedding: Vec<f32>, metadata: Metadata, dimension: usize) -> u64 {
        self.dimension = Some(dimension);
        let id = self.next_id;
        self.next_id += 1;
        self.positions.insert(id, self.documents.len());
        self.documents.push(Document::new(id, embedding, metadata));
        id
    }

    /// Copy of every document, in insertion order.
    pub fn get_all(&self) -> Vec<Document> {
        self.documents.clone()
    }

    /// Borrowed view of every document, in insertion order.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Get a document by id
    pub fn get(&self, id: u64) -> Option<&Document> {
        self.positions.get(&id).map(|&pos| &self.documents[pos])
    }

    /// Up to `k` documents whose metadata matches `filter`, in insertion order.
    pub fn find(&self, filter: &MetadataFilter, k: usize) -> Vec<&Document> {
        self.documents
            .iter()
            .filter(|doc| filter.matches(&doc.metadata))
            .take(k)
            .collect()
    }

    /// Id of the first document whose metadata map equals `metadata` exactly.
    pub fn find_id_by_metadata(&self, metadata: &Metadata) -> Option<u64> {
        self.documents
            .iter()
            .find(|doc| &doc.metadata == metadata)
            .map(|doc| doc.id)
    }

    /// Id of the first document whose embedding equals `embedding` component-wise.
    pub fn find_id_by_embedding(&self, embedding: &[f32]) -> Option<u64> {
        self.documents
            .iter()
            .find(|doc| doc.embedding == embedding)
            .map(|doc| doc.id)
    }

    pub(crate) fn position(&self, id: u64) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Remove every document and reset the id counter and dimension lock.
    pub fn clear(&mut self) {
        self.documents.clear();
        self.positions.clear();
        self.next_id = 0;
        self.dimension = None;
        self.epoch += 1;
        self.auto_save_after("clear");
    }

    /// Get the number of documents in the store
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Get the locked embedding dimension (if any)
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Whether the store is bound to a storage path
    pub fn has_storage(&self) -> bool {
        self.path.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn auto_save(&self) -> bool {
        self.auto_save
    }

    pub fn set_auto_save(&mut self, auto_save: bool) {
        self.auto_save = auto_save;
    }

    /// Content generation. Changes whenever ids may have been reused.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Random identity drawn at construction. Ids from two stores are
    /// unrelated even when their epochs agree.
    pub fn instance_id(&self) -> u64 {
        self.instance_id
    }

    /// Save to the bound path. Returns `false` on any failure.
    pub fn save(&self) -> bool {
        match self.try_save() {
            Ok(()) => true,
            Err(e) => {
                warn!(path = ?self.path, error = %e, "failed to save vector store");
                false
            }
        }
    }

    /// Save to the bound path, reporting why a save failed.
    pub fn try_save(&self) -> Result<()> {
        let path = self.path.as_deref().ok_or(VectorDbError::NoStorage)?;
        snapshot::save(path, self.dimension, self.next_id, &self.documents)?;
        debug!(path = %path.display(), documents = self.documents.len(), "saved vector store");
        Ok(())
    }

    /// Replace the content with the bound file's. Returns `false` on any
    /// failure, in which case the store is left unchanged.
    pub fn load(&mut self) -> bool {
        match self.try_load() {
            Ok(()) => true,
            Err(e) => {
                warn!(path = ?self.path, error = %e, "failed to load vector store");
                false
            }
        }
    }

    /// Load from the bound path, reporting why a load failed.
    pub fn try_load(&mut self) -> Result<()> {
        let path = self.path.as_deref().ok_or(VectorDbError::NoStorage)?;
        let loaded = snapshot::load(path)?;

        let positions = loaded
            .documents
            .iter()
            .enumerate()
            .map(|(pos, doc)| (doc.id, pos))
            .collect();

        debug!(path = %path.display(), documents = loaded.documents.len(), "loaded vector store");
        self.documents = loaded.documents;
        self.positions = positions;
        self.next_id = loaded.next_id;
        self.dimension = loaded.dimension;
        self.epoch += 1;
        Ok(())
    }

    fn auto_save_after(&self, operation: &str) {
        if self.auto_save && self.path.is_some() {
            if let Err(e) = self.try_save() {
                warn!(operation, error = %e, "auto-save failed");
            }
        }
    }
}
