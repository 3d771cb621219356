//! # storex
//!
//! An embeddable vector database.
//!
//! This library provides:
//! - Document storage with store-assigned ids and a locked embedding dimension
//! - Similarity metrics (Cosine, Dot Product, Euclidean)
//! - Flat (exact) and LSH (approximate) top-k search
//! - Metadata filters evaluated before ranking
//! - A checksummed binary snapshot format with atomic saves
//!
//! ## Example
//!
//! ```rust
//! use storex::{FlatSearchEngine, Metadata, MetadataFilter, SearchEngine, SimilarityMetric, VectorStore};
//!
//! let mut store = VectorStore::new();
//!
//! let mut meta = Metadata::new();
//! meta.insert("lang".into(), "en".into());
//! store.insert(vec![1.0, 0.0], meta).unwrap();
//! store.insert(vec![0.0, 1.0], Metadata::new()).unwrap();
//!
//! let engine = FlatSearchEngine::new(&store, SimilarityMetric::Cosine);
//! let filter = MetadataFilter::equals("lang", "en");
//! let results = engine.search(&[0.9, 0.1], 5, Some(&filter)).unwrap();
//!
//! assert_eq!(results.len(), 1);
//! assert_eq!(results[0].document.id, 0);
//! ```

pub mod document;
pub mod error;
pub mod filter;
pub mod flat_index;
pub mod index;
pub mod lsh;
pub mod persistence;
pub mod similarity;
pub mod storage;
pub mod top_k;

pub use document::{parse_embedding, Document, Metadata, MetadataValue};
pub use error::{Result, VectorDbError};
pub use filter::MetadataFilter;
pub use flat_index::FlatSearchEngine;
pub use index::{Engine, SearchEngine, SearchResult};
pub use lsh::{LshIndex, LshParams, LshSearchEngine};
pub use similarity::{
    cosine_similarity, dot_product_similarity, euclidean_similarity, SimilarityMetric,
};
pub use storage::{StoreConfig, VectorStore};
