//! Search engine trait and the ranking shared by every strategy

use crate::document::Document;
use crate::error::{Result, VectorDbError};
use crate::filter::MetadataFilter;
use crate::flat_index::FlatSearchEngine;
use crate::lsh::LshSearchEngine;
use crate::similarity::SimilarityMetric;
use crate::storage::VectorStore;
use crate::top_k::{Scored, TopK};
use serde::Serialize;

/// A search hit: the similarity score and a copy of the matching document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub score: f64,
    pub document: Document,
}

/// A top-k similarity search strategy bound to a store and a metric.
///
/// Results are ordered by descending score; equal scores are ordered by
/// ascending document id.
pub trait SearchEngine {
    /// Return up to `k` documents most similar to `query`, skipping documents
    /// rejected by `filter`.
    fn search(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>>;

    /// The metric used for scoring.
    fn metric(&self) -> SimilarityMetric;

    /// The store this engine searches.
    fn store(&self) -> &VectorStore;
}

/// Every available strategy, for callers that pick one at runtime.
#[derive(Debug)]
pub enum Engine<'a> {
    Flat(FlatSearchEngine<'a>),
    Lsh(LshSearchEngine<'a>),
}

impl SearchEngine for Engine<'_> {
    fn search(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>> {
        match self {
            Engine::Flat(engine) => engine.search(query, k, filter),
            Engine::Lsh(engine) => engine.search(query, k, filter),
        }
    }

    fn metric(&self) -> SimilarityMetric {
        match self {
            Engine::Flat(engine) => engine.metric(),
            Engine::Lsh(engine) => engine.metric(),
        }
    }

    fn store(&self) -> &VectorStore {
        match self {
            Engine::Flat(engine) => engine.store(),
            Engine::Lsh(engine) => engine.store(),
        }
    }
}

impl<'a> From<FlatSearchEngine<'a>> for Engine<'a> {
    fn from(engine: FlatSearchEngine<'a>) -> Self {
        Engine::Flat(engine)
    }
}

impl<'a> From<LshSearchEngine<'a>> for Engine<'a> {
    fn from(engine: LshSearchEngine<'a>) -> Self {
        Engine::Lsh(engine)
    }
}

/// Check `k` and the query's shape.
///
/// Returns `false` when the store has no locked dimension yet, i.e. there is
/// nothing to search.
pub(crate) fn validate_query(store: &VectorStore, query: &[f32], k: usize) -> Result<bool> {
    if k == 0 {
        return Err(VectorDbError::invalid_argument("k must be positive"));
    }
    if query.is_empty() {
        return Err(VectorDbError::invalid_argument("Query must be non-empty"));
    }
    match store.dimension() {
        None => Ok(false),
        Some(expected) if expected != query.len() => Err(VectorDbError::DimensionMismatch {
            expected,
            actual: query.len(),
        }),
        Some(_) => Ok(true),
    }
}

/// Score the documents at `positions` and keep the `k` best that pass `filter`.
pub(crate) fn rank<I>(
    store: &VectorStore,
    metric: SimilarityMetric,
    query: &[f32],
    k: usize,
    filter: Option<&MetadataFilter>,
    positions: I,
) -> Vec<SearchResult>
where
    I: IntoIterator<Item = usize>,
{
    let documents = store.documents();
    let mut top = TopK::new(k);

    for pos in positions {
        let doc = &documents[pos];
        if filter.map_or(false, |f| !f.matches(&doc.metadata)) {
            continue;
        }
        let score = metric.score(query, &doc.embedding);
        top.push(Scored::new(score, doc.id, pos));
    }

    top.into_sorted_vec()
        .into_iter()
        .map(|s| SearchResult {
            score: s.score,
            document: documents[s.slot].clone(),
        })
        .collect()
}
