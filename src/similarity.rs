//! Similarity metrics for vector search.
//!
//! Every metric reports a *similarity*: higher always means more alike, so the
//! search engines can rank all variants with the same ordering.

use crate::error::{Result, VectorDbError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Similarity metrics for comparing two embeddings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Cosine of the angle between the vectors, in [-1, 1]
    Cosine,
    /// Raw dot product, unbounded
    DotProduct,
    /// `1 / (1 + L2 distance)`, in (0, 1]
    Euclidean,
}

impl SimilarityMetric {
    /// Compute the similarity between two embeddings using this metric
    pub fn compute(&self, a: &[f32], b: &[f32]) -> Result<f64> {
        check_operands(a, b)?;
        Ok(self.score(a, b))
    }

    /// Score two embeddings already known to share a dimension.
    pub(crate) fn score(&self, a: &[f32], b: &[f32]) -> f64 {
        match self {
            SimilarityMetric::Cosine => cosine(a, b),
            SimilarityMetric::DotProduct => dot(a, b),
            SimilarityMetric::Euclidean => 1.0 / (1.0 + euclidean_distance(a, b)),
        }
    }

    /// Whether the metric is driven by the angle between vectors.
    /// Random-hyperplane hashing preserves angles only.
    pub fn is_angular(&self) -> bool {
        matches!(self, SimilarityMetric::Cosine | SimilarityMetric::DotProduct)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SimilarityMetric::Cosine => "cosine",
            SimilarityMetric::DotProduct => "dot",
            SimilarityMetric::Euclidean => "euclidean",
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SimilarityMetric {
    type Err = VectorDbError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(SimilarityMetric::Cosine),
            "dot" | "dot_product" => Ok(SimilarityMetric::DotProduct),
            "euclidean" | "l2" => Ok(SimilarityMetric::Euclidean),
            other => Err(VectorDbError::invalid_argument(format!(
                "Unknown similarity metric: {}",
                other
            ))),
        }
    }
}

/// Cosine similarity of two embeddings. Zero-magnitude operands score `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    SimilarityMetric::Cosine.compute(a, b)
}

/// Dot product of two embeddings.
pub fn dot_product_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    SimilarityMetric::DotProduct.compute(a, b)
}

/// Euclidean similarity `1 / (1 + distance)` of two embeddings.
pub fn euclidean_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    SimilarityMetric::Euclidean.compute(a, b)
}

fn check_operands(a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() != b.len() {
        return Err(VectorDbError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    if a.is_empty() {
        return Err(VectorDbError::invalid_argument("Embeddings must be non-empty"));
    }
    Ok(())
}

// Accumulates in f64
fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| x as f64 * y as f64)
        .sum()
}

fn squared_norm(a: &[f32]) -> f64 {
    a.iter().map(|&x| x as f64 * x as f64).sum()
}

fn cosine(a: &[f32], b: &[f32]) -> f64 {
    let norm_a = squared_norm(a);
    let norm_b = squared_norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot(a, b) / (norm_a * norm_b).sqrt();

    // Clamp to [-1, 1] to handle floating point errors
    similarity.clamp(-1.0, 1.0)
}

fn euclidean_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}
