//! One random-hyperplane hash table.

use rand::Rng;
use rand_distr::StandardNormal;
use std::collections::HashMap;

/// A set of random unit hyperplanes and the buckets of document ids they induce.
///
/// A vector's code has bit `i` set when its dot product with hyperplane `i`
/// is non-negative, so vectors separated by a small angle tend to share a code.
#[derive(Debug, Clone)]
pub struct HyperplaneTable {
    planes: Vec<Vec<f64>>,
    buckets: HashMap<u64, Vec<u64>>,
}

impl HyperplaneTable {
    /// Sample `hashes` unit normals in `dimension` dimensions.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, dimension: usize, hashes: usize) -> Self {
        let planes = (0..hashes)
            .map(|_| random_unit_vector(rng, dimension))
            .collect();
        Self {
            planes,
            buckets: HashMap::new(),
        }
    }

    /// Hash code of `v`, one bit per hyperplane.
    pub fn code(&self, v: &[f32]) -> u64 {
        self.planes
            .iter()
            .enumerate()
            .fold(0u64, |code, (bit, plane)| {
                let side: f64 = plane
                    .iter()
                    .zip(v.iter())
                    .map(|(&p, &x)| p * x as f64)
                    .sum();
                if side >= 0.0 {
                    code | (1 << bit)
                } else {
                    code
                }
            })
    }

    pub fn insert(&mut self, id: u64, embedding: &[f32]) {
        let code = self.code(embedding);
        self.buckets.entry(code).or_default().push(id);
    }

    /// Ids sharing `v`'s bucket.
    pub fn bucket_for(&self, v: &[f32]) -> &[u64] {
        self.buckets
            .get(&self.code(v))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of non-empty buckets
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn planes(&self) -> &[Vec<f64>] {
        &self.planes
    }
}

fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R, dimension: usize) -> Vec<f64> {
    loop {
        let mut v: Vec<f64> = (0..dimension).map(|_| rng.sample(StandardNormal)).collect();
        let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        // An all-zero draw has no direction; sample again
        if norm > f64::EPSILON {
            for x in &mut v {
                *x /= norm;
            }
            return v;
        }
    }
}
