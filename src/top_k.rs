//! Bounded best-k selection with a deterministic tie-break.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// A scored candidate: the score plus the document id and the caller's slot for it.
#[derive(Debug, Clone, Copy)]
pub struct Scored {
    pub score: f64,
    pub id: u64,
    pub slot: usize,
}

impl Scored {
    pub fn new(score: f64, id: u64, slot: usize) -> Self {
        Self { score, id, slot }
    }

    // NaN ranks below every real score.
    fn rank_key(&self) -> f64 {
        if self.score.is_nan() {
            f64::NEG_INFINITY
        } else {
            self.score
        }
    }
}

impl PartialEq for Scored {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scored {}

impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Greater means better: higher score first, then the smaller id.
impl Ord for Scored {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank_key()
            .total_cmp(&other.rank_key())
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Keeps the `k` best candidates seen so far in O(log k) per push.
///
/// Backed by a min-heap so the worst retained candidate is always on top
/// and can be evicted when a better one arrives.
#[derive(Debug)]
pub struct TopK {
    heap: BinaryHeap<Reverse<Scored>>,
    k: usize,
}

impl TopK {
    pub fn new(k: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(1024)),
            k,
        }
    }

    /// Offer a candidate; it is kept only if it beats the current worst.
    pub fn push(&mut self, candidate: Scored) {
        if self.k == 0 {
            return;
        }
        if self.heap.len() < self.k {
            self.heap.push(Reverse(candidate));
            return;
        }
        if let Some(Reverse(worst)) = self.heap.peek() {
            if candidate > *worst {
                self.heap.pop();
                self.heap.push(Reverse(candidate));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drain into a Vec ordered best first.
    pub fn into_sorted_vec(self) -> Vec<Scored> {
        // Ascending order of Reverse<_> is descending order of Scored
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(s)| s)
            .collect()
    }
}
