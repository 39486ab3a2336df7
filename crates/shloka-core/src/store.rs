//! In-memory vector store for verse embeddings. Supports append and exact top-k search.
//!
//! Every stored vector shares one dimension, fixed by the first vector added.
//! Search is a brute-force scan by squared Euclidean distance, so the nearest
//! neighbor is always the true one and repeated queries give identical answers.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// An embedding vector.
pub type Vector = Vec<f32>;

/// A search hit: the row id of a stored vector and its squared distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub row: usize,
    pub distance: f32,
}

/// Append-only vector store. Vectors are kept row-major in one contiguous buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorStore {
    /// `None` until the first vector is added.
    dim: Option<usize>,
    data: Vec<f32>,
    count: usize,
}

impl VectorStore {
    pub fn new() -> Self {
        Self {
            dim: None,
            data: Vec::new(),
            count: 0,
        }
    }

    /// Rebuild a store from its raw parts (used when loading from disk).
    pub(crate) fn from_raw(dim: usize, count: usize, data: Vec<f32>) -> Result<Self, StoreError> {
        if data.len() != dim * count {
            return Err(StoreError::RawLength {
                expected: dim * count,
                actual: data.len(),
            });
        }
        Ok(Self {
            dim: if count == 0 { None } else { Some(dim) },
            data,
            count,
        })
    }

    /// Append vectors in order, assigning consecutive row ids from the current size.
    ///
    /// All vectors are checked before any is stored: on `DimensionMismatch`
    /// the store is left unchanged.
    pub fn add<V: AsRef<[f32]>>(&mut self, vectors: &[V]) -> Result<(), StoreError> {
        let Some(first) = vectors.first() else {
            return Ok(());
        };
        let dim = self.dim.unwrap_or(first.as_ref().len());
        if let Some(bad) = vectors.iter().find(|v| v.as_ref().len() != dim) {
            return Err(StoreError::DimensionMismatch {
                expected: dim,
                actual: bad.as_ref().len(),
            });
        }
        self.data.reserve(dim * vectors.len());
        for v in vectors {
            self.data.extend_from_slice(v.as_ref());
        }
        self.dim = Some(dim);
        self.count += vectors.len();
        Ok(())
    }

    /// Return the `k` nearest rows to `query`, closest first.
    /// Equal distances are ordered by lower row id.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, StoreError> {
        if k == 0 {
            return Err(StoreError::InvalidK);
        }
        let dim = match self.dim {
            Some(dim) if self.count > 0 => dim,
            _ => return Err(StoreError::EmptyStore),
        };
        if query.len() != dim {
            return Err(StoreError::DimensionMismatch {
                expected: dim,
                actual: query.len(),
            });
        }

        // Max-heap of the best k seen so far; the root is the worst of them.
        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k.min(self.count) + 1);
        for row in 0..self.count {
            let candidate = Candidate(Neighbor {
                row,
                distance: squared_l2(query, self.row(row)),
            });
            if heap.len() < k {
                heap.push(candidate);
            } else if let Some(mut worst) = heap.peek_mut() {
                if candidate < *worst {
                    *worst = candidate;
                }
            }
        }
        Ok(heap.into_sorted_vec().into_iter().map(|c| c.0).collect())
    }

    /// The stored vector at `row`, if any.
    pub fn get(&self, row: usize) -> Option<&[f32]> {
        (row < self.count).then(|| self.row(row))
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Dimension shared by all vectors; `None` while the store is empty.
    pub fn dimension(&self) -> Option<usize> {
        self.dim
    }

    /// All vector components, row-major.
    pub(crate) fn as_raw(&self) -> &[f32] {
        &self.data
    }

    fn row(&self, row: usize) -> &[f32] {
        let dim = self.dim.unwrap_or(0);
        &self.data[row * dim..(row + 1) * dim]
    }
}

/// Sum of squared component differences. Accumulated in index order.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Heap entry ordered by (distance, row id).
#[derive(Debug, Clone, Copy)]
struct Candidate(Neighbor);

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .distance
            .total_cmp(&other.0.distance)
            .then(self.0.row.cmp(&other.0.row))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("vector store is empty; build or load an index first")]
    EmptyStore,
    #[error("k must be at least 1")]
    InvalidK,
    #[error("raw vector data has {actual} components, expected {expected}")]
    RawLength { expected: usize, actual: usize },
}
