//! Exact L2 vector index

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Error, Result};

/// Brute-force index over fixed-dimension vectors using squared Euclidean distance
///
/// Vectors are stored contiguously; a vector's position is its insertion order and shifts
/// down when earlier vectors are removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatL2Index {
    dimensions: usize,
    vectors: Vec<f32>,
}

impl FlatL2Index {
    /// Create an empty index
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vectors: Vec::new(),
        }
    }

    /// Vector dimensions
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of stored vectors
    pub fn len(&self) -> usize {
        if self.dimensions == 0 {
            0
        } else {
            self.vectors.len() / self.dimensions
        }
    }

    /// Whether the index holds no vectors
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(Error::vector_store(format!(
                "Dimension mismatch: index has {}, vector has {}",
                self.dimensions,
                vector.len()
            )));
        }
        Ok(())
    }

    /// Append a vector and return its position
    ///
    /// An empty index takes its dimensions from the first vector added.
    pub fn add(&mut self, vector: &[f32]) -> Result<usize> {
        if self.is_empty() && !vector.is_empty() {
            self.dimensions = vector.len();
        }
        self.check_dimensions(vector)?;
        let position = self.len();
        self.vectors.extend_from_slice(vector);
        Ok(position)
    }

    /// Up to `k` nearest positions with their squared L2 distances, closest first
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        self.check_dimensions(query)?;

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dimensions)
            .enumerate()
            .map(|(pos, v)| (pos, squared_l2(query, v)))
            .collect();

        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        Ok(scored)
    }

    /// Stored vector at `position`
    pub fn reconstruct(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimensions)?;
        self.vectors.get(start..start + self.dimensions)
    }

    /// Remove the given positions and compact the remaining vectors
    pub fn remove(&mut self, positions: &HashSet<usize>) -> usize {
        if positions.is_empty() {
            return 0;
        }

        let before = self.len();
        let dims = self.dimensions;
        let kept: Vec<f32> = self
            .vectors
            .chunks_exact(dims)
            .enumerate()
            .filter(|(pos, _)| !positions.contains(pos))
            .flat_map(|(_, v)| v.iter().copied())
            .collect();

        self.vectors = kept;
        before - self.len()
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
