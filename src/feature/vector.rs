//! Sparse feature vectors.

use serde::{Deserialize, Serialize};

use crate::error::{JobCheckError, Result};

/// A sparse vector of fixed dimension.
///
/// Non-zero entries are stored as parallel `indices`/`values` arrays sorted
/// by index. Entries not stored are zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    dimension: usize,
    indices: Vec<u32>,
    values: Vec<f64>,
}

impl FeatureVector {
    /// The all-zero vector of the given dimension.
    pub fn zeros(dimension: usize) -> Self {
        FeatureVector {
            dimension,
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build a vector from `(index, value)` pairs.
    ///
    /// Pairs may arrive in any order; zero values are dropped. Indices must be
    /// unique and below `dimension`.
    pub fn from_pairs(dimension: usize, mut pairs: Vec<(u32, f64)>) -> Result<Self> {
        pairs.sort_unstable_by_key(|&(index, _)| index);

        let mut indices = Vec::with_capacity(pairs.len());
        let mut values = Vec::with_capacity(pairs.len());
        for (index, value) in pairs {
            if index as usize >= dimension {
                return Err(JobCheckError::data(format!(
                    "feature index {index} out of range for dimension {dimension}"
                )));
            }
            if indices.last() == Some(&index) {
                return Err(JobCheckError::data(format!("duplicate feature index {index}")));
            }
            if value != 0.0 {
                indices.push(index);
                values.push(value);
            }
        }

        Ok(FeatureVector {
            dimension,
            indices,
            values,
        })
    }

    /// Build a sparse vector from a dense slice.
    pub fn from_dense(dense: &[f64]) -> Self {
        let mut indices = Vec::new();
        let mut values = Vec::new();
        for (index, &value) in dense.iter().enumerate() {
            if value != 0.0 {
                indices.push(index as u32);
                values.push(value);
            }
        }
        FeatureVector {
            dimension: dense.len(),
            indices,
            values,
        }
    }

    /// The dimension of the vector space.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored (non-zero) entries.
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Check if every entry is zero.
    pub fn is_zero(&self) -> bool {
        self.indices.is_empty()
    }

    /// Value at `index`; zero when not stored.
    pub fn get(&self, index: usize) -> f64 {
        match self.indices.binary_search(&(index as u32)) {
            Ok(position) => self.values[position],
            Err(_) => 0.0,
        }
    }

    /// Stored indices in ascending order.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Stored values, aligned with [`indices`](Self::indices).
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Iterate over the non-zero entries.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices
            .iter()
            .zip(self.values.iter())
            .map(|(&index, &value)| (index as usize, value))
    }

    /// Dot product with a dense weight vector of the same dimension.
    pub fn dot(&self, weights: &[f64]) -> f64 {
        self.iter().map(|(index, value)| weights[index] * value).sum()
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Expand to a dense vector.
    pub fn to_dense(&self) -> Vec<f64> {
        let mut dense = vec![0.0; self.dimension];
        for (index, value) in self.iter() {
            dense[index] = value;
        }
        dense
    }
}
