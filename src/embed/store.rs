//! Append-only vector store for a single build.
//!
//! Keyed by post id, iterable in insertion order. Insertion order is
//! load-bearing: it is the tie-break order for top-K selection, so a
//! rebuild over the same corpus reproduces identical neighbor lists.

use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("cannot store zero-norm vector")]
    ZeroNormVector,

    #[error("duplicate post id: {0}")]
    DuplicateId(String),
}

#[derive(Debug)]
pub struct VectorStore {
    ids: Vec<String>,
    vectors: Vec<Vec<f32>>,
    index: HashMap<String, usize>,
    dimensions: Option<usize>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self {
            ids: Vec::new(),
            vectors: Vec::new(),
            index: HashMap::new(),
            dimensions: None,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
            vectors: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
            dimensions: None,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Dimensionality, fixed by the first inserted vector.
    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&[f32]> {
        self.index.get(id).map(|&i| self.vectors[i].as_slice())
    }

    /// Insertion position of `id`, if present.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f32])> {
        self.ids
            .iter()
            .zip(self.vectors.iter())
            .map(|(id, v)| (id.as_str(), v.as_slice()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(|id| id.as_str())
    }

    /// Append a vector. The first insert fixes the store's
    /// dimensionality; later inserts must match it.
    pub fn insert(&mut self, id: String, vector: Vec<f32>) -> Result<(), StoreError> {
        if let Some(dims) = self.dimensions {
            if vector.len() != dims {
                return Err(StoreError::DimensionMismatch {
                    expected: dims,
                    got: vector.len(),
                });
            }
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm < f32::EPSILON {
            return Err(StoreError::ZeroNormVector);
        }

        if self.index.contains_key(&id) {
            return Err(StoreError::DuplicateId(id));
        }

        self.dimensions.get_or_insert(vector.len());
        self.index.insert(id.clone(), self.ids.len());
        self.ids.push(id);
        self.vectors.push(vector);

        Ok(())
    }
}

impl Default for VectorStore {
    fn default() -> Self {
        Self::new()
    }
}
