//! Deterministic embedding provider for tests. No network involved.

use crate::embed::{EmbeddingProvider, ProviderError};
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

/// Mock provider keyed by post title (the first line of the submitted
/// text). Titles can be given fixed vectors to control similarity;
/// everything else gets a deterministic hash-derived vector.
#[derive(Default)]
pub struct MockProvider {
    /// Fixed vectors by title
    pub vectors: HashMap<String, Vec<f32>>,
    /// Fail any request containing more than one text
    pub fail_batches: bool,
    /// Titles whose single-post requests fail
    pub fail_titles: HashSet<String>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vectors(vectors: &[(&str, Vec<f32>)]) -> Self {
        Self {
            vectors: vectors
                .iter()
                .map(|(title, v)| (title.to_string(), v.clone()))
                .collect(),
            ..Self::default()
        }
    }

    fn title_of(text: &str) -> &str {
        text.lines().next().unwrap_or("")
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let title = Self::title_of(text);
        if let Some(vector) = self.vectors.get(title) {
            return vector.clone();
        }

        // Deterministic pseudo-vector; strictly positive components so
        // the norm is never zero.
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();
        (0..8)
            .map(|i| ((seed >> (i * 8)) & 0xFF) as f32 / 255.0 + 0.01)
            .collect()
    }
}

impl EmbeddingProvider for MockProvider {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if self.fail_batches && texts.len() > 1 {
            return Err(ProviderError::Status {
                status: 500,
                body: "batch rejected".to_string(),
            });
        }

        texts
            .iter()
            .map(|text| {
                if self.fail_titles.contains(Self::title_of(text)) {
                    Err(ProviderError::Status {
                        status: 500,
                        body: format!("rejected {}", Self::title_of(text)),
                    })
                } else {
                    Ok(self.vector_for(text))
                }
            })
            .collect()
    }
}
