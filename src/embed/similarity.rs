//! Cosine similarity and top-K neighbor selection.

use crate::embed::store::VectorStore;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub id: String,
    pub score: f32,
}

/// Persisted similarity relation for one post: its top-K neighbors,
/// descending by score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityEntry {
    pub id: String,
    pub similar: Vec<Neighbor>,
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Standard cosine similarity in [-1, 1]. Zero-norm inputs score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let denom = l2_norm(a) * l2_norm(b);
    if denom < f32::EPSILON {
        return 0.0;
    }
    dot(a, b) / denom
}

fn sort_descending(scores: &mut [Neighbor]) {
    // Stable sort: ties keep store insertion order, so rebuilds
    // reproduce identical neighbor lists.
    scores.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}

/// Top `k` neighbors of `id`, never including `id` itself. Returns an
/// empty list for an unknown id.
pub fn top_k(store: &VectorStore, id: &str, k: usize) -> Vec<Neighbor> {
    let Some(anchor) = store.get(id) else {
        return vec![];
    };

    let mut scores: Vec<Neighbor> = store
        .iter()
        .filter(|(other, _)| *other != id)
        .map(|(other, vector)| Neighbor {
            id: other.to_string(),
            score: cosine_similarity(anchor, vector),
        })
        .collect();

    sort_descending(&mut scores);
    scores.truncate(k);
    scores
}

/// One `SimilarityEntry` per stored post, in store order.
///
/// Norms are computed once per vector; each pair's score is the same
/// expression `dot / (norm_a * norm_b)` as `cosine_similarity`, so the
/// output matches the pairwise recompute exactly. Anchors are scored in
/// parallel and collected back in anchor order, so thread scheduling
/// never changes the result.
pub fn similarity_matrix(store: &VectorStore, k: usize) -> Vec<SimilarityEntry> {
    let entries: Vec<(&str, &[f32])> = store.iter().collect();
    let norms: Vec<f32> = entries.iter().map(|(_, v)| l2_norm(v)).collect();

    entries
        .par_iter()
        .enumerate()
        .map(|(i, (id, anchor))| {
            let mut scores = Vec::with_capacity(entries.len().saturating_sub(1));

            for (j, (other, vector)) in entries.iter().enumerate() {
                if i == j {
                    continue;
                }

                let denom = norms[i] * norms[j];
                let score = if denom < f32::EPSILON {
                    0.0
                } else {
                    dot(anchor, vector) / denom
                };

                scores.push(Neighbor {
                    id: other.to_string(),
                    score,
                });
            }

            sort_descending(&mut scores);
            scores.truncate(k);

            SimilarityEntry {
                id: id.to_string(),
                similar: scores,
            }
        })
        .collect()
}
