//! Persisted build artifacts.
//!
//! Three JSON files under the data directory:
//! - `posts-meta.json`: post metadata, pretty-printed
//! - `embeddings.json`: per-post vectors, components rounded to 4 decimals
//! - `similarity-matrix.json`: per-post top-K neighbors, scores rounded
//!
//! All writes go through the atomic-replace backend, so a crash mid-write
//! never corrupts the previous snapshot.

use crate::corpus::PostMeta;
use crate::embed::{Neighbor, SimilarityEntry, VectorStore};
use crate::storage::{BackendLocal, StorageManager};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::SystemTime;

pub const META_FILE: &str = "posts-meta.json";
pub const EMBEDDINGS_FILE: &str = "embeddings.json";
pub const SIMILARITY_FILE: &str = "similarity-matrix.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Round to 4 decimal digits for compact storage.
pub fn round4(value: f32) -> f32 {
    (value * 10_000.0).round() / 10_000.0
}

pub struct DataStore {
    backend: BackendLocal,
}

impl DataStore {
    pub fn new(dir: &Path) -> std::io::Result<Self> {
        Ok(Self {
            backend: BackendLocal::new(dir)?,
        })
    }

    pub fn save_meta(&self, metas: &[PostMeta]) -> Result<(), ArtifactError> {
        let json = serde_json::to_vec_pretty(metas)?;
        self.backend.write(META_FILE, &json)?;
        Ok(())
    }

    pub fn save_embeddings(&self, store: &VectorStore) -> Result<(), ArtifactError> {
        let records: Vec<EmbeddingRecord> = store
            .iter()
            .map(|(id, vector)| EmbeddingRecord {
                id: id.to_string(),
                embedding: vector.iter().copied().map(round4).collect(),
            })
            .collect();

        let json = serde_json::to_vec(&records)?;
        self.backend.write(EMBEDDINGS_FILE, &json)?;
        Ok(())
    }

    pub fn save_similarity(&self, entries: &[SimilarityEntry]) -> Result<(), ArtifactError> {
        let rounded: Vec<SimilarityEntry> = entries
            .iter()
            .map(|entry| SimilarityEntry {
                id: entry.id.clone(),
                similar: entry
                    .similar
                    .iter()
                    .map(|n| Neighbor {
                        id: n.id.clone(),
                        score: round4(n.score),
                    })
                    .collect(),
            })
            .collect();

        let json = serde_json::to_vec(&rounded)?;
        self.backend.write(SIMILARITY_FILE, &json)?;
        Ok(())
    }

    pub fn load_meta(&self) -> Result<Vec<PostMeta>, ArtifactError> {
        let raw = self.backend.read(META_FILE)?;
        Ok(serde_json::from_slice(&raw)?)
    }

    pub fn load_embeddings(&self) -> Result<Vec<EmbeddingRecord>, ArtifactError> {
        let raw = self.backend.read(EMBEDDINGS_FILE)?;
        Ok(serde_json::from_slice(&raw)?)
    }

    pub fn load_similarity(&self) -> Result<Vec<SimilarityEntry>, ArtifactError> {
        let raw = self.backend.read(SIMILARITY_FILE)?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Latest modification time across the query-layer artifacts.
    /// `None` when neither file exists yet.
    pub fn modified(&self) -> Option<SystemTime> {
        let mtime = |name: &str| {
            std::fs::metadata(self.backend.base_dir.join(name))
                .and_then(|m| m.modified())
                .ok()
        };

        match (mtime(META_FILE), mtime(SIMILARITY_FILE)) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.123456), 0.1235);
        assert_eq!(round4(0.4999), 0.4999);
        assert_eq!(round4(-0.000049), -0.0);
        assert_eq!(round4(1.0), 1.0);
    }

    #[test]
    fn test_meta_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DataStore::new(tmp.path()).unwrap();

        let metas = vec![PostMeta {
            id: "p1".to_string(),
            title: "First".to_string(),
            category: "essays".to_string(),
            pub_date: "2024-03-01".to_string(),
            char_count: 1200,
            excerpt: "It begins".to_string(),
        }];

        store.save_meta(&metas).unwrap();
        assert_eq!(store.load_meta().unwrap(), metas);
    }

    #[test]
    fn test_similarity_roundtrip_preserves_order_and_rounding() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DataStore::new(tmp.path()).unwrap();

        let entries = vec![SimilarityEntry {
            id: "a".to_string(),
            similar: vec![
                Neighbor {
                    id: "b".to_string(),
                    score: 0.91234567,
                },
                Neighbor {
                    id: "c".to_string(),
                    score: 0.5,
                },
            ],
        }];

        store.save_similarity(&entries).unwrap();
        let loaded = store.load_similarity().unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "a");
        assert_eq!(loaded[0].similar[0].id, "b");
        assert_eq!(loaded[0].similar[0].score, 0.9123);
        assert_eq!(loaded[0].similar[1].score, 0.5);

        // saving the loaded entries again is byte-stable
        store.save_similarity(&loaded).unwrap();
        assert_eq!(store.load_similarity().unwrap(), loaded);
    }

    #[test]
    fn test_embeddings_quantized_on_save() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DataStore::new(tmp.path()).unwrap();

        let mut vectors = VectorStore::new();
        vectors
            .insert("a".to_string(), vec![0.123456, -0.987654])
            .unwrap();

        store.save_embeddings(&vectors).unwrap();
        let records = store.load_embeddings().unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].embedding, vec![0.1235, -0.9877]);
    }

    #[test]
    fn test_load_missing_artifact_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DataStore::new(tmp.path()).unwrap();

        assert!(matches!(store.load_meta(), Err(ArtifactError::Io(_))));
        assert!(store.modified().is_none());
    }

    #[test]
    fn test_modified_tracks_latest_write() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DataStore::new(tmp.path()).unwrap();

        store.save_meta(&[]).unwrap();
        let first = store.modified().unwrap();

        store.save_similarity(&[]).unwrap();
        let second = store.modified().unwrap();
        assert!(second >= first);
    }
}
