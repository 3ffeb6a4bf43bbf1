//! Read-only query layer over the persisted artifacts.
//!
//! `Catalog` is an explicit in-memory cache of the metadata and
//! similarity files. It reloads when the artifact files change on disk
//! (a rebuild replaced them) and never on individual requests. Queries
//! degrade to empty results, never to errors: a missing artifact, a
//! missing entry, or a missing join target each produce a usable
//! response.

use crate::artifacts::DataStore;
use crate::corpus::PostMeta;
use crate::embed::SimilarityEntry;
use crate::graph::{build_network, NetworkGraph};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;

/// Marker returned while no build artifacts exist.
pub const NO_DATA_ERROR: &str = "data files not found, run `bx build` first";

/// Placeholders for neighbors whose metadata is missing.
const UNKNOWN_TITLE: &str = "Untitled";
const UNKNOWN_CATEGORY: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarPost {
    pub post_id: String,
    pub title: String,
    pub category: String,
    pub pub_date: String,
    pub similarity: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarResponse {
    pub similar: Vec<SimilarPost>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct Snapshot {
    metas: Vec<PostMeta>,
    meta_index: HashMap<String, usize>,
    entries: Vec<SimilarityEntry>,
    entry_index: HashMap<String, usize>,
}

pub struct Catalog {
    store: DataStore,
    snapshot: Option<Snapshot>,
    loaded_at: Option<SystemTime>,
}

impl Catalog {
    pub fn new(store: DataStore) -> Self {
        Self {
            store,
            snapshot: None,
            loaded_at: None,
        }
    }

    /// Reload the snapshot if the artifacts changed on disk since the
    /// last load. Cheap no-op otherwise.
    pub fn refresh(&mut self) {
        let current = self.store.modified();
        if current == self.loaded_at && self.snapshot.is_some() {
            return;
        }
        if current.is_none() {
            self.snapshot = None;
            self.loaded_at = None;
            return;
        }

        match self.load_snapshot() {
            Ok(snapshot) => {
                log::info!(
                    "loaded {} posts, {} similarity entries",
                    snapshot.metas.len(),
                    snapshot.entries.len()
                );
                self.snapshot = Some(snapshot);
            }
            Err(err) => {
                log::warn!("failed to load artifacts: {err}");
                self.snapshot = None;
            }
        }
        self.loaded_at = current;
    }

    fn load_snapshot(&self) -> Result<Snapshot, crate::artifacts::ArtifactError> {
        let metas = self.store.load_meta()?;
        let entries = self.store.load_similarity()?;

        let meta_index = metas
            .iter()
            .enumerate()
            .map(|(i, m)| (m.id.clone(), i))
            .collect();
        let entry_index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();

        Ok(Snapshot {
            metas,
            meta_index,
            entries,
            entry_index,
        })
    }

    pub fn available(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Posts similar to `id`, filtered by `min_score`, at most `limit`,
    /// joined against metadata. Unknown ids yield an empty list.
    pub fn similar_to(&self, id: &str, min_score: f32, limit: usize) -> SimilarResponse {
        let Some(snapshot) = &self.snapshot else {
            return SimilarResponse {
                similar: vec![],
                error: Some(NO_DATA_ERROR.to_string()),
            };
        };

        let neighbors = snapshot
            .entry_index
            .get(id)
            .map(|&i| snapshot.entries[i].similar.as_slice())
            .unwrap_or(&[]);

        let similar = neighbors
            .iter()
            .filter(|n| n.score >= min_score)
            .take(limit)
            .map(|n| {
                let meta = snapshot
                    .meta_index
                    .get(&n.id)
                    .map(|&i| &snapshot.metas[i]);

                match meta {
                    Some(meta) => SimilarPost {
                        post_id: n.id.clone(),
                        title: meta.title.clone(),
                        category: meta.category.clone(),
                        pub_date: meta.pub_date.clone(),
                        similarity: n.score,
                    },
                    None => SimilarPost {
                        post_id: n.id.clone(),
                        title: UNKNOWN_TITLE.to_string(),
                        category: UNKNOWN_CATEGORY.to_string(),
                        pub_date: String::new(),
                        similarity: n.score,
                    },
                }
            })
            .collect();

        SimilarResponse {
            similar,
            error: None,
        }
    }

    /// Visualization graph over the most recent `node_cap` posts.
    pub fn network(&self, threshold: f32, node_cap: usize) -> NetworkGraph {
        let Some(snapshot) = &self.snapshot else {
            return NetworkGraph::empty_with_error(NO_DATA_ERROR);
        };

        build_network(&snapshot.metas, &snapshot.entries, threshold, node_cap)
    }
}
