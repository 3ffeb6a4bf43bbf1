//! Visualization graph derived from the similarity matrix.
//!
//! Computed on each read, never persisted. Nodes are the most recent N
//! posts; edges are neighbor pairs inside that subset scoring at or
//! above the threshold, deduplicated so A-B is emitted once even when
//! both entries list each other.

use crate::corpus::PostMeta;
use crate::embed::{Neighbor, SimilarityEntry};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub title: String,
    pub category: String,
    pub year: String,
    pub pub_date: String,
    pub connections: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub source: String,
    pub target: String,
    pub weight: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub posts: usize,
    pub connections: usize,
    // the consumer expects this one key camel-cased
    #[serde(rename = "totalPosts")]
    pub total_posts: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkGraph {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    pub stats: GraphStats,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NetworkGraph {
    /// Degraded response for when no artifacts exist yet.
    pub fn empty_with_error(message: &str) -> Self {
        Self {
            nodes: vec![],
            links: vec![],
            stats: GraphStats {
                posts: 0,
                connections: 0,
                total_posts: 0,
            },
            error: Some(message.to_string()),
        }
    }
}

fn year_of(pub_date: &str) -> String {
    pub_date
        .get(..4)
        .filter(|y| y.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or("unknown")
        .to_string()
}

/// Derive the visualization graph.
///
/// `metas` must be ordered newest first; the first `node_cap` posts form
/// the node subset. An edge requires both endpoints in the subset and
/// `score >= threshold` (inclusive).
pub fn build_network(
    metas: &[PostMeta],
    entries: &[SimilarityEntry],
    threshold: f32,
    node_cap: usize,
) -> NetworkGraph {
    let sim_map: HashMap<&str, &[Neighbor]> = entries
        .iter()
        .map(|e| (e.id.as_str(), e.similar.as_slice()))
        .collect();

    let recent = &metas[..metas.len().min(node_cap)];
    let subset: HashSet<&str> = recent.iter().map(|m| m.id.as_str()).collect();

    let mut links: Vec<Link> = Vec::new();
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut degree: HashMap<&str, usize> = HashMap::new();

    for meta in recent {
        let neighbors = sim_map.get(meta.id.as_str()).copied().unwrap_or(&[]);

        for neighbor in neighbors {
            if neighbor.score < threshold {
                continue;
            }
            if !subset.contains(neighbor.id.as_str()) {
                continue;
            }

            // canonical unordered pair key
            let key = if meta.id.as_str() <= neighbor.id.as_str() {
                (meta.id.as_str(), neighbor.id.as_str())
            } else {
                (neighbor.id.as_str(), meta.id.as_str())
            };
            if !seen.insert(key) {
                continue;
            }

            links.push(Link {
                source: meta.id.clone(),
                target: neighbor.id.clone(),
                weight: neighbor.score,
            });

            *degree.entry(meta.id.as_str()).or_default() += 1;
            *degree.entry(neighbor.id.as_str()).or_default() += 1;
        }
    }

    let nodes: Vec<Node> = recent
        .iter()
        .map(|meta| Node {
            id: meta.id.clone(),
            title: meta.title.clone(),
            category: meta.category.clone(),
            year: year_of(&meta.pub_date),
            pub_date: meta.pub_date.clone(),
            connections: degree.get(meta.id.as_str()).copied().unwrap_or(0),
        })
        .collect();

    NetworkGraph {
        stats: GraphStats {
            posts: nodes.len(),
            connections: links.len(),
            total_posts: metas.len(),
        },
        nodes,
        links,
        error: None,
    }
}
