//! Blog post corpus access.
//!
//! The post store itself lives elsewhere; this module consumes a JSON
//! export of it. Posts without body text never enter a build.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::path::PathBuf;

/// Characters of body text kept in the metadata excerpt
const EXCERPT_LENGTH: usize = 200;

pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Post {
    pub post_id: String,
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub pub_date: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub char_count: usize,
}

/// Compact post metadata, persisted alongside the similarity matrix and
/// joined against neighbor ids at query time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostMeta {
    pub id: String,
    pub title: String,
    pub category: String,
    pub pub_date: String,
    pub char_count: usize,
    pub excerpt: String,
}

impl Post {
    pub fn meta(&self) -> PostMeta {
        let excerpt: String = self
            .content
            .chars()
            .take(EXCERPT_LENGTH)
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .collect();

        let category = if self.category.trim().is_empty() {
            UNCATEGORIZED.to_string()
        } else {
            self.category.clone()
        };

        let char_count = if self.char_count > 0 {
            self.char_count
        } else {
            self.content.chars().count()
        };

        PostMeta {
            id: self.post_id.clone(),
            title: self.title.clone(),
            category,
            pub_date: self.pub_date.clone(),
            char_count,
            excerpt,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corpus file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read access to the post store.
pub trait PostSource {
    /// All posts with non-empty body text, newest first. This ordering
    /// is the canonical document order for a build.
    fn list_posts(&self) -> Result<Vec<Post>, CorpusError>;

    fn get_post(&self, id: &str) -> Result<Option<Post>, CorpusError>;
}

/// Corpus backed by a JSON export file (array of posts).
pub struct JsonCorpus {
    path: PathBuf,
}

impl JsonCorpus {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl PostSource for JsonCorpus {
    fn list_posts(&self) -> Result<Vec<Post>, CorpusError> {
        let raw = std::fs::read(&self.path)?;
        let mut posts: Vec<Post> = serde_json::from_slice(&raw)?;

        posts.retain(|p| !p.content.trim().is_empty());

        // Newest first. Unparsable dates sort after parsable ones,
        // falling back to string order; the sort is stable so equal
        // keys keep their file order.
        posts.sort_by_key(|p| Reverse((parse_date(&p.pub_date), p.pub_date.clone())));

        Ok(posts)
    }

    fn get_post(&self, id: &str) -> Result<Option<Post>, CorpusError> {
        let posts = self.list_posts()?;
        Ok(posts.into_iter().find(|p| p.post_id == id))
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let head = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_corpus(posts: &[Post]) -> (tempfile::TempDir, JsonCorpus) {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("posts.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(serde_json::to_vec(posts).unwrap().as_slice())
            .unwrap();
        let corpus = JsonCorpus::new(path);
        (tmp, corpus)
    }

    fn post(id: &str, date: &str, content: &str) -> Post {
        Post {
            post_id: id.to_string(),
            title: format!("title {id}"),
            pub_date: date.to_string(),
            content: content.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_posts_filtered() {
        let (_tmp, corpus) = write_corpus(&[
            post("a", "2024-01-01", "some content"),
            post("b", "2024-01-02", ""),
            post("c", "2024-01-03", "   \n "),
        ]);

        let posts = corpus.list_posts().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].post_id, "a");
    }

    #[test]
    fn test_posts_sorted_newest_first() {
        let (_tmp, corpus) = write_corpus(&[
            post("old", "2020-05-01", "x"),
            post("new", "2024-01-01", "x"),
            post("mid", "2022-07-15", "x"),
        ]);

        let ids: Vec<String> = corpus
            .list_posts()
            .unwrap()
            .into_iter()
            .map(|p| p.post_id)
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_unparsable_dates_sort_last() {
        let (_tmp, corpus) = write_corpus(&[
            post("weird", "someday", "x"),
            post("dated", "2024-01-01", "x"),
        ]);

        let ids: Vec<String> = corpus
            .list_posts()
            .unwrap()
            .into_iter()
            .map(|p| p.post_id)
            .collect();
        assert_eq!(ids, vec!["dated", "weird"]);
    }

    #[test]
    fn test_get_post() {
        let (_tmp, corpus) = write_corpus(&[post("a", "2024-01-01", "body")]);

        assert!(corpus.get_post("a").unwrap().is_some());
        assert!(corpus.get_post("missing").unwrap().is_none());
    }

    #[test]
    fn test_meta_excerpt_flattens_newlines() {
        let p = post("a", "2024-01-01", "line one\nline two\r\nline three");
        let meta = p.meta();
        assert_eq!(meta.excerpt, "line one line two  line three");
    }

    #[test]
    fn test_meta_excerpt_truncated() {
        let p = post("a", "2024-01-01", &"x".repeat(500));
        let meta = p.meta();
        assert_eq!(meta.excerpt.chars().count(), 200);
    }

    #[test]
    fn test_meta_defaults() {
        let p = post("a", "2024-01-01", "hello");
        let meta = p.meta();
        assert_eq!(meta.category, UNCATEGORIZED);
        assert_eq!(meta.char_count, 5);
    }

    #[test]
    fn test_meta_keeps_explicit_char_count() {
        let mut p = post("a", "2024-01-01", "hello");
        p.char_count = 1234;
        assert_eq!(p.meta().char_count, 1234);
    }
}
