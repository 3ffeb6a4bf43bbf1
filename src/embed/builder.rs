//! Batch embedding pipeline.
//!
//! Submits posts to the provider in fixed-size batches. A failed batch
//! falls back to one request per post; posts that still fail are
//! recorded as skips and the build carries on. A single bad post never
//! aborts a build.

use crate::corpus::Post;
use crate::embed::provider::EmbeddingProvider;
use crate::embed::store::VectorStore;
use indicatif::ProgressBar;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BuildOpts {
    /// Posts per provider request
    pub batch_size: usize,
    /// Character budget for a post's body in a batched request
    pub batch_char_limit: usize,
    /// Character budget for a post's body in a single-post retry
    pub single_char_limit: usize,
    /// Pause between batch submissions
    pub batch_pause: Duration,
}

impl Default for BuildOpts {
    fn default() -> Self {
        Self {
            batch_size: 100,
            batch_char_limit: 6000,
            single_char_limit: 8000,
            batch_pause: Duration::from_millis(500),
        }
    }
}

#[derive(Debug)]
pub struct SkippedPost {
    pub post_id: String,
    pub reason: String,
}

#[derive(Debug)]
pub struct BuildOutcome {
    pub store: VectorStore,
    pub skipped: Vec<SkippedPost>,
}

/// Text submitted to the provider: title prefix plus truncated body.
fn embedding_text(post: &Post, char_limit: usize) -> String {
    let body: String = post.content.chars().take(char_limit).collect();
    format!("{}\n\n{}", post.title, body)
}

/// Embed every post, in list order. Vectors land in the returned store
/// in that same order; posts the provider could not embed are listed in
/// `skipped`. The returned key set is a subset of the input ids.
pub fn build_vectors(
    posts: &[Post],
    provider: &dyn EmbeddingProvider,
    opts: &BuildOpts,
) -> BuildOutcome {
    let mut store = VectorStore::with_capacity(posts.len());
    let mut skipped = Vec::new();

    let total_batches = posts.len().div_ceil(opts.batch_size.max(1));
    let bar = ProgressBar::new(posts.len() as u64);

    for (batch_no, batch) in posts.chunks(opts.batch_size.max(1)).enumerate() {
        if batch_no > 0 {
            // provider rate limits
            std::thread::sleep(opts.batch_pause);
        }

        log::info!("embedding batch {}/{}", batch_no + 1, total_batches);

        let texts: Vec<String> = batch
            .iter()
            .map(|p| embedding_text(p, opts.batch_char_limit))
            .collect();

        match provider.embed(&texts) {
            Ok(vectors) if vectors.len() == batch.len() => {
                for (post, vector) in batch.iter().zip(vectors) {
                    record(&mut store, &mut skipped, post, vector);
                }
            }
            Ok(vectors) => {
                log::warn!(
                    "batch {} returned {} vectors for {} posts, retrying posts individually",
                    batch_no + 1,
                    vectors.len(),
                    batch.len()
                );
                retry_individually(batch, provider, opts, &mut store, &mut skipped);
            }
            Err(err) => {
                log::warn!(
                    "batch {} failed ({err}), retrying posts individually",
                    batch_no + 1
                );
                retry_individually(batch, provider, opts, &mut store, &mut skipped);
            }
        }

        bar.inc(batch.len() as u64);
    }

    bar.finish_and_clear();

    BuildOutcome { store, skipped }
}

fn retry_individually(
    batch: &[Post],
    provider: &dyn EmbeddingProvider,
    opts: &BuildOpts,
    store: &mut VectorStore,
    skipped: &mut Vec<SkippedPost>,
) {
    for post in batch {
        let text = embedding_text(post, opts.single_char_limit);

        match provider.embed(std::slice::from_ref(&text)) {
            Ok(vectors) => match vectors.into_iter().next() {
                Some(vector) => record(store, skipped, post, vector),
                None => skip(skipped, post, "provider returned no embedding"),
            },
            Err(err) => skip(skipped, post, &err.to_string()),
        }
    }
}

fn record(store: &mut VectorStore, skipped: &mut Vec<SkippedPost>, post: &Post, vector: Vec<f32>) {
    if let Err(err) = store.insert(post.post_id.clone(), vector) {
        skip(skipped, post, &err.to_string());
    }
}

fn skip(skipped: &mut Vec<SkippedPost>, post: &Post, reason: &str) {
    log::error!("skipping post {}: {reason}", post.post_id);
    skipped.push(SkippedPost {
        post_id: post.post_id.clone(),
        reason: reason.to_string(),
    });
}
