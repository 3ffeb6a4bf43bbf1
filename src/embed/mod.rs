//! Embedding generation and similarity computation.
//!
//! This module turns the blog corpus into fixed-length vectors via an
//! external embedding provider and derives the top-K similarity relation
//! from them.
//!
//! # Architecture
//!
//! - `provider`: Adapter for an OpenAI-compatible embeddings API
//! - `builder`: Batch pipeline with per-post retry and skip tracking
//! - `store`: Append-only, insertion-ordered vector store for one build
//! - `similarity`: Cosine similarity, top-K selection, all-pairs matrix

pub mod builder;
pub mod provider;
pub mod similarity;
pub mod store;

pub use builder::{build_vectors, BuildOpts, BuildOutcome, SkippedPost};
pub use provider::{EmbeddingProvider, OpenAiProvider, ProviderError};
pub use similarity::{cosine_similarity, similarity_matrix, top_k, Neighbor, SimilarityEntry};
pub use store::{StoreError, VectorStore};
