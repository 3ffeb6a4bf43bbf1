use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate embeddings and similarity artifacts for the corpus.
    ///
    /// Requires OPENAI_API_KEY.
    Build {
        /// Path to the corpus JSON export (overrides config)
        #[clap(short, long)]
        corpus: Option<String>,
    },

    /// Start bx as a read-only query service.
    Daemon {},

    /// Print posts similar to the given post id.
    Similar {
        /// Post id
        id: String,

        /// Minimum similarity score
        #[clap(short, long)]
        min_score: Option<f32>,

        /// Maximum number of results
        #[clap(short, long)]
        limit: Option<usize>,
    },

    /// Print the similarity network graph.
    Network {
        /// Similarity threshold for graph edges
        #[clap(short, long)]
        threshold: Option<f32>,
    },
}
