use anyhow::bail;
use clap::Parser;
use std::path::PathBuf;

mod artifacts;
mod cli;
mod config;
mod corpus;
mod embed;
mod graph;
mod query;
mod storage;
#[cfg(test)]
mod tests;
mod web;

use artifacts::DataStore;
use config::Config;
use corpus::{JsonCorpus, Post, PostMeta, PostSource};
use embed::{BuildOpts, OpenAiProvider};
use query::Catalog;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = cli::Args::parse();

    let base_path = config::base_path()?;
    let config = Config::load_with(&base_path)?;

    match args.command {
        cli::Command::Build { corpus } => run_build(&config, corpus),

        cli::Command::Daemon {} => {
            let store = DataStore::new(&config.data_dir())?;
            let catalog = Catalog::new(store);
            web::start_daemon(catalog, config);
            Ok(())
        }

        cli::Command::Similar {
            id,
            min_score,
            limit,
        } => {
            let mut catalog = load_catalog(&config)?;
            let response = catalog_query(&mut catalog, |c| {
                c.similar_to(
                    &id,
                    min_score.unwrap_or(config.similarity.min_score),
                    limit.unwrap_or(config.similarity.top_k),
                )
            });
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }

        cli::Command::Network { threshold } => {
            let mut catalog = load_catalog(&config)?;
            let response = catalog_query(&mut catalog, |c| {
                c.network(
                    threshold.unwrap_or(config.similarity.graph_threshold),
                    config.similarity.graph_node_cap,
                )
            });
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
    }
}

fn load_catalog(config: &Config) -> anyhow::Result<Catalog> {
    let store = DataStore::new(&config.data_dir())?;
    Ok(Catalog::new(store))
}

fn catalog_query<T>(catalog: &mut Catalog, query: impl FnOnce(&Catalog) -> T) -> T {
    catalog.refresh();
    query(catalog)
}

fn run_build(config: &Config, corpus_override: Option<String>) -> anyhow::Result<()> {
    // The one fatal pre-flight check: no credential, no build.
    let Ok(api_key) = std::env::var("OPENAI_API_KEY") else {
        bail!("OPENAI_API_KEY is required to run a build");
    };

    let corpus_path = corpus_override
        .map(PathBuf::from)
        .unwrap_or_else(|| config.corpus_path());
    let source = JsonCorpus::new(corpus_path.clone());

    let posts = source.list_posts()?;
    if posts.is_empty() {
        bail!("corpus {} has no posts with content", corpus_path.display());
    }
    log::info!("processing {} posts", posts.len());

    let metas: Vec<PostMeta> = posts.iter().map(Post::meta).collect();

    let provider =
        OpenAiProvider::new(&config.embedding.api_base, &api_key, &config.embedding.model);
    let opts = BuildOpts {
        batch_size: config.embedding.batch_size,
        batch_char_limit: config.embedding.batch_char_limit,
        single_char_limit: config.embedding.single_char_limit,
        batch_pause: std::time::Duration::from_millis(config.embedding.batch_pause_ms),
    };

    let outcome = embed::build_vectors(&posts, &provider, &opts);
    log::info!(
        "{} embeddings generated, {} posts skipped",
        outcome.store.len(),
        outcome.skipped.len()
    );

    log::info!("computing similarity matrix");
    let entries = embed::similarity_matrix(&outcome.store, config.similarity.top_k);

    let store = DataStore::new(&config.data_dir())?;
    store.save_meta(&metas)?;
    store.save_embeddings(&outcome.store)?;
    store.save_similarity(&entries)?;

    println!("done");
    println!("- {}: {} posts", artifacts::META_FILE, metas.len());
    println!(
        "- {}: {} embeddings",
        artifacts::EMBEDDINGS_FILE,
        outcome.store.len()
    );
    println!(
        "- {}: {} similarity entries",
        artifacts::SIMILARITY_FILE,
        entries.len()
    );
    if !outcome.skipped.is_empty() {
        println!("- skipped: {} posts", outcome.skipped.len());
        for skip in &outcome.skipped {
            println!("    {}: {}", skip.post_id, skip.reason);
        }
    }

    Ok(())
}
