use crate::{
    config::Config,
    graph::NetworkGraph,
    query::{Catalog, SimilarResponse},
};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::{signal, sync::RwLock};

#[derive(Clone)]
pub(crate) struct SharedState {
    catalog: Arc<RwLock<Catalog>>,
    min_score: f32,
    limit: usize,
    graph_threshold: f32,
    graph_node_cap: usize,
}

impl SharedState {
    pub(crate) fn new(catalog: Catalog, config: &Config) -> Self {
        Self {
            catalog: Arc::new(RwLock::new(catalog)),
            min_score: config.similarity.min_score,
            limit: config.similarity.top_k,
            graph_threshold: config.similarity.graph_threshold,
            graph_node_cap: config.similarity.graph_node_cap,
        }
    }
}

pub(crate) fn app_router(state: Arc<SharedState>) -> Router {
    Router::new()
        .route("/api/similar/:id", get(similar))
        .route("/api/network", get(network))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(state)
}

async fn start_app(catalog: Catalog, config: Config) {
    async fn shutdown_signal() {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }

    let state = Arc::new(SharedState::new(catalog, &config));
    let app = app_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .unwrap();
    log::info!("listening on {}", config.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

pub fn start_daemon(catalog: Catalog, config: Config) {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async { start_app(catalog, config).await });
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimilarParams {
    pub min_score: Option<f32>,
    pub limit: Option<usize>,
}

async fn similar(
    State(state): State<Arc<SharedState>>,
    Path(id): Path<String>,
    Query(params): Query<SimilarParams>,
) -> Json<SimilarResponse> {
    log::debug!("similar id={id} params={params:?}");

    let min_score = params.min_score.unwrap_or(state.min_score);
    let limit = params.limit.unwrap_or(state.limit);
    let catalog = state.catalog.clone();

    tokio::task::block_in_place(move || {
        let mut catalog = catalog.blocking_write();
        catalog.refresh();
        Json(catalog.similar_to(&id, min_score, limit))
    })
}

async fn network(State(state): State<Arc<SharedState>>) -> Json<NetworkGraph> {
    let catalog = state.catalog.clone();
    let threshold = state.graph_threshold;
    let node_cap = state.graph_node_cap;

    tokio::task::block_in_place(move || {
        let mut catalog = catalog.blocking_write();
        catalog.refresh();
        Json(catalog.network(threshold, node_cap))
    })
}
