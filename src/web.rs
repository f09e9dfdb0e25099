use crate::{
    images,
    search::{SearchResult, SearchService},
};
use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
struct SharedState {
    service: Arc<SearchService>,
    default_limit: usize,
}

/// Build the API router. Separated from serving so handler tests can drive
/// it directly.
pub fn router(service: Arc<SearchService>, default_limit: usize) -> Router {
    let shared_state = SharedState {
        service,
        default_limit,
    };

    Router::new()
        .route("/", get(root))
        .route("/api/search", post(search))
        .route("/api/categories", get(categories))
        .route("/api/categories/:category", get(category_search))
        .route("/api/products_by_category", get(products_by_category))
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state)
}

async fn start_app(service: Arc<SearchService>, bind_addr: String, default_limit: usize) {
    async fn shutdown_signal() {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }

    let app = router(service, default_limit);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap();
    log::info!("listening on {}", bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

pub fn start_daemon(service: Arc<SearchService>, bind_addr: String, default_limit: usize) {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async { start_app(service, bind_addr, default_limit).await });
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({"message": "Vitrine product search API"}))
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    #[serde(default)]
    text: Option<String>,
    /// Base64-encoded image bytes, optionally wrapped in a data URL.
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

/// The search contract never propagates an error: undecodable payloads
/// degrade that input's contribution and an unsearchable request answers
/// with an empty list.
async fn search(
    State(state): State<SharedState>,
    Json(request): Json<SearchRequest>,
) -> Json<Vec<SearchResult>> {
    let image_bytes = request
        .image
        .as_deref()
        .and_then(|payload| match images::decode_base64(payload) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                log::warn!("ignoring undecodable image payload: {:#}", err);
                None
            }
        });

    let limit = request.limit.unwrap_or(state.default_limit);

    let results = state
        .service
        .search(request.text.as_deref(), image_bytes.as_deref(), limit);

    Json(results)
}

async fn categories(State(state): State<SharedState>) -> Json<Vec<String>> {
    Json(state.service.catalog().article_types())
}

#[derive(Debug, Deserialize)]
struct CategoryParams {
    category: String,
}

async fn products_by_category(
    State(state): State<SharedState>,
    Query(params): Query<CategoryParams>,
) -> Json<Vec<SearchResult>> {
    Json(state.service.browse_category(&params.category))
}

async fn category_search(
    State(state): State<SharedState>,
    Path(category): Path<String>,
) -> Json<Vec<SearchResult>> {
    Json(state.service.category_search(&category))
}
