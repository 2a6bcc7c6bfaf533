//! HTTP surface: routes, CORS, and graceful shutdown.

use crate::ai::{GeminiHttpClient, GenerativeService};
use crate::models::Config;
use crate::proxy::{ProxyError, ProxyHandler};
use crate::Result;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, MethodRouter},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<ProxyHandler>,
    /// Cancelled on shutdown; each request derives a child token from it.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: Arc<Config>, upstream: Arc<dyn GenerativeService>) -> Self {
        Self {
            handler: Arc::new(ProxyHandler::new(config, upstream)),
            shutdown: CancellationToken::new(),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.handler.config();
    let enable_cors = config.enable_cors;
    let max_body_bytes = config.max_body_bytes;

    let generate_image = proxy_route(post(generate_image_handler));
    let get_suggestion = proxy_route(post(get_suggestion_handler));

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/generate-image", generate_image.clone())
        .route("/api/get-suggestion", get_suggestion.clone())
        .route("/.netlify/functions/generate-image", generate_image)
        .route("/.netlify/functions/get-suggestion", get_suggestion)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if enable_cors {
        app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
    } else {
        app
    }
}

/// POST only; anything else is 405. With CORS on, OPTIONS never reaches the
/// router because the CORS layer answers it.
fn proxy_route(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.fallback(method_not_allowed_handler)
}

async fn generate_image_handler(
    State(state): State<AppState>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => return ProxyError::from(rejection).into_response(),
    };
    let cancel = state.shutdown.child_token();
    match state.handler.compose_image(&body, &cancel).await {
        Ok(artifact) => (StatusCode::OK, Json(artifact)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn get_suggestion_handler(
    State(state): State<AppState>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => return ProxyError::from(rejection).into_response(),
    };
    let cancel = state.shutdown.child_token();
    match state.handler.suggest(&body, &cancel).await {
        Ok(artifact) => (StatusCode::OK, Json(artifact)).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn method_not_allowed_handler() -> ProxyError {
    ProxyError::MethodNotAllowed
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Binds the configured address and serves until Ctrl-C.
pub async fn start_server(config: Config) -> Result<()> {
    let config = Arc::new(config);
    let upstream: Arc<dyn GenerativeService> = Arc::new(GeminiHttpClient::new(
        config.gemini_base_url.clone(),
        config.upstream_timeout,
    ));

    let state = AppState::new(config.clone(), upstream);
    let shutdown = state.shutdown.clone();
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Proxy listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received, cancelling in-flight requests");
            shutdown.cancel();
        })
        .await?;

    info!("Proxy stopped");
    Ok(())
}
