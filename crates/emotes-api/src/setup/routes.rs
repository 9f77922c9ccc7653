//! Route configuration and setup.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use emotes_core::Config;
use emotes_infra::request_id_middleware;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::api_doc::ApiDoc;
use crate::handlers::{channels, emotes, health, ws};
use crate::state::AppState;

/// Room for multipart boundaries and the `data` part on top of the file
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

const HTTP_CONCURRENCY_LIMIT: usize = 10_000;

/// Handlers and their per-route limits, without server-wide layers
pub fn app_routes(state: Arc<AppState>) -> Router {
    let upload_limit = state.max_upload_bytes() + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route(
            "/v1/emotes",
            post(emotes::create_emote).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/v1/emotes/{id}",
            get(emotes::get_emote)
                .patch(emotes::edit_emote)
                .delete(emotes::delete_emote),
        )
        .route(
            "/v1/channels/{user}/emotes/{emote}",
            put(channels::add_channel_emote).delete(channels::remove_channel_emote),
        )
        .route("/v1/ws", get(ws::status_stream))
        .route("/health", get(health::health_check))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .with_state(state)
}

pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config)?;
    let body_limit = state.max_upload_bytes() + MULTIPART_OVERHEAD_BYTES;

    let app = app_routes(state)
        .layer(ConcurrencyLimitLayer::new(HTTP_CONCURRENCY_LIMIT))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(request_id_middleware));

    Ok(app)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}
