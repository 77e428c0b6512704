use axum::{
    extract::{OriginalUri, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::api::ApiError;
use crate::db::Repository;
use crate::omdb::MovieLookup;
use crate::pages::Views;

/// Everything a request handler needs, built once in `run` and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Repository>,
    pub lookup: Arc<dyn MovieLookup>,
    pub views: Arc<Views>,
}

impl AppState {
    pub fn new(db: Arc<dyn Repository>, lookup: Arc<dyn MovieLookup>, views: Arc<Views>) -> Self {
        Self {
            db,
            lookup,
            views,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/robots.txt", axum::routing::get(robots_txt_handler))
        .merge(crate::pages::router())
        .nest("/api", crate::api::router())
        .fallback(fallback_handler)
        .layer(axum::middleware::from_fn(crate::middleware::log_request))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn robots_txt_handler() -> &'static str {
    "User-agent: *\nDisallow: /\n"
}

async fn fallback_handler(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    method: Method,
) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }

    let err = ApiError::NotFound(format!("No such page: {}", uri.path()));
    if uri.path().starts_with("/api/") {
        err.into_response()
    } else {
        state.views.render_error(&err)
    }
}
