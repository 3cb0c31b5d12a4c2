//! HTTP surface: the fetch route and a liveness probe
//!
//! Endpoints:
//!   GET /          render `url` and return the serialized document
//!   GET /healthz   liveness probe

use crate::renderer::RenderService;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Body returned when the `url` query parameter is absent or empty
pub const MISSING_URL_BODY: &str = "Bad request: 'url' param is missing!";

/// Shared state handed to every request
#[derive(Clone)]
pub struct AppState {
    pub renderer: Arc<dyn RenderService>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(fetch_page))
        .route("/healthz", get(healthz))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct FetchParams {
    url: Option<String>,
}

/// `GET /?url=...`: render the target page and return its HTML.
///
/// A missing or empty `url` is rejected up front with 400; the renderer is
/// never invoked. Render failures map to 500 with the error's display string
/// as the body.
async fn fetch_page(
    State(state): State<AppState>,
    Query(params): Query<FetchParams>,
) -> Response {
    let url = match params.url.as_deref() {
        Some(url) if !url.is_empty() => url,
        _ => return (StatusCode::BAD_REQUEST, MISSING_URL_BODY).into_response(),
    };

    match state.renderer.render_page(url).await {
        Ok(html) => {
            debug!(url, bytes = html.len(), "rendered page");
            Html(html).into_response()
        }
        Err(err) => {
            warn!(url, error = %err, "render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

async fn healthz() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
