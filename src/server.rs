use axum::{
    middleware as axum_mw,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;

use crate::handlers::{query, record, AppError};
use crate::metrics::stream;
use crate::middleware::{auth, timing};
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    let metrics_routes = Router::new()
        // ── Fixed windows ───────────────────────────────────────
        .route("/realtime", get(query::realtime))
        .route("/last-hour", get(query::last_hour))
        .route("/last-24-hours", get(query::last_24_hours))
        .route("/custom", get(query::custom))
        // ── Distributions & performance ─────────────────────────
        .route("/distribution/requests", get(query::request_distribution))
        .route("/distribution/status", get(query::status_distribution))
        .route("/performance/endpoints", get(query::endpoint_performance))
        // ── Ingestion from other services ───────────────────────
        .route("/record/request", post(record::record_request))
        .route("/record/mongo", post(record::record_db_operation))
        .route("/record/bandwidth", post(record::record_bandwidth))
        // ── Live feed ───────────────────────────────────────────
        .route("/stream", get(stream::metrics_stream))
        // ── Every route above needs a bearer token ──────────────
        .route_layer(axum_mw::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    Router::new()
        .nest("/metrics", metrics_routes)
        // ── Provide shared state to all routes above ────────────
        .with_state(state.clone())
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(axum_mw::from_fn_with_state(state, timing::timing_middleware))
        .layer(CorsLayer::permissive())
}

/// Turns a handler panic into the generic 500 envelope; the payload is logged.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else {
        "unknown panic payload".to_owned()
    };

    AppError::Internal(detail).into_response()
}
