//! In-process metrics for a web service.
//!
//! Request, database-operation and bandwidth samples are kept in bounded
//! in-memory buffers and served back as time-windowed reports, endpoint and
//! status-code distributions, and per-endpoint performance figures over an
//! authenticated HTTP API.

use std::sync::Arc;
use std::time::Duration;

pub mod config;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod server;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Central metrics store: instrumentation pushes samples, handlers query windows.
    pub metrics: Arc<metrics::MetricsCollector>,

    /// Bearer-token settings checked by the metrics routes.
    pub auth: middleware::AuthConfig,

    /// Tick of the live summary SSE feed.
    pub stream_interval: Duration,
}
