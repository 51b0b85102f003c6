use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

use crate::AppState;

// ─── GET /metrics/stream ─────────────────────────────────────────
/// Server-Sent Events endpoint.
/// Pushes the realtime (last 5 minutes) `Summary` as JSON every
/// `stream_interval`.

pub async fn metrics_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let interval = tokio::time::interval(state.stream_interval);

    let stream = IntervalStream::new(interval).map(move |_| {
        let summary = state.metrics.get_realtime_metrics().summary;
        let event = Event::default().event("summary");
        Ok(match event.json_data(&summary) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode summary event");
                Event::default().event("error").data("encoding failed")
            }
        })
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
