use axum::{
    body::HttpBody,
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::CompletedRequest;
use crate::AppState;

/// Tower-compatible middleware that times every request, feeds the
/// collector's completion hook, and adds two response headers:
///
///   X-Response-Time-Us: total handler wall time in microseconds
///   Server-Timing: same value in the standard Server-Timing format
///
/// Both the duration and the response size are taken when the handler
/// returns, before the body is written to the socket. Buffered JSON bodies
/// report their exact length; a streamed body with neither a size hint nor
/// `Content-Length` is recorded as 0 bytes out.
pub async fn timing_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_owned();

    // Long-lived SSE connections would only skew the latency figures
    if path.ends_with("/stream") {
        return next.run(req).await;
    }

    let bytes_in = content_length(req.headers()).unwrap_or(0);
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let client_ip = resolve_client_ip(&req);

    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = start.elapsed();
    let us = elapsed.as_micros();

    // ── Inject response headers ─────────────────────────────────
    if let Ok(val) = us.to_string().parse() {
        response.headers_mut().insert("X-Response-Time-Us", val);
    }

    let server_timing = format!("total;dur={:.3}", elapsed.as_secs_f64() * 1000.0);
    if let Ok(val) = server_timing.parse() {
        response.headers_mut().insert("Server-Timing", val);
    }

    // ── Completion hook ─────────────────────────────────────────
    let status = response.status().as_u16();
    let bytes_out = response_size(&response);

    state.metrics.on_request_completed(&CompletedRequest {
        method: method.clone(),
        path: path.clone(),
        status_code: status,
        elapsed,
        bytes_in,
        bytes_out,
        user_agent,
        client_ip,
    });

    tracing::info!(
        status,
        method = %method,
        path = %path,
        duration_us = us as u64,
        bytes_out,
        "request completed"
    );

    response
}

/// Exact body length when known, else `Content-Length`, else 0.
fn response_size(response: &Response) -> u64 {
    response
        .body()
        .size_hint()
        .exact()
        .or_else(|| content_length(response.headers()))
        .unwrap_or(0)
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// First `X-Forwarded-For` hop, else the socket peer when the server was
/// started with connect info.
fn resolve_client_ip(req: &Request) -> Option<String> {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = forwarded {
        return Some(ip.to_owned());
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}
