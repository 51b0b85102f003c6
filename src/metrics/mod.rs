pub mod buffer;
pub mod collector;
pub mod db;
pub mod eviction;
pub mod stream;
pub mod summary;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use collector::{CompletedRequest, MetricsCollector, MetricsConfig, MetricsReport};
pub use eviction::EvictionTask;
pub use summary::{EndpointStats, Summary};

// ─── Samples ─────────────────────────────────────────────────────
// These are the "write" side: the collector stamps and stores them,
// queries hand back clones of whatever falls inside the window.

/// One completed HTTP request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSample {
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    pub status_code: u16,
    /// Wall time in milliseconds
    #[serde(rename = "duration")]
    pub duration_ms: f64,
    #[serde(rename = "responseSize")]
    pub response_size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(rename = "ip", skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
}

impl RequestSample {
    /// 2xx and 3xx count as successes.
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status_code)
    }

    /// Grouping key used by the endpoint distributions, e.g. "GET /users".
    pub fn endpoint_key(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// One database operation as seen by the host service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DbOperationSample {
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub collection: String,
    #[serde(rename = "duration")]
    pub duration_ms: f64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One bandwidth reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BandwidthSample {
    pub timestamp: DateTime<Utc>,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub requests_per_second: f64,
}

/// Anything stored in a [`buffer::SampleBuffer`] must expose when it was taken.
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

impl Timestamped for RequestSample {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl Timestamped for DbOperationSample {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl Timestamped for BandwidthSample {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

// ─── Windows ─────────────────────────────────────────────────────

/// Closed interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// `[end - span, end]`
    pub fn ending_at(end: DateTime<Utc>, span: Duration) -> Self {
        let start = chrono::Duration::from_std(span)
            .ok()
            .and_then(|span| end.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { start, end }
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }
}

/// The fixed look-back windows the query endpoints understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Realtime,
    LastHour,
    Last24Hours,
}

impl Period {
    /// Absent or unrecognised values fall back to the 24 h window.
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("realtime") => Self::Realtime,
            Some("lastHour") => Self::LastHour,
            _ => Self::Last24Hours,
        }
    }

    pub fn span(self) -> Duration {
        match self {
            Self::Realtime => Duration::from_secs(5 * 60),
            Self::LastHour => Duration::from_secs(60 * 60),
            Self::Last24Hours => Duration::from_secs(24 * 60 * 60),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Realtime => "realtime",
            Self::LastHour => "lastHour",
            Self::Last24Hours => "last24Hours",
        }
    }

    pub fn range_ending_at(self, now: DateTime<Utc>) -> TimeRange {
        TimeRange::ending_at(now, self.span())
    }
}
