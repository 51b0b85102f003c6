use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use super::buffer::SampleBuffer;
use super::summary::{self, EndpointStats, Summary};
use super::{BandwidthSample, DbOperationSample, Period, RequestSample, TimeRange};

// ─── Configuration ───────────────────────────────────────────────

/// How many samples of each kind we keep by default
pub const DEFAULT_MAX_HISTORY: usize = 10_000;

/// How often the background task re-trims the buffers by default
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Collector-facing slice of the service configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsConfig {
    pub max_history: usize,
    pub cleanup_interval: Duration,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe metrics store.
/// Instrumentation calls the `record_*` methods, query handlers call `get_*`.
pub struct MetricsCollector {
    requests: SampleBuffer<RequestSample>,
    db_operations: SampleBuffer<DbOperationSample>,
    bandwidth: SampleBuffer<BandwidthSample>,
}

/// Filtered samples of one window plus the summary over exactly those.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub requests: Vec<RequestSample>,
    #[serde(rename = "mongo")]
    pub db_operations: Vec<DbOperationSample>,
    pub bandwidth: Vec<BandwidthSample>,
    pub summary: Summary,
}

/// Everything the HTTP layer knows once a response has been produced.
/// Passed to [`MetricsCollector::on_request_completed`].
#[derive(Debug, Clone)]
pub struct CompletedRequest {
    pub method: String,
    pub path: String,
    pub status_code: u16,
    pub elapsed: Duration,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub user_agent: Option<String>,
    pub client_ip: Option<String>,
}

// ─── MetricsCollector impl ───────────────────────────────────────

impl MetricsCollector {
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            requests: SampleBuffer::new(config.max_history),
            db_operations: SampleBuffer::new(config.max_history),
            bandwidth: SampleBuffer::new(config.max_history),
        }
    }

    // ── Ingestion ───────────────────────────────────────────────

    /// Record one finished HTTP request, stamped with the current time.
    #[allow(clippy::too_many_arguments)]
    pub fn record_request(
        &self,
        method: impl Into<String>,
        path: impl Into<String>,
        status_code: u16,
        duration_ms: f64,
        response_size_bytes: u64,
        user_agent: Option<String>,
        client_ip: Option<String>,
    ) {
        self.requests.push(RequestSample {
            timestamp: Utc::now(),
            method: method.into(),
            path: path.into(),
            status_code,
            duration_ms,
            response_size_bytes,
            user_agent,
            client_ip,
        });
    }

    /// Record one database operation, stamped with the current time.
    pub fn record_db_operation(
        &self,
        operation: impl Into<String>,
        collection: impl Into<String>,
        duration_ms: f64,
        success: bool,
        error: Option<String>,
    ) {
        self.db_operations.push(DbOperationSample {
            timestamp: Utc::now(),
            operation: operation.into(),
            collection: collection.into(),
            duration_ms,
            success,
            error,
        });
    }

    /// Record one bandwidth reading, stamped with the current time.
    pub fn record_bandwidth(&self, bytes_in: u64, bytes_out: u64, requests_per_second: f64) {
        self.bandwidth.push(BandwidthSample {
            timestamp: Utc::now(),
            bytes_in,
            bytes_out,
            requests_per_second,
        });
    }

    /// Completion hook for the HTTP layer: one request sample and one
    /// bandwidth sample per finished response.
    pub fn on_request_completed(&self, done: &CompletedRequest) {
        let secs = done.elapsed.as_secs_f64();
        let requests_per_second = if secs > 0.0 { 1.0 / secs } else { 0.0 };

        self.record_request(
            done.method.clone(),
            done.path.clone(),
            done.status_code,
            secs * 1000.0,
            done.bytes_out,
            done.user_agent.clone(),
            done.client_ip.clone(),
        );
        self.record_bandwidth(done.bytes_in, done.bytes_out, requests_per_second);
    }

    // ── Eviction ────────────────────────────────────────────────

    /// Trim every buffer to `max_history`. Returns the number of samples dropped.
    pub fn evict(&self) -> usize {
        self.requests.trim() + self.db_operations.trim() + self.bandwidth.trim()
    }

    // ── Queries ─────────────────────────────────────────────────

    /// Samples of all three kinds inside `range`, plus their summary.
    pub fn get_metrics(&self, range: TimeRange) -> MetricsReport {
        let requests = self.requests.in_range(&range);
        let db_operations = self.db_operations.in_range(&range);
        let bandwidth = self.bandwidth.in_range(&range);
        let summary = Summary::compute(&requests, &db_operations, &bandwidth);

        MetricsReport {
            requests,
            db_operations,
            bandwidth,
            summary,
        }
    }

    /// `get_metrics` over `[now - period, now]`.
    pub fn get_period_metrics(&self, period: Period) -> MetricsReport {
        self.get_metrics(period.range_ending_at(Utc::now()))
    }

    /// Last 5 minutes.
    pub fn get_realtime_metrics(&self) -> MetricsReport {
        self.get_period_metrics(Period::Realtime)
    }

    pub fn get_last_hour_metrics(&self) -> MetricsReport {
        self.get_period_metrics(Period::LastHour)
    }

    pub fn get_last_24_hours_metrics(&self) -> MetricsReport {
        self.get_period_metrics(Period::Last24Hours)
    }

    /// `"METHOD path"` → request count inside `range`.
    pub fn get_request_distribution(&self, range: TimeRange) -> BTreeMap<String, u64> {
        summary::request_distribution(&self.requests.in_range(&range))
    }

    /// Status code → request count inside `range`.
    pub fn get_status_distribution(&self, range: TimeRange) -> BTreeMap<u16, u64> {
        summary::status_distribution(&self.requests.in_range(&range))
    }

    /// `"METHOD path"` → latency and success figures inside `range`.
    pub fn get_endpoint_performance(&self, range: TimeRange) -> BTreeMap<String, EndpointStats> {
        summary::endpoint_performance(&self.requests.in_range(&range))
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(MetricsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};

    fn all_time() -> TimeRange {
        TimeRange::new(DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC)
    }

    fn collector_with_history(max_history: usize) -> MetricsCollector {
        MetricsCollector::new(MetricsConfig {
            max_history,
            ..MetricsConfig::default()
        })
    }

    #[test]
    fn reference_scenario_distribution_and_performance() {
        let collector = MetricsCollector::default();
        collector.record_request("GET", "/a", 200, 10.0, 0, None, None);
        collector.record_request("GET", "/a", 500, 20.0, 0, None, None);
        collector.record_request("POST", "/b", 200, 30.0, 0, None, None);

        let distribution = collector.get_request_distribution(all_time());
        assert_eq!(distribution.len(), 2);
        assert_eq!(distribution["GET /a"], 2);
        assert_eq!(distribution["POST /b"], 1);

        let perf = collector.get_endpoint_performance(all_time());
        let a = &perf["GET /a"];
        assert_eq!(a.count, 2);
        assert_eq!(a.total_duration, 30.0);
        assert_eq!(a.average_duration, 15.0);
        assert_eq!(a.success_rate, 50.0);

        let status = collector.get_status_distribution(all_time());
        assert_eq!(status[&200], 2);
        assert_eq!(status[&500], 1);
    }

    #[test]
    fn capacity_overflow_drops_only_the_oldest() {
        let collector = collector_with_history(10_000);
        for i in 0..10_001u64 {
            collector.record_request("GET", format!("/item/{i}"), 200, 1.0, i, None, None);
        }

        assert_eq!(collector.requests.len(), 10_000);
        assert_eq!(
            collector.requests.oldest().map(|s| s.path),
            Some("/item/1".to_string())
        );
        assert_eq!(
            collector.requests.newest().map(|s| s.path),
            Some("/item/10000".to_string())
        );
        assert!(collector
            .get_metrics(all_time())
            .requests
            .iter()
            .all(|s| s.path != "/item/0"));
    }

    #[test]
    fn huge_bandwidth_readings_do_not_break_window_summaries() {
        let collector = MetricsCollector::default();
        collector.record_bandwidth(u64::MAX, 1, 1.0);
        collector.record_bandwidth(1, 1, 1.0);

        let summary = collector.get_realtime_metrics().summary;
        assert_eq!(summary.total_bandwidth_in, u64::MAX);
        assert_eq!(summary.total_bandwidth_out, 2);
    }

    #[test]
    fn buffers_are_bounded_independently() {
        let collector = collector_with_history(2);
        for _ in 0..5 {
            collector.record_db_operation("find", "users", 1.0, true, None);
            collector.record_bandwidth(1, 1, 1.0);
        }
        collector.record_request("GET", "/", 200, 1.0, 0, None, None);

        assert_eq!(collector.db_operations.len(), 2);
        assert_eq!(collector.bandwidth.len(), 2);
        assert_eq!(collector.requests.len(), 1);
        assert_eq!(collector.evict(), 0);
    }

    #[test]
    fn get_metrics_filters_by_timestamp() {
        let collector = MetricsCollector::default();
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        for minute in 0..6 {
            collector.requests.push(RequestSample {
                timestamp: base + chrono::Duration::minutes(minute),
                method: "GET".into(),
                path: format!("/m{minute}"),
                status_code: 200,
                duration_ms: 1.0,
                response_size_bytes: 0,
                user_agent: None,
                client_ip: None,
            });
        }

        let range = TimeRange::new(
            base + chrono::Duration::minutes(2),
            base + chrono::Duration::minutes(4),
        );
        let report = collector.get_metrics(range);
        let paths: Vec<_> = report.requests.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/m2", "/m3", "/m4"]);
        assert_eq!(report.summary.total_requests, 3);
    }

    #[test]
    fn zero_width_window_without_match_is_empty() {
        let collector = MetricsCollector::default();
        collector.record_request("GET", "/a", 200, 10.0, 0, None, None);
        collector.record_db_operation("find", "users", 3.0, true, None);
        collector.record_bandwidth(10, 20, 1.0);

        let instant = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        let report = collector.get_metrics(TimeRange::new(instant, instant));

        assert!(report.requests.is_empty());
        assert!(report.db_operations.is_empty());
        assert!(report.bandwidth.is_empty());
        assert_eq!(report.summary, Summary::default());
    }

    #[test]
    fn period_wrappers_see_fresh_samples() {
        let collector = MetricsCollector::default();
        collector.record_request("GET", "/fresh", 200, 5.0, 128, Some("curl".into()), None);
        collector.record_db_operation("insert", "orders", 2.0, false, Some("dup key".into()));
        collector.record_bandwidth(100, 200, 4.0);

        for report in [
            collector.get_realtime_metrics(),
            collector.get_last_hour_metrics(),
            collector.get_last_24_hours_metrics(),
        ] {
            assert_eq!(report.summary.total_requests, 1);
            assert_eq!(report.summary.failed_db_operations, 1);
            assert_eq!(report.summary.total_bandwidth_out, 200);
        }
    }

    #[test]
    fn completion_hook_records_request_and_bandwidth() {
        let collector = MetricsCollector::default();
        collector.on_request_completed(&CompletedRequest {
            method: "PUT".into(),
            path: "/users/7".into(),
            status_code: 204,
            elapsed: Duration::from_millis(250),
            bytes_in: 64,
            bytes_out: 0,
            user_agent: None,
            client_ip: Some("10.0.0.1".into()),
        });

        let report = collector.get_metrics(all_time());
        assert_eq!(report.requests.len(), 1);
        assert_eq!(report.requests[0].duration_ms, 250.0);
        assert_eq!(report.requests[0].client_ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(report.bandwidth.len(), 1);
        assert_eq!(report.bandwidth[0].bytes_in, 64);
        assert_eq!(report.bandwidth[0].requests_per_second, 4.0);
    }

    #[test]
    fn completion_hook_handles_zero_elapsed() {
        let collector = MetricsCollector::default();
        collector.on_request_completed(&CompletedRequest {
            method: "GET".into(),
            path: "/".into(),
            status_code: 200,
            elapsed: Duration::ZERO,
            bytes_in: 0,
            bytes_out: 2,
            user_agent: None,
            client_ip: None,
        });

        let report = collector.get_metrics(all_time());
        assert_eq!(report.bandwidth[0].requests_per_second, 0.0);
        assert!(report.summary.average_requests_per_second.is_finite());
    }

    #[test]
    fn report_serializes_db_samples_as_mongo() {
        let collector = MetricsCollector::default();
        collector.record_db_operation("find", "users", 1.5, true, None);

        let json = serde_json::to_value(collector.get_metrics(all_time())).unwrap();
        assert_eq!(json["mongo"][0]["operation"], "find");
        assert_eq!(json["mongo"][0]["duration"], 1.5);
        assert!(json["mongo"][0].get("error").is_none());
        assert!(json["requests"].as_array().unwrap().is_empty());
    }
}
