use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::metrics::{EndpointStats, MetricsReport, Period, TimeRange};
use crate::AppState;

use super::{ApiResponse, AppError};

// ─── Request / response types ────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PeriodParams {
    pub period: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CustomRangeParams {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// A window's report plus generation-time metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsData {
    #[serde(flatten)]
    pub report: MetricsReport,
    pub timestamp: DateTime<Utc>,
    pub period: &'static str,
    pub time_range: TimeRange,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionData<K: Ord + Serialize> {
    pub distribution: BTreeMap<K, u64>,
    pub timestamp: DateTime<Utc>,
    /// The caller's `period` as given, even when it fell back to 24 h
    pub period: String,
    pub time_range: TimeRange,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceData {
    pub performance: BTreeMap<String, EndpointStats>,
    pub timestamp: DateTime<Utc>,
    pub period: String,
    pub time_range: TimeRange,
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

// ─── GET /metrics/realtime | last-hour | last-24-hours ───────────

pub async fn realtime(State(state): State<Arc<AppState>>) -> ApiResult<MetricsData> {
    Ok(period_metrics(&state, Period::Realtime))
}

pub async fn last_hour(State(state): State<Arc<AppState>>) -> ApiResult<MetricsData> {
    Ok(period_metrics(&state, Period::LastHour))
}

pub async fn last_24_hours(State(state): State<Arc<AppState>>) -> ApiResult<MetricsData> {
    Ok(period_metrics(&state, Period::Last24Hours))
}

fn period_metrics(state: &AppState, period: Period) -> Json<ApiResponse<MetricsData>> {
    let time_range = period.range_ending_at(Utc::now());
    ApiResponse::data(MetricsData {
        report: state.metrics.get_metrics(time_range),
        timestamp: Utc::now(),
        period: period.as_str(),
        time_range,
    })
}

// ─── GET /metrics/custom?start=&end= ─────────────────────────────

pub async fn custom(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CustomRangeParams>,
) -> ApiResult<MetricsData> {
    let time_range = validate_custom_range(params.start.as_deref(), params.end.as_deref())?;

    Ok(ApiResponse::data(MetricsData {
        report: state.metrics.get_metrics(time_range),
        timestamp: Utc::now(),
        period: "custom",
        time_range,
    }))
}

/// Both ends present, parseable, and `start < end`.
pub fn validate_custom_range(start: Option<&str>, end: Option<&str>) -> Result<TimeRange, AppError> {
    let (Some(start), Some(end)) = (non_empty(start), non_empty(end)) else {
        return Err(AppError::Validation(
            "The 'start' and 'end' parameters are required (ISO 8601 format)".into(),
        ));
    };

    let (Some(start), Some(end)) = (parse_timestamp(start), parse_timestamp(end)) else {
        return Err(AppError::Validation(
            "Invalid date format. Use ISO 8601".into(),
        ));
    };

    if start >= end {
        return Err(AppError::Validation(
            "The start date must be earlier than the end date".into(),
        ));
    }

    Ok(TimeRange::new(start, end))
}

/// RFC 3339, a naive date-time read as UTC, or a bare date at midnight UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(t.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

// ─── GET /metrics/distribution/* and /metrics/performance/* ──────

pub async fn request_distribution(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PeriodParams>,
) -> ApiResult<DistributionData<String>> {
    let (period, time_range) = resolve_period(params);
    Ok(ApiResponse::data(DistributionData {
        distribution: state.metrics.get_request_distribution(time_range),
        timestamp: Utc::now(),
        period,
        time_range,
    }))
}

pub async fn status_distribution(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PeriodParams>,
) -> ApiResult<DistributionData<u16>> {
    let (period, time_range) = resolve_period(params);
    Ok(ApiResponse::data(DistributionData {
        distribution: state.metrics.get_status_distribution(time_range),
        timestamp: Utc::now(),
        period,
        time_range,
    }))
}

pub async fn endpoint_performance(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PeriodParams>,
) -> ApiResult<PerformanceData> {
    let (period, time_range) = resolve_period(params);
    Ok(ApiResponse::data(PerformanceData {
        performance: state.metrics.get_endpoint_performance(time_range),
        timestamp: Utc::now(),
        period,
        time_range,
    }))
}

/// Window for `?period=`, plus the label echoed back: the raw value when
/// one was sent, `last24Hours` otherwise.
fn resolve_period(params: PeriodParams) -> (String, TimeRange) {
    let period = Period::from_query(params.period.as_deref());
    let label = params
        .period
        .unwrap_or_else(|| Period::Last24Hours.as_str().to_owned());
    (label, period.range_ending_at(Utc::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_common_iso_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-05-01T10:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T10:00:00.000Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T12:00:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T10:00:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-05-01"),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2024-13-01"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn custom_range_requires_both_ends() {
        for (start, end) in [
            (None, Some("2024-05-01")),
            (Some("2024-05-01"), None),
            (Some(""), Some("2024-05-02")),
            (None, None),
        ] {
            match validate_custom_range(start, end) {
                Err(AppError::Validation(msg)) => assert!(msg.contains("required")),
                other => panic!("expected validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn custom_range_rejects_unparseable_ends() {
        match validate_custom_range(Some("2024-05-01"), Some("not-a-date")) {
            Err(AppError::Validation(msg)) => assert!(msg.contains("Invalid date")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn custom_range_requires_start_before_end() {
        for (start, end) in [
            ("2024-05-02T00:00:00Z", "2024-05-01T00:00:00Z"),
            ("2024-05-01T00:00:00Z", "2024-05-01T00:00:00Z"),
        ] {
            match validate_custom_range(Some(start), Some(end)) {
                Err(AppError::Validation(msg)) => assert!(msg.contains("earlier")),
                other => panic!("expected validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn custom_range_accepts_ordered_ends() {
        let range = validate_custom_range(Some("2024-05-01"), Some("2024-05-02T00:00:00Z")).unwrap();
        assert_eq!(range.start, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn unknown_period_uses_24_hours_but_echoes_the_raw_value() {
        let (label, range) = resolve_period(PeriodParams {
            period: Some("forever".into()),
        });
        assert_eq!(label, "forever");
        assert_eq!((range.end - range.start).num_hours(), 24);
    }

    #[test]
    fn known_and_absent_periods_echo_their_names() {
        let (label, range) = resolve_period(PeriodParams {
            period: Some("lastHour".into()),
        });
        assert_eq!(label, "lastHour");
        assert_eq!((range.end - range.start).num_hours(), 1);

        let (label, range) = resolve_period(PeriodParams { period: None });
        assert_eq!(label, "last24Hours");
        assert_eq!((range.end - range.start).num_hours(), 24);
    }
}
