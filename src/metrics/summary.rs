use std::collections::BTreeMap;

use serde::Serialize;

use super::{BandwidthSample, DbOperationSample, RequestSample};

/// Aggregate counters over one filtered window.
/// Serialized straight into the query responses and the SSE feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub average_response_time: f64,

    #[serde(rename = "totalMongoOperations")]
    pub total_db_operations: u64,
    #[serde(rename = "successfulMongoOperations")]
    pub successful_db_operations: u64,
    #[serde(rename = "failedMongoOperations")]
    pub failed_db_operations: u64,
    #[serde(rename = "averageMongoTime")]
    pub average_db_time: f64,

    pub total_bandwidth_in: u64,
    pub total_bandwidth_out: u64,
    pub average_requests_per_second: f64,
}

impl Summary {
    /// Compute every aggregate from the given samples.
    /// Empty inputs produce zeros, never NaN.
    pub fn compute(
        requests: &[RequestSample],
        db_operations: &[DbOperationSample],
        bandwidth: &[BandwidthSample],
    ) -> Self {
        let total_requests = requests.len() as u64;
        let successful_requests = requests.iter().filter(|r| r.is_success()).count() as u64;

        let total_db_operations = db_operations.len() as u64;
        let successful_db_operations = db_operations.iter().filter(|d| d.success).count() as u64;

        Self {
            total_requests,
            successful_requests,
            failed_requests: total_requests - successful_requests,
            average_response_time: mean(requests.iter().map(|r| r.duration_ms)),

            total_db_operations,
            successful_db_operations,
            failed_db_operations: total_db_operations - successful_db_operations,
            average_db_time: mean(db_operations.iter().map(|d| d.duration_ms)),

            total_bandwidth_in: saturating_total(bandwidth.iter().map(|b| b.bytes_in)),
            total_bandwidth_out: saturating_total(bandwidth.iter().map(|b| b.bytes_out)),
            average_requests_per_second: mean(bandwidth.iter().map(|b| b.requests_per_second)),
        }
    }
}

/// Per-endpoint latency and success figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointStats {
    pub count: u64,
    pub average_duration: f64,
    /// Percentage of 2xx/3xx responses, 0–100
    pub success_rate: f64,
    pub total_duration: f64,
}

/// `"METHOD path"` → number of requests.
pub fn request_distribution(requests: &[RequestSample]) -> BTreeMap<String, u64> {
    let mut distribution = BTreeMap::new();
    for request in requests {
        *distribution.entry(request.endpoint_key()).or_insert(0) += 1;
    }
    distribution
}

/// Status code → number of requests.
pub fn status_distribution(requests: &[RequestSample]) -> BTreeMap<u16, u64> {
    let mut distribution = BTreeMap::new();
    for request in requests {
        *distribution.entry(request.status_code).or_insert(0) += 1;
    }
    distribution
}

/// Group by `"METHOD path"` in one pass, then derive averages and rates.
pub fn endpoint_performance(requests: &[RequestSample]) -> BTreeMap<String, EndpointStats> {
    #[derive(Default)]
    struct Acc {
        count: u64,
        successes: u64,
        total_duration: f64,
    }

    let mut groups: BTreeMap<String, Acc> = BTreeMap::new();
    for request in requests {
        let acc = groups.entry(request.endpoint_key()).or_default();
        acc.count += 1;
        acc.total_duration += request.duration_ms;
        if request.is_success() {
            acc.successes += 1;
        }
    }

    groups
        .into_iter()
        .map(|(key, acc)| {
            // Every group holds at least the request that created it
            let count = acc.count as f64;
            let stats = EndpointStats {
                count: acc.count,
                average_duration: acc.total_duration / count,
                success_rate: acc.successes as f64 / count * 100.0,
                total_duration: acc.total_duration,
            };
            (key, stats)
        })
        .collect()
}

/// Byte totals pin at `u64::MAX` instead of overflowing.
fn saturating_total(values: impl Iterator<Item = u64>) -> u64 {
    values.fold(0u64, u64::saturating_add)
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0u64), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
