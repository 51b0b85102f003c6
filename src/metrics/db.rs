use std::fmt::Display;
use std::future::Future;
use std::time::Instant;

use super::MetricsCollector;

/// Time a database call and record it as a [`super::DbOperationSample`].
///
/// The future's result is returned untouched; an `Err` is recorded as a
/// failed operation carrying the error's `Display` text.
pub async fn observe<F, T, E>(
    metrics: &MetricsCollector,
    operation: &str,
    collection: &str,
    call: F,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    let t0 = Instant::now();
    let result = call.await;
    let duration_ms = t0.elapsed().as_secs_f64() * 1000.0;

    let error = result.as_ref().err().map(|e| e.to_string());
    metrics.record_db_operation(operation, collection, duration_ms, error.is_none(), error);

    result
}
