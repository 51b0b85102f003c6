use clap::Parser;
use std::time::Duration;

use crate::metrics::MetricsConfig;

/// Command-line and environment configuration for the metrics service.
#[derive(Parser, Debug, Clone)]
#[command(name = "service-metrics")]
#[command(about = "In-process request, database and bandwidth metrics over HTTP")]
#[command(version)]
pub struct Config {
    /// Interface to bind
    #[arg(long, env = "METRICS_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, short = 'p', env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Shared secret callers send as `Authorization: Bearer <token>`
    #[arg(long, env = "METRICS_API_TOKEN", hide_env_values = true)]
    pub api_token: String,

    /// Samples kept per buffer (requests, database operations, bandwidth)
    #[arg(long, env = "METRICS_MAX_HISTORY", default_value = "10000", value_parser = parse_max_history)]
    pub max_history: usize,

    /// How often the buffers are re-trimmed in the background
    #[arg(long, env = "METRICS_CLEANUP_INTERVAL", default_value = "5m", value_parser = parse_interval)]
    pub cleanup_interval: Duration,

    /// Tick of the live summary stream
    #[arg(long, env = "METRICS_STREAM_INTERVAL", default_value = "1s", value_parser = parse_interval)]
    pub stream_interval: Duration,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn metrics(&self) -> MetricsConfig {
        MetricsConfig {
            max_history: self.max_history,
            cleanup_interval: self.cleanup_interval,
        }
    }

    /// `host:port`, resolved by the listener at bind time.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_max_history(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("max history must be at least 1".into()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("Invalid max history '{s}': {e}")),
    }
}

/// Humantime (`30s`, `5m`, `1h30m`) or a bare number of seconds. Zero is rejected.
fn parse_interval(s: &str) -> Result<Duration, String> {
    let parsed = humantime::parse_duration(s)
        .ok()
        .or_else(|| s.parse::<u64>().ok().map(Duration::from_secs));

    match parsed {
        Some(d) if d.is_zero() => Err("interval must be greater than zero".into()),
        Some(d) => Ok(d),
        None => Err(format!(
            "Invalid duration '{s}'. Examples: 30s, 5m, 2h, 1h30m, 90"
        )),
    }
}
