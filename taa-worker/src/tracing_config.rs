//! Log subscriber setup for the worker binary.
//!
//! ```bash
//! # Output format (json for CloudWatch, pretty for local runs)
//! export TAA_LOG_FORMAT=json
//!
//! # Service name attached to the startup event
//! export TAA_SERVICE_NAME=taa-trigger
//!
//! # Standard filter directives override the default levels
//! export RUST_LOG=taa_runtime=debug
//! ```

use std::str::FromStr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "taa_worker=info,taa_runtime=info,taa_cloud_aws=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub format: LogFormat,
    pub service_name: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::from_environment()
    }
}

impl TracingConfig {
    /// Read `TAA_LOG_FORMAT` and `TAA_SERVICE_NAME`
    pub fn from_environment() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let format = match lookup("TAA_LOG_FORMAT") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                eprintln!("Warning: {}, falling back to json", e);
                LogFormat::Json
            }),
            None => LogFormat::Json,
        };

        Self {
            format,
            service_name: lookup("TAA_SERVICE_NAME")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| "taa-worker".to_string()),
        }
    }
}

/// Install the global subscriber. Call once, before any handler runs.
pub fn init_tracing(config: &TracingConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()?,
    }

    tracing::info!(
        service_name = %config.service_name,
        format = ?config.format,
        "Tracing initialized"
    );
    Ok(())
}
