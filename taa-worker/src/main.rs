//! TAA segment pipeline Lambda worker
//!
//! One binary serves every function of the pipeline; the deployment picks
//! which one with `--function` or `TAA_FUNCTION`:
//!
//! - `trigger` - run the three horizon queries and start the workflow
//! - `parser` - merge horizon results and fan out per-segment records
//! - `csv-generator` - render one segment CSV
//! - `excel-generator` - assemble the report workbook
//! - `url-generator` - presign a download URL for a report
//! - `cleanup` - delete intermediate CSVs after a failed run
//! - `loader` - validate an uploaded workbook and load it into Snowflake
//!
//! # Configuration
//!
//! Each function reads its own environment variables at start-up; see
//! [`taa_worker::config`]. Log output is configured with `TAA_LOG_FORMAT`,
//! `TAA_SERVICE_NAME` and `RUST_LOG`.

use clap::Parser;
use lambda_runtime::{service_fn, LambdaEvent};
use serde_json::Value;
use std::sync::Arc;
use taa_cloud_aws::load_sdk_config;
use taa_worker::tracing_config::{init_tracing, TracingConfig};
use taa_worker::{FunctionKind, Handler};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "taa-worker", version, about = "TAA segment pipeline Lambda worker")]
struct Cli {
    /// Pipeline function this process serves
    #[arg(long, env = "TAA_FUNCTION", value_enum)]
    function: FunctionKind,
}

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    let cli = Cli::parse();

    init_tracing(&TracingConfig::from_environment())?;
    info!(function = %cli.function, "Starting TAA worker");

    let sdk = load_sdk_config().await;
    let handler = match Handler::build(cli.function, &sdk).await {
        Ok(h) => Arc::new(h),
        Err(e) => {
            error!(error = ?e, "Failed to initialize handler");
            return Err(e.into());
        }
    };

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let handler = handler.clone();
        async move {
            let (payload, context) = event.into_parts();
            info!(request_id = %context.request_id, "Invocation started");
            handler
                .handle(payload)
                .await
                .map_err(lambda_runtime::Error::from)
        }
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_function() {
        let cli = Cli::try_parse_from(["taa-worker", "--function", "url-generator"]).unwrap();
        assert_eq!(cli.function, FunctionKind::UrlGenerator);
    }

    #[test]
    fn test_cli_rejects_unknown_function() {
        assert!(Cli::try_parse_from(["taa-worker", "--function", "mailer"]).is_err());
    }
}
