//! Run a query to completion

use crate::ports::QueryEngine;
use crate::query_state::QueryState;
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Fixed wait between status checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Submits a query and polls until it reaches a terminal state
///
/// Polling uses a fixed interval with no backoff and no attempt bound; the
/// hosting platform's own execution ceiling is the only limit. Engine errors
/// at submission or poll time propagate immediately without retry.
pub struct QueryRunner {
    engine: Arc<dyn QueryEngine>,
    poll_interval: Duration,
}

impl QueryRunner {
    pub fn new(engine: Arc<dyn QueryEngine>) -> Self {
        Self {
            engine,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Output location for results under `folder` of `bucket`
    pub fn output_location(bucket: &str, folder: &str) -> String {
        let folder = folder.trim_matches('/');
        if folder.is_empty() {
            format!("s3://{}/", bucket)
        } else {
            format!("s3://{}/{}/", bucket, folder)
        }
    }

    /// Run `query` and return its execution id once it has succeeded
    #[instrument(skip(self, query), fields(execution_id))]
    pub async fn run(&self, query: &str, result_bucket: &str, result_folder: &str) -> Result<String> {
        let output_location = Self::output_location(result_bucket, result_folder);
        let execution_id = self.engine.start_query(query, &output_location).await?;
        tracing::Span::current().record("execution_id", execution_id.as_str());
        info!(output_location = %output_location, "Query submitted");

        let mut checks = 0u32;
        loop {
            let status = self.engine.query_status(&execution_id).await?;
            checks += 1;

            match status.state {
                QueryState::Succeeded => {
                    info!(checks, "Query execution succeeded");
                    return Ok(execution_id);
                }
                QueryState::Failed | QueryState::Cancelled => {
                    warn!(
                        state = %status.state,
                        reason = status.reason.as_deref().unwrap_or(""),
                        checks,
                        "Query execution did not succeed"
                    );
                    return Err(Error::QueryExecutionFailed {
                        state: status.state,
                        reason: status.reason,
                    });
                }
                QueryState::Queued | QueryState::Running => {
                    debug!(state = %status.state, checks, "Query still in progress");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}
