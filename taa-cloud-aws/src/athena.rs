//! Athena query engine

use crate::config::AthenaSettings;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_athena::error::DisplayErrorContext;
use aws_sdk_athena::types::{
    EncryptionConfiguration, EncryptionOption, QueryExecutionContext, ResultConfiguration,
};
use aws_sdk_athena::Client;
use taa_runtime::{Error, QueryEngine, QueryState, QueryStatus, Result};
use tracing::{debug, instrument};

pub struct AthenaQueryEngine {
    client: Client,
    settings: AthenaSettings,
}

impl AthenaQueryEngine {
    pub fn new(sdk: &SdkConfig, settings: AthenaSettings) -> Self {
        Self {
            client: Client::new(sdk),
            settings,
        }
    }
}

#[async_trait]
impl QueryEngine for AthenaQueryEngine {
    #[instrument(skip(self, query), fields(database = %self.settings.database))]
    async fn start_query(&self, query: &str, output_location: &str) -> Result<String> {
        let encryption = EncryptionConfiguration::builder()
            .encryption_option(EncryptionOption::SseS3)
            .build()
            .map_err(|e| Error::QueryEngine(format!("encryption configuration: {}", e)))?;

        let output = self
            .client
            .start_query_execution()
            .query_string(query)
            .query_execution_context(
                QueryExecutionContext::builder()
                    .database(&self.settings.database)
                    .catalog(&self.settings.catalog)
                    .build(),
            )
            .result_configuration(
                ResultConfiguration::builder()
                    .output_location(output_location)
                    .encryption_configuration(encryption)
                    .build(),
            )
            .set_work_group(self.settings.workgroup.clone())
            .send()
            .await
            .map_err(|e| Error::QueryEngine(format!("start query: {}", DisplayErrorContext(&e))))?;

        output
            .query_execution_id()
            .map(str::to_string)
            .ok_or_else(|| Error::QueryEngine("start query returned no execution id".to_string()))
    }

    #[instrument(skip(self))]
    async fn query_status(&self, execution_id: &str) -> Result<QueryStatus> {
        let output = self
            .client
            .get_query_execution()
            .query_execution_id(execution_id)
            .send()
            .await
            .map_err(|e| Error::QueryEngine(format!("get query execution: {}", DisplayErrorContext(&e))))?;

        let status = output
            .query_execution()
            .and_then(|execution| execution.status())
            .ok_or_else(|| Error::QueryEngine(format!("no status for execution {}", execution_id)))?;

        let raw_state = status.state().map(|s| s.as_str()).unwrap_or_default();
        let state = QueryState::parse(raw_state).ok_or_else(|| {
            Error::QueryEngine(format!("unknown query state {:?}", raw_state))
        })?;
        debug!(state = %state, "Polled query execution");

        Ok(QueryStatus {
            state,
            reason: status.state_change_reason().map(str::to_string),
        })
    }
}
