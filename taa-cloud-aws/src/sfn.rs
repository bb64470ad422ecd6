//! Step Functions workflow starter

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sfn::error::DisplayErrorContext;
use aws_sdk_sfn::Client;
use taa_runtime::{Error, Result, WorkflowStarter};
use tracing::instrument;

pub struct StepFunctionsStarter {
    client: Client,
    state_machine_arn: String,
}

impl StepFunctionsStarter {
    pub fn new(sdk: &SdkConfig, state_machine_arn: impl Into<String>) -> Self {
        Self {
            client: Client::new(sdk),
            state_machine_arn: state_machine_arn.into(),
        }
    }
}

#[async_trait]
impl WorkflowStarter for StepFunctionsStarter {
    #[instrument(skip(self, input), fields(state_machine = %self.state_machine_arn))]
    async fn start_execution(&self, input: &serde_json::Value) -> Result<String> {
        let output = self
            .client
            .start_execution()
            .state_machine_arn(&self.state_machine_arn)
            .input(input.to_string())
            .send()
            .await
            .map_err(|e| Error::WorkflowStart(DisplayErrorContext(&e).to_string()))?;

        Ok(output.execution_arn().to_string())
    }
}
