//! SNS notifier

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sns::error::DisplayErrorContext;
use aws_sdk_sns::Client;
use taa_runtime::{Error, Notifier, Result};
use tracing::{info, instrument};

pub struct SnsNotifier {
    client: Client,
    topic_arn: String,
}

impl SnsNotifier {
    pub fn new(sdk: &SdkConfig, topic_arn: impl Into<String>) -> Self {
        Self {
            client: Client::new(sdk),
            topic_arn: topic_arn.into(),
        }
    }
}

#[async_trait]
impl Notifier for SnsNotifier {
    #[instrument(skip(self, message), fields(topic = %self.topic_arn))]
    async fn publish(&self, subject: Option<&str>, message: &str) -> Result<()> {
        let output = self
            .client
            .publish()
            .topic_arn(&self.topic_arn)
            .set_subject(subject.map(str::to_string))
            .message(message)
            .send()
            .await
            .map_err(|e| Error::Notification(DisplayErrorContext(&e).to_string()))?;

        info!(message_id = output.message_id().unwrap_or_default(), "Published notification");
        Ok(())
    }
}
