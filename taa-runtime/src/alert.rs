//! Failure alerts

use crate::ports::Notifier;
use crate::{Error, Result};
use serde_json::Value;
use tracing::error;

/// Alert text: the failure followed by the event that caused it
pub fn alert_message(failure: &Error, event: &Value) -> String {
    format!("Exception: {}\nEvent: {}", failure, event)
}

/// Publish an alert for `failure`
///
/// The failure is logged before publishing so its context survives even
/// when the publish itself fails; that publish error is what is returned.
pub async fn publish_failure_alert(notifier: &dyn Notifier, failure: &Error, event: &Value) -> Result<()> {
    error!(error = %failure, event = %event, "Pipeline run failed, publishing alert");

    notifier
        .publish(None, &alert_message(failure, event))
        .await
        .map_err(|e| {
            error!(error = %e, original_error = %failure, "Failed to publish alert");
            match e {
                Error::Notification(_) => e,
                other => Error::Notification(other.to_string()),
            }
        })
}
