//! Presigned download link for a day's report

use crate::ports::{ObjectLocation, ObjectStore};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use taa_core::paths::report_key;
use taa_core::RunDate;
use tracing::{info, instrument, warn};

/// Lifetime of generated links
pub const DEFAULT_URL_EXPIRY: Duration = Duration::from_secs(900);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRequest {
    #[serde(rename = "valDate")]
    pub val_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,

    #[serde(rename = "Url")]
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct UrlSettings {
    pub bucket_name: String,
    pub report_name: String,
    pub expires_in: Duration,
}

pub struct ReportUrlGenerator {
    store: Arc<dyn ObjectStore>,
    settings: UrlSettings,
}

impl ReportUrlGenerator {
    pub fn new(store: Arc<dyn ObjectStore>, settings: UrlSettings) -> Self {
        Self { store, settings }
    }

    #[instrument(skip(self))]
    pub async fn generate_url(&self, val_date: &str) -> Result<UrlResponse> {
        let date = RunDate::parse_iso(val_date)?;
        let key = report_key(&date, &self.settings.report_name);

        let listed = self.store.list_keys(&self.settings.bucket_name, &key).await?;
        if !listed.iter().any(|k| k == &key) {
            warn!(key = %key, "Report not found");
            return Err(Error::ResourceNotFound(format!(
                "s3://{}/{}",
                self.settings.bucket_name, key
            )));
        }

        let url = self
            .store
            .presign_get(
                &ObjectLocation::new(&self.settings.bucket_name, &key),
                self.settings.expires_in,
            )
            .await?;
        info!(key = %key, expires_in_secs = self.settings.expires_in.as_secs(), "Generated report URL");

        Ok(UrlResponse {
            status_code: 200,
            url,
        })
    }
}
