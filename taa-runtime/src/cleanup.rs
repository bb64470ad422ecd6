//! Clear intermediate files after a failed run

use crate::ports::{ObjectLocation, ObjectStore};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use taa_core::paths::{temp_csv_prefix_in, TEMP_CSV_PREFIX};
use taa_core::FileDate;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearOutput {
    pub deleted: usize,
}

/// Delete every object under `prefix`; returns how many were deleted
pub async fn delete_prefix(store: &dyn ObjectStore, bucket: &str, prefix: &str) -> Result<usize> {
    let keys = store.list_keys(bucket, prefix).await?;
    for key in &keys {
        store.delete_object(&ObjectLocation::new(bucket, key)).await?;
    }
    Ok(keys.len())
}

pub struct IntermediateCleanup {
    store: Arc<dyn ObjectStore>,
    bucket_name: String,
    csv_root: String,
}

impl IntermediateCleanup {
    pub fn new(store: Arc<dyn ObjectStore>, bucket_name: impl Into<String>) -> Self {
        Self {
            store,
            bucket_name: bucket_name.into(),
            csv_root: TEMP_CSV_PREFIX.to_string(),
        }
    }

    /// Root folder of the intermediate CSV files
    pub fn with_csv_root(mut self, csv_root: impl Into<String>) -> Self {
        self.csv_root = csv_root.into();
        self
    }

    /// Remove the run's intermediate CSV files; a no-op when there are none
    #[instrument(skip_all, fields(file_date = %file_date))]
    pub async fn clear(&self, file_date: FileDate) -> Result<ClearOutput> {
        let prefix = temp_csv_prefix_in(&self.csv_root, &file_date.run_date());
        let deleted = delete_prefix(self.store.as_ref(), &self.bucket_name, &prefix).await?;

        if deleted == 0 {
            info!(prefix = %prefix, "No intermediate files to delete");
        } else {
            info!(prefix = %prefix, deleted, "Deleted intermediate files");
        }
        Ok(ClearOutput { deleted })
    }
}
