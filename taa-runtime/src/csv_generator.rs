//! Render one segment's CSV sheet from the edited template

use crate::ports::{ObjectLocation, ObjectStore};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use taa_core::paths::{temp_csv_key, EDITED_TEMPLATE_KEY, TEMP_CSV_PREFIX};
use taa_core::segments::{fill_segment_sheet, segment_sheet_name};
use taa_core::{FileDate, Frame, SegmentRecord, SegmentValues};
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvOutput {
    pub status: String,
    pub file_name: String,
    pub file_date: FileDate,
}

pub struct SegmentCsvGenerator {
    store: Arc<dyn ObjectStore>,
    bucket_name: String,
    csv_root: String,
}

impl SegmentCsvGenerator {
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

    #[instrument(skip_all, fields(gl_code = %record.gl_code_label(), file_date = %record.file_date))]
    pub async fn generate(&self, record: &SegmentRecord) -> Result<CsvOutput> {
        let values_bytes = self
            .store
            .get_object(&ObjectLocation::new(&self.bucket_name, &record.data_path))
            .await?;
        let values: SegmentValues = serde_json::from_slice(&values_bytes)?;

        let template_bytes = self
            .store
            .get_object(&ObjectLocation::new(&self.bucket_name, EDITED_TEMPLATE_KEY))
            .await?;
        let template = Frame::from_csv(&template_bytes)?;

        let sheet = fill_segment_sheet(&template, &values)?;

        let file_name = format!("{}.csv", segment_sheet_name(&record.gl_code_label()));
        let key = temp_csv_key(&self.csv_root, &record.file_date.run_date(), &file_name);
        self.store
            .put_object(
                &ObjectLocation::new(&self.bucket_name, &key),
                sheet.to_csv()?,
                "text/csv",
            )
            .await?;
        info!(key = %key, "Wrote segment CSV");

        Ok(CsvOutput {
            status: "Success".to_string(),
            file_name,
            file_date: record.file_date,
        })
    }
}
