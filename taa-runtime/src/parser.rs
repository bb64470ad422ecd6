//! Segment fan-out
//!
//! Merges the three horizon results, writes one value file per GL code,
//! builds the Table Properties sheet source and expands the purchase
//! template with one row per ALFA id. Returns one record per GL code for the
//! workflow's map step.

use crate::ports::{ObjectLocation, ObjectStore};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use taa_core::paths::{
    gl_code_data_key, temp_csv_key, EDITED_TEMPLATE_KEY, TABLE_PROPERTIES_FILE, TEMP_CSV_PREFIX,
};
use taa_core::segments::{
    append_table_properties, expand_template, merge_horizons, segment_values, ALFA_ID_COLUMN,
    GL_CODE_COLUMN,
};
use taa_core::{Cell, Frame, SegmentRecord, TriggerPayload, HORIZONS};
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserOutput {
    #[serde(rename = "Status")]
    pub status: String,

    #[serde(rename = "Output")]
    pub output: ParsedRecords,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedRecords {
    #[serde(rename = "Records")]
    pub records: Vec<SegmentRecord>,
}

#[derive(Debug, Clone)]
pub struct ParserSettings {
    /// Base Table Properties CSV the segment rows are appended to
    pub table_properties_key: String,

    /// Purchase template holding the model row
    pub template_key: String,
}

pub struct SegmentParser {
    store: Arc<dyn ObjectStore>,
    settings: ParserSettings,
    csv_root: String,
}

impl SegmentParser {
    pub fn new(store: Arc<dyn ObjectStore>, settings: ParserSettings) -> Self {
        Self {
            store,
            settings,
            csv_root: TEMP_CSV_PREFIX.to_string(),
        }
    }

    /// Root folder of the intermediate CSV files
    pub fn with_csv_root(mut self, csv_root: impl Into<String>) -> Self {
        self.csv_root = csv_root.into();
        self
    }

    #[instrument(skip_all, fields(file_date = %payload.file_date, bucket = %payload.bucket_name))]
    pub async fn parse(&self, payload: &TriggerPayload) -> Result<ParserOutput> {
        if payload.key.len() != HORIZONS.len() {
            return Err(Error::InvalidInput(format!(
                "expected {} horizon keys, got {}",
                HORIZONS.len(),
                payload.key.len()
            )));
        }

        let bucket = payload.bucket_name.as_str();
        let h1 = self.read_csv(bucket, &payload.key[0]).await?;
        let h2 = self.read_csv(bucket, &payload.key[1]).await?;
        let h3 = self.read_csv(bucket, &payload.key[2]).await?;
        let merged = merge_horizons(&[h1, h2, h3])?;

        let gl_codes = merged.unique(GL_CODE_COLUMN)?;
        let alfa_ids: Vec<Cell> = merged
            .unique(ALFA_ID_COLUMN)?
            .into_iter()
            .filter(|id| !id.is_empty())
            .collect();
        info!(
            rows = merged.len(),
            gl_codes = gl_codes.len(),
            alfa_ids = alfa_ids.len(),
            "Merged horizon results"
        );

        let mut table = self
            .read_csv(bucket, &self.settings.table_properties_key)
            .await?;
        let mut records = Vec::with_capacity(gl_codes.len());

        for gl_code in &gl_codes {
            if gl_code.is_empty() {
                warn!("Skipping rows without a GL code");
                continue;
            }
            let label = gl_code.label();
            let values = segment_values(&merged, gl_code)?;
            info!(
                gl_code = %label,
                values = values.values_h1.len(),
                "Writing segment values"
            );

            let data_path = gl_code_data_key(&label);
            self.store
                .put_object(
                    &ObjectLocation::new(bucket, &data_path),
                    serde_json::to_vec(&values)?,
                    "application/json",
                )
                .await?;

            records.push(SegmentRecord {
                file_date: payload.file_date,
                gl_code: gl_code_json(gl_code),
                data_path,
            });
            append_table_properties(&mut table, &label);
        }

        let run_date = payload.file_date.run_date();
        let table_key = temp_csv_key(&self.csv_root, &run_date, TABLE_PROPERTIES_FILE);
        self.write_csv(bucket, &table_key, &table).await?;
        info!(key = %table_key, rows = table.len(), "Wrote table properties");

        let template = self.read_csv(bucket, &self.settings.template_key).await?;
        let edited = expand_template(&template, &alfa_ids)?;
        self.write_csv(bucket, EDITED_TEMPLATE_KEY, &edited).await?;
        info!(key = EDITED_TEMPLATE_KEY, rows = edited.len(), "Wrote edited template");

        Ok(ParserOutput {
            status: "Success".to_string(),
            output: ParsedRecords { records },
        })
    }

    async fn read_csv(&self, bucket: &str, key: &str) -> Result<Frame> {
        let bytes = self.store.get_object(&ObjectLocation::new(bucket, key)).await?;
        Ok(Frame::from_csv(&bytes)?)
    }

    async fn write_csv(&self, bucket: &str, key: &str, frame: &Frame) -> Result<()> {
        self.store
            .put_object(&ObjectLocation::new(bucket, key), frame.to_csv()?, "text/csv")
            .await
    }
}

/// GL codes are emitted as numbers when they are integral
fn gl_code_json(cell: &Cell) -> Value {
    match cell {
        Cell::Float(f) if f.fract() == 0.0 => Value::from(*f as i64),
        other => other.to_json(),
    }
}
