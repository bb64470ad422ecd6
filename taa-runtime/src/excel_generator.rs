//! Consolidate the segment CSVs into the final workbook

use crate::cleanup::delete_prefix;
use crate::csv_generator::CsvOutput;
use crate::ports::{ObjectLocation, ObjectStore};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use taa_core::paths::{report_key, temp_csv_prefix_in, TABLE_PROPERTIES_FILE};
use taa_core::workbook::write_workbook;
use taa_core::Frame;
use tracing::{info, instrument};

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Sheet holding the Table Properties rows; always first
pub const TABLE_PROPERTIES_SHEET: &str = "TableProperties";

#[derive(Debug, Clone)]
pub struct ExcelSettings {
    pub bucket_name: String,

    /// Root folder of the intermediate CSV files
    pub csv_root: String,

    /// Workbook file stem
    pub report_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcelOutput {
    pub status: String,
    pub message: String,
    pub report_key: String,
    pub deleted: usize,
}

pub struct WorkbookAssembler {
    store: Arc<dyn ObjectStore>,
    settings: ExcelSettings,
}

impl WorkbookAssembler {
    pub fn new(store: Arc<dyn ObjectStore>, settings: ExcelSettings) -> Self {
        Self { store, settings }
    }

    /// Build the workbook from every segment result, upload it and clear
    /// the intermediate CSVs
    #[instrument(skip_all, fields(segments = results.len()))]
    pub async fn assemble(&self, results: &[CsvOutput]) -> Result<ExcelOutput> {
        let file_date = match results.first() {
            Some(first) => first.file_date,
            None => {
                return Err(Error::InvalidInput(
                    "no segment results to assemble".to_string(),
                ))
            }
        };
        if let Some(other) = results.iter().find(|r| r.file_date != file_date) {
            return Err(Error::InvalidInput(format!(
                "segment results span several file dates: {} and {}",
                file_date, other.file_date
            )));
        }

        let mut seen = HashSet::with_capacity(results.len());
        if let Some(duplicate) = results.iter().find(|r| !seen.insert(r.file_name.as_str())) {
            return Err(Error::InvalidInput(format!(
                "segment file {} appears more than once",
                duplicate.file_name
            )));
        }

        let date = file_date.run_date();
        let prefix = temp_csv_prefix_in(&self.settings.csv_root, &date);

        let mut sheets: Vec<(String, Frame)> = Vec::with_capacity(results.len() + 1);
        sheets.push((
            TABLE_PROPERTIES_SHEET.to_string(),
            self.read_csv(&format!("{}{}", prefix, TABLE_PROPERTIES_FILE))
                .await?,
        ));
        for result in results {
            let stem = result
                .file_name
                .strip_suffix(".csv")
                .unwrap_or(&result.file_name)
                .to_string();
            let frame = self
                .read_csv(&format!("{}{}", prefix, result.file_name))
                .await?;
            sheets.push((stem, frame));
        }

        let named: Vec<(&str, &Frame)> = sheets.iter().map(|(n, f)| (n.as_str(), f)).collect();
        let workbook = write_workbook(&named)?;

        let key = report_key(&date, &self.settings.report_name);
        self.store
            .put_object(
                &ObjectLocation::new(&self.settings.bucket_name, &key),
                workbook,
                XLSX_CONTENT_TYPE,
            )
            .await?;
        info!(key = %key, sheets = sheets.len(), "Uploaded workbook");

        let deleted = delete_prefix(self.store.as_ref(), &self.settings.bucket_name, &prefix).await?;
        info!(prefix = %prefix, deleted, "Deleted intermediate files");

        Ok(ExcelOutput {
            status: "success".to_string(),
            message: "Excel file generated successfully".to_string(),
            report_key: key,
            deleted,
        })
    }

    async fn read_csv(&self, key: &str) -> Result<Frame> {
        let bytes = self
            .store
            .get_object(&ObjectLocation::new(&self.settings.bucket_name, key))
            .await?;
        Ok(Frame::from_csv(&bytes)?)
    }
}
