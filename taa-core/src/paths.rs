//! Object key layout
//!
//! Every stage locates its inputs purely by key, so these formats are a
//! contract with the workflow definition and with downstream consumers.

use crate::dates::{Horizon, RunDate};

/// Prefix for horizon query results handed to the workflow
pub const INCOMING_PREFIX: &str = "processing/incoming";

/// Prefix for intermediate per-segment CSV files
pub const TEMP_CSV_PREFIX: &str = "processing/temp_csv_files";

/// Prefix for per-GL-code value files written by the parser
pub const GL_CODES_PREFIX: &str = "processing/gl_codes";

/// Edited purchase template written by the parser and read by the CSV generator
pub const EDITED_TEMPLATE_KEY: &str = "processing/PurchTempalte.csv";

/// Base purchase template the parser expands
pub const DEFAULT_TEMPLATE_KEY: &str = "template_files/PurchTempalte.csv";

/// Report file stem used when no name is configured
pub const DEFAULT_REPORT_NAME: &str = "Purchassetspreads";

/// Folder under the query bucket where the engine writes its results
pub const DEFAULT_RESULT_FOLDER: &str = "query_results";

/// File name of the table properties sheet source
pub const TABLE_PROPERTIES_FILE: &str = "TableProperties.csv";

/// Canonical key for one horizon's query result
///
/// `processing/incoming/year=<Y>/month=<M>/day=<D>/PurchaseAssetsBySegment_h<H>_<MMDDYY>.csv`
pub fn incoming_key(date: &RunDate, horizon: Horizon) -> String {
    format!(
        "{}/year={}/month={}/day={}/PurchaseAssetsBySegment_h{}_{}.csv",
        INCOMING_PREFIX,
        date.year(),
        date.month(),
        date.day(),
        horizon,
        date.file_date()
    )
}

/// Key of the query engine's raw result object
pub fn query_result_key(result_folder: &str, execution_id: &str) -> String {
    let folder = result_folder.trim_matches('/');
    if folder.is_empty() {
        format!("{}.csv", execution_id)
    } else {
        format!("{}/{}.csv", folder, execution_id)
    }
}

/// Date partition segment shared by intermediate and final artifacts
fn date_partition(date: &RunDate) -> String {
    format!(
        "yyyy={:04}/mm={:02}/dd={:02}",
        date.year(),
        date.month(),
        date.day()
    )
}

/// Prefix holding every intermediate CSV for a run (trailing slash included)
pub fn temp_csv_prefix(date: &RunDate) -> String {
    temp_csv_prefix_in(TEMP_CSV_PREFIX, date)
}

/// Same as [`temp_csv_prefix`] under a different root folder
pub fn temp_csv_prefix_in(root: &str, date: &RunDate) -> String {
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        format!("{}/", date_partition(date))
    } else {
        format!("{}/{}/", root, date_partition(date))
    }
}

/// Key of one intermediate CSV file under `root`
pub fn temp_csv_key(root: &str, date: &RunDate, file_name: &str) -> String {
    format!("{}{}", temp_csv_prefix_in(root, date), file_name)
}

/// Key of the value file for one GL code
pub fn gl_code_data_key(gl_code: &str) -> String {
    format!("{}/{}/data.json", GL_CODES_PREFIX, gl_code)
}

/// Key of the consolidated spreadsheet
///
/// `processed/yyyy=<Y>/mm=<M>/dd=<D>/<ReportName>.xlsx`
pub fn report_key(date: &RunDate, report_name: &str) -> String {
    format!("processed/{}/{}.xlsx", date_partition(date), report_name)
}
