//! # TAA Core
//!
//! Domain model for the TAA segment purchase/asset spread pipeline: run
//! dates and horizons, object layout, query templates, the tabular `Frame`
//! shared by every stage, schema validation for warehouse loads, and the
//! per-segment fan-out rules.
//!
//! Nothing in this crate performs I/O. Stages in `taa-runtime` fetch bytes
//! through their service ports and hand them here for decoding.

pub mod dates;
pub mod frame;
pub mod paths;
pub mod payload;
pub mod query;
pub mod schema;
pub mod segments;
pub mod transform;
pub mod workbook;

// Re-export commonly used types
pub use dates::{DateField, FileDate, Horizon, RunDate, HORIZONS};
pub use frame::{Cell, Frame};
pub use payload::{SegmentRecord, TriggerEvent, TriggerPayload};
pub use query::{QueryParameters, QueryTemplate, Token};
pub use schema::{ColumnType, SchemaDescriptor, SchemaViolation};
pub use segments::SegmentValues;
pub use transform::LoadPartition;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Schema mismatch: {0}")]
    Schema(#[from] SchemaViolation),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::Csv(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e.to_string())
    }
}
