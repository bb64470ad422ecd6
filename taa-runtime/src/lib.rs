//! # TAA Runtime
//!
//! Pipeline stages for the TAA segment pipeline and the service ports they
//! run against. Stages hold their collaborators as `Arc<dyn Port>` so the
//! same code runs against AWS in the worker and against in-memory mocks in
//! tests.

pub mod alert;
pub mod cleanup;
pub mod csv_generator;
pub mod excel_generator;
pub mod loader;
pub mod parser;
pub mod ports;
pub mod query_runner;
pub mod query_state;
pub mod relocator;
pub mod renderer;
pub mod trigger;
pub mod url_generator;

// Re-export commonly used types
pub use ports::{Notifier, ObjectLocation, ObjectStore, QueryEngine, Warehouse, WorkflowStarter};
pub use query_runner::QueryRunner;
pub use query_state::{QueryState, QueryStatus};
pub use trigger::TriggerOrchestrator;

use taa_core::SchemaViolation;

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for runtime operations
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Query engine error: {0}")]
    QueryEngine(String),

    #[error("Query execution {state}{}", failure_reason(.reason))]
    QueryExecutionFailed {
        state: QueryState,
        reason: Option<String>,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(SchemaViolation),

    #[error("Workflow start error: {0}")]
    WorkflowStart(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Warehouse error: {0}")]
    Warehouse(String),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn failure_reason(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(": {}", r))
        .unwrap_or_default()
}

impl From<taa_core::Error> for Error {
    fn from(e: taa_core::Error) -> Self {
        use taa_core::Error as Core;

        match e {
            Core::InvalidInput(msg) => Error::InvalidInput(msg),
            Core::MissingColumn(column) => {
                Error::InvalidInput(format!("missing column {:?}", column))
            }
            Core::Schema(violation) => Error::SchemaMismatch(violation),
            Core::Csv(msg) => Error::InvalidInput(format!("malformed CSV: {}", msg)),
            Core::Json(msg) => Error::InvalidInput(format!("malformed JSON: {}", msg)),
            Core::Spreadsheet(msg) => Error::Spreadsheet(msg),
        }
    }
}

impl From<SchemaViolation> for Error {
    fn from(v: SchemaViolation) -> Self {
        Error::SchemaMismatch(v)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidInput(format!("malformed JSON: {}", e))
    }
}
