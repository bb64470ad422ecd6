//! # TAA Cloud AWS
//!
//! Adapters binding the runtime's service ports to AWS (S3, Athena, Step
//! Functions, SNS, Secrets Manager) and to Snowflake's SQL REST API.

pub mod athena;
pub mod config;
pub mod s3;
pub mod secrets;
pub mod sfn;
pub mod snowflake;
pub mod snowflake_auth;
pub mod sns;

// Re-export commonly used types
pub use athena::AthenaQueryEngine;
pub use config::{load_sdk_config, AthenaSettings, SnowflakeConfig};
pub use s3::S3ObjectStore;
pub use secrets::{SecretsProvider, SnowflakeCredentials};
pub use sfn::StepFunctionsStarter;
pub use snowflake::SnowflakeWarehouse;
pub use snowflake_auth::KeyPairAuth;
pub use sns::SnsNotifier;

/// Result type for AWS adapter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for AWS adapter operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Snowflake error: {0}")]
    Snowflake(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<Error> for taa_runtime::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Configuration(msg) => taa_runtime::Error::Configuration(msg),
            Error::Internal(msg) => taa_runtime::Error::Internal(msg),
            other => taa_runtime::Error::Warehouse(other.to_string()),
        }
    }
}
