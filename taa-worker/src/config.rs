//! Per-function configuration
//!
//! Every function reads its settings from environment variables once, when
//! the handler is built. A missing required variable is a fatal
//! `Configuration` error naming that variable.

use std::str::FromStr;
use std::time::Duration;
use taa_cloud_aws::{AthenaSettings, SnowflakeConfig};
use taa_core::paths::{
    DEFAULT_REPORT_NAME, DEFAULT_RESULT_FOLDER, DEFAULT_TEMPLATE_KEY, TEMP_CSV_PREFIX,
};
use taa_runtime::excel_generator::ExcelSettings;
use taa_runtime::loader::TableDdl;
use taa_runtime::parser::ParserSettings;
use taa_runtime::query_runner::DEFAULT_POLL_INTERVAL;
use taa_runtime::trigger::TriggerSettings;
use taa_runtime::url_generator::{UrlSettings, DEFAULT_URL_EXPIRY};
use taa_runtime::{Error, ObjectLocation, Result};

/// Variable source; the process environment in production
pub struct Env<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

impl<'a> Env<'a> {
    pub fn new(lookup: &'a dyn Fn(&str) -> Option<String>) -> Self {
        Self { lookup }
    }

    pub fn process() -> Env<'static> {
        Env {
            lookup: &process_env,
        }
    }

    pub fn required(&self, name: &str) -> Result<String> {
        self.optional(name)
            .ok_or_else(|| Error::Configuration(format!("{} not set", name)))
    }

    pub fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.trim().is_empty())
    }

    pub fn parsed<T: FromStr>(&self, name: &str, default: T) -> Result<T>
    where
        T::Err: std::fmt::Display,
    {
        match self.optional(name) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| Error::Configuration(format!("Invalid {} value: {}", name, e))),
            None => Ok(default),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TriggerConfig {
    pub settings: TriggerSettings,
    pub state_machine_arn: String,
    pub sns_topic_arn: String,
    pub athena: AthenaSettings,
    pub poll_interval: Duration,
}

impl TriggerConfig {
    pub fn from_env() -> Result<Self> {
        Self::load(&Env::process())
    }

    pub fn load(env: &Env<'_>) -> Result<Self> {
        let athena = AthenaSettings {
            database: env.required("ATHENA_DATABASE")?,
            catalog: env
                .optional("ATHENA_CATALOG")
                .unwrap_or_else(|| AthenaSettings::DEFAULT_CATALOG.to_string()),
            workgroup: env.optional("ATHENA_WORKGROUP"),
        };
        athena.validate()?;

        let poll_secs = env.parsed("QUERY_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL.as_secs())?;
        if poll_secs == 0 {
            return Err(Error::Configuration(
                "QUERY_POLL_INTERVAL_SECS must be positive".into(),
            ));
        }

        Ok(Self {
            settings: TriggerSettings {
                bucket_name: env.required("BUCKET_NAME")?,
                query_key: env.required("QUERY_KEY")?,
                query_bucket_name: env.required("QUERY_BUCKET_NAME")?,
                result_folder: env
                    .optional("QUERY_RESULT_FOLDER")
                    .unwrap_or_else(|| DEFAULT_RESULT_FOLDER.to_string()),
            },
            state_machine_arn: env.required("STATE_MACHINE_ARN")?,
            sns_topic_arn: env.required("SNS_TOPIC_ARN")?,
            athena,
            poll_interval: Duration::from_secs(poll_secs),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub bucket_name: String,
    pub settings: ParserSettings,
    pub csv_root: String,
}

impl ParserConfig {
    pub fn from_env() -> Result<Self> {
        Self::load(&Env::process())
    }

    pub fn load(env: &Env<'_>) -> Result<Self> {
        Ok(Self {
            bucket_name: env.required("BUCKET_NAME")?,
            settings: ParserSettings {
                table_properties_key: env.required("TABLE_PPT_KEY")?,
                template_key: env
                    .optional("TEMPLATE_KEY")
                    .unwrap_or_else(|| DEFAULT_TEMPLATE_KEY.to_string()),
            },
            csv_root: csv_root(env),
        })
    }
}

/// Root folder of the intermediate CSV files
///
/// Every function touching those files must see the same value, so the
/// parser, CSV generator and cleanup read the variable the spreadsheet
/// generator requires.
fn csv_root(env: &Env<'_>) -> String {
    env.optional("CSV_FILE_KEY")
        .unwrap_or_else(|| TEMP_CSV_PREFIX.to_string())
}

/// Settings shared by the functions that work on the intermediate files of
/// the pipeline bucket
#[derive(Debug, Clone)]
pub struct BucketConfig {
    pub bucket_name: String,
    pub csv_root: String,
}

impl BucketConfig {
    pub fn from_env() -> Result<Self> {
        Self::load(&Env::process())
    }

    pub fn load(env: &Env<'_>) -> Result<Self> {
        Ok(Self {
            bucket_name: env.required("BUCKET_NAME")?,
            csv_root: csv_root(env),
        })
    }
}

pub type CsvGeneratorConfig = BucketConfig;
pub type CleanupConfig = BucketConfig;

#[derive(Debug, Clone)]
pub struct ExcelGeneratorConfig {
    pub settings: ExcelSettings,
}

impl ExcelGeneratorConfig {
    pub fn from_env() -> Result<Self> {
        Self::load(&Env::process())
    }

    pub fn load(env: &Env<'_>) -> Result<Self> {
        Ok(Self {
            settings: ExcelSettings {
                bucket_name: env.required("BUCKET_NAME")?,
                csv_root: env.required("CSV_FILE_KEY")?,
                report_name: report_name(env),
            },
        })
    }
}

#[derive(Debug, Clone)]
pub struct UrlGeneratorConfig {
    pub settings: UrlSettings,
}

impl UrlGeneratorConfig {
    pub fn from_env() -> Result<Self> {
        Self::load(&Env::process())
    }

    pub fn load(env: &Env<'_>) -> Result<Self> {
        let expiry = env.parsed("URL_EXPIRY_SECS", DEFAULT_URL_EXPIRY.as_secs())?;
        Ok(Self {
            settings: UrlSettings {
                bucket_name: env.required("BUCKET_NAME")?,
                report_name: report_name(env),
                expires_in: Duration::from_secs(expiry),
            },
        })
    }
}

fn report_name(env: &Env<'_>) -> String {
    env.optional("REPORT_NAME")
        .unwrap_or_else(|| DEFAULT_REPORT_NAME.to_string())
}

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub secret_id: String,
    pub schema_location: ObjectLocation,
    pub table: String,
    pub snowflake: SnowflakeConfig,
    pub sns_topic_arn: String,
    pub create_table: Option<TableDdl>,
}

impl LoaderConfig {
    pub fn from_env() -> Result<Self> {
        Self::load(&Env::process())
    }

    pub fn load(env: &Env<'_>) -> Result<Self> {
        let bucket = env.required("BUCKET")?;
        let snowflake = SnowflakeConfig {
            account: env.required("SNOWFLAKE_ACCOUNT")?,
            database: env.required("SNOWFLAKE_DATABASE")?,
            schema: env.required("SNOWFLAKE_SCHEMA")?,
            warehouse: env.required("SNOWFLAKE_WAREHOUSE")?,
            base_url: env.optional("SNOWFLAKE_API_URL"),
        };
        snowflake.validate()?;

        let create_table = env.optional("CREATE_TABLE_QUERY_KEY").map(|key| TableDdl {
            template: ObjectLocation::new(&bucket, key),
            database: snowflake.database.clone(),
            schema: snowflake.schema.clone(),
        });

        Ok(Self {
            secret_id: env.required("SNOWFLAKE_SECRET_ID")?,
            schema_location: ObjectLocation::new(&bucket, env.required("SCHEMA_KEY")?),
            table: env.required("SNOWFLAKE_TABLE")?,
            snowflake,
            sns_topic_arn: env.required("SNS_ARN")?,
            create_table,
        })
    }
}
