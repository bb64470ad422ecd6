//! Function dispatch
//!
//! A single binary serves every pipeline function. The function is chosen
//! at start-up; its adapters and configuration are built once and reused
//! for every invocation the execution environment receives.

use crate::config::{
    CleanupConfig, CsvGeneratorConfig, ExcelGeneratorConfig, LoaderConfig, ParserConfig,
    TriggerConfig, UrlGeneratorConfig,
};
use crate::types::{event_locations, CleanupEvent, CsvGeneratorEvent, CsvResultEnvelope};
use anyhow::Context;
use aws_config::SdkConfig;
use aws_lambda_events::event::s3::S3Event;
use clap::ValueEnum;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use taa_cloud_aws::{
    AthenaQueryEngine, KeyPairAuth, S3ObjectStore, SecretsProvider, SnowflakeWarehouse,
    SnsNotifier, StepFunctionsStarter,
};
use taa_core::TriggerPayload;
use taa_runtime::cleanup::IntermediateCleanup;
use taa_runtime::csv_generator::SegmentCsvGenerator;
use taa_runtime::excel_generator::WorkbookAssembler;
use taa_runtime::loader::{DataLoader, LoaderSettings};
use taa_runtime::parser::SegmentParser;
use taa_runtime::url_generator::{ReportUrlGenerator, UrlRequest};
use taa_runtime::{Error, ObjectLocation, ObjectStore, Result, TriggerOrchestrator};
use tracing::{error, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FunctionKind {
    Trigger,
    Parser,
    CsvGenerator,
    ExcelGenerator,
    UrlGenerator,
    Cleanup,
    Loader,
}

impl FunctionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FunctionKind::Trigger => "trigger",
            FunctionKind::Parser => "parser",
            FunctionKind::CsvGenerator => "csv-generator",
            FunctionKind::ExcelGenerator => "excel-generator",
            FunctionKind::UrlGenerator => "url-generator",
            FunctionKind::Cleanup => "cleanup",
            FunctionKind::Loader => "loader",
        }
    }
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The built stage behind one function
pub enum Handler {
    Trigger(TriggerOrchestrator),
    Parser(SegmentParser),
    CsvGenerator(SegmentCsvGenerator),
    ExcelGenerator(WorkbookAssembler),
    UrlGenerator(ReportUrlGenerator),
    Cleanup(IntermediateCleanup),
    Loader(DataLoader),
}

impl Handler {
    /// Read configuration and construct adapters for `kind`
    pub async fn build(kind: FunctionKind, sdk: &SdkConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::new(sdk));

        let handler = match kind {
            FunctionKind::Trigger => {
                let config = TriggerConfig::from_env()?;
                let orchestrator = TriggerOrchestrator::new(
                    config.settings,
                    store,
                    Arc::new(AthenaQueryEngine::new(sdk, config.athena)),
                    Arc::new(StepFunctionsStarter::new(sdk, config.state_machine_arn)),
                    Arc::new(SnsNotifier::new(sdk, config.sns_topic_arn)),
                )
                .with_poll_interval(config.poll_interval);
                Handler::Trigger(orchestrator)
            }
            FunctionKind::Parser => {
                let config = ParserConfig::from_env()?;
                // The parser reads its bucket from each payload
                info!(bucket = %config.bucket_name, "Parser configured");
                Handler::Parser(
                    SegmentParser::new(store, config.settings).with_csv_root(config.csv_root),
                )
            }
            FunctionKind::CsvGenerator => {
                let config = CsvGeneratorConfig::from_env()?;
                Handler::CsvGenerator(
                    SegmentCsvGenerator::new(store, config.bucket_name)
                        .with_csv_root(config.csv_root),
                )
            }
            FunctionKind::ExcelGenerator => {
                let config = ExcelGeneratorConfig::from_env()?;
                Handler::ExcelGenerator(WorkbookAssembler::new(store, config.settings))
            }
            FunctionKind::UrlGenerator => {
                let config = UrlGeneratorConfig::from_env()?;
                Handler::UrlGenerator(ReportUrlGenerator::new(store, config.settings))
            }
            FunctionKind::Cleanup => {
                let config = CleanupConfig::from_env()?;
                Handler::Cleanup(
                    IntermediateCleanup::new(store, config.bucket_name)
                        .with_csv_root(config.csv_root),
                )
            }
            FunctionKind::Loader => Handler::Loader(build_loader(sdk, store).await?),
        };

        info!(function = %kind, "Handler ready");
        Ok(handler)
    }

    pub fn kind(&self) -> FunctionKind {
        match self {
            Handler::Trigger(_) => FunctionKind::Trigger,
            Handler::Parser(_) => FunctionKind::Parser,
            Handler::CsvGenerator(_) => FunctionKind::CsvGenerator,
            Handler::ExcelGenerator(_) => FunctionKind::ExcelGenerator,
            Handler::UrlGenerator(_) => FunctionKind::UrlGenerator,
            Handler::Cleanup(_) => FunctionKind::Cleanup,
            Handler::Loader(_) => FunctionKind::Loader,
        }
    }

    /// Run one invocation
    #[instrument(skip_all, fields(function = %self.kind()))]
    pub async fn handle(&self, event: Value) -> Result<Value> {
        info!(event = %event, "Received event");

        let result = self.dispatch(event).await;
        if let Err(e) = &result {
            error!(error = %e, "Invocation failed");
        }
        result
    }

    async fn dispatch(&self, event: Value) -> Result<Value> {
        match self {
            Handler::Trigger(orchestrator) => to_json(&orchestrator.trigger(&event).await?),
            Handler::Parser(parser) => {
                let payload: TriggerPayload = serde_json::from_value(event)?;
                to_json(&parser.parse(&payload).await?)
            }
            Handler::CsvGenerator(generator) => {
                let event: CsvGeneratorEvent = serde_json::from_value(event)?;
                to_json(&generator.generate(&event.input).await?)
            }
            Handler::ExcelGenerator(assembler) => {
                let envelopes: Vec<CsvResultEnvelope> = serde_json::from_value(event)?;
                let results = CsvResultEnvelope::unwrap_all(envelopes);
                to_json(&assembler.assemble(&results).await?)
            }
            Handler::UrlGenerator(generator) => {
                let request: UrlRequest = serde_json::from_value(event)?;
                to_json(&generator.generate_url(&request.val_date).await?)
            }
            Handler::Cleanup(cleanup) => {
                let event: CleanupEvent = serde_json::from_value(event)?;
                to_json(&cleanup.clear(event.file_date).await?)
            }
            Handler::Loader(loader) => {
                let sources = match loader_sources(event) {
                    Ok(sources) => sources,
                    Err(e) => return Err(loader.reject(e).await),
                };
                let mut loaded = Vec::with_capacity(sources.len());
                for source in &sources {
                    loaded.push(loader.load(source).await?);
                }
                to_json(&loaded)
            }
        }
    }
}

/// Objects named by an upload notification; at least one
fn loader_sources(event: Value) -> Result<Vec<ObjectLocation>> {
    let event: S3Event = serde_json::from_value(event)?;
    let sources = event_locations(&event);
    if sources.is_empty() {
        return Err(Error::InvalidInput(
            "notification names no object".to_string(),
        ));
    }
    Ok(sources)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::Internal(format!("serialize output: {}", e)))
}

async fn build_loader(sdk: &SdkConfig, store: Arc<dyn ObjectStore>) -> anyhow::Result<DataLoader> {
    let config = LoaderConfig::from_env()?;

    let credentials = SecretsProvider::new(sdk)
        .snowflake_credentials(&config.secret_id)
        .await
        .context("Failed to load Snowflake credentials")?;
    let auth = KeyPairAuth::from_pem(
        &config.snowflake.account,
        &credentials.user,
        &credentials.private_key,
    )?;
    info!(user = %auth.qualified_user(), fingerprint = %auth.fingerprint(), "Snowflake key pair loaded");

    let warehouse = SnowflakeWarehouse::new(config.snowflake, auth)?;

    Ok(DataLoader::new(
        store,
        Arc::new(warehouse),
        Arc::new(SnsNotifier::new(sdk, config.sns_topic_arn)),
        LoaderSettings {
            schema_location: config.schema_location,
            table: config.table,
            create_table: config.create_table,
        },
    ))
}
