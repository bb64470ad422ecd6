//! Trigger orchestration
//!
//! For one run date, renders and runs the horizon query for each horizon in
//! turn, relocates each result to its canonical key, and starts the
//! downstream workflow with the collected keys. Horizons run sequentially;
//! the first failure aborts the run, so a payload always carries one key per
//! horizon or is never sent.
//!
//! Any failure is followed by an alert publish and then returned unchanged.
//! If the alert publish fails, its `Notification` error is returned instead.

use crate::alert::publish_failure_alert;
use crate::ports::{Notifier, ObjectLocation, ObjectStore, QueryEngine, WorkflowStarter};
use crate::query_runner::QueryRunner;
use crate::relocator::ResultRelocator;
use crate::renderer::QueryRenderer;
use crate::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use taa_core::paths::{incoming_key, query_result_key};
use taa_core::{TriggerEvent, TriggerPayload, HORIZONS};
use tracing::{info, instrument};

/// Buckets and keys the trigger works with
#[derive(Debug, Clone)]
pub struct TriggerSettings {
    /// Pipeline bucket: holds the query template and receives relocated results
    pub bucket_name: String,

    /// Key of the query template inside `bucket_name`
    pub query_key: String,

    /// Bucket the query engine writes results to
    pub query_bucket_name: String,

    /// Folder inside `query_bucket_name` for engine results
    pub result_folder: String,
}

/// What a successful trigger produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerOutcome {
    pub payload: TriggerPayload,
    pub execution_arn: String,
}

pub struct TriggerOrchestrator {
    settings: TriggerSettings,
    renderer: QueryRenderer,
    runner: QueryRunner,
    relocator: ResultRelocator,
    workflow: Arc<dyn WorkflowStarter>,
    notifier: Arc<dyn Notifier>,
}

impl TriggerOrchestrator {
    pub fn new(
        settings: TriggerSettings,
        store: Arc<dyn ObjectStore>,
        engine: Arc<dyn QueryEngine>,
        workflow: Arc<dyn WorkflowStarter>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            settings,
            renderer: QueryRenderer::new(store.clone()),
            runner: QueryRunner::new(engine),
            relocator: ResultRelocator::new(store),
            workflow,
            notifier,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.runner = self.runner.with_poll_interval(poll_interval);
        self
    }

    /// Run the trigger for a `{year, month, day}` event
    #[instrument(skip_all, fields(event = %event))]
    pub async fn trigger(&self, event: &Value) -> Result<TriggerOutcome> {
        match self.run(event).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                publish_failure_alert(self.notifier.as_ref(), &e, event).await?;
                Err(e)
            }
        }
    }

    async fn run(&self, event: &Value) -> Result<TriggerOutcome> {
        let event: TriggerEvent = serde_json::from_value(event.clone())?;
        let date = event.run_date()?;
        let template = ObjectLocation::new(&self.settings.bucket_name, &self.settings.query_key);

        let mut keys = Vec::with_capacity(HORIZONS.len());
        for horizon in HORIZONS {
            let query = self.renderer.render(&date, horizon, &template).await?;
            let execution_id = self
                .runner
                .run(
                    &query,
                    &self.settings.query_bucket_name,
                    &self.settings.result_folder,
                )
                .await?;
            info!(horizon = %horizon, execution_id = %execution_id, "Horizon query succeeded");

            let source = ObjectLocation::new(
                &self.settings.query_bucket_name,
                query_result_key(&self.settings.result_folder, &execution_id),
            );
            let dest = ObjectLocation::new(&self.settings.bucket_name, incoming_key(&date, horizon));
            self.relocator.relocate(&source, &dest).await?;
            keys.push(dest.key);
        }

        let payload = TriggerPayload {
            bucket_name: self.settings.bucket_name.clone(),
            key: keys,
            file_date: date.file_date(),
        };
        let input = serde_json::to_value(&payload)?;
        info!(payload = %input, "Starting workflow");

        let execution_arn = self.workflow.start_execution(&input).await?;
        if execution_arn.is_empty() {
            return Err(Error::WorkflowStart(
                "workflow start returned no execution identifier".to_string(),
            ));
        }
        info!(execution_arn = %execution_arn, "Workflow started");

        Ok(TriggerOutcome {
            payload,
            execution_arn,
        })
    }
}
