//! Validated, idempotent warehouse loads
//!
//! An uploaded spreadsheet is checked against a stored schema descriptor,
//! reshaped for the warehouse, and written with delete-then-insert on its
//! load partition so a re-run for the same day replaces rather than
//! duplicates. Every outcome is announced on the notification topic.

use crate::ports::{Notifier, ObjectLocation, ObjectStore, Warehouse};
use crate::{Error, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use taa_core::schema::infer_column_types;
use taa_core::transform::prepare_for_load;
use taa_core::workbook::read_first_sheet;
use taa_core::{LoadPartition, RunDate, SchemaDescriptor};
use tracing::{error, info, instrument};

pub const SUCCESS_SUBJECT: &str = "Success";
pub const FAILURE_SUBJECT: &str = "Failure";

/// Optional table bootstrap run before every load
#[derive(Debug, Clone)]
pub struct TableDdl {
    /// DDL template with `@database`, `@schema` and `@table` tokens
    pub template: ObjectLocation,
    pub database: String,
    pub schema: String,
}

impl TableDdl {
    pub fn render(&self, template: &str, table: &str) -> String {
        template
            .replace("@database", &self.database)
            .replace("@schema", &self.schema)
            .replace("@table", table)
    }
}

#[derive(Debug, Clone)]
pub struct LoaderSettings {
    pub schema_location: ObjectLocation,
    pub table: String,
    pub create_table: Option<TableDdl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadResult {
    pub status: String,
    pub table: String,
    pub partition: LoadPartition,
    pub rows_deleted: u64,
    pub rows_inserted: u64,
}

pub struct DataLoader {
    store: Arc<dyn ObjectStore>,
    warehouse: Arc<dyn Warehouse>,
    notifier: Arc<dyn Notifier>,
    settings: LoaderSettings,
}

impl DataLoader {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        warehouse: Arc<dyn Warehouse>,
        notifier: Arc<dyn Notifier>,
        settings: LoaderSettings,
    ) -> Self {
        Self {
            store,
            warehouse,
            notifier,
            settings,
        }
    }

    /// Load `source` into today's partition
    pub async fn load(&self, source: &ObjectLocation) -> Result<LoadResult> {
        let today = RunDate::from_naive(Local::now().date_naive());
        self.load_for(source, LoadPartition::from_date(&today)).await
    }

    /// Load `source` into an explicit partition
    #[instrument(skip_all, fields(source = %source, partition = %partition, table = %self.settings.table))]
    pub async fn load_for(&self, source: &ObjectLocation, partition: LoadPartition) -> Result<LoadResult> {
        match self.try_load(source, partition).await {
            Ok(result) => {
                self.notifier
                    .publish(
                        Some(SUCCESS_SUBJECT),
                        &format!("Data loaded to Snowflake table: {}", self.settings.table),
                    )
                    .await?;
                Ok(result)
            }
            Err(e) => Err(self.reject(e).await),
        }
    }

    /// Announce a failed load and hand the error back
    ///
    /// Also used for invocations that fail before a source is known. A
    /// publish failure is logged; the load error is what the caller sees.
    pub async fn reject(&self, e: Error) -> Error {
        error!(error = %e, table = %self.settings.table, "Load failed");
        if let Err(publish_err) = self
            .notifier
            .publish(Some(FAILURE_SUBJECT), &e.to_string())
            .await
        {
            error!(error = %publish_err, "Failed to publish load failure");
        }
        e
    }

    async fn try_load(&self, source: &ObjectLocation, partition: LoadPartition) -> Result<LoadResult> {
        let frame = read_first_sheet(self.store.get_object(source).await?)?;
        let schema =
            SchemaDescriptor::from_json(&self.store.get_object(&self.settings.schema_location).await?)?;

        schema.validate(&infer_column_types(&frame))?;
        info!(rows = frame.len(), columns = frame.columns().len(), "Schema validated");

        let prepared = prepare_for_load(frame, &partition);

        if let Some(ddl) = &self.settings.create_table {
            let template = self.store.get_object(&ddl.template).await?;
            let template = String::from_utf8(template).map_err(|_| {
                Error::ResourceUnavailable(format!("table DDL {} is not UTF-8", ddl.template))
            })?;
            self.warehouse
                .execute(&ddl.render(&template, &self.settings.table))
                .await?;
            info!("Table bootstrap executed");
        }

        let rows_deleted = self
            .warehouse
            .delete_partition(&self.settings.table, &partition)
            .await?;
        let rows_inserted = self
            .warehouse
            .insert_frame(&self.settings.table, &prepared)
            .await?;
        info!(rows_deleted, rows_inserted, "Partition replaced");

        Ok(LoadResult {
            status: "Success".to_string(),
            table: self.settings.table.clone(),
            partition,
            rows_deleted,
            rows_inserted,
        })
    }
}
