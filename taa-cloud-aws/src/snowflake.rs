//! Snowflake warehouse over the SQL REST API
//!
//! Statements go to `POST /api/v2/statements` with a key-pair JWT. A `202`
//! means the statement is still running; its status URL is polled until it
//! completes. Inserts bind one array per column so each request carries a
//! whole batch of rows.

use crate::config::SnowflakeConfig;
use crate::snowflake_auth::KeyPairAuth;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;
use taa_core::{Cell, Frame, LoadPartition};
use taa_runtime::Warehouse;
use tracing::{debug, info, instrument, warn};

/// Rows bound per INSERT request
pub const INSERT_BATCH_SIZE: usize = 1000;

/// Server-side statement timeout, seconds
const STATEMENT_TIMEOUT_SECS: u64 = 300;

const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    statement: &'a str,
    timeout: u64,
    database: &'a str,
    schema: &'a str,
    warehouse: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    bindings: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementResponse {
    #[serde(default)]
    statement_handle: Option<String>,
    #[serde(default)]
    statement_status_url: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    stats: Option<StatementStats>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementStats {
    #[serde(default)]
    num_rows_inserted: u64,
    #[serde(default)]
    num_rows_deleted: u64,
}

/// Bind type of one column, decided from its cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindType {
    Fixed,
    Real,
    Boolean,
    Timestamp,
    Text,
}

impl BindType {
    fn name(self) -> &'static str {
        match self {
            BindType::Fixed => "FIXED",
            BindType::Real => "REAL",
            BindType::Boolean => "BOOLEAN",
            BindType::Timestamp => "TIMESTAMP_NTZ",
            BindType::Text => "TEXT",
        }
    }

    fn for_cells<'a>(cells: impl Iterator<Item = &'a Cell>) -> Self {
        let mut kind: Option<BindType> = None;
        for cell in cells {
            let this = match cell {
                Cell::Empty => continue,
                Cell::Int(_) => BindType::Fixed,
                Cell::Float(_) => BindType::Real,
                Cell::Bool(_) => BindType::Boolean,
                Cell::DateTime(_) => BindType::Timestamp,
                Cell::Text(_) => BindType::Text,
            };
            kind = Some(match (kind, this) {
                (None, t) => t,
                (Some(a), b) if a == b => a,
                (Some(BindType::Fixed), BindType::Real) | (Some(BindType::Real), BindType::Fixed) => {
                    BindType::Real
                }
                _ => BindType::Text,
            });
        }
        kind.unwrap_or(BindType::Text)
    }
}

/// Text form of a cell as the SQL API expects bound values
fn bind_value(cell: &Cell) -> Value {
    match cell {
        Cell::Empty => Value::Null,
        Cell::Bool(b) => Value::String(b.to_string()),
        Cell::DateTime(dt) => Value::String(dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        Cell::Float(f) => Value::String(f.to_string()),
        other => Value::String(other.to_string()),
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub struct SnowflakeWarehouse {
    http: reqwest::Client,
    base_url: String,
    config: SnowflakeConfig,
    auth: KeyPairAuth,
}

impl SnowflakeWarehouse {
    pub fn new(config: SnowflakeConfig, auth: KeyPairAuth) -> Result<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(STATEMENT_TIMEOUT_SECS + 30))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.api_base_url(),
            config,
            auth,
        })
    }

    /// `DATABASE.SCHEMA.TABLE`
    pub fn qualified_table(&self, table: &str) -> String {
        format!("{}.{}.{}", self.config.database, self.config.schema, table)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder> {
        Ok(request
            .bearer_auth(self.auth.token()?)
            .header("X-Snowflake-Authorization-Token-Type", "KEYPAIR_JWT")
            .header("Accept", "application/json"))
    }

    /// Submit one statement and wait for it to finish
    async fn submit(
        &self,
        statement: &str,
        bindings: Option<Map<String, Value>>,
        parameters: Option<Value>,
    ) -> Result<StatementResponse> {
        let body = StatementRequest {
            statement,
            timeout: STATEMENT_TIMEOUT_SECS,
            database: &self.config.database,
            schema: &self.config.schema,
            warehouse: &self.config.warehouse,
            bindings,
            parameters,
        };

        let request = self
            .http
            .post(format!("{}/api/v2/statements", self.base_url))
            .json(&body);
        let response = self.authorized(request)?.send().await?;
        let mut outcome = Self::read_response(response).await?;

        while let Some(status_url) = outcome.pending.take() {
            debug!(status_url = %status_url, "Statement still running");
            tokio::time::sleep(STATUS_POLL_INTERVAL).await;
            let request = self.http.get(format!("{}{}", self.base_url, status_url));
            let response = self.authorized(request)?.send().await?;
            outcome = Self::read_response(response).await?;
        }

        Ok(outcome.response)
    }

    async fn read_response(response: reqwest::Response) -> Result<Outcome> {
        let status = response.status();
        let text = response.text().await?;
        let parsed: StatementResponse = if text.trim().is_empty() {
            StatementResponse::default()
        } else {
            serde_json::from_str(&text).map_err(|e| {
                Error::Snowflake(format!("unexpected response ({}): {}", status, e))
            })?
        };

        match status {
            StatusCode::OK => Ok(Outcome {
                response: parsed,
                pending: None,
            }),
            StatusCode::ACCEPTED => {
                let url = parsed.statement_status_url.clone().or_else(|| {
                    parsed
                        .statement_handle
                        .as_ref()
                        .map(|h| format!("/api/v2/statements/{}", h))
                });
                match url {
                    Some(url) => Ok(Outcome {
                        response: parsed,
                        pending: Some(url),
                    }),
                    None => Err(Error::Snowflake(
                        "statement accepted without a status URL".to_string(),
                    )),
                }
            }
            other => {
                let message = parsed.message.unwrap_or(text);
                warn!(status = %other, message = %message, "Statement failed");
                Err(Error::Snowflake(format!("{}: {}", other, message)))
            }
        }
    }

    async fn insert_batches(&self, table: &str, frame: &Frame) -> Result<u64> {
        let columns = frame.columns();
        let bind_types: Vec<BindType> = (0..columns.len())
            .map(|i| BindType::for_cells(frame.rows().iter().map(|r| &r[i])))
            .collect();

        let statement = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.qualified_table(table),
            columns
                .iter()
                .map(|c| quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", "),
            vec!["?"; columns.len()].join(", ")
        );

        let mut inserted = 0;
        for batch in frame.rows().chunks(INSERT_BATCH_SIZE) {
            let mut bindings = Map::new();
            for (i, bind_type) in bind_types.iter().enumerate() {
                let values: Vec<Value> = batch.iter().map(|row| bind_value(&row[i])).collect();
                bindings.insert(
                    (i + 1).to_string(),
                    json!({"type": bind_type.name(), "value": values}),
                );
            }

            let response = self.submit(&statement, Some(bindings), None).await?;
            let count = response
                .stats
                .map(|s| s.num_rows_inserted)
                .unwrap_or(batch.len() as u64);
            debug!(batch = batch.len(), inserted = count, "Inserted batch");
            inserted += count;
        }
        Ok(inserted)
    }
}

struct Outcome {
    response: StatementResponse,
    pending: Option<String>,
}

#[async_trait]
impl Warehouse for SnowflakeWarehouse {
    #[instrument(skip(self, statement))]
    async fn execute(&self, statement: &str) -> taa_runtime::Result<()> {
        // MULTI_STATEMENT_COUNT=0 lets DDL scripts carry several statements
        self.submit(
            statement,
            None,
            Some(json!({"MULTI_STATEMENT_COUNT": "0"})),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self, partition), fields(partition = %partition))]
    async fn delete_partition(
        &self,
        table: &str,
        partition: &LoadPartition,
    ) -> taa_runtime::Result<u64> {
        let [c_year, c_month, c_day] = LoadPartition::COLUMNS;
        let statement = format!(
            "DELETE FROM {} WHERE {} = ? AND {} = ? AND {} = ?",
            self.qualified_table(table),
            c_year,
            c_month,
            c_day
        );

        let mut bindings = Map::new();
        for (i, value) in partition.values().iter().enumerate() {
            bindings.insert(
                (i + 1).to_string(),
                json!({"type": "FIXED", "value": value.to_string()}),
            );
        }

        let response = self.submit(&statement, Some(bindings), None).await?;
        let deleted = response.stats.map(|s| s.num_rows_deleted).unwrap_or(0);
        info!(deleted, "Deleted existing partition rows");
        Ok(deleted)
    }

    #[instrument(skip(self, frame), fields(rows = frame.len()))]
    async fn insert_frame(&self, table: &str, frame: &Frame) -> taa_runtime::Result<u64> {
        if frame.is_empty() {
            return Ok(0);
        }
        let inserted = self.insert_batches(table, frame).await?;
        info!(inserted, "Inserted rows");
        Ok(inserted)
    }
}
