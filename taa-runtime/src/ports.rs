//! Service ports for the managed collaborators
//!
//! Each trait is the narrow slice of a managed service one or more stages
//! need. Implementations map provider failures onto the runtime taxonomy;
//! the expected variant is documented on each method.

use crate::query_state::QueryStatus;
use crate::Result;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use taa_core::{Frame, LoadPartition};

/// A bucket/key pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Object storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read a whole object
    ///
    /// A missing object or bucket is `ResourceUnavailable`; any other
    /// failure is `Storage`.
    async fn get_object(&self, location: &ObjectLocation) -> Result<Vec<u8>>;

    /// Write a whole object, replacing any existing one
    async fn put_object(
        &self,
        location: &ObjectLocation,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<()>;

    /// Server-side copy; `Storage` when the source is missing or the copy is rejected
    async fn copy_object(&self, source: &ObjectLocation, dest: &ObjectLocation) -> Result<()>;

    /// Keys under a prefix, in lexicographic order
    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;

    /// Delete one object; deleting a missing key succeeds
    async fn delete_object(&self, location: &ObjectLocation) -> Result<()>;

    /// Time-limited GET URL for an object
    async fn presign_get(&self, location: &ObjectLocation, expires_in: Duration) -> Result<String>;
}

/// Asynchronous SQL query engine
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Submit a query whose results are written under `output_location`
    ///
    /// Returns the execution id. Transport or API failures are `QueryEngine`.
    async fn start_query(&self, query: &str, output_location: &str) -> Result<String>;

    /// Current status of a submitted execution
    async fn query_status(&self, execution_id: &str) -> Result<QueryStatus>;
}

/// Multi-step workflow orchestrator
#[async_trait]
pub trait WorkflowStarter: Send + Sync {
    /// Start one execution with `input` as its sole input
    ///
    /// Returns the execution identifier reported by the orchestrator, which
    /// may be empty if none was reported.
    async fn start_execution(&self, input: &serde_json::Value) -> Result<String>;
}

/// Notification topic
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Publish one message; failures are `Notification`
    async fn publish(&self, subject: Option<&str>, message: &str) -> Result<()>;
}

/// Data warehouse table access
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Execute a statement whose result is not needed (DDL, setup)
    async fn execute(&self, statement: &str) -> Result<()>;

    /// Delete every row of `table` stamped with `partition`; returns rows deleted
    async fn delete_partition(&self, table: &str, partition: &LoadPartition) -> Result<u64>;

    /// Insert every row of `frame`, columns matched by name; returns rows inserted
    async fn insert_frame(&self, table: &str, frame: &Frame) -> Result<u64>;
}
