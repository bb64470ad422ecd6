//! In-memory implementations of the service ports
//!
//! Every double records what it was asked to do so tests can assert on the
//! calls as well as on the results.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use taa_core::{Cell, Frame, LoadPartition};
use taa_runtime::{
    Error, Notifier, ObjectLocation, ObjectStore, QueryEngine, QueryState, QueryStatus, Result,
    Warehouse, WorkflowStarter,
};

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    content_type: String,
}

/// Object store keyed by `(bucket, key)`
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<BTreeMap<(String, String), StoredObject>>,
    failing_prefixes: Mutex<Vec<String>>,
    copies: Mutex<Vec<(ObjectLocation, ObjectLocation)>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        self.objects.lock().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body: body.into(),
                content_type: "application/octet-stream".to_string(),
            },
        );
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.body.clone())
    }

    pub fn get_text(&self, bucket: &str, key: &str) -> Option<String> {
        self.get(bucket, key)
            .map(|b| String::from_utf8_lossy(&b).into_owned())
    }

    pub fn content_type(&self, bucket: &str, key: &str) -> Option<String> {
        self.objects
            .lock()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.content_type.clone())
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.get(bucket, key).is_some()
    }

    /// Every key of `bucket`, sorted
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    /// Make every write under `prefix` fail with `Storage`
    pub fn fail_writes_under(&self, prefix: &str) {
        self.failing_prefixes.lock().push(prefix.to_string());
    }

    pub fn copies(&self) -> Vec<(ObjectLocation, ObjectLocation)> {
        self.copies.lock().clone()
    }

    fn check_writable(&self, location: &ObjectLocation) -> Result<()> {
        if self
            .failing_prefixes
            .lock()
            .iter()
            .any(|p| location.key.starts_with(p.as_str()))
        {
            return Err(Error::Storage(format!("write to {} rejected", location)));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get_object(&self, location: &ObjectLocation) -> Result<Vec<u8>> {
        self.get(&location.bucket, &location.key)
            .ok_or_else(|| Error::ResourceUnavailable(format!("{} does not exist", location)))
    }

    async fn put_object(
        &self,
        location: &ObjectLocation,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        self.check_writable(location)?;
        self.objects.lock().insert(
            (location.bucket.clone(), location.key.clone()),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn copy_object(&self, source: &ObjectLocation, dest: &ObjectLocation) -> Result<()> {
        self.check_writable(dest)?;
        let object = self
            .objects
            .lock()
            .get(&(source.bucket.clone(), source.key.clone()))
            .cloned()
            .ok_or_else(|| Error::Storage(format!("copy source {} does not exist", source)))?;
        self.objects
            .lock()
            .insert((dest.bucket.clone(), dest.key.clone()), object);
        self.copies.lock().push((source.clone(), dest.clone()));
        Ok(())
    }

    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .keys(bucket)
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect())
    }

    async fn delete_object(&self, location: &ObjectLocation) -> Result<()> {
        self.objects
            .lock()
            .remove(&(location.bucket.clone(), location.key.clone()));
        Ok(())
    }

    async fn presign_get(&self, location: &ObjectLocation, expires_in: Duration) -> Result<String> {
        Ok(format!(
            "https://{}.s3.amazonaws.com/{}?X-Amz-Expires={}",
            location.bucket,
            location.key,
            expires_in.as_secs()
        ))
    }
}

/// One scripted execution: statuses returned by successive polls and the
/// CSV the engine writes as its result
#[derive(Debug, Clone)]
pub struct ScriptedExecution {
    pub statuses: Vec<QueryStatus>,
    pub result_csv: Option<String>,
}

impl ScriptedExecution {
    /// Running for `polls` checks, then succeeded with `csv` as the result
    pub fn succeeds_after(polls: usize, csv: &str) -> Self {
        let mut statuses = vec![QueryStatus::new(QueryState::Running); polls];
        statuses.push(QueryStatus::new(QueryState::Succeeded));
        Self {
            statuses,
            result_csv: Some(csv.to_string()),
        }
    }

    pub fn fails(reason: &str) -> Self {
        Self {
            statuses: vec![
                QueryStatus::new(QueryState::Running),
                QueryStatus::new(QueryState::Failed).with_reason(reason),
            ],
            result_csv: None,
        }
    }
}

#[derive(Default)]
struct EngineState {
    scripts: VecDeque<ScriptedExecution>,
    running: HashMap<String, VecDeque<QueryStatus>>,
    submitted: Vec<(String, String)>,
    polls: usize,
}

/// Query engine replaying scripted executions in submission order
///
/// Successful executions write their result CSV into the store at
/// `<output_location><execution id>.csv`, as the managed engine does.
pub struct ScriptedQueryEngine {
    store: Arc<InMemoryObjectStore>,
    state: Mutex<EngineState>,
}

impl ScriptedQueryEngine {
    pub fn new(store: Arc<InMemoryObjectStore>, scripts: Vec<ScriptedExecution>) -> Arc<Self> {
        Arc::new(Self {
            store,
            state: Mutex::new(EngineState {
                scripts: scripts.into(),
                ..Default::default()
            }),
        })
    }

    /// `(query, output_location)` per submission
    pub fn submitted(&self) -> Vec<(String, String)> {
        self.state.lock().submitted.clone()
    }

    pub fn polls(&self) -> usize {
        self.state.lock().polls
    }
}

fn split_s3_uri(uri: &str) -> Option<(&str, &str)> {
    uri.strip_prefix("s3://")?.split_once('/')
}

#[async_trait]
impl QueryEngine for ScriptedQueryEngine {
    async fn start_query(&self, query: &str, output_location: &str) -> Result<String> {
        let mut state = self.state.lock();
        let script = state
            .scripts
            .pop_front()
            .ok_or_else(|| Error::QueryEngine("no scripted execution left".to_string()))?;

        let execution_id = format!("exec-{}", state.submitted.len() + 1);
        state
            .submitted
            .push((query.to_string(), output_location.to_string()));

        if let (Some(csv), Some((bucket, prefix))) =
            (&script.result_csv, split_s3_uri(output_location))
        {
            self.store
                .insert(bucket, &format!("{}{}.csv", prefix, execution_id), csv.as_bytes());
        }
        state
            .running
            .insert(execution_id.clone(), script.statuses.into());
        Ok(execution_id)
    }

    async fn query_status(&self, execution_id: &str) -> Result<QueryStatus> {
        let mut state = self.state.lock();
        state.polls += 1;
        let statuses = state
            .running
            .get_mut(execution_id)
            .ok_or_else(|| Error::QueryEngine(format!("unknown execution {}", execution_id)))?;

        // The last status sticks once reached
        let status = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };
        status.ok_or_else(|| Error::QueryEngine(format!("execution {} has no status", execution_id)))
    }
}

/// Workflow starter recording every input
pub struct RecordingWorkflowStarter {
    execution_arn: String,
    rejection: Option<String>,
    inputs: Mutex<Vec<Value>>,
}

impl RecordingWorkflowStarter {
    pub fn new(execution_arn: &str) -> Arc<Self> {
        Arc::new(Self {
            execution_arn: execution_arn.to_string(),
            rejection: None,
            inputs: Mutex::new(Vec::new()),
        })
    }

    /// Accepts every start but reports no execution identifier
    pub fn without_execution_id() -> Arc<Self> {
        Self::new("")
    }

    /// Rejects every start with `WorkflowStart`
    pub fn rejecting(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            execution_arn: String::new(),
            rejection: Some(reason.to_string()),
            inputs: Mutex::new(Vec::new()),
        })
    }

    pub fn inputs(&self) -> Vec<Value> {
        self.inputs.lock().clone()
    }
}

#[async_trait]
impl WorkflowStarter for RecordingWorkflowStarter {
    async fn start_execution(&self, input: &Value) -> Result<String> {
        self.inputs.lock().push(input.clone());
        match &self.rejection {
            Some(reason) => Err(Error::WorkflowStart(reason.clone())),
            None => Ok(self.execution_arn.clone()),
        }
    }
}

/// A published notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub subject: Option<String>,
    pub message: String,
}

/// Notifier recording every publish, optionally failing them
#[derive(Default)]
pub struct RecordingNotifier {
    published: Mutex<Vec<Published>>,
    failing: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let notifier = Self::default();
        *notifier.failing.lock() = true;
        Arc::new(notifier)
    }

    /// Attempted publishes, including failed ones
    pub fn published(&self) -> Vec<Published> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn publish(&self, subject: Option<&str>, message: &str) -> Result<()> {
        self.published.lock().push(Published {
            subject: subject.map(str::to_string),
            message: message.to_string(),
        });
        if *self.failing.lock() {
            return Err(Error::Notification("topic unavailable".to_string()));
        }
        Ok(())
    }
}

/// Warehouse holding each table as a frame
#[derive(Default)]
pub struct InMemoryWarehouse {
    tables: Mutex<HashMap<String, Frame>>,
    statements: Mutex<Vec<String>>,
}

impl InMemoryWarehouse {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn table(&self, name: &str) -> Option<Frame> {
        self.tables.lock().get(name).cloned()
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().clone()
    }
}

#[async_trait]
impl Warehouse for InMemoryWarehouse {
    async fn execute(&self, statement: &str) -> Result<()> {
        self.statements.lock().push(statement.to_string());
        Ok(())
    }

    async fn delete_partition(&self, table: &str, partition: &LoadPartition) -> Result<u64> {
        let mut tables = self.tables.lock();
        let Some(existing) = tables.get_mut(table) else {
            return Ok(0);
        };
        let Some(indices) = LoadPartition::COLUMNS
            .iter()
            .map(|c| existing.column_index(c))
            .collect::<Option<Vec<_>>>()
        else {
            return Ok(0);
        };

        let values = partition.values();
        let before = existing.len();
        existing.retain_rows(|row| {
            !indices
                .iter()
                .zip(values)
                .all(|(&idx, value)| row[idx] == Cell::Int(value))
        });
        Ok((before - existing.len()) as u64)
    }

    async fn insert_frame(&self, table: &str, frame: &Frame) -> Result<u64> {
        let mut tables = self.tables.lock();
        let target = tables
            .entry(table.to_string())
            .or_insert_with(|| Frame::new(frame.columns().to_vec()));

        let mapping = target
            .columns()
            .iter()
            .map(|c| {
                frame
                    .column_index(c)
                    .ok_or_else(|| Error::Warehouse(format!("invalid identifier '{}'", c)))
            })
            .collect::<Result<Vec<_>>>()?;

        for row in frame.rows() {
            let mapped = mapping.iter().map(|&i| row[i].clone()).collect();
            target
                .push_row(mapped)
                .map_err(|e| Error::Warehouse(e.to_string()))?;
        }
        Ok(frame.len() as u64)
    }
}
