//! Query execution lifecycle

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a query execution as reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryState {
    /// Accepted, waiting for capacity
    Queued,

    /// Executing
    Running,

    /// Finished; results are available
    Succeeded,

    /// Finished with an error
    Failed,

    /// Stopped before finishing
    Cancelled,
}

impl QueryState {
    /// Parse the engine's wire name (`QUEUED`, `RUNNING`, ...)
    pub fn parse(state: &str) -> Option<Self> {
        match state.to_ascii_uppercase().as_str() {
            "QUEUED" => Some(QueryState::Queued),
            "RUNNING" => Some(QueryState::Running),
            "SUCCEEDED" => Some(QueryState::Succeeded),
            "FAILED" => Some(QueryState::Failed),
            "CANCELLED" => Some(QueryState::Cancelled),
            _ => None,
        }
    }

    /// Whether no further transition can occur
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            QueryState::Succeeded | QueryState::Failed | QueryState::Cancelled
        )
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryState::Queued => "queued",
            QueryState::Running => "running",
            QueryState::Succeeded => "succeeded",
            QueryState::Failed => "failed",
            QueryState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// One status observation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryStatus {
    pub state: QueryState,

    /// Engine-supplied explanation for failed or cancelled executions
    pub reason: Option<String>,
}

impl QueryStatus {
    pub fn new(state: QueryState) -> Self {
        Self { state, reason: None }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(QueryState::Succeeded.is_terminal());
        assert!(QueryState::Failed.is_terminal());
        assert!(QueryState::Cancelled.is_terminal());

        assert!(!QueryState::Queued.is_terminal());
        assert!(!QueryState::Running.is_terminal());
    }

    #[test]
    fn test_parse_wire_names() {
        assert_eq!(QueryState::parse("SUCCEEDED"), Some(QueryState::Succeeded));
        assert_eq!(QueryState::parse("cancelled"), Some(QueryState::Cancelled));
        assert_eq!(QueryState::parse("UNKNOWN"), None);
    }
}
