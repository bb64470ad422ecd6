//! Shared test utilities for the TAA pipeline crates
//!
//! - **Mocks**: in-memory doubles for every service port
//! - **Fixtures**: horizon results, templates and schema descriptors
//! - **Builders**: trigger events and frames
//!
//! # Example
//!
//! ```ignore
//! use taa_tests::{builders::TriggerEventBuilder, fixtures, mocks::InMemoryObjectStore};
//!
//! let store = InMemoryObjectStore::new();
//! store.insert(fixtures::BUCKET, fixtures::QUERY_KEY, fixtures::QUERY_TEMPLATE);
//! let event = TriggerEventBuilder::new().date(2024, 1, 9).build();
//! ```

pub mod builders;
pub mod fixtures;
pub mod mocks;

pub use builders::{FrameBuilder, TriggerEventBuilder};
pub use mocks::{
    InMemoryObjectStore, InMemoryWarehouse, RecordingNotifier, RecordingWorkflowStarter,
    ScriptedExecution, ScriptedQueryEngine,
};
