//! TAA segment pipeline Lambda worker
//!
//! Configuration, log setup, invocation payloads and dispatch for the
//! functions the `taa-worker` binary can serve.

pub mod config;
pub mod handler;
pub mod tracing_config;
pub mod types;

pub use handler::{FunctionKind, Handler};
