//! In-memory runtime for testing.
//!
//! Available behind the `test-utils` feature flag. The runtime keeps its
//! inventory in memory, can be told to fail any admin request, can delay
//! newly added instances to exercise settle polling, and records every
//! request it receives.

mod in_memory_connector;
mod in_memory_runtime;

pub use in_memory_connector::InMemoryConnector;
pub use in_memory_runtime::{CallHandler, InMemoryRuntime, RuntimeOp};
