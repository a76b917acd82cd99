//! Worker Responses
//!
//! Entry point for asynchronous reports from workers. A runner posts its test
//! outputs; a builder posts a tool-level error instead. Either one closes the
//! work item and records a [`types::WorkResult`]; runner reports also record one
//! [`types::TestResult`] per test and queue the notifications they asked for.

pub mod types;
pub mod protocol;
pub mod results;
pub mod collector;
pub mod handlers;

pub use collector::{Outcome, ResponseCollector};
pub use results::{MemoryResultStore, ResultStore};

#[cfg(test)]
mod tests;
