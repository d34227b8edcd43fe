//! Observability utilities for the agent toolkit.

#![warn(missing_docs, clippy::pedantic)]

pub mod tracing_support;

pub use tracing_support::{build_filter, init_tracing};
