//! Observability setup shared by evhub binaries.

pub mod tracing_setup;
