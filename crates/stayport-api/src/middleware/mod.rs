//! # Middleware Stack
//!
//! Tower middleware for the API layer:
//! - `TraceLayer` from tower-http for request/response tracing.
//! - [`metrics`]: Prometheus-compatible request and verification metrics.

pub mod metrics;
