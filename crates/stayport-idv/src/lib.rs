//! # stayport-idv — Identity-Verification Provider Client
//!
//! Client for the external verification capability the kiosk flow depends on:
//! ID-document OCR, government registry status checks, and live-capture face
//! matching. The provider is a remote black box with its own latency and
//! failure modes — this crate owns the transport, never the verdict logic.
//!
//! ## Architecture
//!
//! The [`IdvProvider`] trait abstracts over the provider backend. Production
//! deployments use [`HttpIdvProvider`] against the live API; tests and
//! keyless development environments use [`MockIdvProvider`]. Both are
//! `Send + Sync` and shared via `Arc` across request tasks.
//!
//! ## Error Handling
//!
//! Transport failures, non-2xx responses, and undecodable bodies are mapped
//! to [`IdvError`] with the endpoint and a body excerpt for diagnostics.
//! Callers (the verification pipeline) convert these into field-level
//! failures — an `IdvError` never aborts a check-in attempt on its own.

pub mod config;
pub mod error;
pub mod http;
pub mod mock;
pub mod provider;
mod retry;

pub use config::{ConfigError, IdvConfig};
pub use error::IdvError;
pub use http::HttpIdvProvider;
pub use mock::MockIdvProvider;
pub use provider::{FaceMatchResult, IdvProvider, OcrFields, StatusCheckResult};
