//! # API Route Modules
//!
//! - `verifications` — the kiosk-facing verification surface: submit one
//!   guest's verification attempt (the action dispatcher) and query the
//!   verification history.

pub mod verifications;
