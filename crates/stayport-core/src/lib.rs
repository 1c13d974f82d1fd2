//! # stayport-core — Foundational Types for the Stayport Stack
//!
//! Domain types shared by the kiosk API and the identity-verification
//! provider client:
//!
//! - [`VerificationAction`] — which subset of the verification pipeline to run
//! - [`GuestVerificationRecord`] — one append-only row per verification attempt
//! - [`GuestPosition`] — (guest_index, guest_count) with the last-guest rule
//! - [`SessionScope`] — reservation-keyed or walk-in time-windowed grouping
//! - [`SignatureMatch`] — explicit three-state signature reconciliation field
//! - Name normalization and adulthood derivation helpers
//!
//! No I/O lives here. Everything is constructible and testable without a
//! database, a provider, or a running server.

pub mod error;
pub mod guest;
pub mod names;
pub mod verification;

pub use error::ValidationError;
pub use guest::{GuestPosition, SessionScope, WALK_IN_WINDOW_MINUTES};
pub use names::{match_signature, normalize_name};
pub use verification::{
    is_adult, GuestVerificationRecord, SignatureMatch, VerificationAction, VerificationStatus,
    ADULT_AGE_YEARS,
};
