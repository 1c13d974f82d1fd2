//! # Validation Error Hierarchy
//!
//! Structured validation errors raised at type-construction and
//! request-validation time. These are the only errors the core crate
//! produces — provider and persistence failures live in their own crates.

use thiserror::Error;

/// Validation failures for core domain types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// `guest_count` must be at least 1.
    #[error("guest_count must be at least 1, got {0}")]
    EmptyGuestCount(u32),

    /// `guest_index` must lie within `[0, guest_count - 1]`.
    #[error("guest_index {guest_index} out of range for guest_count {guest_count}")]
    GuestIndexOutOfRange {
        /// The out-of-range index.
        guest_index: u32,
        /// The session's guest count.
        guest_count: u32,
    },

    /// A required image was not supplied for the requested action.
    #[error("missing required image: {0}")]
    MissingImage(&'static str),

    /// A field that must be non-empty was empty or whitespace-only.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}
