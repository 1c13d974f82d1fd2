//! # Guest Session Scoping
//!
//! A check-in session covers one or more guests. The session is identified by
//! a reservation when one exists; walk-ins fall back to a trailing time window
//! scoped to the project. Both the reconciliation pool query and the record
//! store must apply the same scoping rule, so it is defined once here.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ValidationError;

/// Width of the walk-in session window, in minutes.
///
/// Without a reservation id there is no strong session key; verified guests
/// of the same project within this trailing window are treated as one party.
/// This is a heuristic carried from the kiosk flow — concurrent walk-ins at
/// the same project can be mis-scoped, which is why reservation-keyed scoping
/// is always preferred when available.
pub const WALK_IN_WINDOW_MINUTES: i64 = 30;

/// A guest's position within its check-in session.
///
/// Invariant: `guest_count >= 1` and `guest_index < guest_count`, enforced at
/// construction. Signature reconciliation only ever runs for the last guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GuestPosition {
    /// 0-based index of this guest within the session.
    pub guest_index: u32,
    /// Total number of guests in the session.
    pub guest_count: u32,
}

impl GuestPosition {
    /// Construct a validated guest position.
    pub fn new(guest_index: u32, guest_count: u32) -> Result<Self, ValidationError> {
        if guest_count == 0 {
            return Err(ValidationError::EmptyGuestCount(guest_count));
        }
        if guest_index >= guest_count {
            return Err(ValidationError::GuestIndexOutOfRange {
                guest_index,
                guest_count,
            });
        }
        Ok(Self {
            guest_index,
            guest_count,
        })
    }

    /// Whether this guest is the last of its session.
    ///
    /// The last guest is the one whose submission carries the consent-form
    /// signature and triggers reconciliation.
    pub fn is_last(&self) -> bool {
        self.guest_index == self.guest_count - 1
    }
}

impl Default for GuestPosition {
    /// A single-guest session: index 0 of 1.
    fn default() -> Self {
        Self {
            guest_index: 0,
            guest_count: 1,
        }
    }
}

/// The grouping key used to pool verified guest identities for reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionScope {
    /// Scoped to a reservation — the preferred, unambiguous key.
    Reservation(Uuid),
    /// Walk-in without a reservation: scoped to the project plus the trailing
    /// [`WALK_IN_WINDOW_MINUTES`] window, applied at query time.
    WalkIn {
        /// The project (property) the kiosk belongs to.
        project_id: Uuid,
    },
}

impl SessionScope {
    /// Resolve the scope for a verification attempt.
    pub fn resolve(project_id: Uuid, reservation_id: Option<Uuid>) -> Self {
        match reservation_id {
            Some(id) => Self::Reservation(id),
            None => Self::WalkIn { project_id },
        }
    }

    /// The earliest `verified_at` a record may carry and still belong to a
    /// walk-in scope evaluated at `now`. `None` for reservation scopes, which
    /// are not time-bounded.
    pub fn window_start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Reservation(_) => None,
            Self::WalkIn { .. } => Some(now - Duration::minutes(WALK_IN_WINDOW_MINUTES)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_guest_is_last() {
        let pos = GuestPosition::new(0, 1).unwrap();
        assert!(pos.is_last());
    }

    #[test]
    fn last_guest_iff_index_is_count_minus_one() {
        for guest_count in 1..=5u32 {
            for guest_index in 0..guest_count {
                let pos = GuestPosition::new(guest_index, guest_count).unwrap();
                assert_eq!(pos.is_last(), guest_index == guest_count - 1);
            }
        }
    }

    #[test]
    fn zero_guest_count_rejected() {
        assert_eq!(
            GuestPosition::new(0, 0),
            Err(ValidationError::EmptyGuestCount(0))
        );
    }

    #[test]
    fn index_out_of_range_rejected() {
        assert_eq!(
            GuestPosition::new(2, 2),
            Err(ValidationError::GuestIndexOutOfRange {
                guest_index: 2,
                guest_count: 2,
            })
        );
    }

    #[test]
    fn default_position_is_sole_guest() {
        let pos = GuestPosition::default();
        assert_eq!(pos.guest_index, 0);
        assert_eq!(pos.guest_count, 1);
        assert!(pos.is_last());
    }

    #[test]
    fn scope_prefers_reservation() {
        let project = Uuid::new_v4();
        let reservation = Uuid::new_v4();
        assert_eq!(
            SessionScope::resolve(project, Some(reservation)),
            SessionScope::Reservation(reservation)
        );
        assert_eq!(
            SessionScope::resolve(project, None),
            SessionScope::WalkIn {
                project_id: project
            }
        );
    }

    #[test]
    fn reservation_scope_has_no_window() {
        let scope = SessionScope::Reservation(Uuid::new_v4());
        assert!(scope.window_start(Utc::now()).is_none());
    }

    #[test]
    fn walk_in_window_is_thirty_minutes() {
        let now = Utc::now();
        let scope = SessionScope::WalkIn {
            project_id: Uuid::new_v4(),
        };
        let start = scope.window_start(now).unwrap();
        assert_eq!(now - start, Duration::minutes(30));
    }
}
