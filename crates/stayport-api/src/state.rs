//! # Application State
//!
//! Shared state for the API layer: configuration, the verification provider
//! handle, the optional Postgres pool, and the in-memory stores.
//!
//! The in-memory stores are the always-present source of truth for a running
//! node; when a database pool is configured they are mirrored to Postgres for
//! durability across restarts. Both stores are the only shared mutable state
//! in the system and are owned exclusively by this layer — the pipeline never
//! touches them.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use sqlx::postgres::PgPool;
use stayport_core::{
    GuestVerificationRecord, SessionScope, SignatureMatch, VerificationStatus,
};
use stayport_idv::IdvProvider;
use utoipa::ToSchema;
use uuid::Uuid;

/// Maximum rows returned by a history query.
pub const QUERY_PAGE_SIZE: usize = 100;

/// Runtime configuration, read from the environment at startup.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Bearer token required on `/v1/*` routes. `None` disables auth
    /// (development mode).
    pub auth_token: Option<String>,
}

/// Filters for the verification history query.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordFilters {
    pub project_id: Option<Uuid>,
    pub reservation_id: Option<Uuid>,
    pub status: Option<VerificationStatus>,
}

/// Append-only in-memory store of verification records.
///
/// One entry per attempt, never deleted. There is no update operation at
/// all: records are created with their final, reconciled status (the
/// reported outcome is finalized before persistence is attempted), so the
/// terminal-field invariant on `signature_matched` holds by construction.
#[derive(Clone, Default)]
pub struct VerificationStore {
    records: Arc<RwLock<Vec<GuestVerificationRecord>>>,
}

impl VerificationStore {
    /// Append a record, returning its id.
    pub fn append(&self, record: GuestVerificationRecord) -> Uuid {
        let id = record.id;
        self.records.write().push(record);
        id
    }

    /// History query: newest-first, capped at [`QUERY_PAGE_SIZE`].
    pub fn query(&self, filters: RecordFilters) -> Vec<GuestVerificationRecord> {
        let records = self.records.read();
        records
            .iter()
            .rev()
            .filter(|r| filters.project_id.map_or(true, |p| r.project_id == p))
            .filter(|r| filters.reservation_id.map_or(true, |res| r.reservation_id == Some(res)))
            .filter(|r| filters.status.map_or(true, |s| r.status == s))
            .take(QUERY_PAGE_SIZE)
            .cloned()
            .collect()
    }

    /// Reconciliation-pool query: names of verified guests in scope,
    /// oldest-first so the pool reads in verification order.
    ///
    /// Reservation scope selects verified records of that reservation;
    /// walk-in scope selects verified records of the project whose
    /// `verified_at` falls within the trailing window ending at `now`.
    pub fn verified_names(&self, scope: &SessionScope, now: DateTime<Utc>) -> Vec<String> {
        let window_start = scope.window_start(now);
        let records = self.records.read();
        records
            .iter()
            .filter(|r| r.status == VerificationStatus::Verified)
            .filter(|r| match scope {
                SessionScope::Reservation(id) => r.reservation_id == Some(*id),
                SessionScope::WalkIn { project_id } => r.project_id == *project_id,
            })
            .filter(|r| match window_start {
                Some(start) => r.verified_at.is_some_and(|at| at >= start),
                None => true,
            })
            .filter_map(|r| r.guest_name.clone())
            .collect()
    }

    /// Record counts by status: `(verified, failed)`. Feeds the domain
    /// gauges on each metrics scrape.
    pub fn status_counts(&self) -> (usize, usize) {
        let records = self.records.read();
        let verified = records
            .iter()
            .filter(|r| r.status == VerificationStatus::Verified)
            .count();
        (verified, records.len() - verified)
    }

    /// Counts of evaluated signature reconciliations: `(matched, not_matched)`.
    pub fn signature_counts(&self) -> (usize, usize) {
        let records = self.records.read();
        let matched = records
            .iter()
            .filter(|r| r.signature_matched == SignatureMatch::Matched)
            .count();
        let not_matched = records
            .iter()
            .filter(|r| r.signature_matched == SignatureMatch::NotMatched)
            .count();
        (matched, not_matched)
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One verified guest of a reservation, as appended to the reservation's
/// verification aggregate.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VerifiedGuestEntry {
    pub reservation_id: Uuid,
    pub guest_index: u32,
    pub verification_id: Uuid,
    pub guest_name: String,
    pub verified_at: DateTime<Utc>,
}

/// Append-only child relation of verified guests per reservation, keyed by
/// `(reservation_id, guest_index)`.
///
/// The key set makes the append conditional: two concurrent submissions for
/// the same guest slot insert exactly one entry. This replaces the unsafe
/// read-modify-write of a list column — the uniqueness constraint is the
/// concurrency control.
#[derive(Clone, Default)]
pub struct ReservationGuestStore {
    inner: Arc<RwLock<ReservationGuests>>,
}

#[derive(Default)]
struct ReservationGuests {
    /// Entries in completion order.
    entries: Vec<VerifiedGuestEntry>,
    /// Occupied (reservation_id, guest_index) slots.
    keys: HashSet<(Uuid, u32)>,
}

impl ReservationGuestStore {
    /// Append an entry unless its `(reservation_id, guest_index)` slot is
    /// already taken. Returns whether the entry was inserted.
    pub fn append_if_absent(&self, entry: VerifiedGuestEntry) -> bool {
        let key = (entry.reservation_id, entry.guest_index);
        let mut inner = self.inner.write();
        if !inner.keys.insert(key) {
            return false;
        }
        inner.entries.push(entry);
        true
    }

    /// Total entries across all reservations.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Verified guests of a reservation, in completion order.
    pub fn list_for(&self, reservation_id: Uuid) -> Vec<VerifiedGuestEntry> {
        self.inner
            .read()
            .entries
            .iter()
            .filter(|e| e.reservation_id == reservation_id)
            .cloned()
            .collect()
    }
}

/// Shared application state, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    /// Runtime configuration.
    pub config: Arc<AppConfig>,
    /// Verification provider. `None` → verification routes respond 503.
    pub provider: Option<Arc<dyn IdvProvider>>,
    /// Postgres pool. `None` → in-memory-only mode.
    pub db_pool: Option<PgPool>,
    /// Append-only verification records.
    pub verifications: VerificationStore,
    /// Per-reservation verified-guest aggregate.
    pub reservation_guests: ReservationGuestStore,
}

impl AppState {
    /// State with no provider and no database — in-memory development mode.
    pub fn new() -> Self {
        Self {
            config: Arc::new(AppConfig::default()),
            provider: None,
            db_pool: None,
            verifications: VerificationStore::default(),
            reservation_guests: ReservationGuestStore::default(),
        }
    }

    /// Replace the verification provider.
    pub fn with_provider(mut self, provider: Arc<dyn IdvProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Arc::new(config);
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(
        project_id: Uuid,
        reservation_id: Option<Uuid>,
        name: &str,
        status: VerificationStatus,
        verified_at: Option<DateTime<Utc>>,
    ) -> GuestVerificationRecord {
        GuestVerificationRecord {
            id: Uuid::new_v4(),
            project_id,
            reservation_id,
            guest_index: 0,
            guest_name: Some(name.to_string()),
            id_type: None,
            ocr_success: true,
            status_verified: true,
            status_transaction_id: None,
            face_matched: true,
            similarity_score: None,
            is_adult: true,
            status,
            failure_reason: None,
            verified_at,
            signature_name: None,
            signature_matched: SignatureMatch::NotEvaluated,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn query_is_newest_first() {
        let store = VerificationStore::default();
        let project = Uuid::new_v4();
        store.append(record(project, None, "first", VerificationStatus::Verified, Some(Utc::now())));
        store.append(record(project, None, "second", VerificationStatus::Verified, Some(Utc::now())));

        let rows = store.query(RecordFilters {
            project_id: Some(project),
            ..Default::default()
        });
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].guest_name.as_deref(), Some("second"));
        assert_eq!(rows[1].guest_name.as_deref(), Some("first"));
    }

    #[test]
    fn query_filters_by_status_and_reservation() {
        let store = VerificationStore::default();
        let project = Uuid::new_v4();
        let reservation = Uuid::new_v4();
        store.append(record(project, Some(reservation), "ok", VerificationStatus::Verified, Some(Utc::now())));
        store.append(record(project, None, "bad", VerificationStatus::Failed, None));

        let verified = store.query(RecordFilters {
            status: Some(VerificationStatus::Verified),
            ..Default::default()
        });
        assert_eq!(verified.len(), 1);
        assert_eq!(verified[0].guest_name.as_deref(), Some("ok"));

        let by_reservation = store.query(RecordFilters {
            reservation_id: Some(reservation),
            ..Default::default()
        });
        assert_eq!(by_reservation.len(), 1);
    }

    #[test]
    fn query_page_is_capped() {
        let store = VerificationStore::default();
        let project = Uuid::new_v4();
        for _ in 0..(QUERY_PAGE_SIZE + 20) {
            store.append(record(project, None, "g", VerificationStatus::Verified, Some(Utc::now())));
        }
        let rows = store.query(RecordFilters::default());
        assert_eq!(rows.len(), QUERY_PAGE_SIZE);
    }

    #[test]
    fn verified_names_scoped_to_reservation() {
        let store = VerificationStore::default();
        let project = Uuid::new_v4();
        let reservation = Uuid::new_v4();
        store.append(record(project, Some(reservation), "Kim", VerificationStatus::Verified, Some(Utc::now())));
        store.append(record(project, None, "Stranger", VerificationStatus::Verified, Some(Utc::now())));
        store.append(record(project, Some(reservation), "Failed", VerificationStatus::Failed, None));

        let names = store.verified_names(&SessionScope::Reservation(reservation), Utc::now());
        assert_eq!(names, vec!["Kim".to_string()]);
    }

    #[test]
    fn walk_in_pool_honors_the_trailing_window() {
        let store = VerificationStore::default();
        let project = Uuid::new_v4();
        let now = Utc::now();

        let mut stale = record(project, None, "Old", VerificationStatus::Verified, Some(now - Duration::minutes(45)));
        stale.created_at = now - Duration::minutes(45);
        store.append(stale);
        store.append(record(project, None, "Recent", VerificationStatus::Verified, Some(now - Duration::minutes(5))));

        let names = store.verified_names(&SessionScope::WalkIn { project_id: project }, now);
        assert_eq!(names, vec!["Recent".to_string()]);
    }

    #[test]
    fn verified_names_are_oldest_first() {
        let store = VerificationStore::default();
        let reservation = Uuid::new_v4();
        let project = Uuid::new_v4();
        store.append(record(project, Some(reservation), "Kim", VerificationStatus::Verified, Some(Utc::now())));
        store.append(record(project, Some(reservation), "Lee", VerificationStatus::Verified, Some(Utc::now())));

        let names = store.verified_names(&SessionScope::Reservation(reservation), Utc::now());
        assert_eq!(names, vec!["Kim".to_string(), "Lee".to_string()]);
    }

    #[test]
    fn aggregate_append_is_conditional_on_the_guest_slot() {
        let store = ReservationGuestStore::default();
        let reservation = Uuid::new_v4();
        let entry = VerifiedGuestEntry {
            reservation_id: reservation,
            guest_index: 0,
            verification_id: Uuid::new_v4(),
            guest_name: "Kim".to_string(),
            verified_at: Utc::now(),
        };

        assert!(store.append_if_absent(entry.clone()));
        // Same slot again — a concurrent duplicate — must not append.
        assert!(!store.append_if_absent(entry.clone()));
        assert_eq!(store.list_for(reservation).len(), 1);

        // A different slot of the same reservation appends fine.
        let second = VerifiedGuestEntry {
            guest_index: 1,
            guest_name: "Lee".to_string(),
            ..entry
        };
        assert!(store.append_if_absent(second));
        let entries = store.list_for(reservation);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].guest_name, "Kim");
        assert_eq!(entries[1].guest_name, "Lee");
    }
}
