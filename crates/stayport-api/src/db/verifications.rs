//! Verification record persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `guest_verifications`
//! table. Records are immutable once created — there are no update
//! operations: the dispatcher finalizes the outcome (including signature
//! reconciliation) before the row is written.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use stayport_core::{
    GuestVerificationRecord, SessionScope, SignatureMatch, VerificationStatus,
};

use crate::state::{RecordFilters, QUERY_PAGE_SIZE};

/// Insert a verification record.
pub async fn insert(pool: &PgPool, record: &GuestVerificationRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO guest_verifications (id, project_id, reservation_id,
         guest_index, guest_name, id_type, ocr_success, status_verified,
         status_transaction_id, face_matched, similarity_score, is_adult,
         status, failure_reason, verified_at, signature_name,
         signature_matched, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)",
    )
    .bind(record.id)
    .bind(record.project_id)
    .bind(record.reservation_id)
    .bind(record.guest_index as i32)
    .bind(&record.guest_name)
    .bind(&record.id_type)
    .bind(record.ocr_success)
    .bind(record.status_verified)
    .bind(&record.status_transaction_id)
    .bind(record.face_matched)
    .bind(record.similarity_score)
    .bind(record.is_adult)
    .bind(record.status.as_str())
    .bind(&record.failure_reason)
    .bind(record.verified_at)
    .bind(&record.signature_name)
    .bind(record.signature_matched.as_bool())
    .bind(record.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// History query: newest-first, capped at [`QUERY_PAGE_SIZE`].
pub async fn query(
    pool: &PgPool,
    filters: RecordFilters,
) -> Result<Vec<GuestVerificationRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, VerificationRow>(
        "SELECT id, project_id, reservation_id, guest_index, guest_name,
         id_type, ocr_success, status_verified, status_transaction_id,
         face_matched, similarity_score, is_adult, status, failure_reason,
         verified_at, signature_name, signature_matched, created_at
         FROM guest_verifications
         WHERE ($1::uuid IS NULL OR project_id = $1)
           AND ($2::uuid IS NULL OR reservation_id = $2)
           AND ($3::text IS NULL OR status = $3)
         ORDER BY created_at DESC
         LIMIT $4",
    )
    .bind(filters.project_id)
    .bind(filters.reservation_id)
    .bind(filters.status.map(|s| s.as_str()))
    .bind(QUERY_PAGE_SIZE as i64)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(VerificationRow::into_record).collect())
}

/// Reconciliation pool query: names of verified guests in scope,
/// oldest-first so the pool reads in verification order.
pub async fn verified_names(
    pool: &PgPool,
    scope: &SessionScope,
    now: DateTime<Utc>,
) -> Result<Vec<String>, sqlx::Error> {
    let names: Vec<(String,)> = match scope {
        SessionScope::Reservation(reservation_id) => {
            sqlx::query_as(
                "SELECT guest_name FROM guest_verifications
                 WHERE reservation_id = $1
                   AND status = 'verified'
                   AND guest_name IS NOT NULL
                 ORDER BY created_at ASC",
            )
            .bind(reservation_id)
            .fetch_all(pool)
            .await?
        }
        SessionScope::WalkIn { project_id } => {
            let window_start = scope
                .window_start(now)
                .expect("walk-in scope always has a window");
            sqlx::query_as(
                "SELECT guest_name FROM guest_verifications
                 WHERE project_id = $1
                   AND status = 'verified'
                   AND guest_name IS NOT NULL
                   AND verified_at >= $2
                 ORDER BY created_at ASC",
            )
            .bind(project_id)
            .bind(window_start)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(names.into_iter().map(|(name,)| name).collect())
}

/// Row type mapping the `guest_verifications` table.
#[derive(sqlx::FromRow)]
struct VerificationRow {
    id: Uuid,
    project_id: Uuid,
    reservation_id: Option<Uuid>,
    guest_index: i32,
    guest_name: Option<String>,
    id_type: Option<String>,
    ocr_success: bool,
    status_verified: bool,
    status_transaction_id: Option<String>,
    face_matched: bool,
    similarity_score: Option<f64>,
    is_adult: bool,
    status: String,
    failure_reason: Option<String>,
    verified_at: Option<DateTime<Utc>>,
    signature_name: Option<String>,
    signature_matched: Option<bool>,
    created_at: DateTime<Utc>,
}

impl VerificationRow {
    fn into_record(self) -> GuestVerificationRecord {
        GuestVerificationRecord {
            id: self.id,
            project_id: self.project_id,
            reservation_id: self.reservation_id,
            guest_index: self.guest_index.max(0) as u32,
            guest_name: self.guest_name,
            id_type: self.id_type,
            ocr_success: self.ocr_success,
            status_verified: self.status_verified,
            status_transaction_id: self.status_transaction_id,
            face_matched: self.face_matched,
            similarity_score: self.similarity_score,
            is_adult: self.is_adult,
            status: self
                .status
                .parse()
                .unwrap_or(VerificationStatus::Failed),
            failure_reason: self.failure_reason,
            verified_at: self.verified_at,
            signature_name: self.signature_name,
            signature_matched: SignatureMatch::from_bool(self.signature_matched),
            created_at: self.created_at,
        }
    }
}
