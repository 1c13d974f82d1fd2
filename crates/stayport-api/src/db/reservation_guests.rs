//! Reservation verified-guest aggregate persistence.
//!
//! The aggregate is an append-only child relation keyed by
//! `(reservation_id, guest_index)`. `ON CONFLICT DO NOTHING` makes the
//! append atomic under concurrent guest submissions — the first writer wins
//! and every later duplicate is a no-op, so the aggregate can neither lose
//! nor duplicate entries.

use sqlx::PgPool;
use uuid::Uuid;

use crate::state::VerifiedGuestEntry;

/// Conditionally append a verified guest. Returns whether a row was inserted.
pub async fn append_if_absent(
    pool: &PgPool,
    entry: &VerifiedGuestEntry,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO reservation_verified_guests
         (reservation_id, guest_index, verification_id, guest_name, verified_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (reservation_id, guest_index) DO NOTHING",
    )
    .bind(entry.reservation_id)
    .bind(entry.guest_index as i32)
    .bind(entry.verification_id)
    .bind(&entry.guest_name)
    .bind(entry.verified_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Verified guests of a reservation, in completion order.
pub async fn list_for(
    pool: &PgPool,
    reservation_id: Uuid,
) -> Result<Vec<VerifiedGuestEntry>, sqlx::Error> {
    let rows: Vec<(Uuid, i32, Uuid, String, chrono::DateTime<chrono::Utc>)> = sqlx::query_as(
        "SELECT reservation_id, guest_index, verification_id, guest_name, verified_at
         FROM reservation_verified_guests
         WHERE reservation_id = $1
         ORDER BY verified_at ASC",
    )
    .bind(reservation_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(reservation_id, guest_index, verification_id, guest_name, verified_at)| {
                VerifiedGuestEntry {
                    reservation_id,
                    guest_index: guest_index.max(0) as u32,
                    verification_id,
                    guest_name,
                    verified_at,
                }
            },
        )
        .collect())
}
