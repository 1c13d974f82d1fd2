//! # Verification Routes — the Action Dispatcher
//!
//! Single entry point for a guest's verification attempt, plus the history
//! query. Per attempt the dispatcher walks a fixed sequence:
//!
//! ```text
//! RECEIVED → VALIDATED → PIPELINE_RUN → [RECONCILED] → RECORD_PERSISTED
//!          → AGGREGATE_UPDATED (best effort) → RESPONDED
//! ```
//!
//! The externally-reported outcome is finalized — including signature
//! reconciliation — *before* any persistence is attempted. A storage failure
//! can therefore never flip a reported result; it only costs the caller the
//! `verification_id` correlation handle. There is no retry loop: a failed
//! attempt is a complete, recorded, terminal outcome, and a retry is a new
//! attempt with the same guest index.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use stayport_core::{
    GuestPosition, GuestVerificationRecord, SessionScope, SignatureMatch, VerificationAction,
    VerificationStatus,
};
use stayport_idv::{FaceMatchResult, IdvProvider, OcrFields, StatusCheckResult};

use crate::db;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::pipeline::{self, PipelineOutcome};
use crate::reconcile::{self, ReconcileOutcome};
use crate::state::{AppState, RecordFilters, VerifiedGuestEntry};

/// Build the verification router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/verifications", post(submit_verification))
        .route("/v1/verifications", get(list_verifications))
}

/// Helper: extract the provider from AppState or return 503.
fn require_provider(state: &AppState) -> Result<Arc<dyn IdvProvider>, AppError> {
    state.provider.clone().ok_or_else(|| {
        AppError::service_unavailable(
            "verification provider not configured. Set IDV_API_BASE_URL and IDV_API_TOKEN.",
        )
    })
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

fn default_guest_count() -> u32 {
    1
}

/// One guest's verification attempt.
#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyRequest {
    /// Base64-encoded ID-document image. Required for every action.
    pub document_image: String,
    /// Base64-encoded live face capture. Required for `full` and `face`.
    #[serde(default)]
    pub face_image: Option<String>,
    /// Which subset of the pipeline to run. Defaults to `full`.
    #[serde(default)]
    pub action: VerificationAction,
    /// Project (property) scope. Without it nothing is persisted and the
    /// attempt cannot be correlated later.
    #[serde(default)]
    pub project_id: Option<Uuid>,
    /// Reservation to link the verification to, when the guest has one.
    #[serde(default)]
    pub reservation_id: Option<Uuid>,
    /// 0-based guest index within the session. Defaults to 0.
    #[serde(default)]
    pub guest_index: u32,
    /// Total guests in the session. Defaults to 1.
    #[serde(default = "default_guest_count")]
    pub guest_count: u32,
    /// Consent-form signature name; triggers reconciliation on the last guest.
    #[serde(default)]
    pub signature_name: Option<String>,
}

/// OCR step result as reported to the kiosk.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OcrResultBody {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub data: Option<OcrFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Composed verification data returned for one attempt.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct VerificationData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_result: Option<OcrResultBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub status_verification_result: Option<StatusCheckResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub face_auth_result: Option<FaceMatchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_adult: Option<bool>,
    /// Record id for later correlation. Absent when nothing was persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response to a verification attempt.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyResponse {
    /// The single pass/fail signal the kiosk acts on.
    pub success: bool,
    pub data: VerificationData,
    /// Present only when reconciliation ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_matched: Option<bool>,
    /// The verified identity the signature resolved to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_guest_name: Option<String>,
    /// Guest-facing failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// History query parameters.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct HistoryQuery {
    #[serde(default)]
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub reservation_id: Option<Uuid>,
    /// `verified` or `failed`.
    #[serde(default)]
    pub status: Option<String>,
}

/// History response: records newest-first, capped at the page size.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryResponse {
    pub success: bool,
    #[schema(value_type = Vec<Object>)]
    pub verifications: Vec<GuestVerificationRecord>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check a field is plausible base64 image data (an optional data-URI prefix
/// is tolerated and stripped).
fn check_base64_image(field: &'static str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    let payload = value
        .split_once(";base64,")
        .map(|(_, body)| body)
        .unwrap_or(value);
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map(|_| ())
        .map_err(|_| format!("{field} is not valid base64"))
}

impl Validate for VerifyRequest {
    fn validate(&self) -> Result<(), String> {
        check_base64_image("document_image", &self.document_image)?;

        if self.action.needs_face_image() {
            match &self.face_image {
                Some(face) => check_base64_image("face_image", face)?,
                None => {
                    return Err(format!(
                        "face_image is required for the {} action",
                        self.action
                    ))
                }
            }
        }

        if let Some(sig) = &self.signature_name {
            if sig.trim().is_empty() {
                return Err("signature_name must not be empty when provided".into());
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/verifications — Submit one guest's verification attempt.
///
/// Dispatch flow:
/// 1. Validate required images for the action (400 before any provider call)
/// 2. Run the pipeline for the action's step subset
/// 3. On the last guest with a signature: reconcile against the verified pool
/// 4. Persist the finalized record (best effort)
/// 5. Append to the reservation aggregate (best effort, success only)
#[utoipa::path(
    post,
    path = "/v1/verifications",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Composed verification outcome", body = VerifyResponse),
        (status = 400, description = "Missing or malformed field for the requested action"),
        (status = 503, description = "Verification provider not configured"),
    ),
    tag = "verifications"
)]
pub async fn submit_verification(
    State(state): State<AppState>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let provider = require_provider(&state)?;
    let position = GuestPosition::new(req.guest_index, req.guest_count)?;

    // -- Pipeline --
    let outcome = pipeline::run(
        provider.as_ref(),
        req.action,
        &req.document_image,
        req.face_image.as_deref(),
    )
    .await;

    let now = Utc::now();

    // -- Reconciliation (finalizes the outcome; runs before any write) --
    let reconciliation = maybe_reconcile(&state, &req, position, &outcome, now).await;

    let final_success = outcome.success && reconciliation.as_ref().map_or(true, |r| r.matched());
    let failure_reason = if final_success {
        None
    } else {
        reconciliation
            .as_ref()
            .and_then(|r| r.failure_reason.clone())
            .or_else(|| outcome.error.clone())
    };
    let signature_matched = reconciliation
        .as_ref()
        .map(|r| r.signature_matched)
        .unwrap_or(SignatureMatch::NotEvaluated);
    let matched_guest_name = reconciliation
        .as_ref()
        .and_then(|r| r.matched_guest_name.clone());

    // -- Persistence (best effort; the outcome above is already final) --
    let verification_id = match req.project_id {
        Some(project_id) => {
            let record = build_record(
                project_id,
                &req,
                position,
                &outcome,
                final_success,
                failure_reason.clone(),
                signature_matched,
                now,
            );
            persist_record(&state, record, req.reservation_id, final_success).await
        }
        None => {
            tracing::debug!("no project_id supplied — verification attempt not persisted");
            None
        }
    };

    tracing::info!(
        action = %req.action,
        guest_index = position.guest_index,
        guest_count = position.guest_count,
        success = final_success,
        signature_matched = ?signature_matched.as_bool(),
        "verification attempt completed"
    );

    Ok(Json(VerifyResponse {
        success: final_success,
        data: VerificationData {
            ocr_result: ocr_result_body(&outcome),
            status_verification_result: outcome.status_result.clone(),
            face_auth_result: outcome.face_result.clone(),
            is_adult: outcome.ocr_fields.as_ref().map(|_| outcome.is_adult),
            verification_id,
            error: failure_reason.clone(),
        },
        signature_matched: signature_matched.as_bool(),
        matched_guest_name,
        error: failure_reason,
    }))
}

/// GET /v1/verifications — Verification history, newest-first.
#[utoipa::path(
    get,
    path = "/v1/verifications",
    params(
        ("project_id" = Option<Uuid>, Query, description = "Filter by project"),
        ("reservation_id" = Option<Uuid>, Query, description = "Filter by reservation"),
        ("status" = Option<String>, Query, description = "Filter by status: verified | failed"),
    ),
    responses(
        (status = 200, description = "Verification records, newest-first", body = HistoryResponse),
        (status = 400, description = "Unknown status filter"),
    ),
    tag = "verifications"
)]
pub async fn list_verifications(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<VerificationStatus>)
        .transpose()
        .map_err(AppError::Validation)?;

    let filters = RecordFilters {
        project_id: query.project_id,
        reservation_id: query.reservation_id,
        status,
    };

    let verifications = match &state.db_pool {
        Some(pool) => db::verifications::query(pool, filters)
            .await
            .map_err(|e| AppError::Internal(format!("history query failed: {e}")))?,
        None => state.verifications.query(filters),
    };

    Ok(Json(HistoryResponse {
        success: true,
        verifications,
    }))
}

// ---------------------------------------------------------------------------
// Dispatch steps
// ---------------------------------------------------------------------------

/// Run signature reconciliation when the attempt qualifies: pipeline success,
/// last guest, a signature supplied, and a resolvable session scope.
async fn maybe_reconcile(
    state: &AppState,
    req: &VerifyRequest,
    position: GuestPosition,
    outcome: &PipelineOutcome,
    now: chrono::DateTime<Utc>,
) -> Option<ReconcileOutcome> {
    if !outcome.success || !position.is_last() {
        return None;
    }
    let signature_name = req.signature_name.as_deref()?;

    let scope = match (req.reservation_id, req.project_id) {
        (Some(reservation), _) => SessionScope::Reservation(reservation),
        (None, Some(project_id)) => SessionScope::WalkIn { project_id },
        (None, None) => {
            tracing::debug!("no session scope — signature reconciliation skipped");
            return None;
        }
    };

    let pool_names = verified_pool_names(state, &scope, now).await;
    Some(reconcile::reconcile(
        signature_name,
        &pool_names,
        outcome.guest_name(),
    ))
}

/// Assemble the verified-name pool via the scoping query. Prefers the
/// database when configured; a failed pool query falls back to the in-memory
/// records rather than aborting the gate.
async fn verified_pool_names(
    state: &AppState,
    scope: &SessionScope,
    now: chrono::DateTime<Utc>,
) -> Vec<String> {
    if let Some(pool) = &state.db_pool {
        match db::verifications::verified_names(pool, scope, now).await {
            Ok(names) => return names,
            Err(e) => {
                tracing::warn!(error = %e, "verified-pool query failed — using in-memory records");
            }
        }
    }
    state.verifications.verified_names(scope, now)
}

#[allow(clippy::too_many_arguments)]
fn build_record(
    project_id: Uuid,
    req: &VerifyRequest,
    position: GuestPosition,
    outcome: &PipelineOutcome,
    final_success: bool,
    failure_reason: Option<String>,
    signature_matched: SignatureMatch,
    now: chrono::DateTime<Utc>,
) -> GuestVerificationRecord {
    GuestVerificationRecord {
        id: Uuid::new_v4(),
        project_id,
        reservation_id: req.reservation_id,
        guest_index: position.guest_index,
        guest_name: outcome.guest_name().map(str::to_string),
        id_type: outcome.ocr_fields.as_ref().map(|f| f.id_type.clone()),
        ocr_success: outcome.ocr_success,
        status_verified: outcome.status_result.as_ref().map_or(false, |s| s.verified),
        status_transaction_id: outcome
            .status_result
            .as_ref()
            .map(|s| s.transaction_id.clone()),
        face_matched: outcome.face_result.as_ref().map_or(false, |f| f.matched),
        similarity_score: outcome.face_result.as_ref().map(|f| f.similarity),
        is_adult: outcome.is_adult,
        status: if final_success {
            VerificationStatus::Verified
        } else {
            VerificationStatus::Failed
        },
        failure_reason,
        verified_at: final_success.then_some(now),
        signature_name: if position.is_last() {
            req.signature_name.clone()
        } else {
            None
        },
        signature_matched,
        created_at: now,
    }
}

/// Persist the finalized record and, on success with a reservation, append
/// the verified guest to the reservation aggregate. All writes are best
/// effort — failures are logged and cost only the correlation id.
async fn persist_record(
    state: &AppState,
    record: GuestVerificationRecord,
    reservation_id: Option<Uuid>,
    final_success: bool,
) -> Option<Uuid> {
    let mut verification_id = Some(state.verifications.append(record.clone()));

    if let Some(pool) = &state.db_pool {
        if let Err(e) = db::verifications::insert(pool, &record).await {
            tracing::error!(error = %e, "failed to persist verification record");
            // Durability gap: the attempt is not correlatable by id.
            verification_id = None;
        }
    }

    if final_success {
        if let (Some(reservation_id), Some(guest_name)) = (reservation_id, record.guest_name.clone())
        {
            let entry = VerifiedGuestEntry {
                reservation_id,
                guest_index: record.guest_index,
                verification_id: record.id,
                guest_name,
                verified_at: record.verified_at.unwrap_or(record.created_at),
            };

            if !state.reservation_guests.append_if_absent(entry.clone()) {
                tracing::warn!(
                    %reservation_id,
                    guest_index = entry.guest_index,
                    "verified-guest slot already occupied — aggregate entry not duplicated"
                );
            } else if let Some(pool) = &state.db_pool {
                if let Err(e) = db::reservation_guests::append_if_absent(pool, &entry).await {
                    tracing::error!(error = %e, "failed to persist reservation aggregate entry");
                }
            }
        }
    }

    verification_id
}

fn ocr_result_body(outcome: &PipelineOutcome) -> Option<OcrResultBody> {
    if !outcome.ocr_success && outcome.ocr_error.is_none() {
        // OCR did not run for this action.
        return None;
    }
    Some(OcrResultBody {
        success: outcome.ocr_success,
        data: outcome.ocr_fields.clone(),
        error: outcome.ocr_error.clone(),
    })
}
