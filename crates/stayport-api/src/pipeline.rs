//! # Guest Verification Pipeline
//!
//! Drives one guest's attempt through the subset of {OCR, status check,
//! face match} selected by the action, and composes the outcome. Pure
//! orchestration over the provider adapter: no persistence, no shared state,
//! and no error ever escapes — every expected failure mode is a field of
//! [`PipelineOutcome`].
//!
//! Step dependencies: the status check consumes OCR output, so an OCR
//! failure short-circuits the `status` and `full` actions without issuing
//! further provider calls. The face match is independent of OCR.

use chrono::Utc;
use stayport_core::{is_adult, VerificationAction};
use stayport_idv::{FaceMatchResult, IdvError, IdvProvider, OcrFields, StatusCheckResult};

/// Guest-facing step failure messages. Raw provider payloads are logged,
/// never surfaced to the kiosk.
const MSG_OCR_FAILED: &str = "the ID document could not be read";
const MSG_STATUS_FAILED: &str = "the ID could not be confirmed against the registry";
const MSG_STATUS_SKIPPED: &str = "ID status check skipped because OCR failed";
const MSG_FACE_MISMATCH: &str = "the face does not match the ID photo";
const MSG_FACE_FAILED: &str = "the face comparison could not be completed";

/// Composed result of one pipeline run.
///
/// `success` is the action's overall success condition from the action
/// table; `error` carries the first failing step's guest-facing message.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutcome {
    pub success: bool,
    pub ocr_success: bool,
    pub ocr_fields: Option<OcrFields>,
    pub ocr_error: Option<String>,
    pub status_result: Option<StatusCheckResult>,
    pub face_result: Option<FaceMatchResult>,
    pub is_adult: bool,
    pub error: Option<String>,
}

impl PipelineOutcome {
    /// The OCR-extracted guest name, when OCR ran and succeeded.
    pub fn guest_name(&self) -> Option<&str> {
        self.ocr_fields.as_ref().map(|f| f.name.as_str())
    }
}

/// Run the pipeline for one guest.
///
/// The caller has already validated image presence for the action; this
/// function assumes `face_image` is present whenever the action needs it.
pub async fn run(
    provider: &dyn IdvProvider,
    action: VerificationAction,
    document_image: &str,
    face_image: Option<&str>,
) -> PipelineOutcome {
    let mut outcome = PipelineOutcome::default();

    // Step 1 — document OCR.
    if action.runs_ocr() {
        match provider.ocr(document_image).await {
            Ok(fields) => {
                outcome.ocr_success = true;
                outcome.is_adult = is_adult(&fields.birthdate, Utc::now().date_naive());
                outcome.ocr_fields = Some(fields);
            }
            Err(e) => {
                log_step_failure("ocr", &e);
                outcome.ocr_error = Some(MSG_OCR_FAILED.to_string());
            }
        }
    }

    // Step 2 — registry status check, only with OCR output in hand.
    if action.runs_status() {
        match &outcome.ocr_fields {
            Some(fields) => match provider.status_check(fields).await {
                Ok(result) => outcome.status_result = Some(result),
                Err(e) => log_step_failure("status_check", &e),
            },
            None => {
                // OCR failed — short-circuit without a provider call.
                tracing::debug!("{MSG_STATUS_SKIPPED}");
            }
        }
    }

    // Step 3 — face match, independent of OCR.
    if action.needs_face_image() {
        match face_image {
            Some(live) => match provider.face_match(live, document_image).await {
                Ok(result) => outcome.face_result = Some(result),
                Err(e) => log_step_failure("face_match", &e),
            },
            None => {
                // Unreachable past request validation; recorded as a failure
                // rather than trusted.
                outcome.error = Some(MSG_FACE_FAILED.to_string());
            }
        }
    }

    compose(action, outcome)
}

/// Apply the action's overall success condition and surface the first
/// failing step's message.
fn compose(action: VerificationAction, mut outcome: PipelineOutcome) -> PipelineOutcome {
    let status_verified = outcome.status_result.as_ref().map_or(false, |s| s.verified);
    let face_matched = outcome.face_result.as_ref().map_or(false, |f| f.matched);

    outcome.success = match action {
        VerificationAction::Ocr => outcome.ocr_success,
        VerificationAction::Status => outcome.ocr_success && status_verified,
        VerificationAction::Face => face_matched,
        VerificationAction::Full => outcome.ocr_success && status_verified && face_matched,
    };

    if outcome.success || outcome.error.is_some() {
        return outcome;
    }

    // First failing step, in pipeline order.
    outcome.error = if action.runs_ocr() && !outcome.ocr_success {
        Some(outcome.ocr_error.clone().unwrap_or_else(|| MSG_OCR_FAILED.to_string()))
    } else if action.runs_status() && !status_verified {
        Some(MSG_STATUS_FAILED.to_string())
    } else if action.needs_face_image() && !face_matched {
        Some(match &outcome.face_result {
            Some(_) => MSG_FACE_MISMATCH.to_string(),
            None => MSG_FACE_FAILED.to_string(),
        })
    } else {
        None
    };

    outcome
}

fn log_step_failure(step: &str, err: &IdvError) {
    tracing::warn!(step, error = %err, "verification provider step failed");
}
