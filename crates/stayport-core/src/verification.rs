//! # Verification Actions and Records
//!
//! The verification pipeline runs a subset of {OCR, status check, face match}
//! selected by [`VerificationAction`]. Every attempt — pass or fail — produces
//! exactly one [`GuestVerificationRecord`], which is append-only: the only
//! permitted rewrite is the one-shot signature reconciliation update on the
//! last guest's record.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Legal adult age applied to check-in (Korean Civil Act, international
/// age reckoning).
pub const ADULT_AGE_YEARS: i32 = 19;

/// Which subset of the verification pipeline to run for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VerificationAction {
    /// OCR + status check + face match. The complete check-in flow.
    #[default]
    Full,
    /// Document OCR only.
    Ocr,
    /// OCR followed by the government registry status check.
    Status,
    /// Face match only: live capture against the document photo.
    Face,
}

impl VerificationAction {
    /// Whether this action runs document OCR.
    pub fn runs_ocr(&self) -> bool {
        !matches!(self, Self::Face)
    }

    /// Whether this action runs the registry status check (OCR permitting —
    /// the status check consumes OCR output and never runs standalone).
    pub fn runs_status(&self) -> bool {
        matches!(self, Self::Full | Self::Status)
    }

    /// Whether this action compares the live capture against the document
    /// photo, and therefore requires a face image up front.
    pub fn needs_face_image(&self) -> bool {
        matches!(self, Self::Full | Self::Face)
    }

    /// Wire name, as accepted in requests and used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Ocr => "ocr",
            Self::Status => "status",
            Self::Face => "face",
        }
    }
}

impl std::fmt::Display for VerificationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal status of a verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    /// Every step the action required passed (and reconciliation, if it ran).
    Verified,
    /// At least one step failed, or reconciliation rejected the signature.
    Failed,
}

impl VerificationStatus {
    /// Wire name, as stored and used in query filters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for VerificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "verified" => Ok(Self::Verified),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown verification status: {other}")),
        }
    }
}

/// Signature reconciliation state of a record.
///
/// Three explicit variants, not a nullable boolean: "not yet evaluated" is a
/// first-class state that must never be confused with "did not match".
/// The field is terminal — once a record leaves [`SignatureMatch::NotEvaluated`]
/// it is never re-evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SignatureMatch {
    /// Reconciliation has not run for this record.
    #[default]
    NotEvaluated,
    /// The consent signature matched a verified identity of the stay.
    Matched,
    /// The consent signature matched no verified identity of the stay.
    NotMatched,
}

impl SignatureMatch {
    /// Collapse to the wire/storage representation (`null` = not evaluated).
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::NotEvaluated => None,
            Self::Matched => Some(true),
            Self::NotMatched => Some(false),
        }
    }

    /// Lift from the storage representation.
    pub fn from_bool(value: Option<bool>) -> Self {
        match value {
            None => Self::NotEvaluated,
            Some(true) => Self::Matched,
            Some(false) => Self::NotMatched,
        }
    }

    /// Whether reconciliation has already run for this record.
    pub fn is_evaluated(&self) -> bool {
        !matches!(self, Self::NotEvaluated)
    }
}

/// One verification attempt, as persisted. Append-only: created exactly once
/// per attempt, rewritten only by signature reconciliation, exactly once,
/// on the last guest's record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GuestVerificationRecord {
    /// Record identifier, assigned at creation.
    pub id: Uuid,
    /// The project (property) this attempt belongs to.
    pub project_id: Uuid,
    /// The reservation this attempt belongs to, when the guest has one.
    pub reservation_id: Option<Uuid>,
    /// 0-based guest index within the session.
    pub guest_index: u32,
    /// Guest name as extracted by OCR. `None` when OCR failed or did not run.
    pub guest_name: Option<String>,
    /// Document type as reported by OCR (e.g. resident card, driver license,
    /// passport).
    pub id_type: Option<String>,
    /// Whether document OCR succeeded.
    pub ocr_success: bool,
    /// Whether the registry status check confirmed the identity.
    pub status_verified: bool,
    /// Provider transaction id of the status check, for audit.
    pub status_transaction_id: Option<String>,
    /// Whether the live capture matched the document photo.
    pub face_matched: bool,
    /// Similarity score reported by the face match, when it ran.
    pub similarity_score: Option<f64>,
    /// Adulthood derived from the OCR birthdate.
    pub is_adult: bool,
    /// Terminal status of the attempt.
    pub status: VerificationStatus,
    /// Guest-facing reason when `status` is failed.
    pub failure_reason: Option<String>,
    /// When the attempt was verified. `None` for failed attempts.
    pub verified_at: Option<DateTime<Utc>>,
    /// Consent-form signature name. Populated only on the session's last guest.
    pub signature_name: Option<String>,
    /// Signature reconciliation state.
    pub signature_matched: SignatureMatch,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

/// Derive adulthood from an OCR-extracted birthdate at the given date.
///
/// Accepts `YYYY-MM-DD` and `YYYYMMDD`, the two shapes ID-document OCR
/// providers emit. An unparseable birthdate yields `false` — absence of a
/// readable birthdate is never treated as proof of adulthood.
pub fn is_adult(birthdate: &str, on: NaiveDate) -> bool {
    let Some(born) = parse_birthdate(birthdate) else {
        return false;
    };
    age_in_years(born, on) >= ADULT_AGE_YEARS
}

fn parse_birthdate(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
        .ok()
}

/// Completed years between `born` and `on` (international age reckoning).
fn age_in_years(born: NaiveDate, on: NaiveDate) -> i32 {
    let mut age = on.year() - born.year();
    if (on.month(), on.day()) < (born.month(), born.day()) {
        age -= 1;
    }
    age
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn action_default_is_full() {
        assert_eq!(VerificationAction::default(), VerificationAction::Full);
    }

    #[test]
    fn action_wire_names_round_trip() {
        for action in [
            VerificationAction::Full,
            VerificationAction::Ocr,
            VerificationAction::Status,
            VerificationAction::Face,
        ] {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{action}\""));
            let back: VerificationAction = serde_json::from_str(&json).unwrap();
            assert_eq!(back, action);
        }
    }

    #[test]
    fn step_selection_matches_the_action_table() {
        use VerificationAction::*;
        assert!(Full.runs_ocr() && Full.runs_status() && Full.needs_face_image());
        assert!(Ocr.runs_ocr() && !Ocr.runs_status() && !Ocr.needs_face_image());
        assert!(Status.runs_ocr() && Status.runs_status() && !Status.needs_face_image());
        assert!(!Face.runs_ocr() && !Face.runs_status() && Face.needs_face_image());
    }

    #[test]
    fn status_parses_from_wire_name() {
        assert_eq!(
            "verified".parse::<VerificationStatus>().unwrap(),
            VerificationStatus::Verified
        );
        assert_eq!(
            "failed".parse::<VerificationStatus>().unwrap(),
            VerificationStatus::Failed
        );
        assert!("pending".parse::<VerificationStatus>().is_err());
    }

    #[test]
    fn signature_match_bool_round_trip() {
        for sm in [
            SignatureMatch::NotEvaluated,
            SignatureMatch::Matched,
            SignatureMatch::NotMatched,
        ] {
            assert_eq!(SignatureMatch::from_bool(sm.as_bool()), sm);
        }
    }

    #[test]
    fn signature_match_default_is_not_evaluated() {
        assert_eq!(SignatureMatch::default(), SignatureMatch::NotEvaluated);
        assert!(!SignatureMatch::default().is_evaluated());
    }

    #[test]
    fn adult_at_nineteenth_birthday() {
        let on = date(2026, 3, 15);
        assert!(is_adult("2007-03-15", on));
        assert!(!is_adult("2007-03-16", on));
    }

    #[test]
    fn compact_birthdate_format_accepted() {
        assert!(is_adult("19900315", date(2026, 1, 1)));
    }

    #[test]
    fn unreadable_birthdate_is_not_adult() {
        assert!(!is_adult("", date(2026, 1, 1)));
        assert!(!is_adult("15-03-1990", date(2026, 1, 1)));
        assert!(!is_adult("unknown", date(2026, 1, 1)));
    }

    #[test]
    fn record_serializes_with_tri_state_signature_field() {
        let record = GuestVerificationRecord {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            reservation_id: None,
            guest_index: 0,
            guest_name: Some("Kim".to_string()),
            id_type: Some("resident_card".to_string()),
            ocr_success: true,
            status_verified: true,
            status_transaction_id: Some("tx-1".to_string()),
            face_matched: true,
            similarity_score: Some(0.97),
            is_adult: true,
            status: VerificationStatus::Verified,
            failure_reason: None,
            verified_at: Some(Utc::now()),
            signature_name: None,
            signature_matched: SignatureMatch::NotEvaluated,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["signature_matched"], "not_evaluated");
        assert_eq!(json["status"], "verified");
    }
}
