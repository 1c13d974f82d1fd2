//! # Signature Reconciliation
//!
//! The authorization gate of the check-in flow: on the session's last guest,
//! the name handwritten on the consent form must equal — under trim and
//! case-fold normalization, nothing fuzzier — one of the identities actually
//! verified for the stay. A guest whose document and face checks all passed
//! is still rejected here if a different name appears on the consent form.
//!
//! The pool is the record store's scoping query plus the current guest's own
//! OCR name, which is appended unconditionally: the current attempt's record
//! is written only after reconciliation, so no store query can find it.

use stayport_core::{match_signature, SignatureMatch};

/// Outcome of reconciling a consent signature against the verified pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Matched / NotMatched. Never NotEvaluated — constructing this type is
    /// the evaluation.
    pub signature_matched: SignatureMatch,
    /// The pool entry the signature resolved to, original casing.
    pub matched_guest_name: Option<String>,
    /// Guest-facing reason, present when the signature matched nothing.
    pub failure_reason: Option<String>,
}

impl ReconcileOutcome {
    /// Whether the gate passed.
    pub fn matched(&self) -> bool {
        self.signature_matched == SignatureMatch::Matched
    }
}

/// Match `signature_name` against the verified pool plus the current guest's
/// own OCR name.
pub fn reconcile(
    signature_name: &str,
    pool_names: &[String],
    own_ocr_name: Option<&str>,
) -> ReconcileOutcome {
    let candidates = pool_names
        .iter()
        .map(String::as_str)
        .chain(own_ocr_name);

    match match_signature(signature_name, candidates) {
        Some(matched) => ReconcileOutcome {
            signature_matched: SignatureMatch::Matched,
            matched_guest_name: Some(matched.to_string()),
            failure_reason: None,
        },
        None => ReconcileOutcome {
            signature_matched: SignatureMatch::NotMatched,
            matched_guest_name: None,
            failure_reason: Some(format!(
                "signature name ({signature_name}) does not match any verified guest"
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_matching_a_prior_guest_passes() {
        let pool = vec!["Kim".to_string()];
        let outcome = reconcile("kim", &pool, Some("Lee"));
        assert!(outcome.matched());
        assert_eq!(outcome.matched_guest_name.as_deref(), Some("Kim"));
        assert!(outcome.failure_reason.is_none());
    }

    #[test]
    fn signature_matching_own_ocr_name_passes() {
        // Walk-in, first and only guest: the pool query returns nothing, but
        // the guest's own OCR name is always a candidate.
        let outcome = reconcile(" LEE ", &[], Some("Lee"));
        assert!(outcome.matched());
        assert_eq!(outcome.matched_guest_name.as_deref(), Some("Lee"));
    }

    #[test]
    fn unmatched_signature_is_rejected_with_the_name_in_the_reason() {
        let pool = vec!["Kim".to_string()];
        let outcome = reconcile("Park", &pool, Some("Lee"));
        assert!(!outcome.matched());
        assert_eq!(outcome.signature_matched, SignatureMatch::NotMatched);
        let reason = outcome.failure_reason.unwrap();
        assert!(reason.contains("Park"));
    }

    #[test]
    fn pool_entries_take_precedence_over_own_name() {
        // Both normalize equal; the pool entry's casing is reported.
        let pool = vec!["KIM".to_string()];
        let outcome = reconcile("kim", &pool, Some("Kim"));
        assert_eq!(outcome.matched_guest_name.as_deref(), Some("KIM"));
    }

    #[test]
    fn no_candidates_never_matches() {
        let outcome = reconcile("Kim", &[], None);
        assert!(!outcome.matched());
    }
}
