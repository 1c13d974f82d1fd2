//! # Scriptable Mock Provider
//!
//! In-memory [`IdvProvider`] for tests and keyless development mode. Each
//! step's outcome is scripted at construction; call counters let tests assert
//! which provider calls a pipeline run actually issued (the OCR-failure
//! short-circuit must never reach the status check, for instance).

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use crate::error::IdvError;
use crate::provider::{FaceMatchResult, IdvProvider, OcrFields, StatusCheckResult};

/// Scriptable mock implementation of [`IdvProvider`].
#[derive(Debug)]
pub struct MockIdvProvider {
    ocr_outcome: Result<OcrFields, String>,
    status_verified: bool,
    face_matched: bool,
    similarity: f64,
    ocr_calls: AtomicU32,
    status_calls: AtomicU32,
    face_calls: AtomicU32,
}

impl MockIdvProvider {
    /// A provider where every step passes for a guest with the given name.
    ///
    /// Default birthdate is well past the adult threshold; override with
    /// [`with_birthdate`](Self::with_birthdate) for adulthood cases.
    pub fn passing(name: &str) -> Self {
        Self {
            ocr_outcome: Ok(OcrFields {
                name: name.to_string(),
                id_type: "resident_card".to_string(),
                birthdate: "1990-03-15".to_string(),
                id_number: Some("900315-1******".to_string()),
                issue_date: Some("2020-01-10".to_string()),
            }),
            status_verified: true,
            face_matched: true,
            similarity: 0.97,
            ocr_calls: AtomicU32::new(0),
            status_calls: AtomicU32::new(0),
            face_calls: AtomicU32::new(0),
        }
    }

    /// Script an OCR failure with the given provider reason.
    pub fn with_ocr_failure(mut self, reason: &str) -> Self {
        self.ocr_outcome = Err(reason.to_string());
        self
    }

    /// Script the registry status check to report the identity unverified.
    pub fn with_status_unverified(mut self) -> Self {
        self.status_verified = false;
        self
    }

    /// Script a face mismatch with the given similarity score.
    pub fn with_face_mismatch(mut self, similarity: f64) -> Self {
        self.face_matched = false;
        self.similarity = similarity;
        self
    }

    /// Override the OCR birthdate.
    pub fn with_birthdate(mut self, birthdate: &str) -> Self {
        if let Ok(fields) = self.ocr_outcome.as_mut() {
            fields.birthdate = birthdate.to_string();
        }
        self
    }

    /// Number of `ocr` calls issued against this mock.
    pub fn ocr_calls(&self) -> u32 {
        self.ocr_calls.load(Ordering::SeqCst)
    }

    /// Number of `status_check` calls issued against this mock.
    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Number of `face_match` calls issued against this mock.
    pub fn face_calls(&self) -> u32 {
        self.face_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdvProvider for MockIdvProvider {
    async fn ocr(&self, _document_image: &str) -> Result<OcrFields, IdvError> {
        self.ocr_calls.fetch_add(1, Ordering::SeqCst);
        self.ocr_outcome.clone().map_err(|reason| IdvError::Rejected {
            endpoint: "/v1/id-card/ocr".to_string(),
            reason,
        })
    }

    async fn status_check(&self, _fields: &OcrFields) -> Result<StatusCheckResult, IdvError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(StatusCheckResult {
            verified: self.status_verified,
            transaction_id: format!("mock-tx-{}", self.status_calls()),
        })
    }

    async fn face_match(
        &self,
        _live_image: &str,
        _document_image: &str,
    ) -> Result<FaceMatchResult, IdvError> {
        self.face_calls.fetch_add(1, Ordering::SeqCst);
        Ok(FaceMatchResult {
            matched: self.face_matched,
            similarity: self.similarity,
        })
    }

    fn provider_name(&self) -> &str {
        "MockIdvProvider"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passing_mock_passes_every_step() {
        let mock = MockIdvProvider::passing("Kim");
        let fields = mock.ocr("doc").await.unwrap();
        assert_eq!(fields.name, "Kim");
        assert!(mock.status_check(&fields).await.unwrap().verified);
        assert!(mock.face_match("live", "doc").await.unwrap().matched);
        assert_eq!((mock.ocr_calls(), mock.status_calls(), mock.face_calls()), (1, 1, 1));
    }

    #[tokio::test]
    async fn scripted_ocr_failure_is_a_rejection() {
        let mock = MockIdvProvider::passing("Kim").with_ocr_failure("glare on document");
        let err = mock.ocr("doc").await.unwrap_err();
        assert!(matches!(err, IdvError::Rejected { .. }));
        assert!(err.to_string().contains("glare on document"));
    }

    #[tokio::test]
    async fn scripted_face_mismatch_reports_similarity() {
        let mock = MockIdvProvider::passing("Kim").with_face_mismatch(0.41);
        let result = mock.face_match("live", "doc").await.unwrap();
        assert!(!result.matched);
        assert_eq!(result.similarity, 0.41);
    }
}
