//! # Provider Adapter Trait and Result Types
//!
//! The contract the verification pipeline needs from the external provider,
//! and nothing more. Each method is one remote capability call; the status
//! check consumes OCR output and cannot run standalone.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::IdvError;

/// Structured identity fields extracted from an ID-document image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrFields {
    /// Guest name as printed on the document.
    pub name: String,
    /// Document type (e.g. `resident_card`, `driver_license`, `passport`).
    pub id_type: String,
    /// Birthdate, `YYYY-MM-DD` or `YYYYMMDD` depending on document type.
    pub birthdate: String,
    /// Masked document number, when the provider returns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_number: Option<String>,
    /// Document issue date, when present on the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<String>,
}

/// Outcome of the registry status check for an extracted identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCheckResult {
    /// Whether the registry confirmed the identity as authentic and current.
    pub verified: bool,
    /// Provider transaction id, persisted for audit.
    pub transaction_id: String,
}

/// Outcome of comparing a live capture against the document photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceMatchResult {
    /// The provider's match decision.
    pub matched: bool,
    /// Similarity score in `[0, 1]`.
    pub similarity: f64,
}

/// Adapter trait for the external identity-verification provider.
///
/// Object-safe and `Send + Sync` so the API layer can select mock or live
/// implementations at runtime behind an `Arc<dyn IdvProvider>`.
#[async_trait]
pub trait IdvProvider: Send + Sync {
    /// Extract identity fields from a base64-encoded ID-document image.
    async fn ocr(&self, document_image: &str) -> Result<OcrFields, IdvError>;

    /// Check the extracted identity against the authoritative registry.
    async fn status_check(&self, fields: &OcrFields) -> Result<StatusCheckResult, IdvError>;

    /// Compare a base64-encoded live capture against the document photo.
    async fn face_match(
        &self,
        live_image: &str,
        document_image: &str,
    ) -> Result<FaceMatchResult, IdvError>;

    /// Human-readable name of this provider implementation.
    fn provider_name(&self) -> &str;
}
