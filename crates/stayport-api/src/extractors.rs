//! # Validated JSON Extraction
//!
//! Request bodies are taken as `Result<Json<T>, JsonRejection>` so that
//! deserialization failures surface as structured 400 responses instead of
//! axum's default plain-text rejection, then routed through the type's
//! [`Validate`] implementation.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Request types that carry semantic validation beyond deserialization.
pub trait Validate {
    /// Check business-rule validity. The message becomes the 400 body.
    fn validate(&self) -> Result<(), String>;
}

/// Unwrap a JSON extraction result and validate the payload.
pub fn extract_validated_json<T: Validate>(
    body: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let Json(value) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Probe {
        value: u32,
    }

    impl Validate for Probe {
        fn validate(&self) -> Result<(), String> {
            if self.value == 0 {
                return Err("value must be positive".into());
            }
            Ok(())
        }
    }

    #[test]
    fn valid_payload_passes() {
        let probe = extract_validated_json(Ok(Json(Probe { value: 3 }))).unwrap();
        assert_eq!(probe.value, 3);
    }

    #[test]
    fn invalid_payload_becomes_validation_error() {
        let err = extract_validated_json(Ok(Json(Probe { value: 0 }))).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
