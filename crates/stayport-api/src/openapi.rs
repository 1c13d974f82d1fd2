//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec.
//! Serves at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds Bearer token security scheme to the OpenAPI spec.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "Bearer token authentication. Set via STAYPORT_AUTH_TOKEN env var.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stayport API — Identity Verification & Signature Reconciliation",
        version = "0.3.2",
        description = "Self-check-in verification service for hotel kiosks.\n\nProvides:\n- **Guest verification pipeline** — ID document OCR, registry status check, and face matching, composable per request via the `action` field\n- **Signature reconciliation** — on the last guest of a session, the consent-form signature is matched against the verified identities in scope; a mismatch retroactively fails the attempt\n- **Verification history** — append-only record of every attempt, queryable by project, reservation, and status\n\nAuthentication: Bearer token via `Authorization: Bearer <token>` header.\nAll `/v1/*` endpoints require authentication when a token is configured. Health probes (`/health/*`) and `/metrics` are unauthenticated.",
        license(name = "BUSL-1.1"),
        contact(name = "Stayport", url = "https://stayport.io")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    paths(
        crate::routes::verifications::submit_verification,
        crate::routes::verifications::list_verifications,
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            crate::routes::verifications::VerifyRequest,
            crate::routes::verifications::VerifyResponse,
            crate::routes::verifications::VerificationData,
            crate::routes::verifications::OcrResultBody,
            crate::routes::verifications::HistoryResponse,
        ),
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "verifications", description = "Guest verification pipeline, signature reconciliation, and verification history"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router. Serves the spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_spec_generates_successfully() {
        let spec = ApiDoc::openapi();
        assert_eq!(
            spec.info.title,
            "Stayport API — Identity Verification & Signature Reconciliation"
        );
        assert_eq!(spec.info.version, "0.3.2");
    }

    #[test]
    fn openapi_spec_has_verification_paths() {
        use utoipa::openapi::PathItemType;

        let spec = ApiDoc::openapi();
        assert!(
            spec.paths.paths.contains_key("/v1/verifications"),
            "should contain /v1/verifications path"
        );
        let item = &spec.paths.paths["/v1/verifications"];
        assert!(
            item.operations.contains_key(&PathItemType::Post),
            "POST should be documented"
        );
        assert!(
            item.operations.contains_key(&PathItemType::Get),
            "GET should be documented"
        );
    }

    #[test]
    fn openapi_spec_has_security_scheme() {
        let spec = ApiDoc::openapi();
        let components = spec.components.as_ref().unwrap();
        assert!(
            components.security_schemes.contains_key("bearer_auth"),
            "should contain bearer_auth security scheme"
        );
    }

    #[test]
    fn openapi_spec_has_components() {
        let spec = ApiDoc::openapi();
        let schemas = &spec.components.as_ref().unwrap().schemas;
        for name in &["VerifyRequest", "VerifyResponse", "ErrorBody"] {
            assert!(schemas.contains_key(*name), "should contain {name} schema");
        }
    }

    #[test]
    fn openapi_spec_serializes_to_json() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("openapi"));
        assert!(json.contains("bearer_auth"));
    }

    #[test]
    fn router_builds_successfully() {
        let _router = router();
    }
}
