//! # Bearer Token Authentication
//!
//! Static bearer token auth for the kiosk API. The token is configured via
//! the `STAYPORT_AUTH_TOKEN` env var; when unset the API runs open, which is
//! the expected mode for local development and tests.
//!
//! Comparison is constant-time to avoid leaking the token length or prefix
//! through response timing.

use axum::extract::Request;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;

use crate::error::AppError;

/// Auth configuration injected as a request extension.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// Expected bearer token. `None` disables authentication.
    pub token: Option<String>,
}

/// Middleware that enforces bearer auth on every request it wraps.
pub async fn auth_middleware(request: Request, next: Next) -> Response {
    let config = request.extensions().get::<AuthConfig>().cloned();

    let expected = match config.and_then(|c| c.token) {
        Some(token) => token,
        // No token configured: auth disabled.
        None => return next.run(request).await,
    };

    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if token.as_bytes().ct_eq(expected.as_bytes()).into() => {
            next.run(request).await
        }
        Some(_) => AppError::Unauthorized("invalid bearer token".into()).into_response(),
        None => {
            AppError::Unauthorized("missing Authorization: Bearer header".into()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::{Extension, Router};
    use tower::ServiceExt;

    fn app(token: Option<&str>) -> Router {
        Router::new()
            .route("/guarded", get(|| async { "ok" }))
            .layer(from_fn(auth_middleware))
            .layer(Extension(AuthConfig {
                token: token.map(str::to_string),
            }))
    }

    async fn get_status(app: Router, auth: Option<&str>) -> StatusCode {
        let mut builder = Request::builder().uri("/guarded");
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        let resp = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        resp.status()
    }

    #[tokio::test]
    async fn no_token_configured_allows_all() {
        assert_eq!(get_status(app(None), None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn correct_token_is_accepted() {
        let status = get_status(app(Some("secret")), Some("Bearer secret")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn wrong_token_is_rejected() {
        let status = get_status(app(Some("secret")), Some("Bearer nope")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        assert_eq!(
            get_status(app(Some("secret")), None).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_rejected() {
        let status = get_status(app(Some("secret")), Some("Basic c2VjcmV0")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
