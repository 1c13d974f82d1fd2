//! # stayport-api — Axum API for the Stayport Check-in Platform
//!
//! Kiosk-facing verification service: runs the guest identity pipeline
//! (document OCR, registry status check, face matching), gates the session on
//! signature reconciliation, and keeps an append-only record of every
//! attempt.
//!
//! ## API Surface
//!
//! | Route                          | Module                      | Purpose                  |
//! |--------------------------------|-----------------------------|--------------------------|
//! | `POST /v1/verifications`       | [`routes::verifications`]   | Submit a guest's attempt |
//! | `GET /v1/verifications`        | [`routes::verifications`]   | Verification history     |
//! | `GET /openapi.json`            | [`openapi`]                 | OpenAPI spec             |
//! | `GET /health/{liveness,readiness}` | —                       | Probes (unauthenticated) |
//! | `GET /metrics`                 | [`middleware::metrics`]     | Prometheus scrape        |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod pipeline;
pub mod reconcile;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Check if metrics are enabled via the `STAYPORT_METRICS_ENABLED` env var.
/// Defaults to `true` when the variable is absent or set to anything other
/// than `"false"`.
fn metrics_enabled() -> bool {
    std::env::var("STAYPORT_METRICS_ENABLED")
        .map(|v| v.to_lowercase() != "false")
        .unwrap_or(true)
}

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) and `/metrics` are mounted outside the auth
/// middleware so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = ApiMetrics::new();
    let metrics_on = metrics_enabled();

    // Authenticated API routes.
    //
    // Body size limit: 10 MiB. Document and face captures arrive base64-
    // encoded inline, so the default 2 MiB limit would reject ordinary
    // kiosk camera frames.
    let mut api = Router::new()
        .merge(routes::verifications::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(from_fn(auth::auth_middleware));

    // Only register the metrics middleware when metrics are enabled.
    if metrics_on {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(metrics.clone()));
    }

    let api = api
        .layer(TraceLayer::new_for_http())
        .layer(Extension(auth_config))
        .with_state(state.clone());

    // Unauthenticated health probes — readiness checks actual service health.
    let mut unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    if metrics_on {
        unauthenticated = unauthenticated
            .route("/metrics", axum::routing::get(prometheus_metrics))
            .layer(Extension(metrics));
    }

    let unauthenticated = unauthenticated.with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// GET /metrics — Prometheus metrics scrape endpoint.
///
/// Updates domain gauges from current `AppState` on each scrape (pull model),
/// then gathers and encodes all metrics in Prometheus text exposition format.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    // -- Update domain gauges from AppState --

    let (verified, failed) = state.verifications.status_counts();
    metrics.verifications_total().reset();
    metrics
        .verifications_total()
        .with_label_values(&["verified"])
        .set(verified as f64);
    metrics
        .verifications_total()
        .with_label_values(&["failed"])
        .set(failed as f64);

    let (matched, not_matched) = state.verifications.signature_counts();
    metrics.signature_reconciliations_total().reset();
    metrics
        .signature_reconciliations_total()
        .with_label_values(&["matched"])
        .set(matched as f64);
    metrics
        .signature_reconciliations_total()
        .with_label_values(&["not_matched"])
        .set(not_matched as f64);

    metrics
        .reservation_verified_guests_total()
        .set(state.reservation_guests.len() as f64);

    metrics
        .provider_configured()
        .set(if state.provider.is_some() { 1.0 } else { 0.0 });

    // -- Gather and encode --
    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — verifies the application is ready to serve traffic.
///
/// Checks:
/// - In-memory stores are accessible.
/// - Database connection is healthy (when configured).
///
/// A missing verification provider does not fail readiness: the server runs
/// intentionally without one in development, and the verification routes
/// already answer 503 on their own.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    // Verify stores are accessible (read lock acquirable).
    let _ = state.verifications.len();
    let _ = state.reservation_guests.len();

    // Verify database connection (when configured).
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("Database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}
