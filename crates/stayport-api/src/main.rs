//! Stayport API server binary.
//!
//! Configuration is environment-driven:
//! - `BIND_ADDR` — listen address, default `0.0.0.0:8080`.
//! - `STAYPORT_AUTH_TOKEN` — bearer token for `/v1/*` routes; unset runs open.
//! - `DATABASE_URL` — Postgres; unset runs in-memory only.
//! - `IDV_API_BASE_URL` / `IDV_API_TOKEN` — verification provider; unset
//!   leaves verification routes answering 503.
//! - `IDV_USE_MOCK` — set to `true` to serve a fixed passing pipeline for
//!   local kiosk development without provider credentials.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use stayport_api::state::{AppConfig, AppState};
use stayport_idv::{HttpIdvProvider, IdvConfig, IdvProvider, MockIdvProvider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig {
        auth_token: std::env::var("STAYPORT_AUTH_TOKEN").ok(),
    };
    if config.auth_token.is_none() {
        tracing::warn!("STAYPORT_AUTH_TOKEN not set — API authentication disabled");
    }

    let db_pool = stayport_api::db::init_pool()
        .await
        .context("database initialization failed")?;

    let provider = build_provider()?;

    let mut state = AppState::new().with_config(config);
    state.db_pool = db_pool;
    if let Some(provider) = provider {
        state = state.with_provider(provider);
    }

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!("stayport-api listening on {bind_addr}");

    axum::serve(listener, stayport_api::app(state))
        .await
        .context("server error")?;

    Ok(())
}

/// Select the verification provider from the environment.
///
/// `IDV_USE_MOCK=true` wins over provider credentials; with neither, the
/// server starts without a provider and verification routes answer 503.
fn build_provider() -> anyhow::Result<Option<Arc<dyn IdvProvider>>> {
    if std::env::var("IDV_USE_MOCK").is_ok_and(|v| v.to_lowercase() == "true") {
        tracing::warn!("IDV_USE_MOCK enabled — serving a fixed passing verification pipeline");
        return Ok(Some(Arc::new(MockIdvProvider::passing("Mock Guest"))));
    }

    match IdvConfig::from_env().context("invalid provider configuration")? {
        Some(config) => {
            let provider =
                HttpIdvProvider::new(config).context("failed to build provider client")?;
            tracing::info!("verification provider configured");
            Ok(Some(Arc::new(provider)))
        }
        None => {
            tracing::warn!(
                "IDV_API_BASE_URL / IDV_API_TOKEN not set — verification routes will answer 503"
            );
            Ok(None)
        }
    }
}
