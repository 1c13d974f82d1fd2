//! # Live HTTP Provider Client
//!
//! Production implementation of [`IdvProvider`] against the verification
//! provider's JSON API. Wraps a `reqwest::Client` with bearer authentication,
//! a per-request timeout, and transport-level retry via [`crate::retry`].
//!
//! Provider responses use a `success`/`error` envelope; an envelope with
//! `success=false` maps to [`IdvError::Rejected`] with the provider's reason,
//! which the pipeline surfaces as a field-level failure — never as an HTTP
//! error of the kiosk API itself.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::IdvConfig;
use crate::error::IdvError;
use crate::provider::{FaceMatchResult, IdvProvider, OcrFields, StatusCheckResult};
use crate::retry::{with_retries, RetryPolicy};

/// HTTP client for the live verification provider.
#[derive(Debug)]
pub struct HttpIdvProvider {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl HttpIdvProvider {
    /// Build a provider client from configuration.
    pub fn new(config: IdvConfig) -> Result<Self, IdvError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&format!("Bearer {}", config.api_token))
                .map_err(|_| crate::config::ConfigError::InvalidToken)?,
        );
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| IdvError::Http {
                endpoint: config.base_url.clone(),
                source: e,
            })?;

        Ok(Self {
            client,
            base_url: config.base_url,
            retry: RetryPolicy {
                max_retries: config.max_retries,
                ..RetryPolicy::default()
            },
        })
    }

    /// POST a JSON body and decode the enveloped response.
    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, IdvError>
    where
        B: Serialize,
        R: serde::de::DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);

        let resp = with_retries(path, &self.retry, || {
            self.client.post(&url).json(body).send()
        })
        .await
        .map_err(|e| IdvError::Http {
            endpoint: path.to_string(),
            source: e,
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(IdvError::Api {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let envelope: Envelope<R> = resp.json().await.map_err(|e| IdvError::Deserialization {
            endpoint: path.to_string(),
            source: e,
        })?;

        match (envelope.success, envelope.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(IdvError::Rejected {
                endpoint: path.to_string(),
                reason: envelope
                    .error
                    .unwrap_or_else(|| "provider returned no result".to_string()),
            }),
        }
    }
}

/// Cap response-body excerpts carried in errors; provider bodies can echo
/// megabytes of base64 back on malformed requests.
fn truncate_body(body: &str) -> String {
    const MAX: usize = 512;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &body[..end])
    }
}

/// Provider response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default = "Option::default")]
    data: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct OcrRequest<'a> {
    image: &'a str,
}

#[derive(Debug, Serialize)]
struct StatusRequest<'a> {
    name: &'a str,
    birthdate: &'a str,
    id_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id_number: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    issue_date: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct FaceMatchRequest<'a> {
    live_image: &'a str,
    document_image: &'a str,
}

#[async_trait]
impl IdvProvider for HttpIdvProvider {
    async fn ocr(&self, document_image: &str) -> Result<OcrFields, IdvError> {
        self.post(
            "/v1/id-card/ocr",
            &OcrRequest {
                image: document_image,
            },
        )
        .await
    }

    async fn status_check(&self, fields: &OcrFields) -> Result<StatusCheckResult, IdvError> {
        self.post(
            "/v1/id-card/status",
            &StatusRequest {
                name: &fields.name,
                birthdate: &fields.birthdate,
                id_type: &fields.id_type,
                id_number: fields.id_number.as_deref(),
                issue_date: fields.issue_date.as_deref(),
            },
        )
        .await
    }

    async fn face_match(
        &self,
        live_image: &str,
        document_image: &str,
    ) -> Result<FaceMatchResult, IdvError> {
        self.post(
            "/v1/face/match",
            &FaceMatchRequest {
                live_image,
                document_image,
            },
        )
        .await
    }

    fn provider_name(&self) -> &str {
        "HttpIdvProvider"
    }
}
