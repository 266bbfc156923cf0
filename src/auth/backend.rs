use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::api::models::ApiEnvelope;
use crate::error::{AppError, AppResult};

use super::token::TokenPair;

/// The single operation the auth backend exposes to this client: exchange a
/// refresh token for a new access token (and possibly a rotated refresh
/// token).
pub trait AuthBackend: Send + Sync {
    fn refresh(&self, refresh_token: &str) -> impl Future<Output = AppResult<TokenPair>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpAuthBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAuthBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn refresh_endpoint(&self) -> AppResult<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.set_path("auth/refresh");
        Ok(url)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthErrorEnvelope {
    error: Option<AuthErrorBody>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthErrorBody {
    message: Option<String>,
}

impl AuthBackend for HttpAuthBackend {
    async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        let url = self.refresh_endpoint()?;
        debug!(%url, "requesting session refresh");

        let response = self
            .http
            .post(url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let envelope: ApiEnvelope<TokenPair> = response.json().await?;
            return Ok(envelope.data);
        }

        let body = response.text().await.unwrap_or_default();
        Err(AppError::Auth(format!(
            "token refresh failed ({status}): {}",
            refresh_error_message(&body)
        )))
    }
}

fn refresh_error_message(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<AuthErrorEnvelope>(body) {
        if let Some(message) = envelope.error.and_then(|err| err.message) {
            return message;
        }
        if let Some(message) = envelope.message {
            return message;
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no error details in response body".to_string()
    } else {
        trimmed.to_string()
    }
}
