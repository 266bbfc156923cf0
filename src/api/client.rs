use std::sync::{Arc, PoisonError, RwLock};

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{AppError, AppResult};

use super::models::{ApiEnvelope, PollView, ProfileView, StakeReceipt, StakeRequest};

/// Client for the Showcall polls backend. Holds the current access token in a
/// shared slot; the session refresh scheduler is the writer for renewed
/// tokens, everything else only reads it.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Applies to all subsequent outgoing requests, across every clone of
    /// this client.
    pub fn set_token(&self, access_token: &str) {
        *self
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(access_token.to_string());
    }

    pub fn clear_token(&self) {
        *self
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn bearer_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn me(&self) -> AppResult<ProfileView> {
        self.get_json("/users/me", None).await
    }

    pub async fn list_polls(&self, limit: u32, status: Option<&str>) -> AppResult<Vec<PollView>> {
        let mut query = vec![("limit".to_string(), limit.to_string())];
        if let Some(status) = status {
            query.push(("status".to_string(), status.to_string()));
        }

        self.get_json("/polls", Some(&query)).await
    }

    pub async fn get_poll(&self, id: &str) -> AppResult<PollView> {
        self.get_json(&format!("/polls/{id}"), None).await
    }

    pub async fn place_stake(
        &self,
        poll_id: &str,
        option_id: &str,
        amount: &str,
    ) -> AppResult<StakeReceipt> {
        let request = StakeRequest { option_id, amount };
        self.post_json(&format!("/polls/{poll_id}/stakes"), &request)
            .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: Option<&[(String, String)]>,
    ) -> AppResult<T> {
        let url = self.endpoint_url(endpoint)?;
        let mut request = self.http.get(url);
        if let Some(token) = self.bearer_token() {
            request = request.bearer_auth(token);
        }
        if let Some(query) = query {
            request = request.query(query);
        }

        let response = request.send().await?;
        self.parse_json_response(response).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> AppResult<T> {
        let url = self.endpoint_url(endpoint)?;
        let mut request = self.http.post(url).json(body);
        if let Some(token) = self.bearer_token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        self.parse_json_response(response).await
    }

    fn endpoint_url(&self, endpoint: &str) -> AppResult<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.set_path(endpoint.trim_start_matches('/'));
        Ok(url)
    }

    async fn parse_json_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> AppResult<T> {
        let status = response.status();
        if status.is_success() {
            let envelope: ApiEnvelope<T> = response.json().await?;
            return Ok(envelope.data);
        }

        let body = response.text().await.unwrap_or_default();
        Err(map_api_error(status, &body))
    }
}

#[derive(Debug, serde::Deserialize)]
struct ApiErrorEnvelope {
    error: Option<ApiErrorBody>,
    message: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    code: Option<String>,
}

fn map_api_error(status: StatusCode, body: &str) -> AppError {
    let message = parse_api_error_message(body).unwrap_or_else(|| {
        let body = body.trim();
        if body.is_empty() {
            "no error details in response body".to_string()
        } else {
            body.to_string()
        }
    });

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return AppError::Auth(format!(
            "showcall api authorization failed ({status}): {message}. run `showcall auth refresh` or log in again"
        ));
    }

    AppError::Api(format!("showcall api request failed ({status}): {message}"))
}

fn parse_api_error_message(body: &str) -> Option<String> {
    let envelope = serde_json::from_str::<ApiErrorEnvelope>(body).ok()?;

    if let Some(error) = envelope.error {
        let mut parts = Vec::new();
        if let Some(message) = error.message {
            parts.push(message);
        }
        if let Some(code) = error.code {
            parts.push(format!("code={code}"));
        }
        if !parts.is_empty() {
            return Some(parts.join(", "));
        }
    }

    envelope.message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_slot_is_shared_across_clones() {
        let client = ApiClient::new("https://api.example.test");
        let clone = client.clone();

        client.set_token("access-abc");
        assert_eq!(clone.bearer_token().as_deref(), Some("access-abc"));

        clone.clear_token();
        assert_eq!(client.bearer_token(), None);
    }

    #[test]
    fn maps_unauthorized_as_auth_error() {
        let error = map_api_error(
            StatusCode::UNAUTHORIZED,
            r#"{"error":{"message":"access token expired","code":"TOKEN_EXPIRED"}}"#,
        );

        match error {
            AppError::Auth(message) => {
                assert!(message.contains("access token expired"));
                assert!(message.contains("code=TOKEN_EXPIRED"));
            }
            other => panic!("expected auth error, got {other:?}"),
        }
    }

    #[test]
    fn maps_server_failure_as_api_error() {
        let error = map_api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"message":"pool settlement in progress"}"#,
        );

        match error {
            AppError::Api(message) => {
                assert!(message.contains("pool settlement in progress"));
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn maps_empty_body_with_placeholder() {
        let error = map_api_error(StatusCode::BAD_GATEWAY, "");
        match error {
            AppError::Api(message) => {
                assert!(message.contains("no error details"));
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }
}
