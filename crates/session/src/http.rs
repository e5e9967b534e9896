//! HTTP client for the identity service.
//!
//! Endpoints, relative to the configured API URL:
//! - `POST /auth/login`  `{email, password}`             → `{token, user}`
//! - `POST /auth/signup` `{name, email, password, role}` → `{token, user}`
//! - `GET  /auth/me` with `Authorization: Bearer <token>` → `{user}`
//!
//! Non-2xx responses are expected to carry `{"message": "..."}` (or `error`),
//! which is forwarded verbatim.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use stockroom_auth::{Credentials, SignupRequest, User};

use crate::identity::{AuthPayload, IdentityError, IdentityService};

#[derive(Debug, Clone)]
pub struct HttpIdentityService {
    api_url: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct CurrentUserResponse {
    user: User,
}

impl HttpIdentityService {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(api_url, reqwest::Client::new())
    }

    pub fn with_client(api_url: impl Into<String>, client: reqwest::Client) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self { api_url, client }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, IdentityError> {
        let resp = req
            .send()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(rejection(resp).await);
        }

        resp.json::<T>()
            .await
            .map_err(|e| IdentityError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl IdentityService for HttpIdentityService {
    async fn login(&self, credentials: &Credentials) -> Result<AuthPayload, IdentityError> {
        let req = self
            .client
            .post(self.url("/auth/login"))
            .json(&serde_json::json!({
                "email": credentials.email,
                "password": credentials.password,
            }));
        self.send(req).await
    }

    async fn signup(&self, request: &SignupRequest) -> Result<AuthPayload, IdentityError> {
        let req = self.client.post(self.url("/auth/signup")).json(request);
        self.send(req).await
    }

    async fn current_user(&self, token: &str) -> Result<User, IdentityError> {
        let req = self.client.get(self.url("/auth/me")).bearer_auth(token);
        let body: CurrentUserResponse = self.send(req).await?;
        Ok(body.user)
    }
}

async fn rejection(resp: Response) -> IdentityError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    IdentityError::Rejected(message_from_body(status.as_u16(), &body))
}

/// Pull the human-readable message out of an error body.
fn message_from_body(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["message", "error"] {
            if let Some(msg) = value.get(field).and_then(|v| v.as_str()) {
                if !msg.trim().is_empty() {
                    return msg.to_string();
                }
            }
        }
    }
    format!("Request failed with status {}", status)
}
