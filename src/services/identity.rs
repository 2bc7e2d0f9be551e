//! Identity service client.
//!
//! Authentication lives in a separate service. We forward the caller's session cookie to
//! `GET /users/validate_token` and trust the identity and role it returns.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::COOKIE, Client, StatusCode};
use serde::Deserialize;

use crate::{
    config::IdentityConfig,
    error::{AppError, AppResult},
    models::{Caller, Role},
};

/// Resolves a session token into an authenticated caller
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn validate(&self, token: &str) -> AppResult<Caller>;
}

/// Payload returned by the identity service
#[derive(Debug, Deserialize)]
pub struct IdentityPayload {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
}

impl TryFrom<IdentityPayload> for Caller {
    type Error = AppError;

    fn try_from(payload: IdentityPayload) -> Result<Self, Self::Error> {
        let role: Role = payload.role.parse().map_err(AppError::Authorization)?;
        Ok(Caller {
            user_id: payload.user_id,
            username: payload.username,
            role,
            email: payload.email.unwrap_or_default(),
            mobile: payload.mobile.unwrap_or_default(),
        })
    }
}

#[derive(Clone)]
pub struct HttpIdentityProvider {
    client: Client,
    validate_url: String,
    cookie_name: String,
}

impl HttpIdentityProvider {
    pub fn new(config: &IdentityConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            validate_url: format!(
                "{}/users/validate_token",
                config.base_url.trim_end_matches('/')
            ),
            cookie_name: config.cookie_name.clone(),
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn validate(&self, token: &str) -> AppResult<Caller> {
        let response = self
            .client
            .get(&self.validate_url)
            .header(COOKIE, format!("{}={}", self.cookie_name, token))
            .send()
            .await
            .map_err(|e| AppError::IdentityUnavailable(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            tracing::debug!(%status, "Identity service rejected token");
            return Err(AppError::Authentication(match status {
                StatusCode::NOT_FOUND => "User not found".to_string(),
                _ => "Invalid or expired token".to_string(),
            }));
        }
        if !status.is_success() {
            return Err(AppError::IdentityUnavailable(format!(
                "validate_token returned {}",
                status
            )));
        }

        let payload: IdentityPayload = response
            .json()
            .await
            .map_err(|e| AppError::IdentityUnavailable(format!("Malformed identity payload: {}", e)))?;

        Caller::try_from(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(role: &str) -> IdentityPayload {
        IdentityPayload {
            user_id: 3,
            username: "bob".to_string(),
            role: role.to_string(),
            email: Some("bob@example.org".to_string()),
            mobile: None,
        }
    }

    #[test]
    fn test_payload_into_caller() {
        let caller = Caller::try_from(payload("Librarian")).unwrap();
        assert_eq!(caller.role, Role::Librarian);
        assert_eq!(caller.email, "bob@example.org");
        assert_eq!(caller.mobile, "");
    }

    #[test]
    fn test_unknown_role_is_forbidden() {
        let err = Caller::try_from(payload("Janitor")).unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[test]
    fn test_payload_deserializes_identity_service_shape() {
        let json = r#"{"user_id":12,"username":"carol","role":"Member","email":"c@x.io","mobile":"555"}"#;
        let parsed: IdentityPayload = serde_json::from_str(json).unwrap();
        let caller = Caller::try_from(parsed).unwrap();
        assert_eq!(caller.user_id, 12);
        assert_eq!(caller.role, Role::Member);
    }

    #[test]
    fn test_validate_url_normalized() {
        let provider = HttpIdentityProvider::new(&IdentityConfig {
            base_url: "http://auth.local:3000/".to_string(),
            cookie_name: "jwt".to_string(),
            timeout_secs: 1,
        })
        .unwrap();
        assert_eq!(provider.validate_url, "http://auth.local:3000/users/validate_token");
    }

    #[test]
    fn test_mock_provider() {
        let mut mock = MockIdentityProvider::new();
        mock.expect_validate()
            .withf(|token| token == "good")
            .returning(|_| Caller::try_from(payload("Member")));
        mock.expect_validate()
            .returning(|_| Err(AppError::Authentication("Invalid or expired token".to_string())));

        let ok = tokio_test::block_on(mock.validate("good")).unwrap();
        assert_eq!(ok.username, "bob");
        let err = tokio_test::block_on(mock.validate("bad")).unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }
}
