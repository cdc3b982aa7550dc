#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Sign-in against an external identity provider.
//!
//! The provider authenticates a person and nothing more. It never says
//! whether that person is a citizen or an authority; callers must not
//! read a role into a successful [`AuthSession`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default base URL of the Identity Toolkit REST API.
pub const DEFAULT_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com";

/// Provider id used for Google federated sign-in.
pub const GOOGLE_PROVIDER_ID: &str = "google.com";

/// Provider error codes that mean the email/password pair was wrong.
const CREDENTIAL_ERROR_CODES: &[&str] = &[
    "EMAIL_NOT_FOUND",
    "INVALID_PASSWORD",
    "INVALID_LOGIN_CREDENTIALS",
    "INVALID_EMAIL",
    "USER_DISABLED",
];

/// Errors from a sign-in attempt.
#[derive(Debug, Error)]
pub enum AuthError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider rejected the credentials.
    #[error("Invalid credentials ({code})")]
    InvalidCredentials {
        /// Provider error code.
        code: String,
    },

    /// The provider refused the request for another reason.
    #[error("Identity provider rejected sign-in: {message}")]
    Rejected {
        /// Provider error message.
        message: String,
    },

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
}

/// An external identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Email/password sign-in.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError>;

    /// Federated sign-in with a token already issued by `provider_id`.
    async fn sign_in_with_idp(
        &self,
        provider_id: &str,
        id_token: &str,
        request_uri: &str,
    ) -> Result<AuthSession, AuthError>;
}

/// Firebase Authentication through the Identity Toolkit REST API.
#[derive(Debug, Clone)]
pub struct FirebaseIdentity {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FirebaseIdentity {
    #[must_use]
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self::with_base_url(client, DEFAULT_IDENTITY_URL, api_key)
    }

    #[must_use]
    pub fn with_base_url(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/v1/accounts:{method}?key={}",
            self.base_url.trim_end_matches('/'),
            self.api_key
        )
    }

    async fn post(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<AuthSession, AuthError> {
        let resp = self.client.post(self.endpoint(method)).json(&body).send().await?;
        let ok = resp.status().is_success();
        let body: serde_json::Value = resp.json().await?;

        if ok {
            parse_session(&body)
        } else {
            Err(parse_error(&body))
        }
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        log::debug!("Password sign-in for {email}");
        self.post(
            "signInWithPassword",
            serde_json::json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }),
        )
        .await
    }

    async fn sign_in_with_idp(
        &self,
        provider_id: &str,
        id_token: &str,
        request_uri: &str,
    ) -> Result<AuthSession, AuthError> {
        log::debug!("Federated sign-in via {provider_id}");
        let post_body = idp_post_body(provider_id, id_token)?;
        self.post(
            "signInWithIdp",
            serde_json::json!({
                "postBody": post_body,
                "requestUri": request_uri,
                "returnIdpCredential": true,
                "returnSecureToken": true,
            }),
        )
        .await
    }
}

/// Form-encodes the provider credential for `signInWithIdp`.
fn idp_post_body(provider_id: &str, id_token: &str) -> Result<String, AuthError> {
    let url = reqwest::Url::parse_with_params(
        "http://localhost/",
        &[("id_token", id_token), ("providerId", provider_id)],
    )
    .map_err(|e| AuthError::Parse {
        message: e.to_string(),
    })?;
    Ok(url.query().unwrap_or_default().to_string())
}

/// Wire shape of a successful sign-in response.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    id_token: String,
    refresh_token: String,
    /// Sent as a decimal string.
    expires_in: String,
}

fn parse_session(body: &serde_json::Value) -> Result<AuthSession, AuthError> {
    let resp = SignInResponse::deserialize(body).map_err(|e| AuthError::Parse {
        message: e.to_string(),
    })?;

    let expires_in = resp.expires_in.parse().map_err(|_| AuthError::Parse {
        message: format!("invalid expiresIn: {}", resp.expires_in),
    })?;

    Ok(AuthSession {
        uid: resp.local_id,
        email: resp.email.filter(|s| !s.is_empty()),
        display_name: resp.display_name.filter(|s| !s.is_empty()),
        id_token: resp.id_token,
        refresh_token: resp.refresh_token,
        expires_in,
    })
}

/// Maps a `{"error": {"message": ...}}` body to an [`AuthError`].
///
/// Firebase sometimes appends detail after the code, as in
/// `"INVALID_PASSWORD : ..."`, so only the leading token is matched.
fn parse_error(body: &serde_json::Value) -> AuthError {
    let Some(message) = body["error"]["message"].as_str() else {
        return AuthError::Parse {
            message: format!("unexpected error body: {body}"),
        };
    };

    let code = message.split([' ', ':']).next().unwrap_or(message);

    if CREDENTIAL_ERROR_CODES.contains(&code) {
        AuthError::InvalidCredentials {
            code: code.to_string(),
        }
    } else {
        AuthError::Rejected {
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idp_post_body_is_form_encoded() {
        assert_eq!(
            idp_post_body(GOOGLE_PROVIDER_ID, "abc").unwrap(),
            "id_token=abc&providerId=google.com"
        );
        assert_eq!(
            idp_post_body(GOOGLE_PROVIDER_ID, "a&b=c d").unwrap(),
            "id_token=a%26b%3Dc+d&providerId=google.com"
        );
    }

    #[test]
    fn parses_password_session() {
        let body = serde_json::json!({
            "kind": "identitytoolkit#VerifyPasswordResponse",
            "localId": "uid-123",
            "email": "officer@example.org",
            "displayName": "",
            "idToken": "id-tok",
            "registered": true,
            "refreshToken": "refresh-tok",
            "expiresIn": "3600"
        });
        let session = parse_session(&body).unwrap();
        assert_eq!(session.uid, "uid-123");
        assert_eq!(session.email.as_deref(), Some("officer@example.org"));
        assert_eq!(session.display_name, None);
        assert_eq!(session.expires_in, 3600);
    }

    #[test]
    fn missing_token_is_parse_error() {
        let body = serde_json::json!({"localId": "uid", "expiresIn": "3600"});
        assert!(matches!(parse_session(&body), Err(AuthError::Parse { .. })));
    }

    #[test]
    fn credential_codes_are_invalid_credentials() {
        let body = serde_json::json!({
            "error": {"code": 400, "message": "INVALID_PASSWORD : The password is invalid."}
        });
        assert!(matches!(
            parse_error(&body),
            AuthError::InvalidCredentials { code } if code == "INVALID_PASSWORD"
        ));
    }

    #[test]
    fn other_codes_are_rejections() {
        let body = serde_json::json!({"error": {"code": 400, "message": "OPERATION_NOT_ALLOWED"}});
        assert!(matches!(parse_error(&body), AuthError::Rejected { .. }));
    }

    #[test]
    fn endpoint_carries_api_key() {
        let identity =
            FirebaseIdentity::with_base_url(reqwest::Client::new(), "http://localhost:9099/", "k");
        assert_eq!(
            identity.endpoint("signInWithPassword"),
            "http://localhost:9099/v1/accounts:signInWithPassword?key=k"
        );
    }

    #[tokio::test]
    async fn unreachable_provider_is_http_error() {
        let identity = FirebaseIdentity::with_base_url(reqwest::Client::new(), "http://127.0.0.1:9", "k");
        assert!(matches!(
            identity.sign_in_with_password("a@b.c", "pw").await,
            Err(AuthError::Http(_))
        ));
    }
}
