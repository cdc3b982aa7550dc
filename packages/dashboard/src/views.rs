//! Top-level screen switching and sign-in.
//!
//! The router holds which screen is showing and nothing else. The role a
//! person signs in as is whatever login tab they used: the identity
//! provider authenticates them but never confirms that role, so it is
//! tracked as an unverified claim.

use alert_sphere_identity::{AuthError, AuthSession, GOOGLE_PROVIDER_ID, IdentityProvider};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::Notice;

/// Notice for a rejected email/password sign-in.
pub const INVALID_CREDENTIALS: &str = "Invalid credentials. Please try again.";

/// Notice for a failed Google sign-in.
pub const GOOGLE_SIGN_IN_FAILED: &str = "Failed to sign in with Google.";

/// A top-level screen.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum View {
    #[default]
    Landing,
    Citizen,
    Authority,
}

/// The role a person claims by choosing a login tab.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    Citizen,
    Authority,
}

impl Role {
    /// Screen shown after signing in with this role.
    #[must_use]
    pub const fn view(self) -> View {
        match self {
            Self::Citizen => View::Citizen,
            Self::Authority => View::Authority,
        }
    }
}

/// How a person proves who they are.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum Credentials {
    /// Email and password.
    #[serde(rename_all = "camelCase")]
    Password { email: String, password: String },
    /// A Google ID token obtained by the client.
    #[serde(rename_all = "camelCase")]
    Google { id_token: String, request_uri: String },
}

/// Authenticates `credentials` with `identity`.
///
/// # Errors
///
/// Returns [`Notice::SignInFailed`] if the provider rejects the attempt
/// or cannot be reached.
pub async fn authenticate(
    identity: &dyn IdentityProvider,
    credentials: &Credentials,
) -> Result<AuthSession, Notice> {
    match credentials {
        Credentials::Password { email, password } => identity
            .sign_in_with_password(email, password)
            .await
            .map_err(|e| sign_in_failed(&e, INVALID_CREDENTIALS)),
        Credentials::Google {
            id_token,
            request_uri,
        } => identity
            .sign_in_with_idp(GOOGLE_PROVIDER_ID, id_token, request_uri)
            .await
            .map_err(|e| sign_in_failed(&e, GOOGLE_SIGN_IN_FAILED)),
    }
}

fn sign_in_failed(error: &AuthError, notice: &'static str) -> Notice {
    log::error!("Sign-in failed: {error}");
    Notice::SignInFailed(notice)
}

/// Which screen is showing, and under which claimed role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewRouter {
    current: View,
    claimed_role: Option<Role>,
}

impl ViewRouter {
    /// Starts on the landing screen.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn current(&self) -> View {
        self.current
    }

    /// Role claimed at sign-in. Not verified by anything.
    #[must_use]
    pub const fn claimed_role(&self) -> Option<Role> {
        self.claimed_role
    }

    /// Signs in and, on success, switches to the role's screen. On
    /// failure the router stays where it was.
    ///
    /// # Errors
    ///
    /// Returns [`Notice::SignInFailed`] if authentication fails.
    pub async fn sign_in(
        &mut self,
        identity: &dyn IdentityProvider,
        role: Role,
        credentials: &Credentials,
    ) -> Result<AuthSession, Notice> {
        let session = authenticate(identity, credentials).await?;
        self.enter(role, &session);
        Ok(session)
    }

    /// Switches to `role`'s screen for an already authenticated session.
    pub fn enter(&mut self, role: Role, session: &AuthSession) {
        log::warn!(
            "User {} entering {} view on an unverified {role} claim",
            session.uid,
            role.view()
        );
        self.claimed_role = Some(role);
        self.current = role.view();
    }

    /// Returns to the landing screen.
    pub fn sign_out(&mut self) {
        self.claimed_role = None;
        self.current = View::Landing;
    }
}
