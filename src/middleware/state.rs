use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use super::config::{AuthSettings, OidcConfig};
use super::error::AuthError;
use crate::client::OidcClient;

/// Shared state for the auth routes, the expiry layer and the bearer guard.
///
/// Built once at startup from an [`OidcConfig`] and cloned into every
/// handler; all fields are immutable after construction.
#[derive(Clone)]
pub struct AuthState {
    pub(super) client: Arc<OidcClient>,
    pub(super) settings: AuthSettings,
}

impl AuthState {
    /// Validate the configuration and build the shared state.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if the scopes lack `openid`, the clock
    /// skew is negative, a route path does not start with `/`, or the
    /// issuer in the secrets is not an absolute URL.
    pub fn new(config: OidcConfig) -> Result<Self, AuthError> {
        if !config.scopes.split_whitespace().any(|s| s == "openid") {
            return Err(AuthError::Config(
                "the value \"openid\" must be in the scopes".into(),
            ));
        }
        if config.settings.clock_skew < 0 {
            return Err(AuthError::Config("clock skew must not be negative".into()));
        }
        if !config.settings.route_prefix.is_empty()
            && !config.settings.route_prefix.starts_with('/')
        {
            return Err(AuthError::Config(
                "route prefix must start with a slash".into(),
            ));
        }
        if !config.settings.legacy_callback_path.starts_with('/') {
            return Err(AuthError::Config(
                "legacy callback path must start with a slash".into(),
            ));
        }

        let mut client = OidcClient::new(config.secrets, config.redirect_uri)?
            .with_scopes(config.scopes)
            .with_auth_method(config.auth_method);
        if let Some(http) = config.http {
            client = client.with_http_client(http);
        }

        Ok(Self {
            client: Arc::new(client),
            settings: config.settings,
        })
    }

    /// The underlying protocol client, for calls outside the provided
    /// routes (for example refreshing userinfo from an app handler).
    #[must_use]
    pub fn client(&self) -> &OidcClient {
        &self.client
    }

    pub(super) fn login_path(&self) -> String {
        format!("{}/login", self.settings.route_prefix)
    }

    pub(super) fn authorize_path(&self) -> String {
        format!("{}/authorize", self.settings.route_prefix)
    }

    pub(super) fn logout_path(&self) -> String {
        format!("{}/logout", self.settings.route_prefix)
    }
}

// PrivateCookieJar requires Key to be extractable from state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.settings.cookie_key.clone()
    }
}
