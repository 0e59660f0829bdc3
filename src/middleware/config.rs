use axum_extra::extract::cookie::Key;
use url::Url;

use super::error::AuthError;
use crate::client::ClientAuthMethod;
use crate::secrets::ClientSecrets;

/// Environment keys this integration no longer enforces; setting any of
/// them fails configuration so stale deployments surface loudly.
const REMOVED_ENV_KEYS: [&str; 4] = [
    "OIDC_GOOGLE_APPS_DOMAIN",
    "OIDC_REQUIRE_VERIFIED_EMAIL",
    "OIDC_RESOURCE_CHECK_AUD",
    "OIDC_VALID_ISSUERS",
];

/// Environment keys that are deprecated; setting them only warns.
const DEPRECATED_ENV_KEYS: [&str; 8] = [
    "OIDC_ID_TOKEN_COOKIE_NAME",
    "OIDC_ID_TOKEN_COOKIE_PATH",
    "OIDC_ID_TOKEN_COOKIE_TTL",
    "OIDC_COOKIE_SECURE",
    "OIDC_OPENID_REALM",
    "OVERWRITE_REDIRECT_URI",
    "OIDC_CALLBACK_ROUTE",
    "OIDC_USERINFO_URL",
];

/// Shared auth settings used by both config and runtime state.
#[derive(Clone)]
pub(crate) struct AuthSettings {
    pub(crate) cookie_key: Key,
    pub(crate) secure_cookies: bool,
    pub(crate) route_prefix: String,
    pub(crate) legacy_callback_path: String,
    pub(crate) post_logout_redirect: String,
    pub(crate) clock_skew: i64,
    pub(crate) user_info_enabled: bool,
    pub(crate) resource_server_only: bool,
}

impl AuthSettings {
    fn defaults() -> Self {
        Self {
            cookie_key: Key::generate(),
            secure_cookies: true,
            route_prefix: String::new(),
            legacy_callback_path: "/oidc_callback".into(),
            post_logout_redirect: "/".into(),
            clock_skew: 60,
            user_info_enabled: true,
            resource_server_only: false,
        }
    }
}

/// OpenID Connect relying-party configuration.
///
/// Required fields (the client secrets and the callback URI) are constructor
/// parameters — no runtime "missing field" errors.
///
/// Use [`from_env()`](OidcConfig::from_env) for convention-based setup,
/// or [`new()`](OidcConfig::new) with `with_*` methods for full control.
pub struct OidcConfig {
    pub(super) secrets: ClientSecrets,
    pub(super) redirect_uri: Url,
    pub(super) scopes: String,
    pub(super) auth_method: ClientAuthMethod,
    pub(super) http: Option<reqwest::Client>,
    pub(super) settings: AuthSettings,
}

impl OidcConfig {
    /// Create config with the required client secrets and callback URI.
    ///
    /// All optional fields use sensible defaults. Override with `with_*`
    /// methods.
    #[must_use]
    pub fn new(secrets: ClientSecrets, redirect_uri: Url) -> Self {
        Self {
            secrets,
            redirect_uri,
            scopes: "openid profile email".into(),
            auth_method: ClientAuthMethod::default(),
            http: None,
            settings: AuthSettings::defaults(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `OIDC_CLIENT_SECRETS`: path to the client secrets JSON file
    /// - `OIDC_REDIRECT_URI`: absolute URL of the authorization callback
    ///
    /// # Optional env vars
    /// - `OIDC_CLIENT_ID` / `OIDC_CLIENT_SECRET`: override the secrets file
    /// - `OIDC_SCOPES`: space-separated scopes (must include `openid`)
    /// - `OIDC_INTROSPECTION_AUTH_METHOD`: `client_secret_post` (default)
    ///   or `client_secret_basic`, used for token and introspection calls
    /// - `OIDC_CLOCK_SKEW`: expiry leeway in seconds (default 60)
    /// - `OIDC_USER_INFO_ENABLED`: set to `0`/`false` to skip userinfo
    /// - `OIDC_RESOURCE_SERVER_ONLY`: bearer-guard-only mode
    /// - `OIDC_COOKIE_KEY`: cookie encryption key bytes (64 minimum)
    /// - `OIDC_INSECURE_COOKIES`: set to `1`/`true` for plain-HTTP dev setups
    ///
    /// Keys that older deployments used are scanned too: removed ones fail
    /// loudly, deprecated ones log a warning (`OIDC_CALLBACK_ROUTE` is
    /// deprecated but still honored for the legacy callback path).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if required env vars are missing, a
    /// removed key is present, or any value fails to parse.
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AuthError> {
        for key in REMOVED_ENV_KEYS {
            if lookup(key).is_some() {
                return Err(AuthError::Config(format!(
                    "the {key} configuration value is no longer enforced"
                )));
            }
        }
        for key in DEPRECATED_ENV_KEYS {
            if lookup(key).is_some() {
                tracing::warn!(key, "deprecated configuration value is set");
            }
        }

        let secrets_path = lookup("OIDC_CLIENT_SECRETS")
            .ok_or_else(|| AuthError::Config("OIDC_CLIENT_SECRETS is required".into()))?;
        let secrets = ClientSecrets::from_path(&secrets_path)?;

        let redirect_uri_str = lookup("OIDC_REDIRECT_URI")
            .ok_or_else(|| AuthError::Config("OIDC_REDIRECT_URI is required".into()))?;
        let redirect_uri: Url = redirect_uri_str
            .parse()
            .map_err(|e| AuthError::Config(format!("OIDC_REDIRECT_URI: {e}")))?;

        let mut config = Self::new(secrets, redirect_uri);

        if let Some(client_id) = lookup("OIDC_CLIENT_ID") {
            config = config.with_client_id(client_id);
        }
        if let Some(client_secret) = lookup("OIDC_CLIENT_SECRET") {
            config = config.with_client_secret(client_secret);
        }
        if let Some(scopes) = lookup("OIDC_SCOPES") {
            config = config.with_scopes(scopes);
        }
        if let Some(method) = lookup("OIDC_INTROSPECTION_AUTH_METHOD") {
            config = config.with_client_auth_method(method.parse()?);
        }
        if let Some(skew) = lookup("OIDC_CLOCK_SKEW") {
            let seconds: i64 = skew
                .parse()
                .map_err(|e| AuthError::Config(format!("OIDC_CLOCK_SKEW: {e}")))?;
            config = config.with_clock_skew(seconds);
        }
        if let Some(value) = lookup("OIDC_USER_INFO_ENABLED") {
            config = config.with_user_info_enabled(env_flag(&value));
        }
        if let Some(value) = lookup("OIDC_RESOURCE_SERVER_ONLY") {
            config = config.with_resource_server_only(env_flag(&value));
        }
        if let Some(path) = lookup("OIDC_CALLBACK_ROUTE") {
            config = config.with_legacy_callback_path(path);
        }
        if let Some(value) = lookup("OIDC_INSECURE_COOKIES") {
            config = config.with_secure_cookies(!env_flag(&value));
        }
        if let Some(k) = lookup("OIDC_COOKIE_KEY") {
            let key = Key::try_from(k.as_bytes()).map_err(|_| {
                AuthError::Config(
                    "OIDC_COOKIE_KEY is set but invalid (must be at least 64 bytes). \
                     Remove the env var to use an ephemeral key, or provide a valid key."
                        .into(),
                )
            })?;
            config = config.with_cookie_key(key);
        }

        Ok(config)
    }

    /// Override the client ID from the secrets file.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.secrets.client_id = client_id.into();
        self
    }

    /// Override the client secret from the secrets file.
    #[must_use]
    pub fn with_client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.secrets.client_secret = client_secret.into();
        self
    }

    /// Override the requested scopes (default: `openid profile email`).
    /// The value is space-separated and must include `openid`.
    #[must_use]
    pub fn with_scopes(mut self, scopes: impl Into<String>) -> Self {
        self.scopes = scopes.into();
        self
    }

    /// Override how client credentials are sent on token-endpoint and
    /// introspection calls.
    #[must_use]
    pub fn with_client_auth_method(mut self, method: ClientAuthMethod) -> Self {
        self.auth_method = method;
        self
    }

    /// Use a custom HTTP client (for connection pool reuse or timeouts).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = Some(client);
        self
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    /// Mount the auth routes under a path prefix (default: none).
    #[must_use]
    pub fn with_route_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.settings.route_prefix = prefix.into();
        self
    }

    /// Path of the legacy callback alias (default: `/oidc_callback`).
    #[must_use]
    pub fn with_legacy_callback_path(mut self, path: impl Into<String>) -> Self {
        self.settings.legacy_callback_path = path.into();
        self
    }

    /// Where logout sends the browser when no `next` is given (default `/`).
    #[must_use]
    pub fn with_post_logout_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.post_logout_redirect = path.into();
        self
    }

    /// Leeway in seconds when deciding that a session token has expired
    /// (default 60).
    #[must_use]
    pub fn with_clock_skew(mut self, seconds: i64) -> Self {
        self.settings.clock_skew = seconds;
        self
    }

    /// Whether the callback fetches user claims after the code exchange
    /// (default true).
    #[must_use]
    pub fn with_user_info_enabled(mut self, enabled: bool) -> Self {
        self.settings.user_info_enabled = enabled;
        self
    }

    /// Bearer-guard-only mode: no login routes, no session expiry layer.
    #[must_use]
    pub fn with_resource_server_only(mut self, enabled: bool) -> Self {
        self.settings.resource_server_only = enabled;
        self
    }
}

fn env_flag(value: &str) -> bool {
    matches!(value, "1" | "true")
}
