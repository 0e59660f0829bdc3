use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::OnceCell;
use url::Url;

use crate::error::Error;
use crate::metadata::{self, ProviderMetadata};
use crate::secrets::ClientSecrets;

/// How client credentials accompany token-endpoint and introspection calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientAuthMethod {
    /// Credentials as `client_id`/`client_secret` form fields.
    #[default]
    ClientSecretPost,
    /// Credentials as HTTP Basic authorization.
    ClientSecretBasic,
}

impl ClientAuthMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClientSecretPost => "client_secret_post",
            Self::ClientSecretBasic => "client_secret_basic",
        }
    }
}

impl std::str::FromStr for ClientAuthMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client_secret_post" => Ok(Self::ClientSecretPost),
            "client_secret_basic" => Ok(Self::ClientSecretBasic),
            other => Err(Error::Config(format!(
                "unsupported client auth method {other:?} \
                 (expected client_secret_post or client_secret_basic)"
            ))),
        }
    }
}

/// Token response from the provider's token endpoint.
///
/// Doubles as the session-held token record: `expires_at` is filled in from
/// `expires_in` at exchange time when the provider does not send it, so the
/// stored form always carries an absolute expiry for providers that report
/// token lifetimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Lifetime in seconds, as sent by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    /// Absolute expiry as unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

/// User claims from the `UserInfo` endpoint, kept as free-form JSON since
/// the claim set is provider- and scope-dependent.
pub type UserProfile = serde_json::Map<String, serde_json::Value>;

/// Audience claim: a single string or an array of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    /// Checks whether the audience contains a specific value.
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        match self {
            Self::Single(s) => s == value,
            Self::Multiple(v) => v.iter().any(|s| s == value),
        }
    }
}

/// RFC 7662 introspection response.
///
/// Only `active` is guaranteed; everything else is at the provider's
/// discretion. Claims outside the registered set land in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct IntrospectionResult {
    #[serde(default)]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl IntrospectionResult {
    /// Granted scopes, whitespace-split from the `scope` claim.
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scope.as_deref().unwrap_or("").split_whitespace()
    }

    /// Whether `scope` grants the given scope as an exact token.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes().any(|s| s == scope)
    }
}

/// Authorization URL plus the state value to correlate the callback with.
#[non_exhaustive]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

/// OpenID Connect client for one provider.
///
/// Endpoints are discovered from the issuer's well-known document on first
/// use and cached for the process lifetime; a failed discovery is retried on
/// the next call.
pub struct OidcClient {
    client_id: String,
    client_secret: String,
    redirect_uri: Url,
    scopes: String,
    auth_method: ClientAuthMethod,
    metadata_url: Url,
    metadata: OnceCell<ProviderMetadata>,
    http: reqwest::Client,
}

impl OidcClient {
    /// Create a client from registered credentials and the callback URI.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the issuer in `secrets` is not an
    /// absolute URL.
    pub fn new(secrets: ClientSecrets, redirect_uri: Url) -> Result<Self, Error> {
        let metadata_url = metadata::metadata_url(&secrets.issuer)?;
        Ok(Self {
            client_id: secrets.client_id,
            client_secret: secrets.client_secret,
            redirect_uri,
            scopes: "openid profile email".into(),
            auth_method: ClientAuthMethod::default(),
            metadata_url,
            metadata: OnceCell::new(),
            http: reqwest::Client::new(),
        })
    }

    /// Override the requested scopes (default: `openid profile email`).
    #[must_use]
    pub fn with_scopes(mut self, scopes: impl Into<String>) -> Self {
        self.scopes = scopes.into();
        self
    }

    /// Override how credentials are presented to the provider.
    #[must_use]
    pub fn with_auth_method(mut self, method: ClientAuthMethod) -> Self {
        self.auth_method = method;
        self
    }

    /// Use a custom HTTP client (for connection pool reuse or timeouts).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// OAuth2 client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Registered callback URI.
    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    /// Requested scopes, space-separated.
    #[must_use]
    pub fn scopes(&self) -> &str {
        &self.scopes
    }

    /// Provider metadata, fetched from the issuer on first call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Provider`]
    /// if the discovery document request is rejected. Failures are not
    /// cached.
    pub async fn metadata(&self) -> Result<&ProviderMetadata, Error> {
        self.metadata
            .get_or_try_init(|| self.fetch_metadata())
            .await
    }

    async fn fetch_metadata(&self) -> Result<ProviderMetadata, Error> {
        let response = self.http.get(self.metadata_url.clone()).send().await?;
        let response = Self::ensure_success(response, "provider discovery").await?;
        response.json::<ProviderMetadata>().await.map_err(Into::into)
    }

    /// Build the authorization redirect and a fresh state value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the advertised authorization endpoint
    /// is not a valid URL.
    pub fn authorization_url(
        &self,
        metadata: &ProviderMetadata,
    ) -> Result<AuthorizationRequest, Error> {
        let state = generate_state();

        let mut url: Url = metadata.authorization_endpoint.parse().map_err(|e| {
            Error::Config(format!(
                "provider authorization_endpoint is not a valid URL: {e}"
            ))
        })?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", self.redirect_uri.as_str())
            .append_pair("scope", &self.scopes)
            .append_pair("state", &state);

        Ok(AuthorizationRequest {
            url: url.into(),
            state,
        })
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Provider`]
    /// if the token endpoint rejects the exchange.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenSet, Error> {
        let metadata = self.metadata().await?;

        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];
        let request = self.http.post(metadata.token_endpoint.as_str());
        let request = self.apply_client_auth(request, &mut params);

        let response = request.form(&params).send().await?;
        let response = Self::ensure_success(response, "token exchange").await?;
        let mut tokens = response.json::<TokenSet>().await?;

        if tokens.expires_at.is_none() {
            if let Some(expires_in) = tokens.expires_in {
                let now = OffsetDateTime::now_utc().unix_timestamp();
                tokens.expires_at = Some(now.saturating_add(expires_in));
            }
        }
        Ok(tokens)
    }

    /// Fetch user claims with an access token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the provider advertises no `UserInfo`
    /// endpoint, [`Error::Http`] on network failure, or [`Error::Provider`]
    /// if the request is rejected.
    pub async fn userinfo(&self, access_token: &str) -> Result<UserProfile, Error> {
        let metadata = self.metadata().await?;
        let endpoint = metadata.userinfo_endpoint.as_deref().ok_or_else(|| {
            Error::Config("provider metadata does not advertise a userinfo_endpoint".into())
        })?;

        let response = self
            .http
            .get(endpoint)
            .bearer_auth(access_token)
            .send()
            .await?;
        let response = Self::ensure_success(response, "userinfo request").await?;
        response.json::<UserProfile>().await.map_err(Into::into)
    }

    /// Ask the provider whether a token is active (RFC 7662).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the provider advertises no
    /// introspection endpoint, [`Error::Http`] on network failure, or
    /// [`Error::Provider`] if the request is rejected.
    pub async fn introspect(&self, token: &str) -> Result<IntrospectionResult, Error> {
        let metadata = self.metadata().await?;
        let endpoint = metadata.introspection_endpoint.as_deref().ok_or_else(|| {
            Error::Config("provider metadata does not advertise an introspection_endpoint".into())
        })?;

        let mut params = vec![("token", token)];
        let request = self.http.post(endpoint);
        let request = self.apply_client_auth(request, &mut params);

        let response = request.form(&params).send().await?;
        let response = Self::ensure_success(response, "token introspection").await?;
        response
            .json::<IntrospectionResult>()
            .await
            .map_err(Into::into)
    }

    fn apply_client_auth<'a>(
        &'a self,
        request: reqwest::RequestBuilder,
        params: &mut Vec<(&'static str, &'a str)>,
    ) -> reqwest::RequestBuilder {
        match self.auth_method {
            ClientAuthMethod::ClientSecretPost => {
                params.push(("client_id", self.client_id.as_str()));
                params.push(("client_secret", self.client_secret.as_str()));
                request
            }
            ClientAuthMethod::ClientSecretBasic => {
                request.basic_auth(&self.client_id, Some(&self.client_secret))
            }
        }
    }

    /// Checks HTTP response status; returns the response on success or an error with details.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let detail = response.text().await.unwrap_or_default();
        Err(Error::Provider {
            operation,
            status,
            detail,
        })
    }
}

/// Generates a cryptographically random state parameter for `OAuth2`.
///
/// Returns a 22-character URL-safe string (16 random bytes → base64url).
#[must_use]
pub fn generate_state() -> String {
    let random_bytes: [u8; 16] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}
