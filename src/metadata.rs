//! OpenID Provider Metadata, as served from
//! `{issuer}/.well-known/openid-configuration` ([OpenID Connect Discovery
//! 1.0], [RFC 8414]), trimmed to the fields a relying party consumes.
//!
//! [OpenID Connect Discovery 1.0]: https://openid.net/specs/openid-connect-discovery-1_0.html
//! [RFC 8414]: https://tools.ietf.org/html/rfc8414

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;

/// Provider endpoints discovered from the issuer.
///
/// Unknown fields are ignored; absent optional endpoints stay `None` and
/// the operations needing them fail with a configuration error when called.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ProviderMetadata {
    /// The issuer identifier this document describes.
    pub issuer: String,

    /// URL of the authorization endpoint.
    pub authorization_endpoint: String,

    /// URL of the token endpoint.
    pub token_endpoint: String,

    /// URL of the `UserInfo` endpoint, when the provider has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userinfo_endpoint: Option<String>,

    /// URL of the RFC 7662 token introspection endpoint, when exposed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introspection_endpoint: Option<String>,

    /// URL of the RP-initiated logout endpoint, when exposed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_session_endpoint: Option<String>,

    /// URL of the JSON Web Key Set document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,
}

/// Build the discovery document URL for an issuer.
///
/// A trailing slash on the issuer is tolerated; the well-known path is
/// appended to the normalized form.
///
/// # Errors
///
/// Returns [`Error::Config`] if the issuer is not an absolute URL.
pub fn metadata_url(issuer: &str) -> Result<Url, Error> {
    let joined = format!(
        "{}/.well-known/openid-configuration",
        issuer.trim_end_matches('/')
    );
    joined
        .parse()
        .map_err(|e| Error::Config(format!("invalid issuer URL {issuer:?}: {e}")))
}
