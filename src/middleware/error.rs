use axum::Json;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::Serialize;

/// Authentication errors for the middleware layer.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AuthError {
    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The provider rejected the authorization attempt (error callback
    /// params, or a state value that does not match the login).
    #[error("authorization failed: {error}: {description}")]
    Protocol { error: String, description: String },

    /// Session cookies exist but do not decode to a token record.
    #[error("corrupt session: {0}")]
    CorruptSession(String),

    /// A server-to-server call to the provider failed.
    #[error("upstream request failed: {0}")]
    Upstream(crate::error::Error),

    /// Bearer request without an `Authorization` header.
    #[error("missing authorization header")]
    MissingAuthorization,

    /// Bearer token inactive, malformed, or otherwise unusable.
    #[error("invalid bearer token")]
    InvalidToken,

    /// Bearer token lacks a required scope.
    #[error("insufficient scope")]
    InsufficientScope,
}

/// Wire shape of bearer-guard rejections (RFC 6750 style).
#[derive(Debug, Serialize)]
pub struct BearerErrorBody {
    pub error: &'static str,
    pub error_description: &'static str,
}

impl AuthError {
    /// HTTP status this error renders as.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Protocol { .. } | Self::MissingAuthorization | Self::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            Self::InsufficientScope => StatusCode::FORBIDDEN,
            Self::Config(_) | Self::CorruptSession(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Error code and fixed description for bearer rejections, `None` for
    /// everything that is not a bearer-guard outcome.
    #[must_use]
    pub const fn bearer_parts(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::MissingAuthorization => Some((
                "missing_authorization",
                "Missing \"Authorization\" in headers.",
            )),
            Self::InvalidToken => Some((
                "invalid_token",
                "The access token provided is expired, revoked, malformed, \
                 or invalid for other reasons.",
            )),
            Self::InsufficientScope => Some((
                "insufficient_scope",
                "The request requires higher privileges than provided by the access token.",
            )),
            _ => None,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();

        if let Some((error, error_description)) = self.bearer_parts() {
            let body = BearerErrorBody {
                error,
                error_description,
            };
            return (status, Json(body)).into_response();
        }

        match self {
            Self::Protocol { error, description } => {
                let body = format!(
                    "<p>{}: {}</p>",
                    html_escape(&error),
                    html_escape(&description)
                );
                (status, Html(body)).into_response()
            }
            Self::CorruptSession(detail) => {
                tracing::error!(detail = %detail, "session cookies could not be decoded");
                (status, format!("Corrupt session: {detail}")).into_response()
            }
            Self::Upstream(e) => {
                tracing::error!(error = %e, "identity provider request failed");
                (status, "Identity provider request failed").into_response()
            }
            Self::Config(ref msg) => {
                tracing::error!(error = %msg, "auth configuration error");
                (status, "Internal error").into_response()
            }
            // Bearer variants returned above.
            _ => status.into_response(),
        }
    }
}

impl From<crate::error::Error> for AuthError {
    fn from(e: crate::error::Error) -> Self {
        match e {
            crate::error::Error::Config(msg) => Self::Config(msg),
            other => Self::Upstream(other),
        }
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
