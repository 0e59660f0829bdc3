use axum::extract::{FromRef, FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::PrivateCookieJar;
use time::OffsetDateTime;

use super::cookies;
use super::error::AuthError;
use super::state::AuthState;
use crate::client::{TokenSet, UserProfile};

/// The authentication state carried by the browser's session cookies.
///
/// Infallible: anonymous visitors get an empty session. Use
/// [`Authenticated`] instead to require a login.
///
/// ```rust,ignore
/// async fn page(session: AuthSession) -> String {
///     match session.access_token() {
///         Some(_) => "signed in".to_string(),
///         None => "anonymous".to_string(),
///     }
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct AuthSession {
    pub tokens: Option<TokenSet>,
    pub profile: Option<UserProfile>,
}

impl AuthSession {
    /// Whether a token record is present.
    #[must_use]
    pub fn logged_in(&self) -> bool {
        self.tokens.is_some()
    }

    /// The session's access token, when logged in.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.tokens.as_ref().map(|t| t.access_token.as_str())
    }

    /// The session's refresh token, when the provider issued one.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.tokens.as_ref().and_then(|t| t.refresh_token.as_deref())
    }

    pub(super) fn from_jar(jar: &PrivateCookieJar) -> Self {
        let tokens = cookies::get_token(jar).and_then(|raw| serde_json::from_str(&raw).ok());
        let profile = cookies::get_profile(jar).and_then(|raw| serde_json::from_str(&raw).ok());
        Self { tokens, profile }
    }
}

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        let jar = PrivateCookieJar::from_request_parts(parts, &auth_state).await?;
        Ok(Self::from_jar(&jar))
    }
}

/// Require-login extractor: yields the session tokens, or redirects the
/// browser to the login route with the current location as `next`.
///
/// ```rust,ignore
/// async fn protected(user: Authenticated) -> String {
///     format!("hello, {}", user.tokens.access_token)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub tokens: TokenSet,
    /// Userinfo claims captured at login, when enabled.
    pub profile: Option<UserProfile>,
}

/// Rejection for [`Authenticated`]: a redirect into the login flow.
#[derive(Debug)]
pub struct LoginRedirect(String);

impl IntoResponse for LoginRedirect {
    fn into_response(self) -> Response {
        Redirect::to(&self.0).into_response()
    }
}

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = LoginRedirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        let jar = match PrivateCookieJar::from_request_parts(parts, &auth_state).await {
            Ok(jar) => jar,
            Err(never) => match never {},
        };

        let session = AuthSession::from_jar(&jar);
        match session.tokens {
            Some(tokens) => Ok(Self {
                tokens,
                profile: session.profile,
            }),
            None => {
                let here = parts
                    .uri
                    .path_and_query()
                    .map_or_else(|| parts.uri.path().to_string(), |pq| pq.as_str().to_string());
                Err(LoginRedirect(format!(
                    "{}?next={}",
                    auth_state.login_path(),
                    urlencoding::encode(&here)
                )))
            }
        }
    }
}

/// Outcome of inspecting the session's token record.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum ExpiryCheck {
    /// No session, or a token that is fresh beyond the skew window.
    Fresh,
    /// Expired (or expiring within the clock-skew allowance).
    Expired,
    /// Cookie present but not a usable token record.
    Corrupt(String),
}

/// Decide expiry from the raw token cookie.
///
/// A token counts as expired once `now + clock_skew` reaches `expires_at`.
/// A record that does not decode, or decodes without `expires_at`, is
/// corrupt rather than expired.
pub(super) fn check_expiry(raw_token: Option<&str>, clock_skew: i64, now: i64) -> ExpiryCheck {
    let raw = match raw_token {
        Some(raw) => raw,
        None => return ExpiryCheck::Fresh,
    };
    let tokens: TokenSet = match serde_json::from_str(raw) {
        Ok(tokens) => tokens,
        Err(e) => return ExpiryCheck::Corrupt(e.to_string()),
    };
    let expires_at = match tokens.expires_at {
        Some(expires_at) => expires_at,
        None => return ExpiryCheck::Corrupt("token record has no expires_at".into()),
    };
    if now.saturating_add(clock_skew) >= expires_at {
        ExpiryCheck::Expired
    } else {
        ExpiryCheck::Fresh
    }
}

/// Layer that sends sessions holding an expired token to logout before the
/// request reaches the app.
///
/// Mount with [`axum::middleware::from_fn_with_state`]. The session is left
/// untouched on expiry — the logout handler is the one place that clears
/// it — so the redirect is observable and repeatable. Undecodable session
/// cookies are scrubbed and reported as a 500 carrying the decode error.
/// In resource-server-only mode the layer passes everything through.
pub async fn enforce_session_expiry(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    request: Request,
    next: Next,
) -> Response {
    if state.settings.resource_server_only {
        return next.run(request).await;
    }
    // Logout must stay reachable or the expiry redirect could never
    // terminate.
    if request.uri().path() == state.logout_path() {
        return next.run(request).await;
    }

    let now = OffsetDateTime::now_utc().unix_timestamp();
    let raw = cookies::get_token(&jar);
    match check_expiry(raw.as_deref(), state.settings.clock_skew, now) {
        ExpiryCheck::Fresh => next.run(request).await,
        ExpiryCheck::Expired => {
            Redirect::to(&format!("{}?reason=expired", state.logout_path())).into_response()
        }
        ExpiryCheck::Corrupt(detail) => {
            let (clear_token, clear_profile) = cookies::clear_session_cookies();
            let jar = jar.remove(clear_token).remove(clear_profile);
            (jar, AuthError::CorruptSession(detail)).into_response()
        }
    }
}
