use axum::Router;
use axum::extract::{Query, RawQuery, State};
use axum::response::Redirect;
use axum::routing::get;
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;

use super::cookies;
use super::error::AuthError;
use super::state::AuthState;

/// Create the authentication router: `{prefix}/login`, `{prefix}/authorize`,
/// `{prefix}/logout` and the legacy callback alias.
///
/// In resource-server-only mode no routes are mounted.
pub fn auth_router(state: &AuthState) -> Router {
    if state.settings.resource_server_only {
        return Router::new();
    }

    Router::new()
        .route(&state.login_path(), get(login))
        .route(&state.authorize_path(), get(authorize))
        .route(&state.logout_path(), get(logout).post(logout))
        .route(&state.settings.legacy_callback_path, get(legacy_callback))
        .with_state(state.clone())
}

// ── Login ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct LoginParams {
    next: Option<String>,
}

/// Round-trip bookkeeping stored in the transient login cookie.
#[derive(Deserialize)]
struct LoginState {
    state: String,
    #[serde(default)]
    next: Option<String>,
}

async fn login(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    Query(params): Query<LoginParams>,
) -> Result<(PrivateCookieJar, Redirect), AuthError> {
    let metadata = state.client.metadata().await?;
    let auth_req = state.client.authorization_url(metadata)?;

    let payload = serde_json::json!({
        "state": auth_req.state,
        "next": params.next,
    })
    .to_string();
    let cookie = cookies::login_state_cookie(
        payload,
        state.settings.secure_cookies,
        cookies::auth_cookie_path(&state.settings.route_prefix),
    );

    Ok((jar.add(cookie), Redirect::to(&auth_req.url)))
}

// ── Authorization callback ─────────────────────────────────────────

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn authorize(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(PrivateCookieJar, Redirect), AuthError> {
    if let Some(error) = params.error {
        let description = params
            .error_description
            .unwrap_or_else(|| "Unknown error".into());
        tracing::warn!(error = %error, description = %description, "provider reported an authorization error");
        return Err(AuthError::Protocol { error, description });
    }

    let received_state = params.state.ok_or_else(state_mismatch)?;
    let stored = cookies::get_login_state(&jar)
        .and_then(|raw| serde_json::from_str::<LoginState>(&raw).ok())
        .ok_or_else(state_mismatch)?;
    if received_state != stored.state {
        tracing::warn!("authorization state mismatch");
        return Err(state_mismatch());
    }

    let code = params.code.ok_or_else(|| AuthError::Protocol {
        error: "invalid_request".into(),
        description: "Missing \"code\" parameter in response.".into(),
    })?;

    let tokens = state.client.exchange_code(&code).await?;

    let mut jar = jar;
    if state.settings.user_info_enabled {
        let profile = state.client.userinfo(&tokens.access_token).await?;
        let profile_json = serde_json::Value::Object(profile).to_string();
        jar = jar.add(cookies::session_cookie(
            cookies::AUTH_PROFILE_COOKIE,
            profile_json,
            state.settings.secure_cookies,
        ));
    }

    let token_json = serde_json::to_string(&tokens)
        .map_err(|e| AuthError::Config(format!("could not serialize token record: {e}")))?;
    jar = jar.add(cookies::session_cookie(
        cookies::AUTH_TOKEN_COOKIE,
        token_json,
        state.settings.secure_cookies,
    ));
    jar = jar.remove(cookies::clear_login_state_cookie(cookies::auth_cookie_path(
        &state.settings.route_prefix,
    )));

    tracing::info!("authorization code exchanged, session established");

    let target = safe_next(stored.next.as_deref()).unwrap_or("/");
    Ok((jar, Redirect::to(target)))
}

// ── Logout ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct LogoutParams {
    reason: Option<String>,
    next: Option<String>,
}

async fn logout(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    Query(params): Query<LogoutParams>,
) -> (PrivateCookieJar, Redirect) {
    let (clear_token, clear_profile) = cookies::clear_session_cookies();
    let jar = jar.remove(clear_token).remove(clear_profile);

    let message = if params.reason.as_deref() == Some("expired") {
        "Your session expired, please reconnect."
    } else {
        "You were successfully logged out."
    };
    let jar = jar.add(cookies::flash_cookie(
        message.into(),
        state.settings.secure_cookies,
    ));

    let target = safe_next(params.next.as_deref()).unwrap_or(&state.settings.post_logout_redirect);
    (jar, Redirect::to(target))
}

// ── Legacy callback ────────────────────────────────────────────────

/// Redirect shim for redirect URIs registered against the old callback
/// path, forwarding the provider's query untouched.
async fn legacy_callback(State(state): State<AuthState>, RawQuery(query): RawQuery) -> Redirect {
    tracing::warn!("the legacy callback path is deprecated, register the authorize route instead");
    let target = match query {
        Some(query) => format!("{}?{}", state.authorize_path(), query),
        None => state.authorize_path(),
    };
    Redirect::to(&target)
}

// ── Helpers ────────────────────────────────────────────────────────

fn state_mismatch() -> AuthError {
    AuthError::Protocol {
        error: "mismatching_state".into(),
        description: "CSRF Warning! State not equal in request and response.".into(),
    }
}

/// Only same-site paths make valid post-login destinations.
fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|path| path.starts_with('/') && !path.starts_with("//"))
}
