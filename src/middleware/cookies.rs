use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

/// Session cookie holding the JSON token record.
pub const AUTH_TOKEN_COOKIE: &str = "oidc_auth_token";
/// Session cookie holding the JSON userinfo claims.
pub const AUTH_PROFILE_COOKIE: &str = "oidc_auth_profile";
/// Transient cookie correlating the callback with the login that started it.
pub const LOGIN_STATE_COOKIE: &str = "oidc_auth_state";
/// One-time message cookie set by logout.
pub const FLASH_COOKIE: &str = "oidc_flash";

/// Create a session-lifetime auth cookie (token record or profile).
pub(super) fn session_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

/// Create the short-lived login state cookie for the authorization
/// round-trip. Scoped to the auth route prefix so it travels with
/// `/login` and `/authorize` only.
pub(super) fn login_state_cookie(value: String, secure: bool, path: &str) -> Cookie<'static> {
    Cookie::build((LOGIN_STATE_COOKIE, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(path.to_string())
        .max_age(Duration::minutes(5))
        .build()
}

/// Create removal cookie for the login state.
pub(super) fn clear_login_state_cookie(path: &str) -> Cookie<'static> {
    Cookie::build((LOGIN_STATE_COOKIE, ""))
        .path(path.to_string())
        .max_age(Duration::ZERO)
        .build()
}

/// Create the one-time flash message cookie.
pub(super) fn flash_cookie(message: String, secure: bool) -> Cookie<'static> {
    Cookie::build((FLASH_COOKIE, message))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::minutes(10))
        .build()
}

/// Create removal cookies for the token record and profile.
pub(super) fn clear_session_cookies() -> (Cookie<'static>, Cookie<'static>) {
    let token = Cookie::build((AUTH_TOKEN_COOKIE, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build();

    let profile = Cookie::build((AUTH_PROFILE_COOKIE, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build();

    (token, profile)
}

/// Cookie path covering the auth routes for a given mount prefix.
pub(super) fn auth_cookie_path(route_prefix: &str) -> &str {
    if route_prefix.is_empty() {
        "/"
    } else {
        route_prefix
    }
}

/// Get the raw token record JSON from cookies.
pub(super) fn get_token(jar: &PrivateCookieJar) -> Option<String> {
    jar.get(AUTH_TOKEN_COOKIE).map(|c| c.value().to_string())
}

/// Get the raw profile JSON from cookies.
pub(super) fn get_profile(jar: &PrivateCookieJar) -> Option<String> {
    jar.get(AUTH_PROFILE_COOKIE).map(|c| c.value().to_string())
}

/// Get the raw login state JSON from cookies.
pub(super) fn get_login_state(jar: &PrivateCookieJar) -> Option<String> {
    jar.get(LOGIN_STATE_COOKIE).map(|c| c.value().to_string())
}

/// Read and clear the one-time flash message set by logout.
///
/// Returns the updated jar (hand it back in the response) and the message,
/// when one was pending.
#[must_use]
pub fn take_flash(jar: PrivateCookieJar) -> (PrivateCookieJar, Option<String>) {
    match jar.get(FLASH_COOKIE) {
        Some(cookie) => {
            let message = cookie.value().to_string();
            let removal = Cookie::build((FLASH_COOKIE, ""))
                .path("/")
                .max_age(Duration::ZERO)
                .build();
            (jar.remove(removal), Some(message))
        }
        None => (jar, None),
    }
}
