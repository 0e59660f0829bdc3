//! Plug-and-play OpenID Connect authentication middleware for Axum.
//!
//! This module eliminates OAuth2 boilerplate for Axum applications
//! authenticating against any spec-compliant OpenID Connect provider.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use oidc_rp::middleware::{AuthState, Authenticated, OidcConfig, auth_router, enforce_session_expiry};
//!
//! // 1. Configure from environment (client secrets file + redirect URI)
//! let config = OidcConfig::from_env()?;
//! let state = AuthState::new(config)?;
//!
//! // 2. Mount the login/callback/logout routes
//! let app = axum::Router::new()
//!     .route("/", axum::routing::get(index))
//!     .with_state(state.clone())
//!     .merge(auth_router(&state))
//!     .layer(axum::middleware::from_fn_with_state(
//!         state.clone(),
//!         enforce_session_expiry,
//!     ));
//!
//! // 3. Take `Authenticated` in handlers that need a signed-in user
//! async fn index(auth: Authenticated) -> String {
//!     format!("hello, {}", auth.tokens.access_token)
//! }
//! ```

mod config;
mod cookies;
mod error;
mod guard;
mod routes;
mod session;
mod state;

pub use config::OidcConfig;
pub use cookies::{
    AUTH_PROFILE_COOKIE, AUTH_TOKEN_COOKIE, FLASH_COOKIE, LOGIN_STATE_COOKIE, take_flash,
};
pub use error::AuthError;
pub use guard::{CurrentToken, ScopePolicy, enforce_bearer_scopes};
pub use routes::auth_router;
pub use session::{AuthSession, Authenticated, LoginRedirect, enforce_session_expiry};
pub use state::AuthState;

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
