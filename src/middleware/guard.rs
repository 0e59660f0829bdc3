use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::error::AuthError;
use super::state::AuthState;
use crate::client::IntrospectionResult;

/// State for the bearer guard: shared auth state plus the scopes a route
/// requires. Every listed scope must be granted, as an exact token of the
/// introspected `scope` claim.
///
/// ```rust,ignore
/// let api = Router::new()
///     .route("/api/hello", get(api_hello))
///     .route_layer(axum::middleware::from_fn_with_state(
///         ScopePolicy::new(state.clone(), ["profile"]),
///         enforce_bearer_scopes,
///     ));
/// ```
#[derive(Clone)]
pub struct ScopePolicy {
    state: AuthState,
    scopes: Arc<[String]>,
}

impl ScopePolicy {
    #[must_use]
    pub fn new<I, S>(state: AuthState, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            state,
            scopes: scopes.into_iter().map(Into::into).collect(),
        }
    }
}

/// The introspection claims of the request's bearer token, inserted by
/// [`enforce_bearer_scopes`] for the duration of the request.
#[derive(Debug, Clone)]
pub struct CurrentToken(pub Arc<IntrospectionResult>);

impl std::ops::Deref for CurrentToken {
    type Target = IntrospectionResult;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CurrentToken
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Self>().cloned().ok_or_else(|| {
            AuthError::Config("CurrentToken extracted outside a bearer-guarded route".into())
        })
    }
}

/// Bearer-token guard for API routes, validated against the provider's
/// introspection endpoint (RFC 7662).
///
/// Rejections are structured JSON: `401 missing_authorization` without an
/// `Authorization` header, `401 invalid_token` for an unusable or inactive
/// token, `403 insufficient_scope` when a required scope is not granted.
/// A provider without an introspection endpoint is a configuration error
/// and fails the request with a 500 rather than a misleading 401.
pub async fn enforce_bearer_scopes(
    State(policy): State<ScopePolicy>,
    mut request: Request,
    next: Next,
) -> Response {
    match introspect_request(&policy, request.headers()).await {
        Ok(info) => {
            request
                .extensions_mut()
                .insert(CurrentToken(Arc::new(info)));
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

async fn introspect_request(
    policy: &ScopePolicy,
    headers: &HeaderMap,
) -> Result<IntrospectionResult, AuthError> {
    let token = bearer_token(headers)?;
    let info = policy.state.client.introspect(token).await?;

    if !info.active {
        return Err(AuthError::InvalidToken);
    }
    for scope in policy.scopes.iter() {
        if !info.has_scope(scope) {
            return Err(AuthError::InsufficientScope);
        }
    }
    Ok(info)
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthorization)?;
    let value = header.to_str().map_err(|_| AuthError::InvalidToken)?;
    let (scheme, token) = value.split_once(' ').ok_or(AuthError::InvalidToken)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidToken);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidToken);
    }
    Ok(token)
}
