//! End-to-end tests driving the auth routes, the session expiry layer and
//! the bearer guard against a wiremock identity provider.


mod bearer_guard;
mod browser_flow;
mod discovery;
