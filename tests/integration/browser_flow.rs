//! Browser-session scenarios: login round-trip, callback error handling,
//! logout, session expiry and the legacy callback alias.

use std::collections::HashMap;

use axum::http::StatusCode;

use oidc_rp::middleware::{AUTH_PROFILE_COOKIE, AUTH_TOKEN_COOKIE, LOGIN_STATE_COOKIE};

use crate::common::*;

#[tokio::test]
async fn test_signin_round_trip() {
    let idp = TestIdp::start().await;
    idp.mount_token_strict().await;
    idp.mount_userinfo().await;

    let state = test_state(test_config(&idp));
    let mut client = TestClient::new(test_app(&state));

    // anonymous hit bounces into the login flow with the origin as next
    let response = client.get("/at").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?next=%2Fat");

    // login redirects to the provider's authorization endpoint
    let response = client.get("/login?next=%2Fat").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let auth_url = location(&response);
    assert!(
        auth_url.starts_with(&format!("{}/Authorization?", idp.uri())),
        "unexpected authorization URL: {auth_url}"
    );
    let parsed: url::Url = auth_url.parse().unwrap();
    let pairs: HashMap<String, String> = parsed.query_pairs().into_owned().collect();
    assert_eq!(pairs.get("response_type").map(String::as_str), Some("code"));
    assert_eq!(pairs.get("client_id").map(String::as_str), Some("MyClient"));
    assert_eq!(
        pairs.get("redirect_uri").map(String::as_str),
        Some("http://localhost/authorize")
    );
    assert_eq!(
        pairs.get("scope").map(String::as_str),
        Some("openid profile email")
    );
    let state_param = pairs.get("state").expect("state parameter").clone();
    assert!(client.has_cookie(LOGIN_STATE_COOKIE));

    // provider calls back; the code is exchanged and the session established
    let response = client
        .get(&format!("/authorize?code=dummy_code&state={state_param}"))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/at");
    assert!(client.has_cookie(AUTH_TOKEN_COOKIE));
    assert!(client.has_cookie(AUTH_PROFILE_COOKIE));
    assert!(!client.has_cookie(LOGIN_STATE_COOKIE));

    let response = client.get("/at").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "dummy_access_token");

    let response = client.get("/rt").await;
    assert_eq!(body_string(response).await, "dummy_refresh_token");

    let response = client.get("/").await;
    assert_eq!(body_string(response).await, "Hello, dummy");
}

#[tokio::test]
async fn test_authorize_error_from_provider() {
    let idp = TestIdp::start().await;
    let state = test_state(test_config(&idp));
    let mut client = TestClient::new(test_app(&state));

    let response = client
        .get("/authorize?error=dummy_error&error_description=Dummy%20Error")
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_string(response).await, "<p>dummy_error: Dummy Error</p>");
}

#[tokio::test]
async fn test_authorize_state_mismatch() {
    let idp = TestIdp::start().await;
    let state = test_state(test_config(&idp));
    let mut client = TestClient::new(test_app(&state));

    let response = client.get("/login").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = client
        .get("/authorize?code=dummy_code&state=not-the-one-we-sent")
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_string(response).await;
    assert!(body.contains("CSRF Warning!"), "{body}");
}

#[tokio::test]
async fn test_authorize_without_pending_login() {
    let idp = TestIdp::start().await;
    let state = test_state(test_config(&idp));
    let mut client = TestClient::new(test_app(&state));

    // no login round-trip, so no transient state cookie to correlate with
    let response = client
        .get("/authorize?code=dummy_code&state=whatever")
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_string(response).await;
    assert!(body.contains("mismatching_state"), "{body}");
}

#[tokio::test]
async fn test_authorize_missing_code() {
    let idp = TestIdp::start().await;
    let state = test_state(test_config(&idp));
    let mut client = TestClient::new(test_app(&state));

    let response = client.get("/login").await;
    let state_param = state_param(&location(&response));

    let response = client.get(&format!("/authorize?state={state_param}")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_string(response).await;
    assert!(body.contains("invalid_request"), "{body}");
    assert!(
        body.contains("Missing &quot;code&quot; parameter in response."),
        "{body}"
    );
}

#[tokio::test]
async fn test_userinfo_disabled() {
    let idp = TestIdp::start().await;
    idp.mount_token().await;
    idp.forbid_userinfo().await;

    let state = test_state(test_config(&idp).with_user_info_enabled(false));
    let mut client = TestClient::new(test_app(&state));

    login(&mut client).await;
    assert!(client.has_cookie(AUTH_TOKEN_COOKIE));
    assert!(!client.has_cookie(AUTH_PROFILE_COOKIE));

    let response = client.get("/").await;
    assert_eq!(body_string(response).await, "Hello, stranger");
}

#[tokio::test]
async fn test_logout_clears_session() {
    let idp = TestIdp::start().await;
    idp.mount_token().await;
    idp.mount_userinfo().await;

    let state = test_state(test_config(&idp));
    let mut client = TestClient::new(test_app(&state));
    login(&mut client).await;

    let response = client.get("/logout").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert!(!client.has_cookie(AUTH_TOKEN_COOKIE));
    assert!(!client.has_cookie(AUTH_PROFILE_COOKIE));

    let response = client.get("/flash").await;
    assert_eq!(
        body_string(response).await,
        "You were successfully logged out."
    );
    // one-time read
    let response = client.get("/flash").await;
    assert_eq!(body_string(response).await, "");

    // back to anonymous
    let response = client.get("/").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?next=%2F");
}

#[tokio::test]
async fn test_logout_expired_reason_message() {
    let idp = TestIdp::start().await;
    let state = test_state(test_config(&idp));
    let mut client = TestClient::new(test_app(&state));

    let response = client.get("/logout?reason=expired").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = client.get("/flash").await;
    assert_eq!(
        body_string(response).await,
        "Your session expired, please reconnect."
    );
}

#[tokio::test]
async fn test_expired_session_redirects_to_logout() {
    let idp = TestIdp::start().await;
    let state = test_state(test_config(&idp));
    let mut client = TestClient::new(test_app(&state));

    client.seed_private_cookie(AUTH_TOKEN_COOKIE, &stored_token_json(unix_now() - 100));
    client.seed_private_cookie(AUTH_PROFILE_COOKIE, r#"{"nickname": "dummy"}"#);

    let response = client.get("/at").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/logout?reason=expired");
    // the redirect itself does not clear the session
    assert!(client.has_cookie(AUTH_TOKEN_COOKIE));
    assert!(client.has_cookie(AUTH_PROFILE_COOKIE));

    // following it does
    let response = client.get("/logout?reason=expired").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(!client.has_cookie(AUTH_TOKEN_COOKIE));
    assert!(!client.has_cookie(AUTH_PROFILE_COOKIE));

    let response = client.get("/flash").await;
    assert_eq!(
        body_string(response).await,
        "Your session expired, please reconnect."
    );
}

#[tokio::test]
async fn test_expiring_within_skew_window_counts_as_expired() {
    let idp = TestIdp::start().await;
    let state = test_state(test_config(&idp));
    let mut client = TestClient::new(test_app(&state));

    // 30 s left on the token, 60 s default skew
    client.seed_private_cookie(AUTH_TOKEN_COOKIE, &stored_token_json(unix_now() + 30));

    let response = client.get("/").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/logout?reason=expired");
}

#[tokio::test]
async fn test_absurd_expires_in_still_establishes_a_fresh_session() {
    let idp = TestIdp::start().await;
    idp.mount_token_with(serde_json::json!({
        "token_type": "Bearer",
        "access_token": "dummy_access_token",
        "expires_in": i64::MAX,
    }))
    .await;
    idp.mount_userinfo().await;

    let state = test_state(test_config(&idp));
    let mut client = TestClient::new(test_app(&state));
    login(&mut client).await;

    // the computed expiry saturates instead of wrapping into the past
    let response = client.get("/at").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "dummy_access_token");
}

#[tokio::test]
async fn test_corrupt_session_scrubbed_with_500() {
    let idp = TestIdp::start().await;
    let state = test_state(test_config(&idp));
    let mut client = TestClient::new(test_app(&state));

    client.seed_private_cookie(AUTH_TOKEN_COOKIE, "\"bad_token\"");
    client.seed_private_cookie(AUTH_PROFILE_COOKIE, r#"{"nickname": "dummy"}"#);

    let response = client.get("/at").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_string(response).await;
    assert!(body.starts_with("Corrupt session: "), "{body}");
    assert!(body.contains("invalid type"), "{body}");

    // both session cookies are gone, so the next hit is anonymous again
    assert!(!client.has_cookie(AUTH_TOKEN_COOKIE));
    assert!(!client.has_cookie(AUTH_PROFILE_COOKIE));
    let response = client.get("/at").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?next=%2Fat");
}

#[tokio::test]
async fn test_legacy_callback_preserves_query() {
    let idp = TestIdp::start().await;
    let state = test_state(test_config(&idp));
    let mut client = TestClient::new(test_app(&state));

    let response = client.get("/oidc_callback?state=abc&code=def").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/authorize?state=abc&code=def");
}

#[tokio::test]
async fn test_offsite_next_falls_back_to_root() {
    let idp = TestIdp::start().await;
    idp.mount_token().await;
    idp.mount_userinfo().await;

    let state = test_state(test_config(&idp));
    let mut client = TestClient::new(test_app(&state));

    let response = client
        .get("/login?next=https%3A%2F%2Fevil.example.com%2F")
        .await;
    let state_param = state_param(&location(&response));

    let response = client
        .get(&format!("/authorize?code=dummy_code&state={state_param}"))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_route_prefix_moves_auth_routes() {
    let idp = TestIdp::start().await;
    let state = test_state(test_config(&idp).with_route_prefix("/auth"));
    let mut client = TestClient::new(test_app(&state));

    let response = client.get("/at").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login?next=%2Fat");

    let response = client.get("/auth/login").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).contains("/Authorization?"));

    let response = client.get("/login").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_resource_server_only_disables_browser_flow() {
    let idp = TestIdp::start().await;
    let state = test_state(test_config(&idp).with_resource_server_only(true));
    let mut client = TestClient::new(test_app(&state));

    let response = client.get("/login").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // the expiry layer stands down as well: an expired session record is
    // simply handed to the app
    client.seed_private_cookie(AUTH_TOKEN_COOKIE, &stored_token_json(unix_now() - 100));
    let response = client.get("/at").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "dummy_access_token");
}
