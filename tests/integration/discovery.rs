//! Discovery-document lifecycle: fetched once per client on success,
//! fetched again after a failed attempt.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use oidc_rp::{ClientSecrets, OidcClient};

fn test_client(issuer: &str) -> OidcClient {
    let secrets = ClientSecrets::from_value(serde_json::json!({
        "web": {
            "client_id": "MyClient",
            "client_secret": "MySecret",
            "issuer": issuer,
        }
    }))
    .expect("fixture secrets");

    OidcClient::new(secrets, "http://localhost/authorize".parse().expect("fixture uri"))
        .expect("fixture client")
}

fn discovery_document(uri: &str) -> serde_json::Value {
    serde_json::json!({
        "issuer": uri,
        "authorization_endpoint": format!("{uri}/Authorization"),
        "token_endpoint": format!("{uri}/Token"),
    })
}

#[tokio::test]
async fn test_metadata_is_fetched_once_and_cached() {
    let server = MockServer::start().await;
    let uri = server.uri();
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(discovery_document(&uri)))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&uri);
    let metadata = client.metadata().await.expect("first fetch");
    assert_eq!(metadata.token_endpoint, format!("{uri}/Token"));

    // answered from the cache; the mock verifies the single hit on drop
    client.metadata().await.expect("cached fetch");
}

#[tokio::test]
async fn test_failed_discovery_is_not_cached() {
    let server = MockServer::start().await;
    let uri = server.uri();
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(discovery_document(&uri)))
        .mount(&server)
        .await;

    let client = test_client(&uri);
    let err = client.metadata().await.err().unwrap();
    assert!(err.to_string().contains("provider discovery failed"), "{err}");

    let metadata = client.metadata().await.expect("retried fetch");
    assert_eq!(metadata.token_endpoint, format!("{uri}/Token"));
}
