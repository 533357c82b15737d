use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wirepass_provision::{HttpConfig, HttpProvisioner, ProvisionError, Provisioner};
use wirepass_types::ProfileRef;

fn provisioner(server: &MockServer) -> HttpProvisioner {
    HttpProvisioner::new(HttpConfig {
        base_url: server.uri(),
        password: "secret".to_string(),
        timeout_secs: 5,
    })
}

fn client_list(entries: &[(&str, &str)]) -> serde_json::Value {
    json!(entries
        .iter()
        .map(|(id, name)| json!({
            "id": id,
            "name": name,
            "enabled": true,
            "address": "10.8.0.2"
        }))
        .collect::<Vec<_>>())
}

// ── create_profile ───────────────────────────────────────────────

#[tokio::test]
async fn create_profile_creates_then_resolves_by_label() {
    let server = MockServer::start().await;

    // First list: empty. Second list (after create): contains the profile.
    Mock::given(method("GET"))
        .and(path("/wireguard/client/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(client_list(&[])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/wireguard/client/"))
        .and(body_json(json!({ "name": "42:paid" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wireguard/client/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(client_list(&[("other", "7:trial"), ("abc-123", "42:paid")])),
        )
        .mount(&server)
        .await;

    let profile = provisioner(&server).create_profile("42:paid").await.unwrap();
    assert_eq!(profile, ProfileRef::from("abc-123"));
}

#[tokio::test]
async fn create_profile_reuses_existing_label() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wireguard/client/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(client_list(&[("abc-123", "42:paid")])),
        )
        .mount(&server)
        .await;
    // A retry after a partial failure must not create a duplicate.
    Mock::given(method("POST"))
        .and(path("/wireguard/client/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let profile = provisioner(&server).create_profile("42:paid").await.unwrap();
    assert_eq!(profile, ProfileRef::from("abc-123"));
}

#[tokio::test]
async fn create_profile_missing_after_create_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wireguard/client/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(client_list(&[])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/wireguard/client/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let err = provisioner(&server)
        .create_profile("42:paid")
        .await
        .unwrap_err();
    assert!(matches!(err, ProvisionError::ProfileNotFound(_)));
}

// ── fetch_configuration / disable_profile ────────────────────────

#[tokio::test]
async fn fetch_configuration_returns_raw_bytes() {
    let server = MockServer::start().await;
    let artifact = b"[Interface]\nPrivateKey = xyz\n";

    Mock::given(method("GET"))
        .and(path("/wireguard/client/abc-123/configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(artifact.as_slice()))
        .mount(&server)
        .await;

    let bytes = provisioner(&server)
        .fetch_configuration(&ProfileRef::from("abc-123"))
        .await
        .unwrap();
    assert_eq!(bytes, artifact);
}

#[tokio::test]
async fn disable_profile_twice_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wireguard/client/abc-123/disable"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let client = provisioner(&server);
    let profile = ProfileRef::from("abc-123");
    client.disable_profile(&profile).await.unwrap();
    client.disable_profile(&profile).await.unwrap();
}

// ── session handling ─────────────────────────────────────────────

#[tokio::test]
async fn expired_session_triggers_login_and_replay() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wireguard/client/abc-123/disable"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/session"))
        .and(body_json(json!({ "password": "secret" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/wireguard/client/abc-123/disable"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    provisioner(&server)
        .disable_profile(&ProfileRef::from("abc-123"))
        .await
        .unwrap();
}

#[tokio::test]
async fn second_rejection_after_login_is_auth_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/wireguard/client/abc-123/disable"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let err = provisioner(&server)
        .disable_profile(&ProfileRef::from("abc-123"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProvisionError::AuthFailed(_)));
}

#[tokio::test]
async fn rejected_login_is_auth_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wireguard/client/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = provisioner(&server).create_profile("42:paid").await.unwrap_err();
    assert!(matches!(err, ProvisionError::AuthFailed(_)));
}

// ── failure mapping ──────────────────────────────────────────────

#[tokio::test]
async fn server_errors_map_to_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wireguard/client/abc-123/disable"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = provisioner(&server)
        .disable_profile(&ProfileRef::from("abc-123"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProvisionError::Unavailable(_)));
}

#[tokio::test]
async fn malformed_client_list_is_an_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wireguard/client/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "not": "a list" })))
        .mount(&server)
        .await;

    let err = provisioner(&server).create_profile("42:paid").await.unwrap_err();
    assert!(matches!(err, ProvisionError::Api(_)));
}
