use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use messaging_cell::{LineClient, MessagingError};
use shared_config::AppConfig;

fn config_with_base(base_url: &str) -> AppConfig {
    AppConfig {
        supabase_url: "http://localhost:54321".to_string(),
        supabase_anon_key: "test-anon-key".to_string(),
        supabase_service_role_key: "test-service-role-key".to_string(),
        supabase_jwt_secret: "test-secret".to_string(),
        line_channel_access_token: "test-line-token".to_string(),
        line_api_base_url: base_url.to_string(),
        line_admin_group_id: "test-admin-group".to_string(),
        payment_webhook_secret: "test-webhook-secret".to_string(),
    }
}

#[tokio::test]
async fn test_client_requires_configuration() {
    let mut config = config_with_base("http://localhost:9090");
    config.line_channel_access_token = String::new();

    let result = LineClient::new(&config);
    assert!(matches!(result, Err(MessagingError::NotConfigured)));
}

#[tokio::test]
async fn test_push_text_sends_bearer_token_and_message() {
    let server = MockServer::start().await;
    let config = config_with_base(&server.uri());

    Mock::given(method("POST"))
        .and(path("/message/push"))
        .and(header("Authorization", "Bearer test-line-token"))
        .and(body_partial_json(json!({
            "to": "U123",
            "messages": [{ "type": "text", "text": "hello" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = LineClient::new(&config).unwrap();
    client.push_text("U123", "hello").await.unwrap();
}

#[tokio::test]
async fn test_push_text_surfaces_api_errors() {
    let server = MockServer::start().await;
    let config = config_with_base(&server.uri());

    Mock::given(method("POST"))
        .and(path("/message/push"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "The user hasn't added the LINE Official Account as a friend"
        })))
        .mount(&server)
        .await;

    let client = LineClient::new(&config).unwrap();
    let result = client.push_text("U123", "hello").await;

    assert!(matches!(result, Err(MessagingError::LineApiError { .. })));
}

#[tokio::test]
async fn test_notify_admin_group_targets_configured_group() {
    let server = MockServer::start().await;
    let config = config_with_base(&server.uri());

    Mock::given(method("POST"))
        .and(path("/message/push"))
        .and(body_partial_json(json!({ "to": "test-admin-group" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = LineClient::new(&config).unwrap();
    client.notify_admin_group("review needed").await.unwrap();
}

#[tokio::test]
async fn test_rich_menu_link_and_unlink() {
    let server = MockServer::start().await;
    let config = config_with_base(&server.uri());

    Mock::given(method("POST"))
        .and(path("/user/U123/richmenu/richmenu-vip"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/user/U123/richmenu"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = LineClient::new(&config).unwrap();
    client.link_rich_menu("U123", "richmenu-vip").await.unwrap();
    client.unlink_rich_menu("U123").await.unwrap();
}
