//! Server Startup Tests
//!
//! Tests for application state construction, configuration loading and the
//! public HTTP surface of the router.

mod common;

use axum::{body::Body, http::Request, http::StatusCode};
use serial_test::serial;
use std::fs;
use tempfile::TempDir;
use tower::util::ServiceExt;

use call_gateway::config::{ApiKey, ConfigError};
use call_gateway::{AppState, ServerConfig, StartupError, create_app};
use common::{ScriptedAssistant, TestGateway, test_config};

fn config_with_key() -> ServerConfig {
    ServerConfig {
        openai_api_key: Some(ApiKey::from("sk-test")),
        ..test_config()
    }
}

/// Health check answers without any call traffic
#[tokio::test]
async fn test_health_check() {
    let state = AppState::new(config_with_key()).unwrap();
    let app = create_app(state);

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "OK");
}

/// Security headers are applied to every response
#[tokio::test]
async fn test_security_headers() {
    let state = AppState::new(config_with_key()).unwrap();
    let app = create_app(state);

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
}

/// Unknown paths are not routed to the call handler
#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let gateway = TestGateway::start(test_config(), vec![], ScriptedAssistant::new(vec![])).await;
    let response = reqwest::get(format!("http://{}/realtime", gateway.addr))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

/// A plain GET on the call route is refused without taking a connection slot
#[tokio::test]
async fn test_call_route_requires_websocket_upgrade() {
    let gateway = TestGateway::start(test_config(), vec![], ScriptedAssistant::new(vec![])).await;
    let response = reqwest::get(format!("http://{}/call", gateway.addr))
        .await
        .unwrap();
    assert!(response.status().is_client_error());
    assert_eq!(gateway.state.ws_connection_count(), 0);
}

/// Startup fails early when providers cannot be configured
#[test]
fn test_missing_api_key_fails_startup() {
    let result = AppState::new(test_config());
    assert!(matches!(result, Err(StartupError::Stt(_))));
}

#[test]
fn test_unknown_assistant_provider_fails_startup() {
    let config = ServerConfig {
        assistant_provider: "nonexistent".to_string(),
        ..config_with_key()
    };
    assert!(matches!(
        AppState::new(config),
        Err(StartupError::Assistant(_))
    ));
}

/// YAML configuration is loaded, merged and validated
#[test]
#[serial]
fn test_config_file_loading() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(
        &path,
        r#"
server:
  host: "127.0.0.1"
  port: 4100
openai:
  api_key: "sk-yaml"
call:
  greeting_delay_ms: 250
  speak_first: true
  opening_line: "Thanks for calling, how can I help?"
security:
  max_connections_per_ip: 5
"#,
    )
    .unwrap();

    let config = ServerConfig::from_file(&path).unwrap();
    assert_eq!(config.address(), "127.0.0.1:4100");
    assert_eq!(config.max_connections_per_ip, 5);

    let settings = config.call_settings();
    assert_eq!(settings.greeting_delay.as_millis(), 250);
    assert!(settings.speak_first);
    assert_eq!(
        settings.opening_line.as_deref(),
        Some("Thanks for calling, how can I help?")
    );

    assert!(AppState::new(config).is_ok());
}

#[test]
#[serial]
fn test_invalid_config_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(&path, "call:\n  send_queue_capacity: 0\n").unwrap();

    match ServerConfig::from_file(&path) {
        Err(ConfigError::InvalidValue { name, .. }) => assert_eq!(name, "send_queue_capacity"),
        other => panic!("expected invalid send_queue_capacity, got {other:?}"),
    }
}
