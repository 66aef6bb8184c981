//! Health, readiness and status endpoint tests.

mod common;

use common::TestApp;

#[tokio::test]
async fn health_check_returns_200() {
    // Arrange
    let app = TestApp::spawn().await;

    // Act
    let response = app
        .client
        .get(app.url("/health"))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "chat-service");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn readiness_check_returns_200() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(app.url("/ready"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn status_reports_environment_and_time() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(app.url("/status"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["env"], "dev");
    let timestamp = body["timestamp"].as_str().expect("timestamp missing");
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
}

#[tokio::test]
async fn root_answers_plain_text() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(app.url("/"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "Backend is running");
}

#[tokio::test]
async fn metrics_endpoint_is_plain_text() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(app.url("/metrics"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    assert!(response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
}

#[tokio::test]
async fn security_headers_are_set() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(app.url("/health"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
}

#[tokio::test]
async fn unavailable_store_reports_unhealthy() {
    let address = common::spawn_server(
        std::sync::Arc::new(common::DownStore),
        std::sync::Arc::new(common::test_responder()),
        chat_service::config::ChatConfig::for_tests(),
    )
    .await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 503);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "unhealthy");
    assert!(!body["error"].as_str().unwrap().contains("connection refused"));

    let response = client
        .get(format!("{}/ready", address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 503);
}
