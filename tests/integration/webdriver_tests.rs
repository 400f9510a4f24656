//! WebDriver client tests against a mock chromedriver

use fare_harvester::driver::{
    Driver, DriverError, DriverSession, ElementRef, FingerprintProfile, Locator, SessionConfig,
    WebDriverClient, ELEMENT_KEY,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn session_config() -> SessionConfig {
    SessionConfig {
        user_agent: "TestAgent/1.0".to_string(),
        headless: true,
        fingerprint: FingerprintProfile::Hardened,
        poll_interval: Duration::from_millis(10),
    }
}

fn ok(value: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "value": value }))
}

fn protocol_error(status: u16, error: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status)
        .set_body_json(json!({ "value": { "error": error, "message": message } }))
}

/// Mounts session creation and the CDP init-script endpoint
async fn mount_session(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/session"))
        .and(body_partial_json(json!({
            "capabilities": { "alwaysMatch": { "browserName": "chrome" } }
        })))
        .respond_with(ok(json!({ "sessionId": "abc", "capabilities": {} })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/session/abc/goog/cdp/execute"))
        .and(body_partial_json(json!({
            "cmd": "Page.addScriptToEvaluateOnNewDocument"
        })))
        .respond_with(ok(json!({})))
        .mount(server)
        .await;
}

async fn open(server: &MockServer) -> Box<dyn DriverSession> {
    let client = WebDriverClient::new(&server.uri()).unwrap();
    client.new_session(&session_config()).await.unwrap()
}

#[tokio::test]
async fn test_session_navigates_and_reads_text() {
    let server = MockServer::start().await;
    mount_session(&server).await;

    Mock::given(method("POST"))
        .and(path("/session/abc/url"))
        .and(body_partial_json(json!({ "url": "https://www.klm.de/" })))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/session/abc/element"))
        .and(body_partial_json(json!({
            "using": "css selector",
            "value": "span.price"
        })))
        .respond_with(ok(json!({ ELEMENT_KEY: "el-1" })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/session/abc/element/el-1/text"))
        .respond_with(ok(json!("89,00 €")))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/session/abc"))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = open(&server).await;
    session.navigate("https://www.klm.de/").await.unwrap();

    let element = session
        .find(&Locator::css("span.price"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(element, ElementRef::new("el-1"));
    assert_eq!(session.read_text(&element).await.unwrap(), "89,00 €");

    session.close().await.unwrap();
    // a second close is a no-op, the DELETE mock expects exactly one call
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_missing_element_is_none() {
    let server = MockServer::start().await;
    mount_session(&server).await;

    Mock::given(method("POST"))
        .and(path("/session/abc/element"))
        .respond_with(protocol_error(404, "no such element", "Unable to locate element"))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/session/abc"))
        .respond_with(ok(json!(null)))
        .mount(&server)
        .await;

    let mut session = open(&server).await;
    let found = session
        .find(&Locator::xpath("//button[@id='accept']"))
        .await
        .unwrap();
    assert!(found.is_none());

    let err = session
        .wait_for(&Locator::css("#missing"), Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(err.is_timeout());

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_protocol_error_is_reported() {
    let server = MockServer::start().await;
    mount_session(&server).await;

    Mock::given(method("POST"))
        .and(path("/session/abc/element/el-9/click"))
        .respond_with(protocol_error(
            400,
            "element click intercepted",
            "Other element would receive the click",
        ))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/session/abc"))
        .respond_with(ok(json!(null)))
        .mount(&server)
        .await;

    let mut session = open(&server).await;
    let err = session.click(&ElementRef::new("el-9")).await.unwrap_err();

    match err {
        DriverError::Protocol { command, error, .. } => {
            assert_eq!(command, "click");
            assert_eq!(error, "element click intercepted");
        }
        other => panic!("unexpected error: {}", other),
    }

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_session_not_created() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(protocol_error(
            500,
            "session not created",
            "Chrome failed to start",
        ))
        .mount(&server)
        .await;

    let client = WebDriverClient::new(&server.uri()).unwrap();
    let result = client.new_session(&session_config()).await;

    assert!(matches!(
        result,
        Err(DriverError::Protocol { ref error, .. }) if error == "session not created"
    ));
}

#[tokio::test]
async fn test_failed_init_script_keeps_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(ok(json!({ "sessionId": "abc", "capabilities": {} })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/session/abc/goog/cdp/execute"))
        .respond_with(protocol_error(404, "unknown command", "cdp unavailable"))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/session/abc"))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    let client = WebDriverClient::new(&server.uri()).unwrap();
    let mut session = client.new_session(&session_config()).await.unwrap();
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_closed_session_rejects_commands() {
    let server = MockServer::start().await;
    mount_session(&server).await;

    Mock::given(method("DELETE"))
        .and(path("/session/abc"))
        .respond_with(ok(json!(null)))
        .mount(&server)
        .await;

    let mut session = open(&server).await;
    session.close().await.unwrap();

    assert!(matches!(
        session.navigate("https://www.qatarairways.com/").await,
        Err(DriverError::SessionClosed)
    ));
}
