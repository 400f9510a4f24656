//! W3C WebDriver client
//!
//! This module handles the HTTP side of browser automation:
//! - Creating Chrome sessions with fingerprint switches and capabilities
//! - Element lookup, interaction and property reads
//! - Script execution and CDP init-script installation
//! - Session teardown, including a best-effort teardown on drop

use super::{
    Driver, DriverError, DriverResult, DriverSession, ElementRef, Locator, SessionConfig,
};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::time::Duration;

/// Builds the HTTP client used to reach chromedriver
///
/// Page loads can take a long time on booking sites, so the request timeout
/// is generous; waits for elements are bounded separately by the caller.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .connect_timeout(Duration::from_secs(10))
        .build()
}

/// Sends one WebDriver command and unwraps the `value` envelope
async fn send_command(
    http: &Client,
    method: Method,
    url: &str,
    command: &str,
    body: Option<Value>,
) -> DriverResult<Value> {
    let request = http.request(method.clone(), url);
    let request = match body {
        Some(body) => request.json(&body),
        None if method == Method::POST => request.json(&json!({})),
        None => request,
    };

    let response = request.send().await?;
    let status = response.status();
    let payload: Value = response.json().await?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);

    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return Err(DriverError::Protocol {
            command: command.to_string(),
            error: error.to_string(),
            message: value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        });
    }

    if !status.is_success() {
        return Err(DriverError::UnexpectedResponse(format!(
            "{} returned HTTP {}",
            command, status
        )));
    }

    Ok(value)
}

/// Factory for chromedriver sessions
#[derive(Debug, Clone)]
pub struct WebDriverClient {
    http: Client,
    base_url: String,
}

impl WebDriverClient {
    /// Creates a client for the chromedriver at `endpoint`
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Base URL such as `http://localhost:9515`
    ///
    /// # Returns
    ///
    /// * `Ok(WebDriverClient)` - Endpoint parsed and HTTP client built
    /// * `Err(DriverError)` - Endpoint is not an http(s) URL
    pub fn new(endpoint: &str) -> DriverResult<Self> {
        let parsed = url::Url::parse(endpoint)
            .map_err(|e| DriverError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(DriverError::InvalidEndpoint(endpoint.to_string()));
        }

        Ok(Self {
            http: build_http_client()?,
            base_url: endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn capabilities(config: &SessionConfig) -> Value {
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {
                        "args": config.fingerprint.chrome_args(&config.user_agent, config.headless),
                        "excludeSwitches": ["enable-automation"],
                        "useAutomationExtension": false
                    }
                }
            }
        })
    }
}

#[async_trait]
impl Driver for WebDriverClient {
    async fn new_session(&self, config: &SessionConfig) -> DriverResult<Box<dyn DriverSession>> {
        let url = format!("{}/session", self.base_url);
        let value = send_command(
            &self.http,
            Method::POST,
            &url,
            "new session",
            Some(Self::capabilities(config)),
        )
        .await?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::UnexpectedResponse("missing sessionId".to_string()))?
            .to_string();

        tracing::debug!("Started WebDriver session {}", session_id);

        let session = WebDriverSession {
            http: self.http.clone(),
            session_url: format!("{}/session/{}", self.base_url, session_id),
            closed: false,
            poll_interval: config.poll_interval,
        };

        if let Err(e) = session.install_init_script(&config.fingerprint.init_script()).await {
            tracing::warn!("Failed to install fingerprint script: {}", e);
        }

        Ok(Box::new(session))
    }
}

/// One chromedriver session
#[derive(Debug)]
pub struct WebDriverSession {
    http: Client,
    session_url: String,
    closed: bool,
    poll_interval: Duration,
}

impl WebDriverSession {
    async fn command(
        &self,
        method: Method,
        path: &str,
        command: &str,
        body: Option<Value>,
    ) -> DriverResult<Value> {
        if self.closed {
            return Err(DriverError::SessionClosed);
        }
        let url = format!("{}{}", self.session_url, path);
        send_command(&self.http, method, &url, command, body).await
    }

    async fn element_command(
        &self,
        method: Method,
        element: &ElementRef,
        suffix: &str,
        command: &str,
        body: Option<Value>,
    ) -> DriverResult<Value> {
        let path = format!("/element/{}{}", element.id(), suffix);
        self.command(method, &path, command, body).await
    }

    /// Installs a script evaluated before any page script on new documents
    async fn install_init_script(&self, source: &str) -> DriverResult<()> {
        self.command(
            Method::POST,
            "/goog/cdp/execute",
            "cdp execute",
            Some(json!({
                "cmd": "Page.addScriptToEvaluateOnNewDocument",
                "params": { "source": source }
            })),
        )
        .await
        .map(|_| ())
    }
}

#[async_trait]
impl DriverSession for WebDriverSession {
    async fn navigate(&self, url: &str) -> DriverResult<()> {
        self.command(Method::POST, "/url", "navigate", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    async fn find(&self, locator: &Locator) -> DriverResult<Option<ElementRef>> {
        let body = json!({ "using": locator.strategy.w3c_name(), "value": locator.value });
        match self
            .command(Method::POST, "/element", "find element", Some(body))
            .await
        {
            Ok(value) => ElementRef::from_json(&value)
                .map(Some)
                .ok_or_else(|| DriverError::UnexpectedResponse(value.to_string())),
            Err(DriverError::Protocol { error, .. }) if error == "no such element" => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn find_all(&self, locator: &Locator) -> DriverResult<Vec<ElementRef>> {
        let body = json!({ "using": locator.strategy.w3c_name(), "value": locator.value });
        let value = self
            .command(Method::POST, "/elements", "find elements", Some(body))
            .await?;

        let items = value
            .as_array()
            .ok_or_else(|| DriverError::UnexpectedResponse(value.to_string()))?;
        Ok(items.iter().filter_map(ElementRef::from_json).collect())
    }

    async fn click(&self, element: &ElementRef) -> DriverResult<()> {
        self.element_command(Method::POST, element, "/click", "click", None)
            .await
            .map(|_| ())
    }

    async fn clear(&self, element: &ElementRef) -> DriverResult<()> {
        self.element_command(Method::POST, element, "/clear", "clear", None)
            .await
            .map(|_| ())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> DriverResult<()> {
        self.element_command(
            Method::POST,
            element,
            "/value",
            "send keys",
            Some(json!({ "text": text })),
        )
        .await
        .map(|_| ())
    }

    async fn read_text(&self, element: &ElementRef) -> DriverResult<String> {
        let value = self
            .element_command(Method::GET, element, "/text", "element text", None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn read_value(&self, element: &ElementRef) -> DriverResult<String> {
        let value = self
            .element_command(Method::GET, element, "/property/value", "element value", None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn read_attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> DriverResult<Option<String>> {
        let suffix = format!("/attribute/{}", name);
        let value = self
            .element_command(Method::GET, element, &suffix, "element attribute", None)
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn is_displayed(&self, element: &ElementRef) -> DriverResult<bool> {
        let value = self
            .element_command(Method::GET, element, "/displayed", "element displayed", None)
            .await?;
        value
            .as_bool()
            .ok_or_else(|| DriverError::UnexpectedResponse(value.to_string()))
    }

    async fn execute_script(&self, script: &str, args: Vec<Value>) -> DriverResult<Value> {
        self.command(
            Method::POST,
            "/execute/sync",
            "execute script",
            Some(json!({ "script": script, "args": args })),
        )
        .await
    }

    async fn close(&mut self) -> DriverResult<()> {
        if self.closed {
            return Ok(());
        }
        let result = send_command(
            &self.http,
            Method::DELETE,
            &self.session_url,
            "delete session",
            None,
        )
        .await;
        self.closed = true;
        result.map(|_| ())
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("WebDriver session {} leaked: no runtime", self.session_url);
            return;
        };
        let http = self.http.clone();
        let url = self.session_url.clone();
        handle.spawn(async move {
            if let Err(e) = http.delete(&url).send().await {
                tracing::warn!("Failed to release WebDriver session {}: {}", url, e);
            }
        });
    }
}
