//! Browser driver capability
//!
//! Site adapters only see the [`DriverSession`] trait: navigate, locate,
//! click, type, read. Two implementations are provided:
//! - [`WebDriverClient`] talks the W3C WebDriver protocol to chromedriver
//! - [`ScriptedDriver`] serves a deterministic in-memory page for tests
//!
//! Waits are explicit bounded polls; nothing here blocks without a deadline.

mod fingerprint;
mod scripted;
mod webdriver;

pub use fingerprint::FingerprintProfile;
pub use scripted::{FakeElement, ScriptedDriver};
pub use webdriver::{WebDriverClient, WebDriverSession};

use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// W3C key under which element references are serialized
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Script used to click an element from page context
pub const CLICK_SCRIPT: &str = "arguments[0].click();";

/// Script used to scroll an element to the middle of the viewport
pub const SCROLL_INTO_VIEW_SCRIPT: &str =
    "arguments[0].scrollIntoView({block: 'center', inline: 'nearest'});";

/// Script used to scroll the window vertically
pub const SCROLL_BY_SCRIPT: &str = "window.scrollBy(0, arguments[0]);";

/// Errors raised by driver implementations
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{command} failed with '{error}': {message}")]
    Protocol {
        command: String,
        error: String,
        message: String,
    },

    #[error("Timed out after {timeout:?} waiting for {locator}")]
    Timeout { locator: String, timeout: Duration },

    #[error("Driver session already closed")]
    SessionClosed,

    #[error("Unexpected driver response: {0}")]
    UnexpectedResponse(String),

    #[error("Invalid WebDriver endpoint: {0}")]
    InvalidEndpoint(String),
}

impl DriverError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// True for the W3C `stale element reference` error
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Protocol { error, .. } if error == "stale element reference")
    }
}

/// Result type for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// Locator strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocatorStrategy {
    Css,
    XPath,
}

impl LocatorStrategy {
    /// Name used in W3C `using` fields
    pub fn w3c_name(&self) -> &'static str {
        match self {
            Self::Css => "css selector",
            Self::XPath => "xpath",
        }
    }
}

/// An element locator
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    pub strategy: LocatorStrategy,
    pub value: String,
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            strategy: LocatorStrategy::Css,
            value: selector.into(),
        }
    }

    pub fn xpath(path: impl Into<String>) -> Self {
        Self {
            strategy: LocatorStrategy::XPath,
            value: path.into(),
        }
    }

    /// Stable textual key, e.g. `css:#accept_cookies_btn`
    pub fn key(&self) -> String {
        match self.strategy {
            LocatorStrategy::Css => format!("css:{}", self.value),
            LocatorStrategy::XPath => format!("xpath:{}", self.value),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Opaque handle to an element in the current page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(String);

impl ElementRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }

    /// W3C JSON form, usable as a script argument
    pub fn to_json(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert(ELEMENT_KEY.to_string(), Value::String(self.0.clone()));
        Value::Object(map)
    }

    /// Parses the W3C JSON form
    pub fn from_json(value: &Value) -> Option<Self> {
        value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(Self::new)
    }
}

/// Special keys sent through `send_keys`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    ArrowDown,
    Tab,
    Escape,
}

impl Key {
    /// W3C code point for the key
    pub fn code_point(&self) -> char {
        match self {
            Self::Enter => '\u{E007}',
            Self::ArrowDown => '\u{E015}',
            Self::Tab => '\u{E004}',
            Self::Escape => '\u{E00C}',
        }
    }

    pub fn from_code_point(c: char) -> Option<Self> {
        match c {
            '\u{E007}' => Some(Self::Enter),
            '\u{E015}' => Some(Self::ArrowDown),
            '\u{E004}' => Some(Self::Tab),
            '\u{E00C}' => Some(Self::Escape),
            _ => None,
        }
    }
}

/// Settings applied once when a browser session is created
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub user_agent: String,
    pub headless: bool,
    pub fingerprint: FingerprintProfile,
    pub poll_interval: Duration,
}

/// Factory for browser sessions
#[async_trait]
pub trait Driver: Send + Sync {
    /// Starts a new, isolated browser session
    async fn new_session(&self, config: &SessionConfig) -> DriverResult<Box<dyn DriverSession>>;
}

/// One browser session, exclusively owned by a crawl session
#[async_trait]
pub trait DriverSession: Send + Sync {
    async fn navigate(&self, url: &str) -> DriverResult<()>;

    /// Returns the first element matching `locator`, or `None` if absent
    async fn find(&self, locator: &Locator) -> DriverResult<Option<ElementRef>>;

    /// Returns all elements matching `locator` in document order
    async fn find_all(&self, locator: &Locator) -> DriverResult<Vec<ElementRef>>;

    async fn click(&self, element: &ElementRef) -> DriverResult<()>;

    async fn clear(&self, element: &ElementRef) -> DriverResult<()>;

    /// Types `text`; special keys are encoded with [`Key::code_point`]
    async fn send_keys(&self, element: &ElementRef, text: &str) -> DriverResult<()>;

    async fn read_text(&self, element: &ElementRef) -> DriverResult<String>;

    /// Reads the live `value` property of an input
    async fn read_value(&self, element: &ElementRef) -> DriverResult<String>;

    async fn read_attribute(&self, element: &ElementRef, name: &str)
        -> DriverResult<Option<String>>;

    async fn is_displayed(&self, element: &ElementRef) -> DriverResult<bool>;

    async fn execute_script(&self, script: &str, args: Vec<Value>) -> DriverResult<Value>;

    /// Ends the session; calling it twice is a no-op
    async fn close(&mut self) -> DriverResult<()>;

    /// Interval between polls in bounded waits
    fn poll_interval(&self) -> Duration;

    /// Waits until `locator` is present in the DOM
    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> DriverResult<ElementRef> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(element) = self.find(locator).await? {
                return Ok(element);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(DriverError::Timeout {
                    locator: locator.key(),
                    timeout,
                });
            }
            tokio::time::sleep(self.poll_interval()).await;
        }
    }

    /// Waits until `locator` is present and displayed
    async fn wait_for_visible(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> DriverResult<ElementRef> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(element) = self.find(locator).await? {
                match self.is_displayed(&element).await {
                    Ok(true) => return Ok(element),
                    Ok(false) => {}
                    Err(e) if e.is_stale() => {}
                    Err(e) => return Err(e),
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(DriverError::Timeout {
                    locator: locator.key(),
                    timeout,
                });
            }
            tokio::time::sleep(self.poll_interval()).await;
        }
    }

    /// Waits until `locator` is gone or hidden
    async fn wait_for_absence(&self, locator: &Locator, timeout: Duration) -> DriverResult<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let gone = match self.find(locator).await? {
                None => true,
                Some(element) => match self.is_displayed(&element).await {
                    Ok(displayed) => !displayed,
                    Err(e) if e.is_stale() => true,
                    Err(e) => return Err(e),
                },
            };
            if gone {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(DriverError::Timeout {
                    locator: locator.key(),
                    timeout,
                });
            }
            tokio::time::sleep(self.poll_interval()).await;
        }
    }

    /// Clears an input and types `text`
    async fn set_text(&self, element: &ElementRef, text: &str) -> DriverResult<()> {
        self.clear(element).await?;
        self.send_keys(element, text).await
    }

    async fn press_key(&self, element: &ElementRef, key: Key) -> DriverResult<()> {
        self.send_keys(element, &key.code_point().to_string()).await
    }

    /// Clicks through page script, bypassing overlay interception
    async fn script_click(&self, element: &ElementRef) -> DriverResult<()> {
        self.execute_script(CLICK_SCRIPT, vec![element.to_json()])
            .await
            .map(|_| ())
    }

    async fn scroll_into_view(&self, element: &ElementRef) -> DriverResult<()> {
        self.execute_script(SCROLL_INTO_VIEW_SCRIPT, vec![element.to_json()])
            .await
            .map(|_| ())
    }

    async fn scroll_by(&self, pixels: i64) -> DriverResult<()> {
        self.execute_script(SCROLL_BY_SCRIPT, vec![json!(pixels)])
            .await
            .map(|_| ())
    }
}
