//! Deterministic in-memory driver for tests
//!
//! Test support only; production crawls use [`super::WebDriverClient`].
//! A [`ScriptedDriver`] serves one static page described as a map from
//! locator to [`FakeElement`]. It records navigations, clicks and scripts so
//! adapter flows can be asserted without a browser. All sessions opened from
//! the same driver share the page.

use super::{
    Driver, DriverError, DriverResult, DriverSession, ElementRef, Key, Locator, SessionConfig,
    CLICK_SCRIPT,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// A scripted page element
#[derive(Debug, Clone)]
pub struct FakeElement {
    pub text: String,
    pub value: String,
    pub attributes: HashMap<String, String>,
    pub displayed: bool,
    /// Element disappears once clicked (calendars, dialogs)
    pub hides_on_click: bool,
    /// Value the input holds after the suggestion is confirmed with Enter
    pub commit_value: Option<String>,
    /// First confirmation empties the input instead of committing
    pub reverts_first_fill: bool,
}

impl Default for FakeElement {
    fn default() -> Self {
        Self {
            text: String::new(),
            value: String::new(),
            attributes: HashMap::new(),
            displayed: true,
            hides_on_click: false,
            commit_value: None,
            reverts_first_fill: false,
        }
    }
}

impl FakeElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    pub fn hides_on_click(mut self) -> Self {
        self.hides_on_click = true;
        self
    }

    pub fn commits_as(mut self, value: impl Into<String>) -> Self {
        self.commit_value = Some(value.into());
        self
    }

    pub fn reverts_first_fill(mut self) -> Self {
        self.reverts_first_fill = true;
        self
    }
}

#[derive(Debug, Default)]
struct PageModel {
    elements: HashMap<String, FakeElement>,
    groups: HashMap<String, Vec<String>>,
    navigations: Vec<String>,
    clicks: Vec<String>,
    typed: Vec<(String, String)>,
    scripts: Vec<String>,
    sessions_opened: u32,
    sessions_closed: u32,
    session_failures: u32,
}

/// In-memory driver for adapter and session tests
#[derive(Debug, Clone, Default)]
pub struct ScriptedDriver {
    page: Arc<Mutex<PageModel>>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn page(&self) -> MutexGuard<'_, PageModel> {
        self.page
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Places `element` at `locator`, replacing any previous element
    pub fn set(&self, locator: &Locator, element: FakeElement) -> &Self {
        self.page().elements.insert(locator.key(), element);
        self
    }

    /// Places several elements matched by one locator, in document order
    pub fn set_all(&self, locator: &Locator, elements: Vec<FakeElement>) -> &Self {
        let key = locator.key();
        let mut page = self.page();
        let mut ids = Vec::with_capacity(elements.len());
        for (i, element) in elements.into_iter().enumerate() {
            let id = format!("{}#{}", key, i);
            page.elements.insert(id.clone(), element);
            ids.push(id);
        }
        page.groups.insert(key, ids);
        self
    }

    pub fn remove(&self, locator: &Locator) -> &Self {
        let key = locator.key();
        let mut page = self.page();
        page.elements.remove(&key);
        page.groups.remove(&key);
        self
    }

    /// Makes the next `count` session requests fail
    pub fn fail_next_sessions(&self, count: u32) -> &Self {
        self.page().session_failures = count;
        self
    }

    /// Snapshot of an element's current state
    pub fn element(&self, locator: &Locator) -> Option<FakeElement> {
        self.page().elements.get(&locator.key()).cloned()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.page().navigations.clone()
    }

    /// Element ids clicked, natively or through script, in order
    pub fn clicks(&self) -> Vec<String> {
        self.page().clicks.clone()
    }

    pub fn was_clicked(&self, locator: &Locator) -> bool {
        let key = locator.key();
        self.page()
            .clicks
            .iter()
            .any(|id| *id == key || id.starts_with(&format!("{}#", key)))
    }

    /// `(element id, text)` pairs passed to `send_keys`
    pub fn typed(&self) -> Vec<(String, String)> {
        self.page().typed.clone()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.page().scripts.clone()
    }

    pub fn sessions_opened(&self) -> u32 {
        self.page().sessions_opened
    }

    pub fn sessions_closed(&self) -> u32 {
        self.page().sessions_closed
    }
}

#[async_trait]
impl Driver for ScriptedDriver {
    async fn new_session(&self, _config: &SessionConfig) -> DriverResult<Box<dyn DriverSession>> {
        let mut page = self.page();
        if page.session_failures > 0 {
            page.session_failures -= 1;
            return Err(DriverError::UnexpectedResponse(
                "session not created".to_string(),
            ));
        }
        page.sessions_opened += 1;
        drop(page);

        Ok(Box::new(ScriptedSession {
            page: Arc::clone(&self.page),
            closed: false,
        }))
    }
}

struct ScriptedSession {
    page: Arc<Mutex<PageModel>>,
    closed: bool,
}

fn stale(command: &str, id: &str) -> DriverError {
    DriverError::Protocol {
        command: command.to_string(),
        error: "stale element reference".to_string(),
        message: id.to_string(),
    }
}

impl ScriptedSession {
    fn page(&self) -> DriverResult<MutexGuard<'_, PageModel>> {
        if self.closed {
            return Err(DriverError::SessionClosed);
        }
        Ok(self
            .page
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()))
    }

    fn with_element<T>(
        &self,
        element: &ElementRef,
        command: &str,
        f: impl FnOnce(&mut FakeElement) -> T,
    ) -> DriverResult<T> {
        let mut page = self.page()?;
        page.elements
            .get_mut(element.id())
            .map(f)
            .ok_or_else(|| stale(command, element.id()))
    }

    fn click_id(&self, element: &ElementRef) -> DriverResult<()> {
        self.with_element(element, "click", |el| {
            if el.hides_on_click {
                el.displayed = false;
            }
        })?;
        self.page()?.clicks.push(element.id().to_string());
        Ok(())
    }
}

#[async_trait]
impl DriverSession for ScriptedSession {
    async fn navigate(&self, url: &str) -> DriverResult<()> {
        self.page()?.navigations.push(url.to_string());
        Ok(())
    }

    async fn find(&self, locator: &Locator) -> DriverResult<Option<ElementRef>> {
        let page = self.page()?;
        let key = locator.key();
        if page.elements.contains_key(&key) {
            return Ok(Some(ElementRef::new(key)));
        }
        Ok(page
            .groups
            .get(&key)
            .and_then(|ids| ids.first())
            .map(ElementRef::new))
    }

    async fn find_all(&self, locator: &Locator) -> DriverResult<Vec<ElementRef>> {
        let page = self.page()?;
        let key = locator.key();
        if let Some(ids) = page.groups.get(&key) {
            return Ok(ids.iter().map(ElementRef::new).collect());
        }
        Ok(page
            .elements
            .contains_key(&key)
            .then(|| ElementRef::new(key))
            .into_iter()
            .collect())
    }

    async fn click(&self, element: &ElementRef) -> DriverResult<()> {
        self.click_id(element)
    }

    async fn clear(&self, element: &ElementRef) -> DriverResult<()> {
        self.with_element(element, "clear", |el| el.value.clear())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> DriverResult<()> {
        self.with_element(element, "send keys", |el| {
            for c in text.chars() {
                match Key::from_code_point(c) {
                    Some(Key::Enter) => {
                        if el.reverts_first_fill {
                            el.reverts_first_fill = false;
                            el.value.clear();
                        } else if let Some(committed) = &el.commit_value {
                            el.value = committed.clone();
                        }
                    }
                    Some(_) => {}
                    None => el.value.push(c),
                }
            }
        })?;
        self.page()?
            .typed
            .push((element.id().to_string(), text.to_string()));
        Ok(())
    }

    async fn read_text(&self, element: &ElementRef) -> DriverResult<String> {
        self.with_element(element, "element text", |el| el.text.clone())
    }

    async fn read_value(&self, element: &ElementRef) -> DriverResult<String> {
        self.with_element(element, "element value", |el| el.value.clone())
    }

    async fn read_attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> DriverResult<Option<String>> {
        self.with_element(element, "element attribute", |el| {
            el.attributes.get(name).cloned()
        })
    }

    async fn is_displayed(&self, element: &ElementRef) -> DriverResult<bool> {
        self.with_element(element, "element displayed", |el| el.displayed)
    }

    async fn execute_script(&self, script: &str, args: Vec<Value>) -> DriverResult<Value> {
        self.page()?.scripts.push(script.to_string());
        if script == CLICK_SCRIPT {
            if let Some(element) = args.first().and_then(ElementRef::from_json) {
                self.click_id(&element)?;
            }
        }
        Ok(Value::Null)
    }

    async fn close(&mut self) -> DriverResult<()> {
        if self.closed {
            return Ok(());
        }
        self.page()?.sessions_closed += 1;
        self.closed = true;
        Ok(())
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(1)
    }
}
