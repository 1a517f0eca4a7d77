//! WebDriver-backed browser session.
//!
//! Wraps an async `fantoccini` client behind the blocking
//! [`BrowserSession`] trait: every call is driven to completion on a shared
//! tokio runtime before it returns.

use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Runtime;

use super::types::{
    BrowserSession, ElementHandle, Locator, Point, Rect, SessionError, SessionProvider,
    SessionResult, Size,
};
use crate::config::DriverSettings;

const SCROLL_INTO_VIEW_SCRIPT: &str = "arguments[0].scrollIntoView(true);";

const ZOOM_SCRIPT: &str = r#"
    if (!document.body || !('zoom' in document.body.style)) { return false; }
    document.body.style.zoom = arguments[0];
    return true;
"#;

/// Viewport-relative box scaled to device pixels, matching screenshot pixels
const VIEWPORT_BOUNDS_SCRIPT: &str = r#"
    const r = arguments[0].getBoundingClientRect();
    const s = window.devicePixelRatio || 1;
    return [r.left * s, r.top * s, r.width * s, r.height * s];
"#;

const CLIENT_RECT_SCRIPT: &str = r#"
    const r = arguments[0].getBoundingClientRect();
    return [r.left, r.top];
"#;

/// Build a multi-threaded runtime for driving WebDriver clients
pub fn webdriver_runtime() -> std::io::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("webdriver")
        .enable_all()
        .build()
}

fn chrome_capabilities(headless: bool) -> serde_json::Map<String, Value> {
    let mut args = vec!["--no-sandbox".to_string()];
    if headless {
        args.push("--headless=new".to_string());
        args.push("--disable-gpu".to_string());
        args.push("--disable-dev-shm-usage".to_string());
    }

    let mut caps = serde_json::Map::new();
    caps.insert("browserName".to_string(), json!("chrome"));
    caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
    caps
}

fn command_error(err: CmdError) -> SessionError {
    SessionError::WebDriver(err.to_string())
}

/// Stable key for an element: its W3C element reference
fn element_key(element: &Element) -> SessionResult<String> {
    let value = serde_json::to_value(element)
        .map_err(|e| SessionError::WebDriver(format!("unserializable element: {}", e)))?;
    Ok(match &value {
        Value::Object(map) => map
            .values()
            .next()
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        other => other.to_string(),
    })
}

fn number_at(values: &[Value], index: usize) -> SessionResult<f64> {
    values
        .get(index)
        .and_then(Value::as_f64)
        .ok_or_else(|| SessionError::WebDriver(format!("script returned no number at {}", index)))
}

/// A live WebDriver session
pub struct WebDriverSession {
    client: Option<Client>,
    runtime: Arc<Runtime>,
    elements: HashMap<String, Element>,
}

impl WebDriverSession {
    /// Open a new browser session on the configured endpoint
    pub fn connect(runtime: Arc<Runtime>, settings: &DriverSettings) -> SessionResult<Self> {
        tracing::debug!(endpoint = %settings.webdriver_url, "connecting to WebDriver");
        let caps = chrome_capabilities(settings.headless);
        let endpoint = settings.webdriver_url.clone();
        let mut builder = ClientBuilder::rustls()
            .map_err(|e| SessionError::Unavailable(format!("tls setup: {}", e)))?;
        let client = runtime
            .block_on(async move { builder.capabilities(caps).connect(&endpoint).await })
            .map_err(|e| SessionError::Unavailable(format!("{}: {}", settings.webdriver_url, e)))?;

        Ok(Self {
            client: Some(client),
            runtime,
            elements: HashMap::new(),
        })
    }

    fn client(&self) -> SessionResult<Client> {
        self.client.clone().ok_or(SessionError::Closed)
    }

    fn element(&self, handle: &ElementHandle) -> SessionResult<Element> {
        self.elements
            .get(handle.id())
            .cloned()
            .ok_or_else(|| SessionError::StaleElement(handle.id().to_string()))
    }

    fn block<T>(&self, fut: impl Future<Output = Result<T, CmdError>>) -> SessionResult<T> {
        self.runtime.block_on(fut).map_err(command_error)
    }

    fn register(&mut self, element: Element) -> SessionResult<ElementHandle> {
        let key = element_key(&element)?;
        self.elements.insert(key.clone(), element);
        Ok(ElementHandle::new(key))
    }

    fn script_numbers(&mut self, script: &str, element: &ElementHandle) -> SessionResult<Vec<Value>> {
        let client = self.client()?;
        let arg = serde_json::to_value(self.element(element)?)
            .map_err(|e| SessionError::WebDriver(e.to_string()))?;
        let value = self.block(async move { client.execute(script, vec![arg]).await })?;
        match value {
            Value::Array(values) => Ok(values),
            other => Err(SessionError::WebDriver(format!("unexpected script result: {}", other))),
        }
    }
}

impl BrowserSession for WebDriverSession {
    fn navigate(&mut self, url: &str) -> SessionResult<()> {
        tracing::info!(%url, "navigating");
        let client = self.client()?;
        self.elements.clear();
        self.block(async move { client.goto(url).await })
    }

    fn find_element(
        &mut self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
    ) -> SessionResult<ElementHandle> {
        let css = locator.to_css();
        let found = match scope {
            Some(parent) => {
                let parent = self.element(parent)?;
                self.runtime
                    .block_on(async { parent.find(fantoccini::Locator::Css(&css)).await })
            }
            None => {
                let client = self.client()?;
                self.runtime
                    .block_on(async { client.find(fantoccini::Locator::Css(&css)).await })
            }
        };
        match found {
            Ok(element) => self.register(element),
            Err(e) if e.is_no_such_element() => Err(SessionError::NoSuchElement(locator.clone())),
            Err(e) => Err(command_error(e)),
        }
    }

    fn find_elements(
        &mut self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
    ) -> SessionResult<Vec<ElementHandle>> {
        let css = locator.to_css();
        let found = match scope {
            Some(parent) => {
                let parent = self.element(parent)?;
                self.block(async { parent.find_all(fantoccini::Locator::Css(&css)).await })?
            }
            None => {
                let client = self.client()?;
                self.block(async { client.find_all(fantoccini::Locator::Css(&css)).await })?
            }
        };
        found.into_iter().map(|e| self.register(e)).collect()
    }

    fn tag_name(&mut self, element: &ElementHandle) -> SessionResult<String> {
        let element = self.element(element)?;
        self.block(async move { element.tag_name().await })
    }

    fn attribute(&mut self, element: &ElementHandle, name: &str) -> SessionResult<Option<String>> {
        let element = self.element(element)?;
        self.block(async move { element.attr(name).await })
    }

    fn text(&mut self, element: &ElementHandle) -> SessionResult<String> {
        let element = self.element(element)?;
        self.block(async move { element.text().await })
    }

    fn location(&mut self, element: &ElementHandle) -> SessionResult<Point> {
        let values = self.script_numbers(CLIENT_RECT_SCRIPT, element)?;
        Ok(Point {
            x: number_at(&values, 0)?.round() as i64,
            y: number_at(&values, 1)?.round() as i64,
        })
    }

    fn size(&mut self, element: &ElementHandle) -> SessionResult<Size> {
        let element = self.element(element)?;
        let (_, _, width, height) = self.block(async move { element.rectangle().await })?;
        Ok(Size {
            width: width.round() as i64,
            height: height.round() as i64,
        })
    }

    fn bounds(&mut self, element: &ElementHandle) -> SessionResult<Rect> {
        let values = self.script_numbers(VIEWPORT_BOUNDS_SCRIPT, element)?;
        Ok(Rect::new(
            number_at(&values, 0)?.round() as i64,
            number_at(&values, 1)?.round() as i64,
            number_at(&values, 2)?.round() as i64,
            number_at(&values, 3)?.round() as i64,
        ))
    }

    fn scroll_into_view(&mut self, element: &ElementHandle) -> SessionResult<()> {
        let client = self.client()?;
        let arg = serde_json::to_value(self.element(element)?)
            .map_err(|e| SessionError::WebDriver(e.to_string()))?;
        self.block(async move { client.execute(SCROLL_INTO_VIEW_SCRIPT, vec![arg]).await })?;
        Ok(())
    }

    fn send_keys(&mut self, element: &ElementHandle, keys: &str) -> SessionResult<()> {
        let element = self.element(element)?;
        self.block(async move { element.send_keys(keys).await })
    }

    fn set_page_zoom(&mut self, percent: u32) -> SessionResult<()> {
        let client = self.client()?;
        let zoom = format!("{}%", percent);
        let applied = self.block(async move { client.execute(ZOOM_SCRIPT, vec![json!(zoom)]).await })?;
        if applied.as_bool().unwrap_or(false) {
            Ok(())
        } else {
            Err(SessionError::Unsupported("CSS zoom on document body".to_string()))
        }
    }

    fn capture_viewport(&mut self) -> SessionResult<Vec<u8>> {
        let client = self.client()?;
        self.block(async move { client.screenshot().await })
    }

    fn close(&mut self) -> SessionResult<()> {
        self.elements.clear();
        match self.client.take() {
            Some(client) => self.block(async move { client.close().await }),
            None => Ok(()),
        }
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        if self.client.is_some() {
            if let Err(e) = self.close() {
                tracing::warn!(error = %e, "failed to end WebDriver session");
            }
        }
    }
}

/// Opens a fresh WebDriver session per check
pub struct WebDriverProvider {
    runtime: Arc<Runtime>,
    settings: DriverSettings,
}

impl WebDriverProvider {
    pub fn new(runtime: Arc<Runtime>, settings: DriverSettings) -> Self {
        Self { runtime, settings }
    }
}

impl SessionProvider for WebDriverProvider {
    fn open(&self) -> SessionResult<Box<dyn BrowserSession>> {
        let session = WebDriverSession::connect(Arc::clone(&self.runtime), &self.settings)?;
        Ok(Box::new(session))
    }

    fn name(&self) -> &str {
        "webdriver"
    }
}
