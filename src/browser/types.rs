// Core types shared by every browser session implementation

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Structural rule selecting one or more elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locator {
    /// Match elements by tag name (e.g. "table", "canvas")
    TagName(String),
    /// Match elements carrying a CSS class
    ClassName(String),
}

impl Locator {
    /// Locate elements by tag name
    pub fn tag(name: impl Into<String>) -> Self {
        Locator::TagName(name.into())
    }

    /// Locate elements by class name
    pub fn class(name: impl Into<String>) -> Self {
        Locator::ClassName(name.into())
    }

    /// Render the locator as a CSS selector
    pub fn to_css(&self) -> String {
        match self {
            Locator::TagName(name) => name.clone(),
            Locator::ClassName(name) => format!(".{}", name),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::TagName(name) => write!(f, "tag '{}'", name),
            Locator::ClassName(name) => write!(f, "class '{}'", name),
        }
    }
}

/// Opaque reference to an element inside one browser session.
///
/// Two handles compare equal when they refer to the same DOM node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Element position in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

/// Element size in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: i64,
    pub height: i64,
}

/// Bounding box of an element (location + size)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Rect {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_parts(location: Point, size: Size) -> Self {
        Self::new(location.x, location.y, size.width, size.height)
    }

    pub fn location(&self) -> Point {
        Point { x: self.x, y: self.y }
    }

    pub fn size(&self) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// WebDriver key codes (W3C WebDriver, "Keyboard actions")
pub mod keys {
    /// Releases all held modifiers
    pub const NULL: char = '\u{E000}';
    pub const CONTROL: char = '\u{E009}';
    /// Numeric keypad minus
    pub const SUBTRACT: char = '\u{E027}';
    /// Numeric keypad plus
    pub const ADD: char = '\u{E025}';

    /// Press the given keys together, then release all modifiers
    pub fn chord(keys: &[char]) -> String {
        let mut sequence: String = keys.iter().collect();
        sequence.push(NULL);
        sequence
    }
}

/// Result type for browser session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Error types for browser session operations
#[derive(Debug, Error)]
pub enum SessionError {
    /// No element matched the locator
    #[error("no element matching {0}")]
    NoSuchElement(Locator),

    /// The handle does not belong to this session (or the node is gone)
    #[error("stale element reference: {0}")]
    StaleElement(String),

    /// The session cannot perform the requested operation
    #[error("operation not supported by this session: {0}")]
    Unsupported(String),

    /// The browser could not be started or reached
    #[error("browser unavailable: {0}")]
    Unavailable(String),

    /// Protocol or command failure reported by the WebDriver endpoint
    #[error("webdriver error: {0}")]
    WebDriver(String),

    /// The session has already been closed
    #[error("session already closed")]
    Closed,
}

/// Capability set the harness consumes from a browser session.
///
/// All calls block the caller until the browser has answered.
pub trait BrowserSession: Send {
    /// Load the given URL in the current window
    fn navigate(&mut self, url: &str) -> SessionResult<()>;

    /// Find the first element matching `locator`, searching inside `scope`
    /// or the whole document when `scope` is `None`
    fn find_element(
        &mut self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
    ) -> SessionResult<ElementHandle>;

    /// Find every element matching `locator`, in document order
    fn find_elements(
        &mut self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
    ) -> SessionResult<Vec<ElementHandle>>;

    fn tag_name(&mut self, element: &ElementHandle) -> SessionResult<String>;

    fn attribute(&mut self, element: &ElementHandle, name: &str) -> SessionResult<Option<String>>;

    /// Rendered text of the element
    fn text(&mut self, element: &ElementHandle) -> SessionResult<String>;

    /// Top-left corner in viewport coordinates
    fn location(&mut self, element: &ElementHandle) -> SessionResult<Point>;

    fn size(&mut self, element: &ElementHandle) -> SessionResult<Size>;

    fn scroll_into_view(&mut self, element: &ElementHandle) -> SessionResult<()>;

    /// Type a key sequence into the element (see [`keys`])
    fn send_keys(&mut self, element: &ElementHandle, keys: &str) -> SessionResult<()>;

    /// Scale page rendering to `percent`. Returns `Unsupported` where the
    /// browser has no such control.
    fn set_page_zoom(&mut self, percent: u32) -> SessionResult<()>;

    /// PNG screenshot of the current viewport
    fn capture_viewport(&mut self) -> SessionResult<Vec<u8>>;

    /// End the browser session. Closing twice is a no-op.
    fn close(&mut self) -> SessionResult<()>;

    /// Location and size in one call
    fn bounds(&mut self, element: &ElementHandle) -> SessionResult<Rect> {
        let location = self.location(element)?;
        let size = self.size(element)?;
        Ok(Rect::from_parts(location, size))
    }
}

/// Opens a fresh, exclusively owned session for each check
pub trait SessionProvider {
    fn open(&self) -> SessionResult<Box<dyn BrowserSession>>;

    /// Short name used in logs (e.g. "webdriver", "mock")
    fn name(&self) -> &str;
}
