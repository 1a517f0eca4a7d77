//! In-memory browser session for tests and offline runs.
//!
//! A [`MockPage`] is a tree of [`MockElement`]s with fixed bounding boxes.
//! [`MockSession`] answers locator queries against that tree, renders the
//! viewport with [`Framebuffer`], and records every call in a shared
//! [`CallLog`] so tests can assert on what a check or the capture pipeline
//! actually asked of the browser.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::types::{
    BrowserSession, ElementHandle, Locator, Point, Rect, SessionError, SessionProvider,
    SessionResult, Size,
};
use crate::snapshot::Framebuffer;

const DEFAULT_VIEWPORT: (u32, u32) = (1024, 768);
const PAGE_BACKGROUND: [u8; 3] = [255, 255, 255];
const TEXT_COLOR: [u8; 3] = [0, 0, 0];

/// One node of a mock DOM tree
#[derive(Debug, Clone, Default)]
pub struct MockElement {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub rect: Rect,
    pub fill: Option<[u8; 3]>,
    pub children: Vec<MockElement>,
}

impl MockElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add one or more space-separated classes
    pub fn class(mut self, classes: &str) -> Self {
        self.classes.extend(classes.split_whitespace().map(str::to_string));
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn rect(mut self, x: i64, y: i64, width: i64, height: i64) -> Self {
        self.rect = Rect::new(x, y, width, height);
        self
    }

    /// Paint the element's box with a solid color in viewport captures
    pub fn fill(mut self, color: [u8; 3]) -> Self {
        self.fill = Some(color);
        self
    }

    pub fn child(mut self, child: MockElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = MockElement>) -> Self {
        self.children.extend(children);
        self
    }
}

/// A page: root element plus viewport size
#[derive(Debug, Clone)]
pub struct MockPage {
    pub root: MockElement,
    pub viewport: (u32, u32),
}

impl MockPage {
    pub fn new(root: MockElement) -> Self {
        Self {
            root,
            viewport: DEFAULT_VIEWPORT,
        }
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = (width, height);
        self
    }
}

/// Browser calls observed by a mock session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCall {
    Open,
    Navigate(String),
    FindElement(Locator),
    FindElements(Locator),
    TagName,
    Attribute(String),
    Text,
    Location,
    Size,
    ScrollIntoView,
    SendKeys(String),
    SetZoom(u32),
    CaptureViewport,
    Close,
}

/// Shared, append-only record of session calls
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<SessionCall>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: SessionCall) {
        // A poisoned log only means a panicking check; keep recording.
        let mut calls = self.0.lock().unwrap_or_else(|e| e.into_inner());
        calls.push(call);
    }

    pub fn calls(&self) -> Vec<SessionCall> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn count(&self, predicate: impl Fn(&SessionCall) -> bool) -> usize {
        self.calls().iter().filter(|c| predicate(c)).count()
    }

    pub fn len(&self) -> usize {
        self.calls().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    text: String,
    rect: Rect,
    fill: Option<[u8; 3]>,
    parent: Option<usize>,
}

fn flatten(element: &MockElement, parent: Option<usize>, nodes: &mut Vec<Node>) {
    let index = nodes.len();
    nodes.push(Node {
        tag: element.tag.clone(),
        id: element.id.clone(),
        classes: element.classes.clone(),
        attributes: element.attributes.clone(),
        text: element.text.clone(),
        rect: element.rect,
        fill: element.fill,
        parent,
    });
    for child in &element.children {
        flatten(child, Some(index), nodes);
    }
}

/// Scriptable in-memory [`BrowserSession`]
#[derive(Debug)]
pub struct MockSession {
    nodes: Vec<Node>,
    viewport: (u32, u32),
    log: CallLog,
    current_url: Option<String>,
    zoom_supported: bool,
    /// Pixels added to every location sample, growing per sample
    drift: i64,
    samples: i64,
    closed: bool,
}

impl MockSession {
    pub fn new(page: MockPage) -> Self {
        Self::with_log(page, CallLog::new())
    }

    pub fn with_log(page: MockPage, log: CallLog) -> Self {
        let mut nodes = Vec::new();
        flatten(&page.root, None, &mut nodes);
        Self {
            nodes,
            viewport: page.viewport,
            log,
            current_url: None,
            zoom_supported: true,
            drift: 0,
            samples: 0,
            closed: false,
        }
    }

    pub fn call_log(&self) -> CallLog {
        self.log.clone()
    }

    /// Make `set_page_zoom` report `Unsupported`
    pub fn without_zoom(mut self) -> Self {
        self.zoom_supported = false;
        self
    }

    /// Shift element locations by `pixels` more on every sample, so bounds never settle
    pub fn drifting(mut self, pixels: i64) -> Self {
        self.drift = pixels;
        self
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.closed {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }

    fn node(&self, element: &ElementHandle) -> SessionResult<&Node> {
        element
            .id()
            .strip_prefix("node-")
            .and_then(|i| i.parse::<usize>().ok())
            .and_then(|i| self.nodes.get(i))
            .ok_or_else(|| SessionError::StaleElement(element.id().to_string()))
    }

    fn index_of(&self, element: &ElementHandle) -> SessionResult<usize> {
        self.node(element)?;
        element
            .id()
            .trim_start_matches("node-")
            .parse()
            .map_err(|_| SessionError::StaleElement(element.id().to_string()))
    }

    fn is_descendant(&self, mut index: usize, ancestor: usize) -> bool {
        while let Some(parent) = self.nodes[index].parent {
            if parent == ancestor {
                return true;
            }
            index = parent;
        }
        false
    }

    fn matches(node: &Node, locator: &Locator) -> bool {
        match locator {
            Locator::TagName(name) => node.tag.eq_ignore_ascii_case(name),
            Locator::ClassName(name) => node.classes.iter().any(|c| c == name),
        }
    }

    fn search(
        &self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
    ) -> SessionResult<Vec<ElementHandle>> {
        let scope = scope.map(|s| self.index_of(s)).transpose()?;
        Ok(self
            .nodes
            .iter()
            .enumerate()
            .filter(|(i, node)| {
                let in_scope = scope.map_or(true, |ancestor| self.is_descendant(*i, ancestor));
                in_scope && Self::matches(node, locator)
            })
            .map(|(i, _)| ElementHandle::new(format!("node-{}", i)))
            .collect())
    }

    fn rendered_text(&self, index: usize) -> String {
        let mut parts = Vec::new();
        if !self.nodes[index].text.is_empty() {
            parts.push(self.nodes[index].text.clone());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if node.parent == Some(index) {
                let child = self.rendered_text(i);
                if !child.is_empty() {
                    parts.push(child);
                }
            }
        }
        parts.join(" ")
    }

    fn render(&self) -> SessionResult<Vec<u8>> {
        let (width, height) = self.viewport;
        let mut fb = Framebuffer::with_color(width, height, PAGE_BACKGROUND);
        for node in &self.nodes {
            let rect = node.rect;
            if let Some(color) = node.fill {
                fb.draw_rect(rect.x, rect.y, rect.width, rect.height, color);
            }
            if !node.text.is_empty() {
                let bg = node.fill.unwrap_or(PAGE_BACKGROUND);
                fb.draw_text(rect.x + 2, rect.y + 2, &node.text, TEXT_COLOR, bg);
            }
        }
        fb.to_png()
            .map_err(|e| SessionError::WebDriver(format!("mock render failed: {}", e)))
    }
}

impl BrowserSession for MockSession {
    fn navigate(&mut self, url: &str) -> SessionResult<()> {
        self.ensure_open()?;
        self.log.record(SessionCall::Navigate(url.to_string()));
        if url.is_empty() {
            return Err(SessionError::WebDriver("invalid argument: empty url".to_string()));
        }
        self.current_url = Some(url.to_string());
        Ok(())
    }

    fn find_element(
        &mut self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
    ) -> SessionResult<ElementHandle> {
        self.ensure_open()?;
        self.log.record(SessionCall::FindElement(locator.clone()));
        self.search(scope, locator)?
            .into_iter()
            .next()
            .ok_or_else(|| SessionError::NoSuchElement(locator.clone()))
    }

    fn find_elements(
        &mut self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
    ) -> SessionResult<Vec<ElementHandle>> {
        self.ensure_open()?;
        self.log.record(SessionCall::FindElements(locator.clone()));
        self.search(scope, locator)
    }

    fn tag_name(&mut self, element: &ElementHandle) -> SessionResult<String> {
        self.ensure_open()?;
        self.log.record(SessionCall::TagName);
        Ok(self.node(element)?.tag.clone())
    }

    fn attribute(&mut self, element: &ElementHandle, name: &str) -> SessionResult<Option<String>> {
        self.ensure_open()?;
        self.log.record(SessionCall::Attribute(name.to_string()));
        let node = self.node(element)?;
        Ok(match name {
            "id" => node.id.clone(),
            "class" if !node.classes.is_empty() => Some(node.classes.join(" ")),
            "class" => None,
            other => node.attributes.get(other).cloned(),
        })
    }

    fn text(&mut self, element: &ElementHandle) -> SessionResult<String> {
        self.ensure_open()?;
        self.log.record(SessionCall::Text);
        let index = self.index_of(element)?;
        Ok(self.rendered_text(index))
    }

    fn location(&mut self, element: &ElementHandle) -> SessionResult<Point> {
        self.ensure_open()?;
        self.log.record(SessionCall::Location);
        let rect = self.node(element)?.rect;
        self.samples += 1;
        let shift = self.drift * self.samples;
        Ok(Point {
            x: rect.x + shift,
            y: rect.y,
        })
    }

    fn size(&mut self, element: &ElementHandle) -> SessionResult<Size> {
        self.ensure_open()?;
        self.log.record(SessionCall::Size);
        Ok(self.node(element)?.rect.size())
    }

    fn scroll_into_view(&mut self, element: &ElementHandle) -> SessionResult<()> {
        self.ensure_open()?;
        self.log.record(SessionCall::ScrollIntoView);
        self.node(element)?;
        Ok(())
    }

    fn send_keys(&mut self, element: &ElementHandle, keys: &str) -> SessionResult<()> {
        self.ensure_open()?;
        self.log.record(SessionCall::SendKeys(keys.to_string()));
        self.node(element)?;
        Ok(())
    }

    fn set_page_zoom(&mut self, percent: u32) -> SessionResult<()> {
        self.ensure_open()?;
        self.log.record(SessionCall::SetZoom(percent));
        if self.zoom_supported {
            Ok(())
        } else {
            Err(SessionError::Unsupported("page zoom".to_string()))
        }
    }

    fn capture_viewport(&mut self) -> SessionResult<Vec<u8>> {
        self.ensure_open()?;
        self.log.record(SessionCall::CaptureViewport);
        self.render()
    }

    fn close(&mut self) -> SessionResult<()> {
        if !self.closed {
            self.log.record(SessionCall::Close);
            self.closed = true;
        }
        Ok(())
    }
}

/// Hands out a fresh [`MockSession`] over the same page for every check
#[derive(Debug, Clone)]
pub struct MockProvider {
    page: MockPage,
    log: CallLog,
    unavailable: Option<String>,
}

impl MockProvider {
    pub fn new(page: MockPage) -> Self {
        Self {
            page,
            log: CallLog::new(),
            unavailable: None,
        }
    }

    /// Fail every `open` with `SessionError::Unavailable`
    pub fn unavailable(mut self, reason: impl Into<String>) -> Self {
        self.unavailable = Some(reason.into());
        self
    }

    /// Log shared by every session this provider opens
    pub fn call_log(&self) -> CallLog {
        self.log.clone()
    }
}

impl SessionProvider for MockProvider {
    fn open(&self) -> SessionResult<Box<dyn BrowserSession>> {
        if let Some(reason) = &self.unavailable {
            return Err(SessionError::Unavailable(reason.clone()));
        }
        self.log.record(SessionCall::Open);
        Ok(Box::new(MockSession::with_log(self.page.clone(), self.log.clone())))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> MockPage {
        MockPage::new(
            MockElement::new("html").rect(0, 0, 200, 100).child(
                MockElement::new("div")
                    .class("large-2 columns")
                    .rect(0, 0, 50, 100)
                    .child(MockElement::new("a").class("button").text("foo").rect(0, 0, 40, 10))
                    .child(MockElement::new("a").class("button alert").text("bar").rect(0, 20, 40, 10)),
            ),
        )
        .viewport(200, 100)
    }

    #[test]
    fn test_find_elements_scoped() {
        let mut session = MockSession::new(page());
        let column = session.find_element(None, &Locator::class("large-2")).unwrap();
        let buttons = session.find_elements(Some(&column), &Locator::class("button")).unwrap();
        let alerts = session.find_elements(Some(&column), &Locator::class("alert")).unwrap();

        assert_eq!(buttons.len(), 2);
        assert_eq!(alerts, vec![buttons[1].clone()]);
        assert_eq!(session.text(&buttons[0]).unwrap(), "foo");
    }

    #[test]
    fn test_find_element_missing() {
        let mut session = MockSession::new(page());
        let err = session.find_element(None, &Locator::tag("table")).unwrap_err();
        assert!(matches!(err, SessionError::NoSuchElement(Locator::TagName(_))));
    }

    #[test]
    fn test_class_attribute_joined() {
        let mut session = MockSession::new(page());
        let alert = session.find_element(None, &Locator::class("alert")).unwrap();
        assert_eq!(session.attribute(&alert, "class").unwrap().as_deref(), Some("button alert"));
        assert_eq!(session.attribute(&alert, "id").unwrap(), None);
    }

    #[test]
    fn test_capture_viewport_matches_page_size() {
        let mut session = MockSession::new(page());
        let png = session.capture_viewport().unwrap();
        let fb = Framebuffer::from_png_bytes(&png).unwrap();
        assert_eq!((fb.width(), fb.height()), (200, 100));
    }

    #[test]
    fn test_closed_session_rejects_calls() {
        let mut session = MockSession::new(page());
        session.close().unwrap();
        session.close().unwrap();
        assert!(matches!(session.navigate("https://x.test"), Err(SessionError::Closed)));
        assert_eq!(session.call_log().calls(), vec![SessionCall::Close]);
    }
}
