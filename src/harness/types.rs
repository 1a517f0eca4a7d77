use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::browser::{BrowserSession, SessionError};
use crate::diagnostics::{Diagnostic, Reporter};
use crate::snapshot::{CaptureError, CapturePipeline, CompareError};

/// Everything a check factory may use to build a check
#[derive(Debug, Clone)]
pub struct CheckContext {
    /// Page under test
    pub url: String,

    /// Element capture pipeline for visual checks
    pub capture: CapturePipeline,
}

impl CheckContext {
    pub fn new(url: impl Into<String>, capture: CapturePipeline) -> Self {
        Self {
            url: url.into(),
            capture,
        }
    }

    /// Reject an unusable target URL
    pub fn validated_url(&self) -> Result<String, ConstructionError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ConstructionError::EmptyUrl);
        }
        if !url.contains("://") {
            return Err(ConstructionError::InvalidUrl(url.to_string()));
        }
        Ok(url.to_string())
    }
}

/// One independent validation unit.
///
/// `run` navigates the session itself, reports every violated assertion as
/// an ERROR through `reporter`, and returns `Err` only when it cannot
/// proceed at all (missing container, broken capture, unreadable image).
pub trait Check: Send {
    fn run(
        &mut self,
        session: &mut dyn BrowserSession,
        reporter: &mut Reporter<'_>,
    ) -> Result<(), CheckError>;
}

/// Builds a check for a target; resolved at compile time
pub type CheckFactory = fn(&CheckContext) -> Result<Box<dyn Check>, ConstructionError>;

/// Registered identity and constructor for one check
#[derive(Clone, Copy)]
pub struct CheckDescriptor {
    /// Stable identifier, used in diagnostics and `--only`
    pub id: &'static str,

    /// One-line description shown by `--list`
    pub summary: &'static str,

    pub build: CheckFactory,
}

impl CheckDescriptor {
    pub const fn new(id: &'static str, summary: &'static str, build: CheckFactory) -> Self {
        Self { id, summary, build }
    }
}

impl std::fmt::Debug for CheckDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckDescriptor")
            .field("id", &self.id)
            .field("summary", &self.summary)
            .finish()
    }
}

/// Lifecycle of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckState {
    NotStarted,
    Running,
    Passed,
    Failed,
    ConstructionFailed,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid check state transition: {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: CheckState,
    pub to: CheckState,
}

impl CheckState {
    /// NOT_STARTED -> RUNNING
    pub fn start(self) -> Result<Self, InvalidTransition> {
        self.transition(CheckState::Running, self == CheckState::NotStarted)
    }

    /// RUNNING -> PASSED when no errors were reported, FAILED otherwise
    pub fn finish(self, error_count: usize) -> Result<Self, InvalidTransition> {
        let to = if error_count == 0 {
            CheckState::Passed
        } else {
            CheckState::Failed
        };
        self.transition(to, self == CheckState::Running)
    }

    /// NOT_STARTED -> CONSTRUCTION_FAILED, bypassing RUNNING
    pub fn construction_failed(self) -> Result<Self, InvalidTransition> {
        self.transition(CheckState::ConstructionFailed, self == CheckState::NotStarted)
    }

    pub fn is_terminal(self) -> bool {
        self.outcome().is_some()
    }

    pub fn outcome(self) -> Option<Outcome> {
        match self {
            CheckState::Passed => Some(Outcome::Passed),
            CheckState::Failed => Some(Outcome::Failed),
            CheckState::ConstructionFailed => Some(Outcome::ConstructionFailed),
            CheckState::NotStarted | CheckState::Running => None,
        }
    }

    fn transition(self, to: CheckState, allowed: bool) -> Result<Self, InvalidTransition> {
        if allowed {
            Ok(to)
        } else {
            Err(InvalidTransition { from: self, to })
        }
    }
}

/// Terminal state of a check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Passed,
    Failed,
    ConstructionFailed,
}

/// Recorded result of one descriptor
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// Descriptor identifier
    pub id: String,

    pub outcome: Outcome,

    /// ERROR diagnostics emitted while the check ran
    pub error_count: usize,

    /// Diagnostics emitted while the check ran, in order
    pub diagnostics: Vec<Diagnostic>,

    /// Why the check could not be constructed, if it could not
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,

    pub started_at: DateTime<Utc>,

    pub duration_ms: u64,
}

impl CheckResult {
    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Passed
    }
}

/// Failure that stops a check before it completes
#[derive(Debug, Error)]
pub enum CheckError {
    /// A required element or structure is absent
    #[error("required element missing: {0}")]
    Resource(String),

    #[error(transparent)]
    Session(SessionError),

    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("comparison failed: {0}")]
    Compare(#[from] CompareError),
}

impl From<SessionError> for CheckError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NoSuchElement(locator) => {
                CheckError::Resource(format!("no element matching {}", locator))
            }
            other => CheckError::Session(other),
        }
    }
}

/// A descriptor could not produce a runnable check
#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error("'url' is empty")]
    EmptyUrl,

    #[error("'{0}' is not an absolute URL")]
    InvalidUrl(String),

    /// No browser session could be opened for the check
    #[error("cannot open browser session: {0}")]
    Session(#[from] SessionError),

    #[error("{0}")]
    Other(String),
}
