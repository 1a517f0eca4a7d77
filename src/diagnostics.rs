//! Severity-classified diagnostics with per-check attribution.
//!
//! Checks report through a [`Reporter`], which stamps every message with
//! the identity it was constructed with. Reporters write into a
//! [`DiagnosticSink`]; the runner's sink is a [`CheckRecorder`] over the
//! run-wide [`Channel`], which prints each line, mirrors it to `tracing`
//! and counts errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One emitted message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Identity of the emitting check
    pub check: String,
    pub timestamp: DateTime<Utc>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>, check: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            check: check.into(),
            timestamp: Utc::now(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.check, self.severity, self.message)
    }
}

/// Destination for diagnostics
pub trait DiagnosticSink: Send {
    /// Whether messages of this severity are emitted at all
    fn accepts(&self, severity: Severity) -> bool;

    fn emit(&mut self, diagnostic: Diagnostic);
}

/// Per-check handle for emitting diagnostics
pub struct Reporter<'a> {
    check: String,
    sink: &'a mut dyn DiagnosticSink,
}

impl<'a> Reporter<'a> {
    pub fn new(check: impl Into<String>, sink: &'a mut dyn DiagnosticSink) -> Self {
        Self {
            check: check.into(),
            sink,
        }
    }

    /// Identity stamped on every message
    pub fn check(&self) -> &str {
        &self.check
    }

    /// Format and emit a message. Suppressed severities are never formatted.
    pub fn emit(&mut self, severity: Severity, message: fmt::Arguments<'_>) {
        if !self.sink.accepts(severity) {
            return;
        }
        let diagnostic = Diagnostic::new(severity, message.to_string(), self.check.clone());
        self.sink.emit(diagnostic);
    }

    pub fn debug(&mut self, message: fmt::Arguments<'_>) {
        self.emit(Severity::Debug, message);
    }

    pub fn info(&mut self, message: fmt::Arguments<'_>) {
        self.emit(Severity::Info, message);
    }

    pub fn warning(&mut self, message: fmt::Arguments<'_>) {
        self.emit(Severity::Warning, message);
    }

    pub fn error(&mut self, message: fmt::Arguments<'_>) {
        self.emit(Severity::Error, message);
    }
}

/// Run-wide output: prints diagnostics and keeps the error total
pub struct Channel<W> {
    out: W,
    allow_debug: bool,
    error_count: usize,
}

impl<W: Write> Channel<W> {
    pub fn new(out: W, allow_debug: bool) -> Self {
        Self {
            out,
            allow_debug,
            error_count: 0,
        }
    }

    pub fn allows(&self, severity: Severity) -> bool {
        severity != Severity::Debug || self.allow_debug
    }

    /// Print a diagnostic; ERROR increments the run-wide count once
    pub fn publish(&mut self, diagnostic: &Diagnostic) {
        let _ = writeln!(self.out, "{}", diagnostic);
        let check = diagnostic.check.as_str();
        let message = diagnostic.message.as_str();
        match diagnostic.severity {
            Severity::Debug => tracing::debug!(target: "diagnostics", check, "{}", message),
            Severity::Info => tracing::info!(target: "diagnostics", check, "{}", message),
            Severity::Warning => tracing::warn!(target: "diagnostics", check, "{}", message),
            Severity::Error => tracing::error!(target: "diagnostics", check, "{}", message),
        }
        if diagnostic.severity == Severity::Error {
            self.error_count += 1;
        }
    }

    /// Print a plain line (banners, summary)
    pub fn line(&mut self, text: impl fmt::Display) {
        let _ = writeln!(self.out, "{}", text);
    }

    pub fn flush(&mut self) {
        let _ = self.out.flush();
    }

    /// ERROR diagnostics published so far
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Sink for one check's run: publishes to the channel and keeps the
/// check's own diagnostics and error count
pub struct CheckRecorder<'a, W> {
    channel: &'a mut Channel<W>,
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
}

impl<'a, W: Write> CheckRecorder<'a, W> {
    pub fn new(channel: &'a mut Channel<W>) -> Self {
        Self {
            channel,
            diagnostics: Vec::new(),
            error_count: 0,
        }
    }

    /// Diagnostics recorded for this check, with their ERROR count
    pub fn finish(self) -> (Vec<Diagnostic>, usize) {
        (self.diagnostics, self.error_count)
    }
}

impl<W: Write + Send> DiagnosticSink for CheckRecorder<'_, W> {
    fn accepts(&self, severity: Severity) -> bool {
        self.channel.allows(severity)
    }

    fn emit(&mut self, diagnostic: Diagnostic) {
        if !self.accepts(diagnostic.severity) {
            return;
        }
        self.channel.publish(&diagnostic);
        if diagnostic.severity == Severity::Error {
            self.error_count += 1;
        }
        self.diagnostics.push(diagnostic);
    }
}

/// In-memory sink, for exercising checks without a runner
#[derive(Debug, Default)]
pub struct Collector {
    pub diagnostics: Vec<Diagnostic>,
    pub allow_debug: bool,
}

impl Collector {
    pub fn new(allow_debug: bool) -> Self {
        Self {
            diagnostics: Vec::new(),
            allow_debug,
        }
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }

    pub fn messages(&self, severity: Severity) -> Vec<&str> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .map(|d| d.message.as_str())
            .collect()
    }
}

impl DiagnosticSink for Collector {
    fn accepts(&self, severity: Severity) -> bool {
        severity != Severity::Debug || self.allow_debug
    }

    fn emit(&mut self, diagnostic: Diagnostic) {
        if self.accepts(diagnostic.severity) {
            self.diagnostics.push(diagnostic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn output(channel: Channel<Vec<u8>>) -> String {
        String::from_utf8(channel.into_inner()).unwrap()
    }

    #[test]
    fn test_reporter_attributes_identity() {
        let mut collector = Collector::new(true);
        let mut reporter = Reporter::new("table-column-count", &mut collector);
        reporter.info(format_args!("{} rows", 3));

        assert_eq!(collector.diagnostics.len(), 1);
        assert_eq!(collector.diagnostics[0].check, "table-column-count");
        assert_eq!(collector.diagnostics[0].message, "3 rows");
    }

    #[test]
    fn test_channel_line_format() {
        let mut channel = Channel::new(Vec::new(), true);
        {
            let mut recorder = CheckRecorder::new(&mut channel);
            let mut reporter = Reporter::new("canvas-size", &mut recorder);
            reporter.warning(format_args!("canvas is {}x{}", 300, 150));
        }
        assert_eq!(output(channel), "canvas-size: WARNING: canvas is 300x150\n");
    }

    #[test]
    fn test_error_counted_once_per_call() {
        let mut channel = Channel::new(Vec::new(), true);
        let mut recorder = CheckRecorder::new(&mut channel);
        {
            let mut reporter = Reporter::new("dup", &mut recorder);
            reporter.error(format_args!("first"));
            reporter.error(format_args!("second"));
            reporter.warning(format_args!("not counted"));
        }
        let (diagnostics, errors) = recorder.finish();
        assert_eq!(errors, 2);
        assert_eq!(diagnostics.len(), 3);
        assert_eq!(channel.error_count(), 2);
    }

    #[test]
    fn test_debug_suppressed() {
        let mut channel = Channel::new(Vec::new(), false);
        let mut recorder = CheckRecorder::new(&mut channel);
        {
            let mut reporter = Reporter::new("chars", &mut recorder);
            reporter.debug(format_args!("hidden"));
            reporter.info(format_args!("shown"));
        }
        let (diagnostics, _) = recorder.finish();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(output(channel), "chars: INFO: shown\n");
    }

    #[test]
    fn test_severity_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Severity::Warning).unwrap(), "\"WARNING\"");
    }
}
