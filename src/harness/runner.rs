//! Sequential check execution.
//!
//! Each descriptor is constructed, given a fresh browser session, and run
//! on its own worker thread; the runner joins that thread before touching
//! the next descriptor. A failure in one check (construction error,
//! propagated `CheckError`, even a panic) is recorded against that check
//! and the batch carries on.

use chrono::Utc;
use std::any::Any;
use std::io::Write;
use std::thread;
use std::time::Instant;

use super::types::{CheckContext, CheckDescriptor, CheckResult, CheckState, ConstructionError};
use crate::browser::{SessionGuard, SessionProvider, SessionResult};
use crate::diagnostics::{Channel, CheckRecorder, Diagnostic, Reporter, Severity};
use crate::report::RunReport;

pub const SEPARATOR_LINE: &str =
    "--------------------------------------------------------------------------------";

/// Owns the ordered registry and the run-wide diagnostic channel
pub struct Runner<W: Write + Send> {
    descriptors: Vec<CheckDescriptor>,
    context: CheckContext,
    provider: Box<dyn SessionProvider>,
    channel: Channel<W>,
}

impl<W: Write + Send> Runner<W> {
    pub fn new(
        descriptors: Vec<CheckDescriptor>,
        context: CheckContext,
        provider: Box<dyn SessionProvider>,
        out: W,
        allow_debug: bool,
    ) -> Self {
        Self {
            descriptors,
            context,
            provider,
            channel: Channel::new(out, allow_debug),
        }
    }

    pub fn descriptors(&self) -> &[CheckDescriptor] {
        &self.descriptors
    }

    /// Run every descriptor in registration order and print the summary
    pub fn run(&mut self) -> RunReport {
        let started_at = Utc::now();
        let total = self.descriptors.len();
        tracing::info!(
            checks = total,
            url = %self.context.url,
            provider = self.provider.name(),
            "starting check run"
        );

        let descriptors = self.descriptors.clone();
        let mut results = Vec::with_capacity(total);
        for (index, descriptor) in descriptors.iter().enumerate() {
            self.channel.line(SEPARATOR_LINE);
            self.channel
                .line(format_args!("[{}/{}] {}", index + 1, total, descriptor.id));
            results.push(self.run_one(descriptor));
        }

        let report = RunReport::new(self.context.url.clone(), started_at, results);
        debug_assert_eq!(report.errors, self.channel.error_count());
        if total > 0 {
            self.channel.line(SEPARATOR_LINE);
        }
        self.channel.line(report.summary_line());
        self.channel.flush();

        tracing::info!(
            tests = report.tests,
            errors = report.errors,
            construction_failures = report.construction_failures(),
            "check run finished"
        );
        report
    }

    /// Give back the output stream
    pub fn into_output(self) -> W {
        self.channel.into_inner()
    }

    fn run_one(&mut self, descriptor: &CheckDescriptor) -> CheckResult {
        let started_at = Utc::now();
        let clock = Instant::now();
        let state = CheckState::NotStarted;
        let id = descriptor.id;

        let check = match (descriptor.build)(&self.context) {
            Ok(check) => check,
            Err(e) => return self.construction_failed(descriptor, state, e, started_at, clock),
        };
        let session = match self.provider.open() {
            Ok(session) => session,
            Err(e) => {
                return self.construction_failed(descriptor, state, e.into(), started_at, clock);
            }
        };

        let state = state.start().expect("fresh check state can start");
        tracing::debug!(check = id, "check running");
        let guard = SessionGuard::new(session, id);
        let mut recorder = CheckRecorder::new(&mut self.channel);
        let sink = &mut recorder;

        let joined = thread::scope(move |scope| {
            let worker = thread::Builder::new()
                .name(format!("check-{}", id))
                .spawn_scoped(scope, move || {
                    let mut guard = guard;
                    let mut check = check;
                    let outcome = {
                        let mut reporter = Reporter::new(id, sink);
                        check.run(&mut *guard, &mut reporter)
                    };
                    let released: SessionResult<()> = guard.release();
                    (outcome, released)
                });
            match worker {
                Ok(handle) => handle.join().map_err(panic_message),
                Err(e) => Err(format!("cannot start check thread: {}", e)),
            }
        });

        {
            let mut reporter = Reporter::new(id, &mut recorder);
            match joined {
                Ok((outcome, released)) => {
                    if let Err(e) = outcome {
                        reporter.error(format_args!("{}", e));
                    }
                    if let Err(e) = released {
                        reporter.warning(format_args!("failed to close browser session: {}", e));
                    }
                }
                Err(reason) => reporter.error(format_args!("check aborted: {}", reason)),
            }
        }

        let (diagnostics, error_count) = recorder.finish();
        let state = state.finish(error_count).expect("running check can finish");
        let outcome = state.outcome().expect("finished state is terminal");
        tracing::debug!(check = id, ?outcome, error_count, "check finished");

        CheckResult {
            id: id.to_string(),
            outcome,
            error_count,
            diagnostics,
            failure: None,
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
        }
    }

    fn construction_failed(
        &mut self,
        descriptor: &CheckDescriptor,
        state: CheckState,
        error: ConstructionError,
        started_at: chrono::DateTime<Utc>,
        clock: Instant,
    ) -> CheckResult {
        let state = state
            .construction_failed()
            .expect("unstarted check can fail construction");
        tracing::error!(check = descriptor.id, error = %error, "check construction failed");
        // Printed and recorded, but not part of the run's ERROR count.
        let diagnostic = Diagnostic::new(
            Severity::Error,
            format!("cannot construct check: {}", error),
            descriptor.id,
        );
        self.channel.line(&diagnostic);

        CheckResult {
            id: descriptor.id.to_string(),
            outcome: state.outcome().expect("construction failure is terminal"),
            error_count: 0,
            diagnostics: vec![diagnostic],
            failure: Some(error.to_string()),
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {}", msg)
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{BrowserSession, MockElement, MockPage, MockProvider, SessionCall};
    use crate::harness::types::{Check, CheckError, Outcome};
    use crate::snapshot::{CapturePipeline, CaptureSettings};
    use pretty_assertions::assert_eq;

    struct Noisy;

    impl Check for Noisy {
        fn run(
            &mut self,
            session: &mut dyn BrowserSession,
            reporter: &mut Reporter<'_>,
        ) -> Result<(), CheckError> {
            session.navigate("https://example.test")?;
            reporter.error(format_args!("first"));
            reporter.warning(format_args!("only a warning"));
            reporter.error(format_args!("second"));
            Ok(())
        }
    }

    struct Quiet;

    impl Check for Quiet {
        fn run(
            &mut self,
            _session: &mut dyn BrowserSession,
            reporter: &mut Reporter<'_>,
        ) -> Result<(), CheckError> {
            reporter.debug(format_args!("nothing to see"));
            Ok(())
        }
    }

    struct Panics;

    impl Check for Panics {
        fn run(
            &mut self,
            _session: &mut dyn BrowserSession,
            _reporter: &mut Reporter<'_>,
        ) -> Result<(), CheckError> {
            panic!("boom");
        }
    }

    fn noisy(_: &CheckContext) -> Result<Box<dyn Check>, ConstructionError> {
        Ok(Box::new(Noisy))
    }

    fn quiet(_: &CheckContext) -> Result<Box<dyn Check>, ConstructionError> {
        Ok(Box::new(Quiet))
    }

    fn panics(_: &CheckContext) -> Result<Box<dyn Check>, ConstructionError> {
        Ok(Box::new(Panics))
    }

    fn broken(_: &CheckContext) -> Result<Box<dyn Check>, ConstructionError> {
        Err(ConstructionError::Other("no such check".to_string()))
    }

    fn runner(descriptors: Vec<CheckDescriptor>, provider: MockProvider) -> Runner<Vec<u8>> {
        let context = CheckContext::new(
            "https://example.test",
            CapturePipeline::new(CaptureSettings::new(std::env::temp_dir())),
        );
        Runner::new(descriptors, context, Box::new(provider), Vec::new(), true)
    }

    fn provider() -> MockProvider {
        MockProvider::new(MockPage::new(MockElement::new("html")))
    }

    #[test]
    fn test_zero_descriptors_summary_only() {
        let mut runner = runner(Vec::new(), provider());
        let report = runner.run();
        assert_eq!(report.tests, 0);
        assert_eq!(String::from_utf8(runner.into_output()).unwrap(), "0 tests, 0 errors\n");
    }

    #[test]
    fn test_error_count_excludes_warnings() {
        let mut runner = runner(vec![CheckDescriptor::new("noisy", "", noisy)], provider());
        let report = runner.run();

        assert_eq!(report.results[0].error_count, 2);
        assert_eq!(report.results[0].outcome, Outcome::Failed);
        assert_eq!(report.results[0].diagnostics.len(), 3);
        assert_eq!(report.errors, 2);
    }

    #[test]
    fn test_construction_failure_does_not_abort_batch() {
        let provider = provider();
        let log = provider.call_log();
        let mut runner = runner(
            vec![
                CheckDescriptor::new("quiet", "", quiet),
                CheckDescriptor::new("broken", "", broken),
                CheckDescriptor::new("noisy", "", noisy),
            ],
            provider,
        );
        let report = runner.run();

        let ids: Vec<_> = report.results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["quiet", "broken", "noisy"]);
        assert_eq!(report.results[1].outcome, Outcome::ConstructionFailed);
        assert_eq!(report.results[1].error_count, 0);
        let recorded = &report.results[1].diagnostics;
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].severity, Severity::Error);
        assert_eq!(recorded[0].check, "broken");
        assert_eq!(recorded[0].message, "cannot construct check: no such check");
        assert_eq!(report.errors, 2);
        assert_eq!(report.tests, 3);

        // Two sessions opened, each closed before the next opens.
        let lifecycle: Vec<_> = log
            .calls()
            .into_iter()
            .filter(|c| matches!(c, SessionCall::Open | SessionCall::Close))
            .collect();
        assert_eq!(
            lifecycle,
            vec![SessionCall::Open, SessionCall::Close, SessionCall::Open, SessionCall::Close]
        );

        let output = String::from_utf8(runner.into_output()).unwrap();
        assert!(output.contains("broken: ERROR: cannot construct check: no such check"));
        assert!(output.ends_with("3 tests, 2 errors\n"));
    }

    #[test]
    fn test_unavailable_browser_is_construction_failure() {
        let mut runner = runner(
            vec![CheckDescriptor::new("quiet", "", quiet)],
            provider().unavailable("driver down"),
        );
        let report = runner.run();
        assert_eq!(report.results[0].outcome, Outcome::ConstructionFailed);
        assert!(report.results[0].failure.as_deref().unwrap_or("").contains("driver down"));
        assert!(report.results[0].diagnostics[0].message.contains("driver down"));
        assert_eq!(report.errors, 0);
    }

    #[test]
    fn test_panicking_check_is_isolated() {
        let provider = provider();
        let log = provider.call_log();
        let mut runner = runner(
            vec![
                CheckDescriptor::new("panics", "", panics),
                CheckDescriptor::new("quiet", "", quiet),
            ],
            provider,
        );
        let report = runner.run();

        assert_eq!(report.results[0].outcome, Outcome::Failed);
        assert_eq!(report.results[0].error_count, 1);
        assert!(report.results[0].diagnostics[0].message.contains("boom"));
        assert_eq!(report.results[1].outcome, Outcome::Passed);
        assert_eq!(log.count(|c| matches!(c, SessionCall::Close)), 2);
    }
}
