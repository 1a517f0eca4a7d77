//! Page Checks - structural and visual checks against a live web page.
//!
//! This crate provides:
//! - A blocking browser session abstraction over WebDriver, plus an
//!   in-memory mock for tests
//! - An ordered registry of independent checks, each run in its own
//!   browser session
//! - A severity-classified diagnostic channel with per-check error counts
//! - Element screenshot capture and byte-exact image comparison
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use page_checks::browser::{WebDriverProvider, webdriver_runtime};
//! use page_checks::config::Config;
//! use page_checks::harness::{CheckContext, Runner, default_registry};
//! use page_checks::snapshot::CapturePipeline;
//!
//! let config = Config::from_env();
//! let runtime = Arc::new(webdriver_runtime().unwrap());
//! let provider = WebDriverProvider::new(runtime, config.driver.clone());
//! let context = CheckContext::new(&config.target.url, CapturePipeline::new(config.capture));
//! let mut runner = Runner::new(default_registry(), context, Box::new(provider), std::io::stdout(), true);
//! let report = runner.run();
//! std::process::exit(i32::from(report.exit_code()));
//! ```

pub mod browser;
pub mod checks;
pub mod config;
pub mod diagnostics;
pub mod harness;
pub mod report;
pub mod snapshot;

// Re-export harness types
pub use harness::{
    Check, CheckContext, CheckDescriptor, CheckError, CheckResult, CheckState, ConstructionError,
    Outcome, Runner, default_registry,
};

// Re-export browser session types
pub use browser::{BrowserSession, ElementHandle, Locator, SessionError, SessionProvider};

// Re-export diagnostics
pub use diagnostics::{Diagnostic, Reporter, Severity};

// Re-export capture and comparison
pub use snapshot::{CaptureError, CapturePipeline, CaptureRequest, CaptureResult, CompareError, compare};

pub use config::Config;
pub use report::RunReport;
