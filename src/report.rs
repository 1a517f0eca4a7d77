//! Types for check run results.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;

use crate::harness::{CheckResult, Outcome};

/// Result of a complete check run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Page the checks ran against
    pub target_url: String,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,

    /// Number of registered checks (N), whatever their outcome
    pub tests: usize,

    /// ERROR diagnostics across all checks (M)
    pub errors: usize,

    /// One entry per registered check, in run order
    pub results: Vec<CheckResult>,
}

impl RunReport {
    pub fn new(target_url: String, started_at: DateTime<Utc>, results: Vec<CheckResult>) -> Self {
        Self {
            target_url,
            started_at,
            finished_at: Utc::now(),
            tests: results.len(),
            errors: results.iter().map(|r| r.error_count).sum(),
            results,
        }
    }

    /// `"N tests, M errors"`
    pub fn summary_line(&self) -> String {
        format!("{} tests, {} errors", self.tests, self.errors)
    }

    /// Checks that never ran because they could not be constructed
    pub fn construction_failures(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome == Outcome::ConstructionFailed)
            .count()
    }

    /// No errors reported and every check constructed
    pub fn success(&self) -> bool {
        self.errors == 0 && self.construction_failures() == 0
    }

    /// Process exit status for this run
    pub fn exit_code(&self) -> u8 {
        if self.success() { 0 } else { 1 }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write the report as pretty JSON, creating parent directories
    pub fn write_json(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = self.to_json().map_err(io::Error::other)?;
        fs::write(path, json)
    }
}
