//! Configuration management with environment variable support.
//!
//! Every setting has a default matching the fixed target the harness was
//! written for, and can be overridden through the environment:
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `PAGE_CHECKS_URL` | Page the checks run against | `https://the-internet.herokuapp.com/challenging_dom` |
//! | `PAGE_CHECKS_WEBDRIVER_URL` | WebDriver endpoint | `http://localhost:9515` |
//! | `PAGE_CHECKS_DRIVER_PATH` | Driver binary launched when the endpoint is down | `$HOME/selenium/chromedriver/chromedriver` |
//! | `PAGE_CHECKS_HEADLESS` | Run the browser without a window | `false` |
//! | `PAGE_CHECKS_DOWNLOADS_DIR` | Where captures are written and references read | `$HOME/Downloads` |
//! | `PAGE_CHECKS_ZOOM` | Zoom-out percentage before capture (`0` disables) | `50` |
//! | `PAGE_CHECKS_SETTLE_INTERVAL_MS` | Delay between settle samples | `100` |
//! | `PAGE_CHECKS_SETTLE_TIMEOUT_MS` | Give up settling after | `2000` |
//! | `PAGE_CHECKS_DEBUG` | Emit DEBUG diagnostics | `true` |
//!
//! The configuration is read once by the binary and handed to the harness
//! explicitly; nothing here is cached process-wide.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::snapshot::CaptureSettings;

// ============================================================================
// Default Values
// ============================================================================

/// Default page under test
pub const DEFAULT_TARGET_URL: &str = "https://the-internet.herokuapp.com/challenging_dom";

/// Default WebDriver endpoint (chromedriver's default port)
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

/// Default driver binary, relative to the home directory
pub const DEFAULT_DRIVER_SUBPATH: &str = "selenium/chromedriver/chromedriver";

/// Default downloads directory, relative to the home directory
pub const DEFAULT_DOWNLOADS_SUBDIR: &str = "Downloads";

/// Default zoom-out applied before element captures
pub const DEFAULT_ZOOM_PERCENT: u32 = 50;

/// Default delay between two settle samples (milliseconds)
pub const DEFAULT_SETTLE_INTERVAL_MS: u64 = 100;

/// Default settle timeout (milliseconds)
pub const DEFAULT_SETTLE_TIMEOUT_MS: u64 = 2000;

/// Default time allowed for a launched driver to start listening (seconds)
pub const DEFAULT_DRIVER_STARTUP_SECS: u64 = 10;

// ============================================================================
// Environment Variable Names
// ============================================================================

pub const ENV_TARGET_URL: &str = "PAGE_CHECKS_URL";
pub const ENV_WEBDRIVER_URL: &str = "PAGE_CHECKS_WEBDRIVER_URL";
pub const ENV_DRIVER_PATH: &str = "PAGE_CHECKS_DRIVER_PATH";
pub const ENV_HEADLESS: &str = "PAGE_CHECKS_HEADLESS";
pub const ENV_DOWNLOADS_DIR: &str = "PAGE_CHECKS_DOWNLOADS_DIR";
pub const ENV_ZOOM: &str = "PAGE_CHECKS_ZOOM";
pub const ENV_SETTLE_INTERVAL_MS: &str = "PAGE_CHECKS_SETTLE_INTERVAL_MS";
pub const ENV_SETTLE_TIMEOUT_MS: &str = "PAGE_CHECKS_SETTLE_TIMEOUT_MS";
pub const ENV_DEBUG: &str = "PAGE_CHECKS_DEBUG";

// ============================================================================
// Configuration
// ============================================================================

/// Complete harness configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Page under test
    pub target: TargetSettings,
    /// Browser driver
    pub driver: DriverSettings,
    /// Element capture pipeline
    pub capture: CaptureSettings,
    /// Diagnostic channel
    pub diagnostics: DiagnosticSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetSettings {
    pub url: String,
}

/// WebDriver connection and driver-process settings
#[derive(Debug, Clone, PartialEq)]
pub struct DriverSettings {
    /// Endpoint sessions are opened against
    pub webdriver_url: String,
    /// Binary launched when nothing listens on the endpoint
    pub driver_path: Option<PathBuf>,
    /// Run the browser headless
    pub headless: bool,
    /// How long a launched driver may take to start listening
    pub startup_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticSettings {
    /// Whether DEBUG diagnostics are emitted
    pub allow_debug: bool,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            target: TargetSettings::from_env(),
            driver: DriverSettings::from_env(),
            capture: capture_from_env(),
            diagnostics: DiagnosticSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            target: TargetSettings::defaults(),
            driver: DriverSettings::defaults(),
            capture: CaptureSettings::new(default_downloads_dir()),
            diagnostics: DiagnosticSettings::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl TargetSettings {
    pub fn from_env() -> Self {
        Self {
            url: env::var(ENV_TARGET_URL).unwrap_or_else(|_| DEFAULT_TARGET_URL.to_string()),
        }
    }

    pub fn defaults() -> Self {
        Self {
            url: DEFAULT_TARGET_URL.to_string(),
        }
    }
}

impl DriverSettings {
    pub fn from_env() -> Self {
        Self {
            webdriver_url: env::var(ENV_WEBDRIVER_URL)
                .unwrap_or_else(|_| DEFAULT_WEBDRIVER_URL.to_string()),
            driver_path: env::var_os(ENV_DRIVER_PATH)
                .map(PathBuf::from)
                .or_else(default_driver_path),
            headless: env_flag(ENV_HEADLESS).unwrap_or(false),
            startup_timeout: Duration::from_secs(DEFAULT_DRIVER_STARTUP_SECS),
        }
    }

    pub fn defaults() -> Self {
        Self {
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            driver_path: default_driver_path(),
            headless: false,
            startup_timeout: Duration::from_secs(DEFAULT_DRIVER_STARTUP_SECS),
        }
    }
}

impl DiagnosticSettings {
    pub fn from_env() -> Self {
        Self {
            allow_debug: env_flag(ENV_DEBUG).unwrap_or(true),
        }
    }

    pub fn defaults() -> Self {
        Self { allow_debug: true }
    }
}

fn capture_from_env() -> CaptureSettings {
    let downloads_dir = env::var_os(ENV_DOWNLOADS_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(default_downloads_dir);
    let zoom = match env::var(ENV_ZOOM).ok().and_then(|s| parse_zoom(&s)) {
        Some(zoom) => zoom,
        None => Some(DEFAULT_ZOOM_PERCENT),
    };
    let interval = env_u64(ENV_SETTLE_INTERVAL_MS).unwrap_or(DEFAULT_SETTLE_INTERVAL_MS);
    let timeout = env_u64(ENV_SETTLE_TIMEOUT_MS).unwrap_or(DEFAULT_SETTLE_TIMEOUT_MS);

    CaptureSettings::new(downloads_dir)
        .zoom(zoom)
        .settle(Duration::from_millis(interval), Duration::from_millis(timeout))
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Home directory, or the working directory when none can be determined
pub fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_downloads_dir() -> PathBuf {
    home_dir().join(DEFAULT_DOWNLOADS_SUBDIR)
}

fn default_driver_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DEFAULT_DRIVER_SUBPATH))
}

fn env_u64(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name).ok().and_then(|s| parse_flag(&s))
}

/// Parse a boolean flag: 1/true/yes/on or 0/false/no/off
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a zoom percentage. `0`/`off` disable zooming; unparseable input is `None`.
fn parse_zoom(value: &str) -> Option<Option<u32>> {
    match value.trim().to_lowercase().as_str() {
        "off" | "none" => Some(None),
        other => match other.trim_end_matches('%').parse::<u32>() {
            Ok(0) => Some(None),
            Ok(percent) => Some(Some(percent)),
            Err(_) => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("true"), Some(true));
        assert_eq!(parse_flag(" ON "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_parse_zoom() {
        assert_eq!(parse_zoom("50"), Some(Some(50)));
        assert_eq!(parse_zoom("75%"), Some(Some(75)));
        assert_eq!(parse_zoom("0"), Some(None));
        assert_eq!(parse_zoom("off"), Some(None));
        assert_eq!(parse_zoom("half"), None);
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::defaults();
        assert_eq!(config.target.url, DEFAULT_TARGET_URL);
        assert_eq!(config.driver.webdriver_url, DEFAULT_WEBDRIVER_URL);
        assert!(config.diagnostics.allow_debug);
        assert_eq!(config.capture.zoom_percent, Some(DEFAULT_ZOOM_PERCENT));
        assert!(config.capture.downloads_dir.ends_with(DEFAULT_DOWNLOADS_SUBDIR));
    }

    #[test]
    fn test_driver_path_under_home() {
        if let Some(path) = DriverSettings::defaults().driver_path {
            assert!(path.ends_with("selenium/chromedriver/chromedriver"));
        }
    }
}
