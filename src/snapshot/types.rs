// Core types for element capture and image comparison

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::browser::{ElementHandle, Rect, SessionError};

/// One element-scoped screenshot to take
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    /// Element to capture
    pub element: ElementHandle,

    /// File name inside the downloads directory (no path separators)
    pub filename: String,

    /// Whether an existing file may be replaced
    pub overwrite: bool,
}

impl CaptureRequest {
    pub fn new(element: ElementHandle, filename: impl Into<String>) -> Self {
        Self {
            element,
            filename: filename.into(),
            overwrite: false,
        }
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

/// Result of a successful capture
#[derive(Debug, Clone, Serialize)]
pub struct CaptureResult {
    /// PNG-encoded crop
    #[serde(skip)]
    pub image_data: Vec<u8>,

    /// Where the crop was persisted
    pub path: PathBuf,

    /// Crop rectangle in viewport raster coordinates
    pub bounds: Rect,

    /// Size of the full viewport raster the crop was taken from
    pub raster_width: u32,
    pub raster_height: u32,
}

/// Result type for capture operations
pub type SnapshotResult<T> = Result<T, CaptureError>;

/// Capture pipeline precondition or postcondition violations
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Destination exists and overwrite was not requested
    #[error("cannot replace existing file: {}", .0.display())]
    DestinationExists(PathBuf),

    /// Destination name is empty or not a plain file name
    #[error("invalid capture file name: '{0}'")]
    InvalidFilename(String),

    /// Element position/size kept changing past the settle timeout
    #[error("element did not settle within {timeout:?} (last bounds {last})")]
    Unstable { timeout: Duration, last: Rect },

    /// Element bounds are empty or reach outside the viewport raster
    #[error("element bounds {bounds} fall outside the {raster_width}x{raster_height} viewport raster")]
    OutOfBounds {
        bounds: Rect,
        raster_width: u32,
        raster_height: u32,
    },

    /// Browser interaction failed mid-capture
    #[error("browser error during capture: {0}")]
    Session(#[from] SessionError),

    /// Raster could not be decoded or the crop encoded
    #[error("image encoding error: {0}")]
    Encode(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for CaptureError {
    fn from(err: image::ImageError) -> Self {
        CaptureError::Encode(err.to_string())
    }
}

impl From<tempfile::PersistError> for CaptureError {
    fn from(err: tempfile::PersistError) -> Self {
        CaptureError::Io(err.error)
    }
}

/// Failure reading an image during comparison
#[derive(Debug, Error)]
#[error("cannot read {} for comparison: {source}", .path.display())]
pub struct CompareError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Tuning for the capture pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    /// Directory captures are written to and references read from
    pub downloads_dir: PathBuf,

    /// Zoom-out applied before capturing (`None` skips the step)
    pub zoom_percent: Option<u32>,

    /// Delay between two position/size samples while settling
    pub settle_interval: Duration,

    /// Give up settling after this long
    pub settle_timeout: Duration,
}

impl CaptureSettings {
    pub fn new(downloads_dir: impl Into<PathBuf>) -> Self {
        Self {
            downloads_dir: downloads_dir.into(),
            zoom_percent: Some(crate::config::DEFAULT_ZOOM_PERCENT),
            settle_interval: Duration::from_millis(crate::config::DEFAULT_SETTLE_INTERVAL_MS),
            settle_timeout: Duration::from_millis(crate::config::DEFAULT_SETTLE_TIMEOUT_MS),
        }
    }

    pub fn zoom(mut self, percent: Option<u32>) -> Self {
        self.zoom_percent = percent;
        self
    }

    pub fn settle(mut self, interval: Duration, timeout: Duration) -> Self {
        self.settle_interval = interval;
        self.settle_timeout = timeout;
        self
    }
}
