//! Checks over the first `<canvas>` of each `.large-10` container

use super::{content_containers, describe, first_within};
use crate::browser::{BrowserSession, ElementHandle, Locator, keys};
use crate::diagnostics::Reporter;
use crate::harness::{Check, CheckContext, CheckError, ConstructionError};
use crate::snapshot::{CapturePipeline, CaptureRequest, compare};

/// Smallest acceptable canvas, in CSS pixels
pub const MIN_CANVAS_WIDTH: i64 = 600;
pub const MIN_CANVAS_HEIGHT: i64 = 200;

/// File the canvas is captured to, replaced on every run
pub const CAPTURE_FILE: &str = "selenium-canvas.png";

/// Reference image the capture must match byte for byte
pub const REFERENCE_FILE: &str = "selenium-canvas-original.png";

const NO_CANVAS: &str = "No <canvas> element found to test!";

/// Each container's canvas must declare at least 600x200
#[derive(Debug)]
pub struct CanvasSize {
    url: String,
}

impl CanvasSize {
    pub fn build(context: &CheckContext) -> Result<Box<dyn Check>, ConstructionError> {
        Ok(Box::new(Self {
            url: context.validated_url()?,
        }))
    }

    /// Parse a dimension attribute, reporting a missing or malformed value
    fn dimension(
        session: &mut dyn BrowserSession,
        reporter: &mut Reporter<'_>,
        canvas: &ElementHandle,
        name: &str,
    ) -> Result<Option<i64>, CheckError> {
        let raw = session.attribute(canvas, name)?;
        let parsed = raw.as_deref().map(|v| v.trim().parse::<i64>());
        match parsed {
            Some(Ok(value)) => Ok(Some(value)),
            _ => {
                reporter.error(format_args!(
                    "Canvas {} has no usable {} attribute: '{}'",
                    describe(session, canvas)?,
                    name,
                    raw.unwrap_or_default()
                ));
                Ok(None)
            }
        }
    }
}

impl Check for CanvasSize {
    fn run(
        &mut self,
        session: &mut dyn BrowserSession,
        reporter: &mut Reporter<'_>,
    ) -> Result<(), CheckError> {
        session.navigate(&self.url)?;

        for container in content_containers(session)? {
            let Some(canvas) = first_within(session, &container, "canvas")? else {
                reporter.error(format_args!("{}", NO_CANVAS));
                continue;
            };
            let width = Self::dimension(session, reporter, &canvas, "width")?;
            let height = Self::dimension(session, reporter, &canvas, "height")?;
            let (Some(width), Some(height)) = (width, height) else {
                continue;
            };
            if width < MIN_CANVAS_WIDTH || height < MIN_CANVAS_HEIGHT {
                reporter.error(format_args!(
                    "Canvas does not have required dimensions (minimum {} x {}): {} x {}",
                    MIN_CANVAS_WIDTH, MIN_CANVAS_HEIGHT, width, height
                ));
            }
        }
        Ok(())
    }
}

/// The rendered canvas must match the stored reference image
#[derive(Debug)]
pub struct CanvasScreenshot {
    url: String,
    capture: CapturePipeline,
}

impl CanvasScreenshot {
    pub fn build(context: &CheckContext) -> Result<Box<dyn Check>, ConstructionError> {
        Ok(Box::new(Self {
            url: context.validated_url()?,
            capture: context.capture.clone(),
        }))
    }

    /// Ctrl+Subtract on the document, the keyboard zoom-out
    fn zoom_out(session: &mut dyn BrowserSession, reporter: &mut Reporter<'_>) {
        let chord = keys::chord(&[keys::CONTROL, keys::SUBTRACT]);
        let sent = session
            .find_element(None, &Locator::tag("html"))
            .and_then(|html| session.send_keys(&html, &chord));
        if let Err(e) = sent {
            reporter.debug(format_args!("keyboard zoom-out not applied: {}", e));
        }
    }
}

impl Check for CanvasScreenshot {
    fn run(
        &mut self,
        session: &mut dyn BrowserSession,
        reporter: &mut Reporter<'_>,
    ) -> Result<(), CheckError> {
        session.navigate(&self.url)?;
        Self::zoom_out(session, reporter);

        let reference = self.capture.destination(REFERENCE_FILE);
        for container in content_containers(session)? {
            let Some(canvas) = first_within(session, &container, "canvas")? else {
                reporter.error(format_args!("{}", NO_CANVAS));
                continue;
            };

            let request = CaptureRequest::new(canvas, CAPTURE_FILE).overwrite(true);
            let captured = self.capture.capture(session, &request)?;
            reporter.debug(format_args!(
                "Captured {} ({}) to {}",
                CAPTURE_FILE,
                captured.bounds,
                captured.path.display()
            ));

            if !compare(&captured.path, &reference)? {
                reporter.error(format_args!("Canvas elements differ.  Please check image files."));
            }
        }
        Ok(())
    }
}
