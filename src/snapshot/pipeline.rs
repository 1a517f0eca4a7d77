//! Element screenshot capture.
//!
//! Sequence: destination check, scroll into view, zoom-out, settle,
//! viewport raster, bounds, validate, crop, persist. The destination check
//! runs before any browser call so a refused capture costs nothing.

use image::GenericImageView;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use super::types::{CaptureError, CaptureRequest, CaptureResult, CaptureSettings, SnapshotResult};
use crate::browser::{BrowserSession, ElementHandle, Rect, SessionError};

/// Crops element screenshots out of viewport rasters
#[derive(Debug, Clone)]
pub struct CapturePipeline {
    settings: CaptureSettings,
}

impl CapturePipeline {
    pub fn new(settings: CaptureSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    /// Full path of `filename` inside the downloads directory
    pub fn destination(&self, filename: &str) -> PathBuf {
        self.settings.downloads_dir.join(filename)
    }

    pub fn capture(
        &self,
        session: &mut dyn BrowserSession,
        request: &CaptureRequest,
    ) -> SnapshotResult<CaptureResult> {
        let destination = self.resolve_destination(request)?;

        session.scroll_into_view(&request.element)?;

        if let Some(percent) = self.settings.zoom_percent {
            match session.set_page_zoom(percent) {
                Ok(()) => {}
                Err(SessionError::Unsupported(reason)) => {
                    tracing::debug!(%reason, "page zoom unavailable, capturing unzoomed");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "page zoom failed, capturing unzoomed");
                }
            }
        }

        wait_until_stable(
            session,
            &request.element,
            self.settings.settle_interval,
            self.settings.settle_timeout,
        )?;

        let raster = session.capture_viewport()?;
        let bounds = session.bounds(&request.element)?;
        let (image_data, raster_width, raster_height) = crop_to_png(&raster, bounds)?;

        persist(&destination, &image_data, request.overwrite)?;
        tracing::info!(path = %destination.display(), %bounds, "element captured");

        Ok(CaptureResult {
            image_data,
            path: destination,
            bounds,
            raster_width,
            raster_height,
        })
    }

    fn resolve_destination(&self, request: &CaptureRequest) -> SnapshotResult<PathBuf> {
        let name = Path::new(&request.filename);
        let plain = name.file_name().map(|f| f == name.as_os_str()).unwrap_or(false);
        if request.filename.is_empty() || !plain {
            return Err(CaptureError::InvalidFilename(request.filename.clone()));
        }

        let destination = self.destination(&request.filename);
        if destination.exists() && !request.overwrite {
            return Err(CaptureError::DestinationExists(destination));
        }
        Ok(destination)
    }
}

/// Poll the element bounds until two consecutive samples agree.
///
/// Returns the settled bounds, or `Unstable` once `timeout` has elapsed
/// without two matching samples.
pub fn wait_until_stable(
    session: &mut dyn BrowserSession,
    element: &ElementHandle,
    interval: Duration,
    timeout: Duration,
) -> SnapshotResult<Rect> {
    let deadline = Instant::now() + timeout;
    let mut previous = session.bounds(element)?;
    loop {
        if !interval.is_zero() {
            thread::sleep(interval);
        }
        let current = session.bounds(element)?;
        if current == previous {
            return Ok(current);
        }
        if Instant::now() >= deadline {
            return Err(CaptureError::Unstable {
                timeout,
                last: current,
            });
        }
        previous = current;
    }
}

/// Check that `bounds` is non-empty and lies inside a `width`x`height` raster
pub fn validate_bounds(bounds: Rect, width: u32, height: u32) -> SnapshotResult<()> {
    let right = bounds.x.checked_add(bounds.width);
    let bottom = bounds.y.checked_add(bounds.height);
    let inside = bounds.x >= 0
        && bounds.y >= 0
        && bounds.width > 0
        && bounds.height > 0
        && right.is_some_and(|r| r <= i64::from(width))
        && bottom.is_some_and(|b| b <= i64::from(height));
    if inside {
        Ok(())
    } else {
        Err(CaptureError::OutOfBounds {
            bounds,
            raster_width: width,
            raster_height: height,
        })
    }
}

/// Decode a viewport raster, crop it to `bounds` and encode the crop as PNG.
///
/// Returns the PNG bytes and the raster dimensions. Bounds outside the
/// raster are an error; nothing is clamped.
pub fn crop_to_png(raster: &[u8], bounds: Rect) -> SnapshotResult<(Vec<u8>, u32, u32)> {
    let img = image::load_from_memory(raster)?;
    let (width, height) = img.dimensions();
    validate_bounds(bounds, width, height)?;

    let cropped = img.crop_imm(
        bounds.x as u32,
        bounds.y as u32,
        bounds.width as u32,
        bounds.height as u32,
    );
    let mut png = Vec::new();
    cropped.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)?;
    Ok((png, width, height))
}

/// Write `data` to `destination` through a temporary sibling file and a rename
fn persist(destination: &Path, data: &[u8], overwrite: bool) -> SnapshotResult<()> {
    let dir = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut staged = tempfile::Builder::new()
        .prefix(".capture-")
        .suffix(".png")
        .tempfile_in(dir)?;
    staged.write_all(data)?;
    staged.as_file().sync_all()?;

    if destination.exists() {
        if !overwrite {
            return Err(CaptureError::DestinationExists(destination.to_path_buf()));
        }
        fs::remove_file(destination)?;
    }
    staged.persist(destination)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Framebuffer;

    fn raster(width: u32, height: u32) -> Vec<u8> {
        let mut fb = Framebuffer::with_color(width, height, [255, 255, 255]);
        fb.draw_rect(10, 10, 20, 5, [255, 0, 0]);
        fb.to_png().unwrap()
    }

    #[test]
    fn test_validate_bounds_accepts_full_raster() {
        assert!(validate_bounds(Rect::new(0, 0, 100, 50), 100, 50).is_ok());
    }

    #[test]
    fn test_validate_bounds_rejects_violations() {
        let cases = [
            Rect::new(-1, 0, 10, 10),
            Rect::new(0, -1, 10, 10),
            Rect::new(95, 0, 10, 10),
            Rect::new(0, 45, 10, 10),
            Rect::new(0, 0, 0, 10),
            Rect::new(0, 0, 10, 0),
            Rect::new(i64::MAX, 0, 10, 10),
            Rect::new(0, i64::MAX, 10, 10),
            Rect::new(1, 0, i64::MAX, 10),
        ];
        for bounds in cases {
            assert!(
                matches!(validate_bounds(bounds, 100, 50), Err(CaptureError::OutOfBounds { .. })),
                "{} should be rejected",
                bounds
            );
        }
    }

    #[test]
    fn test_crop_to_png_extracts_region() {
        let (png, w, h) = crop_to_png(&raster(100, 50), Rect::new(10, 10, 20, 5)).unwrap();
        assert_eq!((w, h), (100, 50));

        let crop = Framebuffer::from_png_bytes(&png).unwrap();
        assert_eq!((crop.width(), crop.height()), (20, 5));
        assert_eq!(crop.get_pixel(0, 0), [255, 0, 0]);
        assert_eq!(crop.get_pixel(19, 4), [255, 0, 0]);
    }

    #[test]
    fn test_crop_to_png_never_clamps() {
        let err = crop_to_png(&raster(100, 50), Rect::new(90, 10, 20, 5)).unwrap_err();
        assert!(matches!(err, CaptureError::OutOfBounds { raster_width: 100, .. }));
    }

    #[test]
    fn test_persist_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("shot.png");
        fs::write(&dest, b"old").unwrap();

        persist(&dest, b"new", true).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"new");

        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1, "staging file should be renamed away");
    }

    #[test]
    fn test_persist_refuses_existing_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("shot.png");
        fs::write(&dest, b"old").unwrap();

        assert!(matches!(persist(&dest, b"new", false), Err(CaptureError::DestinationExists(_))));
        assert_eq!(fs::read(&dest).unwrap(), b"old");
    }
}
