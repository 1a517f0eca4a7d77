//! Integration tests for element capture and image comparison

use std::fs;
use std::path::Path;
use std::time::Duration;

use page_checks::browser::{BrowserSession, Locator, MockElement, MockPage, MockSession, SessionCall};
use page_checks::snapshot::{
    CaptureError, CapturePipeline, CaptureRequest, CaptureSettings, Framebuffer, compare,
};

fn page() -> MockPage {
    MockPage::new(
        MockElement::new("html")
            .rect(0, 0, 640, 480)
            .child(
                MockElement::new("canvas")
                    .id("inside")
                    .rect(40, 60, 200, 80)
                    .fill([10, 200, 90]),
            )
            .child(MockElement::new("div").id("outside").rect(600, 400, 100, 100)),
    )
    .viewport(640, 480)
}

fn pipeline(dir: &Path) -> CapturePipeline {
    CapturePipeline::new(
        CaptureSettings::new(dir).settle(Duration::from_millis(1), Duration::from_millis(100)),
    )
}

fn canvas(session: &mut MockSession) -> page_checks::ElementHandle {
    session
        .find_element(None, &Locator::tag("canvas"))
        .expect("canvas present")
}

#[test]
fn test_capture_crops_to_element_bounds() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut session = MockSession::new(page());
    let element = canvas(&mut session);

    let result = pipeline(dir.path())
        .capture(&mut session, &CaptureRequest::new(element, "canvas.png"))
        .expect("capture");

    assert_eq!(result.path, dir.path().join("canvas.png"));
    assert_eq!((result.raster_width, result.raster_height), (640, 480));
    assert!(result.bounds.x + result.bounds.width <= i64::from(result.raster_width));
    assert!(result.bounds.y + result.bounds.height <= i64::from(result.raster_height));

    let written = fs::read(&result.path).expect("capture on disk");
    assert_eq!(written, result.image_data);
    let image = Framebuffer::from_png_bytes(&written).expect("valid png");
    assert_eq!((image.width(), image.height()), (200, 80));
    assert_eq!(image.get_pixel(100, 40), [10, 200, 90]);

    assert!(compare(&result.path, &result.path).expect("readable"));
}

#[test]
fn test_existing_destination_refused_before_any_browser_call() {
    let dir = tempfile::tempdir().expect("tempdir");
    let existing = dir.path().join("canvas.png");
    fs::write(&existing, b"keep me").expect("seed file");

    let mut session = MockSession::new(page());
    let element = canvas(&mut session);
    let log = session.call_log();
    let before = log.len();

    let err = pipeline(dir.path())
        .capture(&mut session, &CaptureRequest::new(element, "canvas.png").overwrite(false))
        .unwrap_err();

    assert!(matches!(err, CaptureError::DestinationExists(ref p) if *p == existing));
    assert_eq!(log.len(), before);
    assert_eq!(fs::read(&existing).expect("still there"), b"keep me");
}

#[test]
fn test_overwrite_replaces_existing_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let existing = dir.path().join("canvas.png");
    fs::write(&existing, b"stale").expect("seed file");

    let mut session = MockSession::new(page());
    let element = canvas(&mut session);
    let result = pipeline(dir.path())
        .capture(&mut session, &CaptureRequest::new(element, "canvas.png").overwrite(true))
        .expect("capture");

    assert_eq!(fs::read(&existing).expect("replaced"), result.image_data);
}

#[test]
fn test_unsupported_zoom_still_captures() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut session = MockSession::new(page()).without_zoom();
    let element = canvas(&mut session);
    let log = session.call_log();

    pipeline(dir.path())
        .capture(&mut session, &CaptureRequest::new(element, "canvas.png"))
        .expect("capture without zoom");

    assert_eq!(log.count(|c| matches!(c, SessionCall::SetZoom(50))), 1);
    assert_eq!(log.count(|c| *c == SessionCall::CaptureViewport), 1);
}

#[test]
fn test_moving_element_never_settles() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut session = MockSession::new(page()).drifting(3);
    let element = canvas(&mut session);

    let err = pipeline(dir.path())
        .capture(&mut session, &CaptureRequest::new(element, "canvas.png"))
        .unwrap_err();

    assert!(matches!(err, CaptureError::Unstable { .. }));
    assert!(!dir.path().join("canvas.png").exists());
}

#[test]
fn test_element_outside_viewport_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut session = MockSession::new(page());
    let outside = session
        .find_elements(None, &Locator::tag("div"))
        .expect("query")
        .remove(0);

    let err = pipeline(dir.path())
        .capture(&mut session, &CaptureRequest::new(outside, "outside.png"))
        .unwrap_err();

    assert!(matches!(
        err,
        CaptureError::OutOfBounds { raster_width: 640, raster_height: 480, .. }
    ));
    assert!(!dir.path().join("outside.png").exists());
}

#[test]
fn test_compare_detects_single_byte_difference() {
    let dir = tempfile::tempdir().expect("tempdir");
    let a = dir.path().join("a.png");
    let b = dir.path().join("b.png");
    fs::write(&a, [1u8, 2, 3, 4]).expect("write a");
    fs::write(&b, [1u8, 2, 3, 5]).expect("write b");

    assert!(!compare(&a, &b).expect("readable"));
    assert!(compare(&a, &a).expect("readable"));
    assert!(compare(&a, dir.path().join("missing.png")).is_err());
}
