pub mod compare;
pub mod framebuffer;
pub mod pipeline;
pub mod types;

pub use compare::compare;
pub use framebuffer::Framebuffer;
pub use pipeline::{CapturePipeline, crop_to_png, validate_bounds, wait_until_stable};
pub use types::{CaptureError, CaptureRequest, CaptureResult, CaptureSettings, CompareError, SnapshotResult};
