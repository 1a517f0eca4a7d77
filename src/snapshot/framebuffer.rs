//! In-memory RGB raster used to render mock viewports.
//!
//! Provides the drawing primitives the mock browser session needs to turn
//! a DOM tree into a viewport screenshot:
//! - `fill()` - Fill entire buffer with a color
//! - `draw_rect()` - Draw a filled rectangle (clipped to the buffer)
//! - `draw_text()` - Draw text using font8x8 glyphs
//! - `get_pixel()` / `set_pixel()` - Direct pixel access

use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{ImageBuffer, RgbImage};
use std::io::Cursor;

use super::types::{CaptureError, SnapshotResult};

#[derive(Debug, Clone)]
pub struct Framebuffer {
    /// Width in pixels
    width: u32,
    /// Height in pixels
    height: u32,
    /// RGB pixel buffer (row-major, 3 bytes per pixel)
    buffer: Vec<u8>,
}

impl Framebuffer {
    /// Create a new framebuffer with the given dimensions, initialized to black
    pub fn new(width: u32, height: u32) -> Self {
        let buffer = vec![0u8; (width as usize) * (height as usize) * 3];
        Self {
            width,
            height,
            buffer,
        }
    }

    /// Create a framebuffer initialized to a specific color
    pub fn with_color(width: u32, height: u32, color: [u8; 3]) -> Self {
        let mut fb = Self::new(width, height);
        fb.fill(color);
        fb
    }

    /// Load a framebuffer from PNG image bytes
    pub fn from_png_bytes(data: &[u8]) -> SnapshotResult<Self> {
        let rgb = image::load_from_memory(data)?.to_rgb8();
        Ok(Self {
            width: rgb.width(),
            height: rgb.height(),
            buffer: rgb.into_raw(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn fill(&mut self, color: [u8; 3]) {
        for chunk in self.buffer.chunks_exact_mut(3) {
            chunk.copy_from_slice(&color);
        }
    }

    /// Draw a filled rectangle. Signed coordinates so that elements
    /// scrolled partly off-screen are clipped rather than wrapped.
    pub fn draw_rect(&mut self, x: i64, y: i64, w: i64, h: i64, color: [u8; 3]) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = x.saturating_add(w).min(i64::from(self.width));
        let y1 = y.saturating_add(h).min(i64::from(self.height));
        for py in y0..y1 {
            for px in x0..x1 {
                self.set_pixel(px as u32, py as u32, color);
            }
        }
    }

    /// Draw text using font8x8 glyphs.
    ///
    /// Each character is 8x8 pixels. Text does not wrap.
    pub fn draw_text(&mut self, x: i64, y: i64, text: &str, fg: [u8; 3], bg: [u8; 3]) {
        let mut cursor_x = x;
        for ch in text.chars() {
            if cursor_x >= i64::from(self.width) {
                break;
            }
            self.draw_char(cursor_x, y, ch, fg, bg);
            cursor_x += 8;
        }
    }

    fn draw_char(&mut self, x: i64, y: i64, ch: char, fg: [u8; 3], bg: [u8; 3]) {
        let glyph = BASIC_FONTS.get(ch).unwrap_or([0u8; 8]);
        for (row_idx, row) in glyph.iter().enumerate() {
            let py = y + row_idx as i64;
            if py < 0 {
                continue;
            }
            if py >= i64::from(self.height) {
                break;
            }
            for bit in 0..8 {
                let px = x + bit;
                if px < 0 {
                    continue;
                }
                if px >= i64::from(self.width) {
                    break;
                }
                // font8x8 stores LSB as leftmost pixel
                let is_fg = (row >> bit) & 1 == 1;
                let color = if is_fg { fg } else { bg };
                self.set_pixel(px as u32, py as u32, color);
            }
        }
    }

    /// Get the color of a pixel (black outside the buffer)
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0];
        }
        let idx = self.index(x, y);
        [self.buffer[idx], self.buffer[idx + 1], self.buffer[idx + 2]]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = self.index(x, y);
        self.buffer[idx..idx + 3].copy_from_slice(&color);
    }

    fn index(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + (x as usize)) * 3
    }

    pub fn to_image(&self) -> SnapshotResult<RgbImage> {
        ImageBuffer::from_raw(self.width, self.height, self.buffer.clone()).ok_or_else(|| {
            CaptureError::Encode(format!(
                "buffer of {} bytes does not match {}x{}",
                self.buffer.len(),
                self.width,
                self.height
            ))
        })
    }

    /// Encode the framebuffer as PNG bytes
    pub fn to_png(&self) -> SnapshotResult<Vec<u8>> {
        let img = self.to_image()?;
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
        Ok(bytes)
    }
}
