use fontdue::{Font, FontSettings};
use thiserror::Error;

/// Embedded font for rasterizing the frame counter
static FONT_DATA: &[u8] = include_bytes!("../assets/fonts/DejaVuSans-Bold.ttf");

/// Safe fallback geometry used when a caller asks for a zero-sized frame
pub const DEFAULT_WIDTH: u32 = 1280;
pub const DEFAULT_HEIGHT: u32 = 720;

const BACKGROUND: [u8; 3] = [255, 255, 255];
const TEXT_COLOR: [u8; 3] = [255, 0, 0];

/// Errors that can occur while building the frame generator
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("failed to load embedded font: {0}")]
    FontLoad(&'static str),
}

/// A raw RGB24 video frame, tightly packed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbFrame {
    /// Raw RGB24 pixel data, `width * height * 3` bytes
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
}

impl RgbFrame {
    /// Allocate a frame filled with a uniform color
    pub fn filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            data.extend_from_slice(&color);
        }
        Self {
            data,
            width,
            height,
        }
    }

    /// Get the row stride (bytes per row)
    pub fn step(&self) -> u32 {
        self.width * 3 // RGB24 = 3 bytes per pixel
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Renders counter values onto blank frames.
///
/// The counter's decimal representation is rasterized with the embedded
/// font and centered on a white background. The generator is stateless
/// beyond the parsed font: the same `(number, width, height)` always
/// produces byte-identical output.
pub struct FrameGenerator {
    font: Font,
}

impl FrameGenerator {
    pub fn new() -> Result<Self, FrameError> {
        let font =
            Font::from_bytes(FONT_DATA, FontSettings::default()).map_err(FrameError::FontLoad)?;
        Ok(Self { font })
    }

    /// Produce a frame with `number` rendered in its center.
    ///
    /// Invalid inputs never panic: a zero `width` or `height` is replaced
    /// by [`DEFAULT_WIDTH`]x[`DEFAULT_HEIGHT`], and a negative `number`
    /// yields a blank background-colored frame of the requested size.
    pub fn generate(&self, number: i64, width: u32, height: u32) -> RgbFrame {
        let (width, height) = if width == 0 || height == 0 {
            log::warn!(
                "Invalid frame dimensions {}x{}, falling back to {}x{}",
                width,
                height,
                DEFAULT_WIDTH,
                DEFAULT_HEIGHT
            );
            (DEFAULT_WIDTH, DEFAULT_HEIGHT)
        } else {
            (width, height)
        };

        let mut frame = RgbFrame::filled(width, height, BACKGROUND);

        if number < 0 {
            log::error!(
                "Frame number must be non-negative, got {}; producing blank frame",
                number
            );
            return frame;
        }

        let text = number.to_string();
        let font_px = (width.min(height) as f32 * 0.35).clamp(4.0, 256.0);
        let (mask, mask_w, mask_h) = self.rasterize_text(&text, font_px);
        if mask_w == 0 || mask_h == 0 {
            return frame;
        }

        // Center the text block; clip anything that falls outside the frame
        let x0 = (width as i64 - mask_w as i64) / 2;
        let y0 = (height as i64 - mask_h as i64) / 2;

        for my in 0..mask_h {
            let fy = y0 + my as i64;
            if fy < 0 || fy >= height as i64 {
                continue;
            }
            for mx in 0..mask_w {
                let fx = x0 + mx as i64;
                if fx < 0 || fx >= width as i64 {
                    continue;
                }
                let alpha = mask[my * mask_w + mx] as u32;
                if alpha == 0 {
                    continue;
                }
                let idx = (fy as usize * width as usize + fx as usize) * 3;
                for c in 0..3 {
                    let bg = frame.data[idx + c] as u32;
                    let fg = TEXT_COLOR[c] as u32;
                    frame.data[idx + c] = ((fg * alpha + bg * (255 - alpha)) / 255) as u8;
                }
            }
        }

        frame
    }

    /// Rasterize `text` into an alpha mask of measured extents.
    ///
    /// Glyphs are placed on a common baseline; overlapping coverage is
    /// max-blended.
    fn rasterize_text(&self, text: &str, font_px: f32) -> (Vec<u8>, usize, usize) {
        let mut glyphs: Vec<(fontdue::Metrics, Vec<u8>)> = Vec::new();
        let mut total_width: usize = 0;

        for ch in text.chars() {
            let (metrics, bitmap) = self.font.rasterize(ch, font_px);
            total_width += metrics.advance_width.ceil() as usize;
            glyphs.push((metrics, bitmap));
        }

        let mask_height = (font_px * 1.2).ceil() as usize;
        if total_width == 0 || mask_height == 0 {
            return (Vec::new(), 0, 0);
        }

        let mut mask = vec![0u8; total_width * mask_height];
        let baseline = (font_px * 0.85).ceil() as i32;
        let mut cursor_x: i32 = 0;

        for (metrics, bitmap) in &glyphs {
            let glyph_x = cursor_x + metrics.xmin;
            let glyph_y = baseline - metrics.height as i32 - metrics.ymin;

            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let px = glyph_x + gx as i32;
                    let py = glyph_y + gy as i32;

                    if px >= 0
                        && (px as usize) < total_width
                        && py >= 0
                        && (py as usize) < mask_height
                    {
                        let src_alpha = bitmap[gy * metrics.width + gx];
                        let dst_idx = py as usize * total_width + px as usize;
                        mask[dst_idx] = mask[dst_idx].max(src_alpha);
                    }
                }
            }
            cursor_x += metrics.advance_width.ceil() as i32;
        }

        (mask, total_width, mask_height)
    }
}
