use crate::domain::GeoFix;
use crate::overlay::OverlayModel;
use crate::overlay::text::{bottom_text, top_text};
use fontdue::{Font, FontSettings};
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use std::{fs, io};
use thiserror::Error;
use tracing::{info, instrument};

pub const BAND_WIDTH: u32 = 704;
pub const BAND_HEIGHT: u32 = 60;

#[derive(Clone, Copy, Debug)]
struct TextStyle {
    anchor: (i32, i32),
    fill: Rgb<u8>,
}

const TOP_STYLE: TextStyle = TextStyle {
    anchor: (200, 15),
    fill: Rgb([255, 0, 255]),
};

const BOTTOM_STYLE: TextStyle = TextStyle {
    anchor: (50, 20),
    fill: Rgb([255, 255, 255]),
};

/// The two text bands rendered for a single tick.
#[derive(Debug)]
pub struct OverlayFrame {
    top_band: RgbImage,
    bottom_band: RgbImage,
    top_text: String,
    bottom_text: String,
}

impl OverlayFrame {
    pub fn top_text(&self) -> &str {
        &self.top_text
    }

    pub fn bottom_text(&self) -> &str {
        &self.bottom_text
    }

    /// Contiguous row-major RGB buffers for the top and bottom band.
    pub fn into_buffers(self) -> (Vec<u8>, Vec<u8>) {
        (self.top_band.into_raw(), self.bottom_band.into_raw())
    }
}

pub struct OverlayRenderer {
    font: Font,
    size: f32,
    ascent: f32,
}

impl OverlayRenderer {
    #[instrument]
    pub fn from_file(path: &Path, size: f32) -> Result<Self, RenderError> {
        info!("🔤 Loading font...");
        let bytes = fs::read(path).map_err(|source| RenderError::FontIo {
            source,
            path: path.to_path_buf(),
        })?;
        let renderer = Self::from_bytes(&bytes, size)?;
        info!("🔤 Loading font... OK");
        Ok(renderer)
    }

    pub fn from_bytes(bytes: &[u8], size: f32) -> Result<Self, RenderError> {
        let settings = FontSettings {
            scale: size,
            ..FontSettings::default()
        };
        let font = Font::from_bytes(bytes, settings).map_err(|reason| RenderError::InvalidFont { reason })?;
        let ascent = font.horizontal_line_metrics(size).map(|metrics| metrics.ascent).unwrap_or(size);

        Ok(OverlayRenderer { font, size, ascent })
    }

    /// Renders both bands on fresh canvases, nothing carries over from the previous tick.
    pub fn render_tick(&self, model: &OverlayModel, fix: Option<&GeoFix>) -> OverlayFrame {
        let fix = fix.cloned().unwrap_or_default();
        let top_text = top_text(&fix);
        let bottom_text = bottom_text(model, &fix);

        let mut top_band = blank_band();
        self.draw_text(&mut top_band, &top_text, TOP_STYLE);

        let mut bottom_band = blank_band();
        self.draw_text(&mut bottom_band, &bottom_text, BOTTOM_STYLE);

        OverlayFrame {
            top_band,
            bottom_band,
            top_text,
            bottom_text,
        }
    }

    fn draw_text(&self, image: &mut RgbImage, text: &str, style: TextStyle) {
        let (anchor_x, anchor_y) = style.anchor;
        let baseline = anchor_y as f32 + self.ascent;
        let mut pen_x = anchor_x as f32;
        let mut previous: Option<char> = None;

        for ch in text.chars() {
            if let Some(kern) = previous.and_then(|previous| self.font.horizontal_kern(previous, ch, self.size)) {
                pen_x += kern;
            }

            let (metrics, coverage) = self.font.rasterize(ch, self.size);
            let left = pen_x.round() as i32 + metrics.xmin;
            let top = baseline.round() as i32 - (metrics.height as i32 + metrics.ymin);

            for row in 0..metrics.height {
                for column in 0..metrics.width {
                    let alpha = coverage[row * metrics.width + column];
                    if alpha == 0 {
                        continue;
                    }
                    let x = left + column as i32;
                    let y = top + row as i32;
                    if x < 0 || y < 0 || x >= image.width() as i32 || y >= image.height() as i32 {
                        continue;
                    }
                    let pixel = image.get_pixel_mut(x as u32, y as u32);
                    *pixel = blend(*pixel, style.fill, alpha);
                }
            }

            pen_x += metrics.advance_width;
            previous = Some(ch);
        }
    }
}

/// A black band at the size the overlay surfaces were negotiated with.
pub fn blank_band() -> RgbImage {
    RgbImage::new(BAND_WIDTH, BAND_HEIGHT)
}

fn blend(background: Rgb<u8>, fill: Rgb<u8>, alpha: u8) -> Rgb<u8> {
    let alpha = alpha as u16;
    let channel = |bg: u8, fg: u8| ((fg as u16 * alpha + bg as u16 * (255 - alpha)) / 255) as u8;
    Rgb([
        channel(background[0], fill[0]),
        channel(background[1], fill[1]),
        channel(background[2], fill[2]),
    ])
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to read font '{}': {source}", .path.display())]
    FontIo { source: io::Error, path: PathBuf },
    #[error("invalid font: {reason}")]
    InvalidFont { reason: &'static str },
    #[error("failed to load crosshair '{}': {source}", .path.display())]
    Crosshair { source: image::ImageError, path: PathBuf },
}
