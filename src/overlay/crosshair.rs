use crate::overlay::RenderError;
use image::{RgbaImage, imageops};
use std::path::Path;
use tracing::{info, instrument};

/// Overlay planes take widths in multiples of 32 and heights in multiples of 16.
const WIDTH_ALIGNMENT: u32 = 32;
const HEIGHT_ALIGNMENT: u32 = 16;

/// The static crosshair, padded once at startup and never updated.
#[derive(Clone, Debug)]
pub struct CrosshairOverlay {
    pixels: RgbaImage,
}

impl CrosshairOverlay {
    #[instrument]
    pub fn from_file(path: &Path) -> Result<Self, RenderError> {
        info!("🎯 Loading crosshair...");
        let source = image::open(path).map_err(|source| RenderError::Crosshair {
            source,
            path: path.to_path_buf(),
        })?;

        let crosshair = Self::pad(&source.to_rgba8());
        info!(size = ?crosshair.size(), "🎯 Loading crosshair... OK");
        Ok(crosshair)
    }

    /// Places `source` at the top-left of a transparent canvas of the aligned size.
    pub fn pad(source: &RgbaImage) -> Self {
        let (width, height) = padded_size(source.dimensions());
        let mut pixels = RgbaImage::new(width, height);
        imageops::replace(&mut pixels, source, 0, 0);

        CrosshairOverlay { pixels }
    }

    pub fn size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn to_buffer(&self) -> Vec<u8> {
        self.pixels.as_raw().clone()
    }
}

pub fn padded_size((width, height): (u32, u32)) -> (u32, u32) {
    (width.div_ceil(WIDTH_ALIGNMENT) * WIDTH_ALIGNMENT, height.div_ceil(HEIGHT_ALIGNMENT) * HEIGHT_ALIGNMENT)
}
