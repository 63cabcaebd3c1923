use crate::sink::video_sink::{OverlayHandle, OverlaySpec, PixelFormat, SinkError};
use image::{Rgb, RgbImage};
use std::collections::HashMap;

#[derive(Clone, Debug)]
struct Plane {
    pixels: Vec<u8>,
    spec: OverlaySpec,
}

/// Software table of overlay planes. Buffers must always match the size the plane was attached with.
#[derive(Clone, Default, Debug)]
pub struct OverlayPlanes {
    planes: HashMap<OverlayHandle, Plane>,
    next_id: u32,
}

impl OverlayPlanes {
    pub fn attach(&mut self, pixels: Vec<u8>, spec: OverlaySpec) -> Result<OverlayHandle, SinkError> {
        check_len(&pixels, &spec)?;

        let handle = OverlayHandle(self.next_id);
        self.next_id += 1;
        self.planes.insert(handle, Plane { pixels, spec });
        Ok(handle)
    }

    pub fn update(&mut self, handle: OverlayHandle, pixels: Vec<u8>) -> Result<(), SinkError> {
        let plane = self.planes.get_mut(&handle).ok_or(SinkError::UnknownOverlay(handle))?;
        check_len(&pixels, &plane.spec)?;
        plane.pixels = pixels;
        Ok(())
    }

    pub fn detach(&mut self, handle: OverlayHandle) -> Result<(), SinkError> {
        self.planes.remove(&handle).map(|_| ()).ok_or(SinkError::UnknownOverlay(handle))
    }

    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    /// Blends all planes, lowest layer first, onto `screen`, usually the latest camera frame.
    /// Planes are scaled into their region with nearest neighbour sampling.
    pub fn composite(&self, mut screen: RgbImage) -> RgbImage {
        let (width, height) = screen.dimensions();

        let mut planes = self.planes.values().collect::<Vec<_>>();
        planes.sort_by_key(|plane| plane.spec.layer);

        for plane in planes {
            let region = plane.spec.region;
            let (plane_width, plane_height) = plane.spec.size;
            if region.width == 0 || region.height == 0 || plane_width == 0 || plane_height == 0 {
                continue;
            }

            let bpp = plane.spec.format.bytes_per_pixel();
            for dy in 0..region.height {
                let y = region.y + dy;
                if y >= height {
                    break;
                }
                let source_y = (dy as u64 * plane_height as u64 / region.height as u64) as usize;
                for dx in 0..region.width {
                    let x = region.x + dx;
                    if x >= width {
                        break;
                    }
                    let source_x = (dx as u64 * plane_width as u64 / region.width as u64) as usize;
                    let offset = (source_y * plane_width as usize + source_x) * bpp;
                    let pixel = &plane.pixels[offset..offset + bpp];
                    let pixel_alpha = match plane.spec.format {
                        PixelFormat::Rgb => 255,
                        PixelFormat::Rgba => pixel[3] as u32,
                    };
                    let alpha = plane.spec.alpha as u32 * pixel_alpha / 255;
                    let target = screen.get_pixel_mut(x, y);
                    *target = blend(*target, [pixel[0], pixel[1], pixel[2]], alpha);
                }
            }
        }

        screen
    }
}

fn check_len(pixels: &[u8], spec: &OverlaySpec) -> Result<(), SinkError> {
    let expected = spec.buffer_len();
    if pixels.len() != expected {
        return Err(SinkError::BufferSizeMismatch {
            expected,
            actual: pixels.len(),
        });
    }
    Ok(())
}

fn blend(background: Rgb<u8>, foreground: [u8; 3], alpha: u32) -> Rgb<u8> {
    let channel = |bg: u8, fg: u8| ((fg as u32 * alpha + bg as u32 * (255 - alpha)) / 255) as u8;
    Rgb([
        channel(background[0], foreground[0]),
        channel(background[1], foreground[1]),
        channel(background[2], foreground[2]),
    ])
}
