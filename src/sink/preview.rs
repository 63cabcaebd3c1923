use crate::sink::OverlayPlanes;
use image::RgbImage;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

/// Keeps a PNG showing the overlay planes on top of the latest camera frame.
/// Only the newest state is written when updates arrive faster than the file can be encoded.
#[derive(Debug)]
pub struct PreviewWriter {
    planes: watch::Sender<OverlayPlanes>,
    frames: Arc<watch::Sender<Option<RgbImage>>>,
    size: (u32, u32),
}

impl PreviewWriter {
    /// Must be called from within a tokio runtime.
    pub fn spawn(path: PathBuf, size: (u32, u32)) -> Self {
        let (planes, planes_rx) = watch::channel(OverlayPlanes::default());
        let (frames, frames_rx) = watch::channel(None);
        tokio::spawn(write_previews(path, size, planes_rx, frames_rx));

        PreviewWriter {
            planes,
            frames: Arc::new(frames),
            size,
        }
    }

    pub fn publish(&self, planes: &OverlayPlanes) {
        self.planes.send_replace(planes.clone());
    }

    /// Reads packed RGB frames of the preview size from `reader` until it ends.
    pub fn feed_frames<R>(&self, reader: R) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        tokio::spawn(read_frames(reader, self.size, self.frames.clone()))
    }
}

#[instrument(skip_all)]
async fn read_frames<R>(mut reader: R, (width, height): (u32, u32), frames: Arc<watch::Sender<Option<RgbImage>>>)
where
    R: AsyncRead + Unpin,
{
    let frame_len = width as usize * height as usize * 3;
    if frame_len == 0 {
        return;
    }

    debug!("📷 Camera frame feed started");
    loop {
        let mut buffer = vec![0; frame_len];
        match reader.read_exact(&mut buffer).await {
            Ok(_) => {
                if let Some(frame) = RgbImage::from_raw(width, height, buffer) {
                    frames.send_replace(Some(frame));
                }
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => {
                warn!("⚠️ Reading camera frames failed: {}", e);
                break;
            }
        }
    }
    debug!("📷 Camera frame feed ended");
}

#[instrument(skip_all, fields(path = %path.display()))]
async fn write_previews(
    path: PathBuf,
    (width, height): (u32, u32),
    mut planes: watch::Receiver<OverlayPlanes>,
    mut frames: watch::Receiver<Option<RgbImage>>,
) {
    let mut failing = false;

    loop {
        tokio::select! {
            changed = planes.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            changed = frames.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        let overlay = planes.borrow_and_update().clone();
        let frame = frames.borrow_and_update().clone();
        let target = path.clone();
        let written = tokio::task::spawn_blocking(move || {
            let screen = frame.unwrap_or_else(|| RgbImage::new(width, height));
            overlay.composite(screen).save(&target)
        })
        .await;

        match written {
            Ok(Ok(())) => {
                if failing {
                    info!("🖼️ Writing overlay preview recovered");
                }
                failing = false;
                trace!("Wrote overlay preview");
            }
            Ok(Err(e)) if failing => debug!("Writing overlay preview failed again: {}", e),
            Ok(Err(e)) => {
                warn!("⚠️ Could not write overlay preview, the recording continues: {}", e);
                failing = true;
            }
            Err(e) => warn!("⚠️ Overlay preview task failed: {}", e),
        }
    }
    debug!("🖼️ Overlay preview writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{OverlaySpec, PixelFormat, Region, SinkError};
    use image::Rgb;
    use std::env::temp_dir;
    use std::io::Cursor;
    use std::path::Path;
    use std::time::Duration;
    use test_log::test;

    async fn wait_for_preview(path: &Path, accept: impl Fn(&RgbImage) -> bool) -> RgbImage {
        for _ in 0..500 {
            if let Ok(image) = image::open(path) {
                let image = image.to_rgb8();
                if accept(&image) {
                    return image;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no matching preview was written to {}", path.display());
    }

    fn white_pixel_plane() -> Result<OverlayPlanes, SinkError> {
        let mut planes = OverlayPlanes::default();
        let spec = OverlaySpec {
            format: PixelFormat::Rgb,
            size: (1, 1),
            layer: 5,
            alpha: 255,
            region: Region { x: 0, y: 0, width: 1, height: 1 },
        };
        planes.attach(vec![255, 255, 255], spec)?;
        Ok(planes)
    }

    #[test(tokio::test)]
    async fn keeps_the_last_complete_frame() {
        let writer = PreviewWriter::spawn(temp_dir().join("gps_overlay_frames_test.png"), (2, 1));
        let feed = vec![1, 1, 1, 2, 2, 2, 3, 3, 3, 4, 4, 4, 9, 9];

        writer.feed_frames(Cursor::new(feed)).await.unwrap();

        let expected = RgbImage::from_raw(2, 1, vec![3, 3, 3, 4, 4, 4]);
        assert_eq!(*writer.frames.borrow(), expected);
    }

    #[test(tokio::test)]
    async fn draws_the_planes_over_the_camera_frame() -> Result<(), SinkError> {
        let path = temp_dir().join("gps_overlay_preview_frame_test.png");
        let _ = std::fs::remove_file(&path);
        let writer = PreviewWriter::spawn(path.clone(), (2, 1));

        writer.feed_frames(Cursor::new(vec![0, 0, 200, 0, 0, 200])).await.unwrap();
        writer.publish(&white_pixel_plane()?);

        let preview = wait_for_preview(&path, |image| *image.get_pixel(0, 0) == Rgb([255, 255, 255])).await;
        assert_eq!(*preview.get_pixel(1, 0), Rgb([0, 0, 200]));
        Ok(())
    }

    #[test(tokio::test)]
    async fn survives_an_unwritable_path() -> Result<(), SinkError> {
        let writer = PreviewWriter::spawn(PathBuf::from("/nonexistent/dir/preview.png"), (2, 1));
        let planes = white_pixel_plane()?;

        writer.publish(&planes);
        tokio::time::sleep(Duration::from_millis(50)).await;
        writer.publish(&planes);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!writer.planes.is_closed());
        Ok(())
    }
}
