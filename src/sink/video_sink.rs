use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PixelFormat {
    Rgb,
    Rgba,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// Screen rectangle an overlay plane is shown in.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Everything the compositor needs to know about a plane besides its pixels.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct OverlaySpec {
    pub format: PixelFormat,
    pub size: (u32, u32),
    pub layer: u8,
    pub alpha: u8,
    pub region: Region,
}

impl OverlaySpec {
    pub fn buffer_len(&self) -> usize {
        self.size.0 as usize * self.size.1 as usize * self.format.bytes_per_pixel()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct OverlayHandle(pub(crate) u32);

/// A camera pipeline that records to storage and shows overlay planes on top of the live feed.
#[async_trait]
pub trait VideoSink: Send {
    async fn start_recording(&mut self, path: &Path) -> Result<(), SinkError>;

    async fn stop_recording(&mut self) -> Result<(), SinkError>;

    /// Blocks for `interval` while the recording keeps running. Only valid while recording.
    async fn wait_frame_interval(&mut self, interval: Duration) -> Result<(), SinkError>;

    fn attach_overlay(&mut self, pixels: Vec<u8>, spec: OverlaySpec) -> Result<OverlayHandle, SinkError>;

    /// Replaces the whole buffer of an attached plane.
    fn update_overlay(&mut self, handle: OverlayHandle, pixels: Vec<u8>) -> Result<(), SinkError>;

    fn detach_overlay(&mut self, handle: OverlayHandle) -> Result<(), SinkError>;
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("capture device '{}' is unavailable", .0.display())]
    DeviceUnavailable(PathBuf),
    #[error("failed to start the recorder: {0}")]
    Spawn(#[source] io::Error),
    #[error("recorder I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("recording is already active")]
    AlreadyRecording,
    #[error("recording is not active")]
    NotRecording,
    #[error("recorder exited unexpectedly with {0}")]
    RecordingExited(std::process::ExitStatus),
    #[error("unknown overlay {0:?}")]
    UnknownOverlay(OverlayHandle),
    #[error("overlay buffer is {actual} bytes, expected {expected}")]
    BufferSizeMismatch { expected: usize, actual: usize },
}
