mod compositor;
mod ffmpeg;
mod preview;
mod video_sink;

pub use compositor::OverlayPlanes;
pub use ffmpeg::FfmpegSink;
pub use video_sink::{OverlayHandle, OverlaySpec, PixelFormat, Region, SinkError, VideoSink};
