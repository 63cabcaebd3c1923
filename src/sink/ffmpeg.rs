use crate::app_config::Video;
use crate::sink::OverlayPlanes;
use crate::sink::preview::PreviewWriter;
use crate::sink::video_sink::{OverlayHandle, OverlaySpec, SinkError, VideoSink};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tracing::{debug, info, instrument, warn};

/// Records a V4L2 camera with ffmpeg. Overlay planes are composited in software and only
/// shown in the preview image, they are not burnt into the recording.
///
/// With a preview configured, ffmpeg also emits one raw RGB frame per second on stdout which
/// the preview draws the planes onto.
#[derive(Debug)]
pub struct FfmpegSink {
    device: PathBuf,
    width: u32,
    height: u32,
    framerate: u32,
    preview: Option<PreviewWriter>,
    recorder: Option<Child>,
    planes: OverlayPlanes,
}

impl FfmpegSink {
    /// Must be called from within a tokio runtime when a preview path is configured.
    pub fn open(config: &Video) -> Result<Self, SinkError> {
        if !config.device().exists() {
            return Err(SinkError::DeviceUnavailable(config.device().to_path_buf()));
        }

        let size = (config.width(), config.height());
        let preview = config.preview_path().map(|path| PreviewWriter::spawn(path.to_path_buf(), size));

        Ok(FfmpegSink {
            device: config.device().to_path_buf(),
            width: config.width(),
            height: config.height(),
            framerate: config.framerate(),
            preview,
            recorder: None,
            planes: OverlayPlanes::default(),
        })
    }

    fn recorder_command(&self, path: &Path) -> Command {
        let mut command = Command::new("ffmpeg");
        command
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-f")
            .arg("video4linux2")
            .arg("-framerate")
            .arg(self.framerate.to_string())
            .arg("-video_size")
            .arg(format!("{}x{}", self.width, self.height))
            .arg("-i")
            .arg(&self.device);

        if self.preview.is_some() {
            command
                .arg("-r")
                .arg("1")
                .arg("-s")
                .arg(format!("{}x{}", self.width, self.height))
                .arg("-f")
                .arg("rawvideo")
                .arg("-pix_fmt")
                .arg("rgb24")
                .arg("pipe:1")
                .stdout(Stdio::piped());
        } else {
            command.stdout(Stdio::null());
        }

        command
            .arg("-c:v")
            .arg("libx264")
            .arg("-preset")
            .arg("ultrafast")
            .arg("-f")
            .arg("h264")
            .arg("-y")
            .arg(path)
            .stdin(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        command
    }

    fn publish_preview(&self) {
        if let Some(preview) = &self.preview {
            preview.publish(&self.planes);
        }
    }
}

#[async_trait]
impl VideoSink for FfmpegSink {
    #[instrument(skip(self))]
    async fn start_recording(&mut self, path: &Path) -> Result<(), SinkError> {
        if self.recorder.is_some() {
            return Err(SinkError::AlreadyRecording);
        }

        info!("🎥 Starting recording...");
        let mut child = self.recorder_command(path).spawn().map_err(SinkError::Spawn)?;
        if let (Some(preview), Some(frames)) = (&self.preview, child.stdout.take()) {
            preview.feed_frames(frames);
        }
        self.recorder = Some(child);
        info!("🎥 Starting recording... OK");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn stop_recording(&mut self) -> Result<(), SinkError> {
        let child = self.recorder.as_mut().ok_or(SinkError::NotRecording)?;

        info!("🎥 Stopping recording...");
        // ffmpeg finalizes the output when it reads 'q' on stdin
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(b"q").await {
                warn!("⚠️ Unable to ask ffmpeg to stop: {}", e);
            }
        }
        // The child stays in place until it exits, dropping it would kill ffmpeg mid-finalize
        let status = child.wait().await?;
        self.recorder = None;
        info!(%status, "🎥 Stopping recording... OK");
        Ok(())
    }

    async fn wait_frame_interval(&mut self, interval: Duration) -> Result<(), SinkError> {
        if self.recorder.is_none() {
            return Err(SinkError::NotRecording);
        }

        tokio::time::sleep(interval).await;

        let recorder = self.recorder.as_mut().ok_or(SinkError::NotRecording)?;
        if let Some(status) = recorder.try_wait()? {
            self.recorder = None;
            return Err(SinkError::RecordingExited(status));
        }
        Ok(())
    }

    fn attach_overlay(&mut self, pixels: Vec<u8>, spec: OverlaySpec) -> Result<OverlayHandle, SinkError> {
        let handle = self.planes.attach(pixels, spec)?;
        debug!(?handle, layer = spec.layer, alpha = spec.alpha, "Attached overlay");
        self.publish_preview();
        Ok(handle)
    }

    fn update_overlay(&mut self, handle: OverlayHandle, pixels: Vec<u8>) -> Result<(), SinkError> {
        self.planes.update(handle, pixels)?;
        self.publish_preview();
        Ok(())
    }

    fn detach_overlay(&mut self, handle: OverlayHandle) -> Result<(), SinkError> {
        self.planes.detach(handle)?;
        debug!(?handle, "Detached overlay");
        if self.planes.is_empty() {
            info!("🧩 All overlays detached");
        }
        self.publish_preview();
        Ok(())
    }
}
