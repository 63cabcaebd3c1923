use crate::overlay::LatchMode;
use config::Config;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    video: Video,
    overlay: Overlay,
    recording: Recording,
    gps: Gps,
}

impl AppConfig {
    pub fn load() -> Result<Self, AppConfigError> {
        let config = Config::builder()
            .add_source(config::File::with_name("config").required(true))
            .add_source(config::File::with_name("config_local").required(false))
            .add_source(config::Environment::default().separator("__"))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    pub fn video(&self) -> &Video {
        &self.video
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn gps(&self) -> &Gps {
        &self.gps
    }
}

#[derive(Error, Debug)]
pub enum AppConfigError {
    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),
}

#[derive(Debug, Deserialize)]
pub struct Video {
    device: PathBuf,
    width: u32,
    height: u32,
    framerate: u32,
    output_path: PathBuf,
    #[serde(with = "humantime_serde")]
    warmup: Duration,
    preview_path: Option<PathBuf>,
}

impl Video {
    pub fn device(&self) -> &Path {
        &self.device
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn framerate(&self) -> u32 {
        self.framerate
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn warmup(&self) -> Duration {
        self.warmup
    }

    pub fn preview_path(&self) -> Option<&Path> {
        self.preview_path.as_deref()
    }
}

#[derive(Debug, Deserialize)]
pub struct Overlay {
    font_path: PathBuf,
    font_size: f32,
    crosshair_path: PathBuf,
    #[serde(default)]
    latch_mode: LatchMode,
}

impl Overlay {
    pub fn font_path(&self) -> &Path {
        &self.font_path
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    pub fn crosshair_path(&self) -> &Path {
        &self.crosshair_path
    }

    pub fn latch_mode(&self) -> LatchMode {
        self.latch_mode
    }
}

#[derive(Debug, Deserialize)]
pub struct Recording {
    duration_limit: Option<u64>,
    #[serde(with = "humantime_serde")]
    tick_interval: Duration,
}

impl Recording {
    /// Number of ticks after which recording stops, `None` records until interrupted.
    pub fn duration_limit(&self) -> Option<u64> {
        self.duration_limit
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }
}

#[derive(Debug, Deserialize)]
pub struct Gps {
    address: String,
    #[serde(with = "humantime_serde")]
    read_timeout: Duration,
    retry_ms: u64,
    #[serde(with = "humantime_serde")]
    retry_max_delay: Duration,
    connect_attempts: usize,
}

impl Gps {
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn retry_ms(&self) -> u64 {
        self.retry_ms
    }

    pub fn retry_max_delay(&self) -> Duration {
        self.retry_max_delay
    }

    pub fn connect_attempts(&self) -> usize {
        self.connect_attempts
    }
}

#[cfg(test)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

#[cfg(test)]
impl AppConfigBuilder {
    pub fn new() -> Self {
        AppConfigBuilder {
            config: AppConfig {
                video: Video {
                    device: PathBuf::from("/dev/video0"),
                    width: 1280,
                    height: 720,
                    framerate: 60,
                    output_path: PathBuf::from("video.h264"),
                    warmup: Duration::from_secs(3),
                    preview_path: None,
                },
                overlay: Overlay {
                    font_path: PathBuf::from("/usr/share/fonts/truetype/roboto/Roboto-Regular.ttf"),
                    font_size: 20.0,
                    crosshair_path: PathBuf::from("crosshair.png"),
                    latch_mode: LatchMode::PerAxis,
                },
                recording: Recording {
                    duration_limit: Some(10),
                    tick_interval: Duration::from_secs(1),
                },
                gps: Gps {
                    address: "127.0.0.1:2947".to_string(),
                    read_timeout: Duration::from_millis(500),
                    retry_ms: 10,
                    retry_max_delay: Duration::from_millis(20),
                    connect_attempts: 1,
                },
            },
        }
    }

    pub fn gps_address(mut self, address: String) -> Self {
        self.config.gps.address = address;
        self
    }

    pub fn video_device(mut self, device: PathBuf) -> Self {
        self.config.video.device = device;
        self
    }

    pub fn preview_path(mut self, path: PathBuf) -> Self {
        self.config.video.preview_path = Some(path);
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use pretty_assertions::assert_eq;

    const CONFIG: &str = r#"
        [video]
        device = "/dev/video0"
        width = 1280
        height = 720
        framerate = 60
        output_path = "video.h264"
        warmup = "3s"

        [overlay]
        font_path = "Roboto-Regular.ttf"
        font_size = 20
        crosshair_path = "crosshair.png"
        latch_mode = "atomic"

        [recording]
        duration_limit = 10
        tick_interval = "1s"

        [gps]
        address = "127.0.0.1:2947"
        read_timeout = "500ms"
        retry_ms = 100
        retry_max_delay = "5s"
        connect_attempts = 5
    "#;

    fn parse(toml: &str) -> Result<AppConfig, config::ConfigError> {
        Config::builder().add_source(config::File::from_str(toml, FileFormat::Toml)).build()?.try_deserialize()
    }

    #[test]
    fn deserializes_all_sections() -> Result<(), config::ConfigError> {
        let config = parse(CONFIG)?;

        assert_eq!(config.video().warmup(), Duration::from_secs(3));
        assert_eq!(config.video().preview_path(), None);
        assert_eq!(config.overlay().font_size(), 20.0);
        assert_eq!(config.overlay().latch_mode(), LatchMode::Atomic);
        assert_eq!(config.recording().duration_limit(), Some(10));
        assert_eq!(config.gps().read_timeout(), Duration::from_millis(500));
        assert_eq!(config.gps().retry_max_delay(), Duration::from_secs(5));
        Ok(())
    }

    #[test]
    fn latch_mode_defaults_to_per_axis() -> Result<(), config::ConfigError> {
        let config = parse(&CONFIG.replace(r#"latch_mode = "atomic""#, ""))?;

        assert_eq!(config.overlay().latch_mode(), LatchMode::PerAxis);
        Ok(())
    }

    #[test]
    fn recording_without_a_duration_limit_is_unbounded() -> Result<(), config::ConfigError> {
        let config = parse(&CONFIG.replace("duration_limit = 10", ""))?;

        assert_eq!(config.recording().duration_limit(), None);
        Ok(())
    }

    #[test]
    fn fails_for_an_invalid_duration() {
        let result = parse(&CONFIG.replace(r#"warmup = "3s""#, r#"warmup = "soon""#));
        assert!(result.is_err());
    }
}
