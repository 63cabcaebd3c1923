use crate::app_config::AppConfig;
use crate::domain::GeoFix;
use crate::gps::GeoSampler;
use crate::overlay::{BAND_HEIGHT, BAND_WIDTH, CrosshairOverlay, LatchMode, OverlayModel, OverlayRenderer, blank_band};
use crate::sink::{OverlayHandle, OverlaySpec, PixelFormat, Region, SinkError, VideoSink};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

const TOP_SURFACE: SurfaceLayout = SurfaceLayout {
    layer: 5,
    alpha: 128,
    region: Region {
        x: 0,
        y: 20,
        width: BAND_WIDTH,
        height: BAND_HEIGHT,
    },
};

const BOTTOM_SURFACE: SurfaceLayout = SurfaceLayout {
    layer: 4,
    alpha: 128,
    region: Region {
        x: 0,
        y: 400,
        width: BAND_WIDTH,
        height: BAND_HEIGHT,
    },
};

const CROSSHAIR_SURFACE: SurfaceLayout = SurfaceLayout {
    layer: 3,
    alpha: 10,
    region: Region {
        x: 0,
        y: 0,
        width: 704,
        height: 512,
    },
};

#[derive(Clone, Copy, Debug)]
struct SurfaceLayout {
    layer: u8,
    alpha: u8,
    region: Region,
}

impl SurfaceLayout {
    fn spec(&self, format: PixelFormat, size: (u32, u32)) -> OverlaySpec {
        OverlaySpec {
            format,
            size,
            layer: self.layer,
            alpha: self.alpha,
            region: self.region,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PipelineSettings {
    pub output_path: PathBuf,
    pub warmup: Duration,
    pub duration_limit: Option<u64>,
    pub tick_interval: Duration,
    pub latch_mode: LatchMode,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        PipelineSettings {
            output_path: config.video().output_path().to_path_buf(),
            warmup: config.video().warmup(),
            duration_limit: config.recording().duration_limit(),
            tick_interval: config.recording().tick_interval(),
            latch_mode: config.overlay().latch_mode(),
        }
    }
}

#[derive(Default, Debug)]
struct Surfaces {
    top: Option<OverlayHandle>,
    bottom: Option<OverlayHandle>,
    crosshair: Option<OverlayHandle>,
}

/// What a single tick pushed to the overlay surfaces.
#[derive(Clone, PartialEq, Debug)]
pub struct TickReport {
    pub tick: u64,
    pub top_text: String,
    pub bottom_text: String,
    pub recording_active: bool,
}

/// Owns the session state and the sink, and drives one render per tick.
pub struct OverlayPipeline<S: VideoSink> {
    sink: S,
    renderer: OverlayRenderer,
    crosshair: CrosshairOverlay,
    model: OverlayModel,
    surfaces: Surfaces,
    settings: PipelineSettings,
}

impl<S: VideoSink> OverlayPipeline<S> {
    pub fn new(sink: S, renderer: OverlayRenderer, crosshair: CrosshairOverlay, settings: PipelineSettings) -> Self {
        OverlayPipeline {
            sink,
            renderer,
            crosshair,
            model: OverlayModel::new(settings.latch_mode),
            surfaces: Surfaces::default(),
            settings,
        }
    }

    /// Runs the overlay loop until `interrupt` resolves or a fatal error occurs, then tears the session down.
    /// Teardown happens exactly once on every exit path and consumes both the pipeline and the sampler.
    #[instrument(skip_all)]
    pub async fn run_until<F>(mut self, sampler: GeoSampler, interrupt: F) -> Result<(), PipelineError>
    where
        F: Future<Output = ()>,
    {
        let result = tokio::select! {
            result = self.run_session(&sampler) => result,
            _ = interrupt => {
                info!("🛑 Interrupted");
                Ok(())
            }
        };

        if let Err(e) = &result {
            warn!("⚠️ Overlay session failed: {}", e);
        }

        self.teardown(sampler).await;
        result
    }

    async fn run_session(&mut self, sampler: &GeoSampler) -> Result<(), PipelineError> {
        self.start().await?;

        loop {
            let fix = sampler.snapshot();
            let report = self.tick(fix.as_ref()).await?;
            debug!(
                tick = report.tick,
                recording = report.recording_active,
                top = %report.top_text,
                bottom = %report.bottom_text,
                "🖼️ Rendered overlay"
            );
            self.pace().await?;
        }
    }

    /// Starts recording and attaches the three overlay surfaces.
    async fn start(&mut self) -> Result<(), PipelineError> {
        tokio::time::sleep(self.settings.warmup).await;

        self.sink.start_recording(&self.settings.output_path).await?;
        self.model.set_recording_active(true);

        info!("🧩 Attaching overlays...");
        let band_size = (BAND_WIDTH, BAND_HEIGHT);
        let blank = blank_band().into_raw();
        self.surfaces.top = Some(self.sink.attach_overlay(blank.clone(), TOP_SURFACE.spec(PixelFormat::Rgb, band_size))?);
        self.surfaces.bottom = Some(self.sink.attach_overlay(blank, BOTTOM_SURFACE.spec(PixelFormat::Rgb, band_size))?);
        self.surfaces.crosshair = Some(self.sink.attach_overlay(
            self.crosshair.to_buffer(),
            CROSSHAIR_SURFACE.spec(PixelFormat::Rgba, self.crosshair.size()),
        )?);
        info!("🧩 Attaching overlays... OK");
        Ok(())
    }

    /// Folds the snapshot into the model, pushes freshly rendered bands and applies the duration limit.
    async fn tick(&mut self, fix: Option<&GeoFix>) -> Result<TickReport, PipelineError> {
        let previous = self.model.state();
        self.model.advance(fix);
        if self.model.state() != previous {
            info!(from = ?previous, to = ?self.model.state(), "📍 Session state changed");
        }

        let frame = self.renderer.render_tick(&self.model, fix);
        let top_text = frame.top_text().to_string();
        let bottom_text = frame.bottom_text().to_string();
        let (top, bottom) = frame.into_buffers();

        let top_handle = self.surfaces.top.ok_or(PipelineError::SurfaceNotAttached("top"))?;
        let bottom_handle = self.surfaces.bottom.ok_or(PipelineError::SurfaceNotAttached("bottom"))?;
        self.sink.update_overlay(top_handle, top)?;
        self.sink.update_overlay(bottom_handle, bottom)?;

        let tick = self.model.record_tick();
        if self.model.recording_active() && self.settings.duration_limit.is_some_and(|limit| tick > limit) {
            info!(tick, "⏱️ Recording duration limit reached");
            self.sink.stop_recording().await?;
            self.model.set_recording_active(false);
        }

        Ok(TickReport {
            tick,
            top_text,
            bottom_text,
            recording_active: self.model.recording_active(),
        })
    }

    /// The sink paces the loop while recording, a plain sleep does afterwards.
    async fn pace(&mut self) -> Result<(), PipelineError> {
        if self.model.recording_active() {
            self.sink.wait_frame_interval(self.settings.tick_interval).await?;
        } else {
            tokio::time::sleep(self.settings.tick_interval).await;
        }
        Ok(())
    }

    #[instrument(skip_all)]
    async fn teardown(mut self, sampler: GeoSampler) {
        info!("🧹 Tearing down...");
        sampler.shutdown().await;

        let surfaces = std::mem::take(&mut self.surfaces);
        for handle in [surfaces.top, surfaces.bottom, surfaces.crosshair].into_iter().flatten() {
            if let Err(e) = self.sink.detach_overlay(handle) {
                warn!("⚠️ Could not detach overlay {:?}: {}", handle, e);
            }
        }

        if self.model.recording_active() {
            if let Err(e) = self.sink.stop_recording().await {
                warn!("⚠️ Could not stop recording: {}", e);
            }
            self.model.set_recording_active(false);
        }

        let origin = self.model.origin();
        info!(
            ticks = self.model.seconds_recorded(),
            latitude = ?origin.latitude(),
            longitude = ?origin.longitude(),
            start = ?origin.start_timestamp(),
            "🧹 Tearing down... OK"
        );
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error("the {0} overlay is not attached")]
    SurfaceNotAttached(&'static str),
}
