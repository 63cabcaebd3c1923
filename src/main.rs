use crate::app_config::AppConfig;
use crate::gps::{GeoSampler, GpsdSource};
use crate::overlay::{CrosshairOverlay, OverlayRenderer};
use crate::pipeline::{OverlayPipeline, PipelineSettings};
use crate::sink::FfmpegSink;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app_config;
mod domain;
mod geo_math;
mod gps;
mod overlay;
mod pipeline;
mod sink;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!("🪵 Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load()?;
    info!("✅  Loaded configuration");

    let renderer = OverlayRenderer::from_file(config.overlay().font_path(), config.overlay().font_size())?;
    let crosshair = CrosshairOverlay::from_file(config.overlay().crosshair_path())?;
    info!("✅  Loaded overlay resources");

    let sink = FfmpegSink::open(config.video())?;
    info!("✅  Opened capture device");

    let source = GpsdSource::connect(config.gps()).await?;
    let sampler = GeoSampler::spawn(source);
    info!("✅  Initialized GPS sampler");

    info!("🔥 {} is up and running", env!("CARGO_PKG_NAME"));

    let pipeline = OverlayPipeline::new(sink, renderer, crosshair, PipelineSettings::from_config(&config));
    pipeline.run_until(sampler, interrupted()).await?;

    info!("👋 {} stopped", env!("CARGO_PKG_NAME"));
    Ok(())
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("⚠️ Unable to listen for Ctrl-C, stop the process another way: {}", e);
        std::future::pending::<()>().await;
    }
}
