use crate::domain::GeoFix;
use async_trait::async_trait;
use std::io;
use thiserror::Error;

/// A continuous stream of GPS fixes.
#[async_trait]
pub trait GpsSource: Send {
    /// Waits for the next complete fix. `Ok(None)` means nothing new arrived within the read timeout,
    /// which gives the caller a chance to check whether it should stop.
    async fn next_fix(&mut self) -> Result<Option<GeoFix>, GpsError>;
}

#[derive(Error, Debug)]
pub enum GpsError {
    #[error("failed to connect to gpsd at '{address}': {source}")]
    Connect { source: io::Error, address: String },
    #[error("GPS stream error: {0}")]
    Io(#[from] io::Error),
    #[error("GPS stream closed")]
    StreamClosed,
}
