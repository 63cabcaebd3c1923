use crate::domain::GeoFix;
use crate::gps::GpsSource;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Non-blocking access to the latest GPS fix while a background task drains the source.
pub struct GeoSampler {
    latest: watch::Receiver<Option<GeoFix>>,
    running: Arc<AtomicBool>,
    drain: JoinHandle<()>,
}

impl GeoSampler {
    pub fn spawn<S>(source: S) -> Self
    where
        S: GpsSource + 'static,
    {
        let (tx, latest) = watch::channel(None);
        let running = Arc::new(AtomicBool::new(true));
        let drain = tokio::spawn(drain(source, tx, running.clone()));

        GeoSampler { latest, running, drain }
    }

    /// The most recent complete fix, `None` until the receiver delivered one.
    pub fn snapshot(&self) -> Option<GeoFix> {
        self.latest.borrow().clone()
    }

    /// Asks the drain task to stop and waits for it to finish before the source is released.
    #[instrument(skip_all)]
    pub async fn shutdown(self) {
        info!("🛰️ Stopping GPS drain...");
        self.running.store(false, Ordering::SeqCst);
        match self.drain.await {
            Ok(()) => info!("🛰️ Stopping GPS drain... OK"),
            Err(e) => warn!("⚠️ GPS drain task failed: {}", e),
        }
    }
}

#[instrument(skip_all)]
async fn drain<S>(mut source: S, tx: watch::Sender<Option<GeoFix>>, running: Arc<AtomicBool>)
where
    S: GpsSource,
{
    debug!("🛰️ GPS drain started");
    while running.load(Ordering::SeqCst) {
        match source.next_fix().await {
            Ok(Some(fix)) => {
                tx.send_replace(Some(fix));
            }
            Ok(None) => {}
            Err(e) => {
                warn!("⚠️ GPS source failed, fixes are unavailable from now on: {}", e);
                tx.send_replace(None);
                break;
            }
        }
    }
    debug!("🛰️ GPS drain stopped");
}
