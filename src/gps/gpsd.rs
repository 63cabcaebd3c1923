use crate::app_config::Gps;
use crate::domain::{FixMode, GeoFix};
use crate::gps::{GpsError, GpsSource};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::SplitStream;
use tracing::{debug, info, instrument, trace, warn};

const WATCH_COMMAND: &[u8] = br#"?WATCH={"enable":true,"json":true};"#;

/// Reads gpsd JSON reports and folds them into a running fix, the way gpsd clients expose `gpsd.fix`.
pub struct GpsdSource<R> {
    lines: SplitStream<R>,
    fix: GeoFix,
    read_timeout: Duration,
}

impl GpsdSource<BufReader<TcpStream>> {
    #[instrument(skip_all, fields(address = config.address()))]
    pub async fn connect(config: &Gps) -> Result<Self, GpsError> {
        let strategy = ExponentialBackoff::from_millis(config.retry_ms())
            .factor(2)
            .max_delay(config.retry_max_delay())
            .map(jitter)
            .take(config.connect_attempts().saturating_sub(1));

        info!("🛰️ Connecting to gpsd...");
        let mut stream = Retry::spawn(strategy, || async {
            TcpStream::connect(config.address()).await.inspect_err(|e| {
                warn!("⚠️ Connecting to gpsd failed: {}. Retrying...", e);
            })
        })
        .await
        .map_err(|source| GpsError::Connect {
            source,
            address: config.address().to_string(),
        })?;

        stream.write_all(WATCH_COMMAND).await?;
        info!("🛰️ Connecting to gpsd... OK");

        Ok(GpsdSource::new(BufReader::new(stream), config.read_timeout()))
    }
}

impl<R> GpsdSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R, read_timeout: Duration) -> Self {
        GpsdSource {
            lines: SplitStream::new(reader.split(b'\n')),
            fix: GeoFix::default(),
            read_timeout,
        }
    }

    /// Applies a single report line, returns whether the fix changed.
    fn apply(&mut self, line: &str) -> bool {
        match serde_json::from_str::<Report>(line) {
            Ok(Report::Tpv(tpv)) => {
                self.fix.latitude = tpv.lat;
                self.fix.longitude = tpv.lon;
                self.fix.altitude = tpv.alt_msl.or(tpv.alt);
                self.fix.speed = tpv.speed;
                self.fix.climb = tpv.climb;
                self.fix.track = tpv.track;
                self.fix.utc = tpv.time;
                self.fix.mode = FixMode::from_gpsd(tpv.mode);
                true
            }
            Ok(Report::Sky(Sky { satellites: Some(satellites) })) => {
                self.fix.satellites = satellites.len();
                true
            }
            Ok(Report::Sky(Sky { satellites: None })) => {
                trace!(report = line, "Skipping SKY report without satellites");
                false
            }
            Ok(Report::Other) => {
                trace!(report = line, "Skipping gpsd report");
                false
            }
            Err(e) => {
                debug!(report = line, "Skipping undecodable gpsd report: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl<R> GpsSource for GpsdSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_fix(&mut self) -> Result<Option<GeoFix>, GpsError> {
        match timeout(self.read_timeout, self.lines.next()).await {
            Ok(Some(Ok(bytes))) => {
                // A report with broken UTF-8 fails JSON decoding below and is skipped like any other bad line
                let line = String::from_utf8_lossy(&bytes);
                let line = line.trim_end_matches('\r');
                Ok(self.apply(line).then(|| self.fix.clone()))
            }
            Ok(Some(Err(e))) => Err(GpsError::Io(e)),
            Ok(None) => Err(GpsError::StreamClosed),
            Err(_) => Ok(None),
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(tag = "class")]
enum Report {
    #[serde(rename = "TPV")]
    Tpv(Tpv),
    #[serde(rename = "SKY")]
    Sky(Sky),
    #[serde(other)]
    Other,
}

#[derive(Deserialize, Debug)]
struct Tpv {
    #[serde(default)]
    mode: u8,
    time: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    alt: Option<f64>,
    #[serde(rename = "altMSL")]
    alt_msl: Option<f64>,
    speed: Option<f64>,
    climb: Option<f64>,
    track: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct Sky {
    satellites: Option<Vec<serde_json::Value>>,
}
