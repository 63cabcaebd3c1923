use crate::domain::{ElapsedTime, GeoFix};
use crate::geo_math::{elapsed_between, haversine_distance_km, truncate_timestamp};
use serde::Deserialize;
use tracing::info;

/// How the session origin latches its coordinates.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatchMode {
    /// Latitude and longitude latch independently on their first valid value.
    #[default]
    PerAxis,
    /// Both axes latch together on the first fix that carries a full position.
    Atomic,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LatchState {
    Uninitialized,
    OriginLatched,
    Tracking,
}

/// Values captured on their first valid observation, never changed afterwards.
#[derive(Clone, PartialEq, Default, Debug)]
pub struct SessionOrigin {
    latitude: Option<f64>,
    longitude: Option<f64>,
    start_timestamp: Option<String>,
}

impl SessionOrigin {
    pub fn latitude(&self) -> Option<f64> {
        self.latitude
    }

    pub fn longitude(&self) -> Option<f64> {
        self.longitude
    }

    pub fn start_timestamp(&self) -> Option<&str> {
        self.start_timestamp.as_deref()
    }

    /// Origin used for distance calculations, an axis that has not latched yet counts as 0.
    fn coordinates(&self) -> (f64, f64) {
        (self.latitude.unwrap_or(0.0), self.longitude.unwrap_or(0.0))
    }

    fn latch_position(&mut self, fix: &GeoFix, mode: LatchMode) {
        match mode {
            LatchMode::PerAxis => {
                if self.latitude.is_none() && fix.latitude.is_some() {
                    self.latitude = fix.latitude;
                    info!(latitude = fix.latitude, "📍 Latched origin latitude");
                }
                if self.longitude.is_none() && fix.longitude.is_some() {
                    self.longitude = fix.longitude;
                    info!(longitude = fix.longitude, "📍 Latched origin longitude");
                }
            }
            LatchMode::Atomic => {
                if self.latitude.is_some() || self.longitude.is_some() {
                    return;
                }
                if let Some((latitude, longitude)) = fix.position() {
                    self.latitude = Some(latitude);
                    self.longitude = Some(longitude);
                    info!(latitude, longitude, "📍 Latched origin");
                }
            }
        }
    }

    fn latch_start(&mut self, utc: &str) {
        if self.start_timestamp.is_none() && is_date_like(utc) {
            let start = truncate_timestamp(utc).to_string();
            info!(start = %start, "⏱️ Latched session start");
            self.start_timestamp = Some(start);
        }
    }
}

/// Session state derived from GPS fixes, advanced once per tick by the pipeline.
#[derive(Clone, Debug)]
pub struct OverlayModel {
    origin: SessionOrigin,
    latch_mode: LatchMode,
    elapsed: ElapsedTime,
    distance_km: Option<f64>,
    recording_active: bool,
    seconds_recorded: u64,
}

impl OverlayModel {
    pub fn new(latch_mode: LatchMode) -> Self {
        OverlayModel {
            origin: SessionOrigin::default(),
            latch_mode,
            elapsed: ElapsedTime::Unavailable,
            distance_km: None,
            recording_active: false,
            seconds_recorded: 0,
        }
    }

    pub fn origin(&self) -> &SessionOrigin {
        &self.origin
    }

    pub fn elapsed(&self) -> ElapsedTime {
        self.elapsed
    }

    pub fn distance_km(&self) -> Option<f64> {
        self.distance_km
    }

    pub fn recording_active(&self) -> bool {
        self.recording_active
    }

    pub fn seconds_recorded(&self) -> u64 {
        self.seconds_recorded
    }

    pub fn state(&self) -> LatchState {
        if self.origin.start_timestamp.is_some() {
            LatchState::Tracking
        } else if self.origin.latitude.is_some() && self.origin.longitude.is_some() {
            LatchState::OriginLatched
        } else {
            LatchState::Uninitialized
        }
    }

    pub fn set_recording_active(&mut self, active: bool) {
        self.recording_active = active;
    }

    /// Counts a completed tick and returns the new total.
    pub fn record_tick(&mut self) -> u64 {
        self.seconds_recorded += 1;
        self.seconds_recorded
    }

    /// Folds a snapshot into the session. `None` means no fix is available yet.
    pub fn advance(&mut self, fix: Option<&GeoFix>) {
        if let Some(fix) = fix {
            self.origin.latch_position(fix, self.latch_mode);

            if let Some(utc) = fix.utc.as_deref() {
                self.origin.latch_start(utc);

                if let Some(start) = self.origin.start_timestamp.as_deref().filter(|_| is_date_like(utc)) {
                    self.elapsed = match elapsed_between(start, truncate_timestamp(utc)) {
                        Some(delta) => ElapsedTime::Active(delta),
                        None => ElapsedTime::Unavailable,
                    };
                }
            }

            self.distance_km = fix.position().map(|position| haversine_distance_km(self.origin.coordinates(), position));
        } else {
            self.distance_km = None;
        }

        if !self.recording_active {
            self.elapsed = ElapsedTime::Off;
        }
    }
}

fn is_date_like(utc: &str) -> bool {
    utc.contains('-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use pretty_assertions::assert_eq;

    fn fix(latitude: Option<f64>, longitude: Option<f64>, utc: Option<&str>) -> GeoFix {
        GeoFix {
            latitude,
            longitude,
            utc: utc.map(str::to_string),
            ..GeoFix::default()
        }
    }

    fn recording_model(latch_mode: LatchMode) -> OverlayModel {
        let mut model = OverlayModel::new(latch_mode);
        model.set_recording_active(true);
        model
    }

    #[test]
    fn starts_uninitialized() {
        let model = OverlayModel::new(LatchMode::PerAxis);

        assert_eq!(model.state(), LatchState::Uninitialized);
        assert_eq!(model.origin(), &SessionOrigin::default());
        assert_eq!(model.distance_km(), None);
    }

    #[test]
    fn origin_latches_exactly_once() {
        let mut model = recording_model(LatchMode::PerAxis);

        model.advance(Some(&fix(Some(10.0), Some(20.0), None)));
        model.advance(Some(&fix(Some(11.0), Some(21.0), None)));
        model.advance(Some(&fix(Some(12.0), Some(22.0), None)));

        assert_eq!(model.state(), LatchState::OriginLatched);
        assert_eq!(model.origin().latitude(), Some(10.0));
        assert_eq!(model.origin().longitude(), Some(20.0));
    }

    #[test]
    fn origin_does_not_latch_without_a_fix() {
        let mut model = recording_model(LatchMode::PerAxis);

        model.advance(None);
        model.advance(Some(&fix(None, None, None)));

        assert_eq!(model.state(), LatchState::Uninitialized);
    }

    #[test]
    fn per_axis_latching_accepts_a_partial_origin() {
        let mut model = recording_model(LatchMode::PerAxis);

        model.advance(Some(&fix(Some(10.0), None, None)));
        assert_eq!(model.origin().latitude(), Some(10.0));
        assert_eq!(model.origin().longitude(), None);
        assert_eq!(model.state(), LatchState::Uninitialized);

        model.advance(Some(&fix(Some(11.0), Some(20.0), None)));
        assert_eq!(model.origin().latitude(), Some(10.0));
        assert_eq!(model.origin().longitude(), Some(20.0));
        assert_eq!(model.state(), LatchState::OriginLatched);
    }

    #[test]
    fn partial_origin_measures_the_missing_axis_from_zero() {
        let mut model = recording_model(LatchMode::PerAxis);

        model.advance(Some(&fix(Some(10.0), None, None)));
        model.advance(Some(&fix(Some(10.0), Some(1.0), None)));

        // Longitude latched on this tick as well, so the distance is back to zero
        assert_eq!(model.distance_km(), Some(0.0));
    }

    #[test]
    fn atomic_latching_waits_for_a_full_position() {
        let mut model = recording_model(LatchMode::Atomic);

        model.advance(Some(&fix(Some(10.0), None, None)));
        assert_eq!(model.origin().latitude(), None);

        model.advance(Some(&fix(Some(11.0), Some(20.0), None)));
        assert_eq!(model.origin().latitude(), Some(11.0));
        assert_eq!(model.origin().longitude(), Some(20.0));
        assert_eq!(model.distance_km(), Some(0.0));
    }

    #[test]
    fn distance_is_measured_from_the_origin() {
        let mut model = recording_model(LatchMode::PerAxis);

        model.advance(Some(&fix(Some(10.0), Some(20.0), None)));
        model.advance(Some(&fix(Some(10.001), Some(20.001), None)));

        let distance = model.distance_km().unwrap();
        assert!(distance > 0.15 && distance < 0.16, "unexpected distance {}", distance);
    }

    #[test]
    fn distance_is_unavailable_without_a_position() {
        let mut model = recording_model(LatchMode::PerAxis);

        model.advance(Some(&fix(Some(10.0), Some(20.0), None)));
        model.advance(Some(&fix(None, None, None)));

        assert_eq!(model.distance_km(), None);
    }

    #[test]
    fn tracks_elapsed_time_from_the_first_timestamp() {
        let mut model = recording_model(LatchMode::PerAxis);

        model.advance(Some(&fix(None, None, Some("2024-01-01T00:00:00.000Z"))));
        assert_eq!(model.state(), LatchState::Tracking);
        assert_eq!(model.elapsed(), ElapsedTime::Active(TimeDelta::zero()));

        model.advance(Some(&fix(None, None, Some("2024-01-01T00:00:10.000Z"))));
        assert_eq!(model.origin().start_timestamp(), Some("2024-01-01T00:00:00"));
        assert_eq!(model.elapsed(), ElapsedTime::Active(TimeDelta::seconds(10)));
    }

    #[test]
    fn ignores_timestamps_that_are_not_date_like() {
        let mut model = recording_model(LatchMode::PerAxis);

        model.advance(Some(&fix(None, None, Some("n/a"))));
        model.advance(Some(&fix(None, None, Some("00:00:10"))));

        assert_eq!(model.origin().start_timestamp(), None);
        assert_eq!(model.elapsed(), ElapsedTime::Unavailable);
    }

    #[test]
    fn keeps_the_last_elapsed_time_when_the_timestamp_drops_out() {
        let mut model = recording_model(LatchMode::PerAxis);

        model.advance(Some(&fix(None, None, Some("2024-01-01T00:00:00"))));
        model.advance(Some(&fix(None, None, Some("2024-01-01T00:00:05"))));
        model.advance(Some(&fix(None, None, None)));

        assert_eq!(model.elapsed(), ElapsedTime::Active(TimeDelta::seconds(5)));
    }

    #[test]
    fn negative_elapsed_time_is_not_clamped() {
        let mut model = recording_model(LatchMode::PerAxis);

        model.advance(Some(&fix(None, None, Some("2024-01-01T00:00:10"))));
        model.advance(Some(&fix(None, None, Some("2024-01-01T00:00:00"))));

        assert_eq!(model.elapsed(), ElapsedTime::Active(TimeDelta::seconds(-10)));
    }

    #[test]
    fn elapsed_time_is_off_while_not_recording() {
        let mut model = OverlayModel::new(LatchMode::PerAxis);

        model.advance(Some(&fix(None, None, Some("2024-01-01T00:00:00"))));
        model.advance(Some(&fix(None, None, Some("2024-01-01T00:00:10"))));

        assert_eq!(model.state(), LatchState::Tracking);
        assert_eq!(model.elapsed(), ElapsedTime::Off);
    }

    #[test]
    fn counts_ticks() {
        let mut model = OverlayModel::new(LatchMode::PerAxis);

        assert_eq!(model.record_tick(), 1);
        assert_eq!(model.record_tick(), 2);
        assert_eq!(model.seconds_recorded(), 2);
    }
}
