use chrono::{NaiveDateTime, TimeDelta};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Marker gpsd clients use for a field that has not been acquired yet.
pub const UNAVAILABLE: &str = "n/a";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Great-circle distance in kilometers between two `(latitude, longitude)` pairs in degrees.
/// Coordinates are not range checked.
pub fn haversine_distance_km(origin: (f64, f64), destination: (f64, f64)) -> f64 {
    let (lat1, lon1) = origin;
    let (lat2, lon2) = destination;

    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2) + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Returns `now - start` for two `YYYY-MM-DDTHH:MM:SS` timestamps, or `None` when either cannot be parsed.
/// A negative delta is returned as is when the clock went backwards.
pub fn elapsed_between(start: &str, now: &str) -> Option<TimeDelta> {
    if start == UNAVAILABLE {
        return None;
    }

    let start = NaiveDateTime::parse_from_str(start, TIMESTAMP_FORMAT).ok()?;
    let now = NaiveDateTime::parse_from_str(now, TIMESTAMP_FORMAT).ok()?;
    Some(now - start)
}

/// Strips fractional seconds and the zone designator from a gpsd UTC timestamp,
/// e.g. `2024-01-01T00:00:00.000Z` becomes `2024-01-01T00:00:00`.
pub fn truncate_timestamp(utc: &str) -> &str {
    let whole_seconds = utc.split('.').next().unwrap_or(utc);
    whole_seconds.trim_end_matches('Z')
}
