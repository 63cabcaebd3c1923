use crate::domain::GeoFix;
use crate::geo_math::UNAVAILABLE;
use crate::overlay::OverlayModel;

/// Text for the top band: velocity and receiver status.
pub fn top_text(fix: &GeoFix) -> String {
    format!(
        "Spd: {}  Climb:{}  Dir: {}  Sats: {} Mode: {}",
        fixed(fix.speed, 2),
        fixed(fix.climb, 2),
        plain(fix.track),
        fix.satellites,
        fix.mode
    )
}

/// Text for the bottom band: position, distance from the origin and recording time.
pub fn bottom_text(model: &OverlayModel, fix: &GeoFix) -> String {
    // The distance is in kilometers, the "m" suffix is what the overlay has always shown
    format!(
        "Alt: {}m  Loc: {}, {}   Home: {}m    Rec: {}",
        plain(fix.altitude),
        fixed(fix.latitude, 5),
        fixed(fix.longitude, 5),
        fixed(model.distance_km(), 2),
        model.elapsed()
    )
}

fn fixed(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(value) => format!("{:.*}", precision, value),
        None => UNAVAILABLE.to_string(),
    }
}

fn plain(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{:?}", value),
        None => UNAVAILABLE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FixMode;
    use crate::overlay::LatchMode;
    use pretty_assertions::assert_eq;

    fn full_fix() -> GeoFix {
        GeoFix {
            latitude: Some(51.8615899),
            longitude: Some(4.3580323),
            altitude: Some(12.0),
            speed: Some(1.234),
            climb: Some(-0.5),
            track: Some(270.5),
            utc: Some("2024-01-01T00:00:00.000Z".to_string()),
            satellites: 9,
            mode: FixMode::Fix3D,
        }
    }

    #[test]
    fn top_text_for_a_full_fix() {
        assert_eq!(top_text(&full_fix()), "Spd: 1.23  Climb:-0.50  Dir: 270.5  Sats: 9 Mode: 3");
    }

    #[test]
    fn top_text_without_a_fix() {
        assert_eq!(top_text(&GeoFix::default()), "Spd: n/a  Climb:n/a  Dir: n/a  Sats: 0 Mode: 1");
    }

    #[test]
    fn bottom_text_for_a_full_fix() {
        let mut model = OverlayModel::new(LatchMode::PerAxis);
        model.set_recording_active(true);
        model.advance(Some(&full_fix()));

        assert_eq!(bottom_text(&model, &full_fix()), "Alt: 12.0m  Loc: 51.86159, 4.35803   Home: 0.00m    Rec: 0:00:00");
    }

    #[test]
    fn bottom_text_without_a_fix() {
        let mut model = OverlayModel::new(LatchMode::PerAxis);
        model.set_recording_active(true);
        model.advance(None);

        assert_eq!(bottom_text(&model, &GeoFix::default()), "Alt: n/am  Loc: n/a, n/a   Home: n/am    Rec: n/a");
    }

    #[test]
    fn bottom_text_shows_off_when_not_recording() {
        let mut model = OverlayModel::new(LatchMode::PerAxis);
        model.advance(Some(&full_fix()));

        assert!(bottom_text(&model, &full_fix()).ends_with("Rec: OFF"));
    }
}
