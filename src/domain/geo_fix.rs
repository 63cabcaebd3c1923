use std::fmt::{Display, Formatter};

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub enum FixMode {
    #[default]
    NoFix,
    Fix2D,
    Fix3D,
}

impl FixMode {
    /// Maps a gpsd `mode` number, where 0 means "unknown" and is treated like 1.
    pub fn from_gpsd(mode: u8) -> Self {
        match mode {
            2 => FixMode::Fix2D,
            3 => FixMode::Fix3D,
            _ => FixMode::NoFix,
        }
    }

    pub fn as_gpsd(&self) -> u8 {
        match self {
            FixMode::NoFix => 1,
            FixMode::Fix2D => 2,
            FixMode::Fix3D => 3,
        }
    }
}

impl Display for FixMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_gpsd())
    }
}

/// A single GPS reading. Fields the receiver has not acquired yet are `None`.
#[derive(Clone, PartialEq, Default, Debug)]
pub struct GeoFix {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>, // In meters
    pub speed: Option<f64>,
    pub climb: Option<f64>,
    pub track: Option<f64>, // In degrees
    pub utc: Option<String>,
    pub satellites: usize,
    pub mode: FixMode,
}

impl GeoFix {
    pub fn position(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, FixMode::NoFix)]
    #[case(1, FixMode::NoFix)]
    #[case(2, FixMode::Fix2D)]
    #[case(3, FixMode::Fix3D)]
    fn maps_gpsd_modes(#[case] mode: u8, #[case] expected: FixMode) {
        assert_eq!(FixMode::from_gpsd(mode), expected);
    }

    #[test]
    fn displays_the_gpsd_mode_number() {
        assert_eq!(FixMode::Fix3D.to_string(), "3");
        assert_eq!(FixMode::NoFix.to_string(), "1");
    }

    #[test]
    fn position_requires_both_axes() {
        let fix = GeoFix {
            latitude: Some(10.0),
            ..GeoFix::default()
        };
        assert_eq!(fix.position(), None);

        let fix = GeoFix {
            latitude: Some(10.0),
            longitude: Some(20.0),
            ..GeoFix::default()
        };
        assert_eq!(fix.position(), Some((10.0, 20.0)));
    }
}
