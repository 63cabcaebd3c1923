use chrono::TimeDelta;
use std::fmt::{Display, Formatter};

/// Time spent recording as shown on the overlay.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub enum ElapsedTime {
    #[default]
    Unavailable,
    Off,
    Active(TimeDelta),
}

impl Display for ElapsedTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ElapsedTime::Unavailable => write!(f, "n/a"),
            ElapsedTime::Off => write!(f, "OFF"),
            ElapsedTime::Active(delta) => {
                let sign = if *delta < TimeDelta::zero() { "-" } else { "" };
                let seconds = delta.num_seconds().unsigned_abs();
                write!(f, "{}{}:{:02}:{:02}", sign, seconds / 3600, (seconds / 60) % 60, seconds % 60)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ElapsedTime::Unavailable, "n/a")]
    #[case(ElapsedTime::Off, "OFF")]
    #[case(ElapsedTime::Active(TimeDelta::seconds(0)), "0:00:00")]
    #[case(ElapsedTime::Active(TimeDelta::seconds(10)), "0:00:10")]
    #[case(ElapsedTime::Active(TimeDelta::seconds(3_725)), "1:02:05")]
    #[case(ElapsedTime::Active(TimeDelta::seconds(-5)), "-0:00:05")]
    fn formats_for_the_overlay(#[case] elapsed: ElapsedTime, #[case] expected: &str) {
        assert_eq!(elapsed.to_string(), expected);
    }
}
