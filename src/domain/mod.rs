mod elapsed_time;
mod geo_fix;

pub use elapsed_time::ElapsedTime;
pub use geo_fix::{FixMode, GeoFix};
