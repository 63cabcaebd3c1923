mod gpsd;
mod sampler;
mod source;

pub use gpsd::GpsdSource;
pub use sampler::GeoSampler;
pub use source::{GpsError, GpsSource};
