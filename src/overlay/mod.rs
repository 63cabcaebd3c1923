mod crosshair;
mod model;
mod renderer;
mod text;

pub use crosshair::CrosshairOverlay;
pub use model::{LatchMode, OverlayModel};
pub use renderer::{BAND_HEIGHT, BAND_WIDTH, OverlayRenderer, RenderError, blank_band};
