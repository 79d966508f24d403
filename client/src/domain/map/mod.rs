//! Map surface: basemap styling, pin placement and report markers.

pub mod markers;
pub mod pin_placement;
pub mod style;
mod surface;

pub use pin_placement::{PinPlacement, PlacementEffect};
pub use style::{Basemap, apply_campus_style};
pub use surface::{FOCUS_DURATION, FOCUS_ZOOM, MapEvent, MapMode, MapSurface, SurfaceEvent};
