//! Port for the third-party map rendering widget.
//!
//! The widget is imperative: it is created once per screen, mutated through
//! these calls and destroyed with [`MapWidget::release`]. User interaction
//! reaches the application as [`crate::domain::map::MapEvent`] values fed in
//! by the host.

use std::time::Duration;

use crate::domain::Coordinates;

/// Opaque handle to a marker placed on the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerHandle(pub u64);

/// Visual description of a marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    /// Anchor position.
    pub position: Coordinates,
    /// CSS colour of the marker body.
    pub color: &'static str,
    /// Whether the user may drag the marker.
    pub draggable: bool,
    /// Hover hint.
    pub title: Option<String>,
    /// Escaped HTML shown in the popup.
    pub popup_html: Option<String>,
}

/// A line layer added on top of the base style.
#[derive(Debug, Clone, PartialEq)]
pub struct LineLayer {
    pub id: &'static str,
    pub source: &'static str,
    pub source_layer: &'static str,
    pub line_color: &'static str,
    pub line_width: f64,
}

/// Options of the "locate me" control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeolocateControl {
    pub enable_high_accuracy: bool,
    pub track_user_location: bool,
    pub show_user_heading: bool,
}

/// Corner a control is docked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Animated camera move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTarget {
    pub center: Coordinates,
    pub zoom: f64,
    pub duration: Duration,
}

/// Operations the application performs on a live map widget.
pub trait MapWidget {
    /// Whether the base style defines `layer_id`.
    fn has_layer(&self, layer_id: &str) -> bool;

    /// Whether the base style defines `source_id`.
    fn has_source(&self, source_id: &str) -> bool;

    /// Override a paint property of an existing layer.
    fn set_paint_property(&mut self, layer_id: &str, property: &str, value: &str);

    /// Add a line layer.
    fn add_layer(&mut self, layer: LineLayer);

    /// Dock a geolocation control.
    fn add_control(&mut self, control: GeolocateControl, position: ControlPosition);

    /// Place a marker and return its handle.
    fn add_marker(&mut self, marker: MarkerSpec) -> MarkerHandle;

    /// Current position of a marker, reflecting any drags.
    fn marker_position(&self, handle: MarkerHandle) -> Option<Coordinates>;

    /// Remove a marker; unknown handles are ignored.
    fn remove_marker(&mut self, handle: MarkerHandle);

    /// Animate the camera.
    fn fly_to(&mut self, target: CameraTarget);

    /// Detach every listener and destroy the widget instance.
    fn release(&mut self);
}
