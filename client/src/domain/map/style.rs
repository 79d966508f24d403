//! Basemap defaults and the campus restyle applied once the widget loads.

use crate::domain::Coordinates;
use crate::domain::ports::{ControlPosition, GeolocateControl, LineLayer, MapWidget};

/// Default vector style.
pub const DEFAULT_STYLE_URL: &str = "https://tiles.openfreemap.org/styles/bright";
/// Campus centre latitude (VIT Vellore).
pub const CAMPUS_CENTER_LAT: f64 = 12.9698;
/// Campus centre longitude (VIT Vellore).
pub const CAMPUS_CENTER_LNG: f64 = 79.1595;
/// Campus centre as a position.
pub const CAMPUS_CENTER: Coordinates =
    Coordinates::from_trusted(CAMPUS_CENTER_LAT, CAMPUS_CENTER_LNG);
/// Initial zoom showing the whole campus.
pub const CAMPUS_ZOOM: f64 = 16.0;

const ROAD_LAYERS: [&str; 8] = [
    "road_motorway",
    "road_trunk",
    "road_primary",
    "road_secondary",
    "road_tertiary",
    "road_minor",
    "road_service",
    "road_street",
];
const ROAD_COLOR: &str = "#FFFFFF";
const ROAD_CASING_COLOR: &str = "#CCCCCC";
const LAND_LAYERS: [&str; 2] = ["landcover", "landuse"];
const LAND_COLOR: &str = "#F0F2F5";
const BUILDING_LAYER: &str = "building";
const BUILDING_FILL: &str = "#E0E0E0";
const BUILDING_OUTLINE: &str = "#000000";
const WATER_LAYERS: [&str; 2] = ["water", "waterway"];
const WATER_COLOR: &str = "#0055A4";
const TILE_SOURCE: &str = "openmaptiles";

/// Where and how a map widget starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Basemap {
    /// Style document URL.
    pub style_url: String,
    /// Initial camera centre.
    pub center: Coordinates,
    /// Initial zoom level.
    pub zoom: f64,
}

impl Basemap {
    /// Campus view using `style_url`.
    pub fn campus(style_url: impl Into<String>) -> Self {
        Self {
            style_url: style_url.into(),
            center: CAMPUS_CENTER,
            zoom: CAMPUS_ZOOM,
        }
    }
}

impl Default for Basemap {
    fn default() -> Self {
        Self::campus(DEFAULT_STYLE_URL)
    }
}

/// Restyle the loaded base style and add the campus extras.
///
/// Layers missing from the base style are skipped.
pub fn apply_campus_style<W: MapWidget>(widget: &mut W) {
    for road in ROAD_LAYERS {
        paint_if_present(widget, road, "line-color", ROAD_COLOR);
        let casing = format!("{road}_casing");
        paint_if_present(widget, &casing, "line-color", ROAD_CASING_COLOR);
    }

    for land in LAND_LAYERS {
        paint_if_present(widget, land, "fill-color", LAND_COLOR);
    }

    if widget.has_layer(BUILDING_LAYER) {
        widget.set_paint_property(BUILDING_LAYER, "fill-color", BUILDING_FILL);
        widget.set_paint_property(BUILDING_LAYER, "fill-outline-color", BUILDING_OUTLINE);
    }

    if widget.has_source(TILE_SOURCE) {
        widget.add_layer(LineLayer {
            id: "building-outline",
            source: TILE_SOURCE,
            source_layer: BUILDING_LAYER,
            line_color: BUILDING_OUTLINE,
            line_width: 1.0,
        });
    }

    for water in WATER_LAYERS {
        paint_if_present(widget, water, "fill-color", WATER_COLOR);
    }

    widget.add_control(
        GeolocateControl {
            enable_high_accuracy: true,
            track_user_location: true,
            show_user_heading: true,
        },
        ControlPosition::TopRight,
    );
}

fn paint_if_present<W: MapWidget>(widget: &mut W, layer: &str, property: &str, value: &str) {
    if widget.has_layer(layer) {
        widget.set_paint_property(layer, property, value);
    }
}
