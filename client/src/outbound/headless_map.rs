//! Headless map widget.
//!
//! Keeps the widget state in memory so the surface logic can run without a
//! renderer: the CLI drives it directly and tests inspect what was drawn.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::domain::Coordinates;
use crate::domain::map::Basemap;
use crate::domain::ports::{
    CameraTarget, ControlPosition, GeolocateControl, LineLayer, MapWidget, MarkerHandle,
    MarkerSpec,
};

/// Layers the default bright style ships with.
const BRIGHT_LAYERS: &[&str] = &[
    "landcover",
    "landuse",
    "water",
    "waterway",
    "building",
    "road_motorway",
    "road_motorway_casing",
    "road_trunk",
    "road_trunk_casing",
    "road_primary",
    "road_primary_casing",
    "road_secondary",
    "road_secondary_casing",
    "road_tertiary",
    "road_tertiary_casing",
    "road_minor",
    "road_minor_casing",
    "road_service",
    "road_service_casing",
];
const BRIGHT_SOURCES: &[&str] = &["openmaptiles"];

/// One recorded widget mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum MapCall {
    SetPaint {
        layer: String,
        property: String,
        value: String,
    },
    AddLayer(&'static str),
    AddControl(ControlPosition),
    AddMarker(MarkerHandle),
    RemoveMarker(MarkerHandle),
    FlyTo(CameraTarget),
    Release,
}

/// Shared view of the calls a widget received, readable after the widget is gone.
#[derive(Debug, Clone, Default)]
pub struct MapJournal(Arc<Mutex<Vec<MapCall>>>);

impl MapJournal {
    fn push(&self, call: MapCall) {
        self.0
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(call);
    }

    /// Every call recorded so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<MapCall> {
        self.0
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

/// In-memory [`MapWidget`].
#[derive(Debug)]
pub struct HeadlessMap {
    basemap: Basemap,
    layers: HashSet<String>,
    sources: HashSet<String>,
    paint: HashMap<(String, String), String>,
    controls: Vec<(GeolocateControl, ControlPosition)>,
    markers: BTreeMap<MarkerHandle, MarkerSpec>,
    next_marker: u64,
    camera: Option<CameraTarget>,
    released: bool,
    journal: MapJournal,
}

impl HeadlessMap {
    /// Widget showing `basemap` with the layers of the default bright style.
    #[must_use]
    pub fn new(basemap: Basemap) -> Self {
        Self::with_style(basemap, BRIGHT_LAYERS, BRIGHT_SOURCES)
    }

    /// Widget whose base style defines exactly `layers` and `sources`.
    #[must_use]
    pub fn with_style(basemap: Basemap, layers: &[&str], sources: &[&str]) -> Self {
        Self {
            basemap,
            layers: layers.iter().map(|layer| (*layer).to_owned()).collect(),
            sources: sources.iter().map(|source| (*source).to_owned()).collect(),
            paint: HashMap::new(),
            controls: Vec::new(),
            markers: BTreeMap::new(),
            next_marker: 0,
            camera: None,
            released: false,
            journal: MapJournal::default(),
        }
    }

    /// Handle on the call journal.
    #[must_use]
    pub fn journal(&self) -> MapJournal {
        self.journal.clone()
    }

    /// Simulate the user dragging a marker.
    pub fn drag_marker(&mut self, handle: MarkerHandle, to: Coordinates) {
        match self.markers.get_mut(&handle) {
            Some(marker) if marker.draggable => marker.position = to,
            Some(_) => warn!(marker = handle.0, "ignored drag of a fixed marker"),
            None => warn!(marker = handle.0, "ignored drag of an unknown marker"),
        }
    }

    /// Starting camera.
    #[must_use]
    pub const fn basemap(&self) -> &Basemap {
        &self.basemap
    }

    /// Live markers keyed by handle.
    #[must_use]
    pub const fn markers(&self) -> &BTreeMap<MarkerHandle, MarkerSpec> {
        &self.markers
    }

    /// A live marker.
    #[must_use]
    pub fn marker(&self, handle: MarkerHandle) -> Option<&MarkerSpec> {
        self.markers.get(&handle)
    }

    /// Current value of a paint override.
    #[must_use]
    pub fn paint_property(&self, layer: &str, property: &str) -> Option<&str> {
        self.paint
            .get(&(layer.to_owned(), property.to_owned()))
            .map(String::as_str)
    }

    /// Controls docked so far.
    #[must_use]
    pub fn controls(&self) -> &[(GeolocateControl, ControlPosition)] {
        &self.controls
    }

    /// Last camera flight.
    #[must_use]
    pub const fn camera(&self) -> Option<CameraTarget> {
        self.camera
    }

    /// Whether [`MapWidget::release`] ran.
    #[must_use]
    pub const fn is_released(&self) -> bool {
        self.released
    }

    fn live(&self, operation: &str) -> bool {
        if self.released {
            warn!(operation, "map widget already released");
        }
        !self.released
    }
}

impl Default for HeadlessMap {
    fn default() -> Self {
        Self::new(Basemap::default())
    }
}

impl MapWidget for HeadlessMap {
    fn has_layer(&self, layer_id: &str) -> bool {
        self.layers.contains(layer_id)
    }

    fn has_source(&self, source_id: &str) -> bool {
        self.sources.contains(source_id)
    }

    fn set_paint_property(&mut self, layer_id: &str, property: &str, value: &str) {
        if !self.live("set_paint_property") {
            return;
        }
        self.paint.insert(
            (layer_id.to_owned(), property.to_owned()),
            value.to_owned(),
        );
        self.journal.push(MapCall::SetPaint {
            layer: layer_id.to_owned(),
            property: property.to_owned(),
            value: value.to_owned(),
        });
    }

    fn add_layer(&mut self, layer: LineLayer) {
        if !self.live("add_layer") {
            return;
        }
        self.layers.insert(layer.id.to_owned());
        self.journal.push(MapCall::AddLayer(layer.id));
    }

    fn add_control(&mut self, control: GeolocateControl, position: ControlPosition) {
        if !self.live("add_control") {
            return;
        }
        self.controls.push((control, position));
        self.journal.push(MapCall::AddControl(position));
    }

    fn add_marker(&mut self, marker: MarkerSpec) -> MarkerHandle {
        self.next_marker += 1;
        let handle = MarkerHandle(self.next_marker);
        if self.live("add_marker") {
            self.markers.insert(handle, marker);
            self.journal.push(MapCall::AddMarker(handle));
        }
        handle
    }

    fn marker_position(&self, handle: MarkerHandle) -> Option<Coordinates> {
        self.markers.get(&handle).map(|marker| marker.position)
    }

    fn remove_marker(&mut self, handle: MarkerHandle) {
        if self.markers.remove(&handle).is_some() {
            self.journal.push(MapCall::RemoveMarker(handle));
        }
    }

    fn fly_to(&mut self, target: CameraTarget) {
        if !self.live("fly_to") {
            return;
        }
        self.camera = Some(target);
        self.journal.push(MapCall::FlyTo(target));
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.markers.clear();
        self.released = true;
        self.journal.push(MapCall::Release);
    }
}

#[cfg(test)]
mod tests {
    //! Coverage for the campus restyle against the headless widget.
    use super::*;
    use crate::domain::map::apply_campus_style;

    #[test]
    fn campus_style_overrides_existing_layers_only() {
        let mut map = HeadlessMap::default();
        apply_campus_style(&mut map);

        assert_eq!(map.paint_property("road_primary", "line-color"), Some("#FFFFFF"));
        assert_eq!(
            map.paint_property("road_primary_casing", "line-color"),
            Some("#CCCCCC")
        );
        assert_eq!(map.paint_property("landuse", "fill-color"), Some("#F0F2F5"));
        assert_eq!(map.paint_property("building", "fill-outline-color"), Some("#000000"));
        assert_eq!(map.paint_property("water", "fill-color"), Some("#0055A4"));
        // `road_street` is not part of the bright style.
        assert_eq!(map.paint_property("road_street", "line-color"), None);
        assert!(map.has_layer("building-outline"));
        assert_eq!(map.controls().len(), 1);
    }

    #[test]
    fn outline_layer_needs_the_tile_source() {
        let mut map = HeadlessMap::with_style(Basemap::default(), &["building"], &[]);
        apply_campus_style(&mut map);
        assert!(!map.has_layer("building-outline"));
        assert_eq!(map.paint_property("building", "fill-color"), Some("#E0E0E0"));
    }

    #[test]
    fn fixed_markers_cannot_be_dragged() {
        let mut map = HeadlessMap::default();
        let at = Coordinates::new(1.0, 1.0).expect("coords");
        let handle = map.add_marker(MarkerSpec {
            position: at,
            color: "#000000",
            draggable: false,
            title: None,
            popup_html: None,
        });
        map.drag_marker(handle, Coordinates::new(2.0, 2.0).expect("coords"));
        assert_eq!(map.marker_position(handle), Some(at));
    }

    #[test]
    fn release_is_idempotent_and_blocks_further_mutation() {
        let mut map = HeadlessMap::default();
        map.release();
        map.release();
        map.fly_to(CameraTarget {
            center: Coordinates::new(0.0, 0.0).expect("coords"),
            zoom: 3.0,
            duration: std::time::Duration::ZERO,
        });
        assert_eq!(map.camera(), None);
        assert_eq!(
            map.journal()
                .calls()
                .iter()
                .filter(|call| **call == MapCall::Release)
                .count(),
            1
        );
    }
}
