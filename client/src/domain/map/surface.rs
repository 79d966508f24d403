//! Map surface: pin placement plus report markers over one widget instance.

use std::time::Duration;

use tracing::debug;

use super::markers::{pending_marker, report_marker};
use super::pin_placement::{PinPlacement, PlacementEffect};
use super::style::apply_campus_style;
use crate::domain::ports::{CameraTarget, MapWidget, MarkerHandle};
use crate::domain::{Coordinates, Report, ReportId, UserId};

/// Zoom used when focusing a selected report.
pub const FOCUS_ZOOM: f64 = 18.0;
/// Duration of the animated flight to a selected report.
pub const FOCUS_DURATION: Duration = Duration::from_millis(1500);

/// Which reports a surface shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapMode {
    /// Only reports owned by this user are drawn.
    SingleUser { owner: UserId },
    /// Every report is drawn and selection focuses the camera.
    Admin,
}

/// Interaction reported by the widget host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapEvent {
    /// The base style finished loading.
    Loaded,
    /// Click on the map away from any marker.
    Clicked(Coordinates),
    /// The pending pin was dragged.
    PendingPinDragged(Coordinates),
    /// The pending pin was clicked.
    PendingPinClicked,
    /// A report marker was clicked.
    ReportMarkerClicked(MarkerHandle),
}

/// Events the surface raises for its screen.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// The user confirmed a location; open the submission dialog.
    LocationConfirmed(Coordinates),
    /// The user picked a report on the map.
    ReportSelected(ReportId),
}

/// Owns a map widget for the lifetime of a screen.
///
/// Dropping the surface releases the widget, so a screen torn down halfway
/// through an operation still detaches listeners and destroys the instance.
pub struct MapSurface<W: MapWidget> {
    widget: W,
    mode: MapMode,
    placement: PinPlacement,
    pending_pin: Option<MarkerHandle>,
    report_markers: Vec<(ReportId, MarkerHandle)>,
}

impl<W: MapWidget> MapSurface<W> {
    /// Take ownership of a freshly created widget.
    pub fn mount(widget: W, mode: MapMode) -> Self {
        Self {
            widget,
            mode,
            placement: PinPlacement::default(),
            pending_pin: None,
            report_markers: Vec::new(),
        }
    }

    /// Feed one widget interaction through the surface.
    pub fn handle(&mut self, event: MapEvent) -> Option<SurfaceEvent> {
        match event {
            MapEvent::Loaded => {
                apply_campus_style(&mut self.widget);
                None
            }
            MapEvent::Clicked(at) => {
                let effect = self.placement.map_clicked(at);
                self.apply(effect)
            }
            MapEvent::PendingPinDragged(at) => {
                let effect = self.placement.pin_dragged(at);
                self.apply(effect)
            }
            MapEvent::PendingPinClicked => {
                // The widget is authoritative for where the pin ended up.
                if let Some(at) = self
                    .pending_pin
                    .and_then(|pin| self.widget.marker_position(pin))
                {
                    self.placement.pin_dragged(at);
                }
                let effect = self.placement.pin_clicked();
                self.apply(effect)
            }
            MapEvent::ReportMarkerClicked(handle) => self
                .report_markers
                .iter()
                .find(|(_, marker)| *marker == handle)
                .map(|(id, _)| SurfaceEvent::ReportSelected(id.clone())),
        }
    }

    fn apply(&mut self, effect: PlacementEffect) -> Option<SurfaceEvent> {
        match effect {
            PlacementEffect::Nothing | PlacementEffect::Moved(_) => None,
            PlacementEffect::PlacePin(at) => {
                debug!(lat = at.lat(), lng = at.lng(), "pending pin placed");
                self.pending_pin = Some(self.widget.add_marker(pending_marker(at)));
                None
            }
            PlacementEffect::Confirmed(at) => {
                debug!(lat = at.lat(), lng = at.lng(), "pending pin confirmed");
                self.remove_pending_pin();
                Some(SurfaceEvent::LocationConfirmed(at))
            }
            PlacementEffect::Discarded => {
                self.remove_pending_pin();
                None
            }
        }
    }

    fn remove_pending_pin(&mut self) {
        if let Some(pin) = self.pending_pin.take() {
            self.widget.remove_marker(pin);
        }
    }

    /// Abandon any pending pin and return to idle.
    pub fn cancel_pending(&mut self) {
        let effect = self.placement.cancel();
        self.apply(effect);
        self.remove_pending_pin();
    }

    /// Switch display mode, e.g. after the identity changed. Re-render afterwards.
    pub fn set_mode(&mut self, mode: MapMode) {
        self.mode = mode;
    }

    /// Replace every report marker with markers for `reports`.
    ///
    /// In single-user mode reports owned by someone else are skipped.
    pub fn render_reports(&mut self, reports: &[Report]) {
        for (_, marker) in self.report_markers.drain(..) {
            self.widget.remove_marker(marker);
        }
        let visible: Vec<&Report> = reports.iter().filter(|report| self.shows(report)).collect();
        for report in visible {
            let handle = self.widget.add_marker(report_marker(report));
            self.report_markers.push((report.id().clone(), handle));
        }
        debug!(markers = self.report_markers.len(), "report markers rebuilt");
    }

    fn shows(&self, report: &Report) -> bool {
        match &self.mode {
            MapMode::SingleUser { owner } => report.owner_id() == owner,
            MapMode::Admin => true,
        }
    }

    /// Fly to a selected report. Only admin surfaces follow selection.
    pub fn focus(&mut self, report: &Report) {
        if self.mode != MapMode::Admin {
            return;
        }
        self.widget.fly_to(CameraTarget {
            center: report.coordinates(),
            zoom: FOCUS_ZOOM,
            duration: FOCUS_DURATION,
        });
    }

    /// Current pin placement state.
    #[must_use]
    pub const fn placement(&self) -> &PinPlacement {
        &self.placement
    }

    /// Display mode.
    #[must_use]
    pub const fn mode(&self) -> &MapMode {
        &self.mode
    }

    /// Marker handle drawn for `id`, if it is on the map.
    #[must_use]
    pub fn marker_for(&self, id: &ReportId) -> Option<MarkerHandle> {
        self.report_markers
            .iter()
            .find(|(report, _)| report == id)
            .map(|(_, marker)| *marker)
    }

    /// The pending pin handle while placing.
    #[must_use]
    pub const fn pending_pin(&self) -> Option<MarkerHandle> {
        self.pending_pin
    }

    /// Read access to the widget.
    #[must_use]
    pub const fn widget(&self) -> &W {
        &self.widget
    }

    /// Mutable access for host-driven interaction such as drags.
    pub fn widget_mut(&mut self) -> &mut W {
        &mut self.widget
    }
}

impl<W: MapWidget> Drop for MapSurface<W> {
    fn drop(&mut self) {
        self.widget.release();
    }
}

#[cfg(test)]
mod tests {
    //! Behaviour of the surface against the headless widget.
    use super::*;
    use crate::domain::map::markers::{OPEN_COLOR, RESOLVED_COLOR};
    use crate::domain::{NewReport, ReportCategory, ReportStatus};
    use crate::outbound::headless_map::{HeadlessMap, MapCall};
    use chrono::Utc;

    fn at(lat: f64, lng: f64) -> Coordinates {
        Coordinates::new(lat, lng).expect("coords")
    }

    fn report(id: &str, owner: &UserId, status: ReportStatus) -> Report {
        Report::new(
            ReportId::new(id),
            NewReport::new(at(12.97, 79.16), ReportCategory::Safety, None, None, owner.clone()),
            status,
            Utc::now(),
        )
    }

    #[test]
    fn place_drag_confirm_emits_the_dragged_coordinate() {
        let mut surface = MapSurface::mount(HeadlessMap::default(), MapMode::Admin);

        assert_eq!(surface.handle(MapEvent::Clicked(at(12.97, 79.16))), None);
        let pin = surface.pending_pin().expect("pin placed");
        surface.widget_mut().drag_marker(pin, at(12.971, 79.161));
        surface.handle(MapEvent::PendingPinDragged(at(12.971, 79.161)));

        let event = surface.handle(MapEvent::PendingPinClicked);

        assert_eq!(
            event,
            Some(SurfaceEvent::LocationConfirmed(at(12.971, 79.161)))
        );
        assert_eq!(surface.pending_pin(), None);
        assert!(surface.widget().markers().is_empty());
        assert_eq!(surface.placement(), &PinPlacement::Idle);
    }

    #[test]
    fn second_click_while_placing_does_not_add_a_pin() {
        let mut surface = MapSurface::mount(HeadlessMap::default(), MapMode::Admin);
        surface.handle(MapEvent::Clicked(at(1.0, 1.0)));
        surface.handle(MapEvent::Clicked(at(2.0, 2.0)));
        assert_eq!(surface.widget().markers().len(), 1);
    }

    #[test]
    fn single_user_mode_hides_foreign_reports() {
        let me = UserId::random();
        let other = UserId::random();
        let mut surface = MapSurface::mount(
            HeadlessMap::default(),
            MapMode::SingleUser { owner: me.clone() },
        );

        surface.render_reports(&[
            report("1", &me, ReportStatus::Open),
            report("2", &other, ReportStatus::Open),
        ]);

        assert!(surface.marker_for(&ReportId::new("1")).is_some());
        assert!(surface.marker_for(&ReportId::new("2")).is_none());
    }

    #[test]
    fn rerender_rebuilds_markers_with_new_colours() {
        let owner = UserId::random();
        let mut surface = MapSurface::mount(HeadlessMap::default(), MapMode::Admin);
        surface.render_reports(&[report("1", &owner, ReportStatus::Open)]);
        let first = surface.marker_for(&ReportId::new("1")).expect("marker");
        assert_eq!(surface.widget().marker(first).map(|m| m.color), Some(OPEN_COLOR));

        surface.render_reports(&[report("1", &owner, ReportStatus::Resolved)]);
        let second = surface.marker_for(&ReportId::new("1")).expect("marker");

        assert_ne!(first, second);
        assert_eq!(surface.widget().markers().len(), 1);
        assert_eq!(
            surface.widget().marker(second).map(|m| m.color),
            Some(RESOLVED_COLOR)
        );
    }

    #[test]
    fn clicking_a_report_marker_selects_it() {
        let owner = UserId::random();
        let mut surface = MapSurface::mount(HeadlessMap::default(), MapMode::Admin);
        surface.render_reports(&[report("9", &owner, ReportStatus::Open)]);
        let handle = surface.marker_for(&ReportId::new("9")).expect("marker");

        assert_eq!(
            surface.handle(MapEvent::ReportMarkerClicked(handle)),
            Some(SurfaceEvent::ReportSelected(ReportId::new("9")))
        );
    }

    #[test]
    fn focus_flies_only_in_admin_mode() {
        let owner = UserId::random();
        let target = report("3", &owner, ReportStatus::Open);

        let mut admin = MapSurface::mount(HeadlessMap::default(), MapMode::Admin);
        admin.focus(&target);
        assert_eq!(
            admin.widget().camera(),
            Some(CameraTarget {
                center: at(12.97, 79.16),
                zoom: FOCUS_ZOOM,
                duration: FOCUS_DURATION,
            })
        );

        let mut home = MapSurface::mount(
            HeadlessMap::default(),
            MapMode::SingleUser { owner: owner.clone() },
        );
        home.focus(&target);
        assert_eq!(home.widget().camera(), None);
    }

    #[test]
    fn dropping_the_surface_releases_the_widget() {
        let map = HeadlessMap::default();
        let journal = map.journal();
        drop(MapSurface::mount(map, MapMode::Admin));
        assert_eq!(journal.calls().last(), Some(&MapCall::Release));
    }
}
