//! Two-step pin placement: place a draggable pin, then click it to confirm.

use crate::domain::Coordinates;

/// Placement state of one map instance.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PinPlacement {
    /// No pending pin.
    #[default]
    Idle,
    /// A draggable pin waits for confirmation.
    Placing { at: Coordinates },
}

/// What the surface must do to the widget after a transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlacementEffect {
    /// Event ignored in the current state.
    Nothing,
    /// Create the pending pin.
    PlacePin(Coordinates),
    /// The pin moved; the widget already shows it.
    Moved(Coordinates),
    /// Remove the pin and hand the coordinate to the dialog.
    Confirmed(Coordinates),
    /// Remove the pin without confirming.
    Discarded,
}

impl PinPlacement {
    /// A click on empty map surface.
    pub fn map_clicked(&mut self, at: Coordinates) -> PlacementEffect {
        match self {
            Self::Idle => {
                *self = Self::Placing { at };
                PlacementEffect::PlacePin(at)
            }
            // One pending pin at a time.
            Self::Placing { .. } => PlacementEffect::Nothing,
        }
    }

    /// The pending pin was dragged to `at`.
    pub fn pin_dragged(&mut self, at: Coordinates) -> PlacementEffect {
        match self {
            Self::Idle => PlacementEffect::Nothing,
            Self::Placing { at: current } => {
                *current = at;
                PlacementEffect::Moved(at)
            }
        }
    }

    /// The pending pin itself was clicked.
    pub fn pin_clicked(&mut self) -> PlacementEffect {
        match *self {
            Self::Idle => PlacementEffect::Nothing,
            Self::Placing { at } => {
                *self = Self::Idle;
                PlacementEffect::Confirmed(at)
            }
        }
    }

    /// Drop any pending pin.
    pub fn cancel(&mut self) -> PlacementEffect {
        match self {
            Self::Idle => PlacementEffect::Nothing,
            Self::Placing { .. } => {
                *self = Self::Idle;
                PlacementEffect::Discarded
            }
        }
    }

    /// Coordinate of the pending pin, if any.
    #[must_use]
    pub const fn pending(&self) -> Option<Coordinates> {
        match self {
            Self::Idle => None,
            Self::Placing { at } => Some(*at),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Transition coverage for pin placement.
    use super::*;

    fn at(lat: f64, lng: f64) -> Coordinates {
        Coordinates::new(lat, lng).expect("coords")
    }

    #[test]
    fn click_places_then_later_clicks_are_ignored() {
        let mut placement = PinPlacement::default();
        assert_eq!(
            placement.map_clicked(at(12.97, 79.16)),
            PlacementEffect::PlacePin(at(12.97, 79.16))
        );
        assert_eq!(placement.map_clicked(at(1.0, 1.0)), PlacementEffect::Nothing);
        assert_eq!(placement.pending(), Some(at(12.97, 79.16)));
    }

    #[test]
    fn dragging_keeps_placing_and_confirm_uses_the_last_position() {
        let mut placement = PinPlacement::default();
        placement.map_clicked(at(12.97, 79.16));
        placement.pin_dragged(at(12.9701, 79.1602));

        assert_eq!(
            placement.pin_clicked(),
            PlacementEffect::Confirmed(at(12.9701, 79.1602))
        );
        assert_eq!(placement, PinPlacement::Idle);
    }

    #[test]
    fn idle_ignores_pin_events_and_cancel() {
        let mut placement = PinPlacement::Idle;
        assert_eq!(placement.pin_dragged(at(0.0, 0.0)), PlacementEffect::Nothing);
        assert_eq!(placement.pin_clicked(), PlacementEffect::Nothing);
        assert_eq!(placement.cancel(), PlacementEffect::Nothing);
    }

    #[test]
    fn cancel_discards_the_pending_pin() {
        let mut placement = PinPlacement::default();
        placement.map_clicked(at(5.0, 5.0));
        assert_eq!(placement.cancel(), PlacementEffect::Discarded);
        assert_eq!(placement.pending(), None);
    }
}
