//! Movement gating for search triggers
//!
//! Location fixes arrive about once a second while the user barely
//! moves; running a nearby-place search on every tick would hammer the
//! collaborator for identical answers. The MovementGate anchors the
//! last searched location and only opens once the user has moved beyond
//! a configured threshold.
//!
//! The anchor advances through `mark_searched` only after a search
//! completes without transport failure (success or confirmed-empty). A
//! failed search leaves the gate where it was, so the next tick retries
//! without requiring movement.

use kompas_core::GeoPoint;

/// Distance-threshold gate over location updates
#[derive(Debug, Clone)]
pub struct MovementGate {
    /// Meters of movement required before a new search
    threshold_m: f64,
    /// Last location a search ran against
    anchor: Option<GeoPoint>,
}

impl MovementGate {
    /// Create a gate with the given threshold in meters
    pub fn new(threshold_m: f64) -> Self {
        Self {
            threshold_m,
            anchor: None,
        }
    }

    /// Check whether a search is warranted at `current`
    ///
    /// Returns `true` when no search has run yet, or when `current` is
    /// strictly farther than the threshold from the anchor. Exactly at
    /// the threshold does not trigger.
    pub fn should_search(&self, current: GeoPoint) -> bool {
        match self.anchor {
            None => true,
            Some(anchor) => anchor.distance_m(current) > self.threshold_m,
        }
    }

    /// Record that a search ran against `current`
    pub fn mark_searched(&mut self, current: GeoPoint) {
        self.anchor = Some(current);
    }

    /// Meters from the anchor to `current`, if an anchor exists
    pub fn distance_from_anchor(&self, current: GeoPoint) -> Option<f64> {
        self.anchor.map(|anchor| anchor.distance_m(current))
    }

    /// The last searched location
    pub fn anchor(&self) -> Option<GeoPoint> {
        self.anchor
    }

    /// The configured threshold in meters
    pub fn threshold_m(&self) -> f64 {
        self.threshold_m
    }

    /// Drop the anchor, so the next update searches unconditionally
    pub fn reset(&mut self) {
        self.anchor = None;
    }
}
