//! Relative heading between the device and the current target
//!
//! The needle the user sees is not the target's absolute bearing but the
//! rotation from wherever the device is pointing:
//! `normalize_signed(target_bearing - device_heading)`. Positive means
//! rotate clockwise.

use kompas_core::normalize_signed;

/// Combines the target's absolute bearing with the device's compass
/// heading into a signed relative rotation.
///
/// Bearing and heading come from independent feeds and may update in any
/// order; the cached value is recomputed on every mutation, so the
/// result never depends on arrival order.
#[derive(Debug, Clone, Default)]
pub struct HeadingTracker {
    /// Absolute bearing to the target in [0, 360), when known
    target_bearing: Option<f64>,
    /// Device compass heading in [0, 360)
    device_heading: f64,
    /// Cached relative rotation, 0.0 while no target is known
    relative: f64,
}

impl HeadingTracker {
    /// Create a tracker with no target and a north-facing device
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the absolute bearing to the current target
    pub fn set_target_bearing(&mut self, bearing_deg: f64) {
        self.target_bearing = Some(bearing_deg);
        self.recompute();
    }

    /// Forget the current target; relative heading reverts to 0
    pub fn clear_target(&mut self) {
        self.target_bearing = None;
        self.recompute();
    }

    /// Set the device compass heading in degrees
    pub fn set_device_heading(&mut self, heading_deg: f64) {
        self.device_heading = heading_deg;
        self.recompute();
    }

    /// Signed rotation from the device heading to the target in
    /// [-180, 180); positive = clockwise, 0.0 when no target is known
    pub fn relative_heading(&self) -> f64 {
        self.relative
    }

    /// The target's absolute bearing, when known
    pub fn target_bearing(&self) -> Option<f64> {
        self.target_bearing
    }

    /// The last device heading fed in
    pub fn device_heading(&self) -> f64 {
        self.device_heading
    }

    fn recompute(&mut self) {
        self.relative = match self.target_bearing {
            Some(bearing) => normalize_signed(bearing - self.device_heading),
            None => 0.0,
        };
    }
}
