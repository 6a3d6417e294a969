//! Device compass heading samples

use std::fmt;

use serde::Serialize;

use crate::error::{CoreError, Result};
use crate::geo::normalize_degrees;

/// A validated compass heading in degrees clockwise from true north.
///
/// Platform compasses report transients outside 0..360 while they
/// calibrate; finite input is wrapped into [0, 360) and only NaN or
/// infinite readings are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeadingSample(f64);

impl HeadingSample {
    /// Create a heading sample from raw degrees
    pub fn new(degrees: f64) -> Result<Self> {
        if !degrees.is_finite() {
            return Err(CoreError::NonFiniteHeading(degrees));
        }
        Ok(Self(normalize_degrees(degrees)))
    }

    /// Heading in degrees, [0, 360)
    pub fn degrees(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for HeadingSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}°", self.0)
    }
}
