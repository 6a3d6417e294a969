//! Validated geographic points and spherical geometry
//!
//! All math here works on a spherical Earth model with the conventional
//! mean radius. Coordinates are validated once, at [`GeoPoint`]
//! construction; the math itself assumes valid input.

use std::fmt;

use serde::Serialize;

use crate::error::{CoreError, Result};

/// Mean Earth radius in meters. Every distance in the system derives
/// from this constant.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A validated geographic coordinate in degrees.
///
/// Construction rejects non-finite values, latitudes outside [-90, 90]
/// and longitudes outside [-180, 180], so any `GeoPoint` handed to the
/// math below is known to be valid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    /// Create a point from latitude/longitude in degrees
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(CoreError::NonFiniteCoordinate {
                latitude,
                longitude,
            });
        }
        if latitude < -90.0 || latitude > 90.0 {
            return Err(CoreError::LatitudeOutOfRange(latitude));
        }
        if longitude < -180.0 || longitude > 180.0 {
            return Err(CoreError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in degrees
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Calculate distance to another point in meters (Haversine formula)
    pub fn distance_m(&self, other: GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_M * c
    }

    /// Initial bearing (forward azimuth) from this point toward another,
    /// in degrees clockwise from true north, in [0, 360).
    ///
    /// The bearing between identical points is undefined; this returns
    /// 0.0 by convention.
    pub fn initial_bearing_to(&self, to: GeoPoint) -> f64 {
        if *self == to {
            return 0.0;
        }

        let lat1 = self.latitude.to_radians();
        let lat2 = to.latitude.to_radians();
        let dlon = (to.longitude - self.longitude).to_radians();

        let y = dlon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

        normalize_degrees(y.atan2(x).to_degrees())
    }

    /// The point reached by travelling `distance_m` meters from here
    /// along an initial bearing of `bearing_deg`.
    pub fn destination(&self, bearing_deg: f64, distance_m: f64) -> GeoPoint {
        let delta = distance_m / EARTH_RADIUS_M;
        let theta = bearing_deg.to_radians();
        let lat1 = self.latitude.to_radians();
        let lon1 = self.longitude.to_radians();

        let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
        let lon2 = lon1
            + (theta.sin() * delta.sin() * lat1.cos())
                .atan2(delta.cos() - lat1.sin() * lat2.sin());

        // asin keeps latitude in [-90, 90]; longitude is wrapped back
        // into range, so the result is valid by construction.
        GeoPoint {
            latitude: lat2.to_degrees(),
            longitude: normalize_signed(lon2.to_degrees()),
        }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.latitude, self.longitude)
    }
}

/// Wrap an angle into [0, 360) degrees.
pub fn normalize_degrees(angle_deg: f64) -> f64 {
    // rem_euclid can round up to the modulus itself for tiny negative
    // inputs; the result must stay strictly below 360.
    let wrapped = angle_deg.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Wrap an angle into [-180, 180) degrees.
///
/// The result is equivalent to the input modulo 360. The +180 boundary
/// maps to -180.
pub fn normalize_signed(angle_deg: f64) -> f64 {
    let wrapped = (angle_deg + 180.0).rem_euclid(360.0);
    if wrapped >= 360.0 {
        -180.0
    } else {
        wrapped - 180.0
    }
}
