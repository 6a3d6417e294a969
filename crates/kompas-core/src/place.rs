//! Place candidates returned by a search collaborator

use serde::Serialize;

use crate::geo::GeoPoint;

/// A place candidate near the user.
///
/// `distance_m` and `bearing_deg` are derived values stamped by the
/// guidance layer once a candidate has been measured against the user's
/// position; search collaborators leave them empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Place {
    /// Collaborator-scoped identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Street address
    pub address: String,
    /// Whether the place is currently open
    pub is_open: bool,
    /// Collaborator rating, 0.0 to 5.0 when known (display data, not validated)
    pub rating: Option<f64>,
    /// Geographic position
    pub location: GeoPoint,
    /// Meters from the user's position
    pub distance_m: Option<f64>,
    /// Initial bearing from the user in [0, 360)
    pub bearing_deg: Option<f64>,
}

impl Place {
    /// Create an open, unrated place
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        address: impl Into<String>,
        location: GeoPoint,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address: address.into(),
            is_open: true,
            rating: None,
            location,
            distance_m: None,
            bearing_deg: None,
        }
    }

    /// Set the collaborator rating
    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    /// Set the open/closed flag
    pub fn with_open(mut self, is_open: bool) -> Self {
        self.is_open = is_open;
        self
    }

    /// Human-readable distance: whole meters under a kilometer,
    /// kilometers with one decimal above, "unknown" when not stamped
    pub fn formatted_distance(&self) -> String {
        match self.distance_m {
            None => "unknown".to_string(),
            Some(d) if d < 1000.0 => format!("{d:.0} m"),
            Some(d) => format!("{:.1} km", d / 1000.0),
        }
    }
}
