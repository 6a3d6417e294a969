//! Validation errors for the kompas data model
//!
//! Geographic input is validated once, when a value is constructed.
//! These are the rejection reasons; code downstream of a successful
//! construction never sees an invalid coordinate or heading.

use thiserror::Error;

/// Error type for data-model construction
#[derive(Error, Debug)]
pub enum CoreError {
    // ===== Coordinate Errors =====
    /// Latitude or longitude is NaN or infinite
    #[error("Coordinate is not finite: latitude={latitude}, longitude={longitude}")]
    NonFiniteCoordinate {
        /// Latitude as received
        latitude: f64,
        /// Longitude as received
        longitude: f64,
    },

    /// Latitude outside the valid range
    #[error("Latitude out of range: {0} (expected -90 to 90)")]
    LatitudeOutOfRange(f64),

    /// Longitude outside the valid range
    #[error("Longitude out of range: {0} (expected -180 to 180)")]
    LongitudeOutOfRange(f64),

    // ===== Heading Errors =====
    /// Compass heading is NaN or infinite
    #[error("Heading is not finite: {0}")]
    NonFiniteHeading(f64),
}

impl CoreError {
    /// Get a short error code (useful for logging and metrics)
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NonFiniteCoordinate { .. } => "COORD_NOT_FINITE",
            Self::LatitudeOutOfRange(_) => "LAT_RANGE",
            Self::LongitudeOutOfRange(_) => "LON_RANGE",
            Self::NonFiniteHeading(_) => "HEADING_NOT_FINITE",
        }
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::LatitudeOutOfRange(91.5);
        assert_eq!(err.to_string(), "Latitude out of range: 91.5 (expected -90 to 90)");

        let err = CoreError::NonFiniteHeading(f64::NAN);
        assert!(err.to_string().contains("not finite"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            CoreError::NonFiniteCoordinate {
                latitude: f64::NAN,
                longitude: 4.9,
            }
            .error_code(),
            "COORD_NOT_FINITE"
        );
        assert_eq!(CoreError::LatitudeOutOfRange(99.0).error_code(), "LAT_RANGE");
        assert_eq!(CoreError::LongitudeOutOfRange(190.0).error_code(), "LON_RANGE");
        assert_eq!(CoreError::NonFiniteHeading(f64::INFINITY).error_code(), "HEADING_NOT_FINITE");
    }
}
