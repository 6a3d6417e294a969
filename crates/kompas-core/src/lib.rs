//! Kompas Core - Geographic data model and spherical math
//!
//! This crate provides the foundational types for the kompas guidance
//! stack: validated coordinates and compass headings, place candidates,
//! and the great-circle math everything else derives distances and
//! bearings from.
//!
//! # Modules
//!
//! - [`geo`] - Validated geographic points and spherical geometry
//! - [`heading`] - Device compass heading samples
//! - [`place`] - Place candidates returned by search collaborators
//! - [`error`] - Construction-time validation errors
//!
//! # Example
//!
//! ```rust
//! use kompas_core::GeoPoint;
//!
//! let home = GeoPoint::new(52.3676, 4.9041)?;
//! let market = GeoPoint::new(52.3691, 4.9089)?;
//!
//! let meters = home.distance_m(market);
//! let bearing = home.initial_bearing_to(market);
//! println!("{meters:.0} m away, bearing {bearing:.1}°");
//! # Ok::<(), kompas_core::CoreError>(())
//! ```

// Core modules
pub mod error;
pub mod geo;
pub mod heading;
pub mod place;

// Re-exports for convenience
pub use error::{CoreError, Result};
pub use geo::{normalize_degrees, normalize_signed, GeoPoint, EARTH_RADIUS_M};
pub use heading::HeadingSample;
pub use place::Place;

/// Version of the kompas-core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
