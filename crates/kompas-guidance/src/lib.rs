//! Kompas Guidance - movement-gated nearest-place resolution
//!
//! This crate turns two raw sensor feeds (location fixes and compass
//! headings) plus a pluggable place-search collaborator into a single
//! answer a compass display can render: the nearest matching place, how
//! far away it is, and how far the on-screen needle should rotate from
//! wherever the device is currently pointing.
//!
//! # Architecture
//!
//! - [`MovementGate`] decides when the user has moved far enough to
//!   justify a new search
//! - [`PlaceSearch`] is the collaborator seam a places backend plugs into
//! - [`HeadingTracker`] folds the target bearing and the live device
//!   heading into a signed relative rotation
//! - [`GuidanceService`] owns all of the above on a single task, driven
//!   by commands from a cloneable [`GuidanceHandle`], and publishes
//!   [`GuidanceEvent`]s and a [`CompassSnapshot`] read model
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use kompas_core::{GeoPoint, HeadingSample};
//! use kompas_guidance::{GuidanceConfig, GuidanceService, StaticProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GuidanceConfig::default();
//!     let provider = StaticProvider::new(config.search.clone());
//!
//!     let (service, handle, mut events) = GuidanceService::new(config, provider)?;
//!     tokio::spawn(service.run());
//!
//!     handle.update_location(GeoPoint::new(52.3676, 4.9041)?).await?;
//!     handle.update_heading(HeadingSample::new(90.0)?).await?;
//!
//!     while let Ok(event) = events.recv().await {
//!         println!("{event:?}");
//!         let snapshot = handle.snapshot();
//!         println!("needle: {:.1} degrees", snapshot.relative_heading);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// Resolver building blocks
pub mod gate;
pub mod heading;
pub mod provider;

// Service layer
pub mod config;
pub mod error;
pub mod event;
pub mod service;

// Testing utilities
pub mod test_utils;

// Re-exports for convenience
pub use config::{
    GuidanceConfig, GuidanceConfigBuilder, SearchConfig, DEFAULT_MOVEMENT_THRESHOLD_M,
    DEFAULT_SEARCH_RADIUS_M, DEFAULT_SEARCH_TIMEOUT,
};
pub use error::{GuidanceError, Result};
pub use event::{CompassSnapshot, GuidanceEvent, GuidanceStats, GuidanceStatus};
pub use gate::MovementGate;
pub use heading::HeadingTracker;
pub use provider::{PlaceSearch, StaticProvider};
pub use service::{GuidanceCommand, GuidanceHandle, GuidanceService};
pub use test_utils::MockProvider;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
