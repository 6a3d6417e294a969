//! Configuration types for the guidance service
//!
//! This module provides configuration for movement gating, the search
//! collaborator and the service channels, with serde support so a whole
//! configuration can live in a JSON file.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{GuidanceError, Result};

/// Default movement threshold in meters before a new search is warranted
pub const DEFAULT_MOVEMENT_THRESHOLD_M: f64 = 100.0;

/// Default search radius in meters
pub const DEFAULT_SEARCH_RADIUS_M: f64 = 5_000.0;

/// Default search collaborator timeout
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default command channel capacity
pub const DEFAULT_COMMAND_BUFFER: usize = 64;

/// Default broadcast event channel capacity
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Main configuration for the guidance service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidanceConfig {
    /// Meters the user must move from the last searched location before
    /// a new search is triggered (50-200 is a sensible range on foot)
    #[serde(default = "default_movement_threshold")]
    pub movement_threshold_m: f64,

    /// Search collaborator settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Command channel capacity
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,

    /// Broadcast event channel capacity
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_movement_threshold() -> f64 {
    DEFAULT_MOVEMENT_THRESHOLD_M
}

fn default_command_buffer() -> usize {
    DEFAULT_COMMAND_BUFFER
}

fn default_event_buffer() -> usize {
    DEFAULT_EVENT_BUFFER
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            movement_threshold_m: DEFAULT_MOVEMENT_THRESHOLD_M,
            search: SearchConfig::default(),
            command_buffer: DEFAULT_COMMAND_BUFFER,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl GuidanceConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.movement_threshold_m.is_finite() || self.movement_threshold_m < 0.0 {
            return Err(GuidanceError::InvalidConfig(format!(
                "movement_threshold_m must be a non-negative number, got {}",
                self.movement_threshold_m
            )));
        }
        if !self.search.radius_m.is_finite() || self.search.radius_m <= 0.0 {
            return Err(GuidanceError::InvalidConfig(format!(
                "search.radius_m must be positive, got {}",
                self.search.radius_m
            )));
        }
        if self.command_buffer == 0 || self.event_buffer == 0 {
            return Err(GuidanceError::InvalidConfig(
                "channel buffers must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Search collaborator settings
///
/// These are read by `PlaceSearch` implementations, not by the resolver:
/// the collaborator owns its radius, filtering and timeout policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Radius around the user to search, in meters
    #[serde(default = "default_search_radius")]
    pub radius_m: f64,

    /// Only return places that are currently open
    #[serde(default)]
    pub open_now: bool,

    /// How long the collaborator may take before giving up
    #[serde(with = "humantime_serde", default = "default_search_timeout")]
    pub timeout: Duration,
}

fn default_search_radius() -> f64 {
    DEFAULT_SEARCH_RADIUS_M
}

fn default_search_timeout() -> Duration {
    DEFAULT_SEARCH_TIMEOUT
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            radius_m: DEFAULT_SEARCH_RADIUS_M,
            open_now: false,
            timeout: DEFAULT_SEARCH_TIMEOUT,
        }
    }
}

/// Builder for GuidanceConfig
#[derive(Debug, Default)]
pub struct GuidanceConfigBuilder {
    config: GuidanceConfig,
}

impl GuidanceConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the movement threshold in meters (clamped at zero)
    pub fn movement_threshold_m(mut self, meters: f64) -> Self {
        self.config.movement_threshold_m = meters.max(0.0);
        self
    }

    /// Set the search radius in meters
    pub fn search_radius_m(mut self, meters: f64) -> Self {
        self.config.search.radius_m = meters;
        self
    }

    /// Restrict results to places that are currently open
    pub fn open_now(mut self, enabled: bool) -> Self {
        self.config.search.open_now = enabled;
        self
    }

    /// Set the search collaborator timeout
    pub fn search_timeout(mut self, timeout: Duration) -> Self {
        self.config.search.timeout = timeout;
        self
    }

    /// Set the command channel capacity (at least 1)
    pub fn command_buffer(mut self, capacity: usize) -> Self {
        self.config.command_buffer = capacity.max(1);
        self
    }

    /// Build the configuration
    pub fn build(self) -> GuidanceConfig {
        self.config
    }
}

// Custom serde module for Duration with humantime
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
