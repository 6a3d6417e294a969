//! Guidance events, display snapshot and service statistics
//!
//! Events are broadcast by the guidance service for consumption by
//! display layers; the snapshot is the continuously updated read model a
//! renderer polls between events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use kompas_core::{GeoPoint, Place};

/// Events emitted by the guidance service
#[derive(Debug, Clone)]
pub enum GuidanceEvent {
    /// Guidance service started
    Started,

    /// Guidance service stopped
    Stopped,

    /// A nearby search was spawned
    SearchStarted {
        /// Generation counter of this search
        generation: u64,
        /// Location the search runs against
        origin: GeoPoint,
    },

    /// A search produced a new nearest target
    TargetUpdated {
        /// The nearest place, stamped with distance and bearing
        target: Place,
    },

    /// A search confirmed nothing nearby; any previous target was cleared
    TargetCleared {
        /// Location the search ran against
        origin: GeoPoint,
    },

    /// A search failed; any previous target was kept
    SearchFailed {
        /// Human-readable failure reason
        reason: String,
    },
}

impl GuidanceEvent {
    /// Check if this is a search lifecycle event
    pub fn is_search_event(&self) -> bool {
        matches!(
            self,
            GuidanceEvent::SearchStarted { .. }
                | GuidanceEvent::TargetUpdated { .. }
                | GuidanceEvent::TargetCleared { .. }
                | GuidanceEvent::SearchFailed { .. }
        )
    }

    /// Get the target carried by this event, if any
    pub fn target(&self) -> Option<&Place> {
        match self {
            GuidanceEvent::TargetUpdated { target } => Some(target),
            _ => None,
        }
    }
}

/// Where the resolver currently stands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GuidanceStatus {
    /// No search has run yet
    Idle,
    /// A search is in flight
    Searching,
    /// A nearest target is locked and being tracked
    Tracking,
    /// The last search confirmed nothing nearby
    NothingNearby,
    /// The last search failed; any previous target is kept
    Failed(String),
}

impl fmt::Display for GuidanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuidanceStatus::Idle => write!(f, "idle"),
            GuidanceStatus::Searching => write!(f, "searching"),
            GuidanceStatus::Tracking => write!(f, "tracking"),
            GuidanceStatus::NothingNearby => write!(f, "nothing nearby"),
            GuidanceStatus::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Read model for display layers
///
/// The service is the only writer; consumers clone it through
/// `GuidanceHandle::snapshot()` whenever they render.
#[derive(Debug, Clone, Serialize)]
pub struct CompassSnapshot {
    /// Nearest place, stamped with distance and bearing
    pub nearest: Option<Place>,
    /// Absolute bearing to the target in [0, 360), when known
    pub target_bearing: Option<f64>,
    /// Device compass heading in [0, 360)
    pub device_heading: f64,
    /// Signed rotation from the device heading to the target, [-180, 180)
    pub relative_heading: f64,
    /// Whether a search is in flight
    pub loading: bool,
    /// Resolver status
    pub status: GuidanceStatus,
    /// When any of the above last changed
    pub last_updated: DateTime<Utc>,
}

impl Default for CompassSnapshot {
    fn default() -> Self {
        Self {
            nearest: None,
            target_bearing: None,
            device_heading: 0.0,
            relative_heading: 0.0,
            loading: false,
            status: GuidanceStatus::Idle,
            last_updated: Utc::now(),
        }
    }
}

/// Statistics about the guidance service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuidanceStats {
    /// Location updates received
    pub location_updates: u64,
    /// Heading updates received
    pub heading_updates: u64,
    /// Searches spawned
    pub searches_started: u64,
    /// Searches that produced a target
    pub searches_succeeded: u64,
    /// Searches that confirmed nothing nearby
    pub searches_empty: u64,
    /// Searches that failed
    pub searches_failed: u64,
    /// Location updates absorbed by the movement gate
    pub gated_updates: u64,
    /// Triggers dropped because a search was already in flight
    pub coalesced_triggers: u64,
    /// Search results discarded as stale
    pub stale_results: u64,
    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl GuidanceStats {
    /// Share of location updates absorbed without reaching the
    /// collaborator (0.0 to 1.0)
    pub fn gating_efficiency(&self) -> f64 {
        if self.location_updates == 0 {
            0.0
        } else {
            self.gated_updates as f64 / self.location_updates as f64
        }
    }
}
