//! Guidance service - single owner of the resolver state
//!
//! The GuidanceService consumes location and heading feeds, applies the
//! movement gate, runs nearest-target searches against the collaborator
//! and publishes snapshots and events. All mutable state lives on the
//! service task; the outside world talks to it through a cloneable
//! [`GuidanceHandle`].

use chrono::Utc;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use kompas_core::{GeoPoint, HeadingSample, Place};

use crate::config::GuidanceConfig;
use crate::error::{GuidanceError, Result};
use crate::event::{CompassSnapshot, GuidanceEvent, GuidanceStats, GuidanceStatus};
use crate::gate::MovementGate;
use crate::heading::HeadingTracker;
use crate::provider::PlaceSearch;

/// Commands sent to the guidance service
#[derive(Debug)]
pub enum GuidanceCommand {
    /// A new location fix from the platform
    LocationUpdate {
        /// The fix, validated at the model boundary
        location: GeoPoint,
    },
    /// A new compass heading from the platform
    HeadingUpdate {
        /// The heading, validated at the model boundary
        heading: HeadingSample,
    },
    /// Search now, bypassing the movement gate
    Refresh,
    /// Get service statistics
    GetStats {
        /// Response channel
        response: oneshot::Sender<GuidanceStats>,
    },
    /// Shutdown
    Shutdown,
}

/// Handle for interacting with the guidance service
#[derive(Clone)]
pub struct GuidanceHandle {
    command_tx: mpsc::Sender<GuidanceCommand>,
    snapshot: Arc<RwLock<CompassSnapshot>>,
}

impl GuidanceHandle {
    /// Feed a location fix into the service
    pub async fn update_location(&self, location: GeoPoint) -> Result<()> {
        self.command_tx
            .send(GuidanceCommand::LocationUpdate { location })
            .await
            .map_err(|_| GuidanceError::ChannelClosed)
    }

    /// Feed a compass heading into the service
    pub async fn update_heading(&self, heading: HeadingSample) -> Result<()> {
        self.command_tx
            .send(GuidanceCommand::HeadingUpdate { heading })
            .await
            .map_err(|_| GuidanceError::ChannelClosed)
    }

    /// Request a search right now, bypassing the movement gate
    pub async fn refresh(&self) -> Result<()> {
        self.command_tx
            .send(GuidanceCommand::Refresh)
            .await
            .map_err(|_| GuidanceError::ChannelClosed)
    }

    /// Read the current display snapshot
    ///
    /// Cheap and synchronous; the service is the only writer.
    pub fn snapshot(&self) -> CompassSnapshot {
        self.snapshot.read().clone()
    }

    /// Get service statistics
    pub async fn stats(&self) -> Result<GuidanceStats> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(GuidanceCommand::GetStats { response: tx })
            .await
            .map_err(|_| GuidanceError::ChannelClosed)?;

        rx.await.map_err(|_| GuidanceError::ChannelClosed)
    }

    /// Shutdown the guidance service
    pub async fn shutdown(&self) -> Result<()> {
        self.command_tx
            .send(GuidanceCommand::Shutdown)
            .await
            .map_err(|_| GuidanceError::ChannelClosed)
    }
}

/// Outcome of a spawned search, reported back to the service loop
#[derive(Debug)]
struct SearchOutcome {
    generation: u64,
    origin: GeoPoint,
    result: Result<Vec<Place>>,
}

/// The guidance service owns all resolver state and runs the event loop
pub struct GuidanceService<P: PlaceSearch + 'static> {
    /// Search collaborator
    provider: Arc<P>,
    /// Configuration
    config: GuidanceConfig,
    /// Movement gate over location updates
    gate: MovementGate,
    /// Relative heading state
    tracker: HeadingTracker,
    /// Most recent location fix
    last_location: Option<GeoPoint>,
    /// Generation counter for searches
    generation: u64,
    /// Generation of the outstanding search, if any
    in_flight: Option<u64>,
    /// Event broadcaster
    event_tx: broadcast::Sender<GuidanceEvent>,
    /// Command receiver
    command_rx: mpsc::Receiver<GuidanceCommand>,
    /// Spawned searches report back through this channel
    outcome_tx: mpsc::Sender<SearchOutcome>,
    outcome_rx: mpsc::Receiver<SearchOutcome>,
    /// Display snapshot (service is the only writer)
    snapshot: Arc<RwLock<CompassSnapshot>>,
    /// Statistics
    stats: GuidanceStats,
    /// Start time
    start_time: Instant,
}

impl<P: PlaceSearch + 'static> GuidanceService<P> {
    /// Create a new guidance service
    ///
    /// Returns the service (to be driven by [`run`](Self::run)), a
    /// cloneable handle and a subscribed event receiver.
    pub fn new(
        config: GuidanceConfig,
        provider: P,
    ) -> Result<(Self, GuidanceHandle, broadcast::Receiver<GuidanceEvent>)> {
        config.validate()?;

        let (event_tx, event_rx) = broadcast::channel(config.event_buffer);
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer);
        // At most one search is outstanding; a small buffer absorbs the
        // window between completion and the loop draining it.
        let (outcome_tx, outcome_rx) = mpsc::channel(4);

        let snapshot = Arc::new(RwLock::new(CompassSnapshot::default()));

        let handle = GuidanceHandle {
            command_tx,
            snapshot: Arc::clone(&snapshot),
        };

        let gate = MovementGate::new(config.movement_threshold_m);

        let service = Self {
            provider: Arc::new(provider),
            config,
            gate,
            tracker: HeadingTracker::new(),
            last_location: None,
            generation: 0,
            in_flight: None,
            event_tx,
            command_rx,
            outcome_tx,
            outcome_rx,
            snapshot,
            stats: GuidanceStats::default(),
            start_time: Instant::now(),
        };

        Ok((service, handle, event_rx))
    }

    /// Start the guidance service
    pub async fn run(mut self) -> Result<()> {
        info!(
            provider = self.provider.name(),
            threshold_m = self.config.movement_threshold_m,
            "Starting guidance service"
        );

        let _ = self.event_tx.send(GuidanceEvent::Started);

        // Main event loop
        loop {
            tokio::select! {
                Some(cmd) = self.command_rx.recv() => {
                    if !self.handle_command(cmd) {
                        break;
                    }
                }

                Some(outcome) = self.outcome_rx.recv() => {
                    self.handle_search_outcome(outcome);
                }
            }

            // Update stats
            self.stats.uptime_secs = self.start_time.elapsed().as_secs();
        }

        let _ = self.event_tx.send(GuidanceEvent::Stopped);
        info!("Guidance service stopped");

        Ok(())
    }

    /// Handle a command; returns false when the service should stop
    fn handle_command(&mut self, cmd: GuidanceCommand) -> bool {
        match cmd {
            GuidanceCommand::LocationUpdate { location } => {
                self.stats.location_updates += 1;
                self.on_location(location);
            }

            GuidanceCommand::HeadingUpdate { heading } => {
                self.stats.heading_updates += 1;
                self.on_heading(heading);
            }

            GuidanceCommand::Refresh => {
                self.on_refresh();
            }

            GuidanceCommand::GetStats { response } => {
                let _ = response.send(self.stats.clone());
            }

            GuidanceCommand::Shutdown => {
                info!("Shutdown command received");
                return false;
            }
        }
        true
    }

    fn on_location(&mut self, location: GeoPoint) {
        self.last_location = Some(location);

        if !self.gate.should_search(location) {
            self.stats.gated_updates += 1;
            if let Some(distance) = self.gate.distance_from_anchor(location) {
                trace!(
                    distance_m = distance,
                    threshold_m = self.gate.threshold_m(),
                    "Within movement threshold, skipping search"
                );
            }
            return;
        }

        if self.in_flight.is_some() {
            self.stats.coalesced_triggers += 1;
            debug!("Search already in flight, dropping location trigger");
            return;
        }

        self.spawn_search(location);
    }

    fn on_heading(&mut self, heading: HeadingSample) {
        self.tracker.set_device_heading(heading.degrees());
        trace!(heading = %heading, "Heading update");

        let mut snap = self.snapshot.write();
        snap.device_heading = self.tracker.device_heading();
        snap.relative_heading = self.tracker.relative_heading();
        snap.last_updated = Utc::now();
    }

    fn on_refresh(&mut self) {
        let Some(location) = self.last_location else {
            warn!("Refresh requested before any location fix");
            self.report_failure(GuidanceError::NoLocationFix.to_string());
            return;
        };

        if self.in_flight.is_some() {
            self.stats.coalesced_triggers += 1;
            debug!("Search already in flight, dropping refresh");
            return;
        }

        debug!("Manual refresh, bypassing movement gate");
        self.spawn_search(location);
    }

    fn spawn_search(&mut self, origin: GeoPoint) {
        self.generation += 1;
        let generation = self.generation;
        self.in_flight = Some(generation);
        self.stats.searches_started += 1;

        {
            let mut snap = self.snapshot.write();
            snap.loading = true;
            snap.status = GuidanceStatus::Searching;
            snap.last_updated = Utc::now();
        }

        debug!(generation, origin = %origin, "Starting nearby search");
        let _ = self
            .event_tx
            .send(GuidanceEvent::SearchStarted { generation, origin });

        let provider = Arc::clone(&self.provider);
        let outcome_tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = provider.search(origin).await;
            // The receiver only drops at shutdown, where the result no
            // longer matters
            let _ = outcome_tx
                .send(SearchOutcome {
                    generation,
                    origin,
                    result,
                })
                .await;
        });
    }

    fn handle_search_outcome(&mut self, outcome: SearchOutcome) {
        if self.in_flight != Some(outcome.generation) {
            self.stats.stale_results += 1;
            debug!(
                generation = outcome.generation,
                "Discarding stale search result"
            );
            return;
        }
        self.in_flight = None;

        match outcome.result {
            Ok(places) => {
                // Success and confirmed-empty both advance the gate;
                // only transport failure leaves it open for a retry
                self.gate.mark_searched(outcome.origin);

                match Self::select_nearest(outcome.origin, places) {
                    Some((distance_m, place)) => {
                        self.adopt_target(outcome.origin, distance_m, place)
                    }
                    None => self.clear_target(outcome.origin),
                }
            }
            Err(err) => {
                self.stats.searches_failed += 1;
                warn!(
                    error = %err,
                    code = err.error_code(),
                    retriable = err.is_retriable(),
                    "Nearby search failed, keeping previous target"
                );
                self.report_failure(err.to_string());
            }
        }
    }

    /// Rank candidates by distance from the origin and take the closest.
    /// The sort is stable, so exact ties keep the collaborator's order.
    fn select_nearest(origin: GeoPoint, places: Vec<Place>) -> Option<(f64, Place)> {
        let mut ranked: Vec<(f64, Place)> = places
            .into_iter()
            .map(|place| (origin.distance_m(place.location), place))
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
        ranked.into_iter().next()
    }

    fn adopt_target(&mut self, origin: GeoPoint, distance_m: f64, mut target: Place) {
        let bearing = origin.initial_bearing_to(target.location);
        target.distance_m = Some(distance_m);
        target.bearing_deg = Some(bearing);

        self.tracker.set_target_bearing(bearing);
        self.stats.searches_succeeded += 1;

        info!(
            name = %target.name,
            distance = %target.formatted_distance(),
            bearing_deg = bearing,
            "Nearest target updated"
        );

        {
            let mut snap = self.snapshot.write();
            snap.nearest = Some(target.clone());
            snap.target_bearing = Some(bearing);
            snap.device_heading = self.tracker.device_heading();
            snap.relative_heading = self.tracker.relative_heading();
            snap.loading = false;
            snap.status = GuidanceStatus::Tracking;
            snap.last_updated = Utc::now();
        }

        let _ = self.event_tx.send(GuidanceEvent::TargetUpdated { target });
    }

    fn clear_target(&mut self, origin: GeoPoint) {
        self.stats.searches_empty += 1;
        self.tracker.clear_target();

        info!(origin = %origin, "Search confirmed nothing nearby, clearing target");

        {
            let mut snap = self.snapshot.write();
            snap.nearest = None;
            snap.target_bearing = None;
            snap.relative_heading = 0.0;
            snap.loading = false;
            snap.status = GuidanceStatus::NothingNearby;
            snap.last_updated = Utc::now();
        }

        let _ = self.event_tx.send(GuidanceEvent::TargetCleared { origin });
    }

    fn report_failure(&mut self, reason: String) {
        {
            let mut snap = self.snapshot.write();
            snap.loading = false;
            snap.status = GuidanceStatus::Failed(reason.clone());
            snap.last_updated = Utc::now();
        }

        let _ = self.event_tx.send(GuidanceEvent::SearchFailed { reason });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GuidanceConfigBuilder;
    use crate::test_utils::MockProvider;

    #[tokio::test]
    async fn test_new_rejects_invalid_config() {
        let mut config = GuidanceConfig::default();
        config.search.radius_m = -1.0;

        let result = GuidanceService::new(config, MockProvider::new());
        assert!(matches!(result, Err(GuidanceError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_fresh_snapshot_is_idle() {
        let (_service, handle, _events) =
            GuidanceService::new(GuidanceConfig::default(), MockProvider::new()).unwrap();

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.status, GuidanceStatus::Idle);
        assert!(!snapshot.loading);
        assert_eq!(snapshot.nearest, None);
    }

    #[tokio::test]
    async fn test_stats_round_trip_and_shutdown() {
        let config = GuidanceConfigBuilder::new().movement_threshold_m(50.0).build();
        let (service, handle, _events) =
            GuidanceService::new(config, MockProvider::new()).unwrap();
        let service_task = tokio::spawn(service.run());

        let stats = handle.stats().await.unwrap();
        assert_eq!(stats.location_updates, 0);
        assert_eq!(stats.searches_started, 0);

        handle.shutdown().await.unwrap();
        service_task.await.unwrap().unwrap();

        // The service is gone; the handle must now fail cleanly
        assert!(matches!(
            handle.refresh().await,
            Err(GuidanceError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn test_refresh_without_fix_reports_failure() {
        let (service, handle, mut events) =
            GuidanceService::new(GuidanceConfig::default(), MockProvider::new()).unwrap();
        let service_task = tokio::spawn(service.run());

        handle.refresh().await.unwrap();

        loop {
            match events.recv().await.unwrap() {
                GuidanceEvent::SearchFailed { reason } => {
                    assert_eq!(reason, "Cannot determine your location");
                    break;
                }
                GuidanceEvent::Started => continue,
                other => panic!("Unexpected event: {other:?}"),
            }
        }

        let snapshot = handle.snapshot();
        assert!(matches!(snapshot.status, GuidanceStatus::Failed(_)));

        handle.shutdown().await.unwrap();
        service_task.await.unwrap().unwrap();
    }
}
