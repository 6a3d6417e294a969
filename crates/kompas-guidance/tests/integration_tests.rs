//! Integration tests for the guidance service
//!
//! These tests drive the full service loop end-to-end:
//! - Nearest-target selection and distance/bearing stamping
//! - Movement gating across location feeds
//! - Failure, empty-result and retry semantics
//! - Single-flight coalescing of search triggers
//! - Relative-heading consistency between feeds

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::timeout;

use kompas_core::{GeoPoint, HeadingSample};
use kompas_guidance::test_utils::{spread_candidates, MockProvider};
use kompas_guidance::{
    GuidanceConfig, GuidanceConfigBuilder, GuidanceEvent, GuidanceHandle, GuidanceService,
    GuidanceStatus,
};

// ============================================================================
// Helpers
// ============================================================================

fn amsterdam() -> GeoPoint {
    GeoPoint::new(52.3676, 4.9041).unwrap()
}

fn test_config() -> GuidanceConfig {
    GuidanceConfigBuilder::new().movement_threshold_m(100.0).build()
}

/// Spawn a service around a fresh mock provider
fn start_service(
    config: GuidanceConfig,
    provider: MockProvider,
) -> (
    GuidanceHandle,
    broadcast::Receiver<GuidanceEvent>,
    tokio::task::JoinHandle<kompas_guidance::Result<()>>,
) {
    let (service, handle, events) = GuidanceService::new(config, provider).unwrap();
    let task = tokio::spawn(service.run());
    (handle, events, task)
}

/// Receive events until one satisfies the predicate, panicking after 5s
async fn wait_for_event<F>(
    events: &mut broadcast::Receiver<GuidanceEvent>,
    mut predicate: F,
) -> GuidanceEvent
where
    F: FnMut(&GuidanceEvent) -> bool,
{
    timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.expect("event channel closed");
            if predicate(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

async fn shutdown(
    handle: GuidanceHandle,
    task: tokio::task::JoinHandle<kompas_guidance::Result<()>>,
) {
    handle.shutdown().await.unwrap();
    task.await.unwrap().unwrap();
}

// ============================================================================
// Nearest-target selection
// ============================================================================

#[tokio::test]
async fn test_selects_nearest_candidate_and_stamps_it() {
    let origin = amsterdam();
    let provider = MockProvider::new();
    provider.push_success(spread_candidates(origin));

    let (handle, mut events, task) = start_service(test_config(), provider.clone());

    handle.update_location(origin).await.unwrap();
    let event = wait_for_event(&mut events, |e| {
        matches!(e, GuidanceEvent::TargetUpdated { .. })
    })
    .await;

    let target = event.target().unwrap();
    assert_eq!(target.id, "near");
    assert_eq!(target.name, "Istanbul Pizza");

    let distance = target.distance_m.unwrap();
    let bearing = target.bearing_deg.unwrap();
    assert!((distance - 50.0).abs() < 0.1, "distance was {distance}");
    assert!((bearing - 135.0).abs() < 0.1, "bearing was {bearing}");

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.status, GuidanceStatus::Tracking);
    assert!(!snapshot.loading);
    assert_eq!(snapshot.nearest.as_ref().unwrap().id, "near");
    assert_eq!(snapshot.target_bearing, Some(bearing));

    assert_eq!(provider.call_count(), 1);
    assert_eq!(provider.calls()[0], origin);

    shutdown(handle, task).await;
}

#[tokio::test]
async fn test_exact_distance_tie_keeps_provider_order() {
    let origin = amsterdam();
    let provider = MockProvider::new();

    // Symmetric longitude offsets at the same latitude make the two
    // haversine distances bitwise equal, forcing the tie-break
    let east = GeoPoint::new(origin.latitude(), origin.longitude() + 0.003).unwrap();
    let west = GeoPoint::new(origin.latitude(), origin.longitude() - 0.003).unwrap();
    provider.push_success(vec![
        kompas_core::Place::new("east", "East Pide", "1 East Street", east),
        kompas_core::Place::new("west", "West Pide", "1 West Street", west),
    ]);

    let (handle, mut events, task) = start_service(test_config(), provider);

    handle.update_location(origin).await.unwrap();
    let event = wait_for_event(&mut events, |e| {
        matches!(e, GuidanceEvent::TargetUpdated { .. })
    })
    .await;

    assert_eq!(event.target().unwrap().id, "east");

    shutdown(handle, task).await;
}

// ============================================================================
// Movement gating
// ============================================================================

#[tokio::test]
async fn test_small_moves_do_not_reach_the_provider() {
    let origin = amsterdam();
    let provider = MockProvider::new();
    provider.push_success(spread_candidates(origin));

    let (handle, mut events, task) = start_service(test_config(), provider.clone());

    handle.update_location(origin).await.unwrap();
    wait_for_event(&mut events, |e| {
        matches!(e, GuidanceEvent::TargetUpdated { .. })
    })
    .await;

    // 30 m and 90 m drifts stay under the 100 m threshold
    handle
        .update_location(origin.destination(45.0, 30.0))
        .await
        .unwrap();
    handle
        .update_location(origin.destination(200.0, 90.0))
        .await
        .unwrap();

    // Stats flow through the same command channel, so by the time they
    // answer, both updates above have been processed
    let stats = handle.stats().await.unwrap();
    assert_eq!(stats.location_updates, 3);
    assert_eq!(stats.gated_updates, 2);
    assert_eq!(stats.searches_started, 1);
    assert_eq!(provider.call_count(), 1);
    assert!((stats.gating_efficiency() - 2.0 / 3.0).abs() < 1e-12);

    shutdown(handle, task).await;
}

#[tokio::test]
async fn test_qualifying_move_triggers_a_new_search() {
    let origin = amsterdam();
    let away = origin.destination(90.0, 250.0);

    let provider = MockProvider::new();
    provider.push_success(spread_candidates(origin));
    provider.push_success(spread_candidates(away));

    let (handle, mut events, task) = start_service(test_config(), provider.clone());

    handle.update_location(origin).await.unwrap();
    wait_for_event(&mut events, |e| {
        matches!(e, GuidanceEvent::TargetUpdated { .. })
    })
    .await;

    handle.update_location(away).await.unwrap();
    wait_for_event(&mut events, |e| {
        matches!(e, GuidanceEvent::TargetUpdated { .. })
    })
    .await;

    assert_eq!(provider.call_count(), 2);
    assert_eq!(provider.calls(), vec![origin, away]);

    shutdown(handle, task).await;
}

// ============================================================================
// Failure and empty-result semantics
// ============================================================================

#[tokio::test]
async fn test_failure_keeps_previous_target_and_leaves_gate_open() {
    let origin = amsterdam();
    let away = origin.destination(90.0, 300.0);

    let provider = MockProvider::new();
    provider.push_success(spread_candidates(origin));
    provider.push_failure("backend 503");
    provider.push_success(spread_candidates(away));

    let (handle, mut events, task) = start_service(test_config(), provider.clone());

    handle.update_location(origin).await.unwrap();
    wait_for_event(&mut events, |e| {
        matches!(e, GuidanceEvent::TargetUpdated { .. })
    })
    .await;

    // The move to `away` hits the scripted failure
    handle.update_location(away).await.unwrap();
    let event = wait_for_event(&mut events, |e| {
        matches!(e, GuidanceEvent::SearchFailed { .. })
    })
    .await;
    if let GuidanceEvent::SearchFailed { reason } = event {
        assert!(reason.contains("backend 503"));
    }

    // Stale-but-valid beats a blank display
    let snapshot = handle.snapshot();
    assert!(matches!(snapshot.status, GuidanceStatus::Failed(_)));
    assert_eq!(snapshot.nearest.as_ref().unwrap().id, "near");

    // The gate was not marked at `away`: repeating the same fix retries
    handle.update_location(away).await.unwrap();
    wait_for_event(&mut events, |e| {
        matches!(e, GuidanceEvent::TargetUpdated { .. })
    })
    .await;

    let stats = handle.stats().await.unwrap();
    assert_eq!(stats.searches_failed, 1);
    assert_eq!(stats.searches_succeeded, 2);
    assert_eq!(provider.call_count(), 3);

    shutdown(handle, task).await;
}

#[tokio::test]
async fn test_empty_result_clears_target_and_marks_gate() {
    let origin = amsterdam();
    let away = origin.destination(180.0, 400.0);

    let provider = MockProvider::new();
    provider.push_success(spread_candidates(origin));
    provider.push_empty();

    let (handle, mut events, task) = start_service(test_config(), provider.clone());

    handle.update_location(origin).await.unwrap();
    wait_for_event(&mut events, |e| {
        matches!(e, GuidanceEvent::TargetUpdated { .. })
    })
    .await;

    handle.update_location(away).await.unwrap();
    wait_for_event(&mut events, |e| {
        matches!(e, GuidanceEvent::TargetCleared { .. })
    })
    .await;

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.status, GuidanceStatus::NothingNearby);
    assert_eq!(snapshot.nearest, None);
    assert_eq!(snapshot.target_bearing, None);
    assert_eq!(snapshot.relative_heading, 0.0);

    // A confirmed-empty area was still searched: the same fix is gated
    handle.update_location(away).await.unwrap();
    let stats = handle.stats().await.unwrap();
    assert_eq!(stats.gated_updates, 1);
    assert_eq!(stats.searches_empty, 1);
    assert_eq!(provider.call_count(), 2);

    shutdown(handle, task).await;
}

#[tokio::test]
async fn test_first_search_failure_retries_without_movement() {
    let origin = amsterdam();
    let provider = MockProvider::new();
    provider.push_failure("timeout");
    provider.push_success(spread_candidates(origin));

    let (handle, mut events, task) = start_service(test_config(), provider.clone());

    handle.update_location(origin).await.unwrap();
    wait_for_event(&mut events, |e| {
        matches!(e, GuidanceEvent::SearchFailed { .. })
    })
    .await;

    // No anchor was ever set, so the identical fix searches again
    handle.update_location(origin).await.unwrap();
    wait_for_event(&mut events, |e| {
        matches!(e, GuidanceEvent::TargetUpdated { .. })
    })
    .await;

    assert_eq!(provider.call_count(), 2);

    shutdown(handle, task).await;
}

// ============================================================================
// Manual refresh and coalescing
// ============================================================================

#[tokio::test]
async fn test_refresh_bypasses_the_gate() {
    let origin = amsterdam();
    let provider = MockProvider::new();
    provider.push_success(spread_candidates(origin));
    provider.push_success(spread_candidates(origin));

    let (handle, mut events, task) = start_service(test_config(), provider.clone());

    handle.update_location(origin).await.unwrap();
    wait_for_event(&mut events, |e| {
        matches!(e, GuidanceEvent::TargetUpdated { .. })
    })
    .await;

    // Same fix, gate closed, but a refresh searches anyway
    handle.refresh().await.unwrap();
    wait_for_event(&mut events, |e| {
        matches!(e, GuidanceEvent::TargetUpdated { .. })
    })
    .await;

    assert_eq!(provider.call_count(), 2);

    shutdown(handle, task).await;
}

#[tokio::test]
async fn test_triggers_during_inflight_search_are_dropped() {
    let origin = amsterdam();
    let (provider, release) = MockProvider::gated();
    provider.push_success(spread_candidates(origin));

    let (handle, mut events, task) = start_service(test_config(), provider.clone());

    handle.update_location(origin).await.unwrap();
    wait_for_event(&mut events, |e| {
        matches!(e, GuidanceEvent::SearchStarted { .. })
    })
    .await;

    // Two refreshes and a qualifying move, all while the first search
    // is still blocked inside the provider
    handle.refresh().await.unwrap();
    handle.refresh().await.unwrap();
    handle
        .update_location(origin.destination(90.0, 500.0))
        .await
        .unwrap();

    release.add_permits(1);
    wait_for_event(&mut events, |e| {
        matches!(e, GuidanceEvent::TargetUpdated { .. })
    })
    .await;

    let stats = handle.stats().await.unwrap();
    assert_eq!(stats.searches_started, 1);
    assert_eq!(stats.coalesced_triggers, 3);
    assert_eq!(provider.call_count(), 1);

    shutdown(handle, task).await;
}

// ============================================================================
// Heading integration
// ============================================================================

#[tokio::test]
async fn test_relative_heading_is_order_independent() {
    let origin = amsterdam();

    // Heading first, then target
    let provider = MockProvider::new();
    provider.push_success(spread_candidates(origin));
    let (handle, mut events, task) = start_service(test_config(), provider);

    handle
        .update_heading(HeadingSample::new(90.0).unwrap())
        .await
        .unwrap();
    handle.update_location(origin).await.unwrap();
    wait_for_event(&mut events, |e| {
        matches!(e, GuidanceEvent::TargetUpdated { .. })
    })
    .await;

    // Target bearing is 135, device faces 90: rotate 45 clockwise
    let snapshot = handle.snapshot();
    assert!((snapshot.relative_heading - 45.0).abs() < 0.1);
    assert_eq!(snapshot.device_heading, 90.0);
    shutdown(handle, task).await;

    // Target first, then heading
    let provider = MockProvider::new();
    provider.push_success(spread_candidates(origin));
    let (handle, mut events, task) = start_service(test_config(), provider);

    handle.update_location(origin).await.unwrap();
    wait_for_event(&mut events, |e| {
        matches!(e, GuidanceEvent::TargetUpdated { .. })
    })
    .await;
    handle
        .update_heading(HeadingSample::new(90.0).unwrap())
        .await
        .unwrap();

    // Drain through stats to be sure the heading was processed
    let stats = handle.stats().await.unwrap();
    assert_eq!(stats.heading_updates, 1);

    let snapshot = handle.snapshot();
    assert!((snapshot.relative_heading - 45.0).abs() < 0.1);
    shutdown(handle, task).await;
}

#[tokio::test]
async fn test_heading_updates_track_a_turning_user() {
    let origin = amsterdam();
    let provider = MockProvider::new();
    provider.push_success(spread_candidates(origin));

    let (handle, mut events, task) = start_service(test_config(), provider);

    handle.update_location(origin).await.unwrap();
    wait_for_event(&mut events, |e| {
        matches!(e, GuidanceEvent::TargetUpdated { .. })
    })
    .await;

    // Turn the device through north; target bearing stays 135
    for (device, expected) in [(0.0, 135.0), (135.0, 0.0), (180.0, -45.0), (350.0, 145.0)] {
        handle
            .update_heading(HeadingSample::new(device).unwrap())
            .await
            .unwrap();
        let _ = handle.stats().await.unwrap();

        let snapshot = handle.snapshot();
        assert!(
            (snapshot.relative_heading - expected).abs() < 0.1,
            "device {device}: expected {expected}, got {}",
            snapshot.relative_heading
        );
    }

    shutdown(handle, task).await;
}
