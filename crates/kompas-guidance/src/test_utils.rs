//! Test utilities for guidance scenarios
//!
//! [`MockProvider`] is a scripted search collaborator: tests queue the
//! outcomes they want, hand a clone to the service and inspect the calls
//! the service made through their own copy. The fixture helpers place
//! candidates at exact distances and bearings via
//! [`GeoPoint::destination`], so expected values in assertions come from
//! the same math the resolver uses.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Semaphore;

use kompas_core::{GeoPoint, Place};

use crate::error::{GuidanceError, Result};
use crate::provider::PlaceSearch;

#[derive(Debug)]
struct MockInner {
    responses: Mutex<VecDeque<Result<Vec<Place>>>>,
    calls: Mutex<Vec<GeoPoint>>,
    /// When set, every search blocks until a permit is released
    release: Option<Arc<Semaphore>>,
}

/// Scripted search collaborator for tests
///
/// Cloning shares the script and the call record, so a test can keep a
/// clone while the service owns the original. With no scripted response
/// remaining, a search returns an empty result.
#[derive(Debug, Clone)]
pub struct MockProvider {
    inner: Arc<MockInner>,
}

impl MockProvider {
    /// Create a provider with an empty script
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MockInner {
                responses: Mutex::new(VecDeque::new()),
                calls: Mutex::new(Vec::new()),
                release: None,
            }),
        }
    }

    /// Create a provider whose searches block until the returned
    /// semaphore receives a permit (one permit per search)
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let release = Arc::new(Semaphore::new(0));
        let provider = Self {
            inner: Arc::new(MockInner {
                responses: Mutex::new(VecDeque::new()),
                calls: Mutex::new(Vec::new()),
                release: Some(Arc::clone(&release)),
            }),
        };
        (provider, release)
    }

    /// Queue a successful search returning `places`
    pub fn push_success(&self, places: Vec<Place>) {
        self.inner.responses.lock().push_back(Ok(places));
    }

    /// Queue a successful search that finds nothing
    pub fn push_empty(&self) {
        self.push_success(Vec::new());
    }

    /// Queue a failed search
    pub fn push_failure(&self, message: &str) {
        self.inner
            .responses
            .lock()
            .push_back(Err(GuidanceError::SearchFailed(message.to_string())));
    }

    /// Number of searches the provider has served
    pub fn call_count(&self) -> usize {
        self.inner.calls.lock().len()
    }

    /// The origins the provider was asked about, in order
    pub fn calls(&self) -> Vec<GeoPoint> {
        self.inner.calls.lock().clone()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlaceSearch for MockProvider {
    async fn search(&self, origin: GeoPoint) -> Result<Vec<Place>> {
        self.inner.calls.lock().push(origin);

        if let Some(release) = &self.inner.release {
            let permit = release
                .acquire()
                .await
                .map_err(|_| GuidanceError::ChannelClosed)?;
            permit.forget();
        }

        match self.inner.responses.lock().pop_front() {
            Some(response) => response,
            None => Ok(Vec::new()),
        }
    }

    fn name(&self) -> &str {
        "MockProvider"
    }
}

/// A place at an exact bearing and distance from `origin`
pub fn candidate(
    origin: GeoPoint,
    bearing_deg: f64,
    distance_m: f64,
    id: &str,
    name: &str,
) -> Place {
    Place::new(
        id,
        name,
        format!("{distance_m:.0} m at {bearing_deg:.0} degrees"),
        origin.destination(bearing_deg, distance_m),
    )
}

/// Three candidates at 500 m, 50 m and 900 m from `origin`
///
/// Deliberately out of distance order: the 50 m entry sits in the
/// middle, so nearest-selection tests fail if the resolver trusts the
/// input order.
pub fn spread_candidates(origin: GeoPoint) -> Vec<Place> {
    vec![
        candidate(origin, 40.0, 500.0, "far", "Turkish Delight"),
        candidate(origin, 135.0, 50.0, "near", "Istanbul Pizza"),
        candidate(origin, 300.0, 900.0, "farthest", "Anatolia Pizza"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> GeoPoint {
        GeoPoint::new(52.3676, 4.9041).unwrap()
    }

    #[tokio::test]
    async fn test_mock_plays_script_in_order() {
        let provider = MockProvider::new();
        provider.push_success(spread_candidates(origin()));
        provider.push_failure("backend 503");

        let first = provider.search(origin()).await.unwrap();
        assert_eq!(first.len(), 3);

        let second = provider.search(origin()).await;
        assert!(matches!(second, Err(GuidanceError::SearchFailed(_))));

        // Script exhausted: empty result
        let third = provider.search(origin()).await.unwrap();
        assert!(third.is_empty());
    }

    #[tokio::test]
    async fn test_mock_records_calls_across_clones() {
        let provider = MockProvider::new();
        let observer = provider.clone();

        provider.search(origin()).await.unwrap();
        let elsewhere = origin().destination(90.0, 250.0);
        provider.search(elsewhere).await.unwrap();

        assert_eq!(observer.call_count(), 2);
        assert_eq!(observer.calls()[1], elsewhere);
    }

    #[tokio::test]
    async fn test_gated_mock_blocks_until_released() {
        let (provider, release) = MockProvider::gated();
        provider.push_empty();

        let worker = {
            let provider = provider.clone();
            tokio::spawn(async move { provider.search(origin()).await })
        };

        // The call is recorded immediately but does not resolve
        tokio::task::yield_now().await;
        assert!(!worker.is_finished());

        release.add_permits(1);
        let result = worker.await.unwrap();
        assert!(result.unwrap().is_empty());
    }

    #[test]
    fn test_candidate_sits_where_asked() {
        let origin = origin();
        let place = candidate(origin, 135.0, 50.0, "near", "Istanbul Pizza");

        assert!((origin.distance_m(place.location) - 50.0).abs() < 0.01);
        assert!((origin.initial_bearing_to(place.location) - 135.0).abs() < 0.01);
        assert_eq!(place.distance_m, None);
    }

    #[test]
    fn test_spread_candidates_are_not_distance_ordered() {
        let origin = origin();
        let places = spread_candidates(origin);
        let distances: Vec<f64> = places
            .iter()
            .map(|p| origin.distance_m(p.location))
            .collect();

        assert!((distances[0] - 500.0).abs() < 0.01);
        assert!((distances[1] - 50.0).abs() < 0.01);
        assert!((distances[2] - 900.0).abs() < 0.01);
    }
}
