//! Search collaborator seam
//!
//! The guidance service never talks to a places backend directly; it goes
//! through the [`PlaceSearch`] trait. A real deployment plugs in an HTTP
//! client here. [`StaticProvider`] is the in-process implementation used
//! by the demo binary and tests: a deterministic neighborhood laid out
//! around whatever origin it is asked about.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use kompas_core::{GeoPoint, Place};

use crate::config::SearchConfig;
use crate::error::Result;

/// Trait for nearby-place search collaborators
///
/// Implementations return candidate places near an origin. Results are
/// unordered and carry no `distance_m`/`bearing_deg` stamps; the
/// resolver measures candidates itself. An empty vec means the area was
/// searched and holds nothing, which is an answer, not an error.
#[async_trait]
pub trait PlaceSearch: Send + Sync {
    /// Find candidate places near `origin`
    ///
    /// Transport, decode and timeout problems surface as
    /// [`GuidanceError::SearchFailed`](crate::error::GuidanceError) or
    /// [`SearchTimeout`](crate::error::GuidanceError::SearchTimeout);
    /// the collaborator owns its own timeout policy.
    async fn search(&self, origin: GeoPoint) -> Result<Vec<Place>>;

    /// Get the provider name (for logging)
    fn name(&self) -> &str {
        "unnamed"
    }
}

/// Fixture neighborhood: (latitude offset, longitude offset, name,
/// address, rating, open)
const FIXTURE_PLACES: &[(f64, f64, &str, &str, f64, bool)] = &[
    (0.002, 0.003, "Istanbul Pizza", "123 Main Street", 4.5, true),
    (-0.001, 0.002, "Turkish Delight", "456 Elm Avenue", 4.2, true),
    (0.001, -0.001, "Ankara Pide House", "789 Oak Boulevard", 4.7, false),
    (-0.002, -0.003, "Anatolia Pizza", "321 Pine Road", 3.9, true),
];

/// Deterministic in-process search provider
///
/// Lays the fixture neighborhood out at fixed coordinate offsets from
/// the search origin, then applies the configured `open_now` and
/// `radius_m` filters. An optional simulated latency makes demo runs
/// behave like a real backend.
pub struct StaticProvider {
    config: SearchConfig,
    latency: Option<Duration>,
}

impl StaticProvider {
    /// Create a provider with the given search settings
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            latency: None,
        }
    }

    /// Simulate backend latency on every search
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

#[async_trait]
impl PlaceSearch for StaticProvider {
    async fn search(&self, origin: GeoPoint) -> Result<Vec<Place>> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut places = Vec::with_capacity(FIXTURE_PLACES.len());
        for (index, (dlat, dlon, name, address, rating, is_open)) in
            FIXTURE_PLACES.iter().enumerate()
        {
            if self.config.open_now && !is_open {
                continue;
            }

            let location =
                GeoPoint::new(origin.latitude() + dlat, origin.longitude() + dlon)?;
            if origin.distance_m(location) > self.config.radius_m {
                continue;
            }

            places.push(
                Place::new(format!("store{}", index + 1), *name, *address, location)
                    .with_rating(*rating)
                    .with_open(*is_open),
            );
        }

        debug!(
            origin = %origin,
            count = places.len(),
            open_now = self.config.open_now,
            "Static provider search"
        );

        Ok(places)
    }

    fn name(&self) -> &str {
        "StaticProvider"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> GeoPoint {
        GeoPoint::new(52.3676, 4.9041).unwrap()
    }

    #[tokio::test]
    async fn test_returns_unstamped_fixture_places() {
        let provider = StaticProvider::new(SearchConfig::default());
        let places = provider.search(origin()).await.unwrap();

        assert_eq!(places.len(), 4);
        for place in &places {
            assert_eq!(place.distance_m, None);
            assert_eq!(place.bearing_deg, None);
        }
        assert_eq!(places[0].name, "Istanbul Pizza");
        assert_eq!(places[2].rating, Some(4.7));
        assert!(!places[2].is_open);
    }

    #[tokio::test]
    async fn test_open_now_drops_closed_places() {
        let mut config = SearchConfig::default();
        config.open_now = true;

        let provider = StaticProvider::new(config);
        let places = provider.search(origin()).await.unwrap();

        assert_eq!(places.len(), 3);
        assert!(places.iter().all(|p| p.is_open));
        assert!(!places.iter().any(|p| p.name == "Ankara Pide House"));
    }

    #[tokio::test]
    async fn test_radius_filter_can_empty_the_result() {
        let mut config = SearchConfig::default();
        // The closest fixture sits over 100 m away
        config.radius_m = 50.0;

        let provider = StaticProvider::new(config);
        let places = provider.search(origin()).await.unwrap();
        assert!(places.is_empty());
    }

    #[tokio::test]
    async fn test_same_origin_is_deterministic() {
        let provider = StaticProvider::new(SearchConfig::default());
        let first = provider.search(origin()).await.unwrap();
        let second = provider.search(origin()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_provider_name() {
        let provider = StaticProvider::new(SearchConfig::default());
        assert_eq!(provider.name(), "StaticProvider");
    }
}
