//! Debounced location resolution with last-write-wins sequencing.
//!
//! Every lookup carries a ticket from a monotonically increasing counter; a
//! result is applied only while its ticket is still the newest, so a slow
//! early response can never overwrite a fresher one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use incydent_core::{Config, Coordinates};
use tokio::task::JoinHandle;

use crate::providers::{
    shared_client, GeocodeError, LocalityProvider, ReverseProvider, SearchHit, SearchProvider,
    StreetProvider, TextSearch, DEFAULT_LOCALITY_BASE, DEFAULT_STREET_BASE,
};

/// Coordinate fallback when every lookup fails: five decimals behind a
/// location marker.
pub fn coordinate_fallback(lat: f64, lng: f64) -> String {
    format!("📍 {:.5}, {:.5}", lat, lng)
}

/// The currently displayed address and its pin, always updated together.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationPin {
    pub address: String,
    pub coordinates: Coordinates,
}

/// Resolves map positions to display addresses.
pub struct LocationResolver {
    cascade: Vec<Arc<dyn ReverseProvider>>,
    search: Arc<dyn SearchProvider>,
    state: Arc<Mutex<Option<LocationPin>>>,
    latest: Arc<AtomicU64>,
    debounce: Duration,
}

impl LocationResolver {
    pub fn new(
        cascade: Vec<Arc<dyn ReverseProvider>>,
        search: Arc<dyn SearchProvider>,
        debounce: Duration,
    ) -> Self {
        LocationResolver {
            cascade,
            search,
            state: Arc::new(Mutex::new(None)),
            latest: Arc::new(AtomicU64::new(0)),
            debounce,
        }
    }

    /// Wire up the default provider cascade from configuration.
    pub fn from_config(config: &Config) -> reqwest::Result<Self> {
        let client = shared_client(config.geocode_timeout)?;
        Ok(Self::new(
            vec![
                Arc::new(LocalityProvider::new(client.clone(), DEFAULT_LOCALITY_BASE)),
                Arc::new(StreetProvider::new(client.clone(), DEFAULT_STREET_BASE)),
            ],
            Arc::new(TextSearch::new(client, DEFAULT_STREET_BASE)),
            config.geocode_debounce,
        ))
    }

    /// Latest resolved location, if any.
    pub fn current(&self) -> Option<LocationPin> {
        self.state.lock().unwrap().clone()
    }

    fn take_ticket(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn apply_if_current(
        state: &Mutex<Option<LocationPin>>,
        latest: &AtomicU64,
        ticket: u64,
        pin: LocationPin,
    ) -> bool {
        // Address and coordinates swap in together; a superseded ticket is
        // discarded without touching the state.
        let mut guard = state.lock().unwrap();
        if latest.load(Ordering::SeqCst) == ticket {
            *guard = Some(pin);
            true
        } else {
            tracing::debug!(ticket, "Discarding superseded geocode response");
            false
        }
    }

    async fn run_cascade(cascade: &[Arc<dyn ReverseProvider>], lat: f64, lng: f64) -> String {
        for provider in cascade {
            match provider.reverse(lat, lng).await {
                Ok(Some(address)) => return address,
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!(error = %e, "Reverse provider failed, trying next");
                    continue;
                }
            }
        }
        // Cascade exhausted: degrade to coordinates, not an error.
        coordinate_fallback(lat, lng)
    }

    /// Resolve immediately (no debounce) and publish the result if it is
    /// still the newest request.
    pub async fn resolve(&self, lat: f64, lng: f64) -> String {
        let ticket = self.take_ticket();
        let address = Self::run_cascade(&self.cascade, lat, lng).await;
        Self::apply_if_current(
            &self.state,
            &self.latest,
            ticket,
            LocationPin {
                address: address.clone(),
                coordinates: Coordinates { lat, lng },
            },
        );
        address
    }

    /// Register a map movement. The lookup fires only after the debounce
    /// delay passes without another movement; earlier pending lookups are
    /// superseded.
    pub fn notify_moved(&self, lat: f64, lng: f64) -> JoinHandle<()> {
        let ticket = self.take_ticket();
        let cascade = self.cascade.clone();
        let state = Arc::clone(&self.state);
        let latest = Arc::clone(&self.latest);
        let debounce = self.debounce;

        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if latest.load(Ordering::SeqCst) != ticket {
                return;
            }
            let address = Self::run_cascade(&cascade, lat, lng).await;
            Self::apply_if_current(
                &state,
                &latest,
                ticket,
                LocationPin {
                    address,
                    coordinates: Coordinates { lat, lng },
                },
            );
        })
    }

    /// Search-box lookup: first result only, recenters the current pin.
    pub async fn search(&self, query: &str) -> Result<SearchHit, GeocodeError> {
        let hit = self.search.search(query).await?;
        let ticket = self.take_ticket();
        Self::apply_if_current(
            &self.state,
            &self.latest,
            ticket,
            LocationPin {
                address: hit.address.clone(),
                coordinates: Coordinates {
                    lat: hit.lat,
                    lng: hit.lng,
                },
            },
        );
        Ok(hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct ScriptedReverse {
        answers: Vec<Result<Option<String>, GeocodeError>>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl ScriptedReverse {
        fn answering(answer: Option<&str>) -> Arc<Self> {
            Arc::new(ScriptedReverse {
                answers: vec![Ok(answer.map(str::to_string))],
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            })
        }
    }

    #[async_trait]
    impl ReverseProvider for ScriptedReverse {
        async fn reverse(&self, _lat: f64, _lng: f64) -> Result<Option<String>, GeocodeError> {
            tokio::time::sleep(self.delay).await;
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let idx = call.min(self.answers.len() - 1);
            match &self.answers[idx] {
                Ok(v) => Ok(v.clone()),
                Err(_) => Err(GeocodeError::LookupFailed("scripted".into())),
            }
        }
    }

    struct NoSearch;

    #[async_trait]
    impl SearchProvider for NoSearch {
        async fn search(&self, _query: &str) -> Result<SearchHit, GeocodeError> {
            Err(GeocodeError::NotFound)
        }
    }

    fn resolver(
        cascade: Vec<Arc<dyn ReverseProvider>>,
        debounce: Duration,
    ) -> LocationResolver {
        LocationResolver::new(cascade, Arc::new(NoSearch), debounce)
    }

    #[tokio::test]
    async fn cascade_falls_through_to_street_provider() {
        let coarse = ScriptedReverse::answering(None);
        let street = ScriptedReverse::answering(Some("Main 5, X"));
        let resolver = resolver(vec![coarse, street], Duration::ZERO);

        let address = resolver.resolve(52.0, 21.0).await;
        assert_eq!(address, "Main 5, X");
        let pin = resolver.current().expect("pin set");
        assert_eq!(pin.address, "Main 5, X");
        assert_eq!(pin.coordinates, Coordinates { lat: 52.0, lng: 21.0 });
    }

    #[tokio::test]
    async fn exhausted_cascade_degrades_to_coordinates() {
        let coarse = Arc::new(ScriptedReverse {
            answers: vec![Err(GeocodeError::LookupFailed("down".into()))],
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        });
        let street = ScriptedReverse::answering(None);
        let resolver = resolver(vec![coarse, street], Duration::ZERO);

        let address = resolver.resolve(51.2345678, 17.9876543).await;
        assert_eq!(address, "📍 51.23457, 17.98765");
    }

    #[tokio::test]
    async fn debounce_resolves_only_the_last_movement() {
        let provider = Arc::new(ScriptedReverse {
            answers: vec![Ok(Some("resolved".to_string()))],
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        });
        let resolver = resolver(vec![provider.clone()], Duration::from_millis(30));

        resolver.notify_moved(1.0, 1.0);
        resolver.notify_moved(2.0, 2.0);
        let last = resolver.notify_moved(3.0, 3.0);
        last.await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        // Only the final movement survived its debounce window.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        let pin = resolver.current().expect("pin set");
        assert_eq!(pin.coordinates, Coordinates { lat: 3.0, lng: 3.0 });
    }

    #[tokio::test]
    async fn stale_response_never_overwrites_a_newer_one() {
        // First lookup is slow; a fresh resolve lands while it is in
        // flight. The slow result must be discarded on arrival.
        let slow = Arc::new(ScriptedReverse {
            answers: vec![Ok(Some("stale".to_string()))],
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(80),
        });
        let resolver = LocationResolver::new(
            vec![slow],
            Arc::new(NoSearch),
            Duration::from_millis(1),
        );

        let first = resolver.notify_moved(1.0, 1.0);
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Newer request resolved directly via the same state.
        let fresh = ScriptedReverse::answering(Some("fresh"));
        let fast_resolver = LocationResolver {
            cascade: vec![fresh],
            search: Arc::new(NoSearch),
            state: Arc::clone(&resolver.state),
            latest: Arc::clone(&resolver.latest),
            debounce: Duration::ZERO,
        };
        fast_resolver.resolve(2.0, 2.0).await;

        first.await.unwrap();
        let pin = resolver.current().expect("pin set");
        assert_eq!(pin.address, "fresh");
        assert_eq!(pin.coordinates, Coordinates { lat: 2.0, lng: 2.0 });
    }
}
