//! Bounded position acquisition.
//!
//! The host supplies a [`PositionSource`]; acquisition is wrapped in a
//! timeout so a stalled source surfaces an error instead of hanging.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use incydent_core::Coordinates;

use crate::providers::GeocodeError;

/// Source of the device's current position.
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, GeocodeError>;
}

/// Fixed position, e.g. configured for headless use.
pub struct FixedPositionSource(pub Coordinates);

#[async_trait]
impl PositionSource for FixedPositionSource {
    async fn current_position(&self) -> Result<Coordinates, GeocodeError> {
        Ok(self.0)
    }
}

/// Caches the last acquired position for a tolerance window.
pub struct CachedPosition {
    inner: Arc<dyn PositionSource>,
    tolerance: Duration,
    last: Mutex<Option<(Instant, Coordinates)>>,
}

impl CachedPosition {
    pub fn new(inner: Arc<dyn PositionSource>, tolerance: Duration) -> Self {
        CachedPosition {
            inner,
            tolerance,
            last: Mutex::new(None),
        }
    }
}

#[async_trait]
impl PositionSource for CachedPosition {
    async fn current_position(&self) -> Result<Coordinates, GeocodeError> {
        if let Some((at, coordinates)) = *self.last.lock().unwrap() {
            if at.elapsed() <= self.tolerance {
                return Ok(coordinates);
            }
        }
        let coordinates = self.inner.current_position().await?;
        *self.last.lock().unwrap() = Some((Instant::now(), coordinates));
        Ok(coordinates)
    }
}

/// Acquire a position within `timeout`; exceeding it is an error, not a
/// hang.
pub async fn acquire_position(
    source: &dyn PositionSource,
    timeout: Duration,
) -> Result<Coordinates, GeocodeError> {
    tokio::time::timeout(timeout, source.current_position())
        .await
        .map_err(|_| GeocodeError::PositionTimeout)?
}
