//! Location resolution: cascading reverse geocoders, debounced map-movement
//! lookups with stale-response discard, text search, and bounded position
//! acquisition.

pub mod position;
pub mod providers;
pub mod resolver;

pub use position::{acquire_position, CachedPosition, FixedPositionSource, PositionSource};
pub use providers::{
    shared_client, GeocodeError, LocalityProvider, ReverseProvider, SearchHit, SearchProvider,
    StreetProvider, TextSearch,
};
pub use resolver::{coordinate_fallback, LocationPin, LocationResolver};
