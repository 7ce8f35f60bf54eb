//! Geocoding providers.
//!
//! Two reverse providers are cascaded: a coarse locality-level service
//! first, then a street-level one. A single text-search provider backs the
//! search box.

use std::time::Duration;

use async_trait::async_trait;
use incydent_core::constants::MAX_ADDRESS_LEN;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_LOCALITY_BASE: &str = "https://api.bigdatacloud.net";
pub const DEFAULT_STREET_BASE: &str = "https://nominatim.openstreetmap.org";

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("No results for query")]
    NotFound,

    #[error("Search failed: {0}")]
    SearchFailed(String),

    #[error("Lookup failed: {0}")]
    LookupFailed(String),

    #[error("Position acquisition timed out")]
    PositionTimeout,
}

/// Shared HTTP client for all geocoding providers. The street provider's
/// usage policy requires an identifying user agent.
pub fn shared_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(concat!("incydent/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
}

/// Reverse geocoder: coordinates to a display address.
///
/// `Ok(None)` means the provider answered but had no usable fields; the
/// cascade then falls through to the next provider.
#[async_trait]
pub trait ReverseProvider: Send + Sync {
    async fn reverse(&self, lat: f64, lng: f64) -> Result<Option<String>, GeocodeError>;
}

/// One search-box result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
}

/// Free-text location search.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<SearchHit, GeocodeError>;
}

/// Truncate a display address, appending "..." if shortened.
pub(crate) fn truncate_address(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

// ---------------------------------------------------------------------------
// Locality-level provider (coarse, city/region fields only)

#[derive(Debug, Default, Deserialize)]
struct LocalityResponse {
    #[serde(default)]
    city: String,
    #[serde(default)]
    locality: String,
    #[serde(default, rename = "principalSubdivision")]
    principal_subdivision: String,
}

impl LocalityResponse {
    fn display(&self) -> Option<String> {
        let place = if !self.locality.trim().is_empty() {
            self.locality.trim()
        } else if !self.city.trim().is_empty() {
            self.city.trim()
        } else {
            return None;
        };
        let region = self.principal_subdivision.trim();
        if region.is_empty() || region == place {
            Some(place.to_string())
        } else {
            Some(format!("{}, {}", place, region))
        }
    }
}

pub struct LocalityProvider {
    client: Client,
    base_url: String,
}

impl LocalityProvider {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        LocalityProvider {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ReverseProvider for LocalityProvider {
    async fn reverse(&self, lat: f64, lng: f64) -> Result<Option<String>, GeocodeError> {
        let url = format!(
            "{}/data/reverse-geocode-client?latitude={}&longitude={}&localityLanguage=pl",
            self.base_url, lat, lng
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GeocodeError::LookupFailed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(GeocodeError::LookupFailed(format!(
                "locality lookup returned {}",
                response.status()
            )));
        }
        let body: LocalityResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::LookupFailed(e.to_string()))?;
        Ok(body.display())
    }
}

// ---------------------------------------------------------------------------
// Street-level provider

#[derive(Debug, Default, Deserialize)]
pub struct StreetAddress {
    #[serde(default)]
    pub road: String,
    #[serde(default)]
    pub house_number: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub town: String,
    #[serde(default)]
    pub village: String,
}

impl StreetAddress {
    /// `"road house_number, city"` with absent fields elided.
    pub fn display(&self) -> Option<String> {
        let road = self.road.trim();
        let number = self.house_number.trim();
        let place = [&self.city, &self.town, &self.village]
            .into_iter()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or("");

        let street = match (road.is_empty(), number.is_empty()) {
            (false, false) => format!("{} {}", road, number),
            (false, true) => road.to_string(),
            (true, _) => String::new(),
        };
        match (street.is_empty(), place.is_empty()) {
            (false, false) => Some(format!("{}, {}", street, place)),
            (false, true) => Some(street),
            (true, false) => Some(place.to_string()),
            (true, true) => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct StreetResponse {
    #[serde(default)]
    address: Option<StreetAddress>,
}

pub struct StreetProvider {
    client: Client,
    base_url: String,
}

impl StreetProvider {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        StreetProvider {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ReverseProvider for StreetProvider {
    async fn reverse(&self, lat: f64, lng: f64) -> Result<Option<String>, GeocodeError> {
        let url = format!(
            "{}/reverse?lat={}&lon={}&format=jsonv2&accept-language=pl",
            self.base_url, lat, lng
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GeocodeError::LookupFailed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(GeocodeError::LookupFailed(format!(
                "street lookup returned {}",
                response.status()
            )));
        }
        let body: StreetResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::LookupFailed(e.to_string()))?;
        Ok(body.address.and_then(|a| a.display()))
    }
}

// ---------------------------------------------------------------------------
// Text search

#[derive(Debug, Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
    display_name: String,
}

pub struct TextSearch {
    client: Client,
    base_url: String,
}

impl TextSearch {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        TextSearch {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SearchProvider for TextSearch {
    /// First result only; the formatted address is truncated for display.
    async fn search(&self, query: &str) -> Result<SearchHit, GeocodeError> {
        let url = format!(
            "{}/search?q={}&format=jsonv2&limit=1&accept-language=pl",
            self.base_url,
            urlencoding::encode(query)
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GeocodeError::SearchFailed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(GeocodeError::SearchFailed(format!(
                "search returned {}",
                response.status()
            )));
        }
        let results: Vec<SearchResult> = response
            .json()
            .await
            .map_err(|e| GeocodeError::SearchFailed(e.to_string()))?;
        let first = results.into_iter().next().ok_or(GeocodeError::NotFound)?;

        let lat = first
            .lat
            .parse()
            .map_err(|_| GeocodeError::SearchFailed(format!("bad latitude: {}", first.lat)))?;
        let lng = first
            .lon
            .parse()
            .map_err(|_| GeocodeError::SearchFailed(format!("bad longitude: {}", first.lon)))?;
        Ok(SearchHit {
            lat,
            lng,
            address: truncate_address(&first.display_name, MAX_ADDRESS_LEN),
        })
    }
}
