//! Masters search client.
//!
//! Builds `/api/masters` queries, sends them through the host's fetch path
//! and parses the `{ "items": [...] }` payload.

use tracing::debug;
use url::Url;

use crate::host::Host;
use crate::http::{resolve, Request};
use crate::models::{Master, MastersResponse, Service};
use crate::worker::Source;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

const MASTERS_PATH: &str = "/api/masters";

/// Default search radius, matching the API's own default.
pub const DEFAULT_RADIUS_KM: f64 = 2.0;

/// Only the nearest few results are shown.
const MAX_RESULTS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct MastersQuery {
    pub service: Service,
    pub radius_km: f64,
    pub lat: f64,
    pub lng: f64,
}

impl MastersQuery {
    pub fn new(service: Service, lat: f64, lng: f64) -> Self {
        Self {
            service,
            radius_km: DEFAULT_RADIUS_KM,
            lat,
            lng,
        }
    }

    pub fn with_radius(mut self, radius_km: f64) -> Self {
        self.radius_km = radius_km;
        self
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if !(self.radius_km.is_finite() && self.radius_km > 0.0) {
            return Err(ApiError::InvalidQuery(format!(
                "radius must be positive, got {}",
                self.radius_km
            )));
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(ApiError::InvalidQuery(format!("latitude out of range: {}", self.lat)));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(ApiError::InvalidQuery(format!("longitude out of range: {}", self.lng)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SearchResults {
    pub masters: Vec<Master>,
    pub source: Source,
}

#[derive(Debug, Clone)]
pub struct MastersClient {
    origin: Url,
}

impl MastersClient {
    pub fn new(origin: Url) -> Self {
        Self { origin }
    }

    pub fn search_url(&self, query: &MastersQuery) -> Result<Url, ApiError> {
        query.validate()?;
        let mut url = resolve(&self.origin, MASTERS_PATH)?;
        url.query_pairs_mut()
            .append_pair("service", query.service.as_str())
            .append_pair("radius_km", &query.radius_km.to_string())
            .append_pair("lat", &query.lat.to_string())
            .append_pair("lng", &query.lng.to_string());
        Ok(url)
    }

    /// Search for masters near a location. At most five are returned, in
    /// the order the API ranked them.
    pub async fn search(&self, host: &Host, query: &MastersQuery) -> Result<SearchResults, ApiError> {
        let url = self.search_url(query)?;
        let request = Request::get(url).with_header("accept", "application/json");

        let served = host.fetch(&request).await?;
        let response = served.response;
        if !response.is_ok() {
            return Err(ApiError::from_status(response.status, &response.text()));
        }

        let parsed: MastersResponse = serde_json::from_slice(&response.body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse masters response: {}", e)))?;
        debug!(service = %query.service, count = parsed.items.len(), source = served.source.as_str(), "Masters search complete");

        let mut masters = parsed.items;
        masters.truncate(MAX_RESULTS);
        Ok(SearchResults {
            masters,
            source: served.source,
        })
    }
}
