use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::models::Coordinate;

/// Errors that can occur when calling the geocoding API
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Geocoder access token is not configured")]
    MissingCredential,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Resolves free-text addresses to coordinates.
///
/// `Ok(None)` means the address could not be matched; `Err` is reserved for
/// transport and API failures.
#[async_trait]
pub trait GeocodeClient: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, GeocodeError>;
}

/// Mapbox Geocoding v5 client
pub struct MapboxClient {
    base_url: String,
    access_token: Option<String>,
    client: Client,
}

impl MapboxClient {
    /// Create a new Mapbox client
    pub fn new(base_url: String, access_token: Option<String>, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            access_token: access_token.filter(|t| !t.trim().is_empty()),
            client,
        }
    }
}

#[async_trait]
impl GeocodeClient for MapboxClient {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, GeocodeError> {
        let address = address.trim();
        if address.is_empty() {
            return Ok(None);
        }
        let token = self
            .access_token
            .as_deref()
            .ok_or(GeocodeError::MissingCredential)?;

        let url = format!(
            "{}/geocoding/v5/mapbox.places/{}.json",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(address)
        );

        tracing::debug!("Geocoding address: {}", address);

        let response = self
            .client
            .get(&url)
            .query(&[("access_token", token), ("limit", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodeError::ApiError(format!(
                "Geocoding request failed: {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;
        parse_first_feature(&json)
    }
}

/// Extract the first feature's `center`, which Mapbox orders `[lng, lat]`
fn parse_first_feature(json: &Value) -> Result<Option<Coordinate>, GeocodeError> {
    let features = json
        .get("features")
        .and_then(|f| f.as_array())
        .ok_or_else(|| GeocodeError::InvalidResponse("Missing features array".into()))?;

    let Some(feature) = features.first() else {
        return Ok(None);
    };

    let center = feature
        .get("center")
        .and_then(|c| c.as_array())
        .ok_or_else(|| GeocodeError::InvalidResponse("Feature has no center".into()))?;

    match (
        center.first().and_then(Value::as_f64),
        center.get(1).and_then(Value::as_f64),
    ) {
        (Some(lng), Some(lat)) => Coordinate::checked(lat, lng)
            .map(Some)
            .ok_or_else(|| GeocodeError::InvalidResponse(format!("Center out of range: {lat}, {lng}"))),
        _ => Err(GeocodeError::InvalidResponse("Malformed feature center".into())),
    }
}
