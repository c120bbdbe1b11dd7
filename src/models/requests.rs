use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::domain::Coordinate;

/// Request to search for contacts around an anchor
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_anchor_source"))]
pub struct SearchRequest {
    #[serde(default)]
    pub address: String,
    /// Explicit anchor, skips geocoding of `address` when present
    #[serde(default)]
    pub anchor: Option<Coordinate>,
    #[validate(range(exclusive_min = 0.0))]
    #[serde(alias = "radius_miles", rename = "radiusMiles", default = "default_radius")]
    pub radius_miles: f64,
    #[serde(alias = "sort_key", rename = "sortKey", default = "default_sort_key")]
    pub sort_key: String,
    #[serde(default)]
    pub name: Option<String>,
}

fn default_radius() -> f64 {
    5.0
}

fn default_sort_key() -> String {
    "distance".to_string()
}

fn validate_anchor_source(req: &SearchRequest) -> Result<(), ValidationError> {
    if req.anchor.is_none() && req.address.trim().is_empty() {
        return Err(ValidationError::new("address_or_anchor_required"));
    }
    Ok(())
}
