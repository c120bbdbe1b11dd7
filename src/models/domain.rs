use serde::{Deserialize, Deserializer, Serialize};

/// Geographic point in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    /// Build a coordinate without range checks
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Build a coordinate, rejecting non-finite or out-of-range components
    pub fn checked(lat: f64, lng: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        valid.then_some(Self { lat, lng })
    }
}

/// CRM-defined attribute attached to a contact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomField {
    pub id: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default, deserialize_with = "field_value_as_string")]
    pub value: Option<String>,
}

/// Contact record as returned by the CRM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    #[serde(rename = "firstName", default)]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address1: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(rename = "postalCode", default)]
    pub postal_code: Option<String>,
    #[serde(rename = "customFields", default)]
    pub custom_fields: Vec<CustomField>,
}

impl Contact {
    /// "firstName lastName", with missing parts left empty
    pub fn display_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        )
    }

    /// Whether the contact carries a street address
    pub fn has_address(&self) -> bool {
        self.address1
            .as_deref()
            .is_some_and(|a| !a.trim().is_empty())
    }

    /// Free-text address suitable for the geocoder.
    ///
    /// Joins `address1, city, state postalCode`, skipping blank parts.
    pub fn geocodable_address(&self) -> String {
        let region = [self.state.as_deref(), self.postal_code.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        [self.address1.as_deref(), self.city.as_deref(), Some(region.as_str())]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Contact within the search radius, with its computed distance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedContact {
    #[serde(flatten)]
    pub contact: Contact,
    #[serde(rename = "distanceMiles")]
    pub distance_miles: f64,
}

/// Resolved search parameters
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub address: String,
    pub anchor: Option<Coordinate>,
    pub radius_miles: f64,
    pub sort_key: String,
    pub name_filter: Option<String>,
}

/// Recently used anchor search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHistoryEntry {
    pub address: String,
    #[serde(rename = "radiusMiles")]
    pub radius_miles: f64,
    #[serde(rename = "sortKey")]
    pub sort_key: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchState {
    Idle,
    Running,
    Paused,
    Completed,
}

/// Snapshot of a batch geocoding run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub current: usize,
    pub total: usize,
    #[serde(rename = "successCount")]
    pub success_count: usize,
    #[serde(rename = "failCount")]
    pub fail_count: usize,
    pub state: BatchState,
}

impl BatchProgress {
    pub const fn idle() -> Self {
        Self {
            current: 0,
            total: 0,
            success_count: 0,
            fail_count: 0,
            state: BatchState::Idle,
        }
    }
}

impl Default for BatchProgress {
    fn default() -> Self {
        Self::idle()
    }
}

/// Accepts string, number, or bool custom-field values and keeps them as text
fn field_value_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
