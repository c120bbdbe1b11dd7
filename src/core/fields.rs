use crate::models::{Contact, Coordinate};

/// Lookup of a custom field value by identifier.
///
/// A field whose `key` equals the identifier wins over one whose `id` does;
/// within each pass the first match is used.
pub trait ResolveField {
    fn resolve_field(&self, identifier: &str) -> Option<&str>;
}

impl ResolveField for Contact {
    fn resolve_field(&self, identifier: &str) -> Option<&str> {
        self.custom_fields
            .iter()
            .find(|f| f.key.as_deref() == Some(identifier))
            .or_else(|| self.custom_fields.iter().find(|f| f.id == identifier))
            .and_then(|f| f.value.as_deref())
    }
}

/// Custom field identifiers holding a contact's stored coordinate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinateFields {
    pub latitude: String,
    pub longitude: String,
}

impl Default for CoordinateFields {
    fn default() -> Self {
        Self {
            latitude: "contact.custom_lat".to_string(),
            longitude: "contact.custom_lng".to_string(),
        }
    }
}

impl CoordinateFields {
    /// Stored coordinate of a contact, if both fields parse and are in range
    pub fn coordinate_of<C: ResolveField>(&self, contact: &C) -> Option<Coordinate> {
        let lat = parse_numeric(contact.resolve_field(&self.latitude)?)?;
        let lng = parse_numeric(contact.resolve_field(&self.longitude)?)?;
        Coordinate::checked(lat, lng)
    }

    /// Whether the contact still needs geocoding.
    ///
    /// Anything short of a full valid pair counts, so a half-written
    /// coordinate gets repaired on the next batch run.
    pub fn needs_geocoding(&self, contact: &Contact) -> bool {
        contact.has_address() && self.coordinate_of(contact).is_none()
    }
}

/// Strip every character that is not a digit, `.` or `-`.
///
/// Returns `None` when nothing survives.
pub fn sanitize_numeric(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Sanitize then parse; malformed values are `None`
pub fn parse_numeric(raw: &str) -> Option<f64> {
    sanitize_numeric(raw)?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Text format of a coordinate component written back to the CRM
pub fn format_coordinate_component(value: f64) -> String {
    format!("{:.6}", value)
}
