use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::core::fields::{parse_numeric, ResolveField};
use crate::models::EnrichedContact;

pub const DISTANCE_SORT_KEY: &str = "distance";

/// How a sortable custom field is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Numeric,
    Date,
}

/// Custom field exposed as a sort option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortableField {
    /// Name clients pass as `sortKey`
    pub name: String,
    /// Custom field key or id
    pub field: String,
    pub kind: FieldKind,
}

/// Resolved ordering for a result set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
    Distance,
    Field { field: String, kind: FieldKind },
}

impl SortKey {
    /// Resolve a client-supplied key against the configured sortable fields
    pub fn resolve(name: &str, sortable: &[SortableField]) -> Option<Self> {
        if name == DISTANCE_SORT_KEY {
            return Some(Self::Distance);
        }
        sortable.iter().find(|s| s.name == name).map(|s| Self::Field {
            field: s.field.clone(),
            kind: s.kind,
        })
    }

    /// Stable sort in place: distance ascending, numeric and date fields descending
    pub fn sort(&self, results: &mut [EnrichedContact]) {
        match self {
            Self::Distance => results.sort_by(|a, b| {
                a.distance_miles
                    .partial_cmp(&b.distance_miles)
                    .unwrap_or(Ordering::Equal)
            }),
            Self::Field { field, kind: FieldKind::Numeric } => {
                results.sort_by_cached_key(|r| std::cmp::Reverse(OrderedValue(numeric_value(r, field))))
            }
            Self::Field { field, kind: FieldKind::Date } => {
                results.sort_by_cached_key(|r| std::cmp::Reverse(date_value(r, field)))
            }
        }
    }
}

/// f64 wrapper with a total order for sort keys
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrderedValue(f64);

impl Eq for OrderedValue {}

impl PartialOrd for OrderedValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Missing or unparsable values count as 0
fn numeric_value(result: &EnrichedContact, field: &str) -> f64 {
    result
        .contact
        .resolve_field(field)
        .and_then(parse_numeric)
        .unwrap_or(0.0)
}

/// Unix milliseconds; missing or unparsable values count as the epoch
fn date_value(result: &EnrichedContact, field: &str) -> i64 {
    result
        .contact
        .resolve_field(field)
        .and_then(parse_date_millis)
        .unwrap_or(0)
}

/// Parse RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD`, `MM/DD/YYYY` or raw
/// epoch milliseconds.
pub fn parse_date_millis(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc().timestamp_millis());
    }
    for format in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp_millis());
        }
    }
    if raw.chars().all(|c| c.is_ascii_digit()) {
        return raw.parse().ok();
    }
    None
}
