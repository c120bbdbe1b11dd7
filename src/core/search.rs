use crate::core::{
    distance::distance_miles,
    fields::CoordinateFields,
    sorting::SortKey,
};
use crate::models::{Contact, Coordinate, EnrichedContact};

/// Radius filter over an in-memory contact snapshot
///
/// # Pipeline Stages
/// 1. Coordinate extraction (contacts without an address or a valid stored
///    coordinate drop out silently)
/// 2. Distance computation against the anchor
/// 3. Inclusive radius filter
/// 4. Sorting by the requested key
#[derive(Debug, Clone, Default)]
pub struct RadiusSearchEngine {
    fields: CoordinateFields,
}

impl RadiusSearchEngine {
    pub fn new(fields: CoordinateFields) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &CoordinateFields {
        &self.fields
    }

    /// Contacts within `radius_miles` of `anchor`, enriched with their distance
    /// and ordered by `sort_key`.
    ///
    /// Pure: the same snapshot and arguments always give the same output.
    pub fn search(
        &self,
        contacts: &[Contact],
        anchor: Coordinate,
        radius_miles: f64,
        sort_key: &SortKey,
    ) -> Vec<EnrichedContact> {
        let mut results: Vec<EnrichedContact> = contacts
            .iter()
            // Stage 1: stored coordinate
            .filter(|contact| contact.has_address())
            .filter_map(|contact| {
                let coordinate = self.fields.coordinate_of(contact)?;
                Some((contact, coordinate))
            })
            // Stage 2 & 3: distance within radius (NaN fails the comparison)
            .filter_map(|(contact, coordinate)| {
                let distance = distance_miles(anchor, coordinate);
                (distance <= radius_miles).then(|| EnrichedContact {
                    contact: contact.clone(),
                    distance_miles: distance,
                })
            })
            .collect();

        // Stage 4
        sort_key.sort(&mut results);

        tracing::debug!(
            "Radius search kept {} of {} contacts within {} mi",
            results.len(),
            contacts.len(),
            radius_miles
        );

        results
    }
}

/// Narrow an already-sorted result set by case-insensitive substring match on
/// "firstName lastName". Order is preserved; a blank needle keeps everything.
pub fn filter_by_name<'a>(results: &'a [EnrichedContact], needle: &str) -> Vec<&'a EnrichedContact> {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return results.iter().collect();
    }
    results
        .iter()
        .filter(|r| r.contact.display_name().to_lowercase().contains(&needle))
        .collect()
}
