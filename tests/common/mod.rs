// Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use nearby_contacts::core::{CoordinateFields, PauseToken};
use nearby_contacts::models::{Contact, Coordinate, CustomField};
use nearby_contacts::services::{
    ContactDirectory, DirectoryError, GeocodeClient, GeocodeError,
};

pub const LAT_FIELD: &str = "contact.custom_lat";
pub const LNG_FIELD: &str = "contact.custom_lng";

/// Contact at `{n} Main St, Springfield, PA`, optionally with a stored coordinate
pub fn contact(id: &str, n: usize, coord: Option<Coordinate>) -> Contact {
    let mut contact = Contact {
        id: id.to_string(),
        first_name: Some(format!("First{}", n)),
        last_name: Some(format!("Last{}", n)),
        phone: Some("555-0100".to_string()),
        email: None,
        address1: Some(format!("{} Main St", n)),
        city: Some("Springfield".to_string()),
        state: Some("PA".to_string()),
        postal_code: None,
        custom_fields: vec![],
    };
    if let Some(c) = coord {
        write_coordinate(&mut contact, c);
    }
    contact
}

pub fn named(id: &str, first: &str, last: &str, coord: Coordinate) -> Contact {
    let mut c = contact(id, 1, Some(coord));
    c.first_name = Some(first.to_string());
    c.last_name = Some(last.to_string());
    c
}

pub fn with_field(mut contact: Contact, id: &str, value: &str) -> Contact {
    contact.custom_fields.push(CustomField {
        id: id.to_string(),
        key: None,
        value: Some(value.to_string()),
    });
    contact
}

fn write_coordinate(contact: &mut Contact, c: Coordinate) {
    contact
        .custom_fields
        .retain(|f| f.id != LAT_FIELD && f.id != LNG_FIELD);
    contact.custom_fields.push(CustomField {
        id: LAT_FIELD.to_string(),
        key: None,
        value: Some(c.lat.to_string()),
    });
    contact.custom_fields.push(CustomField {
        id: LNG_FIELD.to_string(),
        key: None,
        value: Some(c.lng.to_string()),
    });
}

/// Ten addressed contacts, `c1`..`c10`, none geocoded
pub fn ungeocoded(count: usize) -> Vec<Contact> {
    (1..=count).map(|n| contact(&format!("c{}", n), n, None)).collect()
}

/// Point `miles` due north of `anchor`
pub fn north_of(anchor: Coordinate, miles: f64) -> Coordinate {
    Coordinate::new(anchor.lat + (miles / 3959.0).to_degrees(), anchor.lng)
}

/// In-memory CRM that applies coordinate writes to its own records
#[derive(Default)]
pub struct MockDirectory {
    contacts: Mutex<Vec<Contact>>,
    fail_writes: HashSet<String>,
    unauthorized: AtomicBool,
    pub list_calls: AtomicUsize,
    writes: Mutex<Vec<String>>,
}

impl MockDirectory {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self {
            contacts: Mutex::new(contacts),
            ..Default::default()
        }
    }

    pub fn failing_writes<const N: usize>(mut self, ids: [&str; N]) -> Self {
        self.fail_writes = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn set_unauthorized(&self, value: bool) {
        self.unauthorized.store(value, Ordering::SeqCst);
    }

    /// Simulate another process writing a coordinate
    pub fn store_coordinate(&self, id: &str, coord: Coordinate) {
        let mut contacts = self.contacts.lock().unwrap();
        if let Some(c) = contacts.iter_mut().find(|c| c.id == id) {
            write_coordinate(c, coord);
        }
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    pub fn geocoded_ids(&self) -> Vec<String> {
        let fields = CoordinateFields::default();
        self.contacts
            .lock()
            .unwrap()
            .iter()
            .filter(|c| fields.coordinate_of(*c).is_some())
            .map(|c| c.id.clone())
            .collect()
    }
}

#[async_trait]
impl ContactDirectory for MockDirectory {
    async fn list_all(&self, account_id: &str) -> Result<Vec<Contact>, DirectoryError> {
        if account_id.is_empty() {
            return Err(DirectoryError::MissingCredential("account id"));
        }
        if self.unauthorized.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unauthorized);
        }
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.contacts.lock().unwrap().clone())
    }

    async fn set_coordinates(
        &self,
        contact_id: &str,
        coordinate: Coordinate,
    ) -> Result<(), DirectoryError> {
        self.writes.lock().unwrap().push(contact_id.to_string());
        if self.fail_writes.contains(contact_id) {
            return Err(DirectoryError::ApiError(format!(
                "Failed to update contact {}: 500 Internal Server Error",
                contact_id
            )));
        }
        self.store_coordinate(contact_id, coordinate);
        Ok(())
    }
}

/// Geocoder keyed on the street part of the address (text before the first comma)
#[derive(Default)]
pub struct MockGeocoder {
    fixed: HashMap<String, Coordinate>,
    unresolvable: HashSet<String>,
    failing: HashSet<String>,
    pause_after: Option<(usize, PauseToken)>,
    calls: Mutex<Vec<String>>,
}

impl MockGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_location(mut self, street: &str, coord: Coordinate) -> Self {
        self.fixed.insert(street.to_string(), coord);
        self
    }

    pub fn unresolvable(mut self, street: &str) -> Self {
        self.unresolvable.insert(street.to_string());
        self
    }

    pub fn failing(mut self, street: &str) -> Self {
        self.failing.insert(street.to_string());
        self
    }

    /// Trigger `token` while handling the `n`th call
    pub fn pause_after(mut self, n: usize, token: PauseToken) -> Self {
        self.pause_after = Some((n, token));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, street: &str) -> usize {
        self.calls()
            .iter()
            .filter(|a| street_of(a) == street)
            .count()
    }
}

fn street_of(address: &str) -> &str {
    address.split(',').next().unwrap_or(address).trim()
}

#[async_trait]
impl GeocodeClient for MockGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, GeocodeError> {
        let call_number = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(address.to_string());
            calls.len()
        };

        if let Some((n, token)) = &self.pause_after {
            if *n == call_number {
                token.pause();
            }
        }

        let street = street_of(address);
        if self.failing.contains(street) {
            return Err(GeocodeError::ApiError("Geocoding request failed: 503".into()));
        }
        if self.unresolvable.contains(street) {
            return Ok(None);
        }
        if let Some(coord) = self.fixed.get(street) {
            return Ok(Some(*coord));
        }
        Ok(Some(Coordinate::new(40.0 + call_number as f64 * 0.001, -75.0)))
    }
}
