use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::core::fields::{format_coordinate_component, CoordinateFields};
use crate::models::{Contact, Coordinate};

/// API version header required by the CRM
const API_VERSION: &str = "2021-07-28";

/// Largest `limit` the contacts endpoint honours
pub const MAX_PAGE_SIZE: usize = 100;

/// Errors that can occur when interacting with the CRM
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Unauthorized: access token rejected")]
    Unauthorized,

    #[error("Missing CRM credential: {0}")]
    MissingCredential(&'static str),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Pagination limit reached: exceeded {max_pages} pages")]
    PaginationLimit { max_pages: usize },
}

impl DirectoryError {
    /// Whether the operator has to reconnect before retrying
    pub fn is_credential_error(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::MissingCredential(_))
    }
}

/// Contact store owned by the CRM
#[async_trait]
pub trait ContactDirectory: Send + Sync {
    /// Every contact of the account, paging until exhaustion
    async fn list_all(&self, account_id: &str) -> Result<Vec<Contact>, DirectoryError>;

    /// Write a coordinate onto a contact's custom fields. Idempotent.
    async fn set_coordinates(
        &self,
        contact_id: &str,
        coordinate: Coordinate,
    ) -> Result<(), DirectoryError>;
}

/// GoHighLevel contacts API client
pub struct GhlClient {
    base_url: String,
    access_token: Option<String>,
    fields: CoordinateFields,
    page_size: usize,
    max_pages: usize,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ContactsPage {
    #[serde(default)]
    contacts: Vec<Contact>,
    #[serde(default)]
    meta: Option<PageMeta>,
}

#[derive(Debug, Deserialize)]
struct PageMeta {
    #[serde(rename = "startAfterId", default)]
    start_after_id: Option<String>,
    #[serde(rename = "startAfter", default)]
    start_after: Option<serde_json::Value>,
}

impl GhlClient {
    /// Create a new CRM client
    pub fn new(
        base_url: String,
        access_token: Option<String>,
        fields: CoordinateFields,
        page_size: usize,
        max_pages: usize,
        timeout_secs: u64,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            access_token: access_token.filter(|t| !t.trim().is_empty()),
            fields,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            max_pages: max_pages.max(1),
            client,
        }
    }

    fn token(&self) -> Result<&str, DirectoryError> {
        self.access_token
            .as_deref()
            .ok_or(DirectoryError::MissingCredential("access token"))
    }

    async fn fetch_page(
        &self,
        account_id: &str,
        cursor: Option<&(String, String)>,
    ) -> Result<ContactsPage, DirectoryError> {
        let url = format!("{}/contacts/", self.base_url.trim_end_matches('/'));
        let limit = self.page_size.to_string();

        let mut query = vec![("locationId", account_id), ("limit", limit.as_str())];
        if let Some((after_id, after)) = cursor {
            query.push(("startAfterId", after_id.as_str()));
            query.push(("startAfter", after.as_str()));
        }

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.token()?)
            .header("Version", API_VERSION)
            .query(&query)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => return Err(DirectoryError::Unauthorized),
            status if !status.is_success() => {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read body".to_string());
                tracing::error!("Failed to list contacts for {}: {} - {}", account_id, status, body);
                return Err(DirectoryError::ApiError(format!(
                    "Failed to list contacts: {}",
                    status
                )));
            }
            _ => {}
        }

        response
            .json::<ContactsPage>()
            .await
            .map_err(|e| DirectoryError::InvalidResponse(format!("Failed to parse contacts: {}", e)))
    }
}

#[async_trait]
impl ContactDirectory for GhlClient {
    async fn list_all(&self, account_id: &str) -> Result<Vec<Contact>, DirectoryError> {
        if account_id.trim().is_empty() {
            return Err(DirectoryError::MissingCredential("account id"));
        }
        self.token()?;

        let mut contacts = Vec::new();
        let mut cursor: Option<(String, String)> = None;

        for page_number in 1..=self.max_pages {
            let page = self.fetch_page(account_id, cursor.as_ref()).await?;
            let fetched = page.contacts.len();
            contacts.extend(page.contacts);

            tracing::debug!(
                "Fetched contacts page {} for {} ({} contacts)",
                page_number,
                account_id,
                fetched
            );

            cursor = page
                .meta
                .and_then(|m| Some((m.start_after_id?, cursor_value(m.start_after?))));

            if fetched < self.page_size || cursor.is_none() {
                tracing::debug!("Listed {} contacts for {}", contacts.len(), account_id);
                return Ok(contacts);
            }
        }

        Err(DirectoryError::PaginationLimit {
            max_pages: self.max_pages,
        })
    }

    async fn set_coordinates(
        &self,
        contact_id: &str,
        coordinate: Coordinate,
    ) -> Result<(), DirectoryError> {
        let url = format!(
            "{}/contacts/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(contact_id)
        );

        let payload = json!({
            "customFields": [
                { "id": self.fields.latitude, "value": format_coordinate_component(coordinate.lat) },
                { "id": self.fields.longitude, "value": format_coordinate_component(coordinate.lng) },
            ]
        });

        let response = self
            .client
            .put(&url)
            .bearer_auth(self.token()?)
            .header("Version", API_VERSION)
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(DirectoryError::Unauthorized),
            status if !status.is_success() => Err(DirectoryError::ApiError(format!(
                "Failed to update contact {}: {}",
                contact_id, status
            ))),
            _ => {
                tracing::debug!("Stored coordinate for contact {}", contact_id);
                Ok(())
            }
        }
    }
}

/// `startAfter` arrives as a number (epoch millis) or a string
fn cursor_value(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}
