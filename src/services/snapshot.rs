use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::Contact;
use crate::services::ghl::{ContactDirectory, DirectoryError};

#[derive(Debug, Clone)]
struct Loaded {
    contacts: Arc<Vec<Contact>>,
    loaded_at: DateTime<Utc>,
}

/// Read-only, in-memory copy of an account's contacts.
///
/// The list is only ever replaced wholesale by `refresh`; readers hold an
/// `Arc` to whichever version they fetched.
pub struct ContactSnapshot {
    directory: Arc<dyn ContactDirectory>,
    account_id: String,
    current: RwLock<Option<Loaded>>,
}

impl ContactSnapshot {
    pub fn new(directory: Arc<dyn ContactDirectory>, account_id: String) -> Self {
        Self {
            directory,
            account_id,
            current: RwLock::new(None),
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Current snapshot, loading it on first use
    pub async fn get(&self) -> Result<Arc<Vec<Contact>>, DirectoryError> {
        if let Some(loaded) = self.current.read().await.as_ref() {
            return Ok(Arc::clone(&loaded.contacts));
        }
        self.refresh().await
    }

    /// Current snapshot without triggering a load
    pub async fn peek(&self) -> Option<Arc<Vec<Contact>>> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|loaded| Arc::clone(&loaded.contacts))
    }

    pub async fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.current.read().await.as_ref().map(|l| l.loaded_at)
    }

    /// Replace the snapshot with a fresh listing.
    ///
    /// On failure the previous snapshot stays in place.
    pub async fn refresh(&self) -> Result<Arc<Vec<Contact>>, DirectoryError> {
        let contacts = Arc::new(self.directory.list_all(&self.account_id).await?);

        tracing::info!(
            "Loaded contact snapshot for {} ({} contacts)",
            self.account_id,
            contacts.len()
        );

        *self.current.write().await = Some(Loaded {
            contacts: Arc::clone(&contacts),
            loaded_at: Utc::now(),
        });

        Ok(contacts)
    }
}
