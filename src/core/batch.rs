//! Batch geocoding of contacts that have an address but no stored coordinate.
//!
//! A job walks its targets one at a time: geocode, write the coordinate back
//! to the CRM, wait a fixed delay, repeat. Individual failures are counted and
//! skipped. Pausing is cooperative through a [`PauseToken`] checked at the top
//! of every iteration, so the in-flight contact always finishes first.
//!
//! Resume tracks work by contact id rather than position: the target list is
//! rebuilt from a fresh directory listing and anything already attempted in
//! the current job is left out.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::core::fields::CoordinateFields;
use crate::models::{BatchProgress, BatchState, Contact};
use crate::services::{ContactDirectory, ContactSnapshot, DirectoryError, GeocodeClient};

/// Floor for the pause between items
pub const MIN_ITEM_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("a batch run is already in progress")]
    AlreadyRunning,

    #[error("CRM credentials unavailable: {0}")]
    MissingCredential(String),

    #[error("failed to list contacts: {0}")]
    Transport(String),
}

impl From<DirectoryError> for BatchError {
    fn from(err: DirectoryError) -> Self {
        if err.is_credential_error() {
            Self::MissingCredential(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Timing and sizing of a batch run
#[derive(Debug, Clone, Copy)]
pub struct BatchSettings {
    delay: Duration,
    settle_delay: Duration,
    max_items: Option<usize>,
}

impl BatchSettings {
    /// `delay` is raised to [`MIN_ITEM_DELAY`] if smaller
    pub fn new(delay: Duration, settle_delay: Duration, max_items: Option<usize>) -> Self {
        Self {
            delay: delay.max(MIN_ITEM_DELAY),
            settle_delay,
            max_items,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self::new(Duration::from_millis(250), Duration::from_millis(1500), None)
    }
}

/// Cooperative pause request shared between the caller and a running job
#[derive(Debug, Clone, Default)]
pub struct PauseToken(Arc<AtomicBool>);

impl PauseToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Withdraw a pause request the job has not acted on yet
    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Discard any previous job and start from scratch
    Fresh,
    /// Continue a paused job; behaves as `Fresh` when nothing is paused
    Resume,
}

#[derive(Debug)]
struct Job {
    id: Uuid,
    attempted: HashSet<String>,
    progress: BatchProgress,
    token: Option<PauseToken>,
}

impl Job {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            attempted: HashSet::new(),
            progress: BatchProgress::idle(),
            token: None,
        }
    }
}

pub struct BatchGeocodeController {
    directory: Arc<dyn ContactDirectory>,
    geocoder: Arc<dyn GeocodeClient>,
    snapshot: Arc<ContactSnapshot>,
    fields: CoordinateFields,
    settings: BatchSettings,
    job: Mutex<Job>,
    progress_tx: watch::Sender<BatchProgress>,
}

impl BatchGeocodeController {
    pub fn new(
        directory: Arc<dyn ContactDirectory>,
        geocoder: Arc<dyn GeocodeClient>,
        snapshot: Arc<ContactSnapshot>,
        fields: CoordinateFields,
        settings: BatchSettings,
    ) -> Self {
        let (progress_tx, _) = watch::channel(BatchProgress::idle());
        Self {
            directory,
            geocoder,
            snapshot,
            fields,
            settings,
            job: Mutex::new(Job::new()),
            progress_tx,
        }
    }

    /// Latest progress snapshot
    pub fn progress(&self) -> BatchProgress {
        *self.progress_tx.borrow()
    }

    /// Stream of progress updates
    pub fn subscribe(&self) -> watch::Receiver<BatchProgress> {
        self.progress_tx.subscribe()
    }

    /// Start a fresh job in the background
    pub async fn start(self: &Arc<Self>) -> Result<BatchProgress, BatchError> {
        self.spawn(RunMode::Fresh).await
    }

    /// Continue a paused job in the background
    pub async fn resume(self: &Arc<Self>) -> Result<BatchProgress, BatchError> {
        self.spawn(RunMode::Resume).await
    }

    /// Ask the running job to stop before its next contact
    pub fn pause(&self) -> BatchProgress {
        let job = self.lock_job();
        match (&job.token, job.progress.state) {
            (Some(token), BatchState::Running) => {
                tracing::info!(job_id = %job.id, "Pause requested for batch geocode");
                token.pause();
            }
            _ => tracing::debug!("Pause requested with no running batch"),
        }
        job.progress
    }

    /// Run a job to completion (or until `token` is paused) on the current task.
    ///
    /// A resume that only withdraws a pending pause returns the current
    /// progress at once; the job keeps running on its own token.
    pub async fn run(&self, mode: RunMode, token: PauseToken) -> Result<BatchProgress, BatchError> {
        match self.prepare(mode, token.clone()).await? {
            Some(targets) => Ok(self.drive(targets, token).await),
            None => Ok(self.progress()),
        }
    }

    /// Start a fresh job every `every`, skipping ticks while one is running
    pub fn schedule(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match this.start().await {
                    Ok(_) => tracing::info!("Scheduled batch geocode started"),
                    Err(BatchError::AlreadyRunning) => {
                        tracing::debug!("Scheduled batch geocode skipped, a run is in progress")
                    }
                    Err(e) => tracing::warn!("Scheduled batch geocode failed to start: {}", e),
                }
            }
        })
    }

    async fn spawn(self: &Arc<Self>, mode: RunMode) -> Result<BatchProgress, BatchError> {
        let token = PauseToken::new();
        let Some(targets) = self.prepare(mode, token.clone()).await? else {
            return Ok(self.progress());
        };
        let progress = self.progress();

        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.drive(targets, token).await;
        });

        Ok(progress)
    }

    /// Claim the job, list contacts, and compute the remaining targets.
    ///
    /// `None` means a resume landed on a running job whose pause was still
    /// pending; the pause is withdrawn and the job carries on.
    async fn prepare(
        &self,
        mode: RunMode,
        token: PauseToken,
    ) -> Result<Option<Vec<Contact>>, BatchError> {
        let previous = {
            let mut job = self.lock_job();
            let previous = job.progress.state;
            if previous == BatchState::Running {
                if let (RunMode::Resume, Some(pending)) = (mode, job.token.as_ref()) {
                    if pending.is_paused() {
                        pending.clear();
                        tracing::info!(job_id = %job.id, "Pending pause withdrawn by resume");
                        return Ok(None);
                    }
                }
                return Err(BatchError::AlreadyRunning);
            }
            if mode == RunMode::Fresh || previous != BatchState::Paused {
                *job = Job::new();
            }
            job.progress.state = BatchState::Running;
            job.token = Some(token);
            self.publish(&job);
            previous
        };

        let contacts = match self.directory.list_all(self.snapshot.account_id()).await {
            Ok(contacts) => contacts,
            Err(e) => {
                tracing::error!("Batch geocode could not list contacts: {}", e);
                let mut job = self.lock_job();
                job.progress.state = if previous == BatchState::Paused {
                    BatchState::Paused
                } else {
                    BatchState::Idle
                };
                job.token = None;
                self.publish(&job);
                return Err(e.into());
            }
        };

        let mut job = self.lock_job();
        let mut targets: Vec<Contact> = contacts
            .into_iter()
            .filter(|c| self.fields.needs_geocoding(c) && !job.attempted.contains(&c.id))
            .collect();

        if let Some(max_items) = self.settings.max_items {
            targets.truncate(max_items.saturating_sub(job.attempted.len()));
        }

        job.progress.current = job.attempted.len();
        job.progress.total = job.attempted.len() + targets.len();
        self.publish(&job);

        tracing::info!(
            job_id = %job.id,
            resumed = previous == BatchState::Paused && mode == RunMode::Resume,
            remaining = targets.len(),
            total = job.progress.total,
            "Batch geocode running"
        );

        Ok(Some(targets))
    }

    async fn drive(&self, targets: Vec<Contact>, token: PauseToken) -> BatchProgress {
        let count = targets.len();

        for (i, contact) in targets.iter().enumerate() {
            // Checked under the job lock so a concurrent resume cannot slip
            // between the check and the state change
            {
                let mut job = self.lock_job();
                if token.is_paused() {
                    job.progress.state = BatchState::Paused;
                    job.token = None;
                    self.publish(&job);
                    tracing::info!(
                        job_id = %job.id,
                        current = job.progress.current,
                        total = job.progress.total,
                        "Batch geocode paused"
                    );
                    return job.progress;
                }
            }

            let stored = self.process(contact).await;

            {
                let mut job = self.lock_job();
                job.attempted.insert(contact.id.clone());
                if stored {
                    job.progress.success_count += 1;
                } else {
                    job.progress.fail_count += 1;
                }
                job.progress.current = job.attempted.len();
                self.publish(&job);
            }

            if i + 1 < count {
                tokio::time::sleep(self.settings.delay).await;
            }
        }

        let progress = {
            let mut job = self.lock_job();
            job.progress.state = BatchState::Completed;
            job.token = None;
            job.attempted.clear();
            self.publish(&job);
            tracing::info!(
                job_id = %job.id,
                success = job.progress.success_count,
                failed = job.progress.fail_count,
                "Batch geocode completed"
            );
            job.progress
        };

        // The CRM may apply writes asynchronously
        tokio::time::sleep(self.settings.settle_delay).await;
        if let Err(e) = self.snapshot.refresh().await {
            tracing::warn!("Contact snapshot refresh after batch geocode failed: {}", e);
        }

        progress
    }

    /// Geocode one contact and store the result; `true` when a coordinate was written
    async fn process(&self, contact: &Contact) -> bool {
        let address = contact.geocodable_address();

        match self.geocoder.geocode(&address).await {
            Ok(Some(coordinate)) => {
                match self.directory.set_coordinates(&contact.id, coordinate).await {
                    Ok(()) => {
                        tracing::debug!(contact_id = %contact.id, "Geocoded contact");
                        true
                    }
                    Err(e) => {
                        tracing::warn!(
                            contact_id = %contact.id,
                            error = %e,
                            "Failed to store coordinate"
                        );
                        false
                    }
                }
            }
            Ok(None) => {
                tracing::warn!(
                    contact_id = %contact.id,
                    address = %address,
                    "Address could not be geocoded"
                );
                false
            }
            Err(e) => {
                tracing::warn!(
                    contact_id = %contact.id,
                    address = %address,
                    error = %e,
                    "Geocoding request failed"
                );
                false
            }
        }
    }

    fn lock_job(&self) -> MutexGuard<'_, Job> {
        self.job.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, job: &Job) {
        self.progress_tx.send_replace(job.progress);
    }
}
