use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use validator::Validate;

use crate::backend::{backend, BackendUnavailable};
use crate::error::StoreError;
use crate::models::message::{ContactForm, Message};
use crate::store::DocumentStore;

pub const SUBMIT_TIMEOUT: Duration = Duration::from_secs(15);
pub const SUCCESS_DISPLAY: Duration = Duration::from_secs(5);
pub const FAILURE_DISPLAY: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionTimings {
    pub timeout: Duration,
    pub success_display: Duration,
    pub failure_display: Duration,
}

impl Default for SubmissionTimings {
    fn default() -> Self {
        Self {
            timeout: SUBMIT_TIMEOUT,
            success_display: SUCCESS_DISPLAY,
            failure_display: FAILURE_DISPLAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("Please fill out all fields.")]
    ValidationFailed,

    #[error("A submission is already in progress.")]
    InFlight,

    #[error("Submission timed out. Please check your connection.")]
    Timeout,

    #[error("Submission failed: Permission denied. Please check the store's access rules.")]
    PermissionDenied,

    #[error("The service is currently unavailable. Please try again later.")]
    Unavailable,

    #[error("An error occurred: {0}")]
    Unknown(String),
}

impl From<StoreError> for SubmitError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unauthenticated(_) | StoreError::PermissionDenied(_) => {
                SubmitError::PermissionDenied
            }
            StoreError::Unavailable(_) => SubmitError::Unavailable,
            StoreError::NotFound(detail) | StoreError::Other(detail) => SubmitError::Unknown(detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionStatus {
    Idle,
    Submitting,
    Succeeded,
    Failed(SubmitError),
}

impl SubmissionStatus {
    /// Text shown to the visitor while the status is on display.
    pub fn user_message(&self) -> Option<String> {
        match self {
            SubmissionStatus::Succeeded => Some("Message sent successfully! Thank you.".to_string()),
            SubmissionStatus::Failed(err) => Some(err.to_string()),
            _ => None,
        }
    }
}

/// Forwards visitor messages to the store under a hard timeout.
///
/// Status transitions are published on a watch channel:
/// `Idle -> Submitting -> {Succeeded | Failed} -> Idle`, with the terminal
/// states held for a fixed display window. Each submission bumps a
/// generation counter so a pending window reset from an earlier
/// submission never overwrites a newer status. At most one submission runs
/// at a time; overlapping calls are refused with [`SubmitError::InFlight`].
pub struct SubmissionController {
    store: Arc<dyn DocumentStore>,
    timings: SubmissionTimings,
    status: Arc<watch::Sender<SubmissionStatus>>,
    generation: Arc<AtomicU64>,
    busy: AtomicBool,
}

/// Clears the busy flag when the owning submission returns.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SubmissionController {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_timings(store, SubmissionTimings::default())
    }

    pub fn with_timings(store: Arc<dyn DocumentStore>, timings: SubmissionTimings) -> Self {
        let (status, _) = watch::channel(SubmissionStatus::Idle);
        Self {
            store,
            timings,
            status: Arc::new(status),
            generation: Arc::new(AtomicU64::new(0)),
            busy: AtomicBool::new(false),
        }
    }

    pub fn from_backend() -> Result<Self, BackendUnavailable> {
        Ok(Self::new(Arc::clone(&backend()?.store)))
    }

    pub fn status(&self) -> SubmissionStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionStatus> {
        self.status.subscribe()
    }

    /// Validates `form` and issues exactly one create call.
    ///
    /// On success the form is cleared. If the store call outlives the
    /// timeout it keeps running detached; its result is ignored. A call made
    /// while another is still submitting touches neither the store nor the
    /// published status.
    pub async fn submit(&self, form: &mut ContactForm) -> Result<Message, SubmitError> {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            tracing::debug!("Contact submission refused, one is already in progress");
            return Err(SubmitError::InFlight);
        };
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.status.send_replace(SubmissionStatus::Submitting);

        if let Err(errors) = form.validate() {
            tracing::debug!(%errors, "Contact form rejected before reaching the store");
            self.status.send_replace(SubmissionStatus::Idle);
            return Err(SubmitError::ValidationFailed);
        }

        let store = Arc::clone(&self.store);
        let new_message = form.to_new_message();
        let write = tokio::spawn(async move { store.create(new_message).await });

        let outcome = match tokio::time::timeout(self.timings.timeout, write).await {
            Ok(Ok(Ok(message))) => Ok(message),
            Ok(Ok(Err(store_err))) => {
                tracing::error!(error = %store_err, code = store_err.code(), "Error adding contact message");
                Err(SubmitError::from(store_err))
            }
            Ok(Err(join_err)) => {
                tracing::error!(error = %join_err, "Contact write task failed");
                Err(SubmitError::Unknown(join_err.to_string()))
            }
            Err(_) => {
                tracing::error!(timeout = ?self.timings.timeout, "Contact submission timed out");
                Err(SubmitError::Timeout)
            }
        };

        match outcome {
            Ok(message) => {
                tracing::info!(id = %message.id, "Contact message stored");
                form.clear();
                self.status.send_replace(SubmissionStatus::Succeeded);
                self.schedule_reset(generation, self.timings.success_display);
                Ok(message)
            }
            Err(err) => {
                self.status.send_replace(SubmissionStatus::Failed(err.clone()));
                self.schedule_reset(generation, self.timings.failure_display);
                Err(err)
            }
        }
    }

    fn schedule_reset(&self, generation: u64, after: Duration) {
        let status = Arc::clone(&self.status);
        let current = Arc::clone(&self.generation);
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            status.send_if_modified(|s| {
                if current.load(Ordering::SeqCst) == generation {
                    *s = SubmissionStatus::Idle;
                    true
                } else {
                    false
                }
            });
        });
    }
}
