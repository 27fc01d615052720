use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::backend::{backend, BackendUnavailable};
use crate::error::StoreError;
use crate::models::message::{Message, MessagePatch};
use crate::store::DocumentStore;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModerationError {
    #[error("Failed to fetch messages: {0}")]
    LoadFailed(#[source] StoreError),

    #[error("Failed to update message status. Please try again.")]
    ToggleFailed {
        id: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to delete message. Please try again.")]
    DeleteFailed {
        id: String,
        #[source]
        source: StoreError,
    },

    #[error("message {0} is not in the loaded list")]
    UnknownMessage(String),

    #[error("an operation on message {0} is already in progress")]
    InFlight(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
}

/// Ids with a pending operation of one kind.
#[derive(Debug, Clone, Default)]
struct InFlight(Arc<Mutex<HashSet<String>>>);

impl InFlight {
    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn try_begin(&self, id: &str) -> Option<InFlightGuard> {
        if !self.lock().insert(id.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            set: self.clone(),
            id: id.to_string(),
        })
    }

    fn contains(&self, id: &str) -> bool {
        self.lock().contains(id)
    }
}

/// Clears the marker however the operation ends.
struct InFlightGuard {
    set: InFlight,
    id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.lock().remove(&self.id);
    }
}

#[derive(Debug, Default)]
struct ListState {
    messages: Vec<Message>,
    loaded: bool,
}

/// The operator's view of the inbox.
///
/// The in-memory list only ever reflects store-acknowledged state: every
/// mutation awaits the store first and patches the list afterwards. Toggle
/// and delete each keep their own per-id markers, so operations on
/// different messages never wait on each other.
pub struct ModerationController {
    store: Arc<dyn DocumentStore>,
    state: Mutex<ListState>,
    toggling: InFlight,
    deleting: InFlight,
}

impl ModerationController {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            state: Mutex::new(ListState::default()),
            toggling: InFlight::default(),
            deleting: InFlight::default(),
        }
    }

    pub fn from_backend() -> Result<Self, BackendUnavailable> {
        Ok(Self::new(Arc::clone(&backend()?.store)))
    }

    fn state(&self) -> MutexGuard<'_, ListState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replaces the list with a fresh fetch, newest first. On failure the
    /// previous list is kept as it was.
    pub async fn load_all(&self) -> Result<Vec<Message>, ModerationError> {
        let mut fetched = match self.store.list().await {
            Ok(messages) => messages,
            Err(err) => {
                tracing::error!(error = %err, code = err.code(), "Error fetching messages");
                return Err(ModerationError::LoadFailed(err));
            }
        };
        // Stable: equal timestamps keep the store's order.
        fetched.sort_by(|a, b| b.received_at.cmp(&a.received_at));

        let mut state = self.state();
        state.messages = fetched.clone();
        state.loaded = true;
        tracing::info!(count = fetched.len(), "Messages loaded");
        Ok(fetched)
    }

    pub fn is_loaded(&self) -> bool {
        self.state().loaded
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state().messages.clone()
    }

    pub fn unread_count(&self) -> usize {
        self.state().messages.iter().filter(|m| !m.read).count()
    }

    /// Case-insensitive substring search over name, email and body.
    /// Never touches the store. An empty term returns everything.
    pub fn filter(&self, term: &str) -> Vec<Message> {
        let needle = term.to_lowercase();
        self.state()
            .messages
            .iter()
            .filter(|m| m.matches(&needle))
            .cloned()
            .collect()
    }

    pub fn is_toggling(&self, id: &str) -> bool {
        self.toggling.contains(id)
    }

    pub fn is_deleting(&self, id: &str) -> bool {
        self.deleting.contains(id)
    }

    fn cached_read(&self, id: &str) -> Option<bool> {
        self.state().messages.iter().find(|m| m.id == id).map(|m| m.read)
    }

    /// Flips `read` for one message and returns the new value.
    pub async fn toggle_read(&self, id: &str) -> Result<bool, ModerationError> {
        let _guard = self
            .toggling
            .try_begin(id)
            .ok_or_else(|| ModerationError::InFlight(id.to_string()))?;
        let current = self
            .cached_read(id)
            .ok_or_else(|| ModerationError::UnknownMessage(id.to_string()))?;
        let next = !current;

        if let Err(err) = self.store.update_fields(id, MessagePatch::read(next)).await {
            tracing::error!(%id, error = %err, code = err.code(), "Error updating message status");
            return Err(ModerationError::ToggleFailed {
                id: id.to_string(),
                source: err,
            });
        }

        let mut state = self.state();
        if let Some(message) = state.messages.iter_mut().find(|m| m.id == id) {
            message.read = next;
        }
        tracing::info!(%id, read = next, "Message status updated");
        Ok(next)
    }

    /// Deletes one message after `confirm` approves it. Declining has no
    /// network effect.
    pub async fn delete_message<F>(&self, id: &str, confirm: F) -> Result<DeleteOutcome, ModerationError>
    where
        F: FnOnce(&Message) -> bool,
    {
        let _guard = self
            .deleting
            .try_begin(id)
            .ok_or_else(|| ModerationError::InFlight(id.to_string()))?;
        let target = self
            .state()
            .messages
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| ModerationError::UnknownMessage(id.to_string()))?;

        if !confirm(&target) {
            return Ok(DeleteOutcome::Declined);
        }

        if let Err(err) = self.store.delete(id).await {
            tracing::error!(%id, error = %err, code = err.code(), "Error deleting message");
            return Err(ModerationError::DeleteFailed {
                id: id.to_string(),
                source: err,
            });
        }

        self.state().messages.retain(|m| m.id != id);
        tracing::info!(%id, "Message deleted");
        Ok(DeleteOutcome::Deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::ServerTimestamp;
    use crate::store::MemoryStore;

    fn msg(id: &str, name: &str, body: &str, seconds: i64) -> Message {
        Message {
            id: id.into(),
            name: name.into(),
            email: format!("{}@example.com", name.to_lowercase()),
            body: body.into(),
            received_at: Some(ServerTimestamp { seconds, nanoseconds: 0 }),
            read: false,
        }
    }

    #[tokio::test]
    async fn filter_is_case_insensitive_across_fields() {
        let store = Arc::new(MemoryStore::with_messages(vec![
            msg("1", "Alice", "About the project", 3),
            msg("2", "Bob", "Hiring question", 2),
            msg("3", "Carol", "hello ALICE", 1),
        ]));
        let ctl = ModerationController::new(store);
        ctl.load_all().await.unwrap();

        let ids: Vec<_> = ctl.filter("alice").into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["1", "3"]);
        let ids: Vec<_> = ctl.filter("BOB@EXAMPLE").into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["2"]);
        assert_eq!(ctl.filter("").len(), 3);
    }

    #[tokio::test]
    async fn in_flight_markers_release_after_failure() {
        let store = Arc::new(MemoryStore::with_messages(vec![msg("1", "Alice", "x", 1)]));
        let ctl = ModerationController::new(store.clone());
        ctl.load_all().await.unwrap();

        store.fail_next(
            crate::store::memory::StoreOp::Update,
            StoreError::Other("boom".into()),
        );
        assert!(ctl.toggle_read("1").await.is_err());
        assert!(!ctl.is_toggling("1"));
        assert_eq!(ctl.toggle_read("1").await, Ok(true));
    }

    #[tokio::test]
    async fn unknown_id_is_rejected_without_store_call() {
        let store = Arc::new(MemoryStore::new());
        let ctl = ModerationController::new(store.clone());
        ctl.load_all().await.unwrap();
        assert_eq!(
            ctl.toggle_read("ghost").await,
            Err(ModerationError::UnknownMessage("ghost".into()))
        );
        assert_eq!(store.calls(crate::store::memory::StoreOp::Update), 0);
    }

    #[tokio::test]
    async fn unread_count_tracks_toggles() {
        let store = Arc::new(MemoryStore::with_messages(vec![
            msg("1", "Alice", "x", 2),
            msg("2", "Bob", "y", 1),
        ]));
        let ctl = ModerationController::new(store);
        ctl.load_all().await.unwrap();
        assert_eq!(ctl.unread_count(), 2);
        ctl.toggle_read("2").await.unwrap();
        assert_eq!(ctl.unread_count(), 1);
    }
}
