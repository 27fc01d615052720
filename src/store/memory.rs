use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::DocumentStore;
use crate::error::StoreError;
use crate::models::message::{Message, MessagePatch, NewMessage};

/// Which store operation a queued fault applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Create,
    List,
    Update,
    Delete,
}

#[derive(Debug, Default)]
struct Inner {
    docs: Vec<Message>,
    last_assigned: Option<DateTime<Utc>>,
    faults: HashMap<StoreOp, Vec<StoreError>>,
    calls: HashMap<StoreOp, usize>,
}

impl Inner {
    fn enter(&mut self, op: StoreOp) -> Result<(), StoreError> {
        *self.calls.entry(op).or_default() += 1;
        match self.faults.get_mut(&op).and_then(|queue| queue.pop()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Strictly increasing, even when the wall clock stalls or steps back.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let assigned = match self.last_assigned {
            Some(last) if now <= last => last + Duration::nanoseconds(1),
            _ => now,
        };
        self.last_assigned = Some(assigned);
        assigned
    }
}

/// Process-local store. Used when no database is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds records as-is, bypassing id and timestamp assignment.
    pub fn with_messages(messages: Vec<Message>) -> Self {
        let store = Self::default();
        store.lock().docs = messages;
        store
    }

    /// Queues a one-shot failure for the next call of `op`.
    pub fn fail_next(&self, op: StoreOp, err: StoreError) {
        self.lock().faults.entry(op).or_default().insert(0, err);
    }

    pub fn calls(&self, op: StoreOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> Vec<Message> {
        let mut docs = self.lock().docs.clone();
        sort_newest_first(&mut docs);
        docs
    }

    pub fn len(&self) -> usize {
        self.lock().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().docs.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn sort_newest_first(docs: &mut [Message]) {
    docs.sort_by(|a, b| b.received_at.cmp(&a.received_at));
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, message: NewMessage) -> Result<Message, StoreError> {
        let mut inner = self.lock();
        inner.enter(StoreOp::Create)?;
        let stored = Message {
            id: Uuid::new_v4().to_string(),
            name: message.name,
            email: message.email,
            body: message.body,
            received_at: Some(inner.next_timestamp().into()),
            read: message.read,
        };
        inner.docs.push(stored.clone());
        Ok(stored)
    }

    async fn list(&self) -> Result<Vec<Message>, StoreError> {
        let mut inner = self.lock();
        inner.enter(StoreOp::List)?;
        let mut docs = inner.docs.clone();
        sort_newest_first(&mut docs);
        Ok(docs)
    }

    async fn update_fields(&self, id: &str, patch: MessagePatch) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.enter(StoreOp::Update)?;
        let doc = inner
            .docs
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("message {} does not exist", id)))?;
        patch.apply(doc);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.enter(StoreOp::Delete)?;
        inner.docs.retain(|m| m.id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_message(name: &str) -> NewMessage {
        NewMessage {
            name: name.into(),
            email: format!("{}@example.com", name),
            body: "hello".into(),
            read: false,
        }
    }

    #[tokio::test]
    async fn create_assigns_increasing_timestamps() {
        let store = MemoryStore::new();
        let a = store.create(new_message("a")).await.unwrap();
        let b = store.create(new_message("b")).await.unwrap();
        assert_ne!(a.id, b.id);
        assert!(b.received_at > a.received_at);

        let listed = store.list().await.unwrap();
        assert_eq!(listed[0].id, b.id);
        assert_eq!(listed[1].id, a.id);
    }

    #[tokio::test]
    async fn queued_fault_fires_once() {
        let store = MemoryStore::new();
        store.fail_next(StoreOp::List, StoreError::Unavailable("offline".into()));
        assert!(store.list().await.is_err());
        assert!(store.list().await.is_ok());
        assert_eq!(store.calls(StoreOp::List), 2);
    }

    #[tokio::test]
    async fn update_of_missing_id_is_not_found_but_delete_is_ok() {
        let store = MemoryStore::new();
        let err = store
            .update_fields("nope", MessagePatch::read(true))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(store.delete("nope").await.is_ok());
    }
}
