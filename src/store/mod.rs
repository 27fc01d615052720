//! The document store seam.
//!
//! Every backend (Postgres, in-memory, remote HTTP) implements
//! [`DocumentStore`]; controllers only ever see `Arc<dyn DocumentStore>`.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::message::{Message, MessagePatch, NewMessage};

pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

/// Collection of contact messages with server-assigned ids and timestamps.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persists a new record. The returned message carries the
    /// store-assigned id and receipt timestamp.
    async fn create(&self, message: NewMessage) -> Result<Message, StoreError>;

    /// Every record, newest `received_at` first.
    async fn list(&self) -> Result<Vec<Message>, StoreError>;

    /// Fails with [`StoreError::NotFound`] when `id` does not exist.
    async fn update_fields(&self, id: &str, patch: MessagePatch) -> Result<(), StoreError>;

    /// Deleting an id that does not exist succeeds.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}
