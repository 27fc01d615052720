use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::DocumentStore;
use crate::error::StoreError;
use crate::models::message::{Message, MessagePatch, NewMessage};

#[derive(Debug, FromRow)]
struct ContactRow {
    id: String,
    name: String,
    email: String,
    body: String,
    received_at: DateTime<Utc>,
    read: bool,
}

impl From<ContactRow> for Message {
    fn from(row: ContactRow) -> Self {
        Message {
            id: row.id,
            name: row.name,
            email: row.email,
            body: row.body,
            received_at: Some(row.received_at.into()),
            read: row.read,
        }
    }
}

/// Ids are UUIDs in this table; anything else names no row.
fn row_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id).ok()
}

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create(&self, message: NewMessage) -> Result<Message, StoreError> {
        let row = sqlx::query_as::<_, ContactRow>(
            r#"
            INSERT INTO contacts (name, email, body, read)
            VALUES ($1, $2, $3, $4)
            RETURNING id::text AS id, name, email, body, received_at, COALESCE(read, FALSE) AS read
            "#,
        )
        .bind(&message.name)
        .bind(&message.email)
        .bind(&message.body)
        .bind(message.read)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn list(&self) -> Result<Vec<Message>, StoreError> {
        let rows = sqlx::query_as::<_, ContactRow>(
            r#"
            SELECT id::text AS id, name, email, body, received_at, COALESCE(read, FALSE) AS read
            FROM contacts
            ORDER BY received_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Message::from).collect())
    }

    async fn update_fields(&self, id: &str, patch: MessagePatch) -> Result<(), StoreError> {
        let Some(read) = patch.read else {
            return Ok(());
        };
        let missing = || StoreError::NotFound(format!("message {} does not exist", id));
        let uuid = row_id(id).ok_or_else(missing)?;
        let result = sqlx::query(
            r#"
            UPDATE contacts
            SET read = $2
            WHERE id = $1
            "#,
        )
        .bind(uuid)
        .bind(read)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(missing());
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let Some(uuid) = row_id(id) else {
            return Ok(());
        };
        sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
