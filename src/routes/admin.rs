use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::dto::contact_dto::{UnreadCountResponse, UpdateMessageRequest};
use crate::error::{Error, Result};
use crate::models::message::MessagePatch;
use crate::AppState;

#[axum::debug_handler]
pub async fn list_contacts(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let messages = state.store.list().await.map_err(|e| {
        tracing::error!(error = %e, "Error fetching messages");
        e
    })?;
    Ok(Json(messages))
}

#[axum::debug_handler]
pub async fn unread_count(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let messages = state.store.list().await?;
    let unread_count = messages.iter().filter(|m| !m.read).count();
    Ok(Json(UnreadCountResponse {
        unread_count,
        total: messages.len(),
    }))
}

#[axum::debug_handler]
pub async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateMessageRequest>,
) -> Result<impl IntoResponse> {
    let patch = MessagePatch::from(req);
    if patch.is_empty() {
        return Err(Error::BadRequest("Nothing to update".to_string()));
    }
    state.store.update_fields(&id, patch).await.map_err(|e| {
        tracing::error!(%id, error = %e, "Error updating message status");
        e
    })?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    state.store.delete(&id).await.map_err(|e| {
        tracing::error!(%id, error = %e, "Error deleting message");
        e
    })?;
    tracing::info!(%id, "Message deleted");
    Ok(StatusCode::NO_CONTENT)
}
