use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::error::Result;
use crate::models::message::ContactForm;
use crate::utils::validation::validate;
use crate::AppState;

/// Public intake. Only the non-blank rule is enforced.
#[axum::debug_handler]
pub async fn submit_contact(
    State(state): State<AppState>,
    Json(form): Json<ContactForm>,
) -> Result<impl IntoResponse> {
    validate(&form)?;
    let message = state.store.create(form.to_new_message()).await.map_err(|e| {
        tracing::error!(error = %e, code = e.code(), "Error adding contact message");
        e
    })?;
    tracing::info!(id = %message.id, "Contact message received");
    Ok((StatusCode::CREATED, Json(message)))
}
