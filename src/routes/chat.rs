use axum::{extract::State, response::IntoResponse, Json};

use crate::dto::chat_dto::{ChatRequest, ChatResponse};
use crate::error::Result;
use crate::utils::validation::validate;
use crate::AppState;

#[axum::debug_handler]
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<impl IntoResponse> {
    validate(&req)?;
    let text = state.chat_service.complete(&req.prompt).await;
    Ok(Json(ChatResponse {
        text,
        enabled: state.chat_service.is_configured(),
    }))
}
