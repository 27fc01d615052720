use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};

use crate::auth::{AuthFailure, Claims};
use crate::dto::auth_dto::{LoginRequest, LoginResponse};
use crate::error::{Error, Result};
use crate::utils::validation::validate;
use crate::AppState;

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    validate(&req)?;
    let issued = state.realm.sign_in(&req.email, &req.password).map_err(|failure| match failure {
        f if f.is_credential_error() => Error::Unauthorized("Invalid email or password.".to_string()),
        AuthFailure::Network(detail) => Error::Unavailable(detail),
        other => Error::Internal(other.to_string()),
    })?;

    Ok(Json(LoginResponse {
        token: issued.token,
        email: issued.identity.email,
        expires_at: issued.expires_at,
    }))
}

#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    state.realm.revoke(&claims);
    StatusCode::NO_CONTENT
}
