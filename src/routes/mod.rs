pub mod admin;
pub mod auth;
pub mod chat;
pub mod contact;
pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::middleware::{auth::require_operator, cors::portfolio_cors};
use crate::AppState;

/// The complete HTTP surface: public intake, operator auth, moderation
/// and the chat assistant.
pub fn router(state: AppState) -> Router {
    let public_api = Router::new()
        .route("/health", get(health::health))
        .route("/api/contacts", post(contact::submit_contact))
        .route("/api/auth/login", post(auth::login))
        .route("/api/chat", post(chat::chat));

    let operator_api = Router::new()
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/admin/contacts", get(admin::list_contacts))
        .route("/api/admin/contacts/unread", get(admin::unread_count))
        .route(
            "/api/admin/contacts/:id",
            patch(admin::update_contact).delete(admin::delete_contact),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_operator,
        ));

    public_api
        .merge(operator_api)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(portfolio_cors()),
        )
}
