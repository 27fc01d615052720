//! Operator authentication: the backend seam, the server-side realm and
//! the client-side gate that publishes session state.

pub mod gate;
pub mod realm;

use async_trait::async_trait;

use crate::models::session::Identity;

pub use gate::{AuthGate, LoginError, LogoutError, SessionStamp, SessionSubscription};
pub use realm::{Claims, IssuedToken, OperatorRealm};

/// Raw failure codes reported by an authentication backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    #[error("auth/user-not-found")]
    UserNotFound,

    #[error("auth/wrong-password")]
    WrongPassword,

    #[error("auth/invalid-credential")]
    InvalidCredential,

    #[error("auth/network-request-failed: {0}")]
    Network(String),

    #[error("auth/internal-error: {0}")]
    Internal(String),
}

impl AuthFailure {
    /// The credential family collapses into one user-facing category.
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            AuthFailure::UserNotFound | AuthFailure::WrongPassword | AuthFailure::InvalidCredential
        )
    }
}

/// Credential exchange against the backend realm.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthFailure>;

    async fn sign_out(&self) -> Result<(), AuthFailure>;
}
