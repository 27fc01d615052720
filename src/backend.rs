//! Init-once handle to the store and auth gate used by the client-side
//! controllers. Nothing here assumes a live handle: [`backend`] reports
//! [`BackendUnavailable`] until [`init_backend`] has run.

use std::sync::{Arc, OnceLock};

use crate::auth::{AuthBackend, AuthGate};
use crate::store::DocumentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Server connection failed. Please try again later.")]
pub struct BackendUnavailable;

pub struct Backend {
    pub store: Arc<dyn DocumentStore>,
    pub gate: AuthGate,
}

impl Backend {
    pub fn new(store: Arc<dyn DocumentStore>, auth: Arc<dyn AuthBackend>) -> Self {
        Self {
            store,
            gate: AuthGate::new(auth),
        }
    }
}

static BACKEND: OnceLock<Backend> = OnceLock::new();

/// Fails if a backend was already installed; the first one stays live.
pub fn init_backend(backend: Backend) -> Result<&'static Backend, crate::error::Error> {
    BACKEND
        .set(backend)
        .map_err(|_| crate::error::Error::Config("Backend has already been initialized".to_string()))?;
    self::backend().map_err(|e| crate::error::Error::Internal(e.to_string()))
}

pub fn backend() -> Result<&'static Backend, BackendUnavailable> {
    BACKEND.get().ok_or(BackendUnavailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthFailure;
    use crate::models::session::Identity;
    use crate::store::MemoryStore;
    use async_trait::async_trait;

    struct NoAuth;

    #[async_trait]
    impl AuthBackend for NoAuth {
        async fn sign_in(&self, _: &str, _: &str) -> Result<Identity, AuthFailure> {
            Err(AuthFailure::InvalidCredential)
        }

        async fn sign_out(&self) -> Result<(), AuthFailure> {
            Ok(())
        }
    }

    // One test owns the global so ordering between tests cannot matter.
    #[test]
    fn uninitialized_then_initialized_once() {
        assert_eq!(backend().err(), Some(BackendUnavailable));

        let first = Backend::new(Arc::new(MemoryStore::new()), Arc::new(NoAuth));
        assert!(init_backend(first).is_ok());
        assert!(backend().is_ok());

        let second = Backend::new(Arc::new(MemoryStore::new()), Arc::new(NoAuth));
        assert!(init_backend(second).is_err());
    }
}
