use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use super::AuthBackend;
use crate::models::session::Session;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("An error occurred during login. Please try again. ({0})")]
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogoutError {
    #[error("Error signing out: {0}")]
    Failed(String),
}

/// A session state together with the sign-in it belongs to.
///
/// Every successful login gets a new `sign_in` number, so an observer that
/// only sees the latest value can still tell a fresh login apart from the
/// one it already handled, even for the same operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStamp {
    pub session: Session,
    pub sign_in: u64,
}

struct GateInner {
    backend: Arc<dyn AuthBackend>,
    session: watch::Sender<SessionStamp>,
    sign_ins: AtomicU64,
}

/// Owns the session stream. The stream is the only source of truth for
/// session state; callers never set it directly.
#[derive(Clone)]
pub struct AuthGate {
    inner: Arc<GateInner>,
}

impl AuthGate {
    pub fn new(backend: Arc<dyn AuthBackend>) -> Self {
        let (session, _) = watch::channel(SessionStamp {
            session: Session::Unauthenticated,
            sign_in: 0,
        });
        Self {
            inner: Arc::new(GateInner {
                backend,
                session,
                sign_ins: AtomicU64::new(0),
            }),
        }
    }

    pub fn current(&self) -> Session {
        self.inner.session.borrow().session.clone()
    }

    /// The first call to [`SessionSubscription::next`] yields the current
    /// state; later calls wait for transitions.
    pub fn observe_session(&self) -> SessionSubscription {
        SessionSubscription {
            rx: self.inner.session.subscribe(),
            primed: false,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.session.receiver_count()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), LoginError> {
        let previous = self.publish(Session::Authenticating, None);

        match self.inner.backend.sign_in(email, password).await {
            Ok(identity) => {
                tracing::info!(operator = %identity.email, "Login confirmed by backend");
                let sign_in = self.inner.sign_ins.fetch_add(1, Ordering::SeqCst) + 1;
                self.publish(Session::Authenticated(identity), Some(sign_in));
                Ok(())
            }
            Err(failure) => {
                let restored = match previous {
                    Session::Authenticating => Session::Unauthenticated,
                    other => other,
                };
                self.publish(restored, None);
                if failure.is_credential_error() {
                    tracing::warn!(code = %failure, "Login rejected");
                    Err(LoginError::InvalidCredentials)
                } else {
                    tracing::error!(error = %failure, "Login failed");
                    Err(LoginError::Unknown(failure.to_string()))
                }
            }
        }
    }

    /// Publishes `Unauthenticated` only once the backend acknowledges.
    pub async fn logout(&self) -> Result<(), LogoutError> {
        match self.inner.backend.sign_out().await {
            Ok(()) => {
                self.publish(Session::Unauthenticated, None);
                Ok(())
            }
            Err(failure) => {
                tracing::error!(error = %failure, "Error signing out");
                Err(LogoutError::Failed(failure.to_string()))
            }
        }
    }

    /// Replaces the session, keeping the sign-in number unless a new one is
    /// given. Returns the previous session.
    fn publish(&self, session: Session, sign_in: Option<u64>) -> Session {
        let mut previous = Session::Unauthenticated;
        self.inner.session.send_modify(|stamp| {
            previous = std::mem::replace(&mut stamp.session, session);
            if let Some(sign_in) = sign_in {
                stamp.sign_in = sign_in;
            }
        });
        previous
    }
}

/// A live subscription to session transitions. Dropping it unsubscribes.
pub struct SessionSubscription {
    rx: watch::Receiver<SessionStamp>,
    primed: bool,
}

impl SessionSubscription {
    pub fn current(&self) -> Session {
        self.rx.borrow().session.clone()
    }

    /// Reads the current state and marks it seen, so [`Self::next`] only
    /// wakes for later transitions.
    pub fn latest(&mut self) -> Session {
        self.latest_stamped().session
    }

    pub fn latest_stamped(&mut self) -> SessionStamp {
        self.primed = true;
        self.rx.borrow_and_update().clone()
    }

    /// `None` once the gate is gone.
    pub async fn next(&mut self) -> Option<Session> {
        self.next_stamped().await.map(|stamp| stamp.session)
    }

    /// Like [`Self::next`], with the sign-in number attached. Transitions
    /// that happen between two calls are coalesced into the latest one.
    pub async fn next_stamped(&mut self) -> Option<SessionStamp> {
        if !self.primed {
            self.primed = true;
            return Some(self.rx.borrow_and_update().clone());
        }
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}
