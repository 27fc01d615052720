use std::sync::Arc;

use crate::auth::{AuthGate, LoginError, LogoutError, SessionStamp, SessionSubscription};
use crate::backend::{backend, BackendUnavailable};
use crate::models::session::Session;
use crate::services::moderation::{ModerationController, ModerationError};
use crate::store::DocumentStore;

/// Which surface the admin area shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Connecting,
    Login,
    Moderation,
}

/// Drives the admin area from the session stream.
///
/// Holds at most one subscription. Each sign-in builds a fresh
/// [`ModerationController`] and loads it; leaving the session drops it.
/// A logout and login that reach the subscription as a single update still
/// count as a new sign-in.
pub struct SessionOrchestrator {
    gate: AuthGate,
    store: Arc<dyn DocumentStore>,
    subscription: Option<SessionSubscription>,
    moderation: Option<ModerationController>,
    /// Sign-in number the current controller was built for.
    entered: Option<u64>,
    last_error: Option<ModerationError>,
    view: View,
}

impl SessionOrchestrator {
    pub fn new(gate: AuthGate, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            gate,
            store,
            subscription: None,
            moderation: None,
            entered: None,
            last_error: None,
            view: View::Connecting,
        }
    }

    pub fn from_backend() -> Result<Self, BackendUnavailable> {
        let backend = backend()?;
        Ok(Self::new(backend.gate.clone(), Arc::clone(&backend.store)))
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn moderation(&self) -> Option<&ModerationController> {
        self.moderation.as_ref()
    }

    /// The most recent load failure, kept for a retry prompt.
    pub fn last_error(&self) -> Option<&ModerationError> {
        self.last_error.as_ref()
    }

    /// Subscribes if not yet subscribed and applies the current state.
    /// Calling it again reuses the existing subscription.
    pub async fn attach(&mut self) -> View {
        let stamp = match self.subscription.as_mut() {
            Some(sub) => sub.latest_stamped(),
            None => {
                let mut sub = self.gate.observe_session();
                let stamp = sub.latest_stamped();
                self.subscription = Some(sub);
                stamp
            }
        };
        self.apply(stamp).await
    }

    /// Applies the latest state without waiting for a new transition.
    pub async fn sync(&mut self) -> View {
        let Some(sub) = self.subscription.as_mut() else {
            return self.view;
        };
        let stamp = sub.latest_stamped();
        self.apply(stamp).await
    }

    /// Waits for the next session transition and applies it. `None` when
    /// detached or when the gate has gone away.
    pub async fn next_transition(&mut self) -> Option<View> {
        let stamp = self.subscription.as_mut()?.next_stamped().await?;
        Some(self.apply(stamp).await)
    }

    pub fn detach(&mut self) {
        if self.subscription.take().is_some() {
            tracing::debug!("Session subscription released");
        }
        self.discard();
        self.view = View::Connecting;
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), LoginError> {
        self.gate.login(email, password).await
    }

    /// On success the cached list is discarded right away; the next
    /// authenticated entry loads from scratch.
    pub async fn logout(&mut self) -> Result<(), LogoutError> {
        self.gate.logout().await?;
        self.discard();
        Ok(())
    }

    /// Retry affordance after a failed load.
    pub async fn reload(&mut self) -> Result<(), ModerationError> {
        let Some(moderation) = self.moderation.as_ref() else {
            return Ok(());
        };
        match moderation.load_all().await {
            Ok(_) => {
                self.last_error = None;
                Ok(())
            }
            Err(err) => {
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    fn discard(&mut self) {
        self.moderation = None;
        self.entered = None;
        self.last_error = None;
    }

    async fn apply(&mut self, stamp: SessionStamp) -> View {
        self.view = match stamp.session {
            Session::Unauthenticated => {
                self.discard();
                View::Login
            }
            Session::Authenticating => View::Connecting,
            Session::Authenticated(identity) => {
                if self.moderation.is_none() || self.entered != Some(stamp.sign_in) {
                    tracing::info!(
                        operator = %identity.email,
                        sign_in = stamp.sign_in,
                        "Entering moderation view"
                    );
                    let moderation = ModerationController::new(Arc::clone(&self.store));
                    self.last_error = moderation.load_all().await.err();
                    self.moderation = Some(moderation);
                    self.entered = Some(stamp.sign_in);
                }
                View::Moderation
            }
        };
        self.view
    }
}
