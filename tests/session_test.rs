use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use portfolio_inbox::{
    auth::{AuthBackend, AuthFailure, AuthGate, LoginError},
    error::StoreError,
    models::{
        message::{Message, ServerTimestamp},
        session::{Identity, Session},
    },
    services::{
        moderation::ModerationError,
        session::{SessionOrchestrator, View},
    },
    store::{memory::StoreOp, MemoryStore},
};
use tokio::sync::Notify;

const OPERATOR: &str = "admin@example.com";
const PASSWORD: &str = "s3cret";

/// Accepts one fixed credential pair. Sign-in can be held on a gate.
#[derive(Default)]
struct FakeAuth {
    hold_sign_in: Option<Arc<Notify>>,
    fail_sign_out: AtomicBool,
}

#[async_trait]
impl AuthBackend for FakeAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthFailure> {
        if let Some(gate) = &self.hold_sign_in {
            gate.notified().await;
        }
        if email != OPERATOR {
            return Err(AuthFailure::UserNotFound);
        }
        if password != PASSWORD {
            return Err(AuthFailure::WrongPassword);
        }
        Ok(Identity {
            email: email.to_string(),
        })
    }

    async fn sign_out(&self) -> Result<(), AuthFailure> {
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(AuthFailure::Network("offline".into()));
        }
        Ok(())
    }
}

fn msg(id: &str, seconds: i64) -> Message {
    Message {
        id: id.into(),
        name: format!("Visitor {id}"),
        email: format!("{id}@example.com"),
        body: "Hi".into(),
        received_at: Some(ServerTimestamp { seconds, nanoseconds: 0 }),
        read: false,
    }
}

fn setup(auth: FakeAuth) -> (AuthGate, Arc<MemoryStore>, SessionOrchestrator) {
    let gate = AuthGate::new(Arc::new(auth));
    let store = Arc::new(MemoryStore::with_messages(vec![msg("a", 2), msg("b", 1)]));
    let orchestrator = SessionOrchestrator::new(gate.clone(), store.clone());
    (gate, store, orchestrator)
}

#[tokio::test]
async fn fresh_start_shows_login_without_loading() {
    let (_gate, store, mut orchestrator) = setup(FakeAuth::default());
    assert_eq!(orchestrator.view(), View::Connecting);

    assert_eq!(orchestrator.attach().await, View::Login);
    assert!(orchestrator.moderation().is_none());
    assert_eq!(store.calls(StoreOp::List), 0);
}

#[tokio::test]
async fn wrong_password_reports_generic_error_and_stays_signed_out() {
    let (gate, _store, mut orchestrator) = setup(FakeAuth::default());
    orchestrator.attach().await;

    let mut observer = gate.observe_session();
    assert_eq!(observer.next().await, Some(Session::Unauthenticated));

    assert_eq!(
        orchestrator.login(OPERATOR, "wrong").await,
        Err(LoginError::InvalidCredentials)
    );
    assert_eq!(
        orchestrator.login("someone@else.com", PASSWORD).await,
        Err(LoginError::InvalidCredentials)
    );
    assert_eq!(
        LoginError::InvalidCredentials.to_string(),
        "Invalid email or password."
    );

    assert_eq!(observer.next().await, Some(Session::Unauthenticated));
    assert_eq!(orchestrator.sync().await, View::Login);
    assert!(orchestrator.moderation().is_none());
}

#[tokio::test]
async fn login_passes_through_connecting_before_moderation() {
    let hold = Arc::new(Notify::new());
    let (gate, store, mut orchestrator) = setup(FakeAuth {
        hold_sign_in: Some(hold.clone()),
        ..FakeAuth::default()
    });
    assert_eq!(orchestrator.attach().await, View::Login);

    let login = tokio::spawn({
        let gate = gate.clone();
        async move { gate.login(OPERATOR, PASSWORD).await }
    });

    assert_eq!(orchestrator.next_transition().await, Some(View::Connecting));
    assert!(orchestrator.moderation().is_none());

    hold.notify_one();
    assert_eq!(orchestrator.next_transition().await, Some(View::Moderation));
    assert_eq!(login.await.unwrap(), Ok(()));

    let moderation = orchestrator.moderation().unwrap();
    assert!(moderation.is_loaded());
    assert_eq!(moderation.messages().len(), 2);
    assert_eq!(store.calls(StoreOp::List), 1);
}

#[tokio::test]
async fn logout_discards_list_and_next_login_reloads() {
    let (_gate, store, mut orchestrator) = setup(FakeAuth::default());
    orchestrator.attach().await;
    orchestrator.login(OPERATOR, PASSWORD).await.unwrap();
    assert_eq!(orchestrator.sync().await, View::Moderation);
    orchestrator.moderation().unwrap().toggle_read("a").await.unwrap();

    orchestrator.logout().await.unwrap();
    assert!(orchestrator.moderation().is_none());
    assert_eq!(orchestrator.sync().await, View::Login);

    orchestrator.login(OPERATOR, PASSWORD).await.unwrap();
    assert_eq!(orchestrator.sync().await, View::Moderation);

    // the read flag set before logout comes back from the store, not a cache
    let moderation = orchestrator.moderation().unwrap();
    assert_eq!(store.calls(StoreOp::List), 2);
    assert_eq!(moderation.unread_count(), 1);
}

#[tokio::test]
async fn relogin_seen_as_one_update_still_reloads() {
    let (gate, store, mut orchestrator) = setup(FakeAuth::default());
    orchestrator.attach().await;
    gate.login(OPERATOR, PASSWORD).await.unwrap();
    assert_eq!(orchestrator.sync().await, View::Moderation);
    orchestrator.moderation().unwrap().toggle_read("a").await.unwrap();
    assert_eq!(store.calls(StoreOp::List), 1);

    // logout and login land before the orchestrator looks again
    gate.logout().await.unwrap();
    gate.login(OPERATOR, PASSWORD).await.unwrap();

    assert_eq!(orchestrator.next_transition().await, Some(View::Moderation));
    assert_eq!(store.calls(StoreOp::List), 2);
    let moderation = orchestrator.moderation().unwrap();
    assert!(moderation.is_loaded());
    assert_eq!(moderation.unread_count(), 1);

    // no new sign-in, no reload
    assert_eq!(orchestrator.sync().await, View::Moderation);
    assert_eq!(store.calls(StoreOp::List), 2);
}

#[tokio::test]
async fn failed_logout_keeps_session_and_list() {
    let auth = FakeAuth::default();
    auth.fail_sign_out.store(true, Ordering::SeqCst);
    let (gate, _store, mut orchestrator) = setup(auth);
    orchestrator.attach().await;
    orchestrator.login(OPERATOR, PASSWORD).await.unwrap();
    orchestrator.sync().await;

    assert!(orchestrator.logout().await.is_err());
    assert!(gate.current().is_authenticated());
    assert!(orchestrator.moderation().is_some());
    assert_eq!(orchestrator.sync().await, View::Moderation);
}

#[tokio::test]
async fn load_failure_on_entry_is_retryable() {
    let (_gate, store, mut orchestrator) = setup(FakeAuth::default());
    orchestrator.attach().await;
    store.fail_next(StoreOp::List, StoreError::Unavailable("offline".into()));

    orchestrator.login(OPERATOR, PASSWORD).await.unwrap();
    assert_eq!(orchestrator.sync().await, View::Moderation);
    assert!(matches!(
        orchestrator.last_error(),
        Some(ModerationError::LoadFailed(StoreError::Unavailable(_)))
    ));
    assert!(orchestrator.moderation().unwrap().messages().is_empty());

    orchestrator.reload().await.unwrap();
    assert!(orchestrator.last_error().is_none());
    assert_eq!(orchestrator.moderation().unwrap().messages().len(), 2);
}

#[tokio::test]
async fn attach_is_idempotent_and_detach_unsubscribes() {
    let (gate, _store, mut orchestrator) = setup(FakeAuth::default());
    assert_eq!(gate.subscriber_count(), 0);

    orchestrator.attach().await;
    orchestrator.attach().await;
    assert!(orchestrator.is_attached());
    assert_eq!(gate.subscriber_count(), 1);

    orchestrator.detach();
    assert!(!orchestrator.is_attached());
    assert_eq!(gate.subscriber_count(), 0);
    assert_eq!(orchestrator.next_transition().await, None);
}

#[tokio::test]
async fn late_subscriber_sees_current_session_first() {
    let (gate, _store, _orchestrator) = setup(FakeAuth::default());
    gate.login(OPERATOR, PASSWORD).await.unwrap();

    let mut late = gate.observe_session();
    assert_eq!(
        late.next().await,
        Some(Session::Authenticated(Identity {
            email: OPERATOR.to_string()
        }))
    );
}

#[tokio::test]
async fn subscription_waits_for_the_next_transition() {
    let (gate, _store, _orchestrator) = setup(FakeAuth::default());
    let mut sub = gate.observe_session();
    assert_eq!(sub.latest(), Session::Unauthenticated);

    let mut next = tokio_test::task::spawn(sub.next());
    tokio_test::assert_pending!(next.poll());

    gate.login(OPERATOR, PASSWORD).await.unwrap();
    assert!(next.is_woken());
    let session = tokio_test::assert_ready!(next.poll());
    assert!(session.is_some_and(|s| s.is_authenticated()));
}
