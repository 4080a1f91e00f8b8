//! Observable authentication state.
//!
//! [`AppState`] owns an [`AuthSnapshot`] and is the only thing that changes
//! it. Changes happen through four private mutations (started, success,
//! error, logout) invoked by the public async actions. Readers either take a
//! [`snapshot`](AppState::snapshot) or [`subscribe`](AppState::subscribe) to
//! a `watch` channel and see every committed change.
//!
//! ```text
//! idle ──login──▶ pending ──ok──▶ success
//!                    └────err──▶ error
//! ```
//!
//! Logout is not a status transition: it clears `is_authorized`, `user` and
//! `token` whatever the status is.

use std::fmt;

use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::error::Error;
use crate::session::{SessionData, SessionStore};
use crate::token::{AccessToken, Claims};
use crate::traits::Authenticator;
use crate::{Credentials, Result};

/// Progress of the most recent login attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AuthStatus {
    /// No attempt made since startup.
    #[default]
    Idle,
    /// An attempt is in flight.
    Pending,
    /// The last attempt to settle succeeded.
    Success,
    /// The last attempt to settle failed.
    Error,
}

impl AuthStatus {
    /// Lowercase name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthStatus::Idle => "idle",
            AuthStatus::Pending => "pending",
            AuthStatus::Success => "success",
            AuthStatus::Error => "error",
        }
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point-in-time view of the authentication state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthSnapshot {
    /// A login is in flight.
    pub pending: bool,
    /// The user may enter protected routes.
    pub is_authorized: bool,
    /// Status of the last login attempt.
    pub status: AuthStatus,
    /// The access token of the current session.
    pub token: Option<AccessToken>,
    /// Claims of the current user.
    pub user: Option<Claims>,
    /// Message of the error that ended the last attempt, if it failed.
    pub error: Option<String>,
}

impl AuthSnapshot {
    /// Derive the startup state from what is already stored.
    pub fn from_session(session: &SessionStore) -> Self {
        Self {
            pending: false,
            is_authorized: session.has_session(),
            status: AuthStatus::Idle,
            token: session.access_token(),
            user: session.current_user(),
            error: None,
        }
    }

    /// Status of the last login attempt.
    pub fn auth_status(&self) -> AuthStatus {
        self.status
    }

    /// The `sub` claim of the current user.
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().and_then(Claims::subject)
    }

    /// The `role` claim of the current user.
    pub fn user_role(&self) -> Option<&str> {
        self.user.as_ref().and_then(Claims::role_str)
    }

    /// True if the current user has the admin role.
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(Claims::is_admin)
    }
}

/// The application's authentication state container.
///
/// Concurrent actions are not serialized: if two logins overlap, whichever
/// settles last decides the final state.
pub struct AppState<A> {
    auth: A,
    state: watch::Sender<AuthSnapshot>,
}

impl<A: Authenticator> AppState<A> {
    /// Create the container, seeding it from the authenticator's session.
    pub fn new(auth: A) -> Self {
        let initial = AuthSnapshot::from_session(auth.session());
        let (state, _) = watch::channel(initial);
        Self { auth, state }
    }

    /// Returns the authenticator actions are dispatched to.
    pub fn authenticator(&self) -> &A {
        &self.auth
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    /// Receive every committed change.
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    /// True once a login succeeded and until logout.
    pub fn is_authorized(&self) -> bool {
        self.state.borrow().is_authorized
    }

    /// Status of the last login attempt.
    pub fn auth_status(&self) -> AuthStatus {
        self.state.borrow().status
    }

    /// The `sub` claim of the current user.
    pub fn user_id(&self) -> Option<String> {
        self.state.borrow().user_id().map(str::to_string)
    }

    /// The `role` claim of the current user.
    pub fn user_role(&self) -> Option<String> {
        self.state.borrow().user_role().map(str::to_string)
    }

    /// True if the current user has the admin role.
    pub fn is_admin(&self) -> bool {
        self.state.borrow().is_admin()
    }

    // ========================================================================
    // Actions
    // ========================================================================

    /// Log in without credentials.
    ///
    /// Failures are not returned; they end up in the snapshot as
    /// [`AuthStatus::Error`].
    #[instrument(skip(self))]
    pub async fn login_anonymous(&self) -> AuthSnapshot {
        self.auth_started();
        let outcome = self.auth.login_anonymous().await;
        self.settle(outcome)
    }

    /// Log in with email and password.
    #[instrument(skip_all, fields(email = %credentials.email()))]
    pub async fn login_with_credentials(&self, credentials: &Credentials) -> AuthSnapshot {
        self.auth_started();
        let outcome = self.auth.login_with_credentials(credentials).await;
        self.settle(outcome)
    }

    /// Replace the stored token pair using the refresh token.
    ///
    /// A failed refresh records the error but leaves `is_authorized` as it
    /// was; the old tokens are still stored.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> AuthSnapshot {
        self.auth_started();
        let outcome = self.auth.refresh_session().await;
        self.settle(outcome)
    }

    /// Forget the session.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> AuthSnapshot {
        self.auth.logout();
        self.auth_logout();
        self.snapshot()
    }

    fn settle(&self, outcome: Result<SessionData>) -> AuthSnapshot {
        match outcome {
            Ok(data) => self.auth_success(data),
            Err(e) => self.auth_error(&e),
        }
        self.snapshot()
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    fn auth_started(&self) {
        self.state.send_modify(|s| {
            s.status = AuthStatus::Pending;
            s.pending = true;
        });
    }

    fn auth_success(&self, data: SessionData) {
        let user = self.auth.session().current_user();
        info!(sub = ?user.as_ref().and_then(Claims::subject), "Authorized");
        self.state.send_modify(|s| {
            s.status = AuthStatus::Success;
            s.is_authorized = true;
            s.pending = false;
            s.token = Some(data.access_token);
            s.user = user;
            s.error = None;
        });
    }

    fn auth_error(&self, err: &Error) {
        warn!(error = %err, "Authorization failed");
        let message = err.to_string();
        self.state.send_modify(|s| {
            s.status = AuthStatus::Error;
            s.pending = false;
            s.error = Some(message);
        });
    }

    fn auth_logout(&self) {
        info!("Logged out");
        self.state.send_modify(|s| {
            s.is_authorized = false;
            s.user = None;
            s.token = None;
        });
    }
}

impl<A> fmt::Debug for AppState<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::{Mutex, oneshot};

    use crate::error::{AuthError, ProtocolError};
    use crate::storage::{ACCESS_TOKEN_KEY, KeyValueStore, MemoryStore, REFRESH_TOKEN_KEY};
    use crate::token::{RefreshToken, encode_unsigned};

    const PASSWORD: &str = "correct horse";

    fn token_for(sub: &str, role: &str) -> String {
        encode_unsigned(&Claims::new().with("sub", sub).with("role", role))
    }

    /// Issues tokens locally; each kind of login can be held back by a gate.
    struct FakeAuth {
        session: SessionStore,
        anonymous_gate: Mutex<Option<oneshot::Receiver<()>>>,
        credentials_gate: Mutex<Option<oneshot::Receiver<()>>>,
        malformed: bool,
    }

    impl FakeAuth {
        fn new(storage: Arc<MemoryStore>) -> Self {
            Self {
                session: SessionStore::new(storage),
                anonymous_gate: Mutex::new(None),
                credentials_gate: Mutex::new(None),
                malformed: false,
            }
        }

        fn issue(&self, access: &str) -> Result<SessionData> {
            let refresh = encode_unsigned(&Claims::new().with("kind", "refresh"));
            self.session
                .save_session(access, &refresh)
                .map_err(|_| AuthError::InvalidAuthorizationData)?;
            Ok(SessionData {
                access_token: AccessToken::new(access),
                refresh_token: RefreshToken::new(refresh),
                access_token_expiration: Some(3600),
                refresh_token_expiration: None,
            })
        }
    }

    async fn wait(gate: &Mutex<Option<oneshot::Receiver<()>>>) {
        let rx = gate.lock().await.take();
        if let Some(rx) = rx {
            let _ = rx.await;
        }
    }

    #[async_trait]
    impl Authenticator for FakeAuth {
        fn session(&self) -> &SessionStore {
            &self.session
        }

        async fn login_anonymous(&self) -> Result<SessionData> {
            wait(&self.anonymous_gate).await;
            if self.malformed {
                return self.issue("not-a-token");
            }
            self.issue(&token_for("anon-1", "anonymous"))
        }

        async fn login_with_credentials(&self, credentials: &Credentials) -> Result<SessionData> {
            wait(&self.credentials_gate).await;
            if credentials.password() != PASSWORD {
                return Err(ProtocolError::new(400, None, Some("Bad Request".into())).into());
            }
            self.issue(&token_for(credentials.email(), "user"))
        }

        async fn refresh_session(&self) -> Result<SessionData> {
            if self.session.refresh_token().is_none() {
                return Err(AuthError::Unauthorized.into());
            }
            let sub = self
                .session
                .current_user()
                .and_then(|c| c.subject().map(str::to_string))
                .unwrap_or_default();
            self.issue(&token_for(&sub, "admin"))
        }
    }

    #[test]
    fn starts_idle_without_session() {
        let state = AppState::new(FakeAuth::new(Arc::new(MemoryStore::new())));
        let snapshot = state.snapshot();
        assert_eq!(snapshot.status, AuthStatus::Idle);
        assert!(!snapshot.pending);
        assert!(!state.is_authorized());
        assert!(snapshot.user.is_none());
        assert!(snapshot.token.is_none());
    }

    #[test]
    fn starts_authorized_from_stored_token() {
        let storage = Arc::new(MemoryStore::new());
        storage
            .set(ACCESS_TOKEN_KEY, &token_for("u1", "admin"))
            .unwrap();

        let state = AppState::new(FakeAuth::new(storage));
        assert!(state.is_authorized());
        assert_eq!(state.user_id().as_deref(), Some("u1"));
        assert_eq!(state.user_role().as_deref(), Some("admin"));
        assert!(state.is_admin());
        assert_eq!(state.auth_status(), AuthStatus::Idle);
    }

    #[tokio::test]
    async fn anonymous_login_authorizes_with_decoded_user() {
        let storage = Arc::new(MemoryStore::new());
        let state = AppState::new(FakeAuth::new(storage.clone()));

        let snapshot = state.login_anonymous().await;

        assert_eq!(snapshot.status, AuthStatus::Success);
        assert!(snapshot.is_authorized);
        assert!(!snapshot.pending);

        let stored = storage.get(ACCESS_TOKEN_KEY).unwrap().unwrap();
        let decoded = crate::token::decode_claims(&stored).unwrap();
        assert_eq!(snapshot.user, Some(decoded));
        assert_eq!(snapshot.token.unwrap().as_str(), stored);
    }

    #[tokio::test]
    async fn pending_is_observed_before_success() {
        let (release, gate) = oneshot::channel();
        let auth = FakeAuth::new(Arc::new(MemoryStore::new()));
        *auth.anonymous_gate.lock().await = Some(gate);
        let state = AppState::new(auth);
        let mut updates = state.subscribe();

        let observer = async move {
            updates.changed().await.unwrap();
            let seen = updates.borrow_and_update().clone();
            release.send(()).unwrap();
            seen
        };

        let (finished, seen) = tokio::join!(state.login_anonymous(), observer);

        assert_eq!(seen.status, AuthStatus::Pending);
        assert!(seen.pending);
        assert_eq!(finished.status, AuthStatus::Success);
    }

    #[tokio::test]
    async fn failed_login_records_error() {
        let state = AppState::new(FakeAuth::new(Arc::new(MemoryStore::new())));

        let snapshot = state
            .login_with_credentials(&Credentials::new("a@example.com", "wrong"))
            .await;

        assert_eq!(snapshot.status, AuthStatus::Error);
        assert!(!snapshot.pending);
        assert!(!snapshot.is_authorized);
        assert!(snapshot.error.unwrap().contains("400"));
    }

    #[tokio::test]
    async fn malformed_tokens_fail_without_session() {
        let storage = Arc::new(MemoryStore::new());
        let mut auth = FakeAuth::new(storage.clone());
        auth.malformed = true;
        let state = AppState::new(auth);

        let snapshot = state.login_anonymous().await;

        assert_eq!(snapshot.status, AuthStatus::Error);
        assert!(
            snapshot
                .error
                .unwrap()
                .contains("invalid authorization data")
        );
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn credentialed_login_sets_user() {
        let state = AppState::new(FakeAuth::new(Arc::new(MemoryStore::new())));

        let snapshot = state
            .login_with_credentials(&Credentials::new("a@example.com", PASSWORD))
            .await;

        assert_eq!(snapshot.status, AuthStatus::Success);
        assert_eq!(snapshot.user_id(), Some("a@example.com"));
        assert_eq!(snapshot.user_role(), Some("user"));
        assert!(!snapshot.is_admin());
    }

    #[tokio::test]
    async fn success_clears_previous_error() {
        let state = AppState::new(FakeAuth::new(Arc::new(MemoryStore::new())));
        state
            .login_with_credentials(&Credentials::new("a@example.com", "wrong"))
            .await;

        let snapshot = state.login_anonymous().await;
        assert_eq!(snapshot.status, AuthStatus::Success);
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn logout_resets_regardless_of_status() {
        let storage = Arc::new(MemoryStore::new());
        let state = AppState::new(FakeAuth::new(storage.clone()));
        state.login_anonymous().await;
        state
            .login_with_credentials(&Credentials::new("a@example.com", "wrong"))
            .await;
        assert_eq!(state.auth_status(), AuthStatus::Error);
        assert!(state.is_authorized());

        let snapshot = state.logout().await;

        assert!(!snapshot.is_authorized);
        assert!(snapshot.user.is_none());
        assert!(snapshot.token.is_none());
        assert_eq!(snapshot.status, AuthStatus::Error);
        assert!(storage.get(ACCESS_TOKEN_KEY).unwrap().is_none());
        assert!(storage.get(REFRESH_TOKEN_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn refresh_recomputes_user() {
        let state = AppState::new(FakeAuth::new(Arc::new(MemoryStore::new())));
        state.login_anonymous().await;
        assert!(!state.is_admin());

        let snapshot = state.refresh().await;

        assert_eq!(snapshot.status, AuthStatus::Success);
        assert_eq!(snapshot.user_id(), Some("anon-1"));
        assert!(snapshot.is_admin());
    }

    #[tokio::test]
    async fn refresh_without_session_is_an_error() {
        let state = AppState::new(FakeAuth::new(Arc::new(MemoryStore::new())));
        let snapshot = state.refresh().await;
        assert_eq!(snapshot.status, AuthStatus::Error);
        assert!(!snapshot.is_authorized);
    }

    #[tokio::test]
    async fn overlapping_logins_last_settled_wins() {
        let (release_anonymous, anonymous_gate) = oneshot::channel();
        let (release_credentials, credentials_gate) = oneshot::channel();
        let auth = FakeAuth::new(Arc::new(MemoryStore::new()));
        *auth.anonymous_gate.lock().await = Some(anonymous_gate);
        *auth.credentials_gate.lock().await = Some(credentials_gate);
        let state = AppState::new(auth);
        let credentials = Credentials::new("b@example.com", PASSWORD);

        let release = async move {
            tokio::task::yield_now().await;
            release_credentials.send(()).unwrap();
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            release_anonymous.send(()).unwrap();
        };

        tokio::join!(
            state.login_anonymous(),
            state.login_with_credentials(&credentials),
            release
        );

        let snapshot = state.snapshot();
        assert_eq!(snapshot.status, AuthStatus::Success);
        assert_eq!(snapshot.user_id(), Some("anon-1"));
    }
}
