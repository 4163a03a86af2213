//! Auth-session state for the current client.
//!
//! SYSTEM CONTEXT
//! ==============
//! Constructed once at process start and shared by `Arc` with every view.
//! Views read [`SessionSnapshot`]s (or watch them change) and feed them to
//! the route guard; they never touch persisted credentials directly.
//!
//! DESIGN
//! ======
//! `Initializing -> {Authenticated, Anonymous}` happens exactly once via
//! [`SessionManager::init`]. Afterwards login, logout and forced teardown
//! (a 401 signalled by the HTTP client) move between `Authenticated` and
//! `Anonymous`. Every public operation returns an outcome value; errors from
//! the network or the token store are converted here and never escape.
//!
//! TRADE-OFFS
//! ==========
//! Transitions are serialized by one async mutex. A second login issued while
//! the first is in flight waits for it instead of racing it; registration
//! does not touch session state and is not serialized.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;

use crate::net::api::{ApiClient, AuthSignal};
use crate::net::error::ApiError;
use crate::net::types::{LoginRequest, LogoutRequest, RegisterRequest, Role, User};
use crate::storage::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, StorageError, TokenStore, clear_credentials};

pub const BACKEND_UNREACHABLE_MESSAGE: &str =
    "Backend server is not reachable. Please make sure the API server is running.";
pub const IDENTITY_RETRIEVAL_FAILED_MESSAGE: &str = "Login succeeded, but failed to retrieve user details.";
pub const LOGIN_FAILED_MESSAGE: &str = "Login failed";
pub const REGISTRATION_FAILED_MESSAGE: &str = "Registration failed";

// =============================================================================
// SNAPSHOT
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Initializing,
    Authenticated,
    Anonymous,
}

/// Point-in-time view of the session.
///
/// Fields are private so `Authenticated` can only exist with both a token
/// and a user present.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSnapshot {
    status: SessionStatus,
    access_token: Option<String>,
    refresh_token: Option<String>,
    user: Option<User>,
    redirect_to: Option<String>,
}

impl SessionSnapshot {
    #[must_use]
    pub fn initializing() -> Self {
        Self { status: SessionStatus::Initializing, access_token: None, refresh_token: None, user: None, redirect_to: None }
    }

    #[must_use]
    pub fn anonymous() -> Self {
        Self { status: SessionStatus::Anonymous, ..Self::initializing() }
    }

    #[must_use]
    pub fn authenticated(access_token: String, refresh_token: Option<String>, user: User) -> Self {
        Self {
            status: SessionStatus::Authenticated,
            access_token: Some(access_token),
            refresh_token,
            user: Some(user),
            redirect_to: None,
        }
    }

    #[must_use]
    fn with_redirect(mut self, redirect_to: Option<String>) -> Self {
        self.redirect_to = redirect_to;
        self
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.status == SessionStatus::Initializing
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|u| u.role)
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Navigation requested by a forced logout, not yet handled by the view.
    #[must_use]
    pub fn redirect_to(&self) -> Option<&str> {
        self.redirect_to.as_deref()
    }
}

// =============================================================================
// OUTCOMES
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum LoginOutcome {
    Success { user: User, should_redirect_to_admin: bool },
    Failure { error: String },
}

impl LoginOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    fn success(user: User) -> Self {
        let should_redirect_to_admin = user.role == Role::Admin;
        Self::Success { user, should_redirect_to_admin }
    }

    fn failure(error: impl Into<String>) -> Self {
        Self::Failure { error: error.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegisterOutcome {
    Success { username: String },
    Failure { error: String },
}

impl RegisterOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Turn an API failure into the message shown to the user.
///
/// Unreachable backend wins over everything; otherwise the server's own
/// message, then the interceptor's annotation, then `fallback`.
fn failure_message(err: &ApiError, fallback: &str) -> String {
    if err.is_transport() {
        return BACKEND_UNREACHABLE_MESSAGE.to_owned();
    }
    let message = err.server_message().map_or_else(|| err.to_string(), str::to_owned);
    if message.trim().is_empty() { fallback.to_owned() } else { message }
}

// =============================================================================
// SESSION MANAGER
// =============================================================================

pub struct SessionManager {
    api: Arc<ApiClient>,
    state: watch::Sender<SessionSnapshot>,
    transition: Mutex<()>,
    initialized: AtomicBool,
}

impl SessionManager {
    /// Create a session in `Initializing`. Call [`SessionManager::init`] next.
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::initializing());
        Self { api, state, transition: Mutex::new(()), initialized: AtomicBool::new(false) }
    }

    #[must_use]
    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    fn store(&self) -> &dyn TokenStore {
        self.api.store().as_ref()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Watch session changes (for views that re-render on transitions).
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Hand a pending forced-logout navigation to the view, at most once.
    pub fn take_redirect(&self) -> Option<String> {
        let mut taken = None;
        self.state.send_if_modified(|s| {
            taken = s.redirect_to.take();
            taken.is_some()
        });
        taken
    }

    fn publish(&self, snapshot: SessionSnapshot) {
        tracing::debug!(status = ?snapshot.status, "session transition");
        self.state.send_replace(snapshot);
    }

    fn drop_credentials(&self, reason: &'static str) {
        if let Err(e) = clear_credentials(self.store()) {
            tracing::warn!(error = %e, reason, "failed to clear persisted credentials");
        }
    }

    fn persist(&self, access_token: &str, refresh_token: Option<&str>) -> Result<(), StorageError> {
        self.store().set(ACCESS_TOKEN_KEY, access_token)?;
        if let Some(refresh) = refresh_token {
            self.store().set(REFRESH_TOKEN_KEY, refresh)?;
        }
        Ok(())
    }

    // =========================================================================
    // INIT
    // =========================================================================

    /// Resolve the persisted session once at startup.
    ///
    /// With a persisted token, asks the backend who it belongs to; any failure
    /// clears the persisted credentials. Always leaves `Initializing`.
    pub async fn init(&self) -> SessionSnapshot {
        if self.initialized.swap(true, Ordering::SeqCst) {
            tracing::warn!("session init called more than once; ignoring");
            return self.snapshot();
        }
        let _guard = self.transition.lock().await;
        // A 401 signalled before init ran leaves its redirect here.
        let pending = self.state.borrow().redirect_to.clone();

        let Some(token) = self.store().get(ACCESS_TOKEN_KEY) else {
            tracing::info!("no persisted session");
            self.publish(SessionSnapshot::anonymous().with_redirect(pending));
            return self.snapshot();
        };

        match self.api.me().await {
            Ok(user) => {
                tracing::info!(user_id = user.id, role = %user.role, "restored persisted session");
                let refresh = self.store().get(REFRESH_TOKEN_KEY);
                self.publish(SessionSnapshot::authenticated(token, refresh, user));
            }
            Err(e) => {
                tracing::warn!(error = %e, "persisted session rejected; clearing credentials");
                self.drop_credentials("init identity check failed");
                self.publish(SessionSnapshot::anonymous().with_redirect(pending));
            }
        }
        self.snapshot()
    }

    // =========================================================================
    // LOGIN / REGISTER
    // =========================================================================

    /// Log in with exactly the given credentials.
    pub async fn login(&self, credentials: &LoginRequest) -> LoginOutcome {
        let _guard = self.transition.lock().await;

        let tokens = match self.api.login(credentials).await {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::warn!(error = %e, "login failed");
                return LoginOutcome::failure(failure_message(&e, LOGIN_FAILED_MESSAGE));
            }
        };

        if let Err(e) = self.persist(&tokens.access_token, tokens.refresh_token.as_deref()) {
            tracing::error!(error = %e, "could not persist credentials after login");
            self.drop_credentials("login persistence failed");
            self.publish(SessionSnapshot::anonymous());
            return LoginOutcome::failure(LOGIN_FAILED_MESSAGE);
        }

        let user = match tokens.user {
            Some(user) => user,
            None => match self.api.me().await {
                Ok(user) => user,
                Err(e) => {
                    tracing::warn!(error = %e, "identity lookup after login failed; rolling back");
                    self.drop_credentials("login identity check failed");
                    self.publish(SessionSnapshot::anonymous());
                    return LoginOutcome::failure(IDENTITY_RETRIEVAL_FAILED_MESSAGE);
                }
            },
        };

        tracing::info!(user_id = user.id, role = %user.role, "logged in");
        self.publish(SessionSnapshot::authenticated(tokens.access_token, tokens.refresh_token, user.clone()));
        LoginOutcome::success(user)
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, user_data: &RegisterRequest) -> RegisterOutcome {
        match self.api.register(user_data).await {
            Ok(_) => {
                tracing::info!(username = %user_data.username, "registered");
                RegisterOutcome::Success { username: user_data.username.clone() }
            }
            Err(e) => {
                tracing::warn!(error = %e, "registration failed");
                RegisterOutcome::Failure { error: failure_message(&e, REGISTRATION_FAILED_MESSAGE) }
            }
        }
    }

    // =========================================================================
    // LOGOUT
    // =========================================================================

    /// Revoke the current refresh token (best effort) and clear local state.
    pub async fn logout(&self) -> SessionSnapshot {
        self.logout_inner(false).await
    }

    /// Like [`SessionManager::logout`] but asks the backend to revoke every
    /// refresh token of the account.
    pub async fn logout_everywhere(&self) -> SessionSnapshot {
        self.logout_inner(true).await
    }

    async fn logout_inner(&self, revoke_all: bool) -> SessionSnapshot {
        let _guard = self.transition.lock().await;

        if let Some(refresh_token) = self.store().get(REFRESH_TOKEN_KEY) {
            let request = LogoutRequest { refresh_token, revoke_all };
            if let Err(e) = self.api.logout(&request).await {
                tracing::warn!(error = %e, "server-side logout failed; clearing local session anyway");
            }
        }

        self.drop_credentials("logout");
        self.publish(SessionSnapshot::anonymous());
        tracing::info!(revoke_all, "logged out");
        self.snapshot()
    }

    // =========================================================================
    // FORCED TEARDOWN
    // =========================================================================

    /// Apply an auth signal from the HTTP client.
    ///
    /// A signal is stale when credentials other than the rejected ones have
    /// been persisted since the request was sent (a later login); stale
    /// signals are dropped so they cannot end the newer session.
    pub async fn handle_signal(&self, signal: AuthSignal) {
        let AuthSignal::Unauthenticated { redirect_to_login, bearer } = signal;
        let _guard = self.transition.lock().await;

        if let Some(current) = self.store().get(ACCESS_TOKEN_KEY) {
            if bearer.as_deref() != Some(current.as_str()) {
                tracing::debug!("ignoring 401 for credentials that have since been replaced");
                return;
            }
        }

        tracing::warn!(redirect_to_login, "backend rejected credentials; ending session");
        self.drop_credentials("401 from backend");

        let redirect = redirect_to_login.then(|| self.api.login_path().to_owned());
        if self.snapshot().is_loading() {
            // init finishes the transition out of Initializing.
            self.state.send_modify(|s| s.redirect_to = redirect);
        } else {
            self.publish(SessionSnapshot::anonymous().with_redirect(redirect));
        }
    }

    /// Subscribe to the HTTP client's auth signals and apply them in the background.
    ///
    /// The task holds only a weak reference and exits once the session is dropped.
    pub fn spawn_signal_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let mut signals = self.api.subscribe();
        let session: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                let signal = match signals.recv().await {
                    Ok(signal) => signal,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "auth signal listener lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let Some(session) = session.upgrade() else { break };
                session.handle_signal(signal).await;
            }
        })
    }
}
