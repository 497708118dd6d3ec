//! Session manager: the single writer of both the in-memory session cell and
//! the durable credential store. Login, registration, OTP verification,
//! refresh and logout all funnel through here so token and user can never be
//! observed out of step.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::credentials::{CredentialStore, PendingRegistration};
use crate::error::{AppError, AppResult};

use super::routing::{landing_route, NavHandle, Route};
use super::user::{PharmacyProfile, Role, User};

/// Authenticated pairing of bearer token and user snapshot. Unauthenticated
/// state is the absence of a `Session`, never a partial one.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Many-reader view of the current session. The whole `Option<Session>` is
/// swapped under one write lock, so a poller reading concurrently sees either
/// the old pairing or the new one, never a mix.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionHandle {
    pub fn new() -> Self { Self::default() }

    pub fn current(&self) -> Option<Session> { self.inner.read().clone() }

    pub fn user(&self) -> Option<User> { self.inner.read().as_ref().map(|s| s.user.clone()) }

    pub fn is_authenticated(&self) -> bool { self.inner.read().is_some() }

    fn set(&self, session: Option<Session>) {
        *self.inner.write() = session;
    }
}

#[derive(Debug, Clone, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role_id: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pharmacy: Option<PharmacyProfile>,
}

#[derive(Debug, Clone, Deserialize)]
struct AuthData {
    token: String,
    user: User,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterData {
    user_id: String,
}

/// Shared teardown: clear the in-memory cell, wipe all four durable keys
/// together and land on the login entry point. Idempotent; also invoked by
/// the 401 hook installed on the API client.
pub(crate) fn teardown(sessions: &SessionHandle, store: &CredentialStore, nav: &NavHandle) {
    if sessions.is_authenticated() {
        tracing::info!("session.teardown");
    }
    sessions.set(None);
    if let Err(e) = store.clear_all() {
        tracing::warn!(err = %e, "session.teardown_store_failed");
    }
    nav.goto(Route::Login);
}

#[derive(Clone)]
pub struct SessionManager {
    api: ApiClient,
    store: CredentialStore,
    sessions: SessionHandle,
    nav: NavHandle,
}

impl SessionManager {
    pub fn new(api: ApiClient, store: CredentialStore, sessions: SessionHandle, nav: NavHandle) -> Self {
        Self { api, store, sessions, nav }
    }

    pub fn sessions(&self) -> &SessionHandle { &self.sessions }

    /// Durable write happens before the in-memory swap: a crash between the
    /// two re-validates on next boot, whereas the reverse order could leave a
    /// live session with nothing persisted behind it.
    fn install_session(&self, token: String, user: User) -> Session {
        if let Err(e) = self.store.save_session(&token, &user) {
            tracing::warn!(err = %e, "session.persist_failed");
        }
        let session = Session { token: token.clone(), user };
        self.api.set_token(Some(token));
        self.sessions.set(Some(session.clone()));
        tracing::info!(user = %session.user.id, role = session.user.role.id(), "session.established");
        session
    }

    fn land(&self, user: &User) -> Route {
        // Always recomputed, never cached: an approval that happened
        // server-side must take effect on the very next login/refresh.
        let route = landing_route(Some(user));
        self.nav.goto(route);
        route
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<(Session, Route)> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AppError::validation("credentials", "email and password are required"));
        }
        match self.api.post::<_, AuthData>("auth/login", &LoginRequest { email, password }).await {
            Ok(data) => {
                let session = self.install_session(data.token, data.user);
                let route = self.land(&session.user);
                Ok((session, route))
            }
            Err(AppError::EmailNotVerified { email, user_id, message }) => {
                // Persist the pending markers so a reload resumes at the OTP
                // screen instead of losing the flow.
                let pending = PendingRegistration { email: email.clone(), user_id: user_id.clone() };
                if let Err(e) = self.store.save_pending(&pending) {
                    tracing::warn!(err = %e, "session.pending_persist_failed");
                }
                self.nav.goto(Route::VerifyOtp);
                Err(AppError::EmailNotVerified { email, user_id, message })
            }
            Err(e) => Err(e),
        }
    }

    /// Registration never creates a session; it parks the caller in the
    /// OTP-pending flow.
    pub async fn register(&self, req: &RegisterRequest) -> AppResult<PendingRegistration> {
        if req.email.trim().is_empty() || req.password.is_empty() {
            return Err(AppError::validation("profile", "email and password are required"));
        }
        let data: RegisterData = self.api.post("auth/register", req).await?;
        let pending = PendingRegistration { email: req.email.clone(), user_id: data.user_id };
        if let Err(e) = self.store.save_pending(&pending) {
            tracing::warn!(err = %e, "session.pending_persist_failed");
        }
        self.nav.goto(Route::VerifyOtp);
        Ok(pending)
    }

    pub async fn verify_otp(&self, email: &str, code: &str) -> AppResult<(Session, Route)> {
        if code.trim().is_empty() {
            return Err(AppError::validation("otp", "enter the code you received"));
        }
        let data: AuthData = self.api
            .post("auth/verify-otp", &serde_json::json!({ "email": email, "otp": code }))
            .await?;
        // Both pending keys go together, and only after the backend accepted
        // the code.
        if let Err(e) = self.store.clear_pending() {
            tracing::warn!(err = %e, "session.pending_clear_failed");
        }
        let session = self.install_session(data.token, data.user);
        let route = self.land(&session.user);
        Ok((session, route))
    }

    pub async fn resend_otp(&self, email: &str) -> AppResult<()> {
        self.api.post::<_, ()>("auth/resend-otp", &serde_json::json!({ "email": email })).await
    }

    /// Durable pending markers for resuming the OTP step after a reload.
    pub fn pending_registration(&self) -> Option<PendingRegistration> {
        self.store.pending()
    }

    /// The user navigated back to login/register, abandoning the OTP flow.
    pub fn abandon_pending(&self) {
        if let Err(e) = self.store.clear_pending() {
            tracing::warn!(err = %e, "session.pending_clear_failed");
        }
    }

    /// Bootstrap rehydration. A locally cached user is only a hint: the token
    /// must be re-accepted by the backend before anything trusts it. Every
    /// failure degrades to unauthenticated rather than erroring the boot.
    pub async fn refresh_session(&self) -> Option<Session> {
        let Some((token, cached_user)) = self.store.stored_session() else {
            return None;
        };
        tracing::debug!(user = %cached_user.id, "session.rehydrate_attempt");
        self.api.set_token(Some(token.clone()));
        match self.api.get::<User>("auth/me").await {
            Ok(user) => {
                let session = self.install_session(token, user);
                self.land(&session.user);
                Some(session)
            }
            Err(e) if e.is_unauthorized() => {
                // The 401 hook already wiped the durable pairing; repeating
                // the teardown keeps this path explicit and idempotent.
                tracing::info!("session.rehydrate_revoked");
                self.force_teardown();
                None
            }
            Err(e) => {
                // Transient failure (backend unreachable at boot): this run
                // stays unauthenticated, but the durable pairing is kept so
                // the next boot can try again once connectivity returns.
                tracing::info!(err = %e, "session.rehydrate_deferred");
                self.api.set_token(None);
                self.sessions.set(None);
                self.nav.goto(Route::Login);
                None
            }
        }
    }

    /// Explicit token rotation: the backend replaces the bearer and returns a
    /// fresh user snapshot in the same response.
    pub async fn refresh_token(&self) -> AppResult<Session> {
        let data: AuthData = self.api.post_empty("auth/refresh").await?;
        let session = self.install_session(data.token, data.user);
        self.land(&session.user);
        Ok(session)
    }

    /// Unconditional: the backend call is best-effort and local teardown
    /// happens regardless, so this never fails the caller.
    pub async fn logout(&self) {
        if self.sessions.is_authenticated() {
            if let Err(e) = self.api.post_empty::<()>("auth/logout").await {
                tracing::debug!(err = %e, "session.logout_backend_ignored");
            }
        }
        self.force_teardown();
    }

    /// Same teardown as `logout` minus the backend call; target of the global
    /// 401 hook. Idempotent.
    pub fn force_teardown(&self) {
        self.api.set_token(None);
        teardown(&self.sessions, &self.store, &self.nav);
    }
}
