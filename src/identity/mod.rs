pub mod audit;
pub mod guard;
pub mod routing;
pub mod session;
pub mod user;

pub use audit::{ViolationAuditor, ViolationKind, ViolationRecord};
pub use guard::{can_access, requirement_for, resolve_navigation, RouteRequirement};
pub use routing::{landing_route, NavHandle, Route};
pub use session::{RegisterRequest, Session, SessionHandle, SessionManager};
pub use user::{PharmacyProfile, PharmacyStatus, Role, User};

use std::sync::Arc;

use crate::api::ApiClient;
use crate::config::Config;
use crate::credentials::CredentialStore;

/// Explicitly wired client state: one owner, passed by reference. The session
/// cell has exactly one writer (the manager); everything else reads.
#[derive(Clone)]
pub struct ClientCore {
    pub api: ApiClient,
    pub store: CredentialStore,
    pub sessions: SessionHandle,
    pub nav: NavHandle,
    pub auditor: ViolationAuditor,
    pub manager: SessionManager,
}

impl ClientCore {
    pub fn new(config: &Config) -> Self {
        let api = ApiClient::new(config.api_base.clone());
        let store = CredentialStore::new(&config.credentials_path);
        let sessions = SessionHandle::new();
        let nav = NavHandle::new();
        let auditor = ViolationAuditor::new();
        let manager = SessionManager::new(api.clone(), store.clone(), sessions.clone(), nav.clone());

        // Global 401 contract: any authenticated request rejected anywhere
        // performs the same teardown as an explicit logout and lands on the
        // login entry point. The API client drops its own bearer first.
        let hook_sessions = sessions.clone();
        let hook_store = store.clone();
        let hook_nav = nav.clone();
        api.set_unauthorized_hook(Arc::new(move || {
            session::teardown(&hook_sessions, &hook_store, &hook_nav);
        }));

        Self { api, store, sessions, nav, auditor, manager }
    }

    /// Guarded navigation entry point used by the shell before every
    /// protected render.
    pub fn navigate(&self, attempted: Route) -> Route {
        let user = self.sessions.user();
        resolve_navigation(user.as_ref(), attempted, &self.auditor, &self.nav)
    }
}
