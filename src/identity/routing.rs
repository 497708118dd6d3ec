//! Status router: the single place that maps a user's role/status to a
//! canonical landing route. Callers must re-evaluate it on every login,
//! verification and session refresh rather than caching its output.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::user::{PharmacyStatus, Role, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    Login,
    Register,
    VerifyOtp,
    AdminDashboard,
    PatientHome,
    PharmacyOnboarding,
    PharmacyWaitingApproval,
    PharmacyApplicationRejected,
    PharmacyDashboard,
}

/// Total mapping from user state to landing route. Pharmacy status drives the
/// onboarding branch; a missing status means the profile was never submitted
/// and lands on onboarding.
pub fn landing_route(user: Option<&User>) -> Route {
    let Some(user) = user else { return Route::Login };
    match user.role {
        Role::Admin => Route::AdminDashboard,
        Role::Patient => Route::PatientHome,
        Role::Pharmacy => match user.pharmacy_status() {
            None | Some(PharmacyStatus::OnboardingRequired) => Route::PharmacyOnboarding,
            Some(PharmacyStatus::Pending) => Route::PharmacyWaitingApproval,
            Some(PharmacyStatus::Rejected) => Route::PharmacyApplicationRejected,
            Some(PharmacyStatus::Approved) => Route::PharmacyDashboard,
        },
    }
}

/// Shared current-route cell: the client-side equivalent of a redirect.
/// Written by the session manager and the access guard, read by the shell UI.
#[derive(Debug, Clone)]
pub struct NavHandle {
    current: Arc<RwLock<Route>>,
}

impl Default for NavHandle {
    fn default() -> Self { Self::new() }
}

impl NavHandle {
    pub fn new() -> Self { Self { current: Arc::new(RwLock::new(Route::Login)) } }

    pub fn current(&self) -> Route { *self.current.read() }

    pub fn goto(&self, route: Route) {
        let mut cur = self.current.write();
        if *cur != route {
            tracing::debug!(from = ?*cur, to = ?route, "nav.goto");
            *cur = route;
        }
    }
}
