//! Access guard: the single predicate consulted before every protected
//! render. Denials are audited and redirected to the status-router
//! destination so the user is never dead-ended on an error screen.

use super::audit::{ViolationAuditor, ViolationKind};
use super::routing::{landing_route, NavHandle, Route};
use super::user::{PharmacyStatus, Role, User};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteRequirement {
    pub public: bool,
    pub required_role: Option<Role>,
    pub requires_approved_pharmacy: bool,
}

impl RouteRequirement {
    pub const fn public() -> Self {
        Self { public: true, required_role: None, requires_approved_pharmacy: false }
    }
    pub const fn role(role: Role) -> Self {
        Self { public: false, required_role: Some(role), requires_approved_pharmacy: false }
    }
    pub const fn approved_pharmacy() -> Self {
        Self { public: false, required_role: Some(Role::Pharmacy), requires_approved_pharmacy: true }
    }

    /// Routes reserved for pharmacy operators are exempt from the admin
    /// override below.
    fn pharmacy_specific(&self) -> bool {
        self.required_role == Some(Role::Pharmacy) || self.requires_approved_pharmacy
    }
}

/// Declared requirements for every built-in screen.
pub fn requirement_for(route: Route) -> RouteRequirement {
    match route {
        Route::Login | Route::Register | Route::VerifyOtp => RouteRequirement::public(),
        Route::AdminDashboard => RouteRequirement::role(Role::Admin),
        Route::PatientHome => RouteRequirement::role(Role::Patient),
        // Pre-approval pharmacy screens only need the pharmacy role; the
        // dashboard additionally needs an approved application.
        Route::PharmacyOnboarding
        | Route::PharmacyWaitingApproval
        | Route::PharmacyApplicationRejected => RouteRequirement::role(Role::Pharmacy),
        Route::PharmacyDashboard => RouteRequirement::approved_pharmacy(),
    }
}

/// Rules, in order: public routes always pass; no user denies everything
/// else; a role mismatch denies unless the user is an admin and the route is
/// not pharmacy-specific; approved-pharmacy routes additionally require
/// `APPROVED` status.
pub fn can_access(user: Option<&User>, req: &RouteRequirement) -> bool {
    if req.public {
        return true;
    }
    let Some(user) = user else { return false };
    if let Some(required) = req.required_role {
        if user.role != required {
            // Admin override: support staff may view non-pharmacy screens.
            if !(user.role == Role::Admin && !req.pharmacy_specific()) {
                return false;
            }
        }
    }
    if req.requires_approved_pharmacy && user.pharmacy_status() != Some(PharmacyStatus::Approved) {
        return false;
    }
    true
}

/// Guard a navigation attempt: returns the route to actually render. Allowed
/// attempts pass through; denied attempts are recorded and redirected to the
/// user's legitimate landing route, recomputed fresh.
pub fn resolve_navigation(
    user: Option<&User>,
    attempted: Route,
    auditor: &ViolationAuditor,
    nav: &NavHandle,
) -> Route {
    let req = requirement_for(attempted);
    if can_access(user, &req) {
        nav.goto(attempted);
        return attempted;
    }
    let kind = match user {
        None => ViolationKind::UnauthenticatedAccess,
        Some(u) if req.requires_approved_pharmacy && u.role == Role::Pharmacy => {
            ViolationKind::PharmacyNotApproved
        }
        Some(_) => ViolationKind::NavigationRoleMismatch,
    };
    let details = match user {
        None => "no session".to_string(),
        Some(u) => format!("role={} status={:?}", u.role.id(), u.pharmacy_status()),
    };
    auditor.record(kind, attempted, details);
    let dest = landing_route(user);
    nav.goto(dest);
    dest
}
