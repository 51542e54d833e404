//! Route eligibility decisions.
//!
//! Maps the current [`AuthUser`] view (or its absence) to exactly one
//! routing decision. Pure function of the snapshot; the HTTP guards in
//! `routes` translate decisions into responses.

use uagen_common::AuthUser;

/// What a route requires of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Pages and APIs any approved account can use.
    UserArea,
    /// Admin dashboard pages. Approved non-admins are steered back to
    /// their own home rather than shown an error.
    AdminArea,
    /// Admin-only mutations. Approved non-admins get a hard denial.
    AdminAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Session state still loading; render nothing yet.
    Wait,
    Allow,
    RedirectToLogin,
    RedirectToPendingApproval,
    RedirectToUserHome,
    RedirectToUnauthorized,
}

/// Decide route eligibility for the given snapshot.
///
/// Approval is checked strictly before role: an unapproved admin-to-be is
/// sent to pending approval, never granted admin access.
pub fn decide(user: Option<&AuthUser>, loading: bool, route: RouteClass) -> Decision {
    if loading {
        return Decision::Wait;
    }
    let Some(user) = user else {
        return Decision::RedirectToLogin;
    };
    if !user.approved {
        return Decision::RedirectToPendingApproval;
    }
    match route {
        RouteClass::UserArea => Decision::Allow,
        RouteClass::AdminArea if !user.is_admin() => Decision::RedirectToUserHome,
        RouteClass::AdminAction if !user.is_admin() => Decision::RedirectToUnauthorized,
        _ => Decision::Allow,
    }
}
