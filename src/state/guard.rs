//! Route gating for protected views.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every protected view asks the same question before rendering, so the
//! decision lives here. The guard reads a session snapshot synchronously and
//! never calls the backend.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use crate::net::types::Role;
use crate::state::session::SessionSnapshot;

/// What a view should do with a protected route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    Render,
    /// Session still resolving; show a loading state, do not redirect.
    Pending,
    RedirectToLogin,
    NotAuthorized,
}

impl GuardDecision {
    #[must_use]
    pub fn allows(self) -> bool {
        self == Self::Render
    }
}

/// Decide access from already-resolved session facts.
#[must_use]
pub fn evaluate(is_authenticated: bool, role: Option<Role>, required_role: Option<Role>) -> GuardDecision {
    if !is_authenticated {
        return GuardDecision::RedirectToLogin;
    }
    match required_role {
        Some(required) if role != Some(required) => GuardDecision::NotAuthorized,
        _ => GuardDecision::Render,
    }
}

/// True once the session has resolved to anonymous.
#[must_use]
pub fn should_redirect_unauth(session: &SessionSnapshot) -> bool {
    !session.is_loading() && !session.is_authenticated()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RouteGuard {
    required_role: Option<Role>,
}

impl RouteGuard {
    /// Any signed-in user.
    #[must_use]
    pub fn authenticated() -> Self {
        Self { required_role: None }
    }

    #[must_use]
    pub fn requiring(role: Role) -> Self {
        Self { required_role: Some(role) }
    }

    #[must_use]
    pub fn required_role(self) -> Option<Role> {
        self.required_role
    }

    #[must_use]
    pub fn check(self, session: &SessionSnapshot) -> GuardDecision {
        if session.is_loading() {
            return GuardDecision::Pending;
        }
        evaluate(session.is_authenticated(), session.role(), self.required_role)
    }
}
