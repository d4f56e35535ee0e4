//! Caller identity resolved from the auth service session.

use common::UserId;

use crate::error::CheckoutError;

/// Who is driving the checkout flow.
///
/// Constructed once from the auth session and passed by reference to the
/// components that need it, rather than read from ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    /// Browsing without an account.
    Guest,

    /// Authenticated user, with the auth service's suspension flag.
    Customer { user_id: UserId, suspended: bool },
}

impl Identity {
    /// Creates an identity for an authenticated, unsuspended user.
    pub fn customer(user_id: UserId) -> Self {
        Identity::Customer {
            user_id,
            suspended: false,
        }
    }

    /// Returns the user id, if authenticated.
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Identity::Guest => None,
            Identity::Customer { user_id, .. } => Some(*user_id),
        }
    }

    /// Returns the user id for an authenticated, unsuspended account.
    ///
    /// Guest checkout and suspended accounts are rejected before any
    /// remote mutation happens.
    pub fn require_active_customer(&self) -> Result<UserId, CheckoutError> {
        match self {
            Identity::Guest => Err(CheckoutError::AuthenticationRequired),
            Identity::Customer { suspended: true, .. } => Err(CheckoutError::AccountSuspended),
            Identity::Customer { user_id, .. } => Ok(*user_id),
        }
    }
}
