//! Authorization policy: the `(role, action)` decision table.
//!
//! The policy is consulted after validation and before anything reaches the
//! resource synchronizer; a denial is resolved locally and no network call is
//! issued. Administrators may perform every action, sector managers may read
//! and update the sites they manage, and plain users may only read.

use std::fmt;

use crate::domain::user::{Role, UserId};

/// Authenticated identity on whose behalf an action is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Stable identifier of the acting user.
    pub id: UserId,
    /// Role the acting user holds.
    pub role: Role,
}

impl Actor {
    /// Build an actor from its identity components.
    #[must_use]
    pub const fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }
}

/// Action requested against a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    /// Create a user account.
    CreateUser,
    /// Update a user account, including role changes.
    UpdateUser,
    /// Delete a user account.
    DeleteUser,
    /// Reset a user's password.
    ResetPassword,
    /// Create a distribution site.
    CreateSite,
    /// Update a distribution site currently managed by `manager`.
    UpdateSite {
        /// Sector manager the site references before the update.
        manager: &'a UserId,
    },
    /// Delete a distribution site.
    DeleteSite,
    /// Read either resource list.
    Read,
}

impl Action<'_> {
    /// Stable action name used in denial messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateUser => "create-user",
            Self::UpdateUser => "update-user",
            Self::DeleteUser => "delete-user",
            Self::ResetPassword => "reset-password",
            Self::CreateSite => "create-site",
            Self::UpdateSite { .. } => "update-site",
            Self::DeleteSite => "delete-site",
            Self::Read => "read",
        }
    }
}

/// Denial outcome of the decision table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDenial {
    /// Role that requested the action.
    pub role: Role,
    /// Name of the denied action.
    pub action: &'static str,
}

impl fmt::Display for PolicyDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "role {} may not perform {}", self.role, self.action)
    }
}

impl std::error::Error for PolicyDenial {}

/// Evaluate the decision table.
#[must_use]
pub fn is_allowed(actor: &Actor, action: &Action<'_>) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::SectorManager => match action {
            Action::Read => true,
            Action::UpdateSite { manager } => **manager == actor.id,
            _ => false,
        },
        Role::User => matches!(action, Action::Read),
    }
}

/// Evaluate the decision table, turning a denial into a typed error.
///
/// # Errors
///
/// [`PolicyDenial`] naming the actor's role and the denied action.
pub fn authorize(actor: &Actor, action: &Action<'_>) -> Result<(), PolicyDenial> {
    if is_allowed(actor, action) {
        Ok(())
    } else {
        Err(PolicyDenial {
            role: actor.role,
            action: action.name(),
        })
    }
}
