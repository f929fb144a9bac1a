//! Domain primitives, validators, and services.
//!
//! Purpose: Define the strongly typed entities shared by the validators, the
//! authorization policy, and the resource synchronizer. Keep types immutable
//! and document invariants and serialisation contracts (serde) in each type's
//! Rustdoc.
//!
//! Public surface:
//! - [`User`] / [`Site`] — validated domain entities mirroring the remote
//!   store's resources.
//! - [`SiteDraft`] — untyped form payload; [`SiteDraft::validate`] is the only
//!   path by which form data reaches business logic.
//! - [`Actor`] / [`Action`] — inputs to the authorization decision table.
//! - [`ResourceSynchronizer`] — cache owner implementing the
//!   mutate-then-reconcile protocol.
//! - [`AdminService`] — facade composing validators, policy, and synchronizer
//!   for UI collaborators.

pub mod admin;
pub mod error;
pub mod policy;
pub mod ports;
pub mod referential;
pub mod session;
pub mod site;
pub mod site_draft;
pub mod sync;
pub mod user;

pub use self::admin::{AdminService, Confirmation};
pub use self::error::CoreError;
pub use self::policy::{Action, Actor, PolicyDenial, authorize};
pub use self::referential::{
    ReferentialError, ensure_assignable_manager, ensure_deletable_user, managed_sites,
};
pub use self::session::Session;
pub use self::site::{
    Location, Site, SiteField, SiteId, SiteStatus, SiteValidationError,
};
pub use self::site_draft::{SiteDraft, SitePayload};
pub use self::sync::{Applied, CacheStatus, ResourceSynchronizer};
pub use self::user::{
    EmailAddress, NewPassword, NewUser, PhoneNumber, Role, User, UserId, UserName, UserUpdate,
    UserValidationError,
};

/// Convenient result alias for core operations.
///
/// # Examples
/// ```
/// use waterops_core::domain::{CoreError, CoreResult};
///
/// fn denied() -> CoreResult<()> {
///     Err(CoreError::Unauthenticated)
/// }
/// assert!(denied().is_err());
/// ```
pub type CoreResult<T> = Result<T, CoreError>;
