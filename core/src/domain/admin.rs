//! Administration facade exposed to UI collaborators.
//!
//! Each operation walks the same gauntlet: geo/numeric validation, then the
//! referential validator against the locally known user and site sets, then
//! the authorization policy, and only then the resource synchronizer. A
//! rejection at any step resolves locally; the remote store is never
//! consulted for a payload the core would not accept.
//!
//! Destructive operations take a [`Confirmation`] token: the decision that a
//! destructive action is confirmed belongs to the UI collaborator, and the
//! core accepts only already-confirmed requests.

use std::sync::Arc;

use tracing::debug;

use crate::domain::CoreResult;
use crate::domain::error::CoreError;
use crate::domain::policy::{Action, Actor, authorize};
use crate::domain::ports::RemoteStore;
use crate::domain::referential::{
    ensure_assignable_manager, ensure_deletable_user, managed_sites,
};
use crate::domain::session::Session;
use crate::domain::site::{Site, SiteId};
use crate::domain::site_draft::{SiteDraft, SitePayload};
use crate::domain::sync::{Applied, ResourceSynchronizer};
use crate::domain::user::{NewPassword, NewUser, User, UserId, UserUpdate};

/// Evidence that the UI collaborator completed its confirmation step.
///
/// The core cannot ask the operator anything; it only refuses to perform a
/// destructive action without this token in the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation(());

impl Confirmation {
    /// Assert that the destructive action was confirmed by the operator.
    #[must_use]
    pub const fn confirmed() -> Self {
        Self(())
    }
}

/// Facade composing validators, policy, session, and synchronizer.
pub struct AdminService<S> {
    session: Arc<Session>,
    sync: ResourceSynchronizer<S>,
}

impl<S> AdminService<S> {
    /// Build the facade over a remote store adapter and a session carrier.
    pub fn new(store: Arc<S>, session: Arc<Session>) -> Self {
        Self {
            session,
            sync: ResourceSynchronizer::new(store),
        }
    }

    /// Session carrier shared with the outbound adapter.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Underlying synchronizer, for read accessors and refreshes.
    #[must_use]
    pub const fn synchronizer(&self) -> &ResourceSynchronizer<S> {
        &self.sync
    }

    /// Snapshot of the cached user list.
    #[must_use]
    pub fn users(&self) -> Vec<User> {
        self.sync.users()
    }

    /// Snapshot of the cached site list.
    #[must_use]
    pub fn sites(&self) -> Vec<Site> {
        self.sync.sites()
    }
}

impl<S: RemoteStore> AdminService<S> {
    /// Load both resource lists, replacing the caches.
    ///
    /// # Errors
    ///
    /// The first [`CoreError`] raised by either refetch.
    pub async fn load(&self) -> CoreResult<()> {
        self.sync.refresh_users().await?;
        self.sync.refresh_sites().await
    }

    /// Create a user account.
    ///
    /// # Errors
    ///
    /// [`CoreError::Forbidden`] unless the actor is an administrator, then
    /// any synchronizer failure.
    pub async fn create_user(
        &self,
        actor: &Actor,
        user: &NewUser,
    ) -> CoreResult<Applied<User>> {
        authorize(actor, &Action::CreateUser)?;
        self.sync.create_user(user).await
    }

    /// Update a user account, including role changes.
    ///
    /// # Errors
    ///
    /// [`CoreError::Forbidden`] unless the actor is an administrator, then
    /// any synchronizer failure.
    pub async fn update_user(
        &self,
        actor: &Actor,
        id: &UserId,
        update: &UserUpdate,
    ) -> CoreResult<Applied<User>> {
        authorize(actor, &Action::UpdateUser)?;
        self.sync.update_user(id, update).await
    }

    /// Delete a user account, blocking while sites still reference it.
    ///
    /// When `reassign_to` is supplied, every site the user manages is first
    /// rewired to the replacement manager (who must pass the referential
    /// validator), then the deletion is issued. Deletion never cascades.
    ///
    /// # Errors
    ///
    /// [`CoreError::Forbidden`] for non-administrators,
    /// [`ManagerInUse`](crate::domain::referential::ReferentialError::ManagerInUse)
    /// when sites still reference the
    /// user and no reassignment was supplied, plus any synchronizer failure.
    pub async fn delete_user(
        &self,
        actor: &Actor,
        id: &UserId,
        reassign_to: Option<&UserId>,
        _confirmed: Confirmation,
    ) -> CoreResult<Applied<()>> {
        authorize(actor, &Action::DeleteUser)?;

        let sites = self.sync.sites();
        ensure_deletable_user(id, &sites, reassign_to)?;
        let managed: Vec<Site> = managed_sites(id, &sites).into_iter().cloned().collect();
        if let Some(target) = reassign_to.filter(|_| !managed.is_empty()) {
            ensure_assignable_manager(target, &self.sync.users())?;
            debug!(from = %id, to = %target, sites = managed.len(), "reassigning managed sites");
            for site in &managed {
                let payload = SitePayload::reassigning(site, *target);
                self.sync.update_site(site.id(), &payload).await?;
            }
        }

        self.sync.delete_user(id).await
    }

    /// Reset a user's password through the dedicated operation.
    ///
    /// # Errors
    ///
    /// [`CoreError::Forbidden`] unless the actor is an administrator, then
    /// any synchronizer failure.
    pub async fn reset_password(
        &self,
        actor: &Actor,
        id: &UserId,
        password: &NewPassword,
    ) -> CoreResult<()> {
        authorize(actor, &Action::ResetPassword)?;
        self.sync.reset_password(id, password).await
    }

    /// Validate and create a site from an untyped form payload.
    ///
    /// # Errors
    ///
    /// The first failing validation rule, a referential failure for the
    /// assigned manager, [`CoreError::Forbidden`] from the policy, then any
    /// synchronizer failure.
    pub async fn create_site(
        &self,
        actor: &Actor,
        draft: &SiteDraft,
    ) -> CoreResult<Applied<Site>> {
        let payload = draft.validate()?;
        ensure_assignable_manager(&payload.sector_manager_id, &self.sync.users())?;
        authorize(actor, &Action::CreateSite)?;
        self.sync.create_site(&payload).await
    }

    /// Validate and update a site from an untyped form payload.
    ///
    /// Sector managers may update only sites that reference them as manager
    /// before the edit; the check uses the cached, authoritative copy.
    ///
    /// # Errors
    ///
    /// Validation, referential, and policy failures as for
    /// [`AdminService::create_site`]; [`CoreError::NotFound`] when the site
    /// is not in the cache.
    pub async fn update_site(
        &self,
        actor: &Actor,
        id: &SiteId,
        draft: &SiteDraft,
    ) -> CoreResult<Applied<Site>> {
        let payload = draft.validate()?;
        ensure_assignable_manager(&payload.sector_manager_id, &self.sync.users())?;
        let current = self.sync.site(id).ok_or_else(|| CoreError::NotFound {
            resource: format!("site {id}"),
        })?;
        authorize(
            actor,
            &Action::UpdateSite {
                manager: current.sector_manager_id(),
            },
        )?;
        self.sync.update_site(id, &payload).await
    }

    /// Delete a site after operator confirmation.
    ///
    /// # Errors
    ///
    /// [`CoreError::Forbidden`] unless the actor is an administrator, then
    /// any synchronizer failure including [`CoreError::NotFound`].
    pub async fn delete_site(
        &self,
        actor: &Actor,
        id: &SiteId,
        _confirmed: Confirmation,
    ) -> CoreResult<Applied<()>> {
        authorize(actor, &Action::DeleteSite)?;
        self.sync.delete_site(id).await
    }

    /// Fetch the assignable sector-manager list from the store.
    ///
    /// # Errors
    ///
    /// Any mapped store failure.
    pub async fn sector_managers(&self) -> CoreResult<Vec<User>> {
        self.sync.fetch_sector_managers().await
    }

    /// Fetch a single site straight from the store.
    ///
    /// # Errors
    ///
    /// Any mapped store failure, including [`CoreError::NotFound`].
    pub async fn site_detail(&self, id: &SiteId) -> CoreResult<Site> {
        self.sync.fetch_site(id).await
    }
}
