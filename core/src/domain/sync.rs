//! Resource synchronizer: mutate-then-reconcile against the remote store.
//!
//! The synchronizer owns the only shared mutable state in the core, the
//! local user and site caches. It enforces three disciplines:
//!
//! - **Replace, never merge.** After a successful mutation the full resource
//!   list is refetched and swapped in atomically; readers never observe a
//!   partially updated list.
//! - **Newest refetch wins.** Each refetch carries a monotonically
//!   increasing sequence number; a slow response that completes after a
//!   newer one is discarded instead of overwriting fresher data.
//! - **One mutation per id.** A second mutation for a resource id whose
//!   first mutation is still in flight is rejected locally with
//!   [`CoreError::OperationInProgress`] rather than racing the server.
//!
//! Locks are held only for cache bookkeeping, never across an await point.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::domain::CoreResult;
use crate::domain::error::CoreError;
use crate::domain::ports::{RemoteStore, RemoteStoreError};
use crate::domain::site::{Site, SiteId};
use crate::domain::site_draft::SitePayload;
use crate::domain::user::{NewPassword, NewUser, User, UserId, UserUpdate};

/// Freshness of the local cache after an otherwise successful mutation.
///
/// [`CacheStatus::Stale`] means the mutation stands on the server but the
/// follow-up refetch failed: the local view may be out of date and the UI
/// collaborator must say so rather than present old data as current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// The cache reflects a refetch at least as new as the mutation.
    Fresh,
    /// The mutation succeeded but the reconciling refetch did not.
    Stale,
}

/// Successful mutation outcome: the server's result plus cache freshness.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct Applied<T> {
    /// Value returned by the remote store for the mutation.
    pub value: T,
    /// Whether the local cache caught up with the mutation.
    pub cache: CacheStatus,
}

#[derive(Debug, Default)]
struct CacheState {
    users: Vec<User>,
    users_seq: u64,
    users_applied_seq: u64,
    sites: Vec<Site>,
    sites_seq: u64,
    sites_applied_seq: u64,
    in_flight: HashSet<String>,
}

/// Releases the per-id mutation slot when the mutation settles.
#[derive(Debug)]
struct InFlightGuard<'a> {
    state: &'a Mutex<CacheState>,
    key: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.in_flight.remove(&self.key);
    }
}

/// Owner of the local resource caches and the mutate-then-reconcile protocol.
pub struct ResourceSynchronizer<S> {
    store: Arc<S>,
    state: Mutex<CacheState>,
}

impl<S> ResourceSynchronizer<S> {
    /// Create a synchronizer with empty caches over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            state: Mutex::new(CacheState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the cached user list.
    #[must_use]
    pub fn users(&self) -> Vec<User> {
        self.state().users.clone()
    }

    /// Snapshot of the cached site list.
    #[must_use]
    pub fn sites(&self) -> Vec<Site> {
        self.state().sites.clone()
    }

    /// Cached user by id, if present.
    #[must_use]
    pub fn user(&self, id: &UserId) -> Option<User> {
        self.state().users.iter().find(|user| user.id() == id).cloned()
    }

    /// Cached site by id, if present.
    #[must_use]
    pub fn site(&self, id: &SiteId) -> Option<Site> {
        self.state().sites.iter().find(|site| site.id() == id).cloned()
    }

    /// Derived back-reference set: ids of sites managed by the given user.
    #[must_use]
    pub fn managed_site_ids(&self, manager: &UserId) -> Vec<SiteId> {
        self.state()
            .sites
            .iter()
            .filter(|site| site.sector_manager_id() == manager)
            .map(|site| *site.id())
            .collect()
    }

    fn begin_mutation(&self, kind: &str, id: &str) -> CoreResult<InFlightGuard<'_>> {
        let key = format!("{kind}/{id}");
        let mut state = self.state();
        if !state.in_flight.insert(key.clone()) {
            return Err(CoreError::OperationInProgress { id: id.to_owned() });
        }
        drop(state);
        Ok(InFlightGuard {
            state: &self.state,
            key,
        })
    }

    fn next_users_seq(&self) -> u64 {
        let mut state = self.state();
        state.users_seq += 1;
        state.users_seq
    }

    fn next_sites_seq(&self) -> u64 {
        let mut state = self.state();
        state.sites_seq += 1;
        state.sites_seq
    }

    /// Install a user refetch result unless a newer one already landed.
    fn apply_users_refetch(&self, seq: u64, users: Vec<User>) -> bool {
        let mut state = self.state();
        if seq <= state.users_applied_seq {
            debug!(seq, applied = state.users_applied_seq, "discarding stale user refetch");
            return false;
        }
        state.users_applied_seq = seq;
        state.users = users;
        true
    }

    /// Install a site refetch result unless a newer one already landed.
    fn apply_sites_refetch(&self, seq: u64, sites: Vec<Site>) -> bool {
        let mut state = self.state();
        if seq <= state.sites_applied_seq {
            debug!(seq, applied = state.sites_applied_seq, "discarding stale site refetch");
            return false;
        }
        state.sites_applied_seq = seq;
        state.sites = sites;
        true
    }
}

impl<S: RemoteStore> ResourceSynchronizer<S> {
    /// Refetch the user list, replacing the cache unless superseded.
    ///
    /// # Errors
    ///
    /// Transport and remote failures mapped into [`CoreError`]; the cache is
    /// left untouched on failure.
    pub async fn refresh_users(&self) -> CoreResult<()> {
        let seq = self.next_users_seq();
        let users = self.store.list_users().await?;
        self.apply_users_refetch(seq, users);
        Ok(())
    }

    /// Refetch the site list, replacing the cache unless superseded.
    ///
    /// # Errors
    ///
    /// Transport and remote failures mapped into [`CoreError`]; the cache is
    /// left untouched on failure.
    pub async fn refresh_sites(&self) -> CoreResult<()> {
        let seq = self.next_sites_seq();
        let sites = self.store.list_sites().await?;
        self.apply_sites_refetch(seq, sites);
        Ok(())
    }

    async fn reconcile_users(&self) -> CacheStatus {
        match self.refresh_users().await {
            Ok(()) => CacheStatus::Fresh,
            Err(error) => {
                warn!(%error, "user refetch failed after a successful mutation; cache is stale");
                CacheStatus::Stale
            }
        }
    }

    async fn reconcile_sites(&self) -> CacheStatus {
        match self.refresh_sites().await {
            Ok(()) => CacheStatus::Fresh,
            Err(error) => {
                warn!(%error, "site refetch failed after a successful mutation; cache is stale");
                CacheStatus::Stale
            }
        }
    }

    /// Create a user, then reconcile the user cache.
    ///
    /// # Errors
    ///
    /// Mutation failures leave the cache untouched and surface as
    /// [`CoreError`].
    pub async fn create_user(&self, user: &NewUser) -> CoreResult<Applied<User>> {
        let created = self.store.create_user(user).await?;
        debug!(id = %created.id(), "user created");
        let cache = self.reconcile_users().await;
        Ok(Applied {
            value: created,
            cache,
        })
    }

    /// Update a user, guarded per id, then reconcile the user cache.
    ///
    /// # Errors
    ///
    /// [`CoreError::OperationInProgress`] when another mutation for the same
    /// user is pending; otherwise mutation failures leave the cache
    /// untouched.
    pub async fn update_user(
        &self,
        id: &UserId,
        update: &UserUpdate,
    ) -> CoreResult<Applied<User>> {
        let guard = self.begin_mutation("user", &id.to_string())?;
        let result = self.store.update_user(id, update).await;
        drop(guard);
        let updated = result?;
        let cache = self.reconcile_users().await;
        Ok(Applied {
            value: updated,
            cache,
        })
    }

    /// Delete a user, guarded per id, then reconcile the user cache.
    ///
    /// Deleting an id the store no longer knows surfaces
    /// [`CoreError::NotFound`] but still refetches so the cache converges on
    /// the authoritative list.
    ///
    /// # Errors
    ///
    /// [`CoreError::OperationInProgress`], [`CoreError::NotFound`], or any
    /// mapped store failure.
    pub async fn delete_user(&self, id: &UserId) -> CoreResult<Applied<()>> {
        let guard = self.begin_mutation("user", &id.to_string())?;
        let result = self.store.delete_user(id).await;
        drop(guard);
        match result {
            Ok(()) => {
                let cache = self.reconcile_users().await;
                Ok(Applied { value: (), cache })
            }
            Err(RemoteStoreError::NotFound { resource }) => {
                let _ = self.reconcile_users().await;
                Err(CoreError::NotFound { resource })
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Reset a user's password, guarded per id. No cache reconciliation is
    /// needed: the password never lives in the cache.
    ///
    /// # Errors
    ///
    /// [`CoreError::OperationInProgress`] or any mapped store failure.
    pub async fn reset_password(
        &self,
        id: &UserId,
        password: &NewPassword,
    ) -> CoreResult<()> {
        let guard = self.begin_mutation("user", &id.to_string())?;
        let result = self.store.reset_password(id, password).await;
        drop(guard);
        Ok(result?)
    }

    /// Create a site, then reconcile the site cache.
    ///
    /// # Errors
    ///
    /// Mutation failures leave the cache untouched and surface as
    /// [`CoreError`].
    pub async fn create_site(&self, payload: &SitePayload) -> CoreResult<Applied<Site>> {
        let created = self.store.create_site(payload).await?;
        debug!(id = %created.id(), "site created");
        let cache = self.reconcile_sites().await;
        Ok(Applied {
            value: created,
            cache,
        })
    }

    /// Update a site, guarded per id, then reconcile the site cache.
    ///
    /// # Errors
    ///
    /// [`CoreError::OperationInProgress`] when another mutation for the same
    /// site is pending; otherwise mutation failures leave the cache
    /// untouched.
    pub async fn update_site(
        &self,
        id: &SiteId,
        payload: &SitePayload,
    ) -> CoreResult<Applied<Site>> {
        let guard = self.begin_mutation("site", &id.to_string())?;
        let result = self.store.update_site(id, payload).await;
        drop(guard);
        let updated = result?;
        let cache = self.reconcile_sites().await;
        Ok(Applied {
            value: updated,
            cache,
        })
    }

    /// Delete a site, guarded per id, then reconcile the site cache.
    ///
    /// Deleting an id the store no longer knows surfaces
    /// [`CoreError::NotFound`] but still refetches so the cache converges on
    /// the authoritative list.
    ///
    /// # Errors
    ///
    /// [`CoreError::OperationInProgress`], [`CoreError::NotFound`], or any
    /// mapped store failure.
    pub async fn delete_site(&self, id: &SiteId) -> CoreResult<Applied<()>> {
        let guard = self.begin_mutation("site", &id.to_string())?;
        let result = self.store.delete_site(id).await;
        drop(guard);
        match result {
            Ok(()) => {
                let cache = self.reconcile_sites().await;
                Ok(Applied { value: (), cache })
            }
            Err(RemoteStoreError::NotFound { resource }) => {
                let _ = self.reconcile_sites().await;
                Err(CoreError::NotFound { resource })
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Fetch a single site straight from the store, bypassing the cache.
    ///
    /// # Errors
    ///
    /// Any mapped store failure, including [`CoreError::NotFound`].
    pub async fn fetch_site(&self, id: &SiteId) -> CoreResult<Site> {
        Ok(self.store.get_site(id).await?)
    }

    /// Fetch the sector-manager list straight from the store. Used to fill
    /// assignment choices; the result is not cached.
    ///
    /// # Errors
    ///
    /// Any mapped store failure.
    pub async fn fetch_sector_managers(&self) -> CoreResult<Vec<User>> {
        Ok(self.store.list_sector_managers().await?)
    }
}

#[cfg(test)]
mod tests {
    //! Cache-discipline coverage: replace-on-success, sequence guard,
    //! in-flight guard, and reconciliation after failure.
    use super::*;
    use crate::domain::ports::MockRemoteStore;
    use crate::domain::site::{Location, SiteStatus};
    use crate::domain::user::{EmailAddress, Role, UserName};
    use chrono::Utc;

    fn site(manager: UserId) -> Site {
        Site::try_new(
            SiteId::random(),
            "North Reservoir",
            Location::try_new("1 Pump Lane", 51.5, -0.12).expect("valid location"),
            1000.0,
            400.0,
            SiteStatus::Active,
            manager,
            Utc::now(),
            Utc::now(),
        )
        .expect("valid site")
    }

    fn user(role: Role) -> User {
        User::new(
            UserId::random(),
            UserName::new("Grace Hopper").expect("valid name"),
            EmailAddress::new("grace@waterworks.example").expect("valid email"),
            None,
            role,
        )
    }

    fn payload(manager: UserId) -> SitePayload {
        SitePayload {
            name: "North Reservoir".into(),
            location: Location::try_new("1 Pump Lane", 51.5, -0.12).expect("valid location"),
            reservoir_capacity: 1000.0,
            current_level: 400.0,
            sector_manager_id: manager,
        }
    }

    #[tokio::test]
    async fn successful_create_replaces_the_site_cache() {
        let manager = UserId::random();
        let created = site(manager);
        let refetched = vec![created.clone(), site(manager)];

        let mut store = MockRemoteStore::new();
        let created_clone = created.clone();
        store
            .expect_create_site()
            .times(1)
            .return_once(move |_| Ok(created_clone));
        let refetched_clone = refetched.clone();
        store
            .expect_list_sites()
            .times(1)
            .return_once(move || Ok(refetched_clone));

        let sync = ResourceSynchronizer::new(Arc::new(store));
        let applied = sync.create_site(&payload(manager)).await.expect("create succeeds");

        assert_eq!(applied.cache, CacheStatus::Fresh);
        assert_eq!(applied.value, created);
        assert_eq!(sync.sites(), refetched, "cache is replaced wholesale");
    }

    #[tokio::test]
    async fn failed_mutation_leaves_the_cache_untouched() {
        let manager = UserId::random();
        let mut store = MockRemoteStore::new();
        store
            .expect_create_site()
            .times(1)
            .return_once(|_| Err(RemoteStoreError::rejected(422u16, "capacity rejected")));
        store.expect_list_sites().times(0);

        let sync = ResourceSynchronizer::new(Arc::new(store));
        let err = sync
            .create_site(&payload(manager))
            .await
            .expect_err("create must fail");
        assert!(matches!(err, CoreError::Rejected { status: 422, .. }));
        assert!(sync.sites().is_empty(), "no refetch, no cache change");
    }

    #[tokio::test]
    async fn refetch_failure_after_mutation_reports_a_stale_cache() {
        let manager = UserId::random();
        let created = site(manager);
        let mut store = MockRemoteStore::new();
        let created_clone = created.clone();
        store
            .expect_create_site()
            .times(1)
            .return_once(move |_| Ok(created_clone));
        store
            .expect_list_sites()
            .times(1)
            .return_once(|| Err(RemoteStoreError::transport("connection reset")));

        let sync = ResourceSynchronizer::new(Arc::new(store));
        let applied = sync.create_site(&payload(manager)).await.expect("mutation stands");
        assert_eq!(applied.cache, CacheStatus::Stale);
    }

    #[tokio::test]
    async fn deleting_a_missing_site_surfaces_not_found_and_still_reconciles() {
        let remaining = vec![site(UserId::random())];
        let mut store = MockRemoteStore::new();
        store
            .expect_delete_site()
            .times(1)
            .return_once(|_| Err(RemoteStoreError::not_found("site")));
        let remaining_clone = remaining.clone();
        store
            .expect_list_sites()
            .times(1)
            .return_once(move || Ok(remaining_clone));

        let sync = ResourceSynchronizer::new(Arc::new(store));
        let err = sync
            .delete_site(&SiteId::random())
            .await
            .expect_err("delete must report not found");
        assert!(matches!(err, CoreError::NotFound { .. }));
        assert_eq!(sync.sites(), remaining, "cache reconciled regardless");
    }

    #[tokio::test]
    async fn deleting_a_user_reconciles_the_user_cache() {
        let survivors = vec![user(Role::Admin)];
        let mut store = MockRemoteStore::new();
        store.expect_delete_user().times(1).return_once(|_| Ok(()));
        let survivors_clone = survivors.clone();
        store
            .expect_list_users()
            .times(1)
            .return_once(move || Ok(survivors_clone));

        let sync = ResourceSynchronizer::new(Arc::new(store));
        let applied = sync
            .delete_user(&UserId::random())
            .await
            .expect("delete succeeds");
        assert_eq!(applied.cache, CacheStatus::Fresh);
        assert_eq!(sync.users(), survivors);
    }

    #[test]
    fn stale_refetch_results_are_discarded() {
        let sync = ResourceSynchronizer::new(Arc::new(MockRemoteStore::new()));
        let older = sync.next_sites_seq();
        let newer = sync.next_sites_seq();

        let latest = vec![site(UserId::random())];
        assert!(sync.apply_sites_refetch(newer, latest.clone()));
        assert!(
            !sync.apply_sites_refetch(older, vec![site(UserId::random())]),
            "a response with a lower sequence number must be dropped",
        );
        assert_eq!(sync.sites(), latest, "newer data survives the late arrival");
    }

    #[test]
    fn in_flight_guard_rejects_a_second_mutation_for_the_same_id() {
        let sync = ResourceSynchronizer::new(Arc::new(MockRemoteStore::new()));
        let id = SiteId::random().to_string();

        let guard = sync.begin_mutation("site", &id).expect("first slot is free");
        let err = sync
            .begin_mutation("site", &id)
            .expect_err("second mutation must be rejected");
        assert!(matches!(err, CoreError::OperationInProgress { .. }));

        // A different id is never blocked.
        let other = SiteId::random().to_string();
        let other_guard = sync.begin_mutation("site", &other).expect("distinct id is free");
        drop(other_guard);

        drop(guard);
        let reclaimed = sync.begin_mutation("site", &id);
        assert!(reclaimed.is_ok(), "the slot frees once the first settles");
    }

    #[tokio::test]
    async fn managed_site_ids_derive_from_the_cache() {
        let manager = UserId::random();
        let mine = site(manager);
        let theirs = site(UserId::random());
        let listed = vec![mine.clone(), theirs];

        let mut store = MockRemoteStore::new();
        store
            .expect_list_sites()
            .times(1)
            .return_once(move || Ok(listed));

        let sync = ResourceSynchronizer::new(Arc::new(store));
        sync.refresh_sites().await.expect("refetch succeeds");
        assert_eq!(sync.managed_site_ids(&manager), vec![*mine.id()]);
    }
}
