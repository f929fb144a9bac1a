//! End-to-end flows through the public surface: facade, synchronizer, and a
//! fixture in-memory store standing in for the remote authority.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use waterops_core::domain::ports::{RemoteStore, RemoteStoreError};
use waterops_core::domain::{
    Actor, AdminService, CacheStatus, Confirmation, CoreError, EmailAddress, NewPassword,
    NewUser, ReferentialError, ResourceSynchronizer, Role, Session, Site, SiteDraft, SiteId,
    SitePayload, SiteStatus, User, UserId, UserName, UserUpdate,
};

#[derive(Default)]
struct StoreState {
    users: Vec<User>,
    sites: Vec<Site>,
}

/// In-memory stand-in for the remote store, counting every call so tests can
/// assert that locally resolved rejections never reach the network.
#[derive(Default)]
struct InMemoryStore {
    state: Mutex<StoreState>,
    calls: AtomicUsize,
}

impl InMemoryStore {
    fn with_users(users: Vec<User>) -> Self {
        Self {
            state: Mutex::new(StoreState {
                users,
                sites: Vec::new(),
            }),
            calls: AtomicUsize::new(0),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn materialize_site(payload: &SitePayload) -> Site {
        Site::try_new(
            SiteId::random(),
            payload.name.clone(),
            payload.location.clone(),
            payload.reservoir_capacity,
            payload.current_level,
            SiteStatus::Active,
            payload.sector_manager_id,
            Utc::now(),
            Utc::now(),
        )
        .expect("validated payloads always materialise")
    }
}

#[async_trait]
impl RemoteStore for InMemoryStore {
    async fn list_users(&self) -> Result<Vec<User>, RemoteStoreError> {
        self.record_call();
        Ok(self.state().users.clone())
    }

    async fn list_sector_managers(&self) -> Result<Vec<User>, RemoteStoreError> {
        self.record_call();
        Ok(self
            .state()
            .users
            .iter()
            .filter(|user| user.role() == Role::SectorManager)
            .cloned()
            .collect())
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, RemoteStoreError> {
        self.record_call();
        let created = User::new(
            UserId::random(),
            user.name().clone(),
            user.email().clone(),
            user.phone().cloned(),
            user.role(),
        );
        self.state().users.push(created.clone());
        Ok(created)
    }

    async fn update_user(
        &self,
        id: &UserId,
        update: &UserUpdate,
    ) -> Result<User, RemoteStoreError> {
        self.record_call();
        let mut state = self.state();
        let Some(user) = state.users.iter_mut().find(|user| user.id() == id) else {
            return Err(RemoteStoreError::not_found("the user"));
        };
        let replacement = User::new(
            *user.id(),
            update.name.clone().unwrap_or_else(|| user.name().clone()),
            update.email.clone().unwrap_or_else(|| user.email().clone()),
            update.phone.clone().or_else(|| user.phone().cloned()),
            update.role.unwrap_or_else(|| user.role()),
        );
        *user = replacement.clone();
        Ok(replacement)
    }

    async fn delete_user(&self, id: &UserId) -> Result<(), RemoteStoreError> {
        self.record_call();
        let mut state = self.state();
        let before = state.users.len();
        state.users.retain(|user| user.id() != id);
        if state.users.len() == before {
            return Err(RemoteStoreError::not_found("the user"));
        }
        Ok(())
    }

    async fn reset_password(
        &self,
        id: &UserId,
        _password: &NewPassword,
    ) -> Result<(), RemoteStoreError> {
        self.record_call();
        if self.state().users.iter().any(|user| user.id() == id) {
            Ok(())
        } else {
            Err(RemoteStoreError::not_found("the user"))
        }
    }

    async fn list_sites(&self) -> Result<Vec<Site>, RemoteStoreError> {
        self.record_call();
        Ok(self.state().sites.clone())
    }

    async fn get_site(&self, id: &SiteId) -> Result<Site, RemoteStoreError> {
        self.record_call();
        self.state()
            .sites
            .iter()
            .find(|site| site.id() == id)
            .cloned()
            .ok_or_else(|| RemoteStoreError::not_found("the site"))
    }

    async fn create_site(&self, payload: &SitePayload) -> Result<Site, RemoteStoreError> {
        self.record_call();
        let created = Self::materialize_site(payload);
        self.state().sites.push(created.clone());
        Ok(created)
    }

    async fn update_site(
        &self,
        id: &SiteId,
        payload: &SitePayload,
    ) -> Result<Site, RemoteStoreError> {
        self.record_call();
        let mut state = self.state();
        let Some(site) = state.sites.iter_mut().find(|site| site.id() == id) else {
            return Err(RemoteStoreError::not_found("the site"));
        };
        let replacement = Site::try_new(
            *site.id(),
            payload.name.clone(),
            payload.location.clone(),
            payload.reservoir_capacity,
            payload.current_level,
            site.status(),
            payload.sector_manager_id,
            site.created_at(),
            Utc::now(),
        )
        .map_err(|error| RemoteStoreError::rejected(422u16, error.to_string()))?;
        *site = replacement.clone();
        Ok(replacement)
    }

    async fn delete_site(&self, id: &SiteId) -> Result<(), RemoteStoreError> {
        self.record_call();
        let mut state = self.state();
        let before = state.sites.len();
        state.sites.retain(|site| site.id() != id);
        if state.sites.len() == before {
            return Err(RemoteStoreError::not_found("the site"));
        }
        Ok(())
    }
}

fn sector_manager() -> User {
    User::new(
        UserId::random(),
        UserName::new("Grace Hopper").expect("valid name"),
        EmailAddress::new("grace@waterworks.example").expect("valid email"),
        None,
        Role::SectorManager,
    )
}

fn admin_actor() -> Actor {
    Actor::new(UserId::random(), Role::Admin)
}

fn draft_for(manager: &UserId) -> SiteDraft {
    SiteDraft {
        name: Some("North Reservoir".into()),
        address: Some("1 Pump Lane".into()),
        latitude: Some("51.5".into()),
        longitude: Some("-0.12".into()),
        reservoir_capacity: Some("1000".into()),
        current_level: Some("400".into()),
        sector_manager_id: Some(manager.to_string()),
    }
}

#[tokio::test]
async fn created_sites_appear_in_the_next_read_with_server_assigned_fields() {
    let manager = sector_manager();
    let manager_id = *manager.id();
    let store = Arc::new(InMemoryStore::with_users(vec![manager]));
    let service = AdminService::new(Arc::clone(&store), Arc::new(Session::new()));
    service.load().await.expect("initial load succeeds");

    let applied = service
        .create_site(&admin_actor(), &draft_for(&manager_id))
        .await
        .expect("create succeeds");
    assert_eq!(applied.cache, CacheStatus::Fresh);

    let sites = service.sites();
    assert_eq!(sites.len(), 1);
    let listed = sites.first().expect("one site cached");
    assert_eq!(listed.id(), applied.value.id(), "server-assigned id round-trips");
    assert_eq!(listed.created_at(), applied.value.created_at());
    assert_eq!(
        service.synchronizer().managed_site_ids(&manager_id),
        vec![*listed.id()],
    );
}

#[tokio::test]
async fn policy_denials_issue_no_network_calls() {
    let store = Arc::new(InMemoryStore::default());
    let service = AdminService::new(Arc::clone(&store), Arc::new(Session::new()));

    let actor = Actor::new(UserId::random(), Role::SectorManager);
    let err = service
        .delete_site(&actor, &SiteId::random(), Confirmation::confirmed())
        .await
        .expect_err("policy must deny");
    assert!(matches!(err, CoreError::Forbidden(_)));
    assert_eq!(store.calls(), 0, "denial must never reach the store");
}

#[tokio::test]
async fn blocked_manager_deletion_leaves_both_lists_unchanged() {
    let manager = sector_manager();
    let manager_id = *manager.id();
    let store = Arc::new(InMemoryStore::with_users(vec![manager]));
    let service = AdminService::new(Arc::clone(&store), Arc::new(Session::new()));
    service.load().await.expect("initial load succeeds");
    service
        .create_site(&admin_actor(), &draft_for(&manager_id))
        .await
        .expect("create succeeds");

    let users_before = service.users();
    let err = service
        .delete_user(&admin_actor(), &manager_id, None, Confirmation::confirmed())
        .await
        .expect_err("deletion must block");
    assert!(matches!(
        err,
        CoreError::Referential(ReferentialError::ManagerInUse { .. }),
    ));
    assert_eq!(service.users(), users_before, "user list is unchanged");
    assert_eq!(service.sites().len(), 1, "site list is unchanged");
}

#[tokio::test]
async fn reassignment_unblocks_manager_deletion() {
    let outgoing = sector_manager();
    let replacement = sector_manager();
    let outgoing_id = *outgoing.id();
    let replacement_id = *replacement.id();
    let store = Arc::new(InMemoryStore::with_users(vec![outgoing, replacement]));
    let service = AdminService::new(Arc::clone(&store), Arc::new(Session::new()));
    service.load().await.expect("initial load succeeds");
    service
        .create_site(&admin_actor(), &draft_for(&outgoing_id))
        .await
        .expect("create succeeds");

    service
        .delete_user(
            &admin_actor(),
            &outgoing_id,
            Some(&replacement_id),
            Confirmation::confirmed(),
        )
        .await
        .expect("reassignment path succeeds");

    assert!(service.users().iter().all(|user| user.id() != &outgoing_id));
    let sites = service.sites();
    assert_eq!(sites.len(), 1);
    assert_eq!(
        sites.first().expect("one site").sector_manager_id(),
        &replacement_id,
        "the site now references the replacement manager",
    );
}

/// Store wrapper that parks `update_site` until the test releases it,
/// exposing the in-flight window to the second caller.
struct GatedStore {
    inner: InMemoryStore,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl RemoteStore for GatedStore {
    async fn list_users(&self) -> Result<Vec<User>, RemoteStoreError> {
        self.inner.list_users().await
    }

    async fn list_sector_managers(&self) -> Result<Vec<User>, RemoteStoreError> {
        self.inner.list_sector_managers().await
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, RemoteStoreError> {
        self.inner.create_user(user).await
    }

    async fn update_user(
        &self,
        id: &UserId,
        update: &UserUpdate,
    ) -> Result<User, RemoteStoreError> {
        self.inner.update_user(id, update).await
    }

    async fn delete_user(&self, id: &UserId) -> Result<(), RemoteStoreError> {
        self.inner.delete_user(id).await
    }

    async fn reset_password(
        &self,
        id: &UserId,
        password: &NewPassword,
    ) -> Result<(), RemoteStoreError> {
        self.inner.reset_password(id, password).await
    }

    async fn list_sites(&self) -> Result<Vec<Site>, RemoteStoreError> {
        self.inner.list_sites().await
    }

    async fn get_site(&self, id: &SiteId) -> Result<Site, RemoteStoreError> {
        self.inner.get_site(id).await
    }

    async fn create_site(&self, payload: &SitePayload) -> Result<Site, RemoteStoreError> {
        self.inner.create_site(payload).await
    }

    async fn update_site(
        &self,
        id: &SiteId,
        payload: &SitePayload,
    ) -> Result<Site, RemoteStoreError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.update_site(id, payload).await
    }

    async fn delete_site(&self, id: &SiteId) -> Result<(), RemoteStoreError> {
        self.inner.delete_site(id).await
    }
}

#[tokio::test]
async fn a_second_update_for_an_in_flight_site_is_rejected_locally() {
    let manager = sector_manager();
    let manager_id = *manager.id();
    let store = Arc::new(GatedStore {
        inner: InMemoryStore::with_users(vec![manager]),
        entered: Notify::new(),
        release: Notify::new(),
    });

    let sync = Arc::new(ResourceSynchronizer::new(Arc::clone(&store)));
    sync.refresh_users().await.expect("user load succeeds");

    let payload = draft_for(&manager_id).validate().expect("draft is valid");
    let created = sync
        .create_site(&payload)
        .await
        .expect("create succeeds")
        .value;
    let site_id = *created.id();

    let first = {
        let sync = Arc::clone(&sync);
        let payload = payload.clone();
        tokio::spawn(async move { sync.update_site(&site_id, &payload).await })
    };
    // Wait until the first mutation is parked inside the store call.
    store.entered.notified().await;

    let err = sync
        .update_site(&site_id, &payload)
        .await
        .expect_err("second update must be rejected while the first is pending");
    assert!(matches!(err, CoreError::OperationInProgress { .. }));

    store.release.notify_one();
    let outcome = first.await.expect("task joins").expect("first update applies");
    assert_eq!(outcome.cache, CacheStatus::Fresh);
    assert_eq!(outcome.value.id(), &site_id);

    // The slot frees once the first mutation settles.
    sync.update_site(&site_id, &payload)
        .await
        .expect("a later update succeeds");
}
