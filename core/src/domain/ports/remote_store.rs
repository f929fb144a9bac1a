//! Port abstraction for the remote authoritative store.
//!
//! In hexagonal terms this is a *driven* port: the resource synchronizer
//! calls it to mutate and refetch resources without knowing (or importing)
//! the HTTP transport. Synchronizer tests substitute a mock or fixture store
//! instead of wiring a network.

use async_trait::async_trait;

use crate::domain::site::{Site, SiteId};
use crate::domain::site_draft::SitePayload;
use crate::domain::user::{NewPassword, NewUser, User, UserId, UserUpdate};

use super::define_port_error;

define_port_error! {
    /// Transport and protocol errors raised by remote store adapters.
    pub enum RemoteStoreError {
        /// Connection, DNS, or timeout failure before a response arrived.
        Transport { message: String } =>
            "could not reach the remote store: {message}",
        /// The store rejected the session credentials.
        Unauthenticated =>
            "the remote store rejected the session credentials",
        /// The addressed resource does not exist on the store.
        NotFound { resource: String } =>
            "{resource} was not found on the remote store",
        /// The store reported a concurrent-edit conflict.
        Conflict { message: String } =>
            "the remote store reported a conflict: {message}",
        /// Any other non-2xx response, with the server's message.
        Rejected { status: u16, message: String } =>
            "the remote store rejected the request (status {status}): {message}",
        /// A 2xx response body could not be decoded.
        Decode { message: String } =>
            "the remote store response could not be decoded: {message}",
    }
}

/// Remote authoritative store for users and sites.
///
/// Every method maps to one JSON-over-HTTP endpoint of the store. List
/// methods return the full authoritative list; the synchronizer replaces its
/// cache wholesale with these results, never merging.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the full user list.
    async fn list_users(&self) -> Result<Vec<User>, RemoteStoreError>;

    /// Fetch the users holding the sector-manager role.
    async fn list_sector_managers(&self) -> Result<Vec<User>, RemoteStoreError>;

    /// Create a user account; the store assigns id and timestamps.
    async fn create_user(&self, user: &NewUser) -> Result<User, RemoteStoreError>;

    /// Apply a partial update to an existing user.
    async fn update_user(
        &self,
        id: &UserId,
        update: &UserUpdate,
    ) -> Result<User, RemoteStoreError>;

    /// Delete a user account.
    async fn delete_user(&self, id: &UserId) -> Result<(), RemoteStoreError>;

    /// Replace a user's password through the dedicated reset endpoint.
    async fn reset_password(
        &self,
        id: &UserId,
        password: &NewPassword,
    ) -> Result<(), RemoteStoreError>;

    /// Fetch the full site list.
    async fn list_sites(&self) -> Result<Vec<Site>, RemoteStoreError>;

    /// Fetch a single site by id.
    async fn get_site(&self, id: &SiteId) -> Result<Site, RemoteStoreError>;

    /// Create a site; the store assigns id, status, and timestamps.
    async fn create_site(&self, payload: &SitePayload) -> Result<Site, RemoteStoreError>;

    /// Replace an existing site's payload fields.
    async fn update_site(
        &self,
        id: &SiteId,
        payload: &SitePayload,
    ) -> Result<Site, RemoteStoreError>;

    /// Delete a site.
    async fn delete_site(&self, id: &SiteId) -> Result<(), RemoteStoreError>;
}
