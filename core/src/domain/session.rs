//! Session carrier: process-wide holder of the current bearer credential.
//!
//! The token is set at login and cleared at logout; the outbound adapter
//! reads it for every request. The carrier is stateless beyond the token
//! itself and never decides whether a request is authorized — an absent
//! token simply lets the request go out unauthenticated, and the remote
//! store's rejection surfaces as `Unauthenticated`.

use std::sync::{Mutex, PoisonError};

use zeroize::Zeroizing;

/// Bearer-credential holder shared between the UI collaborator and the
/// outbound adapter.
///
/// The token buffer is zeroized when replaced or dropped.
///
/// # Examples
/// ```
/// use waterops_core::domain::Session;
///
/// let session = Session::new();
/// assert!(session.bearer().is_none());
/// session.login("token-123");
/// assert_eq!(session.bearer().as_deref(), Some("token-123"));
/// session.logout();
/// assert!(session.bearer().is_none());
/// ```
#[derive(Debug, Default)]
pub struct Session {
    token: Mutex<Option<Zeroizing<String>>>,
}

impl Session {
    /// Create a carrier with no credential.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the bearer token issued at login.
    pub fn login(&self, token: impl Into<String>) {
        let mut guard = self.lock();
        *guard = Some(Zeroizing::new(token.into()));
    }

    /// Clear the credential at logout.
    pub fn logout(&self) {
        let mut guard = self.lock();
        *guard = None;
    }

    /// Current bearer token, if a session is active.
    #[must_use]
    pub fn bearer(&self) -> Option<String> {
        self.lock().as_ref().map(|token| token.as_str().to_owned())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Zeroizing<String>>> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
