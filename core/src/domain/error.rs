//! Core error taxonomy.
//!
//! Validation, referential, and authorization failures are resolved locally
//! and never reach the wire; transport and remote failures are caught at the
//! synchronizer boundary and mapped here. Every variant renders a short
//! human-readable message for the UI collaborator; nothing escapes as an
//! uncaught fault.

use crate::domain::policy::PolicyDenial;
use crate::domain::ports::RemoteStoreError;
use crate::domain::referential::ReferentialError;
use crate::domain::site::SiteValidationError;
use crate::domain::user::UserValidationError;

/// Typed failure surfaced by every core operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// A site payload failed the geo/numeric validator.
    #[error(transparent)]
    Validation(#[from] SiteValidationError),

    /// A user payload failed validation.
    #[error(transparent)]
    UserValidation(#[from] UserValidationError),

    /// A site/manager reference could not be satisfied.
    #[error(transparent)]
    Referential(#[from] ReferentialError),

    /// The authorization policy denied the action; no network call was made.
    #[error(transparent)]
    Forbidden(#[from] PolicyDenial),

    /// The remote store rejected the session credentials.
    #[error("not authenticated with the remote store")]
    Unauthenticated,

    /// The addressed resource no longer exists on the remote store.
    #[error("{resource} was not found")]
    NotFound {
        /// Human-readable resource label.
        resource: String,
    },

    /// The remote store reported a concurrent-edit conflict.
    #[error("conflicting update: {message}")]
    Conflict {
        /// Message supplied by the store.
        message: String,
    },

    /// The transport failed before the store answered.
    #[error("network failure: {message}")]
    Network {
        /// Transport diagnostic.
        message: String,
    },

    /// The store answered with a non-2xx status and a message.
    #[error("the server rejected the request: {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body, or a generic fallback.
        message: String,
    },

    /// Another mutation for the same resource id is still in flight.
    #[error("another change to {id} is still in progress")]
    OperationInProgress {
        /// The contended resource id.
        id: String,
    },
}

impl From<RemoteStoreError> for CoreError {
    fn from(value: RemoteStoreError) -> Self {
        match value {
            RemoteStoreError::Transport { message } => Self::Network { message },
            RemoteStoreError::Unauthenticated => Self::Unauthenticated,
            RemoteStoreError::NotFound { resource } => Self::NotFound { resource },
            RemoteStoreError::Conflict { message } => Self::Conflict { message },
            RemoteStoreError::Rejected { status, message } => Self::Rejected { status, message },
            RemoteStoreError::Decode { message } => Self::Network { message },
        }
    }
}
