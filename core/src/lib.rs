//! Validation and consistency core for the water-distribution administration
//! system.
//!
//! The crate guards two remote resources, user accounts and distribution
//! sites, on behalf of UI collaborators. It owns the rules that accept or
//! reject a candidate payload, the referential link between a site and its
//! sector manager, the authorization policy consulted before any mutation,
//! and the mutate-then-refetch discipline that keeps a local resource cache
//! consistent with the remote authoritative store.
//!
//! Presentation concerns (rendering, routing, layout) live in the UI
//! collaborator, which drives this crate through [`domain::AdminService`].

pub mod domain;
pub mod outbound;

pub use domain::{AdminService, CoreError, ResourceSynchronizer, Session};
pub use outbound::{HttpRemoteStore, StoreHttpConfig};
