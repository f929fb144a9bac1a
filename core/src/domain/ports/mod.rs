//! Domain ports for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod remote_store;

#[cfg(test)]
pub use remote_store::MockRemoteStore;
pub use remote_store::{RemoteStore, RemoteStoreError};
