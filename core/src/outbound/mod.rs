//! Outbound adapters for driven ports.

pub mod dto;
pub mod http_store;

pub use http_store::{HttpRemoteStore, StoreHttpConfig};
