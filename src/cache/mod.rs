//! Offline cache: durable response store plus the network-first fetch proxy.
pub mod proxy;
pub mod store;

pub use proxy::{FetchProxy, DEFAULT_ASSETS};
pub use store::{CacheStore, CachedResponse};
