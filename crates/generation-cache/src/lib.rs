//! Response cache storage organised in named generations.
//!
//! A [`CacheStorage`] holds any number of [`Generation`]s, each a map from
//! [`RequestKey`] to an immutable [`CachedResponse`]. Exactly one generation is
//! meant to be current at a time; choosing which one is the caller's business.

pub mod error;
pub mod generation;
pub mod key;
pub mod storage;
pub mod traits;

pub use error::CacheError;
pub use generation::Generation;
pub use key::RequestKey;
pub use storage::{CacheStorage, StorageLimits};
pub use traits::{CacheStats, CacheStore, CachedResponse};
