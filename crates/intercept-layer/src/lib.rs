//! Cache-first intercept layer.
//!
//! An [`InterceptLayer`] sits between a client and its origin. It is
//! installed once (seeding the current cache generation), activated (deleting
//! every other generation and taking control), and then decides per request
//! whether to serve from cache, go to the network, or stay out of the way.

pub mod capture;
pub mod config;
pub mod error;
pub mod fetch;
pub mod lifecycle;
pub mod policy;

#[cfg(test)]
mod testing;

pub use capture::ResponseCapture;
pub use config::InterceptConfig;
pub use error::{FetchError, InterceptError};
pub use fetch::{Fetcher, HttpFetcher};
pub use lifecycle::{ActivateOutcome, InstallOutcome, InterceptLayer, Intercepted, Phase, Source};
pub use policy::{AllowList, Origin, Route};
