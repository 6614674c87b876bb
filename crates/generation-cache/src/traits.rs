use crate::error::CacheError;
use crate::generation::Generation;
use crate::key::RequestKey;
use bytes::Bytes;
use http::{HeaderMap, Response, StatusCode};
use std::sync::Arc;

/// Response captured into the cache.
///
/// Immutable once stored. Re-fetching the same key replaces the whole entry.
#[derive(Clone, Debug)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Capture a response. The body is a cheap `Bytes` handle.
    pub fn from_response(response: &Response<Bytes>) -> Self {
        Self {
            status: response.status(),
            headers: response.headers().clone(),
            body: response.body().clone(),
        }
    }

    /// Rebuild an HTTP response from the stored parts.
    pub fn to_response(&self) -> Response<Bytes> {
        let mut response = Response::new(self.body.clone());
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers.clone();
        response
    }

    /// Approximate storage footprint: body plus header names and values.
    pub fn size(&self) -> usize {
        let headers: usize = self
            .headers
            .iter()
            .map(|(k, v)| k.as_str().len() + v.len())
            .sum();
        self.body.len() + headers
    }
}

/// Snapshot of storage statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub puts: u64,
    pub rejected_puts: u64,
    pub generations: usize,
    pub entries: usize,
    pub bytes: usize,
}

/// Operations the intercept layer performs against cache storage.
///
/// Mirrors the platform cache API: generations are opened (created if
/// absent), listed, deleted by name; lookups search every generation, writes
/// target one generation by name. All methods are fallible so callers decide
/// how to absorb failures.
pub trait CacheStore: Send + Sync {
    /// Open the named generation, creating it if absent.
    fn open(&self, name: &str) -> Result<Arc<Generation>, CacheError>;

    /// Names of all existing generations, in creation order.
    fn keys(&self) -> Result<Vec<String>, CacheError>;

    /// Delete a generation wholesale. Returns whether it existed.
    fn delete(&self, name: &str) -> Result<bool, CacheError>;

    /// Find a stored response for `key` in any generation.
    fn match_request(&self, key: &RequestKey) -> Result<Option<Arc<CachedResponse>>, CacheError>;

    /// Store `response` under `key` in the named generation.
    fn put(
        &self,
        generation: &str,
        key: RequestKey,
        response: CachedResponse,
    ) -> Result<(), CacheError>;

    /// Current statistics snapshot.
    fn stats(&self) -> CacheStats;
}
