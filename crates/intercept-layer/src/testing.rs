//! Recording fakes for the cache store and the network.

use crate::error::FetchError;
use crate::fetch::Fetcher;
use bytes::Bytes;
use generation_cache::{CacheError, CacheStats, CacheStorage, CacheStore, CachedResponse, Generation, RequestKey};
use http::header::CONTENT_TYPE;
use http::{Method, Request, Response, StatusCode};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub opens: usize,
    pub keys: usize,
    pub deletes: usize,
    pub matches: usize,
    pub puts: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.opens + self.keys + self.deletes + self.matches + self.puts
    }
}

/// Wraps a real [`CacheStorage`], counting calls and injecting failures.
#[derive(Default)]
pub struct RecordingStore {
    inner: CacheStorage,
    counts: Mutex<CallCounts>,
    fail_deletes: AtomicBool,
    fail_puts: AtomicBool,
    fail_matches: AtomicBool,
}

impl RecordingStore {
    pub fn inner(&self) -> &CacheStorage {
        &self.inner
    }

    pub fn counts(&self) -> CallCounts {
        *self.counts.lock()
    }

    pub fn reset_counts(&self) {
        *self.counts.lock() = CallCounts::default();
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_matches(&self, fail: bool) {
        self.fail_matches.store(fail, Ordering::SeqCst);
    }
}

fn injected() -> CacheError {
    CacheError::Backend("injected failure".into())
}

impl CacheStore for RecordingStore {
    fn open(&self, name: &str) -> Result<Arc<Generation>, CacheError> {
        self.counts.lock().opens += 1;
        self.inner.open(name)
    }

    fn keys(&self) -> Result<Vec<String>, CacheError> {
        self.counts.lock().keys += 1;
        self.inner.keys()
    }

    fn delete(&self, name: &str) -> Result<bool, CacheError> {
        self.counts.lock().deletes += 1;
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.delete(name)
    }

    fn match_request(&self, key: &RequestKey) -> Result<Option<Arc<CachedResponse>>, CacheError> {
        self.counts.lock().matches += 1;
        if self.fail_matches.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.match_request(key)
    }

    fn put(&self, generation: &str, key: RequestKey, response: CachedResponse) -> Result<(), CacheError> {
        self.counts.lock().puts += 1;
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.put(generation, key, response)
    }

    fn stats(&self) -> CacheStats {
        self.inner.stats()
    }
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub uri: String,
    pub body: Bytes,
}

/// Scripted network keyed by request target. Unknown targets get a 404.
pub struct FakeNetwork {
    routes: Mutex<HashMap<String, (StatusCode, &'static str, String)>>,
    offline: AtomicBool,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeNetwork {
    /// Serves the two seed paths of the gateway.
    pub fn serving_gateway() -> Self {
        let net = Self {
            routes: Mutex::new(HashMap::new()),
            offline: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        };
        net.routes.lock().insert(
            "/".into(),
            (StatusCode::OK, "text/html", "<html>index</html>".into()),
        );
        net.routes.lock().insert(
            "/health".into(),
            (StatusCode::OK, "application/json", "{\"status\":\"healthy\"}".into()),
        );
        net
    }

    pub fn offline() -> Self {
        let net = Self::serving_gateway();
        net.set_offline(true);
        net
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn respond(&self, target: &str, status: StatusCode, body: &str) {
        self.routes
            .lock()
            .insert(target.into(), (status, "application/json", body.into()));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }
}

impl Fetcher for FakeNetwork {
    async fn fetch(&self, request: Request<Bytes>) -> Result<Response<Bytes>, FetchError> {
        let target = request.uri().to_string();
        self.calls.lock().push(RecordedCall {
            method: request.method().clone(),
            uri: target.clone(),
            body: request.body().clone(),
        });

        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Connect("offline".into()));
        }

        let (status, content_type, body) = self
            .routes
            .lock()
            .get(&target)
            .cloned()
            .unwrap_or((StatusCode::NOT_FOUND, "text/plain", "not found".into()));

        let mut response = Response::new(Bytes::from(body));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, content_type.parse().expect("static content type"));
        Ok(response)
    }
}
