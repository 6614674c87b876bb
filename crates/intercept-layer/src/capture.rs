use bytes::Bytes;
use generation_cache::CachedResponse;
use http::response::Parts;
use http::Response;

/// A network response captured once, from which two independently owned
/// handles are produced: one for the caller, one for the cache writer.
///
/// The body is read to completion before capture, so neither handle can
/// starve the other.
pub struct ResponseCapture {
    parts: Parts,
    body: Bytes,
}

impl ResponseCapture {
    pub fn new(response: Response<Bytes>) -> Self {
        let (parts, body) = response.into_parts();
        Self { parts, body }
    }

    /// Split into the live response and the copy to persist.
    pub fn tee(self) -> (Response<Bytes>, CachedResponse) {
        let copy = CachedResponse::new(self.parts.status, self.parts.headers.clone(), self.body.clone());
        (Response::from_parts(self.parts, self.body), copy)
    }
}
