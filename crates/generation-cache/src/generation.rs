use crate::key::RequestKey;
use crate::traits::CachedResponse;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Number of shards. Must be a power of two for fast modulo via bitmask.
const NUM_SHARDS: usize = 64;
const SHARD_MASK: u64 = (NUM_SHARDS as u64) - 1;

type Shard = RwLock<HashMap<RequestKey, Arc<CachedResponse>>>;

/// One named cache generation.
///
/// Entries are spread over 64 independently locked shards so concurrent
/// lookups and writes for different keys do not contend. Each put and match
/// touches exactly one shard; there is no read-modify-write across keys.
pub struct Generation {
    name: String,
    shards: Box<[Shard; NUM_SHARDS]>,
    bytes: AtomicUsize,
}

impl Generation {
    pub fn new(name: impl Into<String>) -> Self {
        let shards: Vec<Shard> = (0..NUM_SHARDS)
            .map(|_| RwLock::new(HashMap::new()))
            .collect();

        let shards: Box<[Shard; NUM_SHARDS]> = shards
            .into_boxed_slice()
            .try_into()
            .unwrap_or_else(|_| unreachable!());

        Self {
            name: name.into(),
            shards,
            bytes: AtomicUsize::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn shard(&self, key: &RequestKey) -> &Shard {
        let hash = ahash::RandomState::with_seeds(1, 2, 3, 4).hash_one(key.as_str());
        &self.shards[(hash & SHARD_MASK) as usize]
    }

    /// Look up a key. Read lock on one shard.
    pub fn get(&self, key: &RequestKey) -> Option<Arc<CachedResponse>> {
        self.shard(key).read().get(key).cloned()
    }

    /// Store an entry, replacing any previous one wholesale.
    /// Returns the replaced entry.
    pub fn insert(&self, key: RequestKey, value: CachedResponse) -> Option<Arc<CachedResponse>> {
        let size = value.size();
        let mut shard = self.shard(&key).write();
        let old = shard.insert(key, Arc::new(value));

        // Byte accounting stays under the shard lock.
        self.bytes.fetch_add(size, Ordering::Relaxed);
        if let Some(old) = &old {
            self.bytes.fetch_sub(old.size(), Ordering::Relaxed);
        }
        drop(shard);
        old
    }

    /// Size of the entry currently stored under `key`, if any.
    pub fn entry_size(&self, key: &RequestKey) -> Option<usize> {
        self.get(key).map(|e| e.size())
    }

    pub fn contains(&self, key: &RequestKey) -> bool {
        self.shard(key).read().contains_key(key)
    }

    /// Total number of entries across all shards.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| s.read().is_empty())
    }

    /// Approximate bytes held by this generation.
    pub fn bytes(&self) -> usize {
        self.bytes.load(Ordering::Relaxed)
    }

    /// All keys, sorted. Intended for diagnostics.
    pub fn keys(&self) -> Vec<RequestKey> {
        let mut keys: Vec<RequestKey> = self
            .shards
            .iter()
            .flat_map(|s| s.read().keys().cloned().collect::<Vec<_>>())
            .collect();
        keys.sort();
        keys
    }
}

impl std::fmt::Debug for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generation")
            .field("name", &self.name)
            .field("entries", &self.len())
            .field("bytes", &self.bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderMap, Method, StatusCode, Uri};

    fn key(path: &str) -> RequestKey {
        let uri: Uri = format!("http://localhost{path}").parse().unwrap();
        RequestKey::new(&Method::GET, &uri)
    }

    fn resp(body: &'static [u8]) -> CachedResponse {
        CachedResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::from_static(body))
    }

    #[test]
    fn insert_and_get() {
        let gen = Generation::new("medical-mcp-v2");
        gen.insert(key("/"), resp(b"index"));

        assert_eq!(gen.get(&key("/")).unwrap().body, Bytes::from_static(b"index"));
        assert!(gen.get(&key("/missing")).is_none());
        assert_eq!(gen.name(), "medical-mcp-v2");
    }

    #[test]
    fn overwrite_replaces_wholesale() {
        let gen = Generation::new("g");
        gen.insert(key("/a"), resp(b"first"));
        let old = gen.insert(key("/a"), resp(b"second-longer"));

        assert_eq!(old.unwrap().body, Bytes::from_static(b"first"));
        assert_eq!(gen.len(), 1);
        assert_eq!(gen.bytes(), b"second-longer".len());
        assert_eq!(gen.get(&key("/a")).unwrap().body, Bytes::from_static(b"second-longer"));
    }

    #[test]
    fn distributes_across_shards() {
        let gen = Generation::new("g");
        for i in 0..200 {
            gen.insert(key(&format!("/item/{i}")), resp(b"x"));
        }

        assert_eq!(gen.len(), 200);
        let nonempty = gen.shards.iter().filter(|s| !s.read().is_empty()).count();
        assert!(nonempty > 1, "expected keys spread over shards, got {nonempty}");
    }

    #[test]
    fn keys_are_sorted() {
        let gen = Generation::new("g");
        gen.insert(key("/b"), resp(b"b"));
        gen.insert(key("/a"), resp(b"a"));

        let keys = gen.keys();
        assert_eq!(keys, vec![key("/a"), key("/b")]);
    }

    #[test]
    fn concurrent_writers_last_one_wins() {
        use std::thread;

        let gen = Arc::new(Generation::new("g"));
        let mut handles = vec![];
        for _ in 0..8 {
            let gen = Arc::clone(&gen);
            handles.push(thread::spawn(move || {
                for i in 0..100 {
                    gen.insert(key(&format!("/k/{}", i % 10)), resp(b"same"));
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(gen.len(), 10);
        assert_eq!(gen.bytes(), 10 * b"same".len());
    }

    #[test]
    fn concurrent_replacements_of_different_sizes_keep_byte_count() {
        use std::thread;

        let gen = Arc::new(Generation::new("g"));
        let bodies: [&'static [u8]; 2] = [b"a-much-longer-body-than-the-other", b"b"];
        let mut handles = vec![];
        for t in 0..8 {
            let gen = Arc::clone(&gen);
            handles.push(thread::spawn(move || {
                for i in 0..500 {
                    gen.insert(key("/same"), resp(bodies[(t + i) % 2]));
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let stored = gen.get(&key("/same")).unwrap().size();
        assert_eq!(gen.bytes(), stored);
    }

    #[test]
    fn is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Generation>();
    }
}
