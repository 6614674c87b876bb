use crate::error::CacheError;
use crate::generation::Generation;
use crate::key::RequestKey;
use crate::traits::{CacheStats, CacheStore, CachedResponse};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Size limits enforced on writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StorageLimits {
    /// Largest single entry accepted, in bytes.
    pub max_entry_bytes: usize,
    /// Total bytes across all generations.
    pub quota_bytes: usize,
}

impl Default for StorageLimits {
    fn default() -> Self {
        Self {
            max_entry_bytes: 1_048_576,
            quota_bytes: 64 * 1_048_576,
        }
    }
}

/// In-memory, origin-scoped cache storage.
///
/// Generations are kept in creation order. Lookups walk them in that order
/// and return the first hit, the same way the browser's `caches.match` does.
/// Shared between every layer instance of one origin.
pub struct CacheStorage {
    generations: RwLock<Vec<Arc<Generation>>>,
    limits: StorageLimits,
    /// Serialises the quota check with the insert it guards.
    write_lock: Mutex<()>,
    hits: AtomicU64,
    misses: AtomicU64,
    puts: AtomicU64,
    rejected_puts: AtomicU64,
}

impl CacheStorage {
    pub fn new(limits: StorageLimits) -> Self {
        Self {
            generations: RwLock::new(Vec::new()),
            limits,
            write_lock: Mutex::new(()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            puts: AtomicU64::new(0),
            rejected_puts: AtomicU64::new(0),
        }
    }

    pub fn limits(&self) -> StorageLimits {
        self.limits
    }

    /// Handle to an existing generation without creating it.
    pub fn generation(&self, name: &str) -> Option<Arc<Generation>> {
        self.generations
            .read()
            .iter()
            .find(|g| g.name() == name)
            .cloned()
    }

    fn total_bytes(&self) -> usize {
        self.generations.read().iter().map(|g| g.bytes()).sum()
    }

    fn check_limits(&self, generation: &Generation, key: &RequestKey, size: usize) -> Result<(), CacheError> {
        if size > self.limits.max_entry_bytes {
            return Err(CacheError::EntryTooLarge {
                size,
                limit: self.limits.max_entry_bytes,
            });
        }

        let replaced = generation.entry_size(key).unwrap_or(0);
        let requested = self.total_bytes().saturating_sub(replaced) + size;
        if requested > self.limits.quota_bytes {
            return Err(CacheError::QuotaExceeded {
                requested,
                quota: self.limits.quota_bytes,
            });
        }
        Ok(())
    }
}

impl Default for CacheStorage {
    fn default() -> Self {
        Self::new(StorageLimits::default())
    }
}

impl CacheStore for CacheStorage {
    fn open(&self, name: &str) -> Result<Arc<Generation>, CacheError> {
        if let Some(existing) = self.generation(name) {
            return Ok(existing);
        }

        let mut generations = self.generations.write();
        // Re-check under the write lock: another opener may have won.
        if let Some(existing) = generations.iter().find(|g| g.name() == name) {
            return Ok(Arc::clone(existing));
        }
        let created = Arc::new(Generation::new(name));
        generations.push(Arc::clone(&created));
        Ok(created)
    }

    fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self
            .generations
            .read()
            .iter()
            .map(|g| g.name().to_string())
            .collect())
    }

    fn delete(&self, name: &str) -> Result<bool, CacheError> {
        let mut generations = self.generations.write();
        let before = generations.len();
        generations.retain(|g| g.name() != name);
        Ok(generations.len() != before)
    }

    fn match_request(&self, key: &RequestKey) -> Result<Option<Arc<CachedResponse>>, CacheError> {
        let found = self
            .generations
            .read()
            .iter()
            .find_map(|g| g.get(key));

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        Ok(found)
    }

    fn put(
        &self,
        generation: &str,
        key: RequestKey,
        response: CachedResponse,
    ) -> Result<(), CacheError> {
        let result = self
            .generation(generation)
            .ok_or_else(|| CacheError::UnknownGeneration(generation.to_string()))
            .and_then(|gen| {
                let _guard = self.write_lock.lock();
                self.check_limits(&gen, &key, response.size())?;
                gen.insert(key, response);
                Ok(())
            });

        match &result {
            Ok(()) => self.puts.fetch_add(1, Ordering::Relaxed),
            Err(_) => self.rejected_puts.fetch_add(1, Ordering::Relaxed),
        };
        result
    }

    fn stats(&self) -> CacheStats {
        let generations = self.generations.read();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            puts: self.puts.load(Ordering::Relaxed),
            rejected_puts: self.rejected_puts.load(Ordering::Relaxed),
            generations: generations.len(),
            entries: generations.iter().map(|g| g.len()).sum(),
            bytes: generations.iter().map(|g| g.bytes()).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderMap, Method, StatusCode, Uri};

    fn key(path: &str) -> RequestKey {
        let uri: Uri = format!("http://localhost:8080{path}").parse().unwrap();
        RequestKey::new(&Method::GET, &uri)
    }

    fn resp(body: &str) -> CachedResponse {
        CachedResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::from(body.to_string()))
    }

    #[test]
    fn open_creates_once() {
        let storage = CacheStorage::default();
        let a = storage.open("medical-mcp-v2").unwrap();
        let b = storage.open("medical-mcp-v2").unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(storage.keys().unwrap(), vec!["medical-mcp-v2"]);
    }

    #[test]
    fn keys_in_creation_order() {
        let storage = CacheStorage::default();
        storage.open("medical-mcp-v1").unwrap();
        storage.open("medical-mcp-v2").unwrap();
        storage.open("other").unwrap();

        assert_eq!(
            storage.keys().unwrap(),
            vec!["medical-mcp-v1", "medical-mcp-v2", "other"]
        );
    }

    #[test]
    fn delete_removes_generation_and_entries() {
        let storage = CacheStorage::default();
        storage.open("medical-mcp-v1").unwrap();
        storage.put("medical-mcp-v1", key("/"), resp("old")).unwrap();

        assert!(storage.delete("medical-mcp-v1").unwrap());
        assert!(!storage.delete("medical-mcp-v1").unwrap());
        assert!(storage.match_request(&key("/")).unwrap().is_none());
        assert!(storage.keys().unwrap().is_empty());
    }

    #[test]
    fn match_searches_generations_in_creation_order() {
        let storage = CacheStorage::default();
        storage.open("first").unwrap();
        storage.open("second").unwrap();
        storage.put("second", key("/"), resp("from-second")).unwrap();
        storage.put("first", key("/"), resp("from-first")).unwrap();

        let hit = storage.match_request(&key("/")).unwrap().unwrap();
        assert_eq!(hit.body, Bytes::from_static(b"from-first"));
    }

    #[test]
    fn put_into_missing_generation_fails() {
        let storage = CacheStorage::default();
        let err = storage.put("gone", key("/"), resp("x")).unwrap_err();
        assert!(matches!(err, CacheError::UnknownGeneration(name) if name == "gone"));
        assert_eq!(storage.stats().rejected_puts, 1);
    }

    #[test]
    fn entry_limit_enforced() {
        let storage = CacheStorage::new(StorageLimits {
            max_entry_bytes: 4,
            quota_bytes: 1024,
        });
        storage.open("g").unwrap();

        let err = storage.put("g", key("/"), resp("too long")).unwrap_err();
        assert!(matches!(err, CacheError::EntryTooLarge { size: 8, limit: 4 }));
    }

    #[test]
    fn quota_enforced_across_generations() {
        let storage = CacheStorage::new(StorageLimits {
            max_entry_bytes: 100,
            quota_bytes: 10,
        });
        storage.open("a").unwrap();
        storage.open("b").unwrap();
        storage.put("a", key("/1"), resp("123456")).unwrap();

        let err = storage.put("b", key("/2"), resp("123456")).unwrap_err();
        assert!(matches!(err, CacheError::QuotaExceeded { requested: 12, quota: 10 }));
    }

    #[test]
    fn overwrite_does_not_count_replaced_bytes_against_quota() {
        let storage = CacheStorage::new(StorageLimits {
            max_entry_bytes: 100,
            quota_bytes: 10,
        });
        storage.open("a").unwrap();
        storage.put("a", key("/1"), resp("12345678")).unwrap();
        storage.put("a", key("/1"), resp("abcdefgh")).unwrap();

        let hit = storage.match_request(&key("/1")).unwrap().unwrap();
        assert_eq!(hit.body, Bytes::from_static(b"abcdefgh"));
    }

    #[test]
    fn concurrent_puts_never_overshoot_quota() {
        use std::thread;

        let storage = Arc::new(CacheStorage::new(StorageLimits {
            max_entry_bytes: 100,
            quota_bytes: 50,
        }));
        storage.open("g").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let storage = Arc::clone(&storage);
                thread::spawn(move || {
                    for i in 0..20 {
                        let _ = storage.put("g", key(&format!("/{t}/{i}")), resp("12345"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let stats = storage.stats();
        assert_eq!(stats.bytes, 50);
        assert_eq!(stats.entries, 10);
        assert_eq!(stats.puts, 10);
        assert_eq!(stats.rejected_puts, 150);
    }

    #[test]
    fn stats_track_hits_misses_and_puts() {
        let storage = CacheStorage::default();
        storage.open("g").unwrap();
        storage.put("g", key("/a"), resp("a")).unwrap();
        storage.match_request(&key("/a")).unwrap();
        storage.match_request(&key("/b")).unwrap();

        let stats = storage.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.puts, 1);
        assert_eq!(stats.generations, 1);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.bytes, 1);
    }
}
