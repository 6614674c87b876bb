/// Failures of cache storage operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The named generation does not exist (deleted or never opened).
    #[error("unknown cache generation: {0}")]
    UnknownGeneration(String),

    /// A single entry is larger than the per-entry limit.
    #[error("entry of {size} bytes exceeds the {limit} byte entry limit")]
    EntryTooLarge { size: usize, limit: usize },

    /// Storing the entry would push the storage past its quota.
    #[error("storage quota of {quota} bytes exceeded ({requested} bytes requested)")]
    QuotaExceeded { requested: usize, quota: usize },

    /// Backend-specific failure.
    #[error("cache backend error: {0}")]
    Backend(String),
}
