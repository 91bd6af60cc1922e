//! Read cache statistics.

/// Counters for one pass's read cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadCacheStats {
    /// Reads answered from memory.
    pub hits: u64,
    /// Reads that went to the store (one per meta-key on success).
    pub misses: u64,
    /// Store fetches that failed and were not cached.
    pub fetch_failures: u64,
    /// Queue entries handed out and removed.
    pub consumed: u64,
    /// Queue reads that found nothing left and kept the caller's value.
    pub exhausted: u64,
}

impl ReadCacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
