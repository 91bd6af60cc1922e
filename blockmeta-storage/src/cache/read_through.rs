//! Read-through cache over the metadata store.
//!
//! Routes each read either to memory or, on first access of a meta-key, to
//! the store. The cache belongs to a single pass and is dropped with it.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use blockmeta_core::{BlockMetaResult, DocumentId, FieldValue, MetaKey, ReadPolicy};

use super::entry::{CachedMeta, Served};
use super::stats::ReadCacheStats;
use crate::MetaStore;

/// Read-through cache for one document pass.
///
/// At most one successful store fetch happens per meta-key for the lifetime
/// of the cache, however many fields or block instances ask for it. Keys are
/// not scoped by document: a cache serves exactly one document's pass.
#[derive(Debug)]
pub struct MetaReadCache {
    policy: ReadPolicy,
    entries: HashMap<MetaKey, CachedMeta>,
    stats: ReadCacheStats,
}

impl MetaReadCache {
    /// Create an empty cache serving reads under `policy`.
    pub fn new(policy: ReadPolicy) -> Self {
        Self {
            policy,
            entries: HashMap::new(),
            stats: ReadCacheStats::default(),
        }
    }

    pub fn policy(&self) -> ReadPolicy {
        self.policy
    }

    /// Read `key`, fetching it from `store` on first access.
    ///
    /// Returns the cached value according to the read policy, or `original`
    /// when the store has nothing (left) for this reader.
    ///
    /// # Errors
    ///
    /// Store failures are returned as-is and the key stays uncached.
    pub fn read<S>(
        &mut self,
        store: &S,
        document_id: DocumentId,
        key: &MetaKey,
        original: FieldValue,
    ) -> BlockMetaResult<FieldValue>
    where
        S: MetaStore + ?Sized,
    {
        Ok(self.next_value(store, document_id, key)?.unwrap_or(original))
    }

    /// Like [`MetaReadCache::read`], but reports "nothing for this reader" as
    /// `None` instead of substituting a fallback.
    pub fn next_value<S>(
        &mut self,
        store: &S,
        document_id: DocumentId,
        key: &MetaKey,
    ) -> BlockMetaResult<Option<FieldValue>>
    where
        S: MetaStore + ?Sized,
    {
        let entry = match self.entries.entry(key.clone()) {
            Entry::Occupied(slot) => {
                self.stats.hits += 1;
                slot.into_mut()
            }
            Entry::Vacant(slot) => {
                self.stats.misses += 1;
                let stored = match store.get(document_id, key) {
                    Ok(stored) => stored,
                    Err(e) => {
                        self.stats.fetch_failures += 1;
                        tracing::warn!(
                            document_id = %document_id,
                            meta_key = %key,
                            error = %e,
                            "Meta fetch failed; key left uncached"
                        );
                        return Err(e);
                    }
                };
                tracing::trace!(
                    document_id = %document_id,
                    meta_key = %key,
                    found = stored.is_some(),
                    "Fetched meta value"
                );
                slot.insert(CachedMeta::from_stored(self.policy, stored))
            }
        };

        let (value, served) = entry.serve();
        match served {
            Served::Shared => {}
            Served::Consumed => self.stats.consumed += 1,
            Served::Exhausted => self.stats.exhausted += 1,
        }
        Ok(value)
    }

    /// Whether `key` has been fetched in this pass.
    pub fn contains(&self, key: &MetaKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Cached entry for `key`, if fetched.
    pub fn peek(&self, key: &MetaKey) -> Option<&CachedMeta> {
        self.entries.get(key)
    }

    /// Number of fetched keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop one key so the next read fetches it again.
    pub fn invalidate(&mut self, key: &MetaKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every cached key. Statistics are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> &ReadCacheStats {
        &self.stats
    }
}
