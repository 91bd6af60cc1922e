//! BLOCKMETA Storage - Collaborator Traits and Mock Implementations
//!
//! Defines the two outbound seams of a redirection session: the document
//! metadata store and the field-definition registry. Real hosts implement
//! these over their own persistence; the in-memory versions here back the
//! tests.

pub mod cache;

pub use cache::{CachedMeta, MetaReadCache, ReadCacheStats};

use blockmeta_core::{
    BlockMetaResult, DocumentId, FieldDefinition, FieldValue, MetaKey, StoreError,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// A batch of metadata entries for one document.
pub type MetaEntries = BTreeMap<MetaKey, FieldValue>;

// ============================================================================
// STORE TRAITS
// ============================================================================

/// Per-document key-value metadata store.
pub trait MetaStore: Send + Sync {
    /// Read one key of a document's metadata. Missing keys are `Ok(None)`.
    fn get(&self, document_id: DocumentId, key: &MetaKey) -> BlockMetaResult<Option<FieldValue>>;

    /// Merge `entries` into the document's metadata.
    /// Keys not present in `entries` are left untouched.
    fn set(&self, document_id: DocumentId, entries: &MetaEntries) -> BlockMetaResult<()>;
}

/// Read-only registry of field definitions per block type.
pub trait FieldRegistry: Send + Sync {
    /// All field definitions of `block_type`. Unknown types have no fields.
    fn block_fields(&self, block_type: &str) -> Vec<FieldDefinition>;
}

impl<T: MetaStore + ?Sized> MetaStore for Arc<T> {
    fn get(&self, document_id: DocumentId, key: &MetaKey) -> BlockMetaResult<Option<FieldValue>> {
        (**self).get(document_id, key)
    }

    fn set(&self, document_id: DocumentId, entries: &MetaEntries) -> BlockMetaResult<()> {
        (**self).set(document_id, entries)
    }
}

impl<T: FieldRegistry + ?Sized> FieldRegistry for Arc<T> {
    fn block_fields(&self, block_type: &str) -> Vec<FieldDefinition> {
        (**self).block_fields(block_type)
    }
}

// ============================================================================
// FIELD REGISTRY
// ============================================================================

/// In-memory field registry.
#[derive(Debug, Default)]
pub struct InMemoryFieldRegistry {
    fields: RwLock<HashMap<String, Vec<FieldDefinition>>>,
}

impl InMemoryFieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field definition under its block type.
    pub fn register(&self, field: FieldDefinition) {
        self.fields
            .write()
            .unwrap()
            .entry(field.block_type.clone())
            .or_default()
            .push(field);
    }

    /// Build a registry from a list of definitions.
    pub fn with_fields(fields: impl IntoIterator<Item = FieldDefinition>) -> Self {
        let registry = Self::new();
        for field in fields {
            registry.register(field);
        }
        registry
    }
}

impl FieldRegistry for InMemoryFieldRegistry {
    fn block_fields(&self, block_type: &str) -> Vec<FieldDefinition> {
        match self.fields.read() {
            Ok(fields) => fields.get(block_type).cloned().unwrap_or_default(),
            Err(_) => {
                tracing::warn!(block_type, "Field registry lock poisoned; treating block as fieldless");
                Vec::new()
            }
        }
    }
}

// ============================================================================
// MOCK STORE
// ============================================================================

/// Callback fired after every successful write, mimicking a host whose
/// metadata update re-emits the document save event.
pub type WriteHook = Box<dyn Fn(DocumentId) + Send + Sync>;

/// One successful `set` call observed by [`MockMetaStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRecord {
    pub document_id: DocumentId,
    pub entries: MetaEntries,
    pub written_at: DateTime<Utc>,
}

/// In-memory metadata store for testing.
///
/// Counts fetches per key, logs writes, and can inject read or write
/// failures.
#[derive(Default)]
pub struct MockMetaStore {
    documents: Arc<RwLock<HashMap<DocumentId, MetaEntries>>>,
    writes: Arc<RwLock<Vec<WriteRecord>>>,
    fetches: Arc<RwLock<HashMap<MetaKey, usize>>>,
    failing_reads: Arc<RwLock<HashMap<MetaKey, usize>>>,
    fail_writes: AtomicBool,
    on_write: RwLock<Option<Arc<dyn Fn(DocumentId) + Send + Sync>>>,
}

impl fmt::Debug for MockMetaStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockMetaStore")
            .field("documents", &self.documents)
            .field("writes", &self.writes)
            .field("fail_writes", &self.fail_writes)
            .finish_non_exhaustive()
    }
}

impl MockMetaStore {
    /// Create a new mock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value without recording a write.
    pub fn insert(&self, document_id: DocumentId, key: MetaKey, value: FieldValue) {
        self.documents
            .write()
            .unwrap()
            .entry(document_id)
            .or_default()
            .insert(key, value);
    }

    /// Snapshot of a document's metadata.
    pub fn document(&self, document_id: DocumentId) -> MetaEntries {
        self.documents
            .read()
            .unwrap()
            .get(&document_id)
            .cloned()
            .unwrap_or_default()
    }

    /// All successful writes, oldest first.
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.writes.read().unwrap().clone()
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.writes.read().unwrap().len()
    }

    /// Number of `get` calls (successful or not) for `key`.
    pub fn fetch_count(&self, key: &MetaKey) -> usize {
        self.fetches.read().unwrap().get(key).copied().unwrap_or(0)
    }

    /// Number of `get` calls across all keys.
    pub fn total_fetches(&self) -> usize {
        self.fetches.read().unwrap().values().sum()
    }

    /// Make the next `times` reads of `key` fail.
    pub fn fail_next_reads(&self, key: MetaKey, times: usize) {
        self.failing_reads.write().unwrap().insert(key, times);
    }

    /// Make every write fail until switched off.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Install the post-write callback.
    pub fn set_on_write(&self, hook: WriteHook) {
        *self.on_write.write().unwrap() = Some(Arc::from(hook));
    }

    /// Clear all stored data and counters.
    pub fn clear(&self) {
        self.documents.write().unwrap().clear();
        self.writes.write().unwrap().clear();
        self.fetches.write().unwrap().clear();
        self.failing_reads.write().unwrap().clear();
    }

    fn take_read_failure(&self, key: &MetaKey) -> BlockMetaResult<bool> {
        let mut failing = self
            .failing_reads
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;
        match failing.get_mut(key) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl MetaStore for MockMetaStore {
    fn get(&self, document_id: DocumentId, key: &MetaKey) -> BlockMetaResult<Option<FieldValue>> {
        *self
            .fetches
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .entry(key.clone())
            .or_default() += 1;

        if self.take_read_failure(key)? {
            return Err(StoreError::ReadFailed {
                document_id,
                key: key.clone(),
                reason: "injected read failure".to_string(),
            }
            .into());
        }

        let documents = self.documents.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(documents
            .get(&document_id)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    fn set(&self, document_id: DocumentId, entries: &MetaEntries) -> BlockMetaResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed {
                document_id,
                key_count: entries.len(),
                reason: "injected write failure".to_string(),
            }
            .into());
        }

        {
            let mut documents = self.documents.write().map_err(|_| StoreError::LockPoisoned)?;
            let stored = documents.entry(document_id).or_default();
            for (key, value) in entries {
                stored.insert(key.clone(), value.clone());
            }
        }

        self.writes
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .push(WriteRecord {
                document_id,
                entries: entries.clone(),
                written_at: Utc::now(),
            });

        // No lock is held while the hook runs; it may call back into the store.
        let hook = self
            .on_write
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .clone();
        if let Some(hook) = hook {
            hook(document_id);
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use blockmeta_core::BlockMetaError;
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn key(name: &str) -> MetaKey {
        MetaKey::for_field(name)
    }

    #[test]
    fn test_get_missing_key_is_none() {
        let store = MockMetaStore::new();
        let doc = DocumentId::now_v7();
        assert_eq!(store.get(doc, &key("headline")).unwrap(), None);
        assert_eq!(store.fetch_count(&key("headline")), 1);
    }

    #[test]
    fn test_set_merges_and_preserves_unrelated_keys() {
        let store = MockMetaStore::new();
        let doc = DocumentId::now_v7();
        store.insert(doc, key("seo_title"), json!("Old"));
        store.insert(doc, key("unrelated"), json!(7));

        let mut entries = MetaEntries::new();
        entries.insert(key("seo_title"), json!("New"));
        store.set(doc, &entries).unwrap();

        let stored = store.document(doc);
        assert_eq!(stored.get(&key("seo_title")), Some(&json!("New")));
        assert_eq!(stored.get(&key("unrelated")), Some(&json!(7)));
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.writes()[0].document_id, doc);
    }

    #[test]
    fn test_documents_are_isolated() {
        let store = MockMetaStore::new();
        let a = DocumentId::now_v7();
        let b = DocumentId::now_v7();
        store.insert(a, key("headline"), json!("A"));
        assert_eq!(store.get(b, &key("headline")).unwrap(), None);
    }

    #[test]
    fn test_injected_read_failures_run_out() {
        let store = MockMetaStore::new();
        let doc = DocumentId::now_v7();
        store.insert(doc, key("headline"), json!("Hello"));
        store.fail_next_reads(key("headline"), 1);

        let err = store.get(doc, &key("headline")).unwrap_err();
        assert!(matches!(err, BlockMetaError::Store(StoreError::ReadFailed { .. })));
        assert_eq!(store.get(doc, &key("headline")).unwrap(), Some(json!("Hello")));
        assert_eq!(store.fetch_count(&key("headline")), 2);
    }

    #[test]
    fn test_injected_write_failure_leaves_store_untouched() {
        let store = MockMetaStore::new();
        let doc = DocumentId::now_v7();
        store.set_fail_writes(true);

        let mut entries = MetaEntries::new();
        entries.insert(key("headline"), json!("x"));
        let err = store.set(doc, &entries).unwrap_err();

        assert!(matches!(
            err,
            BlockMetaError::Store(StoreError::WriteFailed { key_count: 1, .. })
        ));
        assert!(store.document(doc).is_empty());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_write_hook_fires_after_successful_write() {
        let store = MockMetaStore::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&fired);
        store.set_on_write(Box::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        store.set(DocumentId::now_v7(), &MetaEntries::new()).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_write_hook_may_call_back_into_store() {
        let store = Arc::new(MockMetaStore::new());
        let handle = Arc::downgrade(&store);
        let observed = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&observed);
        store.set_on_write(Box::new(move |document_id| {
            if let Some(store) = handle.upgrade() {
                seen.store(store.write_count(), Ordering::SeqCst);
                assert!(store.get(document_id, &MetaKey::for_field("headline")).is_ok());
                store.set_on_write(Box::new(|_| {}));
            }
        }));

        let mut entries = MetaEntries::new();
        entries.insert(key("headline"), json!("Hi"));
        store.set(DocumentId::now_v7(), &entries).unwrap();
        store.set(DocumentId::now_v7(), &entries).unwrap();

        assert_eq!(observed.load(Ordering::SeqCst), 1);
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn test_registry_groups_by_block_type() {
        let registry = InMemoryFieldRegistry::with_fields([
            FieldDefinition::new("headline", "acme/hero").with_redirect(true),
            FieldDefinition::new("body", "acme/hero"),
            FieldDefinition::new("caption", "acme/gallery"),
        ]);
        assert_eq!(registry.block_fields("acme/hero").len(), 2);
        assert_eq!(registry.block_fields("acme/gallery").len(), 1);
        assert!(registry.block_fields("acme/unknown").is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// A merge write never drops keys that were not part of the batch.
        #[test]
        fn prop_set_preserves_keys_outside_batch(
            existing in proptest::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..8),
            batch in proptest::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..8),
        ) {
            let store = MockMetaStore::new();
            let doc = DocumentId::now_v7();
            for (k, v) in &existing {
                store.insert(doc, key(k), json!(v));
            }
            let entries: MetaEntries = batch.iter().map(|(k, v)| (key(k), json!(v))).collect();
            store.set(doc, &entries).unwrap();

            let stored = store.document(doc);
            for (k, v) in &existing {
                let expected = batch.get(k).unwrap_or(v);
                prop_assert_eq!(stored.get(&key(k)).cloned(), Some(json!(expected)));
            }
            for (k, v) in &batch {
                prop_assert_eq!(stored.get(&key(k)).cloned(), Some(json!(v)));
            }
        }
    }
}
