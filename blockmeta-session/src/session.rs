//! The redirection session: one object per document pass.

use std::sync::Arc;

use blockmeta_core::{
    should_redirect, BlockInstance, BlockInstanceId, BlockMetaResult, DocumentId,
    FieldDefinition, FieldOwner, FieldValue, MetaKey, RedirectConfig, SavedDocument,
};
use blockmeta_storage::{FieldRegistry, MetaEntries, MetaReadCache, MetaStore, ReadCacheStats};

use crate::accumulator::{RecordOutcome, WriteAccumulator};
use crate::flush::{FlushController, FlushOutcome, PassState, SaveTrigger};

/// Owns all pass state: processed instances, staged writes, the read cache
/// and the flush state machine.
///
/// Create one at the start of a document pass and drop it at the end. The
/// session is driven sequentially by the host's traversal, save and field
/// read pipelines; nothing in it is shared with another pass.
///
/// # Example
///
/// ```ignore
/// let mut session = RedirectSession::new(registry, store, RedirectConfig::default());
/// for block in blocks {
///     session.record_block_instance(&block);
/// }
/// session.flush(&SavedDocument::canonical(document_id))?;
/// ```
pub struct RedirectSession<R, S>
where
    R: FieldRegistry + ?Sized,
    S: MetaStore + ?Sized,
{
    registry: Arc<R>,
    store: Arc<S>,
    config: RedirectConfig,
    accumulator: WriteAccumulator,
    flush: FlushController,
    reads: MetaReadCache,
}

impl<R, S> RedirectSession<R, S>
where
    R: FieldRegistry + ?Sized,
    S: MetaStore + ?Sized,
{
    /// Start a pass.
    pub fn new(registry: Arc<R>, store: Arc<S>, config: RedirectConfig) -> Self {
        Self {
            registry,
            store,
            accumulator: WriteAccumulator::new(config.read_policy),
            flush: FlushController::new(),
            reads: MetaReadCache::new(config.read_policy),
            config,
        }
    }

    /// Start a pass with default configuration.
    pub fn with_defaults(registry: Arc<R>, store: Arc<S>) -> Self {
        Self::new(registry, store, RedirectConfig::default())
    }

    pub fn config(&self) -> &RedirectConfig {
        &self.config
    }

    // === Write pipeline ===

    /// Offer a block instance encountered while traversing the document.
    ///
    /// Safe to call repeatedly for the same instance.
    pub fn record_block_instance(&mut self, instance: &BlockInstance) -> RecordOutcome {
        let outcome = self.accumulator.record(self.registry.as_ref(), instance);
        if outcome.redirected_count() > 0 {
            self.flush.note_staged();
        }
        outcome
    }

    /// Write the staged values for `document`. Called from the save event.
    pub fn flush(&mut self, document: &SavedDocument) -> BlockMetaResult<FlushOutcome> {
        self.flush.flush(
            self.store.as_ref(),
            document,
            &mut self.accumulator,
            &self.config,
        )
    }

    // === Read pipeline ===

    /// Materialize a field value.
    ///
    /// Non-redirected fields get `original` back untouched and never touch
    /// the store.
    pub fn resolve_value(
        &mut self,
        key: &MetaKey,
        document_id: DocumentId,
        field: &FieldDefinition,
        original: FieldValue,
    ) -> BlockMetaResult<FieldValue> {
        if !should_redirect(field) {
            return Ok(original);
        }
        self.reads.read(self.store.as_ref(), document_id, key, original)
    }

    /// Materialize a field definition together with its value.
    ///
    /// Shares the cache with [`RedirectSession::resolve_value`]. When the store
    /// has nothing for this reader the definition keeps its own value.
    pub fn resolve_field_definition(
        &mut self,
        key: &MetaKey,
        document_id: DocumentId,
        mut field: FieldDefinition,
    ) -> BlockMetaResult<FieldDefinition> {
        if !should_redirect(&field) {
            return Ok(field);
        }
        if let Some(value) = self.reads.next_value(self.store.as_ref(), document_id, key)? {
            field.value = Some(value);
        }
        Ok(field)
    }

    /// Materialize a field value for `owner`, deriving the meta-key from the
    /// field name.
    ///
    /// Only block-owned reads are redirected; document-level reads of a field
    /// with the same name pass through.
    pub fn load_value(
        &mut self,
        owner: &FieldOwner,
        document_id: DocumentId,
        field: &FieldDefinition,
        original: FieldValue,
    ) -> BlockMetaResult<FieldValue> {
        match owner {
            FieldOwner::Block(_) => {
                let key = MetaKey::for_field(&field.name);
                self.resolve_value(&key, document_id, field, original)
            }
            FieldOwner::Document(_) => Ok(original),
        }
    }

    // === Introspection ===

    pub fn state(&self) -> PassState {
        self.flush.state()
    }

    /// Handle the host checks before dispatching save events to this session.
    pub fn save_trigger(&self) -> SaveTrigger {
        self.flush.trigger()
    }

    pub fn pending(&self) -> &MetaEntries {
        self.accumulator.pending()
    }

    pub fn is_processed(&self, id: &BlockInstanceId) -> bool {
        self.accumulator.is_processed(id)
    }

    pub fn read_stats(&self) -> &ReadCacheStats {
        self.reads.stats()
    }

    /// Forget a cached key, e.g. after the host rewrote it mid-pass.
    pub fn invalidate(&mut self, key: &MetaKey) -> bool {
        self.reads.invalidate(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockmeta_core::ReadPolicy;
    use blockmeta_storage::{InMemoryFieldRegistry, MockMetaStore};
    use serde_json::json;

    fn setup(
        config: RedirectConfig,
    ) -> (
        Arc<MockMetaStore>,
        RedirectSession<InMemoryFieldRegistry, MockMetaStore>,
    ) {
        let registry = Arc::new(InMemoryFieldRegistry::with_fields([
            FieldDefinition::new("headline", "acme/hero").with_redirect(true),
            FieldDefinition::new("body", "acme/hero"),
        ]));
        let store = Arc::new(MockMetaStore::new());
        let session = RedirectSession::new(registry, Arc::clone(&store), config);
        (store, session)
    }

    fn headline_field() -> FieldDefinition {
        FieldDefinition::new("headline", "acme/hero").with_redirect(true)
    }

    fn hero(id: &str, headline: &str) -> BlockInstance {
        BlockInstance::new(
            id,
            "acme/hero",
            [
                ("headline".to_string(), json!(headline)),
                ("body".to_string(), json!("Body")),
            ]
            .into_iter()
            .collect(),
        )
    }

    #[test]
    fn test_state_machine_transitions() {
        let (_store, mut session) = setup(RedirectConfig::default());
        assert_eq!(session.state(), PassState::Idle);

        session.record_block_instance(&hero("block_1", "Hi"));
        assert_eq!(session.state(), PassState::Accumulating);

        session
            .flush(&SavedDocument::canonical(DocumentId::now_v7()))
            .unwrap();
        assert_eq!(session.state(), PassState::Idle);
    }

    #[test]
    fn test_record_without_redirected_fields_stays_idle() {
        let (_store, mut session) = setup(RedirectConfig::default());
        let block = BlockInstance::new(
            "block_1",
            "acme/hero",
            [("body".to_string(), json!("Body"))].into_iter().collect(),
        );
        assert!(session.record_block_instance(&block).is_recorded());
        assert_eq!(session.state(), PassState::Idle);
    }

    #[test]
    fn test_flush_merges_into_store() {
        let (store, mut session) = setup(RedirectConfig::default());
        let doc = DocumentId::now_v7();
        store.insert(doc, MetaKey::for_field("unrelated"), json!(true));

        session.record_block_instance(&hero("block_1", "Hi"));
        session.flush(&SavedDocument::canonical(doc)).unwrap();

        let stored = store.document(doc);
        assert_eq!(stored.get(&MetaKey::for_field("headline")), Some(&json!("Hi")));
        assert_eq!(stored.get(&MetaKey::for_field("unrelated")), Some(&json!(true)));
        assert!(!stored.contains_key(&MetaKey::for_field("body")));
    }

    #[test]
    fn test_resolve_value_ignores_plain_fields() {
        let (store, mut session) = setup(RedirectConfig::default());
        let doc = DocumentId::now_v7();
        store.insert(doc, MetaKey::for_field("body"), json!("Stored"));

        let body = FieldDefinition::new("body", "acme/hero");
        let value = session
            .resolve_value(&MetaKey::for_field("body"), doc, &body, json!("Local"))
            .unwrap();

        assert_eq!(value, json!("Local"));
        assert_eq!(store.total_fetches(), 0);
    }

    #[test]
    fn test_value_and_definition_share_cache() {
        let (store, mut session) = setup(RedirectConfig::default());
        let doc = DocumentId::now_v7();
        let key = MetaKey::for_field("headline");
        store.insert(doc, key.clone(), json!("Hello"));

        let value = session
            .resolve_value(&key, doc, &headline_field(), json!("x"))
            .unwrap();
        let field = session
            .resolve_field_definition(&key, doc, headline_field())
            .unwrap();

        assert_eq!(value, json!("Hello"));
        assert_eq!(field.value, Some(json!("Hello")));
        assert_eq!(store.fetch_count(&key), 1);
    }

    #[test]
    fn test_field_definition_keeps_own_value_when_store_empty() {
        let (_store, mut session) = setup(RedirectConfig::default());
        let doc = DocumentId::now_v7();
        let key = MetaKey::for_field("headline");

        let bare = session
            .resolve_field_definition(&key, doc, headline_field())
            .unwrap();
        let valued = session
            .resolve_field_definition(&key, doc, headline_field().with_value(json!("Local")))
            .unwrap();

        assert_eq!(bare.value, None);
        assert_eq!(valued.value, Some(json!("Local")));
    }

    #[test]
    fn test_load_value_only_redirects_block_owners() {
        let (store, mut session) = setup(RedirectConfig::default());
        let doc = DocumentId::now_v7();
        store.insert(doc, MetaKey::for_field("headline"), json!("Shared"));

        let block_owner = FieldOwner::from_host_id("block_42", doc);
        let doc_owner = FieldOwner::from_host_id("17", doc);

        let from_block = session
            .load_value(&block_owner, doc, &headline_field(), json!("Local"))
            .unwrap();
        let from_doc = session
            .load_value(&doc_owner, doc, &headline_field(), json!("Local"))
            .unwrap();

        assert_eq!(from_block, json!("Shared"));
        assert_eq!(from_doc, json!("Local"));
    }

    #[test]
    fn test_queue_round_trip_through_store() {
        let config = RedirectConfig::default().with_read_policy(ReadPolicy::Queue);
        let (store, mut write_pass) = setup(config.clone());
        let doc = DocumentId::now_v7();

        write_pass.record_block_instance(&hero("block_1", "First"));
        write_pass.record_block_instance(&hero("block_2", "Second"));
        write_pass.flush(&SavedDocument::canonical(doc)).unwrap();
        drop(write_pass);

        let registry = Arc::new(InMemoryFieldRegistry::new());
        let mut read_pass = RedirectSession::new(registry, Arc::clone(&store), config);
        let key = MetaKey::for_field("headline");
        let reads: Vec<FieldValue> = (0..3)
            .map(|_| {
                read_pass
                    .resolve_value(&key, doc, &headline_field(), json!("Local"))
                    .unwrap()
            })
            .collect();

        assert_eq!(reads, vec![json!("First"), json!("Second"), json!("Local")]);
    }

    #[test]
    fn test_invalidate_refetches() {
        let (store, mut session) = setup(RedirectConfig::default());
        let doc = DocumentId::now_v7();
        let key = MetaKey::for_field("headline");

        session.resolve_value(&key, doc, &headline_field(), json!(null)).unwrap();
        assert!(session.invalidate(&key));
        session.resolve_value(&key, doc, &headline_field(), json!(null)).unwrap();

        assert_eq!(store.fetch_count(&key), 2);
        assert_eq!(session.read_stats().misses, 2);
    }
}
