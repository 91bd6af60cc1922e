//! BLOCKMETA Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - Proptest generators for field names, values and block instances
//! - Fixtures for a small block catalogue
//! - Assertions over [`BlockMetaResult`] and store state
//! - Tracing setup for tests

// Re-export mocks from their source crate
pub use blockmeta_storage::{InMemoryFieldRegistry, MockMetaStore, WriteRecord};

// Re-export core types for convenience
pub use blockmeta_core::{
    BlockInstance, BlockInstanceId, BlockMetaError, BlockMetaResult, DocumentId, FieldDefinition,
    FieldKey, FieldValue, FieldValues, MetaKey, ReadPolicy, RedirectConfig, SavedDocument,
    StoreError,
};

use std::sync::Once;

static TRACING: Once = Once::new();

/// Install a test-friendly `tracing` subscriber once per process.
///
/// Honors `RUST_LOG`; defaults to `warn`.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for block field redirection.

    use super::*;
    use proptest::collection::{btree_map, vec};
    use proptest::prelude::*;

    /// Field names as a block library would declare them: never empty and
    /// never starting with the single-value prefix.
    pub fn arb_field_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,11}"
    }

    /// Raw payload keys, plain or single-value form.
    pub fn arb_field_key() -> impl Strategy<Value = FieldKey> {
        (arb_field_name(), any::<bool>()).prop_map(|(name, single)| {
            if single {
                FieldKey::Single(name)
            } else {
                FieldKey::Plain(name)
            }
        })
    }

    /// Scalar field values.
    pub fn arb_field_value() -> impl Strategy<Value = FieldValue> {
        prop_oneof![
            "[A-Za-z0-9 ]{0,16}".prop_map(FieldValue::from),
            any::<i32>().prop_map(FieldValue::from),
            any::<bool>().prop_map(FieldValue::from),
            Just(FieldValue::Null),
        ]
    }

    /// Raw values of a field's redirect flag, truthy or not.
    pub fn arb_redirect_flag() -> impl Strategy<Value = Option<FieldValue>> {
        prop_oneof![
            Just(None),
            any::<bool>().prop_map(|b| Some(FieldValue::from(b))),
            (0i64..3).prop_map(|n| Some(FieldValue::from(n))),
            prop_oneof![Just("1"), Just("0"), Just("yes"), Just("no"), Just("")]
                .prop_map(|s| Some(FieldValue::from(s))),
        ]
    }

    pub fn arb_block_instance_id() -> impl Strategy<Value = BlockInstanceId> {
        "[0-9a-f]{8}".prop_map(|hex| BlockInstanceId::new(format!("block_{hex}")))
    }

    /// A block instance of `block_type` whose payload uses names from
    /// `names`, in plain and single-value form.
    pub fn arb_block_instance(
        block_type: &'static str,
        names: Vec<String>,
    ) -> impl Strategy<Value = BlockInstance> {
        let key = proptest::sample::select(names)
            .prop_flat_map(|name| {
                prop_oneof![Just(name.clone()), Just(format!("_{name}"))]
            });
        (
            arb_block_instance_id(),
            btree_map(key, arb_field_value(), 0..6),
        )
            .prop_map(move |(id, fields)| BlockInstance::new(id, block_type, fields))
    }

    /// A traversal of block instances with distinct ids.
    pub fn arb_traversal(
        block_type: &'static str,
        names: Vec<String>,
    ) -> impl Strategy<Value = Vec<BlockInstance>> {
        vec(arb_block_instance(block_type, names), 1..8).prop_map(|mut blocks| {
            for (index, block) in blocks.iter_mut().enumerate() {
                block.id = BlockInstanceId::new(format!("block_{index}"));
            }
            blocks
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for a small block catalogue.

    use super::*;
    use std::sync::Arc;

    pub const HERO_BLOCK: &str = "acme/hero";
    pub const GALLERY_BLOCK: &str = "acme/gallery";

    /// `acme/hero` redirects `headline` and `seo_title`; `body` stays local.
    /// `acme/gallery` redirects nothing.
    pub fn hero_fields() -> Vec<FieldDefinition> {
        vec![
            FieldDefinition::new("headline", HERO_BLOCK).with_redirect(true),
            FieldDefinition::new("seo_title", HERO_BLOCK).with_redirect("1"),
            FieldDefinition::new("body", HERO_BLOCK),
            FieldDefinition::new("caption", GALLERY_BLOCK).with_redirect(false),
        ]
    }

    pub fn hero_registry() -> Arc<InMemoryFieldRegistry> {
        Arc::new(InMemoryFieldRegistry::with_fields(hero_fields()))
    }

    /// Look up a field definition from [`hero_fields`] by name.
    pub fn field(name: &str) -> FieldDefinition {
        hero_fields()
            .into_iter()
            .find(|f| f.name == name)
            .unwrap_or_else(|| panic!("no fixture field named {name}"))
    }

    /// A hero instance carrying `pairs` as its payload.
    pub fn hero_block(id: &str, pairs: &[(&str, FieldValue)]) -> BlockInstance {
        block(id, HERO_BLOCK, pairs)
    }

    pub fn block(id: &str, block_type: &str, pairs: &[(&str, FieldValue)]) -> BlockInstance {
        let fields = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        BlockInstance::new(id, block_type, fields)
    }

    pub fn canonical_document() -> SavedDocument {
        SavedDocument::canonical(DocumentId::now_v7())
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over results and store state.

    use super::*;

    #[track_caller]
    pub fn assert_store_error<T: std::fmt::Debug>(result: &BlockMetaResult<T>) {
        match result {
            Err(BlockMetaError::Store(_)) => {}
            other => panic!("Expected Store error, got: {:?}", other),
        }
    }

    /// Assert the store holds `expected` under `key` for `document_id`.
    #[track_caller]
    pub fn assert_stored(
        store: &MockMetaStore,
        document_id: DocumentId,
        key: &MetaKey,
        expected: &FieldValue,
    ) {
        let stored = store.document(document_id);
        assert_eq!(
            stored.get(key),
            Some(expected),
            "Wrong stored value for {key}"
        );
    }

    #[track_caller]
    pub fn assert_not_stored(store: &MockMetaStore, document_id: DocumentId, key: &MetaKey) {
        let stored = store.document(document_id);
        assert!(
            !stored.contains_key(key),
            "Expected {key} to be absent, found {:?}",
            stored.get(key)
        );
    }
}
