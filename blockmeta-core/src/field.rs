//! Field definitions and block instance payloads

use crate::BlockInstanceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw field value as submitted by the editor or stored in metadata.
pub type FieldValue = serde_json::Value;

/// A block instance's field payload, keyed by raw host key.
pub type FieldValues = BTreeMap<String, FieldValue>;

/// Definition of one field of a block type.
///
/// Owned by the host's field registry and read-only for the duration of a
/// pass. The redirect flag is set externally (by the settings UI) and arrives
/// loosely typed, so it is kept as a raw value and interpreted by
/// [`crate::should_redirect`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field name; also the meta-key of its plain value.
    pub name: String,
    /// Block type this field belongs to.
    pub block_type: String,
    /// Externally set "save to meta" flag.
    #[serde(default, rename = "save_to_meta", skip_serializing_if = "Option::is_none")]
    pub redirect: Option<FieldValue>,
    /// Materialized value, filled in by the field-definition read path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FieldValue>,
}

impl FieldDefinition {
    /// A definition with no redirect flag.
    pub fn new(name: impl Into<String>, block_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            block_type: block_type.into(),
            redirect: None,
            value: None,
        }
    }

    /// Set the redirect flag.
    pub fn with_redirect(mut self, flag: impl Into<FieldValue>) -> Self {
        self.redirect = Some(flag.into());
        self
    }

    /// Set the materialized value.
    pub fn with_value(mut self, value: FieldValue) -> Self {
        self.value = Some(value);
        self
    }
}

/// One placement of a block inside a document, as handed over by the
/// traversal pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockInstance {
    pub id: BlockInstanceId,
    pub block_type: String,
    #[serde(default)]
    pub fields: FieldValues,
}

impl BlockInstance {
    pub fn new(
        id: impl Into<BlockInstanceId>,
        block_type: impl Into<String>,
        fields: FieldValues,
    ) -> Self {
        Self {
            id: id.into(),
            block_type: block_type.into(),
            fields,
        }
    }

    /// An empty payload means the editor has not populated the block yet.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
