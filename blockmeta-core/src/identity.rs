//! Identity types for documents, block instances and field owners

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Host prefix marking a field owner id as a block instance rather than a document.
pub const BLOCK_OWNER_PREFIX: &str = "block_";

/// Identifier of a persisted document.
/// Uses UUIDv7 so freshly created documents sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Wrap an existing UUID.
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a new timestamp-sortable document id.
    pub fn now_v7() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for DocumentId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transient identifier of one block placement inside a document.
///
/// Assigned by the editor (e.g. `block_5938429`). Unique within one edit
/// session, NOT stable across sessions, so it is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockInstanceId(String);

impl BlockInstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BlockInstanceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for BlockInstanceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for BlockInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a save event concerns the canonical document or a snapshot of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    /// The document itself.
    Canonical,
    /// A draft/revision snapshot taken from `parent`.
    Revision { parent: DocumentId },
}

/// A document as reported by the host's save event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SavedDocument {
    pub id: DocumentId,
    pub kind: DocumentKind,
}

impl SavedDocument {
    /// A canonical (non-revision) document.
    pub fn canonical(id: DocumentId) -> Self {
        Self {
            id,
            kind: DocumentKind::Canonical,
        }
    }

    /// A revision snapshot of `parent`.
    pub fn revision(id: DocumentId, parent: DocumentId) -> Self {
        Self {
            id,
            kind: DocumentKind::Revision { parent },
        }
    }

    pub fn is_revision(&self) -> bool {
        matches!(self.kind, DocumentKind::Revision { .. })
    }
}

/// The owner a field value is being materialized for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldOwner {
    /// A block instance inside the document.
    Block(BlockInstanceId),
    /// The document itself (regular document-level fields).
    Document(DocumentId),
}

impl FieldOwner {
    /// Classify a raw host owner id.
    ///
    /// Ids carrying [`BLOCK_OWNER_PREFIX`] belong to a block instance; anything
    /// else is treated as the document being rendered.
    pub fn from_host_id(raw: &str, document_id: DocumentId) -> Self {
        if raw.starts_with(BLOCK_OWNER_PREFIX) {
            FieldOwner::Block(BlockInstanceId::new(raw))
        } else {
            FieldOwner::Document(document_id)
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, FieldOwner::Block(_))
    }
}
