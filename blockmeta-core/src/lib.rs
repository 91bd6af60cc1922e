//! BLOCKMETA Core - Data Types
//!
//! Identities, field model, keys, the redirection policy predicate,
//! configuration and error types. All other crates depend on this.
//! Nothing here touches a store or holds pass state.

pub mod config;
pub mod error;
pub mod field;
pub mod identity;
pub mod key;
pub mod policy;

pub use config::{ReadPolicy, RedirectConfig};
pub use error::{BlockMetaError, BlockMetaResult, ConfigError, StoreError};
pub use field::{BlockInstance, FieldDefinition, FieldValue, FieldValues};
pub use identity::{
    BlockInstanceId, DocumentId, DocumentKind, FieldOwner, SavedDocument, BLOCK_OWNER_PREFIX,
};
pub use key::{FieldKey, MetaKey, SINGLE_VALUE_PREFIX};
pub use policy::{redirected_field_names, should_redirect};
