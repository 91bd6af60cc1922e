//! Pass-scoped read-through cache for redirected field values.
//!
//! Every redirected field read in a pass goes through [`MetaReadCache`]. The
//! first read of a meta-key fetches it from the [`crate::MetaStore`]; every
//! later read of that key in the same pass is served from memory. How a
//! cached value is handed out depends on the session's
//! [`blockmeta_core::ReadPolicy`]:
//!
//! - `Broadcast`: the same value for every reader.
//! - `Queue`: stored arrays are consumed front to back, one element per read,
//!   so the n-th block instance on the page receives the n-th saved value.
//!
//! A failed fetch leaves no trace in the cache. The error goes back to the
//! caller and the next read of that key fetches again.
//!
//! # Example
//!
//! ```ignore
//! let mut cache = MetaReadCache::new(ReadPolicy::Broadcast);
//! let value = cache.read(&store, document_id, &MetaKey::for_field("headline"), original)?;
//! ```

pub mod entry;
pub mod read_through;
pub mod stats;

pub use entry::CachedMeta;
pub use read_through::MetaReadCache;
pub use stats::ReadCacheStats;
