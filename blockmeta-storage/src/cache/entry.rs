//! Cached metadata entries.

use blockmeta_core::{FieldValue, ReadPolicy};
use std::collections::VecDeque;

/// A fetched meta value, shaped for the read policy it will be served under.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedMeta {
    /// Stored value handed to every reader. `None` when the key was absent.
    Broadcast(Option<FieldValue>),
    /// Remaining stored values, next reader first.
    Queue(VecDeque<FieldValue>),
}

/// What serving a read did to the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
    /// Broadcast value, possibly absent.
    Shared,
    /// A queue element was removed.
    Consumed,
    /// Queue was empty.
    Exhausted,
}

impl CachedMeta {
    /// Shape a store result for `policy`.
    ///
    /// Under `Queue` an array becomes one queue element per item, any other
    /// value a single-element queue, and an absent key an empty queue.
    pub fn from_stored(policy: ReadPolicy, stored: Option<FieldValue>) -> Self {
        match policy {
            ReadPolicy::Broadcast => CachedMeta::Broadcast(stored),
            ReadPolicy::Queue => CachedMeta::Queue(match stored {
                None => VecDeque::new(),
                Some(FieldValue::Array(items)) => items.into(),
                Some(value) => VecDeque::from([value]),
            }),
        }
    }

    /// Serve one read. `None` means there is nothing to give this reader.
    pub fn serve(&mut self) -> (Option<FieldValue>, Served) {
        match self {
            CachedMeta::Broadcast(value) => (value.clone(), Served::Shared),
            CachedMeta::Queue(queue) => match queue.pop_front() {
                Some(value) => (Some(value), Served::Consumed),
                None => (None, Served::Exhausted),
            },
        }
    }

    /// Values still available to readers.
    pub fn remaining(&self) -> usize {
        match self {
            CachedMeta::Broadcast(value) => usize::from(value.is_some()),
            CachedMeta::Queue(queue) => queue.len(),
        }
    }
}
