//! Write accumulator: collects redirected field values across block instances.

use std::collections::HashSet;

use blockmeta_core::{
    redirected_field_names, BlockInstance, BlockInstanceId, FieldKey, FieldValue, FieldValues,
    ReadPolicy,
};
use blockmeta_storage::{FieldRegistry, MetaEntries};

/// Result of offering a block instance to the accumulator.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// The instance was handled earlier in this pass; nothing changed.
    AlreadyProcessed,
    /// The payload was empty; the instance stays eligible for a later call.
    NotReady,
    /// The instance was processed.
    Recorded {
        /// Keys whose values were staged for the store.
        redirected: Vec<FieldKey>,
        /// Fields that stay in the block's own markup.
        retained: FieldValues,
    },
}

impl RecordOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, RecordOutcome::Recorded { .. })
    }

    /// Number of staged keys (zero unless recorded).
    pub fn redirected_count(&self) -> usize {
        match self {
            RecordOutcome::Recorded { redirected, .. } => redirected.len(),
            _ => 0,
        }
    }
}

/// Collects redirected values for one pass, deduplicated by block instance.
///
/// Under [`ReadPolicy::Broadcast`] the last processed instance wins for a
/// given meta-key. Under [`ReadPolicy::Queue`] plain values are appended to a
/// per-key array in traversal order; single-value keys always overwrite.
#[derive(Debug)]
pub struct WriteAccumulator {
    policy: ReadPolicy,
    processed: HashSet<BlockInstanceId>,
    pending: MetaEntries,
}

impl WriteAccumulator {
    pub fn new(policy: ReadPolicy) -> Self {
        Self {
            policy,
            processed: HashSet::new(),
            pending: MetaEntries::new(),
        }
    }

    /// Offer one block instance.
    ///
    /// Repeat offers of a processed instance and empty payloads are no-ops;
    /// only the former marks anything. Keys that are not redirected for the
    /// instance's block type are returned untouched in `retained`.
    pub fn record<R>(&mut self, registry: &R, instance: &BlockInstance) -> RecordOutcome
    where
        R: FieldRegistry + ?Sized,
    {
        if self.processed.contains(&instance.id) {
            tracing::trace!(instance_id = %instance.id, "Block instance already processed");
            return RecordOutcome::AlreadyProcessed;
        }
        if instance.is_empty() {
            tracing::trace!(instance_id = %instance.id, "Block instance has no fields yet");
            return RecordOutcome::NotReady;
        }

        let eligible = redirected_field_names(&registry.block_fields(&instance.block_type));

        let mut redirected = Vec::new();
        let mut retained = FieldValues::new();
        for (raw, value) in &instance.fields {
            match FieldKey::parse(raw) {
                Some(key) if eligible.contains(key.field_name()) => {
                    self.stage(&key, value.clone());
                    redirected.push(key);
                }
                _ => {
                    retained.insert(raw.clone(), value.clone());
                }
            }
        }

        self.processed.insert(instance.id.clone());
        tracing::debug!(
            instance_id = %instance.id,
            block_type = %instance.block_type,
            redirected = redirected.len(),
            retained = retained.len(),
            "Recorded block instance"
        );

        RecordOutcome::Recorded {
            redirected,
            retained,
        }
    }

    fn stage(&mut self, key: &FieldKey, value: FieldValue) {
        let meta_key = key.meta_key();
        match (self.policy, key) {
            (ReadPolicy::Queue, FieldKey::Plain(_)) => {
                let slot = self
                    .pending
                    .entry(meta_key)
                    .or_insert_with(|| FieldValue::Array(Vec::new()));
                // Plain keys are only ever staged as arrays under Queue.
                if let Some(items) = slot.as_array_mut() {
                    items.push(value);
                }
            }
            _ => {
                self.pending.insert(meta_key, value);
            }
        }
    }

    /// Staged entries not yet flushed.
    pub fn pending(&self) -> &MetaEntries {
        &self.pending
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Hand the staged entries to the flush, leaving the map empty.
    pub fn take_pending(&mut self) -> MetaEntries {
        std::mem::take(&mut self.pending)
    }

    pub fn is_processed(&self, id: &BlockInstanceId) -> bool {
        self.processed.contains(id)
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }
}
