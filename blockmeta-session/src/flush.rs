//! Flush controller and save-trigger guard.
//!
//! A pass moves through an explicit state machine:
//!
//! ```text
//! Idle ── record (something staged) ──→ Accumulating ── flush() ──→ Flushing ──→ Idle
//!                                                          │
//!                                          SaveTrigger disarmed while here
//! ```
//!
//! The metadata write performed while `Flushing` is expected to re-emit the
//! host's document save event. The host consults [`SaveTrigger::is_armed`]
//! before dispatching that event to the session, and the controller itself
//! refuses to run while disarmed or already flushing. The trigger is
//! re-armed by [`SaveTriggerGuard`]'s `Drop`, so a failed write cannot leave
//! it disarmed.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use blockmeta_core::{BlockMetaResult, DocumentId, RedirectConfig, SavedDocument};
use blockmeta_storage::MetaStore;

use crate::accumulator::WriteAccumulator;

// ============================================================================
// SAVE TRIGGER
// ============================================================================

/// Shared on/off switch for the host's save-event dispatch into the session.
///
/// Clones share state, so the host can hold one while the session disarms it.
#[derive(Debug, Clone)]
pub struct SaveTrigger {
    armed: Arc<AtomicBool>,
}

impl SaveTrigger {
    /// A new, armed trigger.
    pub fn new() -> Self {
        Self {
            armed: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Whether save events should reach the session.
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Disarm until the returned guard is dropped.
    pub fn disarm(&self) -> SaveTriggerGuard {
        self.armed.store(false, Ordering::SeqCst);
        SaveTriggerGuard {
            trigger: self.clone(),
        }
    }
}

impl Default for SaveTrigger {
    fn default() -> Self {
        Self::new()
    }
}

/// Re-arms its [`SaveTrigger`] when dropped.
#[must_use = "the save trigger is re-armed as soon as the guard is dropped"]
#[derive(Debug)]
pub struct SaveTriggerGuard {
    trigger: SaveTrigger,
}

impl Drop for SaveTriggerGuard {
    fn drop(&mut self) {
        self.trigger.armed.store(true, Ordering::SeqCst);
    }
}

// ============================================================================
// PASS STATE
// ============================================================================

/// Lifecycle state of a redirection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PassState {
    /// Nothing staged.
    #[default]
    Idle,
    /// Redirected values are staged and waiting for the save.
    Accumulating,
    /// The staged values are being written.
    Flushing,
}

impl fmt::Display for PassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PassState::Idle => "idle",
            PassState::Accumulating => "accumulating",
            PassState::Flushing => "flushing",
        };
        f.write_str(name)
    }
}

/// What a flush call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// One store write carrying `keys` entries.
    Written { document_id: DocumentId, keys: usize },
    /// The saved document was a revision snapshot; staged values are kept.
    SkippedRevision,
    /// Nothing was staged.
    NothingPending,
    /// The trigger was disarmed or a flush was already running.
    Suppressed,
}

impl FlushOutcome {
    pub fn wrote(&self) -> bool {
        matches!(self, FlushOutcome::Written { .. })
    }
}

// ============================================================================
// FLUSH CONTROLLER
// ============================================================================

/// Writes a pass's staged values to the store exactly once per save.
#[derive(Debug, Default)]
pub struct FlushController {
    trigger: SaveTrigger,
    state: PassState,
    /// Set after the first successful write of the pass.
    flushed: bool,
}

impl FlushController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    /// Handle on the save trigger for the host's event dispatch.
    pub fn trigger(&self) -> SaveTrigger {
        self.trigger.clone()
    }

    /// Record that values were staged: `Idle -> Accumulating`.
    pub fn note_staged(&mut self) {
        if self.state == PassState::Idle {
            self.state = PassState::Accumulating;
        }
    }

    /// Flush `accumulator`'s staged values for `document`.
    ///
    /// # Errors
    ///
    /// Store write failures are returned unchanged. The staged values of the
    /// failed flush are dropped, the pass returns to `Idle`, and the trigger
    /// is re-armed.
    pub fn flush<S>(
        &mut self,
        store: &S,
        document: &SavedDocument,
        accumulator: &mut WriteAccumulator,
        config: &RedirectConfig,
    ) -> BlockMetaResult<FlushOutcome>
    where
        S: MetaStore + ?Sized,
    {
        if self.state == PassState::Flushing || !self.trigger.is_armed() {
            tracing::debug!(document_id = %document.id, state = %self.state, "Flush suppressed");
            return Ok(FlushOutcome::Suppressed);
        }
        if config.skip_revisions && document.is_revision() {
            tracing::debug!(document_id = %document.id, "Skipping flush for revision");
            return Ok(FlushOutcome::SkippedRevision);
        }
        // An empty write is only forced for the first save of the pass.
        if !accumulator.has_pending() && (self.flushed || !config.flush_when_empty) {
            self.state = PassState::Idle;
            return Ok(FlushOutcome::NothingPending);
        }

        let entries = accumulator.take_pending();
        let keys = entries.len();

        let result = {
            let _guard = self.trigger.disarm();
            self.state = PassState::Flushing;
            let result = store.set(document.id, &entries);
            self.state = PassState::Idle;
            result
        };

        match result {
            Ok(()) => {
                self.flushed = true;
                tracing::debug!(document_id = %document.id, keys, "Flushed redirected fields");
                Ok(FlushOutcome::Written {
                    document_id: document.id,
                    keys,
                })
            }
            Err(e) => {
                tracing::warn!(document_id = %document.id, keys, error = %e, "Flush failed");
                Err(e)
            }
        }
    }
}
