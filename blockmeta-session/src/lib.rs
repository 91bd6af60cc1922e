//! BLOCKMETA Session - Pass-Scoped Redirection
//!
//! A [`RedirectSession`] lives for exactly one document pass. While the host
//! traverses the document it offers every block instance to
//! [`RedirectSession::record_block_instance`]; redirected field values are
//! staged and written in a single batch when the document is saved. Field
//! reads during rendering go through the same session so each meta-key is
//! fetched at most once.
//!
//! - [`accumulator`]: dedup by block instance, staging of redirected values
//! - [`flush`]: the pass state machine and save-trigger guard
//! - [`session`]: the facade the host drives

pub mod accumulator;
pub mod flush;
pub mod session;

pub use accumulator::{RecordOutcome, WriteAccumulator};
pub use flush::{FlushController, FlushOutcome, PassState, SaveTrigger, SaveTriggerGuard};
pub use session::RedirectSession;
