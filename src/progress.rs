//! Observer trait for pipeline events.
//!
//! Inject an [`Arc<dyn PipelineObserver>`] via
//! [`crate::orchestrator::MemoPipelineBuilder::observer`] to follow a run as
//! it moves through its states and polls its task. Callers can forward the
//! events to metrics, a progress display or a test recorder without the
//! pipeline knowing how they are used.
//!
//! # Example
//!
//! ```rust
//! use securememo::{PipelineObserver, PipelineState};
//! use std::sync::atomic::{AtomicU32, Ordering};
//!
//! #[derive(Default)]
//! struct PollCounter {
//!     polls: AtomicU32,
//! }
//!
//! impl PipelineObserver for PollCounter {
//!     fn on_poll(&self, _attempt: u32, _max_attempts: u32, _status: securememo::TaskStatus) {
//!         self.polls.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//! ```

use crate::client::TaskStatus;
use crate::error::MemoError;
use crate::orchestrator::PipelineState;
use std::sync::Arc;

/// Receives events from a running pipeline.
///
/// Every method has a no-op default. One observer may be shared by many
/// concurrent runs, so implementations must synchronise their own state.
pub trait PipelineObserver: Send + Sync {
    /// The run moved from `from` to `to`.
    fn on_transition(&self, from: PipelineState, to: PipelineState) {
        let _ = (from, to);
    }

    /// A task-status check returned.
    ///
    /// # Arguments
    /// * `attempt`      — 1-based check number
    /// * `max_attempts` — the configured cap
    /// * `status`       — normalised task state
    fn on_poll(&self, attempt: u32, max_attempts: u32, status: TaskStatus) {
        let _ = (attempt, max_attempts, status);
    }

    /// The protected document is ready.
    fn on_complete(&self, filename: &str, bytes: usize) {
        let _ = (filename, bytes);
    }

    /// The run ended in `error`.
    fn on_failure(&self, error: &MemoError) {
        let _ = error;
    }
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Shared observer handle as stored by the pipeline.
pub type ObserverHandle = Arc<dyn PipelineObserver>;
