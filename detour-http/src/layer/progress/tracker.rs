use super::{ProgressListener, TransferDirection, TransferProgress, TransferState, TransferTag};
use detour_core::telemetry::tracing;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// Counts the bytes of a single transfer and notifies its listener.
///
/// Emits at most one terminal snapshot. The total is resolved once,
/// on the first counted bytes, and reused for all later snapshots.
pub(crate) struct ProgressTracker<L> {
    tag: TransferTag,
    direction: TransferDirection,
    listener: Arc<L>,
    transferred: u64,
    declared_total: Option<u64>,
    total: Option<Option<u64>>,
    terminated: bool,
}

impl<L> ProgressTracker<L>
where
    L: ProgressListener,
{
    pub(crate) fn new(tag: TransferTag, direction: TransferDirection, listener: Arc<L>) -> Self {
        Self {
            tag,
            direction,
            listener,
            transferred: 0,
            declared_total: None,
            total: None,
            terminated: false,
        }
    }

    /// Set the total as declared by the message, e.g. its content length.
    ///
    /// Has no effect once the total was resolved.
    pub(crate) fn set_declared_total(&mut self, total: Option<u64>) {
        self.declared_total = total;
    }

    /// Resolve the total, if not yet done, falling back to `hint`
    /// when no total was declared.
    pub(crate) fn resolve_total(&mut self, hint: impl FnOnce() -> Option<u64>) -> Option<u64> {
        let declared = self.declared_total;
        *self.total.get_or_insert_with(|| declared.or_else(hint))
    }

    pub(crate) fn transferred(&self) -> u64 {
        self.transferred
    }

    pub(crate) fn total(&self) -> Option<u64> {
        self.total.flatten().or(self.declared_total)
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Count `bytes` as transferred and emit an in-progress snapshot.
    pub(crate) fn record(&mut self, bytes: u64) {
        if self.terminated {
            return;
        }
        self.transferred = self.transferred.saturating_add(bytes);
        self.emit(TransferState::InProgress);
    }

    /// Emit the done snapshot, unless the transfer already terminated.
    pub(crate) fn finish(&mut self) {
        if !self.terminated {
            self.terminated = true;
            self.emit(TransferState::Done);
        }
    }

    /// Emit the failure snapshot, unless the transfer already terminated.
    pub(crate) fn fail(&mut self) {
        if !self.terminated {
            self.terminated = true;
            self.emit(TransferState::Failed);
        }
    }

    fn emit(&self, state: TransferState) {
        let progress = TransferProgress::new(
            self.tag.clone(),
            self.direction,
            self.transferred,
            self.total(),
            state,
        );
        tracing::debug!(
            "{} progress of '{}': {}/{:?} bytes ({:?})",
            self.direction,
            self.tag,
            self.transferred,
            progress.total_bytes(),
            state,
        );
        notify(self.listener.as_ref(), &progress);
    }
}

impl<L> Drop for ProgressTracker<L> {
    fn drop(&mut self) {
        if !self.terminated {
            tracing::trace!(
                "{} '{}' dropped after {} bytes without completing",
                self.direction,
                self.tag,
                self.transferred,
            );
        }
    }
}

/// Call `listener`, logging instead of propagating a panic.
fn notify<L>(listener: &L, progress: &TransferProgress)
where
    L: ProgressListener + ?Sized,
{
    if catch_unwind(AssertUnwindSafe(|| listener.on_progress(progress))).is_err() {
        tracing::error!(
            "progress listener panicked on {} '{}'; transfer continues",
            progress.direction(),
            progress.tag(),
        );
    }
}
