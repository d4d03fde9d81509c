use super::TransferProgress;
use detour_core::telemetry::tracing;
use tokio::sync::broadcast;

/// Observer of [`TransferProgress`] snapshots.
///
/// Called synchronously on the task driving the transfer, so it should
/// return quickly. A panicking listener is logged and does not affect the transfer.
pub trait ProgressListener: Send + Sync + 'static {
    /// Called for every snapshot of a transfer.
    fn on_progress(&self, progress: &TransferProgress);
}

impl<F> ProgressListener for F
where
    F: Fn(&TransferProgress) + Send + Sync + 'static,
{
    fn on_progress(&self, progress: &TransferProgress) {
        self(progress)
    }
}

/// [`ProgressListener`] which forwards snapshots to any amount of subscribers.
///
/// Subscribers that fall behind more than the channel capacity
/// miss the oldest snapshots, see [`broadcast::Receiver::recv`].
/// Snapshots published while nobody is subscribed are dropped.
#[derive(Debug, Clone)]
pub struct ProgressBroadcast {
    sender: broadcast::Sender<TransferProgress>,
}

impl ProgressBroadcast {
    /// Create a new [`ProgressBroadcast`] buffering up to `capacity` snapshots per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to all snapshots published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TransferProgress> {
        self.sender.subscribe()
    }

    /// Amount of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ProgressBroadcast {
    fn default() -> Self {
        Self::new(64)
    }
}

impl ProgressListener for ProgressBroadcast {
    fn on_progress(&self, progress: &TransferProgress) {
        if self.sender.send(progress.clone()).is_err() {
            tracing::trace!("no subscribers for progress of '{}'", progress.tag());
        }
    }
}
