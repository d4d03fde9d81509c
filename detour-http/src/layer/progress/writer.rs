use super::tracker::ProgressTracker;
use super::{ProgressListener, TransferDirection, TransferTag};
use pin_project_lite::pin_project;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};
use tokio::io::AsyncWrite;

pin_project! {
    /// An [`AsyncWrite`] sink which reports the bytes written through it
    /// to a [`ProgressListener`] as an upload.
    ///
    /// The transfer is done once the total amount of bytes is written,
    /// or when the writer is shut down. A write, flush or shutdown error
    /// results in a failure snapshot, after which the error is returned unchanged.
    pub struct ProgressWriter<W, L> {
        #[pin]
        inner: W,
        tracker: ProgressTracker<L>,
        written: u64,
    }
}

impl<W, L> ProgressWriter<W, L>
where
    L: ProgressListener,
{
    /// Wrap `inner`, reporting to `listener` under `tag`.
    pub fn new(tag: impl Into<TransferTag>, inner: W, listener: Arc<L>) -> Self {
        Self {
            inner,
            tracker: ProgressTracker::new(tag.into(), TransferDirection::Upload, listener),
            written: 0,
        }
    }

    /// Set the total amount of bytes that will be written.
    #[must_use]
    pub fn with_total_bytes(mut self, total: u64) -> Self {
        self.tracker.set_declared_total(Some(total));
        self
    }

    /// Bytes written so far, including those written after the transfer ended.
    pub fn written_bytes(&self) -> u64 {
        self.written
    }

    /// Returns true once a done or failure snapshot was reported.
    pub fn is_terminated(&self) -> bool {
        self.tracker.is_terminated()
    }

    /// Consume `self`, returning the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W, L> fmt::Debug for ProgressWriter<W, L>
where
    W: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressWriter")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<W, L> AsyncWrite for ProgressWriter<W, L>
where
    W: AsyncWrite,
    L: ProgressListener,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.project();
        match ready!(this.inner.poll_write(cx, buf)) {
            Ok(n) => {
                *this.written = this.written.saturating_add(n as u64);
                let total = this.tracker.resolve_total(|| None);
                this.tracker.record(n as u64);
                if total.is_some_and(|total| this.tracker.transferred() >= total) {
                    this.tracker.finish();
                }
                Poll::Ready(Ok(n))
            }
            Err(err) => {
                this.tracker.fail();
                Poll::Ready(Err(err))
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.project();
        let result = ready!(this.inner.poll_flush(cx));
        if result.is_err() {
            this.tracker.fail();
        }
        Poll::Ready(result)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.project();
        let result = ready!(this.inner.poll_shutdown(cx));
        match result {
            Ok(()) => this.tracker.finish(),
            Err(_) => this.tracker.fail(),
        }
        Poll::Ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::progress::{TransferProgress, TransferState};
    use parking_lot::Mutex;
    use tokio::io::AsyncWriteExt;

    type Seen = Arc<Mutex<Vec<TransferProgress>>>;

    fn collecting() -> (Arc<impl ProgressListener>, Seen) {
        let seen = Seen::default();
        let listener = {
            let seen = seen.clone();
            move |progress: &TransferProgress| seen.lock().push(progress.clone())
        };
        (Arc::new(listener), seen)
    }

    #[tokio::test]
    async fn done_when_total_is_written() {
        let (listener, seen) = collecting();
        let mut writer = ProgressWriter::new("upload", Vec::new(), listener).with_total_bytes(6);

        writer.write_all(b"abc").await.unwrap();
        assert!(!writer.is_terminated());
        writer.write_all(b"def").await.unwrap();
        assert!(writer.is_terminated());
        writer.shutdown().await.unwrap();

        assert_eq!(writer.written_bytes(), 6);
        assert_eq!(writer.into_inner(), b"abcdef");

        let seen = seen.lock();
        let states: Vec<_> = seen.iter().map(|p| (p.transferred_bytes(), p.state())).collect();
        assert_eq!(
            states,
            [
                (3, TransferState::InProgress),
                (6, TransferState::InProgress),
                (6, TransferState::Done),
            ]
        );
    }

    #[tokio::test]
    async fn done_on_shutdown_without_total() {
        let (listener, seen) = collecting();
        let mut writer = ProgressWriter::new("upload", Vec::new(), listener);
        writer.write_all(b"abc").await.unwrap();
        writer.shutdown().await.unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert!(seen[1].is_done());
        assert_eq!(seen[1].percent(), 0.0);
    }

    #[tokio::test]
    async fn write_error_is_reported_and_propagated() {
        let (listener, seen) = collecting();
        let mock = tokio_test::io::Builder::new()
            .write(b"abc")
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"))
            .build();
        let mut writer = ProgressWriter::new("upload", mock, listener).with_total_bytes(10);

        writer.write_all(b"abc").await.unwrap();
        let err = writer.write_all(b"defg").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(writer.is_terminated());

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].percent(), 30.0);
        assert!(seen[1].is_failure());
        assert_eq!(seen[1].transferred_bytes(), 3);
    }

    #[tokio::test]
    async fn written_bytes_keeps_counting_past_the_total() {
        let (listener, seen) = collecting();
        let mut writer = ProgressWriter::new("upload", Vec::new(), listener).with_total_bytes(6);

        writer.write_all(b"abc").await.unwrap();
        writer.write_all(b"def").await.unwrap();
        writer.write_all(b"gh").await.unwrap();
        writer.shutdown().await.unwrap();

        assert_eq!(writer.written_bytes(), 8);
        assert_eq!(writer.into_inner(), b"abcdefgh");

        let seen = seen.lock();
        assert_eq!(seen.iter().filter(|p| p.is_terminal()).count(), 1);
        let last = seen.last().unwrap();
        assert!(last.is_done());
        assert_eq!(last.transferred_bytes(), 6);
    }
}
