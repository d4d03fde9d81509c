use super::tracker::ProgressTracker;
use super::{ProgressListener, TransferDirection, TransferTag};
use crate::body::{Frame, SizeHint, StreamingBody};
use bytes::Buf;
use pin_project_lite::pin_project;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

pin_project! {
    /// A [`StreamingBody`] which reports the bytes flowing through it
    /// to a [`ProgressListener`].
    ///
    /// Each data frame results in an in-progress snapshot.
    /// The end of the body results in a done snapshot,
    /// an error of the inner body in a failure snapshot,
    /// after which the error is returned unchanged.
    ///
    /// A body which is already at its end when wrapped reports its done
    /// snapshot right away, as transports do not poll such bodies.
    ///
    /// Dropping the body before its end drops the inner body
    /// without reporting a terminal snapshot.
    pub struct ProgressBody<B, L> {
        #[pin]
        inner: B,
        tracker: ProgressTracker<L>,
    }
}

impl<B, L> ProgressBody<B, L>
where
    L: ProgressListener,
{
    /// Wrap a response body being read.
    pub fn download(tag: impl Into<TransferTag>, inner: B, listener: Arc<L>) -> Self
    where
        B: StreamingBody,
    {
        Self::new(tag.into(), TransferDirection::Download, inner, listener)
    }

    /// Wrap a request body being written to the transport.
    pub fn upload(tag: impl Into<TransferTag>, inner: B, listener: Arc<L>) -> Self
    where
        B: StreamingBody,
    {
        Self::new(tag.into(), TransferDirection::Upload, inner, listener)
    }

    fn new(tag: TransferTag, direction: TransferDirection, inner: B, listener: Arc<L>) -> Self
    where
        B: StreamingBody,
    {
        let mut tracker = ProgressTracker::new(tag, direction, listener);
        if inner.is_end_stream() {
            tracker.resolve_total(|| inner.size_hint().exact());
            tracker.finish();
        }
        Self { inner, tracker }
    }

    /// Use `total` as the total size of the transfer,
    /// instead of the exact size hint of the inner body.
    ///
    /// Has no effect on a body that was empty when wrapped.
    #[must_use]
    pub fn with_total_bytes(mut self, total: Option<u64>) -> Self {
        self.tracker.set_declared_total(total);
        self
    }

    /// Bytes transferred so far.
    pub fn transferred_bytes(&self) -> u64 {
        self.tracker.transferred()
    }

    /// Get a reference to the inner body.
    pub fn get_ref(&self) -> &B {
        &self.inner
    }

    /// Consume `self`, returning the inner body.
    pub fn into_inner(self) -> B {
        self.inner
    }
}

impl<B, L> fmt::Debug for ProgressBody<B, L>
where
    B: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressBody")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<B, L> StreamingBody for ProgressBody<B, L>
where
    B: StreamingBody<Data: Buf>,
    L: ProgressListener,
{
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let mut this = self.project();
        let inner = &this.inner;
        this.tracker.resolve_total(|| inner.size_hint().exact());

        match ready!(this.inner.as_mut().poll_frame(cx)) {
            Some(Ok(frame)) => {
                if let Some(data) = frame.data_ref() {
                    this.tracker.record(data.remaining() as u64);
                }
                if this.inner.is_end_stream() {
                    this.tracker.finish();
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Some(Err(err)) => {
                this.tracker.fail();
                Poll::Ready(Some(Err(err)))
            }
            None => {
                this.tracker.finish();
                Poll::Ready(None)
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
