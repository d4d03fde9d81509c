//! Http body utilities.

use bytes::Bytes;
use detour_core::error::BoxError;
use futures::TryStream;
use http_body_util::BodyExt;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use sync_wrapper::SyncWrapper;

#[doc(inline)]
pub use http_body::{Body as StreamingBody, Frame, SizeHint};

pub mod util {
    //! Utilities for working with [`StreamingBody`] types.
    //!
    //! [`StreamingBody`]: super::StreamingBody

    #[doc(inline)]
    pub use http_body_util::*;
}

type BoxBody = http_body_util::combinators::BoxBody<Bytes, BoxError>;

/// The body type used in detour requests and responses.
///
/// Any [`StreamingBody`] with [`Bytes`] frames can be turned into a [`Body`],
/// including the progress-instrumented bodies of this crate.
#[must_use]
#[derive(Debug)]
pub struct Body(BoxBody);

impl Body {
    /// Create a new `Body` that wraps another [`StreamingBody`].
    pub fn new<B>(body: B) -> Self
    where
        B: StreamingBody<Data = Bytes, Error: Into<BoxError>> + Send + Sync + 'static,
    {
        Self(body.map_err(Into::into).boxed())
    }

    /// Create an empty body.
    pub fn empty() -> Self {
        Self::new(http_body_util::Empty::new())
    }

    /// Create a new `Body` from a [`Stream`].
    ///
    /// [`Stream`]: futures::Stream
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: TryStream<Ok: Into<Bytes>, Error: Into<BoxError>> + Send + 'static,
    {
        Self::new(StreamBody {
            stream: SyncWrapper::new(stream),
        })
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

macro_rules! body_from_impl {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for Body {
                fn from(buf: $ty) -> Self {
                    Self::new(http_body_util::Full::from(buf))
                }
            }
        )+
    };
}

body_from_impl!(
    &'static [u8],
    std::borrow::Cow<'static, [u8]>,
    Vec<u8>,
    &'static str,
    std::borrow::Cow<'static, str>,
    String,
    Bytes,
);

impl StreamingBody for Body {
    type Data = Bytes;
    type Error = BoxError;

    #[inline]
    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.0).poll_frame(cx)
    }

    #[inline]
    fn size_hint(&self) -> SizeHint {
        self.0.size_hint()
    }

    #[inline]
    fn is_end_stream(&self) -> bool {
        self.0.is_end_stream()
    }
}

pin_project! {
    struct StreamBody<S> {
        #[pin]
        stream: SyncWrapper<S>,
    }
}

impl<S> StreamingBody for StreamBody<S>
where
    S: TryStream<Ok: Into<Bytes>, Error: Into<BoxError>>,
{
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        self.project()
            .stream
            .get_pin_mut()
            .try_poll_next(cx)
            .map(|item| {
                item.map(|chunk| chunk.map(|data| Frame::data(data.into())).map_err(Into::into))
            })
    }
}
