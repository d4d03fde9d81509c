use super::{ProgressBody, ProgressListener, TransferTag};
use crate::body::StreamingBody;
use crate::{HeaderMap, Request, Response, header::CONTENT_LENGTH};
use detour_core::{Layer, Service, telemetry::tracing};
use detour_utils::macros::define_inner_service_accessors;
use std::fmt;
use std::sync::Arc;

/// The tag of the transfers of `req`: its [`TransferTag`] extension or its uri.
fn transfer_tag<B>(req: &Request<B>) -> TransferTag {
    req.extensions()
        .get::<TransferTag>()
        .cloned()
        .unwrap_or_else(|| TransferTag::from_uri(req.uri()))
}

pub(crate) fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// Layer that applies the [`DownloadProgress`] middleware.
pub struct DownloadProgressLayer<L> {
    listener: Arc<L>,
}

impl<L> DownloadProgressLayer<L> {
    /// Create a new [`DownloadProgressLayer`] reporting to `listener`.
    pub fn new(listener: L) -> Self {
        Self {
            listener: Arc::new(listener),
        }
    }

    /// Create a new [`DownloadProgressLayer`] reporting to a shared `listener`.
    pub fn from_shared(listener: Arc<L>) -> Self {
        Self { listener }
    }
}

impl<L> fmt::Debug for DownloadProgressLayer<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadProgressLayer").finish_non_exhaustive()
    }
}

impl<L> Clone for DownloadProgressLayer<L> {
    fn clone(&self) -> Self {
        Self {
            listener: self.listener.clone(),
        }
    }
}

impl<S, L> Layer<S> for DownloadProgressLayer<L> {
    type Service = DownloadProgress<S, L>;

    fn layer(&self, inner: S) -> Self::Service {
        DownloadProgress {
            inner,
            listener: self.listener.clone(),
        }
    }

    fn into_layer(self, inner: S) -> Self::Service {
        DownloadProgress {
            inner,
            listener: self.listener,
        }
    }
}

/// Middleware which wraps response bodies in a download [`ProgressBody`].
///
/// The total is taken from the `Content-Length` response header,
/// or the exact size hint of the body.
pub struct DownloadProgress<S, L> {
    inner: S,
    listener: Arc<L>,
}

impl<S, L> DownloadProgress<S, L> {
    define_inner_service_accessors!();
}

impl<S: fmt::Debug, L> fmt::Debug for DownloadProgress<S, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadProgress")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<S: Clone, L> Clone for DownloadProgress<S, L> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            listener: self.listener.clone(),
        }
    }
}

impl<ReqBody, ResBody, S, L> Service<Request<ReqBody>> for DownloadProgress<S, L>
where
    S: Service<Request<ReqBody>, Output = Response<ResBody>>,
    L: ProgressListener,
    ReqBody: Send + 'static,
    ResBody: StreamingBody + Send + 'static,
{
    type Output = Response<ProgressBody<ResBody, L>>;
    type Error = S::Error;

    async fn serve(&self, req: Request<ReqBody>) -> Result<Self::Output, Self::Error> {
        let tag = transfer_tag(&req);
        let res = self.inner.serve(req).await?;
        let total = content_length(res.headers());
        tracing::trace!("track download of '{tag}' ({}, {total:?} bytes)", res.status());
        let listener = self.listener.clone();
        Ok(res.map(|body| ProgressBody::download(tag, body, listener).with_total_bytes(total)))
    }
}

/// Layer that applies the [`UploadProgress`] middleware.
pub struct UploadProgressLayer<L> {
    listener: Arc<L>,
}

impl<L> UploadProgressLayer<L> {
    /// Create a new [`UploadProgressLayer`] reporting to `listener`.
    pub fn new(listener: L) -> Self {
        Self {
            listener: Arc::new(listener),
        }
    }

    /// Create a new [`UploadProgressLayer`] reporting to a shared `listener`.
    pub fn from_shared(listener: Arc<L>) -> Self {
        Self { listener }
    }
}

impl<L> fmt::Debug for UploadProgressLayer<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadProgressLayer").finish_non_exhaustive()
    }
}

impl<L> Clone for UploadProgressLayer<L> {
    fn clone(&self) -> Self {
        Self {
            listener: self.listener.clone(),
        }
    }
}

impl<S, L> Layer<S> for UploadProgressLayer<L> {
    type Service = UploadProgress<S, L>;

    fn layer(&self, inner: S) -> Self::Service {
        UploadProgress {
            inner,
            listener: self.listener.clone(),
        }
    }

    fn into_layer(self, inner: S) -> Self::Service {
        UploadProgress {
            inner,
            listener: self.listener,
        }
    }
}

/// Middleware which wraps request bodies in an upload [`ProgressBody`].
///
/// The total is taken from the `Content-Length` request header,
/// or the exact size hint of the body.
pub struct UploadProgress<S, L> {
    inner: S,
    listener: Arc<L>,
}

impl<S, L> UploadProgress<S, L> {
    define_inner_service_accessors!();
}

impl<S: fmt::Debug, L> fmt::Debug for UploadProgress<S, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadProgress")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<S: Clone, L> Clone for UploadProgress<S, L> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            listener: self.listener.clone(),
        }
    }
}

impl<ReqBody, S, L> Service<Request<ReqBody>> for UploadProgress<S, L>
where
    S: Service<Request<ProgressBody<ReqBody, L>>>,
    L: ProgressListener,
    ReqBody: StreamingBody + Send + 'static,
{
    type Output = S::Output;
    type Error = S::Error;

    fn serve(
        &self,
        req: Request<ReqBody>,
    ) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send + '_ {
        let tag = transfer_tag(&req);
        let total = content_length(req.headers());
        tracing::trace!("track upload of '{tag}' ({total:?} bytes)");
        let listener = self.listener.clone();
        let req = req.map(|body| ProgressBody::upload(tag, body, listener).with_total_bytes(total));
        self.inner.serve(req)
    }
}
