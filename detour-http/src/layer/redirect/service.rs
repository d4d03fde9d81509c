use super::{
    PathSpliceRewriter, RedirectDirective, RedirectTargets, UriRewrite,
    strip_redirect_declarations,
};
use crate::Request;
use detour_core::error::BoxError;
use detour_core::{Service, telemetry::tracing};
use detour_utils::macros::define_inner_service_accessors;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Service which redirects requests to a registered [`RedirectTarget`].
///
/// See the [module docs](super) for more information.
///
/// [`RedirectTarget`]: super::RedirectTarget
pub struct RedirectService<S, R = PathSpliceRewriter> {
    inner: S,
    targets: RedirectTargets,
    default_ignore_segments: Arc<AtomicUsize>,
    rewriter: R,
}

impl<S, R> fmt::Debug for RedirectService<S, R>
where
    S: fmt::Debug,
    R: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedirectService")
            .field("inner", &self.inner)
            .field("targets", &self.targets)
            .field("default_ignore_segments", &self.default_ignore_segments)
            .field("rewriter", &self.rewriter)
            .finish()
    }
}

impl<S, R> Clone for RedirectService<S, R>
where
    S: Clone,
    R: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            targets: self.targets.clone(),
            default_ignore_segments: self.default_ignore_segments.clone(),
            rewriter: self.rewriter.clone(),
        }
    }
}

impl<S, R> RedirectService<S, R> {
    pub(super) fn new(
        inner: S,
        targets: RedirectTargets,
        default_ignore_segments: Arc<AtomicUsize>,
        rewriter: R,
    ) -> Self {
        Self {
            inner,
            targets,
            default_ignore_segments,
            rewriter,
        }
    }

    define_inner_service_accessors!();

    /// The registry this service resolves target names with.
    #[must_use]
    pub fn targets(&self) -> &RedirectTargets {
        &self.targets
    }

    /// The [`UriRewrite`] strategy used by this service.
    #[must_use]
    pub fn rewriter(&self) -> &R {
        &self.rewriter
    }

    /// The amount of path segments dropped
    /// when a request does not specify it.
    #[must_use]
    pub fn default_ignore_segments(&self) -> usize {
        self.default_ignore_segments.load(Ordering::Acquire)
    }
}

impl<ReqBody, S, R> Service<Request<ReqBody>> for RedirectService<S, R>
where
    S: Service<Request<ReqBody>, Error: Into<BoxError>>,
    R: UriRewrite,
    ReqBody: Send + 'static,
{
    type Output = S::Output;
    type Error = BoxError;

    async fn serve(&self, mut req: Request<ReqBody>) -> Result<Self::Output, Self::Error> {
        let directive = RedirectDirective::resolve(&req)?;
        strip_redirect_declarations(&mut req);

        if let Some(name) = directive.target_name() {
            match self.targets.resolve(name) {
                Some(target) => {
                    let ignore_segments = directive
                        .ignore_segments()
                        .unwrap_or_else(|| self.default_ignore_segments());
                    let uri = self
                        .rewriter
                        .rewrite_uri(req.uri(), &target, ignore_segments)?;
                    tracing::debug!(
                        "redirect request via target '{name}': {} -> {uri}",
                        req.uri()
                    );
                    *req.uri_mut() = uri;
                }
                None => {
                    tracing::warn!(
                        "redirect target '{name}' is not registered; send request to {} as is",
                        req.uri()
                    );
                }
            }
        }

        self.inner.serve(req).await.map_err(Into::into)
    }
}
