use super::{PathSpliceRewriter, RedirectService, RedirectTargets};
use detour_core::Layer;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Layer that applies the [`RedirectService`] middleware.
///
/// Clones of the layer, and all services it created,
/// share the same registry and default segment count.
#[derive(Debug, Clone)]
pub struct RedirectLayer<R = PathSpliceRewriter> {
    targets: RedirectTargets,
    default_ignore_segments: Arc<AtomicUsize>,
    rewriter: R,
}

impl RedirectLayer {
    /// Create a new [`RedirectLayer`] resolving target names with `targets`,
    /// using a [`PathSpliceRewriter`] with the default cache capacity.
    #[must_use]
    pub fn new(targets: RedirectTargets) -> Self {
        Self {
            targets,
            default_ignore_segments: Arc::new(AtomicUsize::new(0)),
            rewriter: PathSpliceRewriter::new(),
        }
    }
}

impl<R> RedirectLayer<R> {
    /// Use `rewriter` to compute the redirected uris.
    #[must_use]
    pub fn with_rewriter<T>(self, rewriter: T) -> RedirectLayer<T> {
        RedirectLayer {
            targets: self.targets,
            default_ignore_segments: self.default_ignore_segments,
            rewriter,
        }
    }

    /// Set the amount of path segments dropped
    /// when a request does not specify it.
    #[must_use]
    pub fn with_default_ignore_segments(self, ignore_segments: usize) -> Self {
        self.set_default_ignore_segments(ignore_segments);
        self
    }

    /// Change the amount of path segments dropped
    /// when a request does not specify it.
    ///
    /// Applies to all services created by this layer,
    /// including those created before the change.
    pub fn set_default_ignore_segments(&self, ignore_segments: usize) -> &Self {
        self.default_ignore_segments
            .store(ignore_segments, Ordering::Release);
        self
    }

    /// The amount of path segments dropped
    /// when a request does not specify it.
    #[must_use]
    pub fn default_ignore_segments(&self) -> usize {
        self.default_ignore_segments.load(Ordering::Acquire)
    }

    /// The registry this layer resolves target names with.
    #[must_use]
    pub fn targets(&self) -> &RedirectTargets {
        &self.targets
    }

    /// The rewrite strategy of this layer.
    #[must_use]
    pub fn rewriter(&self) -> &R {
        &self.rewriter
    }
}

impl<S, R: Clone> Layer<S> for RedirectLayer<R> {
    type Service = RedirectService<S, R>;

    fn layer(&self, inner: S) -> Self::Service {
        RedirectService::new(
            inner,
            self.targets.clone(),
            self.default_ignore_segments.clone(),
            self.rewriter.clone(),
        )
    }

    fn into_layer(self, inner: S) -> Self::Service {
        RedirectService::new(
            inner,
            self.targets,
            self.default_ignore_segments,
            self.rewriter,
        )
    }
}
