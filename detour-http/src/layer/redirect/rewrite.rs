use super::RedirectTarget;
use detour_core::error::BoxError;
use detour_core::telemetry::tracing;
use detour_utils::collections::LruCache;
use http::Uri;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Strategy used by the [`RedirectService`] to compute the redirected [`Uri`].
///
/// The default strategy is the [`PathSpliceRewriter`].
///
/// [`RedirectService`]: super::RedirectService
pub trait UriRewrite: Send + Sync + 'static {
    /// Rewrite `uri` so that it points to `target`,
    /// dropping the first `ignore_segments` path segments of `uri`.
    fn rewrite_uri(
        &self,
        uri: &Uri,
        target: &RedirectTarget,
        ignore_segments: usize,
    ) -> Result<Uri, BoxError>;
}

impl<R> UriRewrite for Arc<R>
where
    R: UriRewrite,
{
    fn rewrite_uri(
        &self,
        uri: &Uri,
        target: &RedirectTarget,
        ignore_segments: usize,
    ) -> Result<Uri, BoxError> {
        (**self).rewrite_uri(uri, target, ignore_segments)
    }
}

/// Hit and miss counters of the path cache of a [`PathSpliceRewriter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Rewrites answered from the cache.
    pub hits: u64,
    /// Rewrites that had to compute the path.
    pub misses: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PathRewriteKey {
    original_path: String,
    base_path: String,
    ignore_segments: usize,
}

/// The default [`UriRewrite`] strategy.
///
/// The target's base path segments are followed by the original
/// path segments minus the first `ignore_segments` ones.
/// Scheme, host and port come from the target,
/// the query of the original request is kept as is.
///
/// Computed paths are memoized in a shared, bounded LRU cache.
/// Clones of a rewriter share that cache.
///
/// ```
/// use detour_http::layer::redirect::{PathSpliceRewriter, RedirectTarget};
/// use detour_http::Uri;
///
/// let rewriter = PathSpliceRewriter::new();
/// let target: RedirectTarget = "https://example.com/test1/list/".parse().unwrap();
/// let uri: Uri = "https://api.example.org/user/sss?page=2".parse().unwrap();
///
/// let uri = rewriter.rewrite(&uri, &target, 1).unwrap();
/// assert_eq!(uri, "https://example.com/test1/list/sss?page=2");
/// ```
#[derive(Debug, Clone)]
pub struct PathSpliceRewriter {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    cache: LruCache<PathRewriteKey, Arc<str>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for PathSpliceRewriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PathSpliceRewriter {
    /// Capacity of the path cache of [`PathSpliceRewriter::new`].
    pub const DEFAULT_CACHE_CAPACITY: usize = 100;

    /// Create a new [`PathSpliceRewriter`] with the default cache capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_cache_capacity(Self::DEFAULT_CACHE_CAPACITY)
    }

    /// Create a new [`PathSpliceRewriter`] caching at most `capacity` paths.
    ///
    /// A `capacity` of `0` is replaced by [`Self::DEFAULT_CACHE_CAPACITY`].
    #[must_use]
    pub fn with_cache_capacity(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            Self::DEFAULT_CACHE_CAPACITY
        } else {
            capacity
        };
        Self {
            inner: Arc::new(Inner {
                cache: LruCache::new(capacity),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
            }),
        }
    }

    /// Current hit and miss counters of the path cache.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
        }
    }

    /// Amount of paths currently cached.
    #[must_use]
    pub fn cached_paths(&self) -> usize {
        self.inner.cache.len()
    }

    /// Maximum amount of paths the cache currently holds.
    #[must_use]
    pub fn cache_capacity(&self) -> usize {
        self.inner.cache.capacity()
    }

    /// Rescale the path cache to `multiplier` times its initial capacity.
    ///
    /// Paths that no longer fit are evicted, least recently used first.
    pub fn set_cache_capacity_multiplier(&self, multiplier: f64) {
        self.inner.cache.set_capacity_multiplier(multiplier);
    }

    /// Drop all cached paths.
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    /// Rewrite `uri` so that it points to `target`,
    /// dropping the first `ignore_segments` path segments of `uri`.
    ///
    /// Fails with [`SegmentCountOutOfRange`] when `uri` does not have more
    /// than `ignore_segments` path segments, leaving the cache untouched.
    pub fn rewrite(
        &self,
        uri: &Uri,
        target: &RedirectTarget,
        ignore_segments: usize,
    ) -> Result<Uri, BoxError> {
        let path = self.spliced_path(uri.path(), target, ignore_segments)?;

        let path_and_query = match uri.query() {
            Some(query) => format!("{path}?{query}"),
            None => path.as_ref().to_owned(),
        };

        Ok(Uri::builder()
            .scheme(target.scheme().clone())
            .authority(target.authority().clone())
            .path_and_query(path_and_query)
            .build()?)
    }

    fn spliced_path(
        &self,
        original_path: &str,
        target: &RedirectTarget,
        ignore_segments: usize,
    ) -> Result<Arc<str>, SegmentCountOutOfRange> {
        let segment_count = path_segments(original_path).count();
        if ignore_segments >= segment_count {
            return Err(SegmentCountOutOfRange {
                path: original_path.to_owned(),
                segment_count,
                ignore_segments,
            });
        }

        let key = PathRewriteKey {
            original_path: original_path.to_owned(),
            base_path: target.encoded_base_path().to_owned(),
            ignore_segments,
        };

        if let Some(path) = self.inner.cache.get(&key) {
            self.inner.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("path cache hit for '{original_path}' -> '{path}'");
            return Ok(path);
        }
        self.inner.misses.fetch_add(1, Ordering::Relaxed);

        let path: Arc<str> =
            splice_path(original_path, target.base_path_segments(), ignore_segments)?.into();
        tracing::trace!("path cache miss for '{original_path}', computed '{path}'");

        if !self.inner.cache.contains_key(&key) {
            self.inner.cache.put(key, path.clone());
        }
        Ok(path)
    }
}

impl UriRewrite for PathSpliceRewriter {
    fn rewrite_uri(
        &self,
        uri: &Uri,
        target: &RedirectTarget,
        ignore_segments: usize,
    ) -> Result<Uri, BoxError> {
        self.rewrite(uri, target, ignore_segments)
    }
}

/// Split an encoded path into its segments.
///
/// The leading `/` is not a segment, a trailing `/` yields an empty last segment
/// and there is always at least one segment.
pub(super) fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.strip_prefix('/').unwrap_or(path).split('/')
}

fn splice_path(
    original_path: &str,
    base_segments: &[String],
    ignore_segments: usize,
) -> Result<String, SegmentCountOutOfRange> {
    let original_segments: Vec<&str> = path_segments(original_path).collect();
    if ignore_segments >= original_segments.len() {
        return Err(SegmentCountOutOfRange {
            path: original_path.to_owned(),
            segment_count: original_segments.len(),
            ignore_segments,
        });
    }

    let mut segments: Vec<&str> =
        Vec::with_capacity(base_segments.len() + original_segments.len() - ignore_segments);
    for segment in base_segments
        .iter()
        .map(String::as_str)
        .chain(original_segments[ignore_segments..].iter().copied())
    {
        // an empty last segment is a trailing slash, it makes room for the next one
        if segments.last().is_some_and(|last| last.is_empty()) {
            segments.pop();
        }
        segments.push(segment);
    }

    let mut path = String::with_capacity(original_path.len() + base_segments.len() * 8);
    for segment in segments {
        path.push('/');
        path.push_str(segment);
    }
    Ok(path)
}

/// Error returned when a request path does not have enough segments
/// to drop the requested amount of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentCountOutOfRange {
    path: String,
    segment_count: usize,
    ignore_segments: usize,
}

impl SegmentCountOutOfRange {
    /// The request path that was rewritten.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Amount of segments in that path.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    /// Amount of segments that were requested to be dropped.
    #[must_use]
    pub fn ignore_segments(&self) -> usize {
        self.ignore_segments
    }
}

impl fmt::Display for SegmentCountOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot ignore {} path segment(s) of '{}': it only has {}",
            self.ignore_segments, self.path, self.segment_count
        )
    }
}

impl std::error::Error for SegmentCountOutOfRange {}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(s: &str) -> RedirectTarget {
        s.parse().unwrap()
    }

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn segments_of_paths() {
        assert_eq!(path_segments("/").collect::<Vec<_>>(), [""]);
        assert_eq!(path_segments("/a/b").collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(path_segments("/a/b/").collect::<Vec<_>>(), ["a", "b", ""]);
    }

    #[test]
    fn splice_paths() {
        let test_cases = [
            ("/user/sss", "/test1/list/", 1, "/test1/list/sss"),
            ("/user/sss", "/test1/list/", 0, "/test1/list/user/sss"),
            ("/user/sss", "/", 1, "/sss"),
            ("/user/sss", "/", 0, "/user/sss"),
            ("/user/sss/", "/api", 1, "/api/sss/"),
            ("/", "/test1/list/", 0, "/test1/list/"),
            ("/a/b/c/d", "/base/", 3, "/base/d"),
            ("/a%20b/c", "/x%2Fy", 0, "/x%2Fy/a%20b/c"),
        ];
        for (original, base, ignore, expected) in test_cases {
            let base_segments: Vec<String> =
                path_segments(base).map(ToOwned::to_owned).collect();
            assert_eq!(
                splice_path(original, &base_segments, ignore).unwrap(),
                expected,
                "original: {original}, base: {base}, ignore: {ignore}",
            );
        }
    }

    #[test]
    fn rewrite_keeps_query_and_uses_target_authority() {
        let rewriter = PathSpliceRewriter::new();
        let rewritten = rewriter
            .rewrite(
                &uri("http://localhost/user/sss?q=1&b=%20"),
                &target("https://example.com:8443/test1/list/"),
                1,
            )
            .unwrap();
        assert_eq!(rewritten, "https://example.com:8443/test1/list/sss?q=1&b=%20");
    }

    #[test]
    fn rewrite_out_of_range_leaves_cache_untouched() {
        let rewriter = PathSpliceRewriter::new();
        let err = rewriter
            .rewrite(&uri("http://localhost/user/sss"), &target("https://example.com"), 2)
            .unwrap_err();

        let err = err.downcast_ref::<SegmentCountOutOfRange>().unwrap();
        assert_eq!(err.segment_count(), 2);
        assert_eq!(err.ignore_segments(), 2);
        assert_eq!(err.path(), "/user/sss");
        assert_eq!(rewriter.cached_paths(), 0);
        assert_eq!(rewriter.cache_stats(), CacheStats::default());

        rewriter
            .rewrite(&uri("http://localhost/user/sss"), &target("https://example.com"), 1)
            .unwrap();
        assert!(
            rewriter
                .rewrite(&uri("http://localhost/user/sss"), &target("https://example.com"), 5)
                .is_err()
        );
        assert_eq!(rewriter.cache_stats(), CacheStats { hits: 0, misses: 1 });
    }

    #[test]
    fn rewrite_is_memoized() {
        let rewriter = PathSpliceRewriter::new();
        let target = target("https://example.com/test1/list/");

        let first = rewriter
            .rewrite(&uri("http://localhost/user/sss"), &target, 1)
            .unwrap();
        assert_eq!(rewriter.cache_stats(), CacheStats { hits: 0, misses: 1 });

        let second = rewriter
            .rewrite(&uri("http://localhost/user/sss?page=3"), &target, 1)
            .unwrap();
        assert_eq!(rewriter.cache_stats(), CacheStats { hits: 1, misses: 1 });
        assert_eq!(first.path(), second.path());
        assert_eq!(second.query(), Some("page=3"));

        rewriter
            .rewrite(&uri("http://localhost/user/sss"), &target, 0)
            .unwrap();
        assert_eq!(rewriter.cache_stats(), CacheStats { hits: 1, misses: 2 });
        assert_eq!(rewriter.cached_paths(), 2);

        rewriter.clear_cache();
        assert_eq!(rewriter.cached_paths(), 0);
    }

    #[test]
    fn cache_is_bounded() {
        let rewriter = PathSpliceRewriter::with_cache_capacity(2);
        let target = target("https://example.com/");
        for path in ["/a/1", "/a/2", "/a/3"] {
            rewriter
                .rewrite(&uri(&format!("http://localhost{path}")), &target, 1)
                .unwrap();
        }
        assert_eq!(rewriter.cached_paths(), 2);

        rewriter.set_cache_capacity_multiplier(0.5);
        assert_eq!(rewriter.cached_paths(), 1);
    }

    #[test]
    fn clones_share_the_cache() {
        let rewriter = PathSpliceRewriter::new();
        let clone = rewriter.clone();
        rewriter
            .rewrite(&uri("http://localhost/a/b"), &target("https://example.com"), 1)
            .unwrap();
        clone
            .rewrite(&uri("http://localhost/a/b"), &target("https://example.com"), 1)
            .unwrap();
        assert_eq!(clone.cache_stats(), CacheStats { hits: 1, misses: 1 });
    }
}
