use crate::{HeaderName, Request, request};
use detour_core::telemetry::tracing;
use std::fmt;

/// Header naming the [`RedirectTarget`] a request is to be redirected to.
///
/// Header names are case-insensitive, so `Url-Redirect` works as well.
///
/// [`RedirectTarget`]: super::RedirectTarget
pub const REDIRECT_TARGET_HEADER: HeaderName = HeaderName::from_static("url-redirect");

/// Header holding the amount of leading path segments
/// to drop from the request path while redirecting.
pub const REDIRECT_SEGMENTS_HEADER: HeaderName = HeaderName::from_static("url-pathsegmentssize");

/// Typed redirect declarations attached to a request as an extension.
///
/// Created through [`RequestRedirectExt`], read by [`RedirectDirective::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectDeclaration {
    targets: Vec<String>,
    ignore_segments: Option<usize>,
}

impl RedirectDeclaration {
    fn add_target(&mut self, name: String) {
        self.targets.push(name);
    }

    fn set_ignore_segments(&mut self, ignore_segments: usize) {
        self.ignore_segments = Some(ignore_segments);
    }
}

/// Extension trait to declare the redirect of a request while building it.
///
/// ```
/// use detour_http::Request;
/// use detour_http::layer::redirect::{RedirectDirective, RequestRedirectExt};
///
/// let req = Request::builder()
///     .uri("https://api.example.org/user/sss")
///     .with_redirect_target("foo")
///     .with_redirect_segments(1)
///     .body(())
///     .unwrap();
///
/// let directive = RedirectDirective::resolve(&req).unwrap();
/// assert_eq!(directive.target_name(), Some("foo"));
/// assert_eq!(directive.ignore_segments(), Some(1));
/// ```
pub trait RequestRedirectExt: Sized {
    /// Redirect the request to the target registered under `name`.
    #[must_use]
    fn with_redirect_target(self, name: impl Into<String>) -> Self;

    /// Drop the first `ignore_segments` path segments while redirecting.
    #[must_use]
    fn with_redirect_segments(self, ignore_segments: usize) -> Self;
}

impl RequestRedirectExt for request::Builder {
    fn with_redirect_target(self, name: impl Into<String>) -> Self {
        let mut declaration = current_declaration(&self);
        declaration.add_target(name.into());
        self.extension(declaration)
    }

    fn with_redirect_segments(self, ignore_segments: usize) -> Self {
        let mut declaration = current_declaration(&self);
        declaration.set_ignore_segments(ignore_segments);
        self.extension(declaration)
    }
}

fn current_declaration(builder: &request::Builder) -> RedirectDeclaration {
    builder
        .extensions_ref()
        .and_then(|ext| ext.get::<RedirectDeclaration>())
        .cloned()
        .unwrap_or_default()
}

impl<B> RequestRedirectExt for Request<B> {
    fn with_redirect_target(mut self, name: impl Into<String>) -> Self {
        declaration_mut(&mut self).add_target(name.into());
        self
    }

    fn with_redirect_segments(mut self, ignore_segments: usize) -> Self {
        declaration_mut(&mut self).set_ignore_segments(ignore_segments);
        self
    }
}

fn declaration_mut<B>(req: &mut Request<B>) -> &mut RedirectDeclaration {
    req.extensions_mut()
        .get_or_insert_default::<RedirectDeclaration>()
}

/// The redirect a request asks for, resolved from its typed declarations
/// and its [`REDIRECT_TARGET_HEADER`] and [`REDIRECT_SEGMENTS_HEADER`] headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectDirective {
    target: Option<String>,
    ignore_segments: Option<usize>,
}

impl RedirectDirective {
    /// Resolve the redirect directive of `req`.
    ///
    /// Typed declarations and target headers are counted together:
    /// more than one declared target is an [`AmbiguousDirective`].
    /// Empty and non-textual target names are ignored.
    ///
    /// A typed segment count wins over the header. Header values that
    /// are not a non-negative integer, or that disagree with each other,
    /// are ignored so that the default segment count applies.
    pub fn resolve<B>(req: &Request<B>) -> Result<Self, AmbiguousDirective> {
        let declaration = req.extensions().get::<RedirectDeclaration>();

        let mut targets: Vec<&str> = declaration
            .map(|declaration| declaration.targets.iter().map(String::as_str).collect())
            .unwrap_or_default();
        for value in req.headers().get_all(&REDIRECT_TARGET_HEADER) {
            match value.to_str() {
                Ok(name) => targets.push(name.trim()),
                Err(_) => tracing::trace!("ignore non-textual {REDIRECT_TARGET_HEADER} header"),
            }
        }
        targets.retain(|name| !name.is_empty());

        let target = match targets.as_slice() {
            [] => None,
            [name] => Some((*name).to_owned()),
            names => {
                return Err(AmbiguousDirective {
                    targets: names.iter().map(|name| (*name).to_owned()).collect(),
                });
            }
        };

        let ignore_segments = declaration
            .and_then(|declaration| declaration.ignore_segments)
            .or_else(|| header_ignore_segments(req));

        Ok(Self {
            target,
            ignore_segments,
        })
    }

    /// The name of the requested target, if any.
    #[must_use]
    pub fn target_name(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// The requested amount of path segments to drop, if any.
    #[must_use]
    pub fn ignore_segments(&self) -> Option<usize> {
        self.ignore_segments
    }
}

fn header_ignore_segments<B>(req: &Request<B>) -> Option<usize> {
    let mut resolved = None;
    for value in req.headers().get_all(&REDIRECT_SEGMENTS_HEADER) {
        let Some(count) = value
            .to_str()
            .ok()
            .and_then(|value| value.trim().parse::<usize>().ok())
        else {
            tracing::debug!(
                "ignore invalid {REDIRECT_SEGMENTS_HEADER} header value: {value:?}; use default"
            );
            return None;
        };
        match resolved {
            Some(previous) if previous != count => {
                tracing::debug!(
                    "conflicting {REDIRECT_SEGMENTS_HEADER} header values ({previous} and {count}); use default"
                );
                return None;
            }
            _ => resolved = Some(count),
        }
    }
    resolved
}

/// Remove all redirect declarations from `req`, typed and header based.
///
/// Returns true if anything was removed.
pub fn strip_redirect_declarations<B>(req: &mut Request<B>) -> bool {
    let typed = req.extensions_mut().remove::<RedirectDeclaration>().is_some();
    let target = req.headers_mut().remove(&REDIRECT_TARGET_HEADER).is_some();
    let segments = req.headers_mut().remove(&REDIRECT_SEGMENTS_HEADER).is_some();
    typed || target || segments
}

/// Error returned when a request declares more than one redirect target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousDirective {
    targets: Vec<String>,
}

impl AmbiguousDirective {
    /// All target names the request declared.
    #[must_use]
    pub fn targets(&self) -> &[String] {
        &self.targets
    }
}

impl fmt::Display for AmbiguousDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ambiguous redirect directive: {} targets declared ({})",
            self.targets.len(),
            self.targets.join(", ")
        )
    }
}

impl std::error::Error for AmbiguousDirective {}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> request::Builder {
        Request::builder().uri("https://api.example.org/user/sss")
    }

    #[test]
    fn no_directive() {
        let req = request().body(()).unwrap();
        assert_eq!(RedirectDirective::resolve(&req).unwrap(), RedirectDirective::default());
    }

    #[test]
    fn header_directive() {
        let req = request()
            .header("Url-Redirect", "foo")
            .header("Url-PathSegmentsSize", " 2 ")
            .body(())
            .unwrap();
        let directive = RedirectDirective::resolve(&req).unwrap();
        assert_eq!(directive.target_name(), Some("foo"));
        assert_eq!(directive.ignore_segments(), Some(2));
    }

    #[test]
    fn typed_directive_on_request() {
        let req = request()
            .body(())
            .unwrap()
            .with_redirect_target("foo")
            .with_redirect_segments(0);
        let directive = RedirectDirective::resolve(&req).unwrap();
        assert_eq!(directive.target_name(), Some("foo"));
        assert_eq!(directive.ignore_segments(), Some(0));
    }

    #[test]
    fn typed_segments_win_over_header() {
        let req = request()
            .header(REDIRECT_SEGMENTS_HEADER, "3")
            .with_redirect_target("foo")
            .with_redirect_segments(1)
            .body(())
            .unwrap();
        assert_eq!(RedirectDirective::resolve(&req).unwrap().ignore_segments(), Some(1));
    }

    #[test]
    fn multiple_targets_are_ambiguous() {
        let test_cases = [
            request()
                .header(REDIRECT_TARGET_HEADER, "foo")
                .header(REDIRECT_TARGET_HEADER, "bar")
                .body(())
                .unwrap(),
            request()
                .header(REDIRECT_TARGET_HEADER, "foo")
                .header(REDIRECT_TARGET_HEADER, "foo")
                .body(())
                .unwrap(),
            request()
                .header(REDIRECT_TARGET_HEADER, "foo")
                .with_redirect_target("bar")
                .body(())
                .unwrap(),
            request()
                .with_redirect_target("foo")
                .with_redirect_target("bar")
                .body(())
                .unwrap(),
        ];
        for req in test_cases {
            let err = RedirectDirective::resolve(&req).unwrap_err();
            assert_eq!(err.targets().len(), 2, "request: {req:?}");
        }
    }

    #[test]
    fn empty_target_is_no_target() {
        let req = request()
            .header(REDIRECT_TARGET_HEADER, "")
            .body(())
            .unwrap();
        assert_eq!(RedirectDirective::resolve(&req).unwrap().target_name(), None);
    }

    #[test]
    fn invalid_segment_headers_fall_back_to_default() {
        for values in [
            &["-1"][..],
            &["abc"][..],
            &["1", "2"][..],
            &["1", "x"][..],
        ] {
            let mut builder = request().header(REDIRECT_TARGET_HEADER, "foo");
            for value in values {
                builder = builder.header(REDIRECT_SEGMENTS_HEADER, *value);
            }
            let req = builder.body(()).unwrap();
            let directive = RedirectDirective::resolve(&req).unwrap();
            assert_eq!(directive.target_name(), Some("foo"));
            assert_eq!(directive.ignore_segments(), None, "values: {values:?}");
        }
    }

    #[test]
    fn repeated_equal_segment_headers() {
        let req = request()
            .header(REDIRECT_SEGMENTS_HEADER, "2")
            .header(REDIRECT_SEGMENTS_HEADER, "2")
            .body(())
            .unwrap();
        assert_eq!(RedirectDirective::resolve(&req).unwrap().ignore_segments(), Some(2));
    }

    #[test]
    fn strip_removes_all_declarations() {
        let mut req = request()
            .header(REDIRECT_TARGET_HEADER, "foo")
            .header(REDIRECT_SEGMENTS_HEADER, "1")
            .header("x-other", "kept")
            .with_redirect_target("foo")
            .body(())
            .unwrap();
        assert!(strip_redirect_declarations(&mut req));
        assert!(!req.headers().contains_key(REDIRECT_TARGET_HEADER));
        assert!(!req.headers().contains_key(REDIRECT_SEGMENTS_HEADER));
        assert!(req.extensions().get::<RedirectDeclaration>().is_none());
        assert_eq!(req.headers()["x-other"], "kept");

        assert!(!strip_redirect_declarations(&mut req));
    }
}
