//! Redirect requests to named, runtime configurable, base urls.
//!
//! A request opts in by declaring the name of a [`RedirectTarget`],
//! either typed through [`RequestRedirectExt`] or with the
//! [`REDIRECT_TARGET_HEADER`] header. The [`RedirectService`] then:
//!
//! 1. resolves the [`RedirectDirective`] of the request;
//! 2. strips all redirect declarations, so they never reach the transport;
//! 3. looks up the target in its [`RedirectTargets`] registry;
//! 4. replaces the request [`Uri`] with the one computed by its [`UriRewrite`] strategy.
//!
//! A request naming a target that is not registered is sent unchanged.
//! A request naming more than one target fails with an [`AmbiguousDirective`] error.
//!
//! The amount of leading path segments dropped from the request path comes
//! from [`RequestRedirectExt::with_redirect_segments`], the
//! [`REDIRECT_SEGMENTS_HEADER`] header or the default of the [`RedirectLayer`].
//!
//! # Example
//!
//! ```
//! use detour_core::{Layer, Service, service::service_fn};
//! use detour_http::layer::redirect::{RedirectLayer, RedirectTargets, RequestRedirectExt};
//! use detour_http::{Request, Uri};
//! use std::convert::Infallible;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let targets = RedirectTargets::new();
//! targets.put("foo", "https://example.com/test1/list/").unwrap();
//!
//! let svc = RedirectLayer::new(targets)
//!     .into_layer(service_fn(|req: Request<()>| async move {
//!         Ok::<_, Infallible>(req.uri().clone())
//!     }));
//!
//! let req = Request::builder()
//!     .uri("https://api.example.org/user/sss")
//!     .with_redirect_target("foo")
//!     .with_redirect_segments(1)
//!     .body(())
//!     .unwrap();
//!
//! let uri: Uri = svc.serve(req).await.unwrap();
//! assert_eq!(uri, "https://example.com/test1/list/sss");
//! # }
//! ```
//!
//! [`Uri`]: crate::Uri

mod target;
#[doc(inline)]
pub use target::{InvalidRedirectTarget, RedirectTarget};

mod registry;
#[doc(inline)]
pub use registry::RedirectTargets;

mod directive;
#[doc(inline)]
pub use directive::{
    AmbiguousDirective, REDIRECT_SEGMENTS_HEADER, REDIRECT_TARGET_HEADER, RedirectDeclaration,
    RedirectDirective, RequestRedirectExt, strip_redirect_declarations,
};

mod rewrite;
#[doc(inline)]
pub use rewrite::{CacheStats, PathSpliceRewriter, SegmentCountOutOfRange, UriRewrite};

mod config;
#[doc(inline)]
pub use config::RedirectConfig;

mod layer;
#[doc(inline)]
pub use layer::RedirectLayer;

mod service;
#[doc(inline)]
pub use service::RedirectService;
