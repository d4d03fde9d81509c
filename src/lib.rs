//! 🧭 detour is a set of http client middleware for the 🦀 Rust language,
//! to be plugged in front of whatever transport your application uses.
//!
//! | category | support list |
//! |-|-|
//! | ✅ [service] | ✅ [Service] ⸱ ✅ [Layer] ⸱ ✅ [dyn dispatch](crate::service::BoxService) ⸱ ✅ [fn services](crate::service::service_fn) |
//! | ✅ redirect | ✅ named targets ⸱ ✅ typed and header directives ⸱ ✅ path splicing ⸱ ✅ bounded path cache |
//! | ✅ progress | ✅ download bodies ⸱ ✅ upload bodies ⸱ ✅ async writers ⸱ ✅ broadcast listeners ⸱ ✅ file downloads |
//! | ✅ utilities | ✅ [error handling](crate::error) ⸱ ✅ [weighted LRU cache](crate::utils::collections::LruCache) ⸱ ✅ [tracing](crate::telemetry) |
//!
//! The http middleware is available behind the `http` feature.
//!
//! ## Redirect
//!
//! Requests declare the name of a target, typed or via the `Url-Redirect` header.
//! The redirect layer swaps scheme, host and port for the ones of the
//! registered target, and splices the target base path in front of the
//! request path, optionally dropping a couple of leading request path segments
//! (`Url-PathSegmentsSize`). Targets can be changed at any time.
//!
//! ## Progress
//!
//! Request and response bodies can be wrapped so that listeners receive
//! byte counts, the expected total, a percentage and a done or failure
//! state while bytes flow, without buffering the body.
//!
//! ## Example
//!
//! ```
//! # #[cfg(feature = "http")]
//! # mod example {
//! use detour::http::layer::progress::{DownloadProgressLayer, ProgressBroadcast};
//! use detour::http::layer::redirect::{RedirectLayer, RedirectTargets};
//! use detour::http::{Body, Request, Response};
//! use detour::{Layer, Service, service::service_fn};
//! use std::convert::Infallible;
//!
//! pub fn client() -> (RedirectTargets, impl Service<Request<Body>>) {
//!     let targets = RedirectTargets::new();
//!     let progress = ProgressBroadcast::default();
//!
//!     let client = (
//!         RedirectLayer::new(targets.clone()),
//!         DownloadProgressLayer::new(progress),
//!     )
//!         .into_layer(service_fn(|_req: Request<Body>| async move {
//!             Ok::<_, Infallible>(Response::new(Body::empty()))
//!         }));
//!
//!     (targets, client)
//! }
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg))]
#![cfg_attr(test, allow(clippy::float_cmp))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

#[doc(inline)]
pub use ::detour_core::{Layer, Service};

pub mod error {
    //! Error utilities for detour and its users.

    #[doc(inline)]
    pub use ::detour_core::error::*;
}

pub mod service {
    //! Service type and utilities.

    #[doc(inline)]
    pub use ::detour_core::service::*;
}

pub mod layer {
    //! Layer type and utilities.

    #[doc(inline)]
    pub use ::detour_core::layer::*;
}

pub mod telemetry {
    //! Telemetry modules, re-exported from the detour core.

    #[doc(inline)]
    pub use ::detour_core::telemetry::*;
}

pub mod utils {
    //! Utilities in service of the `detour` crates.

    #[doc(inline)]
    pub use ::detour_utils::*;
}

#[cfg(feature = "http")]
pub mod http {
    //! Http middleware: redirect rewriting and transfer progress.

    #[doc(inline)]
    pub use ::detour_http::*;
}
