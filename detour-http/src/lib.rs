//! Http middleware for detour.
//!
//! Two families of layers live here:
//!
//! - [`layer::redirect`]: rewrite outgoing requests towards a named, runtime
//!   configurable base URL, keeping (part of) the original path;
//! - [`layer::progress`]: wrap request and response bodies so that observers
//!   get [`TransferProgress`] snapshots while bytes flow.
//!
//! On top of that [`service::download`] offers a small file downloader
//! that reports its progress through the same listener machinery.
//!
//! [`TransferProgress`]: layer::progress::TransferProgress

#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg))]
#![cfg_attr(test, allow(clippy::float_cmp))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

pub mod body;
pub use body::Body;

pub mod layer;
pub mod service;

#[doc(inline)]
pub use ::http::{
    HeaderMap, HeaderName, HeaderValue, Method, Request, Response, StatusCode, Uri, header,
    request, response, uri,
};
