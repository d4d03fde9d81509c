//! `async fn serve(&self, Input) -> Result<Output, Error>`
//!
//! # detour service
//!
//! Heavily inspired by [tower-service](https://docs.rs/tower-service/0.3.0/tower_service/trait.Service.html)
//! and the vast [Tokio](https://docs.rs/tokio/latest/tokio/) ecosystem which makes use of it.
//!
//! A [`Service`] is the "proceed" step of an interceptor chain:
//! it takes a request and produces a response or an error.
//! A [`Layer`] wraps a [`Service`] into another [`Service`],
//! which is how the redirect and progress middleware of `detour` are attached
//! to whatever transport the host application uses.

#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg))]
#![cfg_attr(not(test), warn(clippy::print_stdout, clippy::dbg_macro))]

pub mod error;

pub mod service;
pub use service::Service;

pub mod layer;
pub use layer::Layer;

pub mod telemetry;
