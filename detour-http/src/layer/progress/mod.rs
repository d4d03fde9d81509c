//! Transfer progress instrumentation.
//!
//! Response bodies are wrapped by the [`DownloadProgressLayer`],
//! request bodies by the [`UploadProgressLayer`]. Both wrap the body in a
//! [`ProgressBody`] which hands [`TransferProgress`] snapshots to a
//! [`ProgressListener`] while the body is polled. Any [`AsyncWrite`] sink
//! can be instrumented as an upload using a [`ProgressWriter`].
//!
//! A transfer reports zero or more in-progress snapshots with a
//! non-decreasing byte count, followed by at most one done or failure snapshot.
//! A transfer abandoned halfway (body dropped) reports no terminal snapshot.
//!
//! Listeners are plain closures, or a [`ProgressBroadcast`] to fan out
//! snapshots to any amount of subscribers, each filtering on the
//! [`TransferTag`] it is interested in.
//!
//! # Example
//!
//! ```
//! use detour_core::{Layer, Service, service::service_fn};
//! use detour_http::body::util::BodyExt;
//! use detour_http::layer::progress::{DownloadProgressLayer, ProgressBroadcast};
//! use detour_http::{Body, Request, Response};
//! use std::convert::Infallible;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let progress = ProgressBroadcast::default();
//! let mut updates = progress.subscribe();
//!
//! let svc = DownloadProgressLayer::new(progress).into_layer(service_fn(|_req: Request<Body>| async move {
//!     Ok::<_, Infallible>(Response::new(Body::from("hello")))
//! }));
//!
//! let res = svc
//!     .serve(Request::get("https://example.com/hello.txt").body(Body::empty()).unwrap())
//!     .await
//!     .unwrap();
//! res.into_body().collect().await.unwrap();
//!
//! let first = updates.recv().await.unwrap();
//! assert_eq!(first.tag().as_str(), "https://example.com/hello.txt");
//! assert_eq!(first.percent(), 100.0);
//! assert!(updates.recv().await.unwrap().is_done());
//! # }
//! ```
//!
//! [`AsyncWrite`]: tokio::io::AsyncWrite

mod snapshot;
#[doc(inline)]
pub use snapshot::{TransferDirection, TransferProgress, TransferState, TransferTag};

mod listener;
#[doc(inline)]
pub use listener::{ProgressBroadcast, ProgressListener};

pub(crate) mod tracker;

mod body;
#[doc(inline)]
pub use body::ProgressBody;

mod writer;
#[doc(inline)]
pub use writer::ProgressWriter;

mod layer;
pub(crate) use layer::content_length;
#[doc(inline)]
pub use layer::{DownloadProgress, DownloadProgressLayer, UploadProgress, UploadProgressLayer};
