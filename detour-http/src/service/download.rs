//! Download a resource to a file, reporting its progress.

use crate::body::StreamingBody;
use crate::body::util::BodyExt;
use crate::layer::progress::tracker::ProgressTracker;
use crate::layer::progress::{ProgressListener, TransferDirection, TransferTag, content_length};
use crate::{Body, Request, Response};
use bytes::Buf;
use detour_core::error::{BoxError, ErrorContext, OpaqueError};
use detour_core::{Service, telemetry::tracing};
use detour_utils::macros::define_inner_service_accessors;
use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Downloads resources to files, using the inner [`Service`] as transport.
///
/// Progress is counted in bytes persisted to the file, tagged with the
/// requested url. Every download ends with exactly one done or failure
/// snapshot, also when the request never got a response.
pub struct FileDownloader<S, L> {
    inner: S,
    listener: Arc<L>,
}

impl<S, L> FileDownloader<S, L> {
    /// Create a new [`FileDownloader`] reporting to `listener`.
    pub fn new(inner: S, listener: L) -> Self {
        Self {
            inner,
            listener: Arc::new(listener),
        }
    }

    /// Create a new [`FileDownloader`] reporting to a shared `listener`.
    pub fn from_shared(inner: S, listener: Arc<L>) -> Self {
        Self { inner, listener }
    }

    define_inner_service_accessors!();
}

impl<S: fmt::Debug, L> fmt::Debug for FileDownloader<S, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileDownloader")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<S: Clone, L> Clone for FileDownloader<S, L> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            listener: self.listener.clone(),
        }
    }
}

impl<S, L, ResBody> FileDownloader<S, L>
where
    S: Service<Request<Body>, Output = Response<ResBody>, Error: Into<BoxError>>,
    L: ProgressListener,
    ResBody: StreamingBody<Data: Buf + Send, Error: Into<BoxError>> + Send + 'static,
{
    /// Download `url` into the file at `path`, returning the amount of bytes written.
    ///
    /// An existing file at `path` is replaced. A response with
    /// a non-success status is an error, leaving no file behind.
    pub async fn download(&self, url: &str, path: impl AsRef<Path>) -> Result<u64, BoxError> {
        let path = path.as_ref();
        let mut tracker = ProgressTracker::new(
            TransferTag::new(url),
            TransferDirection::Download,
            self.listener.clone(),
        );

        match self.try_download(url, path, &mut tracker).await {
            Ok(written) => {
                tracker.finish();
                tracing::debug!("downloaded '{url}' to {} ({written} bytes)", path.display());
                Ok(written)
            }
            Err(err) => {
                tracker.fail();
                tracing::debug!("download of '{url}' to {} failed: {err}", path.display());
                Err(err)
            }
        }
    }

    async fn try_download(
        &self,
        url: &str,
        path: &Path,
        tracker: &mut ProgressTracker<L>,
    ) -> Result<u64, BoxError> {
        let req = Request::get(url)
            .body(Body::empty())
            .with_context(|| format!("create download request for '{url}'"))?;
        let res = self.inner.serve(req).await.map_err(Into::into)?;
        write_response(res, path, tracker)
            .await
            .map_err(OpaqueError::into_boxed)
    }
}

async fn write_response<ResBody, L>(
    res: Response<ResBody>,
    path: &Path,
    tracker: &mut ProgressTracker<L>,
) -> Result<u64, OpaqueError>
where
    ResBody: StreamingBody<Data: Buf + Send, Error: Into<BoxError>> + Send,
    L: ProgressListener,
{
    if !res.status().is_success() {
        return Err(OpaqueError::from_display(format!(
            "unexpected response status {}",
            res.status()
        )));
    }
    let total = content_length(res.headers());
    tracker.set_declared_total(total);

    let body = res.into_body();
    tracker.resolve_total(|| body.size_hint().exact());

    remove_existing(path).await?;
    let mut file = File::create(path)
        .await
        .with_context(|| format!("create file {}", path.display()))?;

    let mut body = std::pin::pin!(body);
    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|err| OpaqueError::from_boxed(err.into()))?;
        let Ok(mut data) = frame.into_data() else {
            continue;
        };
        while data.has_remaining() {
            let chunk = data.chunk();
            let n = chunk.len();
            file.write_all(chunk)
                .await
                .with_context(|| format!("write to {}", path.display()))?;
            data.advance(n);
            tracker.record(n as u64);
        }
    }

    file.flush()
        .await
        .with_context(|| format!("flush {}", path.display()))?;
    Ok(tracker.transferred())
}

async fn remove_existing(path: &Path) -> Result<(), OpaqueError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::trace!("replace existing file {}", path.display());
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("remove existing file {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::CONTENT_LENGTH;
    use crate::layer::progress::{TransferProgress, TransferState};
    use crate::StatusCode;
    use detour_core::service::service_fn;
    use parking_lot::Mutex;

    #[derive(Clone, Default)]
    struct Collect(Arc<Mutex<Vec<TransferProgress>>>);

    impl ProgressListener for Collect {
        fn on_progress(&self, progress: &TransferProgress) {
            self.0.lock().push(progress.clone());
        }
    }

    impl Collect {
        fn states(&self) -> Vec<(u64, TransferState)> {
            self.0
                .lock()
                .iter()
                .map(|p| (p.transferred_bytes(), p.state()))
                .collect()
        }
    }

    fn chunked(chunks: Vec<Result<&'static str, io::Error>>) -> Body {
        Body::from_stream(futures::stream::iter(chunks))
    }

    #[tokio::test]
    async fn download_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.txt");
        tokio::fs::write(&path, "stale content that is longer").await.unwrap();

        let listener = Collect::default();
        let downloader = FileDownloader::new(
            service_fn(|_req: Request<Body>| async move {
                Ok::<_, BoxError>(
                    Response::builder()
                        .header(CONTENT_LENGTH, "10")
                        .body(chunked(vec![Ok("01234"), Ok("56789")]))
                        .unwrap(),
                )
            }),
            listener.clone(),
        );

        let written = downloader
            .download("https://example.com/file.txt", &path)
            .await
            .unwrap();
        assert_eq!(written, 10);
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "0123456789");
        assert_eq!(
            listener.states(),
            [
                (5, TransferState::InProgress),
                (10, TransferState::InProgress),
                (10, TransferState::Done),
            ]
        );
        let last = listener.0.lock().last().cloned().unwrap();
        assert_eq!(last.tag().as_str(), "https://example.com/file.txt");
        assert_eq!(last.percent(), 100.0);
    }

    #[tokio::test]
    async fn transport_error_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let listener = Collect::default();
        let downloader = FileDownloader::new(
            service_fn(|_req: Request<Body>| async move {
                Err::<Response<Body>, _>(BoxError::from("connection refused"))
            }),
            listener.clone(),
        );

        let err = downloader
            .download("https://example.com/file.txt", dir.path().join("file.txt"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "connection refused");
        assert_eq!(listener.states(), [(0, TransferState::Failed)]);
    }

    #[tokio::test]
    async fn body_error_reports_single_failure() {
        let dir = tempfile::tempdir().unwrap();
        let listener = Collect::default();
        let downloader = FileDownloader::new(
            service_fn(|_req: Request<Body>| async move {
                Ok::<_, BoxError>(Response::new(chunked(vec![
                    Ok("abc"),
                    Err(io::Error::other("reset by peer")),
                ])))
            }),
            listener.clone(),
        );

        let err = downloader
            .download("https://example.com/file.txt", dir.path().join("file.txt"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "reset by peer");
        assert_eq!(
            listener.states(),
            [(3, TransferState::InProgress), (3, TransferState::Failed)]
        );
    }

    #[tokio::test]
    async fn unsuccessful_status_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.txt");
        let listener = Collect::default();
        let downloader = FileDownloader::new(
            service_fn(|_req: Request<Body>| async move {
                Ok::<_, BoxError>(
                    Response::builder()
                        .status(StatusCode::NOT_FOUND)
                        .body(Body::from("not found"))
                        .unwrap(),
                )
            }),
            listener.clone(),
        );

        let err = downloader
            .download("https://example.com/file.txt", &path)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
        assert!(!path.exists());
        assert_eq!(listener.states(), [(0, TransferState::Failed)]);
    }

    #[tokio::test]
    async fn invalid_url_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let listener = Collect::default();
        let downloader = FileDownloader::new(
            service_fn(|_req: Request<Body>| async move {
                Ok::<_, BoxError>(Response::new(Body::empty()))
            }),
            listener.clone(),
        );

        let err = downloader
            .download("not a url", dir.path().join("file.txt"))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("create download request"));
        assert_eq!(listener.states(), [(0, TransferState::Failed)]);
    }
}
