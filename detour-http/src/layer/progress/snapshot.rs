use crate::Uri;
use std::fmt;
use std::sync::Arc;

/// Identifier of a transfer, as seen by listeners.
///
/// Can be attached to a request as an extension to choose the tag
/// of its transfers, otherwise the request uri is used.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransferTag(Arc<str>);

impl TransferTag {
    /// Create a new [`TransferTag`].
    #[must_use]
    pub fn new(tag: impl AsRef<str>) -> Self {
        Self(tag.as_ref().into())
    }

    /// Create a [`TransferTag`] from the text of a [`Uri`].
    #[must_use]
    pub fn from_uri(uri: &Uri) -> Self {
        Self(uri.to_string().into())
    }

    /// View this tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransferTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransferTag {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TransferTag {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

impl From<&Uri> for TransferTag {
    fn from(value: &Uri) -> Self {
        Self::from_uri(value)
    }
}

/// The direction of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferDirection {
    /// Bytes read from a response body.
    Download,
    /// Bytes written to the transport, as a request body.
    Upload,
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Download => "download",
            Self::Upload => "upload",
        })
    }
}

/// The state of a transfer at the time of a [`TransferProgress`] snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferState {
    /// More bytes are expected.
    InProgress,
    /// The transfer completed.
    Done,
    /// The transfer failed.
    Failed,
}

/// Snapshot of a transfer, passed to [`ProgressListener`]s.
///
/// [`ProgressListener`]: super::ProgressListener
#[derive(Debug, Clone, PartialEq)]
pub struct TransferProgress {
    tag: TransferTag,
    direction: TransferDirection,
    transferred_bytes: u64,
    total_bytes: Option<u64>,
    state: TransferState,
}

impl TransferProgress {
    pub(crate) fn new(
        tag: TransferTag,
        direction: TransferDirection,
        transferred_bytes: u64,
        total_bytes: Option<u64>,
        state: TransferState,
    ) -> Self {
        Self {
            tag,
            direction,
            transferred_bytes,
            total_bytes,
            state,
        }
    }

    /// A snapshot reporting a transfer that failed before any byte was counted.
    #[must_use]
    pub fn failure(tag: TransferTag, direction: TransferDirection) -> Self {
        Self::new(tag, direction, 0, None, TransferState::Failed)
    }

    /// The tag of the transfer.
    #[must_use]
    pub fn tag(&self) -> &TransferTag {
        &self.tag
    }

    /// The direction of the transfer.
    #[must_use]
    pub fn direction(&self) -> TransferDirection {
        self.direction
    }

    /// Bytes transferred so far.
    #[must_use]
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes
    }

    /// Total bytes of the transfer, if known.
    #[must_use]
    pub fn total_bytes(&self) -> Option<u64> {
        self.total_bytes
    }

    /// Progress as a percentage within `[0, 100]`.
    ///
    /// `0` when the total is unknown or zero.
    #[must_use]
    pub fn percent(&self) -> f64 {
        match self.total_bytes {
            Some(total) if total > 0 => {
                (self.transferred_bytes as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
            }
            _ => 0.0,
        }
    }

    /// The state of the transfer.
    #[must_use]
    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Returns true if the transfer completed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state == TransferState::Done
    }

    /// Returns true if the transfer failed.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.state == TransferState::Failed
    }

    /// Returns true if no more snapshots follow for this transfer.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state != TransferState::InProgress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(transferred: u64, total: Option<u64>) -> TransferProgress {
        TransferProgress::new(
            "tag".into(),
            TransferDirection::Download,
            transferred,
            total,
            TransferState::InProgress,
        )
    }

    #[test]
    fn percent() {
        assert_eq!(progress(50, Some(200)).percent(), 25.0);
        assert_eq!(progress(200, Some(200)).percent(), 100.0);
        assert_eq!(progress(300, Some(200)).percent(), 100.0);
        assert_eq!(progress(10, Some(0)).percent(), 0.0);
        assert_eq!(progress(10, None).percent(), 0.0);
    }

    #[test]
    fn failure_snapshot() {
        let progress = TransferProgress::failure("x".into(), TransferDirection::Upload);
        assert!(progress.is_failure());
        assert!(progress.is_terminal());
        assert!(!progress.is_done());
        assert_eq!(progress.transferred_bytes(), 0);
        assert_eq!(progress.direction(), TransferDirection::Upload);
    }

    #[test]
    fn tag_from_uri() {
        let uri: Uri = "https://example.com/file.bin?v=1".parse().unwrap();
        assert_eq!(TransferTag::from(&uri).as_str(), "https://example.com/file.bin?v=1");
    }
}
