use std::fmt;
use std::sync::Arc;

use super::progress::Progress;

/// Phases of a transfer.
///
/// Transfers move through these phases in order:
/// Connecting → Downloading → Verifying → Committing → Completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPhase {
    /// Request sent, waiting for the response head.
    #[default]
    Connecting,

    /// Streaming body bytes into the staging file.
    Downloading,

    /// Comparing the finalized digest and size against expectations.
    Verifying,

    /// Renaming the staging file onto the destination.
    Committing,

    /// Terminal state for successful transfers.
    Completed,
}

impl fmt::Display for FetchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchPhase::Connecting => write!(f, "Connecting"),
            FetchPhase::Downloading => write!(f, "Downloading"),
            FetchPhase::Verifying => write!(f, "Verifying"),
            FetchPhase::Committing => write!(f, "Committing"),
            FetchPhase::Completed => write!(f, "Completed"),
        }
    }
}

pub type ProgressCallback = Arc<dyn Fn(&Progress) + Send + Sync>;

/// Configuration for a single transfer.
///
/// # Examples
///
/// ```
/// use hypmirror_fetch::FetchOptions;
///
/// let options = FetchOptions::default()
///     .checksum(Some([0u8; 16]))
///     .expected_size(Some(1024))
///     .header("User-Agent", "hypmirror");
/// ```
#[derive(Clone)]
pub struct FetchOptions {
    /// Expected MD5 digest of the complete file.
    /// A mismatch discards the staging file and fails the transfer.
    pub checksum: Option<[u8; 16]>,

    /// Expected size of the complete file in bytes.
    pub expected_size: Option<u64>,

    /// Continue an existing staging file with a range request.
    ///
    /// Servers that ignore the range header answer `200`, in which case the
    /// staging file is truncated and the transfer restarts from zero.
    ///
    /// Default: true
    pub resume: bool,

    /// Extra headers sent with the body request.
    pub headers: Arc<[(String, String)]>,

    /// Invoked on phase transitions and after every chunk write.
    pub on_progress: Option<ProgressCallback>,
}

impl fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("checksum", &self.checksum.map(hex::encode))
            .field("expected_size", &self.expected_size)
            .field("resume", &self.resume)
            .field("headers", &self.headers)
            .field("on_progress", &"{ ... }")
            .finish()
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            checksum:      None,
            expected_size: None,
            resume:        true,
            headers:       Arc::new([]),
            on_progress:   None,
        }
    }
}

impl FetchOptions {
    #[must_use]
    pub fn checksum(mut self, checksum: Option<[u8; 16]>) -> Self {
        self.checksum = checksum;
        self
    }

    #[must_use]
    pub fn expected_size(mut self, size: Option<u64>) -> Self {
        self.expected_size = size;
        self
    }

    #[must_use]
    pub fn resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut headers = self.headers.to_vec();
        headers.push((key.into(), value.into()));
        self.headers = headers.into();
        self
    }

    #[must_use]
    pub fn on_progress(mut self, callback: impl Fn(&Progress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = FetchOptions::default();
        assert!(options.checksum.is_none());
        assert!(options.resume);
        assert!(options.headers.is_empty());
    }

    #[test]
    fn test_header_appends() {
        let options = FetchOptions::default().header("A", "1").header("B", "2");
        assert_eq!(options.headers.len(), 2);
        assert_eq!(options.headers[1], ("B".to_string(), "2".to_string()));
    }

    #[test]
    fn test_debug_hides_callback() {
        let options = FetchOptions::default()
            .checksum(Some([0xab; 16]))
            .on_progress(|_| {});
        let text = format!("{options:?}");
        assert!(text.contains("abababab"));
        assert!(text.contains("{ ... }"));
    }
}
