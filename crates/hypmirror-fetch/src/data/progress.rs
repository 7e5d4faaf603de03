use super::options::FetchPhase;

/// Snapshot passed to progress callbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub phase: FetchPhase,

    /// Bytes present in the staging file, including any resumed prefix.
    pub bytes_downloaded: u64,

    /// Total expected bytes, if known from the options or `Content-Length`.
    pub total_bytes: Option<u64>,

    /// Bytes that were already on disk when the transfer started.
    pub resumed_from: u64,
}

impl Progress {
    /// Completion as a fraction in `[0, 1]`, `None` while the total is unknown.
    #[must_use]
    pub fn fraction(&self) -> Option<f64> {
        self.total_bytes.map(|total| {
            if total == 0 {
                if self.is_completed() { 1.0 } else { 0.0 }
            } else {
                (self.bytes_downloaded as f64 / total as f64).clamp(0.0, 1.0)
            }
        })
    }

    #[must_use]
    pub fn is_completed(&self) -> bool { self.phase == FetchPhase::Completed }
}

/// What the server says about a resource before any body is transferred.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteMeta {
    pub file_name:   Option<String>,
    pub total_bytes: Option<u64>,
}
