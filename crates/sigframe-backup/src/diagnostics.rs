//! Session-scoped diagnostics.
//!
//! Each session owns one [`Diagnostics`]; nothing here is process-wide, so
//! two backups processed side by side never suppress each other's warnings.

use std::{collections::HashSet, fmt};

/// Warn-once bookkeeping plus running counters for one session.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warned: HashSet<String>,
    stats: SessionStats,
}

impl Diagnostics {
    /// Fresh session state.
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time `key` is seen in this session.
    ///
    /// ```ignore
    /// if diagnostics.first_time("trailing-data") {
    ///     tracing::warn!("ignoring data after end frame");
    /// }
    /// ```
    pub fn first_time(&mut self, key: &str) -> bool {
        if self.warned.contains(key) {
            return false;
        }
        self.warned.insert(key.to_owned())
    }

    /// Counters so far.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Mutable counters.
    pub fn stats_mut(&mut self) -> &mut SessionStats {
        &mut self.stats
    }
}

/// Per-session outcome counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
    /// Frames returned to the caller (header and end marker included)
    pub decoded: u64,
    /// Frames dropped because they failed validation
    pub rejected: u64,
    /// Frames whose tag did not verify
    pub bad_mac: u64,
    /// Attachment bodies found in the stream
    pub attachments: u64,
    /// Attachment bodies whose tag did not verify (eager reads only)
    pub bad_attachment_mac: u64,
    /// An end frame was seen
    pub complete: bool,
}

impl SessionStats {
    /// Emit the summary line at `info`, or `warn` for incomplete backups.
    pub fn log_summary(&self) {
        if self.complete {
            tracing::info!(
                decoded = self.decoded,
                rejected = self.rejected,
                bad_mac = self.bad_mac,
                attachments = self.attachments,
                "backup session finished"
            );
        } else {
            tracing::warn!(
                decoded = self.decoded,
                rejected = self.rejected,
                bad_mac = self.bad_mac,
                attachments = self.attachments,
                "backup session ended without an end frame"
            );
        }
    }
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frames decoded, {} rejected, {} bad MACs, {} attachments ({})",
            self.decoded,
            self.rejected,
            self.bad_mac,
            self.attachments,
            if self.complete { "complete" } else { "incomplete" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warn_once_per_key() {
        let mut diagnostics = Diagnostics::new();
        assert!(diagnostics.first_time("zero-length"));
        assert!(!diagnostics.first_time("zero-length"));
        assert!(diagnostics.first_time("other"));
    }

    #[test]
    fn sessions_do_not_share_state() {
        let mut a = Diagnostics::new();
        let mut b = Diagnostics::new();
        assert!(a.first_time("k"));
        assert!(b.first_time("k"));
    }

    #[test]
    fn summary_display() {
        let stats = SessionStats { decoded: 3, rejected: 1, complete: true, ..Default::default() };
        assert_eq!(
            stats.to_string(),
            "3 frames decoded, 1 rejected, 0 bad MACs, 0 attachments (complete)"
        );
    }
}
