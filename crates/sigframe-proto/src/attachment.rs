//! Lazily loaded attachment payloads.
//!
//! Frames that describe a binary payload (attachments, stickers, avatars) do
//! not carry the bytes inline. They own an [`AttachmentReader`] that knows
//! where the bytes live and how to authenticate and decrypt them, and an
//! [`AttachmentSlot`] that caches the result of the first read.
//!
//! # Invariants
//!
//! - A reader is owned by exactly one frame. Cloning a frame deep-clones its
//!   reader through [`AttachmentReader::clone_box`].
//! - A bad MAC is a status, not an error: the decrypted bytes are still
//!   returned and the caller decides whether to keep them.

use std::{fmt, io, path::PathBuf};

use thiserror::Error;

/// Outcome of authenticating an attachment or frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacStatus {
    /// Tag matched
    Verified,
    /// Tag did not match; data may be damaged or tampered with
    Bad,
    /// Source carries no tag (plaintext files, base64 blobs)
    Unauthenticated,
}

impl MacStatus {
    /// True unless the tag was checked and failed.
    pub fn is_trusted(self) -> bool {
        self != Self::Bad
    }
}

/// Plaintext attachment bytes plus how they were authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentPayload {
    /// Decrypted bytes
    pub data: Vec<u8>,
    /// Authentication result for `data`
    pub mac: MacStatus,
}

/// Errors raised while pulling attachment bytes from their source.
#[derive(Debug, Error)]
pub enum AttachmentError {
    /// The backing file could not be opened.
    #[error("failed to open {}: {source}", path.display())]
    Open {
        /// File that failed to open
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A read or seek failed after the source was opened.
    #[error("attachment i/o error: {0}")]
    Io(#[from] io::Error),

    /// The source ended before the declared length was read.
    #[error("short attachment read: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Bytes required
        expected: u64,
        /// Bytes available
        actual: u64,
    },

    /// The declared plaintext size cannot fit in the ciphertext.
    #[error("declared size {declared} exceeds ciphertext capacity {capacity}")]
    SizeMismatch {
        /// Caller-declared plaintext size
        declared: u64,
        /// Largest plaintext the ciphertext can hold
        capacity: u64,
    },

    /// Key material was missing or malformed.
    #[error("invalid attachment key: {reason}")]
    InvalidKey {
        /// What was wrong with the key
        reason: String,
    },

    /// Base64 source data did not decode.
    #[error("invalid base64 attachment: {reason}")]
    Base64 {
        /// Decoder message
        reason: String,
    },

    /// Ciphertext failed to decrypt (bad padding, misaligned blocks).
    #[error("attachment decryption failed: {reason}")]
    Decrypt {
        /// Cipher message
        reason: String,
    },

    /// The frame has neither cached data nor a reader.
    #[error("frame has no attachment source")]
    NoSource,
}

/// A source that can produce one attachment's plaintext on demand.
pub trait AttachmentReader: fmt::Debug + Send + Sync {
    /// Read, authenticate and decrypt the attachment.
    ///
    /// A failed MAC check is reported through [`AttachmentPayload::mac`]
    /// whenever the reader can still produce plaintext.
    fn read_attachment(&self, verbose: bool) -> Result<AttachmentPayload, AttachmentError>;

    /// Deep copy for frame cloning.
    fn clone_box(&self) -> Box<dyn AttachmentReader>;

    /// Whether a second [`read_attachment`](Self::read_attachment) would
    /// return the same bytes. Cached data from sources that cannot refetch is
    /// never dropped by [`AttachmentSlot::clear`].
    fn can_refetch(&self) -> bool {
        true
    }
}

impl Clone for Box<dyn AttachmentReader> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Reader plus cached payload, owned by an attachment-carrying frame.
///
/// Equality compares cached payloads only; readers are opaque.
#[derive(Debug, Clone, Default)]
pub struct AttachmentSlot {
    reader: Option<Box<dyn AttachmentReader>>,
    cached: Option<AttachmentPayload>,
}

impl AttachmentSlot {
    /// Install a reader, dropping any cached payload from a previous source.
    pub fn set_reader(&mut self, reader: Box<dyn AttachmentReader>) {
        self.cached = None;
        self.reader = Some(reader);
    }

    /// The installed reader, if any.
    pub fn reader(&self) -> Option<&dyn AttachmentReader> {
        self.reader.as_deref()
    }

    /// Cached payload, without triggering a read.
    pub fn cached(&self) -> Option<&AttachmentPayload> {
        self.cached.as_ref()
    }

    /// Cached payload length, if loaded.
    pub fn cached_len(&self) -> Option<usize> {
        self.cached.as_ref().map(|p| p.data.len())
    }

    /// Return the payload, reading it through the reader on first access.
    pub fn load(&mut self, verbose: bool) -> Result<&AttachmentPayload, AttachmentError> {
        let payload = match self.cached.take() {
            Some(payload) => payload,
            None => {
                let reader = self.reader.as_ref().ok_or(AttachmentError::NoSource)?;
                reader.read_attachment(verbose)?
            },
        };
        Ok(self.cached.insert(payload))
    }

    /// Install bytes directly. The old buffer is dropped first.
    ///
    /// Data installed this way has no reader to fall back on unless one was
    /// set before, so [`clear`](Self::clear) keeps it.
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.cached = None;
        self.cached = Some(AttachmentPayload { data, mac: MacStatus::Unauthenticated });
    }

    /// Drop the cached payload if it can be fetched again.
    ///
    /// Returns true if the cache was released or held no bytes. Keeps the
    /// data and logs a warning when no refetching reader exists.
    pub fn clear(&mut self) -> bool {
        let Some(cached) = &self.cached else {
            return true;
        };

        match &self.reader {
            Some(reader) if reader.can_refetch() => {
                self.cached = None;
                true
            },
            // Empty payloads have nothing to release
            _ if cached.data.is_empty() => true,
            _ => {
                tracing::warn!("attachment data has no refetchable source, keeping it in memory");
                false
            },
        }
    }
}

impl PartialEq for AttachmentSlot {
    fn eq(&self, other: &Self) -> bool {
        self.cached == other.cached
    }
}

impl Eq for AttachmentSlot {}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    #[derive(Debug, Clone)]
    struct CountingReader {
        reads: Arc<AtomicUsize>,
        refetch: bool,
    }

    impl AttachmentReader for CountingReader {
        fn read_attachment(&self, _verbose: bool) -> Result<AttachmentPayload, AttachmentError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(AttachmentPayload { data: vec![1, 2, 3], mac: MacStatus::Verified })
        }

        fn clone_box(&self) -> Box<dyn AttachmentReader> {
            Box::new(self.clone())
        }

        fn can_refetch(&self) -> bool {
            self.refetch
        }
    }

    fn slot_with(refetch: bool) -> (AttachmentSlot, Arc<AtomicUsize>) {
        let reads = Arc::new(AtomicUsize::new(0));
        let mut slot = AttachmentSlot::default();
        slot.set_reader(Box::new(CountingReader { reads: Arc::clone(&reads), refetch }));
        (slot, reads)
    }

    #[test]
    fn load_reads_once_and_caches() {
        let (mut slot, reads) = slot_with(true);

        assert_eq!(slot.load(false).unwrap().data, [1, 2, 3]);
        assert_eq!(slot.load(false).unwrap().mac, MacStatus::Verified);
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clear_releases_refetchable_data() {
        let (mut slot, reads) = slot_with(true);
        slot.load(false).unwrap();

        assert!(slot.clear());
        assert!(slot.cached().is_none());

        slot.load(false).unwrap();
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn clear_keeps_data_without_refetchable_source() {
        let (mut slot, _) = slot_with(false);
        slot.load(false).unwrap();
        assert!(!slot.clear());
        assert_eq!(slot.cached_len(), Some(3));

        let mut inline = AttachmentSlot::default();
        inline.set_data(vec![9; 4]);
        assert!(!inline.clear());
        assert_eq!(inline.cached_len(), Some(4));
    }

    #[test]
    fn load_without_source_fails() {
        let mut slot = AttachmentSlot::default();
        assert!(matches!(slot.load(false), Err(AttachmentError::NoSource)));
    }

    #[test]
    fn clone_deep_copies_reader() {
        let (slot, reads) = slot_with(true);
        let mut copy = slot.clone();
        copy.load(false).unwrap();
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert!(slot.cached().is_none());
    }

    #[test]
    fn bad_mac_is_not_trusted() {
        assert!(!MacStatus::Bad.is_trusted());
        assert!(MacStatus::Verified.is_trusted());
        assert!(MacStatus::Unauthenticated.is_trusted());
    }
}
