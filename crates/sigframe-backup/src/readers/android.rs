use std::io::{Read, Seek, SeekFrom};

use sigframe_crypto::{ANDROID_MAC_LEN, AndroidDecryptor, CHUNK_SIZE, FrameKeys, IV_SIZE};
use sigframe_proto::{AttachmentError, AttachmentPayload, AttachmentReader, MacStatus};

use crate::source::SharedSource;

/// Attachment body stored inside the backup stream, right after its frame.
///
/// Holds its own copy of the session keys and the IV of its ratchet step, so
/// it can be read in any order, on any thread, long after the stream walk
/// has moved on.
#[derive(Debug, Clone)]
pub struct AndroidAttachmentReader {
    source: SharedSource,
    offset: u64,
    iv: [u8; IV_SIZE],
    keys: FrameKeys,
    length: u32,
}

impl AndroidAttachmentReader {
    /// Body of `length` plaintext bytes at `offset`, followed by its tag.
    pub fn new(
        source: SharedSource,
        offset: u64,
        iv: [u8; IV_SIZE],
        keys: FrameKeys,
        length: u32,
    ) -> Self {
        Self { source, offset, iv, keys, length }
    }

    /// Stream offset of the body.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Declared plaintext length.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Bytes the body occupies in the stream, tag included.
    pub fn stored_len(&self) -> u64 {
        u64::from(self.length) + ANDROID_MAC_LEN as u64
    }
}

impl AttachmentReader for AndroidAttachmentReader {
    fn read_attachment(&self, verbose: bool) -> Result<AttachmentPayload, AttachmentError> {
        if self.length == 0 {
            tracing::warn!(offset = self.offset, "reading 0-byte attachment");
        }

        let mut reader = self.source.open()?;
        reader.ensure_available(self.offset, self.stored_len())?;
        reader.seek(SeekFrom::Start(self.offset))?;

        let mut data = vec![0u8; self.length as usize];
        let mut decryptor = AndroidDecryptor::new(&self.keys, &self.iv);
        for chunk in data.chunks_mut(CHUNK_SIZE) {
            reader.read_exact(chunk)?;
            decryptor.update(chunk);
        }

        let mut tag = [0u8; ANDROID_MAC_LEN];
        reader.read_exact(&mut tag)?;
        let mac = decryptor.verify(&tag);

        if mac == MacStatus::Bad {
            tracing::warn!(offset = self.offset, len = self.length, "bad MAC in attachment body");
        } else if verbose {
            tracing::debug!(offset = self.offset, len = self.length, "attachment body verified");
        }

        Ok(AttachmentPayload { data, mac })
    }

    fn clone_box(&self) -> Box<dyn AttachmentReader> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use sigframe_crypto::seal_android;

    use super::*;

    fn keys() -> FrameKeys {
        FrameKeys::new([0x10; 32], [0x20; 32])
    }

    const IV: [u8; IV_SIZE] = [0x30; IV_SIZE];

    fn stream_with_body(prefix: usize, plaintext: &[u8]) -> SharedSource {
        let mut bytes = vec![0xee; prefix];
        bytes.extend_from_slice(&seal_android(&keys(), &IV, plaintext));
        bytes.extend_from_slice(b"next frame");
        SharedSource::memory(bytes)
    }

    #[test]
    fn reads_body_at_offset() {
        let body: Vec<u8> = (0..CHUNK_SIZE * 2 + 17).map(|i| i as u8).collect();
        let source = stream_with_body(33, &body);
        let reader = AndroidAttachmentReader::new(source, 33, IV, keys(), body.len() as u32);

        let payload = reader.read_attachment(false).unwrap();
        assert_eq!(payload.data, body);
        assert_eq!(payload.mac, MacStatus::Verified);
    }

    #[test]
    fn bad_tag_still_returns_plaintext() {
        let body = b"known plaintext".to_vec();
        let mut bytes = seal_android(&keys(), &IV, &body);
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;

        let reader = AndroidAttachmentReader::new(
            SharedSource::memory(bytes),
            0,
            IV,
            keys(),
            body.len() as u32,
        );
        let payload = reader.read_attachment(false).unwrap();
        assert_eq!(payload.mac, MacStatus::Bad);
        assert_eq!(payload.data, body);
    }

    #[test]
    fn zero_length_body_is_empty() {
        let source = stream_with_body(0, b"");
        let reader = AndroidAttachmentReader::new(source, 0, IV, keys(), 0);

        let payload = reader.read_attachment(false).unwrap();
        assert!(payload.data.is_empty());
        assert_eq!(payload.mac, MacStatus::Verified);
    }

    #[test]
    fn short_source_is_short_read() {
        let source = stream_with_body(0, b"abc");
        let reader = AndroidAttachmentReader::new(source, 0, IV, keys(), 4096);
        assert!(matches!(reader.read_attachment(false), Err(AttachmentError::ShortRead { .. })));
    }

    #[test]
    fn clone_box_reads_same_bytes() {
        let source = stream_with_body(5, b"twice");
        let reader: Box<dyn AttachmentReader> =
            Box::new(AndroidAttachmentReader::new(source, 5, IV, keys(), 5));
        let copy = reader.clone();
        assert_eq!(
            reader.read_attachment(false).unwrap(),
            copy.read_attachment(false).unwrap()
        );
    }
}
