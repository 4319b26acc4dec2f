//! Fuzz target for the stream decryptor
//!
//! # Strategy
//!
//! - A valid stream written by `FrameEncryptor` under fixed keys
//! - Corruptions: bit flips, truncation, overwritten length prefixes,
//!   appended garbage
//!
//! # Invariants
//!
//! - The decryptor never panics and never allocates beyond the input size
//! - After the first error the iterator is exhausted
//! - Sequence numbers strictly increase
//! - Attachment reads on returned frames never panic

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sigframe_backup::{DecryptorConfig, EncryptorConfig, FrameDecryptor, FrameEncryptor, SharedSource};
use sigframe_crypto::FrameKeys;
use sigframe_proto::{AttachmentFrame, DatabaseVersionFrame, Frame, HeaderFrame, SqlStatementFrame};

#[derive(Debug, Arbitrary)]
enum Corruption {
    FlipBit { position: u16, bit: u8 },
    Truncate { keep: u16 },
    Prefix { position: u16, value: u32 },
    Append(Vec<u8>),
}

#[derive(Debug, Arbitrary)]
struct Input {
    body: Vec<u8>,
    statement: String,
    eager: bool,
    corruptions: Vec<Corruption>,
}

fn keys() -> FrameKeys {
    FrameKeys::new([0x11; 32], [0x22; 32])
}

fn build_stream(input: &Input) -> Option<Vec<u8>> {
    let header = HeaderFrame::new([0x33; 16], &[0x44; 32], Some(1));
    let mut encryptor =
        FrameEncryptor::with_keys(Vec::new(), keys(), &header, EncryptorConfig::default()).ok()?;

    let mut attachment = Frame::Attachment(AttachmentFrame::new(1, 2, input.body.len() as u32));
    attachment.set_attachment_data(input.body.clone());

    for mut frame in [
        Frame::DatabaseVersion(DatabaseVersionFrame::new(1)),
        Frame::SqlStatement(SqlStatementFrame::new(&input.statement)),
        attachment,
    ] {
        // Frames the encryptor refuses leave the stream untouched
        let _ = encryptor.write_frame(&mut frame);
    }
    encryptor.finish().ok()
}

fuzz_target!(|input: Input| {
    let Some(mut stream) = build_stream(&input) else {
        return;
    };

    for corruption in &input.corruptions {
        match *corruption {
            Corruption::FlipBit { position, bit } if !stream.is_empty() => {
                let index = usize::from(position) % stream.len();
                stream[index] ^= 1 << (bit % 8);
            },
            Corruption::Truncate { keep } => stream.truncate(usize::from(keep)),
            Corruption::Prefix { position, value } if stream.len() >= 4 => {
                let index = usize::from(position) % (stream.len() - 3);
                stream[index..index + 4].copy_from_slice(&value.to_be_bytes());
            },
            Corruption::Append(ref extra) => stream.extend_from_slice(extra),
            _ => {},
        }
    }

    let config = DecryptorConfig { lazy_attachments: !input.eager, ..DecryptorConfig::default() };
    let Ok(mut decryptor) = FrameDecryptor::with_keys(SharedSource::memory(stream), keys(), config)
    else {
        return;
    };

    let mut last_sequence = None;
    loop {
        match decryptor.next() {
            Some(Ok(mut decoded)) => {
                assert!(last_sequence.is_none_or(|last| decoded.sequence > last));
                last_sequence = Some(decoded.sequence);
                let _ = decoded.frame.attachment_data(false);
            },
            Some(Err(_)) => {
                assert!(decryptor.next().is_none());
                break;
            },
            None => break,
        }
    }
});
