//! Fuzz target for Frame::decode
//!
//! # Strategy
//!
//! - Arbitrary bytes fed straight to the plaintext frame parser
//!
//! # Invariants
//!
//! - Decoding never panics; malformed input is a `ProtocolError`
//! - A decoded frame re-encodes to bytes that decode to the same frame
//! - `encoded_len` matches the re-encoded bytes
//! - `validate` never panics on anything the parser accepts

#![no_main]

use libfuzzer_sys::fuzz_target;
use sigframe_proto::Frame;

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = Frame::decode(data) else {
        return;
    };

    let _ = frame.validate();
    let _ = frame.attachment_size();

    let bytes = frame.to_bytes();
    assert_eq!(bytes.len(), frame.encoded_len());

    let again = Frame::decode(&bytes).expect("re-encoded frame must decode");
    assert_eq!(again, frame);
});
