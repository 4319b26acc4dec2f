//! Fuzz target for varint decoding
//!
//! # Strategy
//!
//! - Arbitrary bytes at an arbitrary start position, including past the end
//!
//! # Invariants
//!
//! - Decoding never panics and never consumes more than `MAX_VARINT_LEN`
//!   bytes or more than the buffer holds
//! - Re-encoding a decoded value yields `varint_len(value)` bytes that
//!   decode to the same value

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sigframe_proto::{MAX_VARINT_LEN, decode_varint, encode_varint, varint_len};

#[derive(Debug, Arbitrary)]
struct Input {
    pos: u8,
    bytes: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let pos = usize::from(input.pos);
    let Ok((value, used)) = decode_varint(&input.bytes, pos) else {
        return;
    };

    assert!(used >= 1 && used <= MAX_VARINT_LEN);
    assert!(pos + used <= input.bytes.len());

    let mut canonical = Vec::new();
    encode_varint(value, &mut canonical);
    assert_eq!(canonical.len(), varint_len(value));
    assert_eq!(decode_varint(&canonical, 0).ok(), Some((value, canonical.len())));
});
