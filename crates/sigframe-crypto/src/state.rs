//! Counter ratchet over the header IV
//!
//! Every sealed unit in a backup (frame or attachment body) is encrypted
//! under the same session keys with a fresh IV. The IV is the header IV with
//! its first four bytes replaced by a big-endian counter; the counter starts
//! at the value those bytes held and steps once per unit.
//!
//! # Invariants
//!
//! - `advance()` is called exactly once per unit, on both the encrypt and the
//!   decrypt path. A skipped or doubled call desynchronizes every later unit.
//! - The counter wraps at 2^32. It starts at a random value, so wrapping is
//!   expected and harmless.

use crate::kdf::FrameKeys;

/// IV length for AES-CTR units.
pub const IV_SIZE: usize = 16;

/// Frame authentication scheme.
///
/// Selected by configuration, never inferred from the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MacEra {
    /// HMAC-SHA256 over the ciphertext only, truncated to 10 bytes. Every
    /// backup written by the phone app uses this.
    #[default]
    Truncated,
    /// HMAC-SHA256 over IV ‖ ciphertext, full 32-byte tag.
    Full,
}

impl MacEra {
    /// Tag length appended to each frame.
    pub fn tag_len(self) -> usize {
        match self {
            Self::Truncated => 10,
            Self::Full => 32,
        }
    }

    /// Whether the IV is fed into the MAC ahead of the ciphertext.
    pub fn covers_iv(self) -> bool {
        matches!(self, Self::Full)
    }
}

/// Session keys plus the counter ratchet.
///
/// Exclusively owned by one stream walk; never cloned across streams.
#[derive(Debug)]
pub struct CryptoState {
    keys: FrameKeys,
    iv: [u8; IV_SIZE],
    counter: u32,
    advances: u64,
    era: MacEra,
}

impl CryptoState {
    /// Start a ratchet from the header IV.
    pub fn new(keys: FrameKeys, header_iv: [u8; IV_SIZE], era: MacEra) -> Self {
        let counter = u32::from_be_bytes([header_iv[0], header_iv[1], header_iv[2], header_iv[3]]);
        Self { keys, iv: header_iv, counter, advances: 0, era }
    }

    /// IV for the next unit. Steps the counter.
    pub fn advance(&mut self) -> [u8; IV_SIZE] {
        self.iv[..4].copy_from_slice(&self.counter.to_be_bytes());
        self.counter = self.counter.wrapping_add(1);
        self.advances += 1;
        self.iv
    }

    /// Counter value the next `advance()` will stamp.
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Units sealed or opened so far.
    pub fn advances(&self) -> u64 {
        self.advances
    }

    /// Session keys.
    pub fn keys(&self) -> &FrameKeys {
        &self.keys
    }

    /// Frame authentication scheme.
    pub fn era(&self) -> MacEra {
        self.era
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> FrameKeys {
        FrameKeys::new([1; 32], [2; 32])
    }

    fn header_iv(prefix: [u8; 4]) -> [u8; IV_SIZE] {
        let mut iv = [0xaa; IV_SIZE];
        iv[..4].copy_from_slice(&prefix);
        iv
    }

    #[test]
    fn first_unit_uses_header_iv() {
        let iv = header_iv([0, 0, 1, 0]);
        let mut state = CryptoState::new(keys(), iv, MacEra::Truncated);
        assert_eq!(state.advance(), iv);
        assert_eq!(state.counter(), 257);
    }

    #[test]
    fn advance_stamps_counter_and_keeps_tail() {
        let mut state = CryptoState::new(keys(), header_iv([0, 0, 0, 5]), MacEra::Truncated);
        state.advance();
        let iv = state.advance();

        assert_eq!(iv[..4], [0, 0, 0, 6]);
        assert_eq!(iv[4..], [0xaa; 12]);
        assert_eq!(state.advances(), 2);
    }

    #[test]
    fn counter_wraps() {
        let mut state = CryptoState::new(keys(), header_iv([0xff; 4]), MacEra::Full);
        assert_eq!(state.advance()[..4], [0xff; 4]);
        assert_eq!(state.advance()[..4], [0, 0, 0, 0]);
    }

    #[test]
    fn ratchet_is_deterministic_and_distinct() {
        let run = || {
            let mut state = CryptoState::new(keys(), header_iv([9, 8, 7, 6]), MacEra::Truncated);
            (0..64).map(|_| state.advance()).collect::<Vec<_>>()
        };

        let first = run();
        assert_eq!(first, run());

        let mut unique = first.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), first.len(), "every counter value yields a distinct IV");
    }

    #[test]
    fn era_tag_lengths() {
        assert_eq!(MacEra::default(), MacEra::Truncated);
        assert_eq!(MacEra::Truncated.tag_len(), 10);
        assert_eq!(MacEra::Full.tag_len(), 32);
        assert!(MacEra::Full.covers_iv());
    }
}
