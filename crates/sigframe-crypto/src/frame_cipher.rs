//! Frame sealing: AES-256-CTR plus an appended HMAC-SHA256 tag
//!
//! A sealed frame is `ciphertext ‖ tag`. The length prefix that delimits it
//! in the stream belongs to the stream layer, not to this module.

use aes::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use sigframe_proto::MacStatus;
use subtle::ConstantTimeEq;

use crate::{
    error::CryptoError,
    state::{CryptoState, IV_SIZE, MacEra},
};

pub(crate) type Aes256Ctr = ctr::Ctr128BE<aes::Aes256>;
pub(crate) type HmacSha256 = Hmac<Sha256>;

/// Decrypted frame plaintext and its authentication result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedFrame {
    /// Frame plaintext
    pub plaintext: Vec<u8>,
    /// Tag comparison result
    pub mac: MacStatus,
}

pub(crate) fn new_mac(key: &[u8; 32]) -> HmacSha256 {
    let Ok(mac) = HmacSha256::new_from_slice(key) else {
        unreachable!("HMAC-SHA256 accepts any key size");
    };
    mac
}

/// XOR the AES-256-CTR keystream for `iv` into `buf`.
pub fn apply_ctr(key: &[u8; 32], iv: &[u8; IV_SIZE], buf: &mut [u8]) {
    let mut cipher = Aes256Ctr::new(key.into(), iv.into());
    cipher.apply_keystream(buf);
}

/// Constant-time comparison of an expected tag prefix against a received tag.
pub(crate) fn tag_status(expected: &[u8], received: &[u8]) -> MacStatus {
    if expected.len() == received.len() && bool::from(expected.ct_eq(received)) {
        MacStatus::Verified
    } else {
        MacStatus::Bad
    }
}

fn frame_tag(keys_mac: &[u8; 32], era: MacEra, iv: &[u8; IV_SIZE], ciphertext: &[u8]) -> Vec<u8> {
    let mut mac = new_mac(keys_mac);
    if era.covers_iv() {
        mac.update(iv);
    }
    mac.update(ciphertext);

    let mut tag = mac.finalize().into_bytes().to_vec();
    tag.truncate(era.tag_len());
    tag
}

/// Encrypt and tag one frame. Advances the ratchet once.
pub fn seal_frame(state: &mut CryptoState, plaintext: &[u8]) -> Vec<u8> {
    let iv = state.advance();
    let era = state.era();

    let mut sealed = Vec::with_capacity(plaintext.len() + era.tag_len());
    sealed.extend_from_slice(plaintext);
    apply_ctr(state.keys().cipher_key(), &iv, &mut sealed);

    let tag = frame_tag(state.keys().mac_key(), era, &iv, &sealed);
    sealed.extend_from_slice(&tag);
    sealed
}

/// Authenticate and decrypt one sealed frame. Advances the ratchet once.
///
/// A tag mismatch is reported in [`OpenedFrame::mac`]; the plaintext is
/// still produced.
///
/// # Errors
///
/// - `CryptoError::SealedTooShort` if `sealed` cannot hold a tag. The ratchet
///   is left untouched in that case.
pub fn open_frame(state: &mut CryptoState, sealed: &[u8]) -> Result<OpenedFrame, CryptoError> {
    let era = state.era();
    let Some(body_len) = sealed.len().checked_sub(era.tag_len()) else {
        return Err(CryptoError::SealedTooShort { len: sealed.len(), tag_len: era.tag_len() });
    };

    let iv = state.advance();
    let (ciphertext, received) = sealed.split_at(body_len);

    let expected = frame_tag(state.keys().mac_key(), era, &iv, ciphertext);
    let mac = tag_status(&expected, received);

    let mut plaintext = ciphertext.to_vec();
    apply_ctr(state.keys().cipher_key(), &iv, &mut plaintext);
    Ok(OpenedFrame { plaintext, mac })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::FrameKeys;

    fn pair(era: MacEra) -> (CryptoState, CryptoState) {
        let keys = FrameKeys::new([3; 32], [4; 32]);
        let iv = [0x11; IV_SIZE];
        (CryptoState::new(keys.clone(), iv, era), CryptoState::new(keys, iv, era))
    }

    #[test]
    fn seal_open_roundtrip_both_eras() {
        for era in [MacEra::Truncated, MacEra::Full] {
            let (mut tx, mut rx) = pair(era);
            for message in [&b""[..], b"x", &[0x2a, 0x02, 0x08, 0x05]] {
                let sealed = seal_frame(&mut tx, message);
                assert_eq!(sealed.len(), message.len() + era.tag_len());

                let opened = open_frame(&mut rx, &sealed).unwrap();
                assert_eq!(opened.plaintext, message);
                assert_eq!(opened.mac, MacStatus::Verified);
            }
        }
    }

    #[test]
    fn truncated_tag_ignores_iv() {
        let keys = FrameKeys::new([3; 32], [4; 32]);
        let a = frame_tag(keys.mac_key(), MacEra::Truncated, &[0; IV_SIZE], b"ct");
        let b = frame_tag(keys.mac_key(), MacEra::Truncated, &[1; IV_SIZE], b"ct");
        assert_eq!(a, b);

        let c = frame_tag(keys.mac_key(), MacEra::Full, &[0; IV_SIZE], b"ct");
        let d = frame_tag(keys.mac_key(), MacEra::Full, &[1; IV_SIZE], b"ct");
        assert_ne!(c, d);
    }

    #[test]
    fn any_bit_flip_is_detected_and_undo_restores() {
        let (mut tx, _) = pair(MacEra::Truncated);
        let mut sealed = seal_frame(&mut tx, b"database version five");

        for bit in 0..sealed.len() * 8 {
            let (byte, mask) = (bit / 8, 1u8 << (bit % 8));

            sealed[byte] ^= mask;
            let (_, mut rx) = pair(MacEra::Truncated);
            assert_eq!(open_frame(&mut rx, &sealed).unwrap().mac, MacStatus::Bad, "bit {bit}");

            sealed[byte] ^= mask;
            let (_, mut rx) = pair(MacEra::Truncated);
            assert_eq!(open_frame(&mut rx, &sealed).unwrap().mac, MacStatus::Verified);
        }
    }

    #[test]
    fn bad_mac_still_decrypts() {
        let (mut tx, mut rx) = pair(MacEra::Full);
        let mut sealed = seal_frame(&mut tx, b"payload");
        let last = sealed.len() - 1;
        sealed[last] ^= 0xff;

        let opened = open_frame(&mut rx, &sealed).unwrap();
        assert_eq!(opened.mac, MacStatus::Bad);
        assert_eq!(opened.plaintext, b"payload");
    }

    #[test]
    fn too_short_leaves_ratchet_untouched() {
        let (_, mut rx) = pair(MacEra::Truncated);
        let before = rx.counter();
        assert_eq!(
            open_frame(&mut rx, &[0; 9]),
            Err(CryptoError::SealedTooShort { len: 9, tag_len: 10 })
        );
        assert_eq!(rx.counter(), before);
    }

    #[test]
    fn out_of_step_ratchet_garbles_plaintext() {
        let (mut tx, mut rx) = pair(MacEra::Truncated);
        let _skipped = seal_frame(&mut tx, b"first");
        let second = seal_frame(&mut tx, b"second");

        let opened = open_frame(&mut rx, &second).unwrap();
        assert_ne!(opened.plaintext, b"second");
    }
}
