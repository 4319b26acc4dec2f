//! Attachment body ciphers
//!
//! Two independent schemes, selected by where the attachment came from:
//!
//! - Android: `[AES-256-CTR ciphertext][10-byte tag]`, tag is
//!   HMAC-SHA256(IV ‖ ciphertext). Keys are the session keys, the IV comes
//!   from the ratchet step that follows the describing frame. Processed
//!   incrementally so bodies of any size stream in bounded memory.
//! - Desktop: `[16-byte IV][AES-256-CBC/PKCS#7 ciphertext][32-byte tag]`,
//!   tag is HMAC-SHA256(IV ‖ ciphertext), keyed by a 64-byte per-file key.

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, StreamCipher, block_padding::Pkcs7};
use hmac::Mac;
use sigframe_proto::MacStatus;
use zeroize::Zeroize;

use crate::{
    error::CryptoError,
    frame_cipher::{Aes256Ctr, HmacSha256, new_mac, tag_status},
    kdf::FrameKeys,
    state::IV_SIZE,
};

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;

/// Trailing tag length of an Android attachment body.
pub const ANDROID_MAC_LEN: usize = 10;

/// Read granularity for Android attachment bodies.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Incremental Android attachment decryptor.
///
/// Feed ciphertext in any chunking; the plaintext and the computed tag do
/// not depend on chunk boundaries.
pub struct AndroidDecryptor {
    cipher: Aes256Ctr,
    mac: HmacSha256,
}

impl AndroidDecryptor {
    /// Start a body under `iv`.
    pub fn new(keys: &FrameKeys, iv: &[u8; IV_SIZE]) -> Self {
        let mut mac = new_mac(keys.mac_key());
        mac.update(iv);
        Self { cipher: Aes256Ctr::new(keys.cipher_key().into(), iv.into()), mac }
    }

    /// Authenticate then decrypt one chunk in place.
    pub fn update(&mut self, chunk: &mut [u8]) {
        self.mac.update(chunk);
        self.cipher.apply_keystream(chunk);
    }

    /// Computed tag, truncated.
    pub fn finalize(self) -> [u8; ANDROID_MAC_LEN] {
        truncate_tag(self.mac)
    }

    /// Compare the computed tag with the one stored after the body.
    pub fn verify(self, received: &[u8]) -> MacStatus {
        tag_status(&self.finalize(), received)
    }
}

/// Incremental Android attachment encryptor, mirror of [`AndroidDecryptor`].
pub struct AndroidEncryptor {
    cipher: Aes256Ctr,
    mac: HmacSha256,
}

impl AndroidEncryptor {
    /// Start a body under `iv`.
    pub fn new(keys: &FrameKeys, iv: &[u8; IV_SIZE]) -> Self {
        let mut mac = new_mac(keys.mac_key());
        mac.update(iv);
        Self { cipher: Aes256Ctr::new(keys.cipher_key().into(), iv.into()), mac }
    }

    /// Encrypt then authenticate one chunk in place.
    pub fn update(&mut self, chunk: &mut [u8]) {
        self.cipher.apply_keystream(chunk);
        self.mac.update(chunk);
    }

    /// Tag to append after the body.
    pub fn finalize(self) -> [u8; ANDROID_MAC_LEN] {
        truncate_tag(self.mac)
    }
}

fn truncate_tag(mac: HmacSha256) -> [u8; ANDROID_MAC_LEN] {
    let full = mac.finalize().into_bytes();
    let mut tag = [0u8; ANDROID_MAC_LEN];
    tag.copy_from_slice(&full[..ANDROID_MAC_LEN]);
    tag
}

/// Seal a whole Android body: `ciphertext ‖ tag`.
pub fn seal_android(keys: &FrameKeys, iv: &[u8; IV_SIZE], plaintext: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(plaintext.len() + ANDROID_MAC_LEN);
    out.extend_from_slice(plaintext);

    let mut encryptor = AndroidEncryptor::new(keys, iv);
    for chunk in out.chunks_mut(CHUNK_SIZE) {
        encryptor.update(chunk);
    }
    let tag = encryptor.finalize();
    out.extend_from_slice(&tag);
    out
}

/// Per-file desktop attachment key: AES half and MAC half.
#[derive(Clone)]
pub struct DesktopKey {
    aes_key: [u8; 32],
    mac_key: [u8; 32],
}

impl DesktopKey {
    /// Decoded key length.
    pub const LEN: usize = 64;

    /// Split a 64-byte decoded local key.
    ///
    /// # Errors
    ///
    /// - `CryptoError::InvalidKeyLength` for anything but 64 bytes
    pub fn from_slice(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != Self::LEN {
            return Err(CryptoError::InvalidKeyLength { expected: Self::LEN, actual: key.len() });
        }

        let mut aes_key = [0u8; 32];
        let mut mac_key = [0u8; 32];
        aes_key.copy_from_slice(&key[..32]);
        mac_key.copy_from_slice(&key[32..]);
        Ok(Self { aes_key, mac_key })
    }
}

impl Drop for DesktopKey {
    fn drop(&mut self) {
        self.aes_key.zeroize();
        self.mac_key.zeroize();
    }
}

impl std::fmt::Debug for DesktopKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DesktopKey(..)")
    }
}

/// Desktop file overhead: IV plus full tag.
pub const DESKTOP_OVERHEAD: usize = IV_SIZE + 32;

/// Ciphertext bytes in a desktop file of `file_len` bytes.
pub fn desktop_ciphertext_len(file_len: usize) -> Option<usize> {
    file_len.checked_sub(DESKTOP_OVERHEAD).filter(|len| *len > 0)
}

/// Result of opening a desktop attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopOpened {
    /// Unpadded plaintext; `None` when the tag did not verify
    pub plaintext: Option<Vec<u8>>,
    /// Tag comparison result
    pub mac: MacStatus,
}

/// Verify then decrypt `[IV][ciphertext][tag]`.
///
/// Nothing is decrypted when the tag fails.
///
/// # Errors
///
/// - `CryptoError::MalformedCiphertext` if the layout is too short or the
///   ciphertext is not block aligned
/// - `CryptoError::InvalidPadding` if PKCS#7 padding does not verify
pub fn open_desktop(key: &DesktopKey, file: &[u8]) -> Result<DesktopOpened, CryptoError> {
    let ct_len = desktop_ciphertext_len(file.len())
        .ok_or(CryptoError::MalformedCiphertext { reason: "desktop file shorter than its framing" })?;
    if ct_len % 16 != 0 {
        return Err(CryptoError::MalformedCiphertext { reason: "ciphertext not block aligned" });
    }

    let (iv, rest) = file.split_at(IV_SIZE);
    let (ciphertext, received) = rest.split_at(ct_len);

    let mut mac = new_mac(&key.mac_key);
    mac.update(iv);
    mac.update(ciphertext);
    let status = tag_status(&mac.finalize().into_bytes(), received);
    if status == MacStatus::Bad {
        return Ok(DesktopOpened { plaintext: None, mac: status });
    }

    let mut buffer = ciphertext.to_vec();
    let Ok(iv) = <[u8; IV_SIZE]>::try_from(iv) else {
        unreachable!("split at IV_SIZE");
    };
    let plain_len = Aes256CbcDec::new((&key.aes_key).into(), (&iv).into())
        .decrypt_padded_mut::<Pkcs7>(&mut buffer)
        .map_err(|_| CryptoError::InvalidPadding)?
        .len();
    buffer.truncate(plain_len);

    Ok(DesktopOpened { plaintext: Some(buffer), mac: status })
}

/// Encrypt into the desktop layout.
pub fn seal_desktop(key: &DesktopKey, iv: &[u8; IV_SIZE], plaintext: &[u8]) -> Vec<u8> {
    let ciphertext = Aes256CbcEnc::new((&key.aes_key).into(), iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut mac = new_mac(&key.mac_key);
    mac.update(iv);
    mac.update(&ciphertext);

    let mut out = Vec::with_capacity(DESKTOP_OVERHEAD + ciphertext.len());
    out.extend_from_slice(iv);
    out.extend_from_slice(&ciphertext);
    out.extend_from_slice(&mac.finalize().into_bytes());
    out
}
