//! Sigframe Cryptographic Primitives
//!
//! Key derivation, the per-unit counter ratchet, and the ciphers used for
//! frames and attachment bodies. Pure functions over caller-provided bytes;
//! no I/O.
//!
//! # Key Lifecycle
//!
//! ```text
//! Passphrase (30 digits) + Header salt
//!        │
//!        ▼
//! SHA-512 stretch → Backup Key
//!        │
//!        ▼
//! HKDF → cipher key, MAC key (FrameKeys)
//!        │
//!        ▼
//! CryptoState: Header IV with counter in bytes [0..4)
//!        │
//!        ├──► frame: AES-256-CTR + HMAC tag
//!        └──► attachment body: AES-256-CTR + 10-byte HMAC(IV ‖ ct)
//! ```
//!
//! Desktop attachments use their own per-file key and AES-256-CBC; they never
//! touch the ratchet.
//!
//! # Security
//!
//! - Key material is zeroized on drop.
//! - Tags are compared in constant time.
//! - A failed tag is a status, not an error: callers get the plaintext and
//!   decide whether to keep it.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod attachment;
pub mod error;
pub mod frame_cipher;
pub mod kdf;
pub mod state;

pub use attachment::{
    ANDROID_MAC_LEN, AndroidDecryptor, AndroidEncryptor, CHUNK_SIZE, DESKTOP_OVERHEAD,
    DesktopKey, DesktopOpened, desktop_ciphertext_len, open_desktop, seal_android, seal_desktop,
};
pub use error::CryptoError;
pub use frame_cipher::{OpenedFrame, apply_ctr, open_frame, seal_frame};
pub use kdf::{
    BackupKey, FrameKeys, PASSPHRASE_DIGITS, STRETCH_ROUNDS, derive_backup_key, derive_frame_keys,
    derive_keys,
};
pub use state::{CryptoState, IV_SIZE, MacEra};
