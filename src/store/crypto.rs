//! Password sealing of file payloads
//!
//! Each sealed entry carries its own salt. The key is derived from the
//! password with Argon2id, payloads are sealed with XChaCha20-Poly1305 and a
//! blake3 key check lets the store test a password without opening anything.

use argon2::Argon2;
use blake3::Hasher;
use chacha20poly1305::{
    Key, XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};

use crate::error::{Error, Result};

pub const SALT_LEN: usize = 16;
pub const CHECK_LEN: usize = 32;

const CHECK_CONTEXT: &str = "zipnav 2024 password check";
const PAYLOAD_AD: &[u8] = b"zipnav payload";

/// Header stored next to a sealed payload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Seal {
    pub salt: [u8; SALT_LEN],
    pub check: [u8; CHECK_LEN],
}

/// Key derived from a password and one entry's salt
pub struct SealKey {
    key: [u8; 32],
    salt: [u8; SALT_LEN],
}

impl SealKey {
    pub fn derive(password: &str, salt: [u8; SALT_LEN]) -> Result<Self> {
        let mut key = [0u8; 32];
        Argon2::default()
            .hash_password_into(password.as_bytes(), &salt, &mut key)
            .map_err(|e| Error::format(None, format!("key derivation failed: {e}")))?;
        Ok(Self { key, salt })
    }

    /// Derive a key under a fresh random salt
    pub fn generate(password: &str) -> Result<Self> {
        let mut salt = [0u8; SALT_LEN];
        getrandom::getrandom(&mut salt)
            .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;
        Self::derive(password, salt)
    }

    /// Derive the key a sealed entry was written with
    pub fn for_seal(password: &str, seal: &Seal) -> Result<Self> {
        Self::derive(password, seal.salt)
    }

    pub fn seal_info(&self) -> Seal {
        Seal {
            salt: self.salt,
            check: blake3::derive_key(CHECK_CONTEXT, &self.key),
        }
    }

    pub fn matches(&self, seal: &Seal) -> bool {
        self.salt == seal.salt && self.seal_info().check == seal.check
    }

    // The key is unique per salt, so one nonce per key is enough
    fn nonce(&self) -> XNonce {
        let mut h = Hasher::new();
        h.update(&self.salt);
        h.update(b"payload");
        let out = h.finalize();
        XNonce::from_slice(&out.as_bytes()[..24]).to_owned()
    }

    fn cipher(&self) -> XChaCha20Poly1305 {
        XChaCha20Poly1305::new(Key::from_slice(&self.key))
    }

    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.cipher()
            .encrypt(
                &self.nonce(),
                Payload {
                    msg: plaintext,
                    aad: PAYLOAD_AD,
                },
            )
            .map_err(|_| Error::format(None, "payload encryption failed"))
    }

    /// A payload that fails authentication was sealed with another password
    pub fn open(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.cipher()
            .decrypt(
                &self.nonce(),
                Payload {
                    msg: ciphertext,
                    aad: PAYLOAD_AD,
                },
            )
            .map_err(|_| Error::WrongPassword)
    }
}
