//! Password-based sealing
//!
//! Argon2id key derivation + AES-256-GCM authenticated encryption over
//! arbitrary plaintext. Used by the claim-kit packager.
//!
//! # Security Notes
//!
//! - Argon2id is memory-hard (resistant to GPU/ASIC attacks)
//! - AES-256-GCM authenticates the whole payload, so tampering is detected
//! - Every seal uses a fresh random salt and nonce
//! - Derived keys are zeroized after use

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

/// Argon2id parameters (OWASP recommendations for 2024+)
/// - m_cost: 64 MiB memory
/// - t_cost: 3 iterations
/// - p_cost: 4 parallel threads
const ARGON2_M_COST: u32 = 65536; // 64 MiB
const ARGON2_T_COST: u32 = 3;
const ARGON2_P_COST: u32 = 4;
const ARGON2_OUTPUT_LEN: usize = 32; // 256 bits for AES-256

/// Format marker, bumped if the layout or KDF parameters change.
pub const MAGIC: &[u8; 4] = b"HLK1";

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

const HEADER_LEN: usize = MAGIC.len() + SALT_LEN + NONCE_LEN;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("Decryption failed")]
    DecryptionFailed,
    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),
    #[error("Invalid ciphertext format")]
    InvalidFormat,
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Sealed payload:
/// [magic (4 bytes)][salt (16 bytes)][nonce (12 bytes)][ciphertext + tag]
#[derive(Clone, PartialEq, Eq)]
pub struct SealedBox {
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl SealedBox {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.ciphertext.len());
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&self.salt);
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        // Minimum size: header + at least 1 byte ciphertext + tag
        if bytes.len() < HEADER_LEN + 1 + TAG_LEN {
            return Err(CryptoError::InvalidFormat);
        }
        if &bytes[..MAGIC.len()] != MAGIC {
            return Err(CryptoError::InvalidFormat);
        }

        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        let salt_start = MAGIC.len();
        salt.copy_from_slice(&bytes[salt_start..salt_start + SALT_LEN]);
        nonce.copy_from_slice(&bytes[salt_start + SALT_LEN..HEADER_LEN]);

        Ok(Self {
            salt,
            nonce,
            ciphertext: bytes[HEADER_LEN..].to_vec(),
        })
    }

    pub fn ciphertext_len(&self) -> usize {
        self.ciphertext.len()
    }
}

/// Derive an encryption key from a password using Argon2id
fn derive_key(
    password: &[u8],
    salt: &[u8; SALT_LEN],
) -> Result<Zeroizing<[u8; ARGON2_OUTPUT_LEN]>, CryptoError> {
    let params = Params::new(
        ARGON2_M_COST,
        ARGON2_T_COST,
        ARGON2_P_COST,
        Some(ARGON2_OUTPUT_LEN),
    )
    .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; ARGON2_OUTPUT_LEN]);
    argon2
        .hash_password_into(password, salt, key.as_mut())
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;

    Ok(key)
}

/// Encrypt `plaintext` under `password`.
///
/// Each call generates a new random salt and nonce, so sealing the same
/// plaintext twice yields different boxes.
pub fn seal_bytes(plaintext: &[u8], password: &[u8]) -> Result<SealedBox, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let nonce_arr = Aes256Gcm::generate_nonce(&mut OsRng);
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&nonce_arr);

    let key = derive_key(password, &salt)?;

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_ref()));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    Ok(SealedBox {
        salt,
        nonce,
        ciphertext,
    })
}

/// Decrypt a sealed box.
///
/// A wrong password and a tampered box both fail with
/// [`CryptoError::DecryptionFailed`]; the two cases are not distinguished.
pub fn open_bytes(sealed: &SealedBox, password: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let key = derive_key(password, &sealed.salt)?;

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_ref()));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&sealed.nonce), sealed.ciphertext.as_slice())
        .map_err(|_| CryptoError::DecryptionFailed)?;

    Ok(Zeroizing::new(plaintext))
}

impl Drop for SealedBox {
    fn drop(&mut self) {
        self.salt.zeroize();
        self.nonce.zeroize();
    }
}
