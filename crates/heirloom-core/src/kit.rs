//! Claim kits
//!
//! A claim kit is everything an heir needs to claim anonymously: their
//! identity secret, which membership group to prove against, and where the
//! vault lives. The owner seals one kit per heir under a claim code and
//! delivers both out-of-band (usually by different channels).
//!
//! Kits never touch the vault. The identity secret stays on the heir's
//! device and is only used to build a membership proof.
//!
//! # Failure behaviour
//!
//! [`unseal`] returns `None` for every failure: wrong code, truncated or
//! corrupted bytes, bad base64, unknown version. A caller cannot tell a
//! wrong guess from a damaged kit.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::code::normalize_claim_code;
use crate::crypto::{open_bytes, seal_bytes, CryptoError, SealedBox};
use crate::identity::{IdentitySecret, VaultId};

/// Current kit format version.
pub const KIT_VERSION: u32 = 1;

/// Which membership group the heir belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupReference {
    /// Group identifier in the registry
    pub group_id: u64,
}

/// Where to find the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultCoordinates {
    pub vault_id: VaultId,
    /// Network label, e.g. "mainnet"
    pub network: String,
    /// Optional endpoint the heir's client should talk to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Decrypted claim kit contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimKit {
    pub identity_secret: IdentitySecret,
    pub group: GroupReference,
    pub vault: VaultCoordinates,
    /// Depth of the group's membership tree
    pub tree_depth: u8,
}

#[derive(Serialize, Deserialize)]
struct KitEnvelope {
    version: u32,
    #[serde(flatten)]
    kit: ClaimKit,
}

/// An encrypted claim kit, ready for delivery.
#[derive(Clone, PartialEq, Eq)]
pub struct SealedKit(SealedBox);

impl SealedKit {
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes()
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0.to_bytes())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        SealedBox::from_bytes(bytes).map(Self)
    }

    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|_| CryptoError::InvalidFormat)?;
        Self::from_bytes(&bytes)
    }
}

impl std::fmt::Debug for SealedKit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SealedKit({} bytes)", self.0.ciphertext_len())
    }
}

/// Seal a claim kit under `claim_code`.
pub fn seal(kit: &ClaimKit, claim_code: &str) -> Result<SealedKit, CryptoError> {
    let envelope = KitEnvelope {
        version: KIT_VERSION,
        kit: kit.clone(),
    };
    let plaintext = Zeroizing::new(serde_json::to_vec(&envelope)?);
    let code = normalize_claim_code(claim_code);
    seal_bytes(&plaintext, code.as_bytes()).map(SealedKit)
}

/// Unseal raw kit bytes. `None` on any failure.
pub fn unseal(bytes: &[u8], claim_code: &str) -> Option<ClaimKit> {
    let sealed = SealedBox::from_bytes(bytes).ok()?;
    open(&sealed, claim_code)
}

/// Unseal a base64 kit as delivered to the heir. `None` on any failure.
pub fn unseal_base64(encoded: &str, claim_code: &str) -> Option<ClaimKit> {
    let sealed = SealedKit::from_base64(encoded).ok()?;
    open(&sealed.0, claim_code)
}

fn open(sealed: &SealedBox, claim_code: &str) -> Option<ClaimKit> {
    let code = normalize_claim_code(claim_code);
    let plaintext = open_bytes(sealed, code.as_bytes()).ok()?;
    let envelope: KitEnvelope = serde_json::from_slice(&plaintext).ok()?;
    if envelope.version != KIT_VERSION {
        return None;
    }
    Some(envelope.kit)
}
