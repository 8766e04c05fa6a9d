//! Heir identity types
//!
//! An heir is represented publicly by a [`Commitment`] and privately by an
//! [`IdentitySecret`]. Claims reveal only a [`Nullifier`], which is derived
//! from the secret and an [`ExternalNullifier`] scoping it to one vault round.
//!
//! The commitment and nullifier functions here are domain-separated SHA-256.
//! A production deployment swaps in the hash its proving backend expects;
//! the vault only ever sees the 32-byte outputs.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

const COMMITMENT_TAG: &[u8] = b"heirloom/identity-commitment/v1";
const NULLIFIER_TAG: &[u8] = b"heirloom/nullifier/v1";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("Expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

fn parse_hash32(s: &str) -> Result<[u8; 32], IdentityError> {
    let bytes = hex::decode(s).map_err(|e| IdentityError::InvalidHex(e.to_string()))?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| IdentityError::InvalidLength(len))
}

/// Declares a public 32-byte value that serializes as lowercase hex.
macro_rules! hash32_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            pub const ZERO: Self = Self([0u8; 32]);

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 32]
            }

            /// First four bytes as hex, for log lines.
            pub fn short(&self) -> String {
                hex::encode(&self.0[..4])
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = IdentityError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_hash32(s).map(Self)
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hash32_type!(
    /// Public commitment to an heir's identity secret (a group member leaf).
    Commitment
);
hash32_type!(
    /// One-time value consumed by a successful claim.
    Nullifier
);
hash32_type!(
    /// Domain separator binding nullifiers to one vault and round.
    ExternalNullifier
);
hash32_type!(
    /// Application data bound into a membership proof.
    Signal
);
hash32_type!(
    /// Root of a membership tree.
    MerkleRoot
);
hash32_type!(
    /// Account identity: vault owner, payout recipient or token contract.
    Address
);
hash32_type!(
    /// Identity of one vault deployment.
    VaultId
);

/// An heir's private identity. Never leaves the heir's device.
#[derive(Clone, Zeroize, ZeroizeOnDrop, PartialEq, Eq)]
pub struct IdentitySecret([u8; 32]);

impl IdentitySecret {
    /// Fresh secret from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The public commitment registered on the heir's behalf.
    pub fn commitment(&self) -> Commitment {
        let mut hasher = Sha256::new();
        hasher.update(COMMITMENT_TAG);
        hasher.update(self.0);
        Commitment(hasher.finalize().into())
    }

    /// The nullifier this identity reveals when claiming under `external`.
    pub fn nullifier(&self, external: &ExternalNullifier) -> Nullifier {
        let mut hasher = Sha256::new();
        hasher.update(NULLIFIER_TAG);
        hasher.update(self.0);
        hasher.update(external.0);
        Nullifier(hasher.finalize().into())
    }
}

impl fmt::Debug for IdentitySecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IdentitySecret(<redacted>)")
    }
}

impl Serialize for IdentitySecret {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut encoded = hex::encode(self.0);
        let result = serializer.serialize_str(&encoded);
        encoded.zeroize();
        result
    }
}

impl<'de> Deserialize<'de> for IdentitySecret {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let mut s = String::deserialize(deserializer)?;
        let parsed = parse_hash32(&s);
        s.zeroize();
        parsed.map(Self).map_err(serde::de::Error::custom)
    }
}
