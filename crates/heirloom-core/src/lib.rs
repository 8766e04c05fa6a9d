//! Heirloom Core
//!
//! Client-side primitives shared by owner and heir tooling.
//!
//! # Identities
//!
//! Each heir holds an [`IdentitySecret`]. The owner registers only its public
//! [`Commitment`]; a claim reveals only a [`Nullifier`].
//!
//! # Claim Kits
//!
//! The owner seals each heir's secret together with the vault coordinates
//! into a [`SealedKit`] using Argon2id + AES-256-GCM under a claim code.

pub mod code;
pub mod crypto;
pub mod identity;
pub mod kit;

pub use code::{analyze_claim_code, generate_claim_code, CodeAnalysis, CodeStrength};
pub use crypto::CryptoError;
pub use identity::{
    Address, Commitment, ExternalNullifier, IdentityError, IdentitySecret, MerkleRoot, Nullifier,
    Signal, VaultId,
};
pub use kit::{seal, unseal, unseal_base64, ClaimKit, GroupReference, SealedKit, VaultCoordinates};
