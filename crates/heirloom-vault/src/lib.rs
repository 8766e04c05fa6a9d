//! Heirloom Vault
//!
//! A dead-man's-switch vault. The owner keeps it alive with periodic
//! heartbeats; once a heartbeat is missed anyone may start expiry, the owner
//! gets a challenge window to revoke it, and afterwards registered heirs
//! claim equal shares of every asset anonymously.
//!
//! # Lifecycle
//!
//! ```text
//! Alive ──(deadline passes)──► Lapsed ──start_expiry──► ChallengeWindow
//!   ▲                                                        │
//!   └─────────────────────── revoke_expiry ◄─────────────────┤
//!                                                            ▼
//!                                    Drained ◄──claims── Claimable
//! ```
//!
//! # Anonymity
//!
//! Heirs are members of a Merkle group; the vault never learns which heir
//! claimed, only that some member who had not yet claimed did. See
//! [`authorizer`].

pub mod authorizer;
pub mod config;
pub mod error;
pub mod events;
pub mod ledger;
pub mod lifecycle;
pub mod registry;
pub mod transfer;
pub mod types;
pub mod vault;

#[cfg(test)]
pub(crate) mod test_utils;

pub use authorizer::{bind_signal, external_nullifier, ClaimRequest, NullifierSet, Verifier};
pub use config::{ConfigError, VaultConfig};
pub use error::{ErrorKind, VaultError};
pub use events::VaultEvent;
pub use ledger::Ledger;
pub use lifecycle::{HeartbeatAction, HeartbeatConfig, HeartbeatStatus, Lifecycle, Phase};
pub use registry::{
    verify_merkle_proof, GroupId, GroupRegistry, HeirRegistry, MemoryGroupRegistry, MerkleProof,
    RegistryError, MAX_TREE_DEPTH,
};
pub use transfer::{AssetTransfer, Payout, TransferError};
pub use types::{
    Address, Asset, Commitment, ExternalNullifier, MerkleRoot, Nullifier, Signal, VaultId,
};
pub use vault::{ClaimReceipt, Vault, VaultState};
