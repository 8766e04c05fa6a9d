//! Asset identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

pub use heirloom_core::identity::{
    Address, Commitment, ExternalNullifier, MerkleRoot, Nullifier, Signal, VaultId,
};

/// A fungible asset the vault can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Asset {
    /// The chain's native currency
    Native,
    /// A fungible token, identified by its contract address
    Token(Address),
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => f.write_str("native"),
            Asset::Token(addr) => write!(f, "token:{}", addr.short()),
        }
    }
}
