//! Vault errors
//!
//! Every variant aborts the operation that raised it with no state change.

use thiserror::Error;

use crate::config::ConfigError;
use crate::registry::RegistryError;
use crate::transfer::TransferError;

/// Broad error classes, for callers deciding whether to wait, fix input,
/// or give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation not valid in the current lifecycle state; wait for a
    /// state or time transition.
    State,
    /// Caller lacks the role, or the proof is invalid or already used.
    Authorization,
    /// Malformed input.
    Input,
    /// Nothing left to act on, or the pool is frozen.
    ResourceExhaustion,
}

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Vault is not alive (in expiry or heartbeat deadline passed)")]
    NotAlive,

    #[error("Heartbeat deadline has not passed yet")]
    StillAlive,

    #[error("Expiry already started")]
    ExpiryAlreadyStarted,

    #[error("Expiry has not started")]
    ExpiryNotStarted,

    #[error("Challenge window is over")]
    ChallengeWindowOver,

    #[error("Claims are not open yet")]
    ClaimNotOpen,

    #[error("Caller is not the vault owner")]
    NotOwner,

    #[error("Membership proof rejected")]
    InvalidProof,

    #[error("Merkle root is not recognised for the heir group")]
    UnknownRoot,

    #[error("Signal does not bind the claim parameters")]
    SignalMismatch,

    #[error("Nullifier already consumed")]
    NullifierConsumed,

    #[error("Zero address")]
    ZeroAddress,

    #[error("Amount must be non-zero")]
    InvalidAmount,

    #[error("Tree depth {got} does not match heir group depth {expected}")]
    InvalidTreeDepth { expected: u8, got: u8 },

    #[error("Balance overflow")]
    BalanceOverflow,

    #[error("Insufficient balance: have {available}, need {requested}")]
    InsufficientBalance { available: u128, requested: u128 },

    #[error("No heirs registered")]
    NoHeirs,

    #[error("All heirs have claimed")]
    AllHeirsClaimed,

    #[error("Deposits are frozen during expiry")]
    DepositsFrozen,

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Transfer failed: {0}")]
    TransferFailed(#[from] TransferError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl VaultError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VaultError::NotAlive
            | VaultError::StillAlive
            | VaultError::ExpiryAlreadyStarted
            | VaultError::ExpiryNotStarted
            | VaultError::ChallengeWindowOver
            | VaultError::ClaimNotOpen
            | VaultError::TransferFailed(_) => ErrorKind::State,

            VaultError::NotOwner
            | VaultError::InvalidProof
            | VaultError::UnknownRoot
            | VaultError::SignalMismatch
            | VaultError::NullifierConsumed => ErrorKind::Authorization,

            VaultError::ZeroAddress
            | VaultError::InvalidAmount
            | VaultError::InvalidTreeDepth { .. }
            | VaultError::BalanceOverflow
            | VaultError::Config(_) => ErrorKind::Input,

            VaultError::InsufficientBalance { .. }
            | VaultError::NoHeirs
            | VaultError::AllHeirsClaimed
            | VaultError::DepositsFrozen => ErrorKind::ResourceExhaustion,

            VaultError::Registry(RegistryError::GroupFull { .. }) => ErrorKind::ResourceExhaustion,
            VaultError::Registry(_) => ErrorKind::Input,
        }
    }
}
