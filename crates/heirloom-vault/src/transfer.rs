//! Outbound value transfer
//!
//! The vault never moves value itself. It hands a batch of payouts to an
//! [`AssetTransfer`] only after its own state is committed, and rolls that
//! state back if the batch is refused.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Address, Asset};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Transfer of {asset} rejected: {reason}")]
    Rejected { asset: Asset, reason: String },

    #[error("Transfer backend unavailable: {0}")]
    Unavailable(String),
}

/// One asset amount leaving the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub asset: Asset,
    pub amount: u128,
}

/// Effectful transfer backend.
///
/// `transfer_batch` must be all-or-nothing: on `Err`, none of the payouts
/// may have been delivered.
pub trait AssetTransfer {
    fn transfer_batch(&mut self, recipient: &Address, payouts: &[Payout])
        -> Result<(), TransferError>;
}
