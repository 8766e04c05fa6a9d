//! Events emitted by the vault on every successful state change

use serde::{Deserialize, Serialize};

use crate::transfer::Payout;
use crate::types::{Address, Asset, Commitment, Nullifier, Signal};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultEvent {
    /// An heir commitment joined the membership group
    HeirAdded {
        commitment: Commitment,
        member_count: u64,
    },

    Deposited {
        asset: Asset,
        amount: u128,
    },

    Withdrawn {
        asset: Asset,
        amount: u128,
        to: Address,
    },

    /// Owner proved liveness
    HeartbeatRenewed {
        next_deadline: u64,
    },

    ExpiryStarted {
        challenge_window_end: u64,
    },

    /// Balances frozen at expiry start
    SnapshotTaken {
        heirs: u64,
        native: u128,
        assets: Vec<Asset>,
    },

    ExpiryRevoked {
        next_deadline: u64,
    },

    /// An anonymous heir claimed their share
    Claimed {
        nullifier: Nullifier,
        recipient: Address,
        /// Native amount paid
        amount: u128,
        signal: Signal,
        /// Every asset paid, native included
        payouts: Vec<Payout>,
    },
}

impl VaultEvent {
    /// Short name for log lines
    pub fn name(&self) -> &'static str {
        match self {
            VaultEvent::HeirAdded { .. } => "heir_added",
            VaultEvent::Deposited { .. } => "deposited",
            VaultEvent::Withdrawn { .. } => "withdrawn",
            VaultEvent::HeartbeatRenewed { .. } => "heartbeat_renewed",
            VaultEvent::ExpiryStarted { .. } => "expiry_started",
            VaultEvent::SnapshotTaken { .. } => "snapshot_taken",
            VaultEvent::ExpiryRevoked { .. } => "expiry_revoked",
            VaultEvent::Claimed { .. } => "claimed",
        }
    }
}
