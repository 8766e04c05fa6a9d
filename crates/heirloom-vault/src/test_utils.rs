//! Shared test utilities for heirloom-vault tests.
//!
//! Deterministic identities, mock capabilities and a vault fixture used
//! across the unit test modules.

use std::cell::Cell;

use crate::authorizer::{bind_signal, ClaimRequest, Verifier};
use crate::config::VaultConfig;
use crate::registry::MemoryGroupRegistry;
use crate::transfer::{AssetTransfer, Payout, TransferError};
use crate::types::{Address, Asset, ExternalNullifier, MerkleRoot, Nullifier, Signal, VaultId};
use crate::vault::Vault;
use heirloom_core::IdentitySecret;

pub const T0: u64 = 1_700_000_000;
pub const DAY: u64 = 86_400;
pub const WEEK: u64 = 604_800;

/// Deterministic heir identity. Different seeds give different identities.
pub fn heir_identity(seed: u8) -> IdentitySecret {
    let mut bytes = [0u8; 32];
    bytes[0] = 0x01;
    bytes[31] = seed;
    IdentitySecret::from_bytes(bytes)
}

pub fn owner() -> Address {
    Address([0x0A; 32])
}

pub fn token(seed: u8) -> Address {
    Address([0xC0 ^ seed; 32])
}

/// Verifier that returns a fixed answer and counts calls.
pub struct MockVerifier {
    accept: bool,
    calls: Cell<usize>,
}

impl MockVerifier {
    pub fn accepting() -> Self {
        Self {
            accept: true,
            calls: Cell::new(0),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            accept: false,
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Verifier for MockVerifier {
    fn verify(
        &self,
        _root: &MerkleRoot,
        _nullifier: &Nullifier,
        _external_nullifier: &ExternalNullifier,
        _signal: &Signal,
        _proof: &[u8],
    ) -> bool {
        self.calls.set(self.calls.get() + 1);
        self.accept
    }
}

/// Transfer backend that records every batch, or refuses all of them.
#[derive(Debug, Default)]
pub struct RecordingTransfer {
    pub transfers: Vec<(Address, Vec<Payout>)>,
    fail: bool,
}

impl RecordingTransfer {
    pub fn failing() -> Self {
        Self {
            transfers: Vec::new(),
            fail: true,
        }
    }

    pub fn total_to(&self, recipient: &Address, asset: &Asset) -> u128 {
        self.transfers
            .iter()
            .filter(|(to, _)| to == recipient)
            .flat_map(|(_, payouts)| payouts.iter())
            .filter(|p| &p.asset == asset)
            .map(|p| p.amount)
            .sum()
    }
}

impl AssetTransfer for RecordingTransfer {
    fn transfer_batch(&mut self, recipient: &Address, payouts: &[Payout]) -> Result<(), TransferError> {
        if self.fail {
            return Err(TransferError::Unavailable("backend offline".into()));
        }
        self.transfers.push((*recipient, payouts.to_vec()));
        Ok(())
    }
}

/// A vault deployed at `T0` with a one-day heartbeat, one-week challenge
/// window and `heirs` registered heirs (seeds `1..=heirs`).
pub fn vault_with_heirs(heirs: u8) -> Vault<MemoryGroupRegistry, MockVerifier> {
    let config = VaultConfig {
        heartbeat_interval_secs: DAY,
        challenge_window_secs: WEEK,
        tree_depth: 10,
        round: 0,
    };
    let mut vault = Vault::new(
        VaultId([0x11; 32]),
        owner(),
        &config,
        MemoryGroupRegistry::new(),
        MockVerifier::accepting(),
        T0,
    )
    .unwrap();
    for seed in 1..=heirs {
        vault
            .add_heir(&owner(), heir_identity(seed).commitment(), T0)
            .unwrap();
    }
    vault
}

/// A well-formed claim by heir `seed` against the vault's current root.
pub fn claim_request(
    vault: &Vault<MemoryGroupRegistry, MockVerifier>,
    seed: u8,
    payout: Address,
    amount: u128,
) -> ClaimRequest {
    ClaimRequest {
        tree_depth: vault.heirs().depth().unwrap(),
        root: vault.heirs().root().unwrap(),
        nullifier: heir_identity(seed).nullifier(&vault.external_nullifier()),
        signal: bind_signal(&payout, amount, vault.round()),
        proof: vec![0xAB; 8],
        payout,
        amount,
    }
}
