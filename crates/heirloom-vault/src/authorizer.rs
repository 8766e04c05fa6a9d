//! Anonymous claim authorization.
//!
//! A claim carries a membership proof over four public values:
//!
//! - `root`: the heir group's Merkle root the proof was built against
//! - `nullifier`: one-time tag derived from the heir's secret and the
//!   external nullifier; reveals nothing about which heir it is
//! - `external_nullifier`: `H(vault_id, round)`, scoping nullifiers to this
//!   vault so a proof for one vault cannot be replayed at another
//! - `signal`: `H(payout, amount, round)`, so a captured proof cannot be
//!   resubmitted with a different payout address
//!
//! Proof arithmetic is delegated to a [`Verifier`]. Nullifier uniqueness is
//! enforced here with a local [`NullifierSet`], updated by the vault in the
//! same state transition as the payout.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

use crate::error::VaultError;
use crate::registry::{GroupRegistry, HeirRegistry};
use crate::types::{Address, ExternalNullifier, MerkleRoot, Nullifier, Signal, VaultId};

const SIGNAL_TAG: &[u8] = b"heirloom/claim-signal/v1";
const EXTERNAL_NULLIFIER_TAG: &[u8] = b"heirloom/external-nullifier/v1";

/// Membership-proof verification backend.
///
/// Returns `true` iff `proof` shows knowledge of a secret whose commitment
/// is a leaf under `root` and whose nullifier for `external_nullifier` is
/// `nullifier`, with `signal` bound in.
pub trait Verifier {
    fn verify(
        &self,
        root: &MerkleRoot,
        nullifier: &Nullifier,
        external_nullifier: &ExternalNullifier,
        signal: &Signal,
        proof: &[u8],
    ) -> bool;
}

impl<V: Verifier + ?Sized> Verifier for &V {
    fn verify(
        &self,
        root: &MerkleRoot,
        nullifier: &Nullifier,
        external_nullifier: &ExternalNullifier,
        signal: &Signal,
        proof: &[u8],
    ) -> bool {
        (**self).verify(root, nullifier, external_nullifier, signal, proof)
    }
}

/// Bind the claim parameters into a proof signal.
pub fn bind_signal(payout: &Address, amount: u128, round: u64) -> Signal {
    let mut hasher = Sha256::new();
    hasher.update(SIGNAL_TAG);
    hasher.update(payout.as_bytes());
    hasher.update(amount.to_be_bytes());
    hasher.update(round.to_be_bytes());
    Signal(hasher.finalize().into())
}

/// Scope for nullifiers of `vault` in `round`.
pub fn external_nullifier(vault: &VaultId, round: u64) -> ExternalNullifier {
    let mut hasher = Sha256::new();
    hasher.update(EXTERNAL_NULLIFIER_TAG);
    hasher.update(vault.as_bytes());
    hasher.update(round.to_be_bytes());
    ExternalNullifier(hasher.finalize().into())
}

/// Consumed nullifiers. Insert-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullifierSet(BTreeSet<Nullifier>);

impl NullifierSet {
    pub fn contains(&self, nullifier: &Nullifier) -> bool {
        self.0.contains(nullifier)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `false` if already present.
    pub(crate) fn insert(&mut self, nullifier: Nullifier) -> bool {
        self.0.insert(nullifier)
    }
}

/// Parameters of one claim, as submitted by an heir.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRequest {
    pub tree_depth: u8,
    pub root: MerkleRoot,
    pub nullifier: Nullifier,
    pub signal: Signal,
    #[serde(with = "hex_bytes")]
    pub proof: Vec<u8>,
    pub payout: Address,
    pub amount: u128,
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

/// Everything the authorizer checks a request against.
pub struct ClaimContext<'a, G, V> {
    pub heirs: &'a HeirRegistry<G>,
    pub verifier: &'a V,
    pub consumed: &'a NullifierSet,
    pub external_nullifier: ExternalNullifier,
    pub round: u64,
}

impl<G: GroupRegistry, V: Verifier> ClaimContext<'_, G, V> {
    /// Check a claim request. Read-only: the caller commits the nullifier.
    pub fn authorize(&self, request: &ClaimRequest) -> Result<(), VaultError> {
        if request.payout.is_zero() {
            return Err(VaultError::ZeroAddress);
        }

        let expected_depth = self.heirs.depth()?;
        if request.tree_depth != expected_depth {
            return Err(VaultError::InvalidTreeDepth {
                expected: expected_depth,
                got: request.tree_depth,
            });
        }

        if !self.heirs.is_valid_root(&request.root) {
            return Err(VaultError::UnknownRoot);
        }

        if self.consumed.contains(&request.nullifier) {
            return Err(VaultError::NullifierConsumed);
        }

        if request.signal != bind_signal(&request.payout, request.amount, self.round) {
            return Err(VaultError::SignalMismatch);
        }

        if !self.verifier.verify(
            &request.root,
            &request.nullifier,
            &self.external_nullifier,
            &request.signal,
            &request.proof,
        ) {
            return Err(VaultError::InvalidProof);
        }

        Ok(())
    }
}
