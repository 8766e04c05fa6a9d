//! Asset ledger and equal-split distribution.
//!
//! Live balances accrue while the vault is alive. Starting expiry copies
//! them into a frozen snapshot; each claim then takes
//! `floor(remaining / heirs_remaining)` of every asset. The heir whose claim
//! brings `heirs_remaining` to zero divides by one and so sweeps whatever
//! rounding dust is left, which makes the total paid per asset equal its
//! snapshot exactly, whatever order the claims arrive in.
//!
//! Planning a payout is pure ([`Ledger::plan_payout`]); applying it is a
//! separate step ([`Ledger::commit_payout`]) so the caller can commit state
//! before any transfer is issued.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::VaultError;
use crate::transfer::Payout;
use crate::types::Asset;

/// Serde helper: JSON map keys must be strings, so asset-keyed maps are
/// stored as `[asset, value]` pairs.
mod asset_map {
    use super::Asset;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S>(map: &BTreeMap<Asset, u128>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let pairs: Vec<(&Asset, &u128)> = map.iter().collect();
        pairs.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<Asset, u128>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let pairs = Vec::<(Asset, u128)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    /// Assets in first-deposit order
    known_assets: Vec<Asset>,
    /// Membership lookup for `known_assets`
    known: BTreeSet<Asset>,
    #[serde(with = "asset_map")]
    balances: BTreeMap<Asset, u128>,
    #[serde(with = "asset_map")]
    snapshot: BTreeMap<Asset, u128>,
    #[serde(with = "asset_map")]
    remaining: BTreeMap<Asset, u128>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn known_assets(&self) -> &[Asset] {
        &self.known_assets
    }

    pub fn is_known(&self, asset: &Asset) -> bool {
        self.known.contains(asset)
    }

    pub fn balance(&self, asset: &Asset) -> u128 {
        self.balances.get(asset).copied().unwrap_or(0)
    }

    pub fn snapshot(&self, asset: &Asset) -> u128 {
        self.snapshot.get(asset).copied().unwrap_or(0)
    }

    pub fn remaining(&self, asset: &Asset) -> u128 {
        self.remaining.get(asset).copied().unwrap_or(0)
    }

    /// Add to the live balance. Returns `true` if the asset was new.
    pub(crate) fn credit(&mut self, asset: Asset, amount: u128) -> Result<bool, VaultError> {
        let current = self.balance(&asset);
        let updated = current
            .checked_add(amount)
            .ok_or(VaultError::BalanceOverflow)?;
        self.balances.insert(asset, updated);

        let is_new = !self.is_known(&asset);
        if is_new {
            self.known.insert(asset);
            self.known_assets.push(asset);
        }
        Ok(is_new)
    }

    pub(crate) fn debit(&mut self, asset: Asset, amount: u128) -> Result<(), VaultError> {
        let available = self.balance(&asset);
        if available < amount {
            return Err(VaultError::InsufficientBalance {
                available,
                requested: amount,
            });
        }
        self.balances.insert(asset, available - amount);
        Ok(())
    }

    /// Freeze current balances as the distribution pool.
    pub(crate) fn take_snapshot(&mut self) {
        for asset in &self.known_assets {
            let balance = self.balances.get(asset).copied().unwrap_or(0);
            self.snapshot.insert(*asset, balance);
            self.remaining.insert(*asset, balance);
        }
        log::debug!("Snapshot taken over {} assets", self.known_assets.len());
    }

    /// Zero every snapshot and remaining entry. Live balances are untouched.
    pub(crate) fn clear_snapshot(&mut self) {
        for value in self.snapshot.values_mut() {
            *value = 0;
        }
        for value in self.remaining.values_mut() {
            *value = 0;
        }
    }

    /// Shares owed to the next claimant when `heirs_remaining` heirs have
    /// not yet claimed. Assets with a zero share are omitted.
    pub fn plan_payout(&self, heirs_remaining: u64) -> Vec<Payout> {
        if heirs_remaining == 0 {
            return Vec::new();
        }
        let n = heirs_remaining as u128;
        self.known_assets
            .iter()
            .filter_map(|asset| {
                let pool = self.remaining(asset);
                // n == 1: last claimant, floor(pool / 1) sweeps the dust
                let share = pool / n;
                (share > 0).then_some(Payout {
                    asset: *asset,
                    amount: share,
                })
            })
            .collect()
    }

    /// Apply a plan produced by [`Ledger::plan_payout`] on this ledger.
    pub(crate) fn commit_payout(&mut self, plan: &[Payout]) {
        for payout in plan {
            if let Some(pool) = self.remaining.get_mut(&payout.asset) {
                *pool = pool.saturating_sub(payout.amount);
            }
            if let Some(balance) = self.balances.get_mut(&payout.asset) {
                *balance = balance.saturating_sub(payout.amount);
            }
        }
    }
}
