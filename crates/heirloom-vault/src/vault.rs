//! The vault aggregate.
//!
//! One owned value holds every piece of mutable state; each public method is
//! one transition and either completes fully or returns an error with the
//! state untouched. Time is passed in explicitly as `now` (unix seconds).
//!
//! # Claims
//!
//! `claim` takes `&mut self`, so no other vault operation can run while a
//! claim is in progress, including one triggered from inside the transfer
//! backend. State (remaining pools, `heirs_remaining`, the nullifier) is
//! committed before the transfer batch is issued; if the batch is refused,
//! the pre-claim state is restored.

use serde::{Deserialize, Serialize};

use crate::authorizer::{external_nullifier, ClaimContext, ClaimRequest, NullifierSet, Verifier};
use crate::config::VaultConfig;
use crate::error::VaultError;
use crate::events::VaultEvent;
use crate::ledger::Ledger;
use crate::lifecycle::{HeartbeatConfig, HeartbeatStatus, Lifecycle, Phase};
use crate::registry::{GroupId, GroupRegistry, HeirRegistry};
use crate::transfer::{AssetTransfer, Payout};
use crate::types::{Address, Asset, Commitment, ExternalNullifier, VaultId};

/// Serializable vault state. Capabilities (registry, verifier) are not
/// part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultState {
    pub vault_id: VaultId,
    pub owner: Address,
    pub group_id: GroupId,
    pub round: u64,
    pub lifecycle: Lifecycle,
    pub ledger: Ledger,
    pub nullifiers: NullifierSet,
}

/// Result of a successful claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimReceipt {
    pub payouts: Vec<Payout>,
    pub heirs_remaining: u64,
}

impl ClaimReceipt {
    pub fn amount_of(&self, asset: &Asset) -> u128 {
        self.payouts
            .iter()
            .filter(|p| &p.asset == asset)
            .map(|p| p.amount)
            .sum()
    }
}

pub struct Vault<G, V> {
    state: VaultState,
    heirs: HeirRegistry<G>,
    verifier: V,
    events: Vec<VaultEvent>,
}

impl<G: GroupRegistry, V: Verifier> Vault<G, V> {
    /// Deploy a new vault at `now`, creating its heir group in `registry`.
    pub fn new(
        vault_id: VaultId,
        owner: Address,
        config: &VaultConfig,
        registry: G,
        verifier: V,
        now: u64,
    ) -> Result<Self, VaultError> {
        config.validate()?;
        if owner.is_zero() {
            return Err(VaultError::ZeroAddress);
        }
        let heirs = HeirRegistry::create(registry, config.tree_depth)?;

        log::info!(
            "Vault {} deployed: heartbeat every {}s, challenge window {}s, heir group {}",
            vault_id.short(),
            config.heartbeat_interval_secs,
            config.challenge_window_secs,
            heirs.group_id()
        );

        Ok(Self {
            state: VaultState {
                vault_id,
                owner,
                group_id: heirs.group_id(),
                round: config.round,
                lifecycle: Lifecycle::new(
                    config.heartbeat_interval_secs,
                    config.challenge_window_secs,
                    now,
                ),
                ledger: Ledger::new(),
                nullifiers: NullifierSet::default(),
            },
            heirs,
            verifier,
            events: Vec::new(),
        })
    }

    /// Rebuild a vault from persisted state.
    pub fn restore(state: VaultState, registry: G, verifier: V) -> Result<Self, VaultError> {
        let heirs = HeirRegistry::attach(registry, state.group_id)?;
        Ok(Self {
            state,
            heirs,
            verifier,
            events: Vec::new(),
        })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn state(&self) -> &VaultState {
        &self.state
    }

    pub fn vault_id(&self) -> &VaultId {
        &self.state.vault_id
    }

    pub fn owner(&self) -> &Address {
        &self.state.owner
    }

    pub fn heirs(&self) -> &HeirRegistry<G> {
        &self.heirs
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.state.lifecycle
    }

    pub fn ledger(&self) -> &Ledger {
        &self.state.ledger
    }

    pub fn is_alive(&self, now: u64) -> bool {
        self.state.lifecycle.is_alive(now)
    }

    pub fn in_expiry(&self) -> bool {
        self.state.lifecycle.in_expiry()
    }

    pub fn in_challenge_window(&self, now: u64) -> bool {
        self.state.lifecycle.in_challenge_window(now)
    }

    pub fn claim_open(&self, now: u64) -> bool {
        self.state.lifecycle.claim_open(now)
    }

    pub fn phase(&self, now: u64) -> Phase {
        self.state.lifecycle.phase(now)
    }

    pub fn heartbeat_status(&self, now: u64, config: &HeartbeatConfig) -> HeartbeatStatus {
        self.state.lifecycle.heartbeat_status(now, config)
    }

    pub fn snapshot_of(&self, asset: &Asset) -> u128 {
        self.state.ledger.snapshot(asset)
    }

    pub fn remaining_of(&self, asset: &Asset) -> u128 {
        self.state.ledger.remaining(asset)
    }

    pub fn balance_of(&self, asset: &Asset) -> u128 {
        self.state.ledger.balance(asset)
    }

    pub fn known_assets(&self) -> &[Asset] {
        self.state.ledger.known_assets()
    }

    pub fn external_nullifier(&self) -> ExternalNullifier {
        external_nullifier(&self.state.vault_id, self.state.round)
    }

    pub fn round(&self) -> u64 {
        self.state.round
    }

    /// Drain events emitted since the last call.
    pub fn take_events(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------
    // Owner operations
    // ------------------------------------------------------------------

    fn require_owner(&self, caller: &Address) -> Result<(), VaultError> {
        if caller != &self.state.owner {
            return Err(VaultError::NotOwner);
        }
        Ok(())
    }

    fn emit(&mut self, event: VaultEvent) {
        log::debug!("event: {}", event.name());
        self.events.push(event);
    }

    pub fn keep_alive(&mut self, caller: &Address, now: u64) -> Result<u64, VaultError> {
        self.require_owner(caller)?;
        let next_deadline = self.state.lifecycle.renew(now)?;
        log::info!("Heartbeat renewed, next deadline {}", next_deadline);
        self.emit(VaultEvent::HeartbeatRenewed { next_deadline });
        Ok(next_deadline)
    }

    /// Register an heir commitment. Returns the new member count.
    pub fn add_heir(
        &mut self,
        caller: &Address,
        commitment: Commitment,
        now: u64,
    ) -> Result<u64, VaultError> {
        self.require_owner(caller)?;
        self.state.lifecycle.require_alive(now)?;
        self.heirs.add_heir(commitment)?;
        let member_count = self.heirs.heir_count()?;

        log::info!("Heir added ({} registered)", member_count);
        self.emit(VaultEvent::HeirAdded {
            commitment,
            member_count,
        });
        Ok(member_count)
    }

    fn check_live_funds(&self, caller: &Address, now: u64) -> Result<(), VaultError> {
        self.require_owner(caller)?;
        if self.state.lifecycle.is_frozen() {
            return Err(VaultError::DepositsFrozen);
        }
        self.state.lifecycle.require_alive(now)
    }

    pub fn deposit_native(
        &mut self,
        caller: &Address,
        amount: u128,
        now: u64,
    ) -> Result<(), VaultError> {
        self.deposit(caller, Asset::Native, amount, now)
    }

    pub fn deposit_asset(
        &mut self,
        caller: &Address,
        token: Address,
        amount: u128,
        now: u64,
    ) -> Result<(), VaultError> {
        self.deposit(caller, Asset::Token(token), amount, now)
    }

    fn deposit(
        &mut self,
        caller: &Address,
        asset: Asset,
        amount: u128,
        now: u64,
    ) -> Result<(), VaultError> {
        self.check_live_funds(caller, now)?;
        if amount == 0 {
            return Err(VaultError::InvalidAmount);
        }
        if let Asset::Token(token) = &asset {
            if token.is_zero() {
                return Err(VaultError::ZeroAddress);
            }
        }

        if self.state.ledger.credit(asset, amount)? {
            log::info!("New asset registered: {}", asset);
        }
        self.emit(VaultEvent::Deposited { asset, amount });
        Ok(())
    }

    /// Owner moves live funds out while the vault is alive.
    pub fn withdraw(
        &mut self,
        caller: &Address,
        asset: Asset,
        amount: u128,
        to: Address,
        now: u64,
        sink: &mut impl AssetTransfer,
    ) -> Result<(), VaultError> {
        self.check_live_funds(caller, now)?;
        if amount == 0 {
            return Err(VaultError::InvalidAmount);
        }
        if to.is_zero() {
            return Err(VaultError::ZeroAddress);
        }

        let before = self.state.ledger.clone();
        self.state.ledger.debit(asset, amount)?;

        let payout = [Payout { asset, amount }];
        if let Err(e) = sink.transfer_batch(&to, &payout) {
            log::warn!("Withdrawal of {} aborted: {}", asset, e);
            self.state.ledger = before;
            return Err(e.into());
        }

        self.emit(VaultEvent::Withdrawn { asset, amount, to });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Expiry
    // ------------------------------------------------------------------

    /// Start expiry after a missed heartbeat. Anyone may call this.
    pub fn start_expiry(&mut self, now: u64) -> Result<u64, VaultError> {
        let heirs = self.heirs.heir_count()?;
        let end = self.state.lifecycle.begin_expiry(now, heirs)?;
        self.state.ledger.take_snapshot();

        log::info!(
            "Expiry started with {} heirs, challenge window ends {}",
            heirs,
            end
        );
        self.emit(VaultEvent::ExpiryStarted {
            challenge_window_end: end,
        });
        self.emit(VaultEvent::SnapshotTaken {
            heirs,
            native: self.state.ledger.snapshot(&Asset::Native),
            assets: self.state.ledger.known_assets().to_vec(),
        });
        Ok(end)
    }

    /// Owner cancels expiry inside the challenge window.
    pub fn revoke_expiry(&mut self, caller: &Address, now: u64) -> Result<u64, VaultError> {
        self.require_owner(caller)?;
        let next_deadline = self.state.lifecycle.revoke(now)?;
        self.state.ledger.clear_snapshot();

        log::info!("Expiry revoked by owner, next deadline {}", next_deadline);
        self.emit(VaultEvent::ExpiryRevoked { next_deadline });
        Ok(next_deadline)
    }

    // ------------------------------------------------------------------
    // Claims
    // ------------------------------------------------------------------

    /// Anonymous heir claim. Pays this heir's share of every asset to
    /// `request.payout`.
    pub fn claim(
        &mut self,
        request: &ClaimRequest,
        now: u64,
        sink: &mut impl AssetTransfer,
    ) -> Result<ClaimReceipt, VaultError> {
        self.state.lifecycle.check_claimable(now)?;

        let ctx = ClaimContext {
            heirs: &self.heirs,
            verifier: &self.verifier,
            consumed: &self.state.nullifiers,
            external_nullifier: self.external_nullifier(),
            round: self.state.round,
        };
        if let Err(e) = ctx.authorize(request) {
            log::warn!(
                "Claim with nullifier {} rejected: {}",
                request.nullifier.short(),
                e
            );
            return Err(e);
        }

        let heirs_remaining = self.state.lifecycle.heirs_remaining();
        let plan = self.state.ledger.plan_payout(heirs_remaining);

        // Effects first
        let before = self.state.clone();
        self.state.nullifiers.insert(request.nullifier);
        self.state.ledger.commit_payout(&plan);
        self.state.lifecycle.record_claim();

        // Then the interaction
        if let Err(e) = sink.transfer_batch(&request.payout, &plan) {
            log::warn!(
                "Claim with nullifier {} aborted, transfer failed: {}",
                request.nullifier.short(),
                e
            );
            self.state = before;
            return Err(e.into());
        }

        let receipt = ClaimReceipt {
            heirs_remaining: self.state.lifecycle.heirs_remaining(),
            payouts: plan,
        };
        let native = receipt.amount_of(&Asset::Native);

        log::info!(
            "Claim {} paid {} assets ({} native), {} heirs remaining",
            request.nullifier.short(),
            receipt.payouts.len(),
            native,
            receipt.heirs_remaining
        );
        self.emit(VaultEvent::Claimed {
            nullifier: request.nullifier,
            recipient: request.payout,
            amount: native,
            signal: request.signal,
            payouts: receipt.payouts.clone(),
        });
        Ok(receipt)
    }
}
