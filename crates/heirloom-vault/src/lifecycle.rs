//! Liveness and expiry state machine.
//!
//! Pure logic over timestamps: every guard compares `now` against stored
//! deadlines, so arbitrarily long gaps between calls are fine.
//!
//! ```text
//!  keep_alive          deadline missed        start_expiry          window ends
//! ┌─────────┐      ┌───────────────────┐    ┌────────────────┐    ┌───────────┐
//! │  Alive  │ ───► │ Lapsed (derived)  │ ─► │ ChallengeWindow│ ─► │ Claimable │
//! └─────────┘      └───────────────────┘    └────────────────┘    └───────────┘
//!      ▲                                           │ revoke_expiry
//!      └───────────────────────────────────────────┘
//! ```
//!
//! Only `challenge_window_end` is stored; Lapsed, Claimable and Drained are
//! derived from it, the deadline and `heirs_remaining`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::VaultError;

/// Derived lifecycle phase at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Heartbeat deadline not yet passed.
    Alive,
    /// Deadline passed, nobody has started expiry yet.
    Lapsed,
    /// Expiry started; owner may still revoke.
    ChallengeWindow,
    /// Window over; heirs may claim.
    Claimable,
    /// Every heir has claimed.
    Drained,
}

/// Stored lifecycle fields.
///
/// Invariants: `challenge_window_end == 0` iff not in expiry; `frozen` iff
/// in expiry; `heirs_remaining <= heirs_total`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    heartbeat_interval: u64,
    challenge_window: u64,
    next_deadline: u64,
    challenge_window_end: u64,
    frozen: bool,
    heirs_total: u64,
    heirs_remaining: u64,
}

impl Lifecycle {
    pub fn new(heartbeat_interval: u64, challenge_window: u64, now: u64) -> Self {
        Self {
            heartbeat_interval,
            challenge_window,
            next_deadline: now.saturating_add(heartbeat_interval),
            challenge_window_end: 0,
            frozen: false,
            heirs_total: 0,
            heirs_remaining: 0,
        }
    }

    pub fn next_deadline(&self) -> u64 {
        self.next_deadline
    }

    pub fn challenge_window_end(&self) -> u64 {
        self.challenge_window_end
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn heirs_total(&self) -> u64 {
        self.heirs_total
    }

    pub fn heirs_remaining(&self) -> u64 {
        self.heirs_remaining
    }

    pub fn heartbeat_interval(&self) -> u64 {
        self.heartbeat_interval
    }

    pub fn is_alive(&self, now: u64) -> bool {
        self.challenge_window_end == 0 && now <= self.next_deadline
    }

    pub fn in_expiry(&self) -> bool {
        self.challenge_window_end != 0
    }

    pub fn in_challenge_window(&self, now: u64) -> bool {
        self.challenge_window_end != 0 && now <= self.challenge_window_end
    }

    pub fn claim_open(&self, now: u64) -> bool {
        self.challenge_window_end != 0 && now > self.challenge_window_end
    }

    pub fn phase(&self, now: u64) -> Phase {
        if !self.in_expiry() {
            if now <= self.next_deadline {
                Phase::Alive
            } else {
                Phase::Lapsed
            }
        } else if now <= self.challenge_window_end {
            Phase::ChallengeWindow
        } else if self.heirs_remaining == 0 {
            Phase::Drained
        } else {
            Phase::Claimable
        }
    }

    pub(crate) fn require_alive(&self, now: u64) -> Result<(), VaultError> {
        if self.is_alive(now) {
            Ok(())
        } else {
            Err(VaultError::NotAlive)
        }
    }

    /// Renew the heartbeat. Returns the new deadline.
    pub(crate) fn renew(&mut self, now: u64) -> Result<u64, VaultError> {
        self.require_alive(now)?;
        self.next_deadline = now.saturating_add(self.heartbeat_interval);
        Ok(self.next_deadline)
    }

    /// Check that expiry may start now with `heirs` group members.
    pub(crate) fn check_expiry(&self, now: u64, heirs: u64) -> Result<(), VaultError> {
        if self.in_expiry() {
            return Err(VaultError::ExpiryAlreadyStarted);
        }
        if now <= self.next_deadline {
            return Err(VaultError::StillAlive);
        }
        if heirs == 0 {
            return Err(VaultError::NoHeirs);
        }
        Ok(())
    }

    /// Enter the challenge window. Returns its end.
    pub(crate) fn begin_expiry(&mut self, now: u64, heirs: u64) -> Result<u64, VaultError> {
        self.check_expiry(now, heirs)?;
        self.frozen = true;
        self.heirs_total = heirs;
        self.heirs_remaining = heirs;
        // Never store 0 here: 0 means "not in expiry"
        self.challenge_window_end = now.saturating_add(self.challenge_window).max(1);
        Ok(self.challenge_window_end)
    }

    /// Owner cancels an expiry inside the challenge window.
    pub(crate) fn revoke(&mut self, now: u64) -> Result<u64, VaultError> {
        if !self.in_expiry() {
            return Err(VaultError::ExpiryNotStarted);
        }
        if now > self.challenge_window_end {
            return Err(VaultError::ChallengeWindowOver);
        }
        self.challenge_window_end = 0;
        self.frozen = false;
        self.heirs_total = 0;
        self.heirs_remaining = 0;
        self.next_deadline = now.saturating_add(self.heartbeat_interval);
        Ok(self.next_deadline)
    }

    pub(crate) fn check_claimable(&self, now: u64) -> Result<(), VaultError> {
        if !self.claim_open(now) {
            return Err(VaultError::ClaimNotOpen);
        }
        if self.heirs_remaining == 0 {
            return Err(VaultError::AllHeirsClaimed);
        }
        Ok(())
    }

    pub(crate) fn record_claim(&mut self) {
        self.heirs_remaining = self.heirs_remaining.saturating_sub(1);
    }

    /// Evaluate how close the owner is to missing a heartbeat.
    pub fn heartbeat_status(&self, now: u64, config: &HeartbeatConfig) -> HeartbeatStatus {
        let last_renewal = self.next_deadline.saturating_sub(self.heartbeat_interval);
        let elapsed = now.saturating_sub(last_renewal);
        let elapsed_fraction = if self.heartbeat_interval == 0 {
            1.0
        } else {
            elapsed as f64 / self.heartbeat_interval as f64
        };
        // Saturate rather than wrap for deadlines beyond i64::MAX
        let secs_remaining = if now <= self.next_deadline {
            i64::try_from(self.next_deadline - now).unwrap_or(i64::MAX)
        } else {
            i64::try_from(now - self.next_deadline)
                .map(|late| -late)
                .unwrap_or(i64::MIN)
        };

        let action = if !self.is_alive(now) {
            HeartbeatAction::Expired
        } else if elapsed_fraction >= config.critical_threshold {
            HeartbeatAction::CheckinRequired
        } else if elapsed_fraction >= config.checkin_threshold {
            HeartbeatAction::CheckinRecommended
        } else {
            HeartbeatAction::Healthy
        };

        HeartbeatStatus {
            next_deadline: self.next_deadline,
            secs_remaining,
            elapsed_fraction,
            action,
        }
    }
}

/// Heartbeat configuration: when to recommend check-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// Fraction of the interval elapsed before recommending check-in (0.0–1.0).
    /// Default: 0.5 (halfway point).
    pub checkin_threshold: f64,

    /// Fraction of the interval elapsed before check-in is critical (0.0–1.0).
    /// Default: 0.9.
    pub critical_threshold: f64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            checkin_threshold: 0.5,
            critical_threshold: 0.9,
        }
    }
}

#[derive(Debug, Error)]
pub enum HeartbeatError {
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),
}

impl HeartbeatConfig {
    pub fn validate(&self) -> Result<(), HeartbeatError> {
        if self.checkin_threshold <= 0.0 || self.checkin_threshold >= 1.0 {
            return Err(HeartbeatError::InvalidThreshold(
                "checkin_threshold must be between 0.0 and 1.0 exclusive".into(),
            ));
        }
        if self.critical_threshold <= self.checkin_threshold || self.critical_threshold >= 1.0 {
            return Err(HeartbeatError::InvalidThreshold(
                "critical_threshold must be between checkin_threshold and 1.0 exclusive".into(),
            ));
        }
        Ok(())
    }
}

/// What the heartbeat recommends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeartbeatAction {
    Healthy,
    CheckinRecommended,
    CheckinRequired,
    /// Deadline passed or expiry started. Too late for a heartbeat.
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatStatus {
    pub next_deadline: u64,
    /// Negative once the deadline has passed
    pub secs_remaining: i64,
    /// Fraction of the interval elapsed (0.0–1.0+)
    pub elapsed_fraction: f64,
    pub action: HeartbeatAction,
}
