//! End-to-end tests for the full vault lifecycle.
//!
//! Drives a vault from deployment through missed heartbeat, challenge
//! window and anonymous claims, with:
//!
//! 1. Claim kits sealed by the owner and unsealed by heirs
//! 2. A transparent membership verifier that checks real Merkle paths
//! 3. Distribution totals, replay protection and rollback on failed transfers
//! 4. State persisted to disk and restored mid-distribution

use std::fs;

use heirloom_core::{seal, unseal_base64, ClaimKit, GroupReference, IdentitySecret, VaultCoordinates};
use heirloom_vault::{
    bind_signal, external_nullifier, verify_merkle_proof, Address, Asset, AssetTransfer,
    ClaimRequest, ExternalNullifier, GroupRegistry, MemoryGroupRegistry, MerkleProof, MerkleRoot,
    Nullifier, Payout, Phase, Signal, TransferError, Vault, VaultConfig, VaultError, VaultEvent,
    VaultId, VaultState, Verifier,
};

const T0: u64 = 1_700_000_000;
const DAY: u64 = 86_400;
const WEEK: u64 = 604_800;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Verifier whose "proof" is the heir secret plus its Merkle path.
///
/// Not zero-knowledge, but checks the same relation a real circuit would:
/// membership under `root` and `nullifier = H(secret, external_nullifier)`.
struct TransparentVerifier;

fn encode_proof(secret: &IdentitySecret, path: &MerkleProof) -> Vec<u8> {
    let mut out = secret.as_bytes().to_vec();
    out.extend_from_slice(&path.leaf_index.to_be_bytes());
    for sibling in &path.siblings {
        out.extend_from_slice(sibling);
    }
    out
}

impl Verifier for TransparentVerifier {
    fn verify(
        &self,
        root: &MerkleRoot,
        nullifier: &Nullifier,
        external_nullifier: &ExternalNullifier,
        _signal: &Signal,
        proof: &[u8],
    ) -> bool {
        if proof.len() < 40 || (proof.len() - 40) % 32 != 0 {
            return false;
        }
        let mut secret = [0u8; 32];
        secret.copy_from_slice(&proof[..32]);
        let secret = IdentitySecret::from_bytes(secret);

        let mut index = [0u8; 8];
        index.copy_from_slice(&proof[32..40]);
        let siblings = proof[40..]
            .chunks(32)
            .map(|c| {
                let mut s = [0u8; 32];
                s.copy_from_slice(c);
                s
            })
            .collect();
        let path = MerkleProof {
            leaf_index: u64::from_be_bytes(index),
            siblings,
        };

        verify_merkle_proof(root, &secret.commitment(), &path)
            && &secret.nullifier(external_nullifier) == nullifier
    }
}

#[derive(Default)]
struct Bank {
    received: Vec<(Address, Payout)>,
    offline: bool,
}

impl Bank {
    fn total(&self, who: &Address, asset: &Asset) -> u128 {
        self.received
            .iter()
            .filter(|(to, p)| to == who && &p.asset == asset)
            .map(|(_, p)| p.amount)
            .sum()
    }

    fn total_of(&self, asset: &Asset) -> u128 {
        self.received
            .iter()
            .filter(|(_, p)| &p.asset == asset)
            .map(|(_, p)| p.amount)
            .sum()
    }
}

impl AssetTransfer for Bank {
    fn transfer_batch(&mut self, recipient: &Address, payouts: &[Payout]) -> Result<(), TransferError> {
        if self.offline {
            return Err(TransferError::Unavailable("bank offline".into()));
        }
        for p in payouts {
            self.received.push((*recipient, *p));
        }
        Ok(())
    }
}

type TestVault = Vault<MemoryGroupRegistry, TransparentVerifier>;

fn owner() -> Address {
    Address([0x0A; 32])
}

fn usdc() -> Address {
    Address([0xC1; 32])
}

fn payout_address(i: u8) -> Address {
    Address([0x50 + i; 32])
}

fn heir(seed: u8) -> IdentitySecret {
    let mut bytes = [0u8; 32];
    bytes[0] = 0x01;
    bytes[31] = seed;
    IdentitySecret::from_bytes(bytes)
}

fn config() -> VaultConfig {
    VaultConfig {
        heartbeat_interval_secs: DAY,
        challenge_window_secs: WEEK,
        tree_depth: 8,
        round: 0,
    }
}

fn deploy(heirs: &[IdentitySecret]) -> TestVault {
    let mut vault = Vault::new(
        VaultId([0x11; 32]),
        owner(),
        &config(),
        MemoryGroupRegistry::new(),
        TransparentVerifier,
        T0,
    )
    .unwrap();
    for h in heirs {
        vault.add_heir(&owner(), h.commitment(), T0).unwrap();
    }
    vault
}

/// Build a claim for `secret` the way an heir's client would.
fn build_claim(vault: &TestVault, secret: &IdentitySecret, to: Address, amount: u128) -> ClaimRequest {
    let registry = vault.heirs().registry();
    let group = vault.heirs().group_id();
    let index = registry.index_of(group, &secret.commitment()).unwrap();
    let path = registry.merkle_proof(group, index).unwrap();
    let ext = external_nullifier(vault.vault_id(), vault.round());

    ClaimRequest {
        tree_depth: registry.depth(group).unwrap(),
        root: registry.root(group).unwrap(),
        nullifier: secret.nullifier(&ext),
        signal: bind_signal(&to, amount, vault.round()),
        proof: encode_proof(secret, &path),
        payout: to,
        amount,
    }
}

/// Deploy, fund with 10 native + 7 USDC, miss the heartbeat, start expiry.
fn lapsed_vault(heirs: &[IdentitySecret]) -> (TestVault, u64) {
    let mut vault = deploy(heirs);
    vault.deposit_native(&owner(), 10, T0).unwrap();
    vault.deposit_asset(&owner(), usdc(), 7, T0).unwrap();
    let end = vault.start_expiry(T0 + DAY + 1).unwrap();
    (vault, end)
}

#[test]
fn test_full_lifecycle_three_heirs() {
    init_logging();
    let heirs = [heir(1), heir(2), heir(3)];
    let mut vault = deploy(&heirs);
    let mut bank = Bank::default();

    vault.deposit_native(&owner(), 10, T0).unwrap();
    vault.deposit_asset(&owner(), usdc(), 7, T0).unwrap();
    assert_eq!(vault.phase(T0), Phase::Alive);

    // Heartbeat half a day in pushes the deadline
    let deadline = vault.keep_alive(&owner(), T0 + DAY / 2).unwrap();
    assert_eq!(deadline, T0 + DAY + DAY / 2);

    // Too early for expiry
    assert!(matches!(
        vault.start_expiry(deadline),
        Err(VaultError::StillAlive)
    ));
    assert_eq!(vault.phase(deadline + 1), Phase::Lapsed);
    assert!(matches!(
        vault.keep_alive(&owner(), deadline + 1),
        Err(VaultError::NotAlive)
    ));

    let end = vault.start_expiry(deadline + 1).unwrap();
    assert_eq!(end, deadline + 1 + WEEK);
    assert_eq!(vault.phase(end), Phase::ChallengeWindow);
    assert!(matches!(
        vault.start_expiry(deadline + 2),
        Err(VaultError::ExpiryAlreadyStarted)
    ));

    // Claims only open once the window has passed
    let early = build_claim(&vault, &heirs[0], payout_address(0), 3);
    assert!(matches!(
        vault.claim(&early, end, &mut bank),
        Err(VaultError::ClaimNotOpen)
    ));

    let mut native = Vec::new();
    let mut tokens = Vec::new();
    for (i, h) in heirs.iter().enumerate() {
        let to = payout_address(i as u8);
        let req = build_claim(&vault, h, to, 3);
        vault.claim(&req, end + 1 + i as u64, &mut bank).unwrap();
        native.push(bank.total(&to, &Asset::Native));
        tokens.push(bank.total(&to, &Asset::Token(usdc())));
    }

    assert_eq!(native, vec![3, 3, 4]);
    assert_eq!(tokens, vec![2, 2, 3]);
    assert_eq!(vault.remaining_of(&Asset::Native), 0);
    assert_eq!(vault.remaining_of(&Asset::Token(usdc())), 0);
    assert_eq!(vault.snapshot_of(&Asset::Native), 10);
    assert_eq!(vault.phase(end + 10), Phase::Drained);

    let again = build_claim(&vault, &heirs[0], payout_address(9), 1);
    assert!(matches!(
        vault.claim(&again, end + 10, &mut bank),
        Err(VaultError::AllHeirsClaimed)
    ));

    let claimed: Vec<u128> = vault
        .take_events()
        .into_iter()
        .filter_map(|e| match e {
            VaultEvent::Claimed { amount, .. } => Some(amount),
            _ => None,
        })
        .collect();
    assert_eq!(claimed, vec![3, 3, 4]);
}

#[test]
fn test_distribution_exact_in_any_claim_order() {
    init_logging();
    let heirs = [heir(1), heir(2), heir(3)];
    let orders = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];

    for order in orders {
        let (mut vault, end) = lapsed_vault(&heirs);
        let mut bank = Bank::default();
        for (n, &i) in order.iter().enumerate() {
            let req = build_claim(&vault, &heirs[i], payout_address(i as u8), 0);
            vault.claim(&req, end + 1 + n as u64, &mut bank).unwrap();
        }
        assert_eq!(bank.total_of(&Asset::Native), 10, "order {:?}", order);
        assert_eq!(bank.total_of(&Asset::Token(usdc())), 7, "order {:?}", order);

        // The last claimant always sweeps the rounding dust
        let last = order[2] as u8;
        assert_eq!(bank.total(&payout_address(last), &Asset::Native), 4);
    }
}

#[test]
fn test_nullifier_cannot_be_reused() {
    init_logging();
    let heirs = [heir(1), heir(2)];
    let (mut vault, end) = lapsed_vault(&heirs);
    let mut bank = Bank::default();

    let first = build_claim(&vault, &heirs[0], payout_address(0), 5);
    vault.claim(&first, end + 1, &mut bank).unwrap();

    // Fresh signal, same identity: same nullifier
    let second = build_claim(&vault, &heirs[0], payout_address(1), 5);
    assert_eq!(first.nullifier, second.nullifier);
    assert!(matches!(
        vault.claim(&second, end + 2, &mut bank),
        Err(VaultError::NullifierConsumed)
    ));
    assert_eq!(vault.lifecycle().heirs_remaining(), 1);
}

#[test]
fn test_outsider_and_cross_vault_proofs_rejected() {
    init_logging();
    let heirs = [heir(1), heir(2)];
    let (mut vault, end) = lapsed_vault(&heirs);
    let mut bank = Bank::default();

    // Nullifier computed for a different vault
    let mut req = build_claim(&vault, &heirs[0], payout_address(0), 5);
    let other = external_nullifier(&VaultId([0x22; 32]), 0);
    req.nullifier = heirs[0].nullifier(&other);
    assert!(matches!(
        vault.claim(&req, end + 1, &mut bank),
        Err(VaultError::InvalidProof)
    ));

    // Outsider borrowing an heir's Merkle path
    let outsider = heir(99);
    let mut req = build_claim(&vault, &heirs[0], payout_address(0), 5);
    let group = vault.heirs().group_id();
    let path = vault.heirs().registry().merkle_proof(group, 0).unwrap();
    req.proof = encode_proof(&outsider, &path);
    req.nullifier = outsider.nullifier(&vault.external_nullifier());
    assert!(matches!(
        vault.claim(&req, end + 1, &mut bank),
        Err(VaultError::InvalidProof)
    ));

    assert!(bank.received.is_empty());
    assert_eq!(vault.lifecycle().heirs_remaining(), 2);
}

#[test]
fn test_stale_root_rejected() {
    init_logging();
    let heirs = [heir(1), heir(2)];
    let mut vault = deploy(&heirs[..1]);
    vault.deposit_native(&owner(), 10, T0).unwrap();

    // Proof built before the second heir joined
    let stale = build_claim(&vault, &heirs[0], payout_address(0), 5);
    vault.add_heir(&owner(), heirs[1].commitment(), T0 + 1).unwrap();

    let end = vault.start_expiry(T0 + 1 + DAY).unwrap();
    let mut bank = Bank::default();
    assert!(matches!(
        vault.claim(&stale, end + 1, &mut bank),
        Err(VaultError::UnknownRoot)
    ));

    let fresh = build_claim(&vault, &heirs[0], payout_address(0), 5);
    vault.claim(&fresh, end + 1, &mut bank).unwrap();
    assert_eq!(bank.total(&payout_address(0), &Asset::Native), 5);
}

#[test]
fn test_owner_revokes_and_lifecycle_restarts() {
    init_logging();
    let heirs = [heir(1), heir(2)];
    let (mut vault, end) = lapsed_vault(&heirs);
    let mut bank = Bank::default();

    let next = vault.revoke_expiry(&owner(), end - 1).unwrap();
    assert_eq!(next, end - 1 + DAY);
    assert_eq!(vault.phase(end + 1), Phase::Alive);
    assert!(matches!(
        vault.revoke_expiry(&owner(), end),
        Err(VaultError::ExpiryNotStarted)
    ));

    let req = build_claim(&vault, &heirs[0], payout_address(0), 5);
    assert!(matches!(
        vault.claim(&req, end + 1, &mut bank),
        Err(VaultError::ClaimNotOpen)
    ));

    // Owner is back in control and tops up
    vault.deposit_native(&owner(), 2, end).unwrap();
    vault.keep_alive(&owner(), end).unwrap();

    // Miss the next heartbeat; second expiry snapshots the new balance
    let end2 = vault.start_expiry(end + DAY + 1).unwrap();
    assert_eq!(vault.snapshot_of(&Asset::Native), 12);

    assert!(matches!(
        vault.revoke_expiry(&owner(), end2 + 1),
        Err(VaultError::ChallengeWindowOver)
    ));

    let req = build_claim(&vault, &heirs[0], payout_address(0), 6);
    vault.claim(&req, end2 + 1, &mut bank).unwrap();
    assert_eq!(bank.total(&payout_address(0), &Asset::Native), 6);
}

#[test]
fn test_failed_transfer_leaves_claim_retryable() {
    init_logging();
    let heirs = [heir(1), heir(2)];
    let (mut vault, end) = lapsed_vault(&heirs);
    let before = vault.state().clone();

    let req = build_claim(&vault, &heirs[0], payout_address(0), 5);
    let mut bank = Bank {
        offline: true,
        ..Default::default()
    };
    let err = vault.claim(&req, end + 1, &mut bank).unwrap_err();
    assert!(matches!(err, VaultError::TransferFailed(_)));
    assert_eq!(vault.state(), &before);

    bank.offline = false;
    vault.claim(&req, end + 1, &mut bank).unwrap();
    assert_eq!(bank.total(&payout_address(0), &Asset::Native), 5);
    assert_eq!(bank.total(&payout_address(0), &Asset::Token(usdc())), 3);
}

#[test]
fn test_heir_claims_from_sealed_kit() {
    init_logging();
    let heirs = [heir(1), heir(2)];
    let (mut vault, end) = lapsed_vault(&heirs);

    // Owner side: seal a kit for heir 2
    let code = "7KQM-XR4T-PZ2N-8HWC-J3VD-6BFE";
    let kit = ClaimKit {
        identity_secret: heirs[1].clone(),
        group: GroupReference {
            group_id: vault.heirs().group_id(),
        },
        vault: VaultCoordinates {
            vault_id: *vault.vault_id(),
            network: "testnet".into(),
            endpoint: None,
        },
        tree_depth: 8,
    };
    let delivered = seal(&kit, code).unwrap().to_base64();

    // Heir side: typed the code in lowercase without dashes
    assert!(unseal_base64(&delivered, "7kqmxr4tpz2n8hwcj3vd6bfe-wrong").is_none());
    let opened = unseal_base64(&delivered, "7kqmxr4tpz2n8hwcj3vd6bfe").unwrap();
    assert_eq!(opened.vault.vault_id, *vault.vault_id());
    assert_eq!(opened.group.group_id, vault.heirs().group_id());

    let mut bank = Bank::default();
    let req = build_claim(&vault, &opened.identity_secret, payout_address(7), 5);
    assert_eq!(req.tree_depth, opened.tree_depth);
    vault.claim(&req, end + 1, &mut bank).unwrap();
    assert_eq!(bank.total(&payout_address(7), &Asset::Native), 5);
}

#[test]
fn test_state_persists_across_restart() {
    init_logging();
    let heirs = [heir(1), heir(2), heir(3)];
    let (mut vault, end) = lapsed_vault(&heirs);
    let mut bank = Bank::default();

    let req = build_claim(&vault, &heirs[0], payout_address(0), 3);
    vault.claim(&req, end + 1, &mut bank).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vault.json");
    fs::write(&path, serde_json::to_string_pretty(vault.state()).unwrap()).unwrap();

    let registry = vault.heirs().registry().clone();
    let state: VaultState = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let mut restored = Vault::restore(state, registry, TransparentVerifier).unwrap();
    assert_eq!(restored.state(), vault.state());

    // Replay still blocked after restart
    assert!(matches!(
        restored.claim(&req, end + 2, &mut bank),
        Err(VaultError::NullifierConsumed)
    ));

    for (i, h) in heirs.iter().enumerate().skip(1) {
        let req = build_claim(&restored, h, payout_address(i as u8), 3);
        restored.claim(&req, end + 2, &mut bank).unwrap();
    }
    assert_eq!(bank.total_of(&Asset::Native), 10);
    assert_eq!(restored.phase(end + 2), Phase::Drained);
}

#[test]
fn test_config_from_toml_drives_timing() {
    init_logging();
    let mut config = VaultConfig::from_toml_str(
        r#"
        heartbeat_interval_secs = 3600
        challenge_window_secs = 600
        tree_depth = 4
        "#,
    )
    .unwrap();
    config.validate().unwrap();
    config.round = 2;

    let mut vault = Vault::new(
        VaultId([0x33; 32]),
        owner(),
        &config,
        MemoryGroupRegistry::new(),
        TransparentVerifier,
        T0,
    )
    .unwrap();
    vault.add_heir(&owner(), heir(1).commitment(), T0).unwrap();
    vault.deposit_native(&owner(), 1, T0).unwrap();

    let end = vault.start_expiry(T0 + 3601).unwrap();
    assert_eq!(end, T0 + 4201);

    let mut bank = Bank::default();
    let req = build_claim(&vault, &heir(1), payout_address(0), 1);
    assert_eq!(req.tree_depth, 4);
    vault.claim(&req, end + 1, &mut bank).unwrap();
    assert_eq!(bank.total(&payout_address(0), &Asset::Native), 1);
}
