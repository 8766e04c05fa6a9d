//! Heir membership
//!
//! Heir commitments live in a membership group owned by a [`GroupRegistry`].
//! The vault only forwards new commitments and asks two questions at claim
//! time: how many members are there, and is this root current.
//!
//! [`MemoryGroupRegistry`] is an in-process registry backed by a fixed-depth
//! incremental SHA-256 Merkle tree per group. Empty leaves are zero, and the
//! empty subtree of height `h` hashes to `zeros[h]`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use thiserror::Error;

use crate::types::{Commitment, MerkleRoot};

/// Deepest supported membership tree.
pub const MAX_TREE_DEPTH: u8 = 32;

pub type GroupId = u64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unknown group: {0}")]
    UnknownGroup(GroupId),

    #[error("Tree depth must be between 1 and {max}, got {0}", max = MAX_TREE_DEPTH)]
    InvalidDepth(u8),

    #[error("Commitment already in group")]
    DuplicateMember,

    #[error("Zero commitment")]
    ZeroCommitment,

    #[error("Group is full (depth {depth})")]
    GroupFull { depth: u8 },

    #[error("Leaf index {0} out of range")]
    IndexOutOfRange(u64),
}

/// External membership-group capability.
pub trait GroupRegistry {
    fn create_group(&mut self, depth: u8) -> Result<GroupId, RegistryError>;

    /// Append a member. Returns its leaf index.
    fn add_member(&mut self, group: GroupId, commitment: Commitment)
        -> Result<u64, RegistryError>;

    fn member_count(&self, group: GroupId) -> Result<u64, RegistryError>;

    fn depth(&self, group: GroupId) -> Result<u8, RegistryError>;

    fn root(&self, group: GroupId) -> Result<MerkleRoot, RegistryError>;

    /// Whether `root` is accepted for proofs against `group` right now.
    fn is_valid_root(&self, group: GroupId, root: &MerkleRoot) -> bool;
}

fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

fn zero_hashes(depth: u8) -> Vec<[u8; 32]> {
    let mut zeros = Vec::with_capacity(depth as usize + 1);
    zeros.push([0u8; 32]);
    for level in 0..depth as usize {
        let z = zeros[level];
        zeros.push(hash_pair(&z, &z));
    }
    zeros
}

/// Inclusion proof for one leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf_index: u64,
    /// Sibling hashes from the leaf level upwards
    pub siblings: Vec<[u8; 32]>,
}

/// Recompute the root from `leaf` and `proof`.
pub fn verify_merkle_proof(root: &MerkleRoot, leaf: &Commitment, proof: &MerkleProof) -> bool {
    let mut current = leaf.0;
    let mut idx = proof.leaf_index;
    for sibling in &proof.siblings {
        current = if idx % 2 == 0 {
            hash_pair(&current, sibling)
        } else {
            hash_pair(sibling, &current)
        };
        idx /= 2;
    }
    idx == 0 && current == root.0
}

#[derive(Debug, Clone)]
struct MemoryGroup {
    depth: u8,
    leaves: Vec<Commitment>,
    members: HashSet<Commitment>,
    zeros: Vec<[u8; 32]>,
    /// Rightmost completed left child per level
    filled: Vec<[u8; 32]>,
    root: [u8; 32],
}

impl MemoryGroup {
    fn new(depth: u8) -> Self {
        let zeros = zero_hashes(depth);
        let root = zeros[depth as usize];
        Self {
            depth,
            leaves: Vec::new(),
            members: HashSet::new(),
            filled: zeros[..depth as usize].to_vec(),
            zeros,
            root,
        }
    }

    fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    fn insert(&mut self, commitment: Commitment) -> Result<u64, RegistryError> {
        if commitment.is_zero() {
            return Err(RegistryError::ZeroCommitment);
        }
        if self.members.contains(&commitment) {
            return Err(RegistryError::DuplicateMember);
        }
        let index = self.leaves.len() as u64;
        if index >= self.capacity() {
            return Err(RegistryError::GroupFull { depth: self.depth });
        }

        let mut current = commitment.0;
        let mut idx = index;
        for level in 0..self.depth as usize {
            current = if idx % 2 == 0 {
                self.filled[level] = current;
                hash_pair(&current, &self.zeros[level])
            } else {
                hash_pair(&self.filled[level], &current)
            };
            idx /= 2;
        }

        self.root = current;
        self.leaves.push(commitment);
        self.members.insert(commitment);
        Ok(index)
    }

    fn proof(&self, index: u64) -> Result<MerkleProof, RegistryError> {
        if index >= self.leaves.len() as u64 {
            return Err(RegistryError::IndexOutOfRange(index));
        }

        let mut level_nodes: Vec<[u8; 32]> = self.leaves.iter().map(|c| c.0).collect();
        let mut siblings = Vec::with_capacity(self.depth as usize);
        let mut idx = index as usize;

        for level in 0..self.depth as usize {
            let zero = self.zeros[level];
            let sibling = level_nodes.get(idx ^ 1).copied().unwrap_or(zero);
            siblings.push(sibling);

            level_nodes = level_nodes
                .chunks(2)
                .map(|pair| hash_pair(&pair[0], pair.get(1).unwrap_or(&zero)))
                .collect();
            idx /= 2;
        }

        Ok(MerkleProof {
            leaf_index: index,
            siblings,
        })
    }
}

/// In-process group registry.
///
/// Only each group's current root is valid; any membership change
/// invalidates proofs built against the previous root.
#[derive(Debug, Clone, Default)]
pub struct MemoryGroupRegistry {
    groups: Vec<MemoryGroup>,
}

impl MemoryGroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn group(&self, id: GroupId) -> Result<&MemoryGroup, RegistryError> {
        self.groups
            .get(id as usize)
            .ok_or(RegistryError::UnknownGroup(id))
    }

    /// Inclusion proof for the member at `index`.
    pub fn merkle_proof(&self, group: GroupId, index: u64) -> Result<MerkleProof, RegistryError> {
        self.group(group)?.proof(index)
    }

    /// Leaf index of `commitment`, if it is a member.
    pub fn index_of(&self, group: GroupId, commitment: &Commitment) -> Option<u64> {
        self.group(group)
            .ok()?
            .leaves
            .iter()
            .position(|c| c == commitment)
            .map(|i| i as u64)
    }
}

impl GroupRegistry for MemoryGroupRegistry {
    fn create_group(&mut self, depth: u8) -> Result<GroupId, RegistryError> {
        if depth == 0 || depth > MAX_TREE_DEPTH {
            return Err(RegistryError::InvalidDepth(depth));
        }
        self.groups.push(MemoryGroup::new(depth));
        Ok((self.groups.len() - 1) as GroupId)
    }

    fn add_member(&mut self, group: GroupId, commitment: Commitment) -> Result<u64, RegistryError> {
        self.groups
            .get_mut(group as usize)
            .ok_or(RegistryError::UnknownGroup(group))?
            .insert(commitment)
    }

    fn member_count(&self, group: GroupId) -> Result<u64, RegistryError> {
        Ok(self.group(group)?.leaves.len() as u64)
    }

    fn depth(&self, group: GroupId) -> Result<u8, RegistryError> {
        Ok(self.group(group)?.depth)
    }

    fn root(&self, group: GroupId) -> Result<MerkleRoot, RegistryError> {
        Ok(MerkleRoot(self.group(group)?.root))
    }

    fn is_valid_root(&self, group: GroupId, root: &MerkleRoot) -> bool {
        self.group(group).map(|g| g.root == root.0).unwrap_or(false)
    }
}

/// The vault's view of its heir group.
#[derive(Debug, Clone)]
pub struct HeirRegistry<G> {
    registry: G,
    group: GroupId,
}

impl<G: GroupRegistry> HeirRegistry<G> {
    /// Create a fresh heir group of the given depth.
    pub fn create(mut registry: G, depth: u8) -> Result<Self, RegistryError> {
        let group = registry.create_group(depth)?;
        Ok(Self { registry, group })
    }

    /// Attach to an existing group.
    pub fn attach(registry: G, group: GroupId) -> Result<Self, RegistryError> {
        registry.depth(group)?;
        Ok(Self { registry, group })
    }

    pub fn group_id(&self) -> GroupId {
        self.group
    }

    pub fn add_heir(&mut self, commitment: Commitment) -> Result<u64, RegistryError> {
        self.registry.add_member(self.group, commitment)
    }

    pub fn heir_count(&self) -> Result<u64, RegistryError> {
        self.registry.member_count(self.group)
    }

    pub fn depth(&self) -> Result<u8, RegistryError> {
        self.registry.depth(self.group)
    }

    pub fn root(&self) -> Result<MerkleRoot, RegistryError> {
        self.registry.root(self.group)
    }

    pub fn is_valid_root(&self, root: &MerkleRoot) -> bool {
        self.registry.is_valid_root(self.group, root)
    }

    pub fn registry(&self) -> &G {
        &self.registry
    }
}
