//! Merkle tree over an ordered list of leaf hashes.
//!
//! Adjacent nodes are combined as `SHA256(left || right)`. An odd node at the
//! end of a level is paired with itself, and a single leaf is still combined
//! once, so the root of `[leaf]` is `SHA256(leaf || leaf)`.

use crate::hash::{sha256_concat, Hash};
use serde::{Deserialize, Serialize};

/// A node of the retained pairing structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleNode {
    pub hash: Hash,
    pub children: Option<Box<(MerkleNode, MerkleNode)>>,
}

impl MerkleNode {
    fn leaf(hash: Hash) -> Self {
        Self {
            hash,
            children: None,
        }
    }

    fn parent(left: MerkleNode, right: MerkleNode) -> Self {
        Self {
            hash: sha256_concat(&[left.hash.as_bytes(), right.hash.as_bytes()]),
            children: Some(Box::new((left, right))),
        }
    }
}

/// Which side of the running hash a sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// Inclusion path from a leaf up to the root, bottom-up.
pub type MerklePath = Vec<(Side, Hash)>;

/// A Merkle tree that keeps its structure for path generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleTree {
    root: MerkleNode,
    leaf_count: usize,
    required_bit_width: u32,
}

impl MerkleTree {
    /// Build a tree from leaf hashes. Returns `None` for an empty list.
    pub fn new(leaves: &[Hash]) -> Option<Self> {
        if leaves.is_empty() {
            return None;
        }

        let mut level: Vec<MerkleNode> = leaves.iter().copied().map(MerkleNode::leaf).collect();
        loop {
            let mut next = Vec::with_capacity(level.len().div_ceil(2));
            let mut nodes = level.into_iter();
            while let Some(left) = nodes.next() {
                let right = match nodes.next() {
                    Some(right) => right,
                    None => left.clone(),
                };
                next.push(MerkleNode::parent(left, right));
            }
            level = next;
            if level.len() == 1 {
                break;
            }
        }

        let root = level.pop()?;
        Some(Self {
            root,
            leaf_count: leaves.len(),
            required_bit_width: required_bit_width(leaves.len()),
        })
    }

    pub fn root(&self) -> Hash {
        self.root.hash
    }

    /// The retained pairing structure.
    pub fn structure(&self) -> &MerkleNode {
        &self.root
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// `ceil(log2(leaf_count))`.
    pub fn required_bit_width(&self) -> u32 {
        self.required_bit_width
    }

    /// Inclusion path for the leaf at `index`, walking the binary expansion
    /// of the index from its most significant bit.
    pub fn path(&self, index: usize) -> Option<MerklePath> {
        if index >= self.leaf_count {
            return None;
        }

        let depth = self.required_bit_width.max(1);
        let mut node = &self.root;
        let mut path = Vec::with_capacity(depth as usize);
        for bit in (0..depth).rev() {
            let (left, right) = node.children.as_deref()?;
            if (index >> bit) & 1 == 0 {
                path.push((Side::Right, right.hash));
                node = left;
            } else {
                path.push((Side::Left, left.hash));
                node = right;
            }
        }

        path.reverse();
        Some(path)
    }
}

fn required_bit_width(leaf_count: usize) -> u32 {
    if leaf_count <= 1 {
        0
    } else {
        usize::BITS - (leaf_count - 1).leading_zeros()
    }
}

/// Compute only the root of a non-empty leaf list.
pub fn merkle_root(leaves: &[Hash]) -> Option<Hash> {
    MerkleTree::new(leaves).map(|tree| tree.root())
}

/// Fold `leaf` with each sibling of `path` and compare the result to `root`.
pub fn verify(root: &Hash, path: &[(Side, Hash)], leaf: &Hash) -> bool {
    let computed = path.iter().fold(*leaf, |acc, (side, sibling)| match side {
        Side::Left => sha256_concat(&[sibling.as_bytes(), acc.as_bytes()]),
        Side::Right => sha256_concat(&[acc.as_bytes(), sibling.as_bytes()]),
    });
    computed == *root
}
