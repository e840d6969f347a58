//! For walking a Merkle Patricia Trie proof for arbitrary proof values.
//! E.g., Account, storage ...
//!
//! Nodes are consumed strictly in the supplied order, each bound to its
//! parent by a keccak hash reference, except where a subnode is embedded
//! inline in the parent because its own RLP is shorter than 32 bytes.
use ethers::{types::H256, utils::keccak256};
use log::debug;
use rlp::Rlp;
use thiserror::Error;

use crate::{
    node::{NodeError, NodeKind},
    path::{prefixed_bytes_to_nibbles, NibblePath, PathError},
    utils::hex_encode,
};

#[derive(Debug, Error)]
pub enum ProofError {
    #[error("RLP decode error {0}")]
    DecodeError(#[from] rlp::DecoderError),
    #[error(
        "Hash of node {computed} does not match the expected hash in the parent node {expected}"
    )]
    IncorrectHash { computed: String, expected: String },
    #[error("Child reference expected to be a 32 byte hash, got {0} bytes")]
    InvalidHashReference(usize),
    #[error("Key diverges from the compressed path of an extension or leaf node (nibble index {visiting})")]
    KeyMismatchInExtensionOrLeaf { visiting: usize },
    #[error("Leaf node reached with {remaining} path nibbles left untraversed")]
    LeafPathLengthMismatch { remaining: usize },
    #[error("Branch index must be in the range 0-15, got {0}")]
    NibbleOutOfRange(u8),
    #[error("NodeError {0}")]
    NodeError(#[from] NodeError),
    #[error("Trie path error {0}")]
    PathError(#[from] PathError),
}

/// Outcome of walking a proof: the trie either holds encoded bytes at the
/// key, or verifiably holds nothing there.
///
/// An absence result carries no value; what it means is decided by the
/// caller (a missing account is an error, a missing storage slot is zero).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Walked {
    /// Inclusion: the RLP-encoded value stored at the key.
    Found(Vec<u8>),
    /// Exclusion: the trie verifiably does not contain the key.
    Absent,
}

/// Reference to the next node to visit, as recorded in its parent.
///
/// Subnodes whose RLP encoding is shorter than 32 bytes are embedded in the
/// parent rather than hashed, and must be re-entered without consuming a
/// node from the proof list.
enum NextNode<'a> {
    Hash([u8; 32]),
    Inline(&'a [u8]),
}

/// Walks an ordered list of trie nodes from `expected_root` towards the key
/// described by `traversal`.
///
/// The traversal cursor may have been advanced before the call; walking
/// starts from the cursor and the supplied root. On success the cursor has
/// consumed the full path (inclusion) or stopped at the point of proven
/// absence.
pub fn walk(
    traversal: &mut NibblePath,
    proof: &[impl AsRef<[u8]>],
    expected_root: [u8; 32],
) -> Result<Walked, ProofError> {
    let mut next = NextNode::Hash(expected_root);
    let mut nodes = proof.iter();
    loop {
        let node_bytes: &[u8] = match next {
            NextNode::Hash(expected) => {
                let Some(entry) = nodes.next() else {
                    // Nothing more to check the pending hash against.
                    return Ok(Walked::Absent);
                };
                node_hash_correct(entry.as_ref(), expected)?;
                entry.as_ref()
            }
            // Already part of a hash-checked parent.
            NextNode::Inline(embedded) => embedded,
        };
        let node = Rlp::new(node_bytes);

        match NodeKind::deduce(&node)? {
            NodeKind::Branch => {
                if traversal.is_exhausted() {
                    // The path terminates exactly at this branch: item 16.
                    let value = node.at(16)?.data()?;
                    if value.is_empty() {
                        return Ok(Walked::Absent);
                    }
                    return Ok(Walked::Found(value.to_vec()));
                }
                let nibble = traversal.visit_path_nibble()?;
                if nibble > 15 {
                    return Err(ProofError::NibbleOutOfRange(nibble));
                }
                debug!(
                    "following branch item {nibble:x} (nibble {} of path)",
                    traversal.visiting_index()
                );
                let child = node.at(nibble as usize)?;
                match child_reference(&child)? {
                    Some(reference) => next = reference,
                    None => return Ok(Walked::Absent),
                }
            }
            NodeKind::Extension => {
                let segment = prefixed_bytes_to_nibbles(node.at(0)?.data()?)?;
                let shared = traversal.shared_prefix_len(&segment);
                if shared != segment.len() {
                    return Err(ProofError::KeyMismatchInExtensionOrLeaf {
                        visiting: traversal.visiting_index() + shared,
                    });
                }
                traversal.skip(shared)?;
                debug!("skipped {shared} nibbles through extension node");
                let child = node.at(1)?;
                match child_reference(&child)? {
                    Some(reference) => next = reference,
                    None => return Ok(Walked::Absent),
                }
            }
            NodeKind::Leaf => {
                let segment = prefixed_bytes_to_nibbles(node.at(0)?.data()?)?;
                let shared = traversal.shared_prefix_len(&segment);
                if shared != segment.len() {
                    return Err(ProofError::KeyMismatchInExtensionOrLeaf {
                        visiting: traversal.visiting_index() + shared,
                    });
                }
                traversal.skip(shared)?;
                if !traversal.is_exhausted() {
                    return Err(ProofError::LeafPathLengthMismatch {
                        remaining: traversal.remaining().len(),
                    });
                }
                return Ok(Walked::Found(node.at(1)?.data()?.to_vec()));
            }
        }
    }
}

/// Checks that the hash of one node matches the reference in its parent.
fn node_hash_correct(rlp_node: &[u8], parent_hash: [u8; 32]) -> Result<(), ProofError> {
    let computed_hash = keccak256(rlp_node);
    if !computed_hash.eq(&parent_hash) {
        let computed = hex_encode(computed_hash);
        let expected = hex_encode(parent_hash);
        return Err(ProofError::IncorrectHash { computed, expected });
    }
    Ok(())
}

/// Reads a child reference out of a branch item or an extension target.
///
/// An item with no content means no subtree exists on this path. An item
/// whose encoding is shorter than 32 bytes is the child itself, embedded.
/// Anything else must be a 32-byte hash of the child's RLP.
fn child_reference<'a>(child: &Rlp<'a>) -> Result<Option<NextNode<'a>>, ProofError> {
    if child.is_empty() {
        return Ok(None);
    }
    let encoded = child.as_raw();
    if encoded.len() < 32 {
        return Ok(Some(NextNode::Inline(encoded)));
    }
    let hash = child.data()?;
    if hash.len() != 32 {
        return Err(ProofError::InvalidHashReference(hash.len()));
    }
    Ok(Some(NextNode::Hash(H256::from_slice(hash).0)))
}
