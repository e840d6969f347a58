//! Verifier for Ethereum storage inclusion proofs.
//!
//! Given a block header, the block hash it is claimed to have, and the
//! Merkle Patricia Trie proofs returned by `eth_getProof`, proves what a
//! contract's storage slot held when that block was produced.

pub mod eip1186;
pub mod header;
pub mod node;
pub mod path;
pub mod proof;
pub mod utils;
pub mod verify;
