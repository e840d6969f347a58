//! For anchoring a verification to a block header.
//!
//! The header is consumed as opaque RLP: the only fields that matter are
//! the overall encoding (whose keccak must equal the asserted block hash)
//! and the state root at field index 3. Every hardfork's header schema
//! keeps the state root at that index, so no schema knowledge is needed.
use ethers::{types::H256, utils::keccak256};
use rlp::Rlp;
use thiserror::Error;

use crate::utils::hex_encode;

/// Position of the state root in the header's outer RLP list.
const STATE_ROOT_FIELD: usize = 3;

#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("Hash of header {computed} does not match the asserted block hash {expected}")]
    BlockHashMismatch { computed: String, expected: String },
    #[error("RLP decode error {0}")]
    DecodeError(#[from] rlp::DecoderError),
    #[error("Header state root expected to be 32 bytes, got {0}")]
    InvalidStateRoot(usize),
    #[error("Header RLP expected to be a list of at least 4 items, got {0}")]
    TooFewFields(usize),
}

/// Extracts the state root from an RLP-encoded block header.
pub fn state_root(header_rlp: &[u8]) -> Result<H256, HeaderError> {
    let header = Rlp::new(header_rlp);
    let field_count = header.item_count()?;
    if field_count <= STATE_ROOT_FIELD {
        return Err(HeaderError::TooFewFields(field_count));
    }
    let root = header.at(STATE_ROOT_FIELD)?.data()?;
    if root.len() != 32 {
        return Err(HeaderError::InvalidStateRoot(root.len()));
    }
    Ok(H256::from_slice(root))
}

/// Checks that the header encoding matches the block hash asserted by the
/// caller. Everything proven downstream is conditional on this hash.
pub fn check_hash(header_rlp: &[u8], block_hash: H256) -> Result<(), HeaderError> {
    let computed = H256(keccak256(header_rlp));
    if computed != block_hash {
        return Err(HeaderError::BlockHashMismatch {
            computed: hex_encode(computed),
            expected: hex_encode(block_hash),
        });
    }
    Ok(())
}
