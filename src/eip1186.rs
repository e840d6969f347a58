//! For the account and storage records that proofs commit to, and for
//! verifying whole EIP-1186 (`eth_getProof`) responses.
use ethers::types::{BigEndianHash, EIP1186ProofResponse, H256, U256, U64};
use rlp::Rlp;
use rlp_derive::{RlpDecodable, RlpEncodable};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    utils::hex_encode,
    verify::{self, VerifyError},
};

/// The four-field account record committed in the state trie.
///
/// Only the storage hash is consumed when chaining into a storage proof;
/// the remaining fields are carried for callers that cross-check claims.
#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize, RlpEncodable, RlpDecodable)]
pub struct Account {
    pub nonce: U64,
    pub balance: U256,
    pub storage_hash: H256,
    pub code_hash: H256,
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("RLP decode error {0}")]
    DecodeError(#[from] rlp::DecoderError),
    #[error("Account record expected to be a list of 4 items. RLP: {0}")]
    InvalidAccountRecord(String),
}

/// Decodes the value proven under an account key: `[nonce, balance,
/// storageRoot, codeHash]`.
pub fn decode_account(value: &[u8]) -> Result<Account, RecordError> {
    let rlp = Rlp::new(value);
    let field_count = rlp
        .item_count()
        .map_err(|_| RecordError::InvalidAccountRecord(hex_encode(value)))?;
    if field_count != 4 {
        return Err(RecordError::InvalidAccountRecord(hex_encode(value)));
    }
    Ok(rlp::decode(value)?)
}

/// Decodes the value proven under a storage key: a single RLP integer.
///
/// An empty value decodes to zero, matching the trie's treatment of unset
/// slots.
pub fn decode_storage_value(value: &[u8]) -> Result<U256, RecordError> {
    if value.is_empty() {
        return Ok(U256::zero());
    }
    let storage: U256 = rlp::decode(value)?;
    Ok(storage)
}

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("Account record in proof for {address} does not match the claimed account fields")]
    ClaimedAccountMismatch { address: String },
    #[error("Proof for account {address} storage key {storage_key} yields {proven}, response claims {claimed}")]
    ClaimedValueMismatch {
        address: String,
        storage_key: String,
        claimed: String,
        proven: String,
    },
    #[error("VerifyError {0}")]
    VerifyError(#[from] VerifyError),
}

/// Verifies a whole `eth_getProof` response against a block header.
///
/// The account proof and every storage proof in the response are walked,
/// and the proven account fields and slot values are required to equal the
/// values the response claims.
pub fn verify_response(
    header_rlp: &[u8],
    block_hash: H256,
    response: &EIP1186ProofResponse,
) -> Result<(), ResponseError> {
    let account = verify::verify_account(
        header_rlp,
        block_hash,
        response.address,
        &response.account_proof,
    )?;
    let claimed = Account {
        nonce: response.nonce,
        balance: response.balance,
        storage_hash: response.storage_hash,
        code_hash: response.code_hash,
    };
    if account != claimed {
        return Err(ResponseError::ClaimedAccountMismatch {
            address: hex_encode(response.address),
        });
    }
    for storage_proof in &response.storage_proof {
        let storage_key = H256::from_uint(&storage_proof.key);
        let proven = verify::verify_slot(
            account.storage_hash,
            storage_key,
            &storage_proof.proof,
        )?;
        if proven != storage_proof.value {
            return Err(ResponseError::ClaimedValueMismatch {
                address: hex_encode(response.address),
                storage_key: hex_encode(storage_key),
                claimed: format!("{:#x}", storage_proof.value),
                proven: format!("{proven:#x}"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use super::*;
    use crate::utils::hex_decode;

    // Account record from the final node of a mainnet account proof.
    const ACCOUNT_RECORD: &str = "0xf8440180a03836d7e3afb674e5180b7564e096f6f3e30308878a443fe59012ced093544b7fa02cfdfbdd943ec0153ed07b97f03eb765dc11cc79c6f750effcc2d126f93c4b31";

    // Storage leaf from a mainnet storage proof; item 1 holds rlp(value).
    const STORAGE_LEAF: &str =
        "0xe79f3787fa12a823e0f2b7631cc41b3ba8828b3321ca811111fa75cd3aa3bb5ace868512a05f2000";

    #[test]
    fn test_decode_account() {
        let bytes = hex_decode(ACCOUNT_RECORD).unwrap();
        let account = decode_account(&bytes).unwrap();
        assert_eq!(
            account,
            Account {
                nonce: 1.into(),
                balance: 0.into(),
                storage_hash: H256::from_str(
                    "0x3836d7e3afb674e5180b7564e096f6f3e30308878a443fe59012ced093544b7f"
                )
                .unwrap(),
                code_hash: H256::from_str(
                    "0x2cfdfbdd943ec0153ed07b97f03eb765dc11cc79c6f750effcc2d126f93c4b31"
                )
                .unwrap()
            },
        );
    }

    #[test]
    fn test_decode_account_rejects_wrong_arity() {
        // A 2-item list is not an account record.
        let mut stream = rlp::RlpStream::new_list(2);
        stream.append(&1u64);
        stream.append(&2u64);
        let bytes = stream.out().to_vec();
        assert!(matches!(
            decode_account(&bytes),
            Err(RecordError::InvalidAccountRecord(_))
        ));
    }

    #[test]
    fn test_decode_account_rejects_byte_string() {
        let bytes = hex_decode("0x820102").unwrap();
        assert!(matches!(
            decode_account(&bytes),
            Err(RecordError::InvalidAccountRecord(_))
        ));
    }

    #[test]
    fn test_decode_storage_value_nonzero() {
        let leaf = hex_decode(STORAGE_LEAF).unwrap();
        let value_rlp = Rlp::new(&leaf).at(1).unwrap().data().unwrap();
        let value = decode_storage_value(value_rlp).unwrap();
        assert_eq!(value, U256::from_str("0x12a05f2000").unwrap());
    }

    #[test]
    fn test_decode_storage_value_empty_is_zero() {
        assert_eq!(decode_storage_value(&[]).unwrap(), U256::zero());
    }
}
