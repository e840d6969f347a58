//! For verifying that a contract's storage held a particular value at the
//! moment a block was produced.
//!
//! The caller supplies the block hash as a trusted assertion. The header is
//! bound to it by keccak, the account proof to the header's state root, the
//! storage proof to the account's storage root, and the value falls out of
//! the final walk. Verification is pure computation: no I/O, no shared
//! state, nothing retained between calls.
use ethers::{
    types::{Address, H256, U256},
    utils::keccak256,
};
use thiserror::Error;

use crate::{
    eip1186::{decode_account, decode_storage_value, Account, RecordError},
    header::{self, HeaderError},
    path::NibblePath,
    proof::{walk, ProofError, Walked},
    utils::hex_encode,
};

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Account not found in state trie for address {address}")]
    AccountNotFound { address: String },
    #[error("Value for account {address} is not an account record, RecordError {source}")]
    AccountRecord {
        source: RecordError,
        address: String,
    },
    #[error("Proof not valid for account {address}, ProofError {source}")]
    AccountProof {
        source: ProofError,
        address: String,
    },
    #[error("HeaderError {0}")]
    HeaderError(#[from] HeaderError),
    #[error("Proof not valid for storage key {storage_key}, ProofError {source}")]
    StorageProof {
        source: ProofError,
        storage_key: String,
    },
    #[error("Value for storage key {storage_key} is not an integer, RecordError {source}")]
    StorageValue {
        source: RecordError,
        storage_key: String,
    },
}

/// A verified slot value together with the storage root it was proven
/// under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedStorage {
    /// Value held by the slot when the block was produced. Zero for slots
    /// that were never written as well as slots written to zero.
    pub value: U256,
    /// Root of the account's storage trie, from the proven account record.
    pub storage_root: H256,
}

/// Verifies the account proof against the header and returns the proven
/// account record.
///
/// The header must hash to `block_hash`; the proof must anchor at the
/// header's state root and walk to the account keyed by
/// `keccak(address)`.
pub fn verify_account(
    header_rlp: &[u8],
    block_hash: H256,
    address: Address,
    account_proof: &[impl AsRef<[u8]>],
) -> Result<Account, VerifyError> {
    let state_root = header::state_root(header_rlp)?;
    header::check_hash(header_rlp, block_hash)?;

    let mut traversal = NibblePath::init(&keccak256(address.as_bytes()));
    let walked = walk(&mut traversal, account_proof, state_root.0).map_err(|source| {
        VerifyError::AccountProof {
            source,
            address: hex_encode(address),
        }
    })?;
    let account_rlp = match walked {
        Walked::Found(value) => value,
        Walked::Absent => {
            return Err(VerifyError::AccountNotFound {
                address: hex_encode(address),
            })
        }
    };
    decode_account(&account_rlp).map_err(|source| VerifyError::AccountRecord {
        source,
        address: hex_encode(address),
    })
}

/// Verifies the account proof against the header and returns the account's
/// storage root, ready to anchor storage-slot proofs.
pub fn verify_storage_root(
    header_rlp: &[u8],
    block_hash: H256,
    address: Address,
    account_proof: &[impl AsRef<[u8]>],
) -> Result<H256, VerifyError> {
    let account = verify_account(header_rlp, block_hash, address, account_proof)?;
    Ok(account.storage_hash)
}

/// Verifies a storage proof against a storage root and returns the slot's
/// value.
///
/// A proof that the slot is absent from the trie is a valid proof of the
/// value zero; unset slots have no trie entry.
pub fn verify_slot(
    storage_root: H256,
    slot: H256,
    storage_proof: &[impl AsRef<[u8]>],
) -> Result<U256, VerifyError> {
    let mut traversal = NibblePath::init(&keccak256(slot.as_bytes()));
    let walked = walk(&mut traversal, storage_proof, storage_root.0).map_err(|source| {
        VerifyError::StorageProof {
            source,
            storage_key: hex_encode(slot),
        }
    })?;
    match walked {
        Walked::Found(value) => {
            decode_storage_value(&value).map_err(|source| VerifyError::StorageValue {
                source,
                storage_key: hex_encode(slot),
            })
        }
        Walked::Absent => Ok(U256::zero()),
    }
}

/// Verifies the full chain from block hash to slot value.
///
/// On success the caller holds a cryptographic assurance that, conditional
/// on `block_hash` being canonical, the account's storage at `slot` held
/// exactly the returned value when that block was produced.
pub fn verify(
    header_rlp: &[u8],
    block_hash: H256,
    address: Address,
    account_proof: &[impl AsRef<[u8]>],
    slot: H256,
    storage_proof: &[impl AsRef<[u8]>],
) -> Result<VerifiedStorage, VerifyError> {
    let storage_root = verify_storage_root(header_rlp, block_hash, address, account_proof)?;
    let value = verify_slot(storage_root, slot, storage_proof)?;
    Ok(VerifiedStorage {
        value,
        storage_root,
    })
}
