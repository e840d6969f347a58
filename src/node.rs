//! For classifying a node in a Merkle PATRICIA Trie proof.
use rlp::Rlp;
use thiserror::Error;

use crate::path::{PathError, PrefixEncoding};

#[derive(Debug, Error, Eq, PartialEq)]
pub enum NodeError {
    #[error("RLP decode error {0}")]
    DecodeError(#[from] rlp::DecoderError),
    #[error("Merkle Patricia Trie node expected to have 2 or 17 items, got {0}")]
    InvalidItemCount(usize),
    #[error("Trie path error {0}")]
    PathError(#[from] PathError),
}

/// Description of a node in a merkle proof.
///
/// Discrimination is by RLP list arity, and for 2-item nodes by the
/// hex-prefix flag of the first item.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NodeKind {
    Branch,
    Extension,
    Leaf,
}

impl NodeKind {
    pub fn deduce(node: &Rlp) -> Result<NodeKind, NodeError> {
        match node.item_count()? {
            17 => Ok(NodeKind::Branch),
            2 => {
                // Leaf or extension
                let partial_path = node.at(0)?.data()?;
                Ok(match PrefixEncoding::try_from(partial_path)? {
                    PrefixEncoding::ExtensionEven | PrefixEncoding::ExtensionOdd(_) => {
                        NodeKind::Extension
                    }
                    PrefixEncoding::LeafEven | PrefixEncoding::LeafOdd(_) => NodeKind::Leaf,
                })
            }
            count => Err(NodeError::InvalidItemCount(count)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::utils::hex_decode;

    // A 17-item merkle patricia trie node, mainnet block 17190873.
    const BRANCH_NODE: &str = "0xf891a097d37274c14dc79a9874f3387ef34e7dbfbbed0fb3caf668d57323f7fb152f79808080808080a0e05bb037e849d9733f2b57d5132f96c57eb2eca763a5ebbb53f52f88c4cd7abb8080808080a0f9dd0c1cfce2ce11694839a45f4beb3d5ac9af39ddd9949075c6be1223373a0ca0c7219989da6535f0fbaf34d9633adde100c81c6f3efd0b9a423fa4886245fa8c8080";

    // A 2-item extension node, mainnet block 17190873.
    const EXTENSION_NODE: &str =
        "0xe210a0c01ed7b75d88d88add6ef9744c598fff626eac250bc209e6b4d11069e93aefb8";

    // A 2-item storage leaf node, mainnet block 17190873.
    const LEAF_NODE: &str = "0xf8429f3652a03292400cdc9040b230c7c8b9584f9903c1f4e2809fca09daa8670c8fa1a004996c0f7e6d68f87940591181285a446222c413f8800d35d36f298b64544dd7";

    #[test]
    fn test_deduce_branch() {
        let bytes = hex_decode(BRANCH_NODE).unwrap();
        let node = Rlp::new(&bytes);
        assert_eq!(NodeKind::deduce(&node).unwrap(), NodeKind::Branch);
    }

    #[test]
    fn test_deduce_extension() {
        let bytes = hex_decode(EXTENSION_NODE).unwrap();
        let node = Rlp::new(&bytes);
        assert_eq!(NodeKind::deduce(&node).unwrap(), NodeKind::Extension);
    }

    #[test]
    fn test_deduce_leaf() {
        let bytes = hex_decode(LEAF_NODE).unwrap();
        let node = Rlp::new(&bytes);
        assert_eq!(NodeKind::deduce(&node).unwrap(), NodeKind::Leaf);
    }

    #[test]
    fn test_deduce_rejects_other_arity() {
        let mut stream = rlp::RlpStream::new_list(3);
        stream.append_empty_data();
        stream.append_empty_data();
        stream.append_empty_data();
        let bytes = stream.out().to_vec();
        let node = Rlp::new(&bytes);
        assert_eq!(
            NodeKind::deduce(&node),
            Err(NodeError::InvalidItemCount(3))
        );
    }

    #[test]
    fn test_deduce_rejects_non_list() {
        let bytes = hex_decode("0x820102").unwrap();
        let node = Rlp::new(&bytes);
        assert!(matches!(
            NodeKind::deduce(&node),
            Err(NodeError::DecodeError(_))
        ));
    }
}
