//! Append-only Merkle hash tree for transparency logs.
//!
//! A [`Tree`] ingests opaque items through [`ByteCodec`], hashes them with a caller supplied
//! [`Hasher`] and keeps a left-complete binary history tree over them. Appending rehashes only the
//! path of the new leaf. The tree produces audit proofs ([`Tree::get_proof`]) that can be checked
//! without the tree ([`verify_leaf_inclusion`]), and checks that an earlier `(root, size)` pair is a
//! prefix of the current log ([`Tree::verify_tree_consistency`]).
//!
//! ```
//! use merkle_log::{Hasher, Tree, verify_leaf_inclusion};
//!
//! let mut tree = Tree::new(Hasher::blake3());
//! tree.extend(["a", "b", "c"]).unwrap();
//! let old_root = tree.root().unwrap().to_vec();
//!
//! let proof = tree.get_proof("b").unwrap();
//! assert!(verify_leaf_inclusion("b", &proof, tree.hasher(), &old_root).unwrap());
//!
//! tree.append("d").unwrap();
//! assert!(tree.verify_tree_consistency(&old_root, 3));
//! ```

pub mod codec;
pub mod error;
pub mod hasher;
pub mod index;
pub mod node;
pub mod proof;
pub mod tree;

pub use codec::ByteCodec;
pub use error::{Error, Result};
pub use hasher::{HashAlgorithm, HashFn, Hasher, IntoHasher, to_hasher};
pub use index::OrderedIndex;
pub use node::Position;
pub use proof::{AuditProof, AuditProofNode, verify_leaf_inclusion};
pub use tree::Tree;

pub fn splitmix64(x: u64) -> u64 {
  let mut z = x;
  z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
  z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
  z ^ (z >> 31)
}
