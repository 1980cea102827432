use std::fmt;

use crate::codec::ByteCodec;
use crate::error::{Error, Result};
use crate::hasher::{Hasher, IntoHasher};
use crate::node::{Operand, Position, concat};

/// A sibling hash met while walking from a leaf to the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuditProofNode {
  hash: Vec<u8>,
  position: Position,
}

impl AuditProofNode {
  /// `position` is the side the sibling sits on, either `Left` or `Right`.
  pub fn new(hash: Vec<u8>, position: Position) -> Self {
    debug_assert_ne!(position, Position::Undefined, "proof nodes sit on a side");
    AuditProofNode { hash, position }
  }

  pub fn hash(&self) -> &[u8] {
    &self.hash
  }

  pub fn position(&self) -> Position {
    self.position
  }
}

/// Sibling path from a leaf up to, but excluding, the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AuditProof {
  nodes: Vec<AuditProofNode>,
}

impl AuditProof {
  pub fn new(nodes: Vec<AuditProofNode>) -> Self {
    AuditProof { nodes }
  }

  pub fn nodes(&self) -> &[AuditProofNode] {
    &self.nodes
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Checks that `item` folds through this proof to `root`.
  ///
  /// The item's own bytes are tried first, which covers callers holding a leaf hash; failing that,
  /// the item is hashed as a leaf and folded again.
  pub fn verify<T: ByteCodec + ?Sized>(&self, item: &T, hasher: &Hasher, root: &[u8]) -> Result<bool> {
    if self.nodes.is_empty() {
      return Err(Error::InvalidAuditProof);
    }
    let bytes = item.encode();
    if self.fold(hasher, &bytes) == root {
      return Ok(true);
    }
    Ok(self.fold(hasher, &hasher.hash_leaf(&bytes)) == root)
  }

  fn fold(&self, hasher: &Hasher, start: &[u8]) -> Vec<u8> {
    self.nodes.iter().fold(start.to_vec(), |acc, node| concat(hasher, Operand::Raw(&acc), Operand::Proof(node)))
  }
}

impl From<Vec<AuditProofNode>> for AuditProof {
  fn from(nodes: Vec<AuditProofNode>) -> Self {
    AuditProof::new(nodes)
  }
}

impl<'a> IntoIterator for &'a AuditProof {
  type Item = &'a AuditProofNode;
  type IntoIter = std::slice::Iter<'a, AuditProofNode>;

  fn into_iter(self) -> Self::IntoIter {
    self.nodes.iter()
  }
}

impl fmt::Display for AuditProof {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, node) in self.nodes.iter().enumerate() {
      if i > 0 {
        f.write_str(" ")?;
      }
      let side = match node.position {
        Position::Left => "L",
        Position::Right => "R",
        Position::Undefined => "?",
      };
      write!(f, "{side}:{}", hex::encode(&node.hash))?;
    }
    Ok(())
  }
}

/// Freestanding inclusion check. `hasher` may be a [`Hasher`] or a raw hash function; type-erased
/// callers coerce theirs with [`crate::to_hasher`] first.
pub fn verify_leaf_inclusion<T: ByteCodec + ?Sized, H: IntoHasher>(
  item: &T,
  proof: &AuditProof,
  hasher: H,
  root: &[u8],
) -> Result<bool> {
  proof.verify(item, &hasher.into_hasher(), root)
}
