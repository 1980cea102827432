use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  /// The item (or its leaf hash) is not a leaf of the tree.
  #[error("item is not a leaf of this tree")]
  NotFound,

  /// An audit proof must contain at least one sibling hash.
  #[error("audit proof contains no nodes")]
  InvalidAuditProof,

  /// The verifier was handed something that is neither a `Hasher` nor a hash function.
  #[error("expected a Hasher or a hash function")]
  InvalidHasherType,

  /// A leaf with the same hash is already tracked by the tree.
  #[error("leaf {0} is already present in the tree")]
  DuplicateLeaf(String),
}
