use std::any::Any;
use std::fmt;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Domain-separation suffix appended to leaf payloads.
pub const LEAF_TAG: u8 = 0x00;

/// Domain-separation suffix appended to concatenated child hashes.
pub const CHILDREN_TAG: u8 = 0x01;

/// A caller supplied digest, shared between trees and verifiers.
pub type HashFn = Arc<dyn Fn(&[u8]) -> Vec<u8> + Send + Sync>;

/// Built-in digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
  Blake3,
  Sha256,
}

impl fmt::Display for HashAlgorithm {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      HashAlgorithm::Blake3 => f.write_str("blake3"),
      HashAlgorithm::Sha256 => f.write_str("sha256"),
    }
  }
}

/// Wraps a hash function with the leaf/children domain separation of the tree.
#[derive(Clone)]
pub struct Hasher {
  hash_fn: HashFn,
}

impl Hasher {
  pub fn new<F>(hash_fn: F) -> Self
  where
    F: Fn(&[u8]) -> Vec<u8> + Send + Sync + 'static,
  {
    Hasher { hash_fn: Arc::new(hash_fn) }
  }

  pub fn blake3() -> Self {
    Self::new(|data| blake3::hash(data).as_bytes().to_vec())
  }

  pub fn sha256() -> Self {
    Self::new(|data| Sha256::digest(data).to_vec())
  }

  pub fn from_algorithm(algorithm: HashAlgorithm) -> Self {
    match algorithm {
      HashAlgorithm::Blake3 => Self::blake3(),
      HashAlgorithm::Sha256 => Self::sha256(),
    }
  }

  /// Raw digest without any domain separation.
  pub fn digest(&self, data: &[u8]) -> Vec<u8> {
    (self.hash_fn)(data)
  }

  /// `H(data || 0x00)`
  pub fn hash_leaf(&self, data: &[u8]) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(data.len() + 1);
    buffer.extend_from_slice(data);
    buffer.push(LEAF_TAG);
    self.digest(&buffer)
  }

  /// `H(left || right || 0x01)`
  pub fn hash_children(&self, left: &[u8], right: &[u8]) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(left.len() + right.len() + 1);
    buffer.extend_from_slice(left);
    buffer.extend_from_slice(right);
    buffer.push(CHILDREN_TAG);
    self.digest(&buffer)
  }
}

impl fmt::Debug for Hasher {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Hasher").finish_non_exhaustive()
  }
}

impl From<HashFn> for Hasher {
  fn from(hash_fn: HashFn) -> Self {
    Hasher { hash_fn }
  }
}

impl From<fn(&[u8]) -> Vec<u8>> for Hasher {
  fn from(hash_fn: fn(&[u8]) -> Vec<u8>) -> Self {
    Hasher::new(hash_fn)
  }
}

impl From<HashAlgorithm> for Hasher {
  fn from(algorithm: HashAlgorithm) -> Self {
    Hasher::from_algorithm(algorithm)
  }
}

/// Anything a verifier can hash with: a [`Hasher`] (owned or borrowed) or a hash function given as
/// a fn item, a fn pointer or a closure.
///
/// A shared [`HashFn`] goes through `Hasher::from` or [`to_hasher`].
pub trait IntoHasher {
  fn into_hasher(self) -> Hasher;
}

impl IntoHasher for Hasher {
  fn into_hasher(self) -> Hasher {
    self
  }
}

impl IntoHasher for &Hasher {
  fn into_hasher(self) -> Hasher {
    self.clone()
  }
}

impl<F> IntoHasher for F
where
  F: Fn(&[u8]) -> Vec<u8> + Send + Sync + 'static,
{
  fn into_hasher(self) -> Hasher {
    Hasher::new(self)
  }
}

/// Runtime coercion for type-erased callers: accepts a `Hasher`, a shared `HashFn` or a plain
/// `fn(&[u8]) -> Vec<u8>`.
pub fn to_hasher(value: &dyn Any) -> Result<Hasher> {
  if let Some(hasher) = value.downcast_ref::<Hasher>() {
    Ok(hasher.clone())
  } else if let Some(hash_fn) = value.downcast_ref::<HashFn>() {
    Ok(Hasher::from(hash_fn.clone()))
  } else if let Some(hash_fn) = value.downcast_ref::<fn(&[u8]) -> Vec<u8>>() {
    Ok(Hasher::from(*hash_fn))
  } else {
    Err(Error::InvalidHasherType)
  }
}
