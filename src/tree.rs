use std::collections::HashSet;

use tracing::{debug, trace};

use crate::codec::ByteCodec;
use crate::error::{Error, Result};
use crate::hasher::Hasher;
use crate::index::OrderedIndex;
use crate::node::{Arena, Child, NodeId, NodeKind, Operand, concat};
use crate::proof::{AuditProof, AuditProofNode};

/// Number of levels between the root and every leaf of a tree holding `size` leaves.
pub fn height(size: u64) -> u32 {
  if size <= 1 { 0 } else { u64::BITS - (size - 1).leading_zeros() }
}

/// Append-only Merkle hash tree.
///
/// Leaves are kept in insertion order. All leaves sit at the same depth; a level with an odd number
/// of nodes pads its last node with the sentinel, whose hash contribution is nothing, so the root
/// equals the one of a left-complete history tree over the same leaves.
pub struct Tree {
  hasher: Hasher,
  arena: Arena,
  root: Option<NodeId>,
  leaves: OrderedIndex<NodeId>,
}

impl Tree {
  pub fn new(hasher: Hasher) -> Self {
    Tree { hasher, arena: Arena::new(), root: None, leaves: OrderedIndex::new() }
  }

  pub fn hasher(&self) -> &Hasher {
    &self.hasher
  }

  /// Current root hash, `None` while the tree is empty.
  pub fn root(&self) -> Option<&[u8]> {
    self.root.map(|id| self.arena.get(id).hash.as_slice())
  }

  pub fn size(&self) -> usize {
    self.leaves.len()
  }

  pub fn is_empty(&self) -> bool {
    self.leaves.is_empty()
  }

  /// Leaf hashes in insertion order.
  pub fn leaves(&self) -> impl ExactSizeIterator<Item = &[u8]> + '_ {
    self.leaves.keys()
  }

  pub fn contains<T: ByteCodec + ?Sized>(&self, item: &T) -> bool {
    self.get_leaf(item).is_some()
  }

  /// Hash of the leaf at insertion position `index`.
  pub fn leaf_hash(&self, index: u64) -> Option<&[u8]> {
    self.leaf_at(index).map(|id| self.arena.get(id).hash.as_slice())
  }

  /// Adds every item. An empty tree is built in one pass, otherwise the items are appended one by
  /// one. The batch is rejected as a whole if any resulting leaf would be a duplicate.
  pub fn extend<I>(&mut self, items: I) -> Result<()>
  where
    I: IntoIterator,
    I::Item: ByteCodec,
  {
    let hashes = items.into_iter().map(|item| self.hasher.hash_leaf(&item.encode())).collect::<Vec<_>>();
    let mut seen = HashSet::with_capacity(hashes.len());
    for hash in hashes.iter() {
      if !seen.insert(hash.as_slice()) {
        return Err(self.duplicate(hash));
      }
      self.ensure_absent(hash)?;
    }

    if self.root.is_none() {
      self.build(hashes);
    } else {
      for hash in hashes {
        self.push_leaf(hash);
      }
    }
    Ok(())
  }

  pub fn append<T: ByteCodec + ?Sized>(&mut self, item: &T) -> Result<()> {
    let hash = self.hasher.hash_leaf(&item.encode());
    self.ensure_absent(&hash)?;
    self.push_leaf(hash);
    Ok(())
  }

  /// Replaces the leaf of `old` with `new`, keeping its place in the tree.
  pub fn update<O, N>(&mut self, old: &O, new: &N) -> Result<()>
  where
    O: ByteCodec + ?Sized,
    N: ByteCodec + ?Sized,
  {
    let leaf = self.get_leaf(old).ok_or(Error::NotFound)?;
    let hash = self.hasher.hash_leaf(&new.encode());
    let current = self.arena.get(leaf).hash.clone();
    if hash == current {
      return Ok(());
    }
    self.ensure_absent(&hash)?;

    let rekeyed = self.leaves.rekey(&current, hash.clone());
    debug_assert!(rekeyed);
    debug!(old = %hex::encode(&current), new = %hex::encode(&hash), "update leaf");
    self.arena.get_mut(leaf).hash = hash;
    self.rehash(leaf);
    Ok(())
  }

  /// Discards every node and leaf.
  pub fn clear(&mut self) {
    debug!(size = self.size(), "clear tree");
    self.root = None;
    self.arena.clear();
    self.leaves.clear();
  }

  pub fn get_proof<T: ByteCodec + ?Sized>(&self, item: &T) -> Result<AuditProof> {
    let mut node = self.get_leaf(item).ok_or(Error::NotFound)?;
    let mut path = Vec::with_capacity(height(self.size() as u64) as usize);
    while let Some(parent) = self.arena.get(node).parent {
      if let Some(Child::Node(sibling)) = self.arena.sibling(node) {
        let sibling = self.arena.get(sibling);
        path.push(AuditProofNode::new(sibling.hash.clone(), sibling.position));
      }
      node = parent;
    }
    Ok(AuditProof::new(path))
  }

  /// Root the tree had when it held its first `size` leaves. The empty tree's root is the empty
  /// byte string.
  pub fn root_at(&self, size: u64) -> Option<Vec<u8>> {
    if size > self.size() as u64 {
      return None;
    }
    if size == 0 {
      return Some(Vec::new());
    }

    // one perfect subtree per set bit, largest first
    let mut subtrees = Vec::with_capacity(size.count_ones() as usize);
    let mut start = 0u64;
    for level in (0..u64::BITS).rev() {
      if size & (1 << level) == 0 {
        continue;
      }
      let Some(subtree) = self.leaf_at(start).and_then(|leaf| self.arena.ancestor(leaf, level)) else {
        debug!(size, start, level, "no subtree root below the current tree");
        return None;
      };
      subtrees.push(self.arena.get(subtree).hash.as_slice());
      start += 1 << level;
    }

    let mut subtrees = subtrees.into_iter().rev();
    let last = subtrees.next()?.to_vec();
    Some(subtrees.fold(last, |acc, left| self.hasher.hash_children(left, &acc)))
  }

  /// Whether `old_root` is the root this tree had at `old_size` leaves.
  pub fn verify_tree_consistency(&self, old_root: &[u8], old_size: u64) -> bool {
    let size = self.size() as u64;
    if size < old_size {
      false
    } else if size == old_size {
      self.root().unwrap_or_default() == old_root
    } else {
      self.root_at(old_size).is_some_and(|root| root == old_root)
    }
  }

  fn build(&mut self, hashes: Vec<Vec<u8>>) {
    debug!(size = hashes.len(), "batch build");
    let mut level = Vec::with_capacity(hashes.len());
    for hash in hashes {
      let leaf = self.arena.leaf(hash.clone());
      self.leaves.insert(hash, leaf);
      level.push(leaf);
    }
    while level.len() > 1 {
      let mut next = Vec::with_capacity(level.len().div_ceil(2));
      for pair in level.chunks(2) {
        let right = pair.get(1).map_or(Child::Sentinel, |id| Child::Node(*id));
        next.push(self.arena.merge(&self.hasher, pair[0], right));
      }
      level = next;
    }
    self.root = level.first().copied();
  }

  /// Grafts one leaf. Mirrors a binary counter increment: every full level on the right spine is a
  /// carry that wraps the new leaf with one more sentinel-padded parent.
  fn push_leaf(&mut self, hash: Vec<u8>) {
    let leaf = self.arena.leaf(hash.clone());
    let last = self.leaves.last().map(|(_, id)| *id);
    self.leaves.insert(hash, leaf);

    let Some(last) = last else {
      self.root = Some(leaf);
      return;
    };

    let mut carry = leaf;
    let mut connector = last;
    while let Some(parent) = self.arena.get(connector).parent {
      if self.arena.sibling(connector) == Some(Child::Sentinel) {
        trace!(size = self.size(), "graft into vacant slot");
        self.arena.graft(parent, carry);
        self.rehash(carry);
        return;
      }
      carry = self.arena.merge(&self.hasher, carry, Child::Sentinel);
      connector = parent;
    }

    // every level was full: the old root becomes the left half of a taller tree
    trace!(size = self.size(), height = height(self.size() as u64), "grow root");
    self.root = Some(self.arena.merge(&self.hasher, connector, Child::Node(carry)));
  }

  /// Recomputes the hashes on the path from `node` to the root.
  fn rehash(&mut self, node: NodeId) {
    let mut node = node;
    while let Some(parent) = self.arena.get(node).parent {
      let sibling = self.arena.sibling(node).unwrap_or(Child::Sentinel);
      let hash = concat(&self.hasher, Operand::Node(self.arena.get(node)), self.arena.operand(sibling));
      self.arena.get_mut(parent).hash = hash;
      node = parent;
    }
  }

  /// Resolves an item to its leaf, either by its raw bytes (a leaf hash) or by its leaf hash.
  fn get_leaf<T: ByteCodec + ?Sized>(&self, item: &T) -> Option<NodeId> {
    let bytes = item.encode();
    self.leaves.get(&bytes).or_else(|| self.leaves.get(&self.hasher.hash_leaf(&bytes))).copied()
  }

  /// Walks down from the root following the bits of `index`.
  fn leaf_at(&self, index: u64) -> Option<NodeId> {
    let size = self.size() as u64;
    if index >= size {
      return None;
    }
    let mut node = self.root?;
    for level in (0..height(size)).rev() {
      let NodeKind::Branch { left, right } = self.arena.get(node).kind else {
        return None;
      };
      let child = if (index >> level) & 1 == 0 { left } else { right };
      node = match child {
        Child::Node(id) => id,
        Child::Sentinel => return None,
      };
    }
    debug_assert!(self.arena.get(node).is_leaf());
    Some(node)
  }

  fn ensure_absent(&self, hash: &[u8]) -> Result<()> {
    if self.leaves.contains_key(hash) { Err(self.duplicate(hash)) } else { Ok(()) }
  }

  fn duplicate(&self, hash: &[u8]) -> Error {
    let hash = hex::encode(hash);
    debug!(%hash, "reject duplicate leaf");
    Error::DuplicateLeaf(hash)
  }
}

#[cfg(test)]
mod test;
