use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::node::Position;
use crate::splitmix64;

/// Deterministic, injective stand-in for a digest: the input prefixed with its length.
fn length_prefixed(data: &[u8]) -> Vec<u8> {
  let mut out = (data.len() as u32).to_le_bytes().to_vec();
  out.extend_from_slice(data);
  out
}

fn test_tree() -> Tree {
  Tree::new(Hasher::new(length_prefixed))
}

fn items(n: u64) -> Vec<[u8; 8]> {
  (1..=n).map(|i| splitmix64(i).to_le_bytes()).collect()
}

/// Root computed straight from leaf hashes: the left subtree takes the largest power of two
/// strictly smaller than the leaf count.
fn reference_root(hasher: &Hasher, leaves: &[Vec<u8>]) -> Option<Vec<u8>> {
  match leaves.len() {
    0 => None,
    1 => Some(leaves[0].clone()),
    n => {
      let k = 1usize << (usize::BITS - 1 - (n - 1).leading_zeros());
      let left = reference_root(hasher, &leaves[..k])?;
      let right = reference_root(hasher, &leaves[k..])?;
      Some(hasher.hash_children(&left, &right))
    }
  }
}

fn leaves_of(tree: &Tree) -> Vec<Vec<u8>> {
  tree.leaves().map(<[u8]>::to_vec).collect()
}

#[test]
fn verify_height() {
  for (size, expected) in [(0, 0), (1, 0), (2, 1), (3, 2), (4, 2), (5, 3), (8, 3), (9, 4), (1 << 20, 20)] {
    assert_eq!(height(size), expected, "height({size})");
  }
}

#[test]
fn example_scenario() {
  let mut tree = test_tree();
  tree.extend(["a", "b", "c"]).unwrap();
  assert_eq!(tree.size(), 3);

  let proof = tree.get_proof("b").unwrap();
  assert_eq!(proof.len(), 2);
  assert_eq!(proof.nodes()[0].position(), Position::Left);
  assert_eq!(proof.nodes()[1].position(), Position::Right);
  let old_root = tree.root().unwrap().to_vec();
  assert!(proof.verify("b", tree.hasher(), &old_root).unwrap());

  tree.append("d").unwrap();
  let new_root = tree.root().unwrap().to_vec();
  assert_ne!(old_root, new_root);
  assert!(!proof.verify("b", tree.hasher(), &new_root).unwrap());
  assert!(tree.verify_tree_consistency(&old_root, 3));
}

#[test]
fn empty_and_single_leaf() {
  let mut tree = test_tree();
  assert!(tree.is_empty());
  assert_eq!(tree.root(), None);
  assert_eq!(tree.leaves().count(), 0);
  assert_eq!(tree.get_proof("a"), Err(Error::NotFound));

  tree.append("a").unwrap();
  let leaf = tree.hasher().hash_leaf(b"a");
  assert_eq!(tree.root(), Some(leaf.as_slice()));
  let proof = tree.get_proof("a").unwrap();
  assert!(proof.is_empty());
  assert_eq!(proof.verify("a", tree.hasher(), &leaf), Err(Error::InvalidAuditProof));
}

#[test]
fn append_matches_batch_build() {
  let hasher = Hasher::blake3();
  for n in 0..=70 {
    let items = items(n);
    let mut batch = Tree::new(hasher.clone());
    batch.extend(&items).unwrap();
    let mut incremental = Tree::new(hasher.clone());
    for item in items.iter() {
      incremental.append(item).unwrap();
    }
    assert_eq!(batch.root(), incremental.root(), "n={n}");
    assert_eq!(batch.size(), n as usize);
    assert_eq!(leaves_of(&batch), leaves_of(&incremental));
    assert_eq!(reference_root(&hasher, &leaves_of(&batch)).as_deref(), batch.root(), "n={n}");
  }
}

#[test]
fn extend_on_a_non_empty_tree_appends() {
  let items = items(13);
  let mut whole = test_tree();
  whole.extend(&items).unwrap();

  let mut split = test_tree();
  split.extend(&items[..5]).unwrap();
  split.extend(&items[5..]).unwrap();
  assert_eq!(whole.root(), split.root());
  assert_eq!(leaves_of(&whole), leaves_of(&split));
}

#[test]
fn every_leaf_sits_at_the_same_depth() {
  let mut tree = test_tree();
  for (i, item) in items(33).iter().enumerate() {
    tree.append(item).unwrap();
    let size = i as u64 + 1;
    let root = tree.root.unwrap();
    for index in 0..size {
      let leaf = tree.leaf_at(index).unwrap();
      assert_eq!(tree.arena.ancestor(leaf, height(size)), Some(root), "size={size}, index={index}");
      assert_eq!(tree.leaf_hash(index), tree.leaves().nth(index as usize));
    }
    assert_eq!(tree.leaf_at(size), None);
  }
}

#[test]
fn order_matters() {
  let mut forward = test_tree();
  forward.extend(["a", "b", "c", "d"]).unwrap();
  let mut again = test_tree();
  again.extend(["a", "b", "c", "d"]).unwrap();
  let mut swapped = test_tree();
  swapped.extend(["b", "a", "c", "d"]).unwrap();
  assert_eq!(forward.root(), again.root());
  assert_ne!(forward.root(), swapped.root());
}

#[test]
fn odd_leaf_passes_through_its_sentinel_parent() {
  let mut tree = test_tree();
  tree.extend(["a", "b", "c"]).unwrap();
  let hasher = tree.hasher().clone();
  let ab = hasher.hash_children(&hasher.hash_leaf(b"a"), &hasher.hash_leaf(b"b"));
  let c = hasher.hash_leaf(b"c");

  let leaf = tree.leaf_at(2).unwrap();
  let parent = tree.arena.get(leaf).parent.unwrap();
  assert_eq!(tree.arena.sibling(leaf), Some(Child::Sentinel));
  assert_eq!(tree.arena.get(parent).hash, c);
  assert_eq!(tree.root(), Some(hasher.hash_children(&ab, &c).as_slice()));

  let mut even = test_tree();
  even.extend(["a", "b"]).unwrap();
  assert_eq!(even.root(), Some(ab.as_slice()));
}

#[test]
fn inclusion_round_trip() {
  let mut tree = test_tree();
  let items = items(21);
  for item in items.iter() {
    tree.append(item).unwrap();
    let root = tree.root().unwrap().to_vec();
    for (i, present) in items.iter().enumerate().take(tree.size()) {
      if tree.size() == 1 {
        break;
      }
      let proof = tree.get_proof(present).unwrap();
      assert!(proof.verify(present, tree.hasher(), &root).unwrap(), "size={}, i={i}", tree.size());
    }
  }
}

#[test]
fn tampering_breaks_inclusion() {
  let mut tree = Tree::new(Hasher::sha256());
  let items = items(11);
  tree.extend(&items).unwrap();
  let root = tree.root().unwrap().to_vec();

  for item in items.iter() {
    let proof = tree.get_proof(item).unwrap();
    for (n, node) in proof.nodes().iter().enumerate() {
      let forge = |replacement: AuditProofNode| {
        let mut nodes = proof.nodes().to_vec();
        nodes[n] = replacement;
        AuditProof::new(nodes)
      };
      for j in [0, node.hash().len() - 1] {
        let mut hash = node.hash().to_vec();
        hash[j] ^= 0x01;
        let forged = forge(AuditProofNode::new(hash, node.position()));
        assert!(!forged.verify(item, tree.hasher(), &root).unwrap());
      }
      let flipped = if node.position() == Position::Left { Position::Right } else { Position::Left };
      let forged = forge(AuditProofNode::new(node.hash().to_vec(), flipped));
      assert!(!forged.verify(item, tree.hasher(), &root).unwrap(), "side of node {n} flipped");
    }
    for j in 0..item.len() {
      let mut forged = *item;
      forged[j] ^= 0x80;
      assert!(!proof.verify(&forged, tree.hasher(), &root).unwrap());
    }
  }
}

#[test]
fn proof_by_leaf_hash() {
  let mut tree = test_tree();
  tree.extend(["a", "b", "c", "d", "e"]).unwrap();
  let leaf = tree.hasher().hash_leaf(b"d");
  assert!(tree.contains(&leaf));
  assert!(tree.contains("d"));
  assert!(!tree.contains("z"));
  let proof = tree.get_proof(&leaf).unwrap();
  assert_eq!(proof, tree.get_proof("d").unwrap());
  let root = tree.root().unwrap();
  assert!(proof.verify(&leaf, tree.hasher(), root).unwrap());
  assert!(proof.verify("d", tree.hasher(), root).unwrap());
}

#[test]
fn update_replaces_leaf_in_place() {
  let mut tree = test_tree();
  tree.extend(["a", "b", "c", "d", "e"]).unwrap();
  let before = tree.root().unwrap().to_vec();

  tree.update("c", "x").unwrap();
  assert_eq!(tree.size(), 5);
  assert_ne!(tree.root().unwrap(), before.as_slice());
  assert_eq!(tree.get_proof("c"), Err(Error::NotFound));
  let proof = tree.get_proof("x").unwrap();
  assert!(proof.verify("x", tree.hasher(), tree.root().unwrap()).unwrap());

  let mut rebuilt = test_tree();
  rebuilt.extend(["a", "b", "x", "d", "e"]).unwrap();
  assert_eq!(tree.root(), rebuilt.root());
  assert_eq!(leaves_of(&tree), leaves_of(&rebuilt));

  // later appends still extend the original tail
  tree.append("f").unwrap();
  rebuilt.append("f").unwrap();
  assert_eq!(tree.root(), rebuilt.root());
}

#[test]
fn update_by_leaf_hash_and_to_same_value() {
  let mut tree = test_tree();
  tree.extend(["a", "b", "c"]).unwrap();
  let root = tree.root().unwrap().to_vec();
  tree.update("b", "b").unwrap();
  assert_eq!(tree.root(), Some(root.as_slice()));

  let leaf = tree.hasher().hash_leaf(b"b");
  tree.update(&leaf, "y").unwrap();
  assert!(tree.contains("y"));
  assert!(!tree.contains("b"));
}

#[test]
fn update_missing_item_leaves_tree_untouched() {
  let mut tree = test_tree();
  tree.extend(["a", "b", "c"]).unwrap();
  let root = tree.root().unwrap().to_vec();
  assert_eq!(tree.update("z", "y"), Err(Error::NotFound));
  assert_eq!(tree.root(), Some(root.as_slice()));
  assert_eq!(tree.size(), 3);
}

#[test]
fn duplicates_are_rejected() {
  let mut tree = test_tree();
  tree.extend(["a", "b"]).unwrap();
  let root = tree.root().unwrap().to_vec();

  assert!(matches!(tree.append("a"), Err(Error::DuplicateLeaf(_))));
  assert!(matches!(tree.extend(["c", "b"]), Err(Error::DuplicateLeaf(_))));
  assert!(matches!(tree.update("a", "b"), Err(Error::DuplicateLeaf(_))));
  assert_eq!(tree.size(), 2);
  assert!(!tree.contains("c"));
  assert_eq!(tree.root(), Some(root.as_slice()));

  let mut empty = test_tree();
  assert!(matches!(empty.extend(["q", "r", "q"]), Err(Error::DuplicateLeaf(_))));
  assert!(empty.is_empty());
  assert_eq!(empty.root(), None);
}

#[test]
fn consistency_with_recorded_roots() {
  let mut tree = test_tree();
  let mut roots = vec![Vec::new()];
  for item in items(40) {
    tree.append(&item).unwrap();
    roots.push(tree.root().unwrap().to_vec());
  }

  for (k, root) in roots.iter().enumerate() {
    let k = k as u64;
    assert!(tree.verify_tree_consistency(root, k), "k={k}");
    assert_eq!(tree.root_at(k).as_ref(), Some(root), "k={k}");
    for (other, wrong) in roots.iter().enumerate() {
      if other as u64 != k {
        assert!(!tree.verify_tree_consistency(wrong, k), "k={k}, other={other}");
      }
    }
  }
  assert!(!tree.verify_tree_consistency(tree.root().unwrap(), 41));
  assert_eq!(tree.root_at(41), None);
}

#[test]
fn consistency_survives_updates_of_newer_leaves() {
  let mut tree = test_tree();
  tree.extend(["a", "b", "c", "d", "e"]).unwrap();
  let root = tree.root_at(3).unwrap();
  tree.update("e", "E").unwrap();
  tree.update("d", "D").unwrap();
  assert!(tree.verify_tree_consistency(&root, 3));
  tree.update("b", "B").unwrap();
  assert!(!tree.verify_tree_consistency(&root, 3));
}

#[test]
fn clear_resets_everything() {
  let mut tree = test_tree();
  tree.extend(["a", "b", "c"]).unwrap();
  tree.clear();
  assert!(tree.is_empty());
  assert_eq!(tree.root(), None);
  assert_eq!(tree.arena.len(), 0);
  assert!(tree.verify_tree_consistency(&[], 0));

  tree.append("a").unwrap();
  tree.append("b").unwrap();
  let mut fresh = test_tree();
  fresh.extend(["a", "b"]).unwrap();
  assert_eq!(tree.root(), fresh.root());
}

#[test]
fn random_appends_and_updates_keep_the_root_canonical() {
  let mut rng = StdRng::seed_from_u64(0x5eed);
  let mut tree = Tree::new(Hasher::blake3());
  let mut next = 0u64;
  for _ in 0..400 {
    if tree.is_empty() || rng.random_range(0..4) > 0 {
      next += 1;
      tree.append(&splitmix64(next)).unwrap();
    } else {
      let index = rng.random_range(0..tree.size() as u64);
      let old = tree.leaf_hash(index).unwrap().to_vec();
      next += 1;
      tree.update(&old, &splitmix64(next)).unwrap();
    }
    let leaves = leaves_of(&tree);
    assert_eq!(reference_root(tree.hasher(), &leaves).as_deref(), tree.root());
    assert_eq!(leaves.len(), tree.size());
    if leaves.len() > 1 {
      let root = tree.root().unwrap();
      for leaf in leaves.iter() {
        let proof = tree.get_proof(leaf).unwrap();
        assert!(proof.verify(leaf, tree.hasher(), root).unwrap(), "size={}", tree.size());
      }
    }
  }
}

proptest! {
  #[test]
  fn prop_append_equals_extend(items in prop::collection::hash_set(prop::collection::vec(any::<u8>(), 0..24), 0..48)) {
    let items = items.into_iter().collect::<Vec<_>>();
    let mut batch = Tree::new(Hasher::blake3());
    batch.extend(&items).unwrap();
    let mut incremental = Tree::new(Hasher::blake3());
    for item in items.iter() {
      incremental.append(item).unwrap();
    }
    prop_assert_eq!(batch.root(), incremental.root());
    if items.len() > 1 {
      let root = batch.root().unwrap();
      for item in items.iter() {
        let proof = batch.get_proof(item).unwrap();
        prop_assert!(proof.verify(item, batch.hasher(), root).unwrap());
      }
    }
  }

  #[test]
  fn prop_historical_roots(n in 1u64..96, k in 0u64..96) {
    let k = k.min(n);
    let items = items(n);
    let mut prefix = test_tree();
    prefix.extend(&items[..k as usize]).unwrap();
    let mut full = test_tree();
    full.extend(&items).unwrap();
    let expected = prefix.root().unwrap_or_default();
    prop_assert!(full.verify_tree_consistency(expected, k));
  }
}
