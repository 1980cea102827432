use crate::hasher::Hasher;
use crate::proof::AuditProofNode;

/// Stable handle of a node inside an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Where a node hangs below its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
  /// The root, a detached node or a raw hash.
  Undefined,
  Left,
  Right,
}

/// A child slot: either a real node or the sentinel standing for "no sibling yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Child {
  Sentinel,
  Node(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
  Leaf,
  Branch { left: Child, right: Child },
}

/// Node representation in the hash tree
#[derive(Debug, Clone)]
pub struct Node {
  pub hash: Vec<u8>,
  pub parent: Option<NodeId>,
  pub position: Position,
  pub kind: NodeKind,
}

impl Node {
  pub fn is_leaf(&self) -> bool {
    matches!(self.kind, NodeKind::Leaf)
  }
}

/// Anything whose bytes can take part in a children hash.
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
  Sentinel,
  Raw(&'a [u8]),
  Node(&'a Node),
  Proof(&'a AuditProofNode),
}

impl<'a> Operand<'a> {
  pub fn bytes(&self) -> &'a [u8] {
    match *self {
      Operand::Sentinel => &[],
      Operand::Raw(bytes) => bytes,
      Operand::Node(node) => &node.hash,
      Operand::Proof(node) => node.hash(),
    }
  }

  pub fn position(&self) -> Position {
    match *self {
      Operand::Sentinel | Operand::Raw(_) => Position::Undefined,
      Operand::Node(node) => node.position,
      Operand::Proof(node) => node.position(),
    }
  }

  pub fn is_sentinel(&self) -> bool {
    matches!(self, Operand::Sentinel)
  }
}

/// Hashes two operands together in tree order.
///
/// The sentinel never contributes: pairing anything with it yields the other side's hash. Otherwise
/// the operand sitting on the right (or opposite of one sitting on the left) goes second, whatever
/// the argument order.
pub fn concat(hasher: &Hasher, a: Operand<'_>, b: Operand<'_>) -> Vec<u8> {
  debug_assert!(!(a.is_sentinel() && b.is_sentinel()));
  if b.is_sentinel() {
    a.bytes().to_vec()
  } else if a.is_sentinel() {
    b.bytes().to_vec()
  } else if a.position() == Position::Right || b.position() == Position::Left {
    hasher.hash_children(b.bytes(), a.bytes())
  } else {
    hasher.hash_children(a.bytes(), b.bytes())
  }
}

/// Owner of every node of a tree; parents and children refer to each other by [`NodeId`].
#[derive(Debug, Default, Clone)]
pub struct Arena {
  nodes: Vec<Node>,
}

impl Arena {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  pub fn clear(&mut self) {
    self.nodes.clear();
  }

  pub fn get(&self, id: NodeId) -> &Node {
    &self.nodes[id.0]
  }

  pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
    &mut self.nodes[id.0]
  }

  pub fn leaf(&mut self, hash: Vec<u8>) -> NodeId {
    self.push(Node { hash, parent: None, position: Position::Undefined, kind: NodeKind::Leaf })
  }

  fn push(&mut self, node: Node) -> NodeId {
    let id = NodeId(self.nodes.len());
    self.nodes.push(node);
    id
  }

  pub fn operand(&self, child: Child) -> Operand<'_> {
    match child {
      Child::Sentinel => Operand::Sentinel,
      Child::Node(id) => Operand::Node(self.get(id)),
    }
  }

  /// The other child of this node's parent, or `None` for the root.
  pub fn sibling(&self, id: NodeId) -> Option<Child> {
    let parent = self.get(id).parent?;
    match self.get(parent).kind {
      NodeKind::Branch { left, right } => Some(if left == Child::Node(id) { right } else { left }),
      NodeKind::Leaf => None,
    }
  }

  /// Ancestor `level` steps above `id`; `None` when the walk runs past the root.
  pub fn ancestor(&self, id: NodeId, level: u32) -> Option<NodeId> {
    let mut node = id;
    for _ in 0..level {
      node = self.get(node).parent?;
    }
    Some(node)
  }

  /// Creates a parent for `left` and `right` and hashes it.
  pub fn merge(&mut self, hasher: &Hasher, left: NodeId, right: Child) -> NodeId {
    let parent = self.push(Node {
      hash: Vec::new(),
      parent: None,
      position: Position::Undefined,
      kind: NodeKind::Branch { left: Child::Node(left), right },
    });
    self.attach(parent, left, Position::Left);
    if let Child::Node(right) = right {
      self.attach(parent, right, Position::Right);
    }
    let hash = concat(hasher, Operand::Node(self.get(left)), self.operand(right));
    self.get_mut(parent).hash = hash;
    parent
  }

  /// Puts `child` into the right slot of `parent`, which must hold the sentinel. Hashes above are
  /// left stale.
  pub fn graft(&mut self, parent: NodeId, child: NodeId) {
    match &mut self.get_mut(parent).kind {
      NodeKind::Branch { right, .. } => {
        debug_assert_eq!(*right, Child::Sentinel);
        *right = Child::Node(child);
      }
      NodeKind::Leaf => debug_assert!(false, "cannot graft below a leaf"),
    }
    self.attach(parent, child, Position::Right);
  }

  fn attach(&mut self, parent: NodeId, child: NodeId, position: Position) {
    let node = self.get_mut(child);
    node.parent = Some(parent);
    node.position = position;
  }
}
