use std::collections::HashMap;

struct Slot<V> {
  key: Vec<u8>,
  value: V,
  prev: Option<usize>,
  next: Option<usize>,
}

/// An insertion-ordered map from byte keys to values.
///
/// Entries live in a slab and are chained into a doubly linked list, so insert, lookup, removal,
/// rekeying and access to either end are all O(1). Freed slots are recycled.
pub struct OrderedIndex<V> {
  slots: Vec<Option<Slot<V>>>,
  free: Vec<usize>,
  mapping: HashMap<Vec<u8>, usize>,
  head: Option<usize>,
  tail: Option<usize>,
}

impl<V> Default for OrderedIndex<V> {
  fn default() -> Self {
    Self::new()
  }
}

impl<V> OrderedIndex<V> {
  pub fn new() -> Self {
    OrderedIndex { slots: Vec::new(), free: Vec::new(), mapping: HashMap::new(), head: None, tail: None }
  }

  pub fn len(&self) -> usize {
    self.mapping.len()
  }

  pub fn is_empty(&self) -> bool {
    self.mapping.is_empty()
  }

  pub fn contains_key(&self, key: &[u8]) -> bool {
    self.mapping.contains_key(key)
  }

  pub fn get(&self, key: &[u8]) -> Option<&V> {
    self.mapping.get(key).and_then(|i| self.slot(*i)).map(|slot| &slot.value)
  }

  /// Appends `key` at the end of the order. An existing key keeps its place and gets the new value;
  /// the previous value is returned.
  pub fn insert(&mut self, key: Vec<u8>, value: V) -> Option<V> {
    if let Some(i) = self.mapping.get(&key).copied() {
      return self.slot_mut(i).map(|slot| std::mem::replace(&mut slot.value, value));
    }
    let slot = Slot { key: key.clone(), value, prev: self.tail, next: None };
    let i = match self.free.pop() {
      Some(i) => {
        self.slots[i] = Some(slot);
        i
      }
      None => {
        self.slots.push(Some(slot));
        self.slots.len() - 1
      }
    };
    match self.tail.and_then(|t| self.slot_mut(t)) {
      Some(tail) => tail.next = Some(i),
      None => self.head = Some(i),
    }
    self.tail = Some(i);
    self.mapping.insert(key, i);
    None
  }

  pub fn remove(&mut self, key: &[u8]) -> Option<V> {
    let i = self.mapping.remove(key)?;
    let slot = self.slots.get_mut(i).and_then(Option::take)?;
    match slot.prev.and_then(|p| self.slot_mut(p)) {
      Some(prev) => prev.next = slot.next,
      None => self.head = slot.next,
    }
    match slot.next.and_then(|n| self.slot_mut(n)) {
      Some(next) => next.prev = slot.prev,
      None => self.tail = slot.prev,
    }
    self.free.push(i);
    Some(slot.value)
  }

  /// Replaces the key of an entry without moving it in the order. Fails when `old` is absent or
  /// `new` already belongs to another entry.
  pub fn rekey(&mut self, old: &[u8], new: Vec<u8>) -> bool {
    if old == new.as_slice() {
      return self.contains_key(old);
    }
    if self.mapping.contains_key(&new) {
      return false;
    }
    let Some(i) = self.mapping.remove(old) else {
      return false;
    };
    if let Some(slot) = self.slot_mut(i) {
      slot.key = new.clone();
    }
    self.mapping.insert(new, i);
    true
  }

  pub fn first(&self) -> Option<(&[u8], &V)> {
    self.head.and_then(|i| self.slot(i)).map(|slot| (slot.key.as_slice(), &slot.value))
  }

  pub fn last(&self) -> Option<(&[u8], &V)> {
    self.tail.and_then(|i| self.slot(i)).map(|slot| (slot.key.as_slice(), &slot.value))
  }

  pub fn iter(&self) -> Iter<'_, V> {
    Iter { index: self, cursor: self.head, remaining: self.len() }
  }

  pub fn keys(&self) -> impl ExactSizeIterator<Item = &[u8]> + '_ {
    self.iter().map(|(key, _)| key)
  }

  pub fn values(&self) -> impl ExactSizeIterator<Item = &V> + '_ {
    self.iter().map(|(_, value)| value)
  }

  pub fn clear(&mut self) {
    self.slots.clear();
    self.free.clear();
    self.mapping.clear();
    self.head = None;
    self.tail = None;
  }

  fn slot(&self, i: usize) -> Option<&Slot<V>> {
    self.slots.get(i).and_then(Option::as_ref)
  }

  fn slot_mut(&mut self, i: usize) -> Option<&mut Slot<V>> {
    self.slots.get_mut(i).and_then(Option::as_mut)
  }
}

pub struct Iter<'a, V> {
  index: &'a OrderedIndex<V>,
  cursor: Option<usize>,
  remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
  type Item = (&'a [u8], &'a V);

  fn next(&mut self) -> Option<Self::Item> {
    let slot = self.index.slot(self.cursor?)?;
    self.cursor = slot.next;
    self.remaining -= 1;
    Some((slot.key.as_slice(), &slot.value))
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    (self.remaining, Some(self.remaining))
  }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}
