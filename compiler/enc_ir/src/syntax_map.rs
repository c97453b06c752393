//! Externally asserted anchor correspondence.

use rustc_hash::FxHashMap;

use crate::Anchor;

/// Maps anchors of an edited method body to the anchors of the same syntax
/// nodes in the previous generation.
///
/// Supplied by the semantic layer alongside a method update. A missing entry
/// means the node has no predecessor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct SyntaxMap {
    forward: FxHashMap<Anchor, Anchor>,
    backward: FxHashMap<Anchor, Anchor>,
}

impl SyntaxMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `new` corresponds to `old`. A later insert for the same
    /// new anchor replaces the earlier one.
    pub fn insert(&mut self, new: Anchor, old: Anchor) {
        if let Some(previous) = self.forward.insert(new, old) {
            self.backward.remove(&previous);
        }
        self.backward.insert(old, new);
    }

    /// Old anchor of a new node.
    pub fn map(&self, new: Anchor) -> Option<Anchor> {
        self.forward.get(&new).copied()
    }

    /// New anchor of an old node.
    pub fn reverse(&self, old: Anchor) -> Option<Anchor> {
        self.backward.get(&old).copied()
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

impl FromIterator<(Anchor, Anchor)> for SyntaxMap {
    fn from_iter<I: IntoIterator<Item = (Anchor, Anchor)>>(iter: I) -> Self {
        let mut map = SyntaxMap::new();
        for (new, old) in iter {
            map.insert(new, old);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_and_reverse() {
        let map: SyntaxMap = [(Anchor::new(10), Anchor::new(4))].into_iter().collect();
        assert_eq!(map.map(Anchor::new(10)), Some(Anchor::new(4)));
        assert_eq!(map.reverse(Anchor::new(4)), Some(Anchor::new(10)));
        assert_eq!(map.map(Anchor::new(4)), None);
    }

    #[test]
    fn test_reinsert_replaces_reverse_entry() {
        let mut map = SyntaxMap::new();
        map.insert(Anchor::new(1), Anchor::new(2));
        map.insert(Anchor::new(1), Anchor::new(3));
        assert_eq!(map.reverse(Anchor::new(2)), None);
        assert_eq!(map.reverse(Anchor::new(3)), Some(Anchor::new(1)));
        assert_eq!(map.len(), 1);
    }
}
