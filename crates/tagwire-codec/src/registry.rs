use std::collections::HashMap;
use std::hash::Hash;

use crate::message::{TypeTag, MAX_TYPES};

/// Bidirectional kind ↔ tag table, grown in registration order.
///
/// Tags are dense: the n-th successful registration gets tag n. Entries are
/// never removed or reordered.
#[derive(Debug, Clone)]
pub struct Registry<K> {
    by_tag: Vec<K>,
    by_kind: HashMap<K, TypeTag>,
}

impl<K: Copy + Eq + Hash> Registry<K> {
    pub fn new() -> Self {
        Self {
            by_tag: Vec::new(),
            by_kind: HashMap::new(),
        }
    }

    /// Tag the next registration would receive, or `None` when full.
    pub fn next_tag(&self) -> Option<TypeTag> {
        u8::try_from(self.by_tag.len()).ok().map(TypeTag::new)
    }

    /// Record `kind` under the next tag.
    ///
    /// Callers check [`contains`](Self::contains) and [`next_tag`](Self::next_tag)
    /// first; this only asserts those invariants in debug builds.
    pub(crate) fn insert(&mut self, kind: K) -> TypeTag {
        debug_assert!(!self.by_kind.contains_key(&kind));
        debug_assert!(self.by_tag.len() < MAX_TYPES);
        let tag = TypeTag::new(self.by_tag.len() as u8);
        self.by_tag.push(kind);
        self.by_kind.insert(kind, tag);
        tag
    }

    pub fn contains(&self, kind: &K) -> bool {
        self.by_kind.contains_key(kind)
    }

    pub fn tag_of(&self, kind: &K) -> Option<TypeTag> {
        self.by_kind.get(kind).copied()
    }

    pub fn kind_of(&self, tag: TypeTag) -> Option<K> {
        self.by_tag.get(usize::from(tag.get())).copied()
    }

    /// Kinds in tag order.
    pub fn kinds(&self) -> &[K] {
        &self.by_tag
    }

    pub fn len(&self) -> usize {
        self.by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }
}

impl<K: Copy + Eq + Hash> Default for Registry<K> {
    fn default() -> Self {
        Self::new()
    }
}
