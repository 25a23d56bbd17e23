//! Append-only node arena with typed indices.
//!
//! Slots are never reused after removal: a vacated `NodeId` keeps failing
//! lookups for the lifetime of the document, so a holder of a stale handle
//! finds out instead of silently reading an unrelated node. Documents are
//! short-lived relative to the number of edits they absorb, so the wasted
//! slots are not a concern.

use std::ops::{Index, IndexMut};

/// Typed index into a [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub(crate) fn get(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
enum Slot<T> {
    Occupied(T),
    Vacant,
}

/// Arena storage for document nodes.
#[derive(Debug)]
pub struct NodeArena<T> {
    slots: Vec<Slot<T>>,
    len: usize,
}

impl<T> Default for NodeArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NodeArena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            len: 0,
        }
    }

    /// Inserts a value, returning its stable index.
    pub fn insert(&mut self, value: T) -> NodeId {
        let id = NodeId::new(self.slots.len());
        self.slots.push(Slot::Occupied(value));
        self.len += 1;
        id
    }

    /// Gets a reference to the value at `id`, or `None` if the slot was vacated.
    pub fn get(&self, id: NodeId) -> Option<&T> {
        match self.slots.get(id.get()) {
            Some(Slot::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    /// Gets a mutable reference to the value at `id`.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        match self.slots.get_mut(id.get()) {
            Some(Slot::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    /// Vacates the slot at `id`, returning the value if it was occupied.
    ///
    /// The slot is never handed out again; later lookups with `id` fail.
    pub fn vacate(&mut self, id: NodeId) -> Option<T> {
        let slot = self.slots.get_mut(id.get())?;
        match std::mem::replace(slot, Slot::Vacant) {
            Slot::Occupied(value) => {
                self.len -= 1;
                Some(value)
            }
            Slot::Vacant => None,
        }
    }

    /// Returns the number of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns an iterator over occupied entries.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Occupied(value) => Some((NodeId::new(index), value)),
                Slot::Vacant => None,
            })
    }
}

impl<T> Index<NodeId> for NodeArena<T> {
    type Output = T;

    fn index(&self, id: NodeId) -> &Self::Output {
        self.get(id).expect("vacated or out-of-range NodeId")
    }
}

impl<T> IndexMut<NodeId> for NodeArena<T> {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        self.get_mut(id).expect("vacated or out-of-range NodeId")
    }
}
