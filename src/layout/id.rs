//! Stable layout ids across tree generations.

use std::collections::{HashMap, HashSet};
use std::mem;

/// Identifies one logical node: the chain of component instances it sits in plus its own id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayoutKey {
    /// Unresolved ids of the enclosing component instances, outermost first, joined by `;`.
    pub instance_path: String,
    pub node_id: String,
}

impl LayoutKey {
    pub fn new(instance_path: &str, node_id: &str) -> LayoutKey {
        LayoutKey {
            instance_path: instance_path.to_string(),
            node_id: node_id.to_string(),
        }
    }
}

/// Hands out layout ids and tracks which ones went stale.
///
/// Every id handed out during a generation is marked visited. Ending the generation reports the
/// ids that were visited in the previous generation but not in this one; those must be removed
/// from the layout solver.
#[derive(Debug, Default)]
pub struct LayoutIdAllocator {
    ids: HashMap<LayoutKey, i32>,
    next_id: i32,
    visited: HashSet<i32>,
    remaining: HashSet<i32>,
}

impl LayoutIdAllocator {
    pub fn new() -> LayoutIdAllocator {
        LayoutIdAllocator::default()
    }

    /// Returns the id for `key`, allocating one on first use, and marks it visited.
    pub fn id_for(&mut self, key: LayoutKey) -> i32 {
        let next_id = &mut self.next_id;
        let id = *self.ids.entry(key).or_insert_with(|| {
            let id = *next_id;
            *next_id += 1;
            id
        });
        self.visited.insert(id);
        id
    }

    /// Ends the current generation and returns the ids that disappeared in it.
    pub fn removal_nodes(&mut self) -> HashSet<i32> {
        let removed: HashSet<i32> = self.remaining.difference(&self.visited).copied().collect();
        if !removed.is_empty() {
            self.ids.retain(|_, id| !removed.contains(id));
        }
        mem::swap(&mut self.remaining, &mut self.visited);
        self.visited.clear();
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_stable_across_generations() {
        let mut alloc = LayoutIdAllocator::new();
        let a = alloc.id_for(LayoutKey::new("inst", "a"));
        let b = alloc.id_for(LayoutKey::new("inst", "b"));
        assert_ne!(a, b);
        assert!(alloc.removal_nodes().is_empty());

        assert_eq!(alloc.id_for(LayoutKey::new("inst", "a")), a);
        assert_eq!(alloc.id_for(LayoutKey::new("inst", "b")), b);
        assert!(alloc.removal_nodes().is_empty());
    }

    #[test]
    fn same_node_in_other_instance_gets_other_id() {
        let mut alloc = LayoutIdAllocator::new();
        let a = alloc.id_for(LayoutKey::new("one", "a"));
        let b = alloc.id_for(LayoutKey::new("two", "a"));
        assert_ne!(a, b);
    }

    #[test]
    fn vanished_ids_are_reported_once() {
        let mut alloc = LayoutIdAllocator::new();
        let a = alloc.id_for(LayoutKey::new("", "a"));
        let b = alloc.id_for(LayoutKey::new("", "b"));
        alloc.removal_nodes();

        alloc.id_for(LayoutKey::new("", "a"));
        let removed = alloc.removal_nodes();
        assert_eq!(removed.len(), 1);
        assert!(removed.contains(&b));

        alloc.id_for(LayoutKey::new("", "a"));
        assert!(alloc.removal_nodes().is_empty());

        // a key that comes back after removal gets a fresh id
        let b2 = alloc.id_for(LayoutKey::new("", "b"));
        assert_ne!(b2, b);
        assert_ne!(b2, a);
    }
}
