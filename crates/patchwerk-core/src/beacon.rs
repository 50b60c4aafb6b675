//! Name-addressed messaging independent of links.
//!
//! A [`Beacon`] keeps a weak list of bound nodes. Sending through it delivers
//! into inlet 0 of every bound node that is still alive, through the same
//! dispatch protocol as an outlet, so the per-node reentrancy bound applies.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::atom::Atom;
use crate::dispatch;
use crate::node::Node;
use crate::tag::Tag;

/// A named weak-binding list.
pub struct Beacon {
    name: Tag,
    nodes: Mutex<Vec<Weak<Node>>>,
}

impl Beacon {
    fn new(name: Tag) -> Self {
        Self {
            name,
            nodes: Mutex::new(Vec::new()),
        }
    }

    /// Name of the beacon.
    pub fn name(&self) -> &Tag {
        &self.name
    }

    /// Binds `node`. Binding an already bound node has no effect.
    pub fn bind(&self, node: &Arc<Node>) {
        let mut nodes = self.nodes.lock();
        nodes.retain(|n| n.strong_count() > 0);
        if !nodes.iter().any(|n| std::ptr::eq(n.as_ptr(), Arc::as_ptr(node))) {
            nodes.push(Arc::downgrade(node));
        }
    }

    /// Unbinds `node`.
    pub fn unbind(&self, node: &Node) {
        self.nodes
            .lock()
            .retain(|n| n.strong_count() > 0 && !std::ptr::eq(n.as_ptr(), node));
    }

    /// Number of live bound nodes.
    pub fn size(&self) -> usize {
        let mut nodes = self.nodes.lock();
        nodes.retain(|n| n.strong_count() > 0);
        nodes.len()
    }

    /// Delivers `message` into inlet 0 of every live bound node.
    pub fn send(&self, message: &[Atom]) {
        let live: Vec<Arc<Node>> = self.nodes.lock().iter().filter_map(Weak::upgrade).collect();
        for node in live {
            dispatch::deliver(&node, 0, message);
        }
    }
}

impl fmt::Debug for Beacon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Beacon")
            .field("name", &self.name)
            .field("bound", &self.nodes.lock().len())
            .finish()
    }
}

/// One [`Beacon`] per name, created on first lookup.
#[derive(Default)]
pub struct BeaconRegistry {
    beacons: Mutex<HashMap<Tag, Arc<Beacon>>>,
}

impl BeaconRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the beacon called `name`, creating it if needed.
    pub fn beacon(&self, name: &Tag) -> Arc<Beacon> {
        self.beacons
            .lock()
            .entry(name.clone())
            .or_insert_with(|| Arc::new(Beacon::new(name.clone())))
            .clone()
    }

    /// Number of beacons created so far.
    pub fn len(&self) -> usize {
        self.beacons.lock().len()
    }

    /// Returns `true` if no beacon was created yet.
    pub fn is_empty(&self) -> bool {
        self.beacons.lock().is_empty()
    }
}

impl fmt::Debug for BeaconRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeaconRegistry")
            .field("beacons", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::TagRegistry;

    #[test]
    fn same_name_same_beacon() {
        let tags = TagRegistry::new();
        let registry = BeaconRegistry::new();
        let a = registry.beacon(&tags.intern("x"));
        let b = registry.beacon(&tags.intern("x"));
        assert!(Arc::ptr_eq(&a, &b));
        let c = registry.beacon(&tags.intern("y"));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(registry.len(), 2);
        assert_eq!(a.name().as_str(), "x");
        assert_eq!(a.size(), 0);
    }
}
