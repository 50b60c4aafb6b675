//! Synchronous message delivery with a per-node reentrancy bound.
//!
//! Every delivery into a node increments the node's depth counter for the
//! duration of the call, including the deliveries its own emissions cause.
//! A feedback loop therefore raises the counter by one per lap, and
//! [`STACK_LIMIT`] turns unbounded recursion into a dropped message and a
//! console error.
//!
//! A long cycle nests many deliveries before any single node reaches that
//! limit, so the deliveries in progress on one thread are also capped at
//! [`NESTING_LIMIT`], whatever nodes they go to.

use std::cell::Cell;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::atom::Atom;
use crate::console::Level;
use crate::error::PatchError;
use crate::node::Node;

/// Maximum nesting of deliveries into one node.
pub const STACK_LIMIT: u32 = 256;

/// Maximum nesting of deliveries on one thread, across all nodes.
///
/// A loop through two nodes still reaches [`STACK_LIMIT`] on both.
pub const NESTING_LIMIT: u32 = 2 * STACK_LIMIT;

thread_local! {
    static NESTING: Cell<u32> = const { Cell::new(0) };
}

/// Holds one level of the thread's nesting count, released on drop.
struct NestingGuard {
    depth: u32,
}

impl NestingGuard {
    fn enter() -> Self {
        let depth = NESTING.with(|n| {
            let depth = n.get() + 1;
            n.set(depth);
            depth
        });
        Self { depth }
    }
}

impl Drop for NestingGuard {
    fn drop(&mut self) {
        NESTING.with(|n| n.set(n.get().saturating_sub(1)));
    }
}

/// Holds one level of a node's depth counter, released on drop.
struct DepthGuard<'a> {
    counter: &'a AtomicU32,
    depth: u32,
}

impl<'a> DepthGuard<'a> {
    fn enter(counter: &'a AtomicU32) -> Self {
        let depth = counter.fetch_add(1, Ordering::AcqRel) + 1;
        Self { counter, depth }
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Delivers `message` into `inlet` of `node`.
///
/// At depth [`STACK_LIMIT`] the overflow is reported and the message is
/// still delivered; beyond it the message is reported and dropped. Beyond
/// [`NESTING_LIMIT`] on the calling thread the message is reported and
/// dropped as well.
pub(crate) fn deliver(node: &Node, inlet: usize, message: &[Atom]) {
    let nesting = NestingGuard::enter();
    if nesting.depth > NESTING_LIMIT {
        let err = PatchError::ReentrancyOverflow {
            node: node.name().to_string(),
        };
        node.report(Level::Error, err.to_string());
        tracing::debug!(node = %node.id(), inlet, "dispatch_drop: nesting {}", nesting.depth);
        return;
    }
    let guard = DepthGuard::enter(node.depth());
    if guard.depth >= STACK_LIMIT {
        let err = PatchError::ReentrancyOverflow {
            node: node.name().to_string(),
        };
        node.report(Level::Error, err.to_string());
        if guard.depth > STACK_LIMIT {
            tracing::debug!(node = %node.id(), inlet, "dispatch_drop: depth {}", guard.depth);
            return;
        }
    }
    node.dispatch(inlet, message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_releases_on_drop() {
        let counter = AtomicU32::new(0);
        {
            let outer = DepthGuard::enter(&counter);
            assert_eq!(outer.depth, 1);
            let inner = DepthGuard::enter(&counter);
            assert_eq!(inner.depth, 2);
        }
        assert_eq!(counter.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn nesting_is_per_thread_and_released() {
        {
            let outer = NestingGuard::enter();
            let inner = NestingGuard::enter();
            assert_eq!((outer.depth, inner.depth), (1, 2));
            let other = std::thread::spawn(|| NestingGuard::enter().depth).join().unwrap();
            assert_eq!(other, 1);
        }
        assert_eq!(NestingGuard::enter().depth, 1);
    }
}
