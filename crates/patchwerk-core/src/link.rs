//! Validated associations between one outlet and one inlet.
//!
//! A [`Link`] joins an outlet of one node to an inlet of another node of the
//! same patcher. Links are created by
//! [`Patcher::connect`](crate::Patcher::connect), which checks that the kinds
//! intersect and that no identical link exists; removing a link removes both
//! of its sockets.

use std::fmt;

use crate::node::NodeId;

/// Identifier of a link within its patcher.
///
/// Link IDs are assigned sequentially and never reused within a patcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub(crate) u32);

impl LinkId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a link carries control messages or an audio signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// Synchronous control messages.
    Data,
    /// Audio-rate signal, compiled by the signal engine.
    Signal,
}

/// A connection from `from:outlet` to `to:inlet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    /// Link identifier.
    pub id: LinkId,
    /// Sending node.
    pub from: NodeId,
    /// Outlet index on the sending node.
    pub outlet: usize,
    /// Receiving node.
    pub to: NodeId,
    /// Inlet index on the receiving node.
    pub inlet: usize,
    /// Data or signal.
    pub kind: LinkKind,
}

impl Link {
    /// Returns `true` if the link starts or ends at `node`.
    pub fn touches(&self, node: NodeId) -> bool {
        self.from == node || self.to == node
    }

    /// Returns `true` if both links join the same endpoints.
    pub fn same_endpoints(&self, from: NodeId, outlet: usize, to: NodeId, inlet: usize) -> bool {
        self.from == from && self.outlet == outlet && self.to == to && self.inlet == inlet
    }
}
