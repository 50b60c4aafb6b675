//! Typed message endpoints of a node.
//!
//! Inlets and outlets keep the sockets of the links attached to them. Outlet
//! sockets are ordered by the canvas position of the receiving node (x, then
//! y), which makes fan-out order a function of the layout rather than of the
//! order in which links were made.

use std::sync::{Arc, Weak};

use crate::node::{Node, NodeId, Point};

/// Declared kind of an inlet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InletKind {
    /// Stores data without producing output.
    Cold,
    /// Data arriving here triggers output.
    Hot,
    /// Continuous audio-rate input handled by the signal engine.
    Signal,
}

/// Declared kind of an outlet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutletKind {
    /// Discrete control messages.
    Data,
    /// Continuous audio-rate output handled by the signal engine.
    Signal,
}

impl InletKind {
    /// Returns `true` if an outlet of kind `outlet` may feed this inlet.
    pub const fn accepts(self, outlet: OutletKind) -> bool {
        matches!(
            (self, outlet),
            (InletKind::Cold | InletKind::Hot, OutletKind::Data)
                | (InletKind::Signal, OutletKind::Signal)
        )
    }

    /// Returns `true` for [`InletKind::Signal`].
    pub const fn is_signal(self) -> bool {
        matches!(self, InletKind::Signal)
    }

    /// Lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            InletKind::Cold => "cold",
            InletKind::Hot => "hot",
            InletKind::Signal => "signal",
        }
    }
}

impl OutletKind {
    /// Returns `true` for [`OutletKind::Signal`].
    pub const fn is_signal(self) -> bool {
        matches!(self, OutletKind::Signal)
    }

    /// Lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            OutletKind::Data => "data",
            OutletKind::Signal => "signal",
        }
    }
}

/// Incoming end of a link as seen from an inlet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InletSocket {
    pub node: NodeId,
    pub outlet: usize,
}

/// Outgoing end of a link as seen from an outlet.
#[derive(Debug, Clone)]
pub(crate) struct OutletSocket {
    pub node: NodeId,
    pub inlet: usize,
    pub target: Weak<Node>,
}

/// An input endpoint: a kind and the set of sockets feeding it.
#[derive(Debug)]
pub struct Inlet {
    kind: InletKind,
    sockets: Vec<InletSocket>,
}

impl Inlet {
    pub(crate) fn new(kind: InletKind) -> Self {
        Self {
            kind,
            sockets: Vec::new(),
        }
    }

    /// Declared kind.
    pub fn kind(&self) -> InletKind {
        self.kind
    }

    /// Number of links arriving here.
    pub fn len(&self) -> usize {
        self.sockets.len()
    }

    /// Returns `true` if nothing is connected.
    pub fn is_empty(&self) -> bool {
        self.sockets.is_empty()
    }

    pub(crate) fn insert(&mut self, socket: InletSocket) {
        if !self.sockets.contains(&socket) {
            self.sockets.push(socket);
        }
    }

    pub(crate) fn remove(&mut self, node: NodeId, outlet: usize) {
        self.sockets
            .retain(|s| !(s.node == node && s.outlet == outlet));
    }
}

/// An output endpoint: a kind and its position-sorted sockets.
#[derive(Debug)]
pub struct Outlet {
    kind: OutletKind,
    sockets: Vec<OutletSocket>,
}

impl Outlet {
    pub(crate) fn new(kind: OutletKind) -> Self {
        Self {
            kind,
            sockets: Vec::new(),
        }
    }

    /// Declared kind.
    pub fn kind(&self) -> OutletKind {
        self.kind
    }

    /// Number of links leaving here.
    pub fn len(&self) -> usize {
        self.sockets.len()
    }

    /// Returns `true` if nothing is connected.
    pub fn is_empty(&self) -> bool {
        self.sockets.is_empty()
    }

    /// Receiving `(node, inlet)` pairs in fan-out order.
    pub fn destinations(&self) -> Vec<(NodeId, usize)> {
        self.sockets.iter().map(|s| (s.node, s.inlet)).collect()
    }

    pub(crate) fn insert(&mut self, socket: OutletSocket) {
        self.sockets.push(socket);
        self.sort();
    }

    pub(crate) fn remove(&mut self, node: NodeId, inlet: usize) {
        self.sockets
            .retain(|s| !(s.node == node && s.inlet == inlet));
    }

    pub(crate) fn targets(&self) -> impl Iterator<Item = (Arc<Node>, usize)> + '_ {
        self.sockets
            .iter()
            .filter_map(|s| s.target.upgrade().map(|node| (node, s.inlet)))
    }

    /// Re-sorts sockets by receiver position (x, then y), ties by id and inlet.
    pub(crate) fn sort(&mut self) {
        let mut keyed: Vec<(Point, OutletSocket)> = self
            .sockets
            .drain(..)
            .map(|s| {
                let pos = s.target.upgrade().map(|n| n.position()).unwrap_or_default();
                (pos, s)
            })
            .collect();
        keyed.sort_by(|(pa, sa), (pb, sb)| {
            pa.x.total_cmp(&pb.x)
                .then_with(|| pa.y.total_cmp(&pb.y))
                .then_with(|| sa.node.cmp(&sb.node))
                .then_with(|| sa.inlet.cmp(&sb.inlet))
        });
        self.sockets = keyed.into_iter().map(|(_, s)| s).collect();
    }
}

/// The inlets and outlets of one node, guarded together by the node.
#[derive(Debug, Default)]
pub(crate) struct Ports {
    pub inlets: Vec<Inlet>,
    pub outlets: Vec<Outlet>,
}

impl Ports {
    pub fn new(inlets: &[InletKind], outlets: &[OutletKind]) -> Self {
        Self {
            inlets: inlets.iter().copied().map(Inlet::new).collect(),
            outlets: outlets.iter().copied().map(Outlet::new).collect(),
        }
    }

    pub fn has_signal(&self) -> bool {
        self.inlets.iter().any(|i| i.kind().is_signal())
            || self.outlets.iter().any(|o| o.kind().is_signal())
    }
}
