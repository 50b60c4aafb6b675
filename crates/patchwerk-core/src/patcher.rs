//! The owning container of one node-and-link graph.
//!
//! A [`Patcher`] owns its nodes in an arena indexed by [`NodeId`] and keeps
//! its links in creation order. Sockets and beacons refer to nodes weakly,
//! so removing a node from the arena is enough to release it.
//!
//! Every mutating operation validates before it changes anything: a failed
//! operation leaves the graph as it was, reports the reason to the runtime's
//! [`Console`](crate::Console) and returns it as a [`PatchError`].
//!
//! # Document format
//!
//! ```text
//! { "objects": [ { "name": "+", "id": 1, "text": "+ 5", ... }, ... ],
//!   "links":   [ { "from": [1, 0], "to": [2, 0] }, ... ] }
//! ```

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::atom::{Atom, parse_words};
use crate::console::Level;
use crate::dico::Dico;
use crate::dispatch;
use crate::dsp::{Connection, Engine};
use crate::error::PatchError;
use crate::link::{Link, LinkId, LinkKind};
use crate::node::{Node, NodeId, Point};
use crate::port::{InletSocket, OutletSocket};
use crate::runtime::Runtime;
use crate::tag::Tag;

/// Structural change of a patcher.
#[derive(Debug, Clone, PartialEq)]
pub enum PatcherEvent {
    /// A node was inserted.
    NodeAdded(NodeId),
    /// A node was removed.
    NodeRemoved(NodeId),
    /// A link was made.
    LinkAdded(Link),
    /// A link was removed.
    LinkRemoved(Link),
    /// An attribute of a node changed and the node let the change through.
    AttributeChanged {
        /// The node.
        node: NodeId,
        /// Attribute name.
        name: Tag,
    },
}

/// Receives [`PatcherEvent`]s.
pub trait PatcherListener: Send + Sync {
    /// Called after the change, on the thread that made it.
    fn patcher_changed(&self, event: &PatcherEvent);
}

/// Nodes, links and the ID pool, guarded together.
///
/// An allocated ID stays reserved, with its slot kept, until the node is
/// inserted or the ID released, so `clear` cannot hand it out twice.
#[derive(Default)]
struct Graph {
    slots: Vec<Option<Arc<Node>>>,
    order: Vec<NodeId>,
    links: Vec<Link>,
    free: BTreeSet<u32>,
    reserved: BTreeSet<u32>,
    next_link: u32,
}

impl Graph {
    fn node(&self, id: NodeId) -> Option<&Arc<Node>> {
        if id.0 == 0 {
            return None;
        }
        self.slots.get(id.slot()).and_then(Option::as_ref)
    }

    fn allocate(&mut self) -> NodeId {
        let id = self.free.pop_first().unwrap_or_else(|| {
            self.slots.push(None);
            self.slots.len() as u32
        });
        self.reserved.insert(id);
        NodeId(id)
    }

    fn release(&mut self, id: NodeId) {
        self.reserved.remove(&id.0);
        self.free.insert(id.0);
    }

    fn insert(&mut self, node: Arc<Node>) {
        let id = node.id();
        self.reserved.remove(&id.0);
        if let Some(slot) = self.slots.get_mut(id.slot()) {
            *slot = Some(node);
            self.order.push(id);
        }
    }

    /// Empties the graph, keeping the slots of reserved IDs.
    fn drain(&mut self) -> (Vec<Arc<Node>>, Vec<Link>) {
        let links = std::mem::take(&mut self.links);
        for link in &links {
            self.detach(link);
        }
        self.order.clear();
        let nodes: Vec<Arc<Node>> = self.slots.iter_mut().filter_map(Option::take).collect();
        let keep = self.reserved.last().copied().unwrap_or(0);
        self.slots.truncate(keep as usize);
        self.free = (1..=keep).filter(|id| !self.reserved.contains(id)).collect();
        (nodes, links)
    }

    fn take(&mut self, id: NodeId) -> Option<Arc<Node>> {
        let node = self.slots.get_mut(id.slot())?.take()?;
        self.order.retain(|&n| n != id);
        self.release(id);
        Some(node)
    }

    fn has_link(&self, from: NodeId, outlet: usize, to: NodeId, inlet: usize) -> bool {
        self.links
            .iter()
            .any(|l| l.same_endpoints(from, outlet, to, inlet))
    }

    fn attach(&mut self, source: &Arc<Node>, outlet: usize, target: &Arc<Node>, inlet: usize, kind: LinkKind) -> Link {
        let link = Link {
            id: LinkId(self.next_link),
            from: source.id(),
            outlet,
            to: target.id(),
            inlet,
            kind,
        };
        self.next_link += 1;
        if let Some(o) = source.ports().write().outlets.get_mut(outlet) {
            o.insert(OutletSocket {
                node: target.id(),
                inlet,
                target: Arc::downgrade(target),
            });
        }
        if let Some(i) = target.ports().write().inlets.get_mut(inlet) {
            i.insert(InletSocket {
                node: source.id(),
                outlet,
            });
        }
        self.links.push(link);
        link
    }

    fn detach(&self, link: &Link) {
        if let Some(source) = self.node(link.from)
            && let Some(o) = source.ports().write().outlets.get_mut(link.outlet)
        {
            o.remove(link.to, link.inlet);
        }
        if let Some(target) = self.node(link.to)
            && let Some(i) = target.ports().write().inlets.get_mut(link.inlet)
        {
            i.remove(link.from, link.outlet);
        }
    }

    /// Removes and detaches every link touching `id`.
    fn unlink(&mut self, id: NodeId) -> Vec<Link> {
        let (gone, kept): (Vec<Link>, Vec<Link>) =
            self.links.drain(..).partition(|l| l.touches(id));
        self.links = kept;
        for link in &gone {
            self.detach(link);
        }
        gone
    }
}

/// Checks that `source:outlet` may feed `target:inlet`.
fn link_kind(source: &Node, outlet: usize, target: &Node, inlet: usize) -> Result<LinkKind, String> {
    if source.id() == target.id() {
        return Err("a node cannot connect to itself".to_string());
    }
    let out_kind = source
        .outlet_kind(outlet)
        .ok_or_else(|| format!("{} has no outlet {outlet}", source.name()))?;
    let in_kind = target
        .inlet_kind(inlet)
        .ok_or_else(|| format!("{} has no inlet {inlet}", target.name()))?;
    if !in_kind.accepts(out_kind) {
        return Err(format!(
            "{} outlet cannot feed {} inlet",
            out_kind.name(),
            in_kind.name()
        ));
    }
    Ok(if out_kind.is_signal() {
        LinkKind::Signal
    } else {
        LinkKind::Data
    })
}

/// Document keys, interned once per patcher.
struct Keys {
    name: Tag,
    id: Tag,
    text: Tag,
    position: Tag,
    objects: Tag,
    links: Tag,
    from: Tag,
    to: Tag,
}

impl Keys {
    fn new(runtime: &Runtime) -> Self {
        Self {
            name: runtime.tag("name"),
            id: runtime.tag("id"),
            text: runtime.tag("text"),
            position: runtime.tag("position"),
            objects: runtime.tag("objects"),
            links: runtime.tag("links"),
            from: runtime.tag("from"),
            to: runtime.tag("to"),
        }
    }
}

/// State shared between a patcher and the back-references of its nodes.
pub(crate) struct PatcherShared {
    runtime: Runtime,
    keys: Keys,
    graph: Mutex<Graph>,
    listeners: Mutex<Vec<Weak<dyn PatcherListener>>>,
    engine: Mutex<Option<Box<dyn Engine>>>,
}

impl PatcherShared {
    pub(crate) fn notify(&self, event: &PatcherEvent) {
        let live: Vec<Arc<dyn PatcherListener>> = {
            let mut listeners = self.listeners.lock();
            listeners.retain(|l| l.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in live {
            listener.patcher_changed(event);
        }
    }
}

/// A link endpoint read from a document: a local node ID and a port index.
type Endpoint = (i64, usize);

/// Owning container of a dataflow graph.
pub struct Patcher {
    shared: Arc<PatcherShared>,
}

impl Patcher {
    /// Creates an empty patcher in `runtime`.
    pub fn new(runtime: &Runtime) -> Self {
        Self {
            shared: Arc::new(PatcherShared {
                runtime: runtime.clone(),
                keys: Keys::new(runtime),
                graph: Mutex::new(Graph::default()),
                listeners: Mutex::new(Vec::new()),
                engine: Mutex::new(None),
            }),
        }
    }

    /// Runtime the patcher was created in.
    pub fn runtime(&self) -> &Runtime {
        &self.shared.runtime
    }

    // --- Queries ---

    /// Returns the node with ID `id`.
    pub fn node(&self, id: NodeId) -> Option<Arc<Node>> {
        self.shared.graph.lock().node(id).cloned()
    }

    /// Nodes in paint order, back to front.
    pub fn nodes(&self) -> Vec<Arc<Node>> {
        let graph = self.shared.graph.lock();
        graph
            .order
            .iter()
            .filter_map(|&id| graph.node(id).cloned())
            .collect()
    }

    /// Links in creation order.
    pub fn links(&self) -> Vec<Link> {
        self.shared.graph.lock().links.clone()
    }

    /// Links starting or ending at `id`.
    pub fn links_of(&self, id: NodeId) -> Vec<Link> {
        self.shared
            .graph
            .lock()
            .links
            .iter()
            .filter(|l| l.touches(id))
            .copied()
            .collect()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.shared.graph.lock().order.len()
    }

    /// Number of links.
    pub fn link_count(&self) -> usize {
        self.shared.graph.lock().links.len()
    }

    // --- Creation ---

    /// Creates a node from its dictionary.
    ///
    /// The `name` entry selects the node type; `text` holds the textual
    /// invocation whose words after the first are passed to the constructor.
    /// Persisted attributes and `position` are applied when present.
    pub fn create(&self, dico: &Dico) -> Result<NodeId, PatchError> {
        let result = self.create_node(dico);
        self.check(result)
    }

    /// Creates a node from a textual invocation such as `+ 5`.
    pub fn create_from_text(&self, text: &str) -> Result<NodeId, PatchError> {
        let text = text.trim();
        let name = text.split_whitespace().next().unwrap_or_default();
        let mut dico = Dico::new();
        dico.set_one(self.shared.keys.name.clone(), self.runtime().tag(name));
        dico.set_one(self.shared.keys.text.clone(), self.runtime().tag(text));
        self.create(&dico)
    }

    fn create_node(&self, dico: &Dico) -> Result<NodeId, PatchError> {
        let name = self.node_name(dico)?;
        let id = self.shared.graph.lock().allocate();
        let node = match self.build(dico, &name, id) {
            Ok(node) => node,
            Err(err) => {
                self.shared.graph.lock().release(id);
                return Err(err);
            }
        };
        self.shared.graph.lock().insert(Arc::clone(&node));
        tracing::debug!("patcher_add: {name} as node {id}");
        self.shared.notify(&PatcherEvent::NodeAdded(id));
        node.loaded();
        Ok(id)
    }

    fn node_name(&self, dico: &Dico) -> Result<Tag, PatchError> {
        let name = dico
            .get_first(&self.shared.keys.name)
            .as_tag()
            .cloned()
            .ok_or_else(|| PatchError::MalformedDocument("node without a name".to_string()))?;
        if !self.runtime().prototypes().has(&name) {
            return Err(PatchError::UnknownNodeType(name.to_string()));
        }
        Ok(name)
    }

    fn build(&self, dico: &Dico, name: &Tag, id: NodeId) -> Result<Arc<Node>, PatchError> {
        let runtime = self.runtime();
        let keys = &self.shared.keys;
        let text = match dico.get_first(&keys.text) {
            Atom::Null => name.to_string(),
            atom => atom.to_string(),
        };
        let args: Vec<Atom> = parse_words(runtime.tags(), &text).into_iter().skip(1).collect();
        let parts = runtime.prototypes().create(runtime, name, &args, dico)?;
        let node = Node::new(
            id,
            name.clone(),
            text,
            runtime.clone(),
            Arc::downgrade(&self.shared),
            parts,
        );
        node.restore_attributes(dico);
        if let [x, y, ..] = dico.get(&keys.position) {
            node.set_position(Point::new(x.as_float(), y.as_float()));
        }
        Ok(node)
    }

    /// Adds the nodes and links of a document.
    ///
    /// Node IDs in the document are local to it: each is mapped to a freshly
    /// allocated ID before anything is created, and link endpoints are
    /// rewritten through the same map. The document is checked as a whole;
    /// if any node or link is refused, nothing is added. Returns the new IDs
    /// in document order.
    pub fn add(&self, dico: &Dico) -> Result<Vec<NodeId>, PatchError> {
        let result = self.add_document(dico);
        self.check(result)
    }

    fn add_document(&self, dico: &Dico) -> Result<Vec<NodeId>, PatchError> {
        let keys = &self.shared.keys;

        let mut objects: Vec<(&Dico, Tag, Option<i64>)> = Vec::new();
        let mut locals = HashSet::new();
        for atom in dico.get(&keys.objects) {
            let object = atom.as_dico().ok_or_else(|| {
                PatchError::MalformedDocument(format!("expected a node dictionary, found {atom}"))
            })?;
            let name = self.node_name(object)?;
            let local = match object.get_first(&keys.id) {
                Atom::Null => None,
                Atom::Int(id) => Some(id),
                other => {
                    return Err(PatchError::MalformedDocument(format!("invalid node id {other}")));
                }
            };
            if let Some(id) = local
                && !locals.insert(id)
            {
                return Err(PatchError::MalformedDocument(format!("duplicate node id {id}")));
            }
            objects.push((object, name, local));
        }

        let mut wires: Vec<(Endpoint, Endpoint)> = Vec::new();
        for atom in dico.get(&keys.links) {
            let link = atom.as_dico().ok_or_else(|| {
                PatchError::MalformedDocument(format!("expected a link dictionary, found {atom}"))
            })?;
            let from = endpoint(link.get(&keys.from), &locals)?;
            let to = endpoint(link.get(&keys.to), &locals)?;
            if !wires.contains(&(from, to)) {
                wires.push((from, to));
            }
        }

        let ids: Vec<NodeId> = {
            let mut graph = self.shared.graph.lock();
            objects.iter().map(|_| graph.allocate()).collect()
        };
        let built = self.build_all(&objects, &ids).and_then(|nodes| {
            let index: HashMap<i64, usize> = objects
                .iter()
                .enumerate()
                .filter_map(|(i, (_, _, local))| local.map(|l| (l, i)))
                .collect();
            let mut plan = Vec::with_capacity(wires.len());
            for &((from, outlet), (to, inlet)) in &wires {
                let (Some(&s), Some(&t)) = (index.get(&from), index.get(&to)) else {
                    continue;
                };
                let (source, target) = (&nodes[s], &nodes[t]);
                let kind = link_kind(source, outlet, target, inlet).map_err(|reason| {
                    PatchError::IncompatibleConnection {
                        from: source.id(),
                        outlet,
                        to: target.id(),
                        inlet,
                        reason,
                    }
                })?;
                plan.push((s, outlet, t, inlet, kind));
            }
            Ok((nodes, plan))
        });
        let (nodes, plan) = match built {
            Ok(built) => built,
            Err(err) => {
                let mut graph = self.shared.graph.lock();
                for &id in &ids {
                    graph.release(id);
                }
                return Err(err);
            }
        };

        let links: Vec<Link> = {
            let mut graph = self.shared.graph.lock();
            for node in &nodes {
                graph.insert(Arc::clone(node));
            }
            plan.iter()
                .map(|&(s, outlet, t, inlet, kind)| {
                    graph.attach(&nodes[s], outlet, &nodes[t], inlet, kind)
                })
                .collect()
        };
        tracing::debug!("patcher_add: {} nodes, {} links from document", nodes.len(), links.len());
        for node in &nodes {
            self.shared.notify(&PatcherEvent::NodeAdded(node.id()));
        }
        for link in &links {
            self.shared.notify(&PatcherEvent::LinkAdded(*link));
        }
        for node in &nodes {
            node.loaded();
        }
        Ok(ids)
    }

    fn build_all(
        &self,
        objects: &[(&Dico, Tag, Option<i64>)],
        ids: &[NodeId],
    ) -> Result<Vec<Arc<Node>>, PatchError> {
        objects
            .iter()
            .zip(ids)
            .map(|((object, name, _), &id)| self.build(object, name, id))
            .collect()
    }

    // --- Removal ---

    /// Removes a node and every link touching it. Its ID returns to the pool.
    pub fn remove(&self, id: NodeId) -> Result<(), PatchError> {
        let result = self.remove_node(id);
        self.check(result)
    }

    fn remove_node(&self, id: NodeId) -> Result<(), PatchError> {
        let (node, links) = {
            let mut graph = self.shared.graph.lock();
            if graph.node(id).is_none() {
                return Err(PatchError::NodeNotFound(id));
            }
            let links = graph.unlink(id);
            (graph.take(id), links)
        };
        tracing::debug!("patcher_remove: node {id} with {} links", links.len());
        for link in links {
            self.shared.notify(&PatcherEvent::LinkRemoved(link));
        }
        self.shared.notify(&PatcherEvent::NodeRemoved(id));
        drop(node);
        Ok(())
    }

    /// Removes a link.
    pub fn disconnect(&self, id: LinkId) -> Result<(), PatchError> {
        let result = self.disconnect_link(id);
        self.check(result)
    }

    fn disconnect_link(&self, id: LinkId) -> Result<(), PatchError> {
        let link = {
            let mut graph = self.shared.graph.lock();
            let index = graph
                .links
                .iter()
                .position(|l| l.id == id)
                .ok_or(PatchError::LinkNotFound(id))?;
            let link = graph.links.remove(index);
            graph.detach(&link);
            link
        };
        tracing::debug!("patcher_disconnect: link {id}");
        self.shared.notify(&PatcherEvent::LinkRemoved(link));
        Ok(())
    }

    /// Removes every node and link. Freed IDs start again at 1, except
    /// those of nodes still being built, which keep their slots.
    pub fn clear(&self) {
        let (nodes, links) = self.shared.graph.lock().drain();
        tracing::debug!("patcher_clear: {} nodes, {} links", nodes.len(), links.len());
        for link in links {
            self.shared.notify(&PatcherEvent::LinkRemoved(link));
        }
        for node in &nodes {
            self.shared.notify(&PatcherEvent::NodeRemoved(node.id()));
        }
    }

    // --- Linking ---

    /// Links `from:outlet` to `to:inlet`.
    ///
    /// Both nodes must belong to this patcher and be distinct, the outlet kind
    /// must feed the inlet kind, and no identical link may exist.
    pub fn connect(&self, from: NodeId, outlet: usize, to: NodeId, inlet: usize) -> Result<LinkId, PatchError> {
        let result = self.connect_nodes(from, outlet, to, inlet);
        self.check(result)
    }

    fn connect_nodes(&self, from: NodeId, outlet: usize, to: NodeId, inlet: usize) -> Result<LinkId, PatchError> {
        let incompatible = |reason: String| PatchError::IncompatibleConnection {
            from,
            outlet,
            to,
            inlet,
            reason,
        };
        let link = {
            let mut graph = self.shared.graph.lock();
            let source = graph.node(from).cloned().ok_or(PatchError::NodeNotFound(from))?;
            let target = graph.node(to).cloned().ok_or(PatchError::NodeNotFound(to))?;
            let kind = link_kind(&source, outlet, &target, inlet).map_err(incompatible)?;
            if graph.has_link(from, outlet, to, inlet) {
                return Err(incompatible("link already exists".to_string()));
            }
            graph.attach(&source, outlet, &target, inlet, kind)
        };
        tracing::debug!("patcher_connect: {from}:{outlet} → {to}:{inlet}");
        self.shared.notify(&PatcherEvent::LinkAdded(link));
        Ok(link.id)
    }

    // --- Layout ---

    /// Moves a node to the front of the paint order.
    pub fn to_front(&self, id: NodeId) -> Result<(), PatchError> {
        let result = self.reorder(id, true);
        self.check(result)
    }

    /// Moves a node to the back of the paint order.
    pub fn to_back(&self, id: NodeId) -> Result<(), PatchError> {
        let result = self.reorder(id, false);
        self.check(result)
    }

    fn reorder(&self, id: NodeId, front: bool) -> Result<(), PatchError> {
        let mut graph = self.shared.graph.lock();
        if graph.node(id).is_none() {
            return Err(PatchError::NodeNotFound(id));
        }
        graph.order.retain(|&n| n != id);
        if front {
            graph.order.push(id);
        } else {
            graph.order.insert(0, id);
        }
        Ok(())
    }

    /// Moves a node on the canvas and re-sorts every outlet feeding it.
    pub fn set_position(&self, id: NodeId, x: f64, y: f64) -> Result<(), PatchError> {
        let result = self.move_node(id, Point::new(x, y));
        self.check(result)
    }

    fn move_node(&self, id: NodeId, position: Point) -> Result<(), PatchError> {
        let graph = self.shared.graph.lock();
        let node = graph.node(id).ok_or(PatchError::NodeNotFound(id))?;
        node.set_position(position);
        for link in graph.links.iter().filter(|l| l.to == id) {
            if let Some(source) = graph.node(link.from)
                && let Some(outlet) = source.ports().write().outlets.get_mut(link.outlet)
            {
                outlet.sort();
            }
        }
        Ok(())
    }

    // --- Messages ---

    /// Delivers `message` into `inlet` of a node.
    pub fn send(&self, id: NodeId, inlet: usize, message: &[Atom]) -> Result<(), PatchError> {
        let Some(node) = self.node(id) else {
            return self.check(Err(PatchError::NodeNotFound(id)));
        };
        dispatch::deliver(&node, inlet, message);
        Ok(())
    }

    // --- Documents ---

    /// Writes the patcher as a document: nodes in paint order, links in
    /// creation order.
    pub fn write(&self) -> Dico {
        let keys = &self.shared.keys;
        let nodes = self.nodes();
        let links = self.links();
        let mut dico = Dico::new();
        dico.set(
            keys.objects.clone(),
            nodes.iter().map(|n| Atom::from(n.write())).collect::<Vec<_>>(),
        );
        dico.set(
            keys.links.clone(),
            links
                .iter()
                .map(|l| {
                    let mut link = Dico::new();
                    link.set(keys.from.clone(), vec![Atom::from(i64::from(l.from.index())), Atom::from(l.outlet)]);
                    link.set(keys.to.clone(), vec![Atom::from(i64::from(l.to.index())), Atom::from(l.inlet)]);
                    Atom::from(link)
                })
                .collect::<Vec<_>>(),
        );
        dico
    }

    /// Replaces the whole graph with the content of a document.
    pub fn read(&self, dico: &Dico) -> Result<Vec<NodeId>, PatchError> {
        self.clear();
        self.add(dico)
    }

    // --- Listeners ---

    /// Subscribes `listener` to structural changes until it is dropped or
    /// removed.
    pub fn add_listener<L: PatcherListener + 'static>(&self, listener: &Arc<L>) {
        let weak = Arc::downgrade(listener);
        let weak: Weak<dyn PatcherListener> = weak;
        let mut listeners = self.shared.listeners.lock();
        if !listeners
            .iter()
            .any(|l| std::ptr::addr_eq(l.as_ptr(), Arc::as_ptr(listener)))
        {
            listeners.push(weak);
        }
    }

    /// Unsubscribes `listener`.
    pub fn remove_listener<L: PatcherListener + 'static>(&self, listener: &Arc<L>) {
        self.shared.listeners.lock().retain(|l| {
            l.strong_count() > 0 && !std::ptr::addr_eq(l.as_ptr(), Arc::as_ptr(listener))
        });
    }

    // --- Signal processing ---

    /// Hands the signal part of the graph to `engine`, compiles and starts it.
    ///
    /// Every node owning a signal port must provide a process. A running
    /// engine is stopped and replaced.
    pub fn dsp_start(&self, mut engine: Box<dyn Engine>, sample_rate: f64, block_size: usize) -> Result<(), PatchError> {
        self.dsp_stop();
        let nodes = self.nodes();
        for node in nodes.iter().filter(|n| n.has_signal()) {
            let Some(process) = node.prepare_dsp(sample_rate, block_size) else {
                return Err(self.compile_failure(Some(node), "no signal process".to_string()));
            };
            engine.add_process(node.id(), node.num_inlets(), node.num_outlets(), process);
        }
        for link in self.links().iter().filter(|l| l.kind == LinkKind::Signal) {
            engine.add_connection(Connection {
                from: link.from,
                outlet: link.outlet,
                to: link.to,
                inlet: link.inlet,
            });
        }
        if let Err(err) = engine.compile(sample_rate, block_size) {
            let node = err.node.and_then(|id| nodes.iter().find(|n| n.id() == id));
            return Err(self.compile_failure(node, err.reason));
        }
        engine.start();
        tracing::debug!("patcher_dsp_start: {sample_rate} Hz, block {block_size}");
        *self.shared.engine.lock() = Some(engine);
        Ok(())
    }

    /// Processes one block if the engine is running.
    pub fn dsp_tick(&self) {
        if let Some(engine) = self.shared.engine.lock().as_mut() {
            engine.tick();
        }
    }

    /// Stops the engine and hands it back.
    pub fn dsp_stop(&self) -> Option<Box<dyn Engine>> {
        let mut engine = self.shared.engine.lock().take()?;
        engine.stop();
        tracing::debug!("patcher_dsp_stop");
        Some(engine)
    }

    /// Returns `true` while an engine is running.
    pub fn dsp_running(&self) -> bool {
        self.shared.engine.lock().is_some()
    }

    fn compile_failure(&self, node: Option<&Arc<Node>>, reason: String) -> PatchError {
        let err = PatchError::CompileFailure {
            node: node.map_or_else(|| "graph".to_string(), |n| format!("{} ({})", n.name(), n.id())),
            reason,
        };
        match node {
            Some(n) => n.report(Level::Error, err.to_string()),
            None => self.runtime().console().error(err.to_string()),
        }
        err
    }

    /// Reports a failed operation to the console.
    fn check<T>(&self, result: Result<T, PatchError>) -> Result<T, PatchError> {
        if let Err(err) = &result {
            self.runtime().console().error(err.to_string());
        }
        result
    }
}

impl fmt::Debug for Patcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Patcher")
            .field("nodes", &self.node_count())
            .field("links", &self.link_count())
            .finish()
    }
}

/// Reads `[id, port]` and checks that `id` names a node of the document.
fn endpoint(values: &[Atom], locals: &HashSet<i64>) -> Result<Endpoint, PatchError> {
    match values {
        [Atom::Int(id), Atom::Int(port)] if *port >= 0 => {
            if locals.contains(id) {
                Ok((*id, *port as usize))
            } else {
                Err(PatchError::MalformedDocument(format!("link refers to unknown node {id}")))
            }
        }
        _ => Err(PatchError::MalformedDocument(
            "link endpoints must be [id, index]".to_string(),
        )),
    }
}
