//! Nodes: identity, ports, attributes and the behavior behind them.
//!
//! A [`Node`] is the runtime container created by a [`Patcher`](crate::Patcher)
//! from a registered constructor. It owns the node's inlets, outlets and
//! attribute set, and wraps the user-supplied [`Object`] that implements the
//! node type's behavior. Objects talk to the rest of the graph through a
//! [`Context`], which queues everything they emit until their callback has
//! returned.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::atom::{Atom, MessageDisplay};
use crate::attribute::{AttrFlags, AttributeSet};
use crate::beacon::Beacon;
use crate::console::{Level, Message, Origin};
use crate::dico::Dico;
use crate::dispatch;
use crate::dsp::Process;
use crate::error::{AttributeError, PatchError};
use crate::patcher::{PatcherEvent, PatcherShared};
use crate::port::{InletKind, OutletKind, Ports};
use crate::runtime::Runtime;
use crate::tag::{Tag, TagRegistry};

/// Identifier of a node within its patcher.
///
/// IDs start at 1. The ID of a removed node returns to the patcher's pool and
/// is handed out again, lowest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Creates an ID from its numeric value.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }

    pub(crate) fn slot(self) -> usize {
        (self.0 as usize).saturating_sub(1)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canvas position of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point {
    /// Creates a point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Upcast to [`Any`], implemented for every `'static` type.
pub trait AsAny: Any {
    /// Returns `self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Behavior of a node type.
///
/// Only [`receive`](Object::receive) is required. Callbacks run with the
/// object locked; anything they emit through the [`Context`] is delivered
/// after they return, so an object never observes a message it caused while
/// it is still handling the one that caused it.
pub trait Object: AsAny + Send {
    /// Handles `message` arriving on `inlet`. Returns `false` if the message
    /// is not understood.
    fn receive(&mut self, ctx: &mut Context<'_>, inlet: usize, message: &[Atom]) -> bool;

    /// Called after the attribute `name` took a new value. Returning `false`
    /// stops the change from being announced to patcher listeners.
    fn attribute_changed(&mut self, ctx: &mut Context<'_>, name: &Tag) -> bool {
        let _ = (ctx, name);
        true
    }

    /// Called by a [`Clock`](crate::Clock) when a delay scheduled by this
    /// node expires.
    fn tick(&mut self, ctx: &mut Context<'_>, message: &[Atom]) {
        let _ = (ctx, message);
    }

    /// Called once the node and the links created with it are in place.
    fn loaded(&mut self, ctx: &mut Context<'_>) {
        let _ = ctx;
    }

    /// Adds type-specific state to the node dictionary.
    fn write(&self, dico: &mut Dico, tags: &TagRegistry) {
        let _ = (dico, tags);
    }

    /// Returns the signal processor for a node that owns signal ports.
    fn prepare_dsp(&mut self, sample_rate: f64, block_size: usize) -> Option<Box<dyn Process>> {
        let _ = (sample_rate, block_size);
        None
    }
}

/// Emission queued by a callback, delivered once the callback returns.
enum Pending {
    Output { outlet: usize, message: Vec<Atom> },
    Beacon { beacon: Arc<Beacon>, message: Vec<Atom> },
    AttributeChanged(Tag),
}

/// Everything a node's [`Object`] may do while handling a callback.
pub struct Context<'a> {
    node: &'a Node,
    outbox: Vec<Pending>,
}

impl<'a> Context<'a> {
    fn new(node: &'a Node) -> Self {
        Self {
            node,
            outbox: Vec::new(),
        }
    }

    /// ID of the node.
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    /// Name of the node's type.
    pub fn name(&self) -> &Tag {
        &self.node.name
    }

    /// Runtime the node belongs to.
    pub fn runtime(&self) -> &Runtime {
        &self.node.runtime
    }

    /// Interns `text` in the node's runtime.
    pub fn tag(&self, text: &str) -> Tag {
        self.node.runtime.tag(text)
    }

    /// Posts an informational message attributed to this node.
    pub fn post(&self, text: impl Into<String>) {
        self.node.report(Level::Post, text);
    }

    /// Posts a warning attributed to this node.
    pub fn warning(&self, text: impl Into<String>) {
        self.node.report(Level::Warning, text);
    }

    /// Posts an error attributed to this node.
    pub fn error(&self, text: impl Into<String>) {
        self.node.report(Level::Error, text);
    }

    /// Sends `message` out of `outlet` once the callback returns.
    pub fn send(&mut self, outlet: usize, message: impl Into<Vec<Atom>>) {
        self.outbox.push(Pending::Output {
            outlet,
            message: message.into(),
        });
    }

    /// Current values of the attribute `name`, empty if it does not exist.
    pub fn attribute(&self, name: &str) -> Vec<Atom> {
        self.node.attributes.lock().values(&self.tag(name))
    }

    /// Sets the attribute `name`. The change hook runs once the callback
    /// returns.
    pub fn set_attribute(&mut self, name: &str, values: &[Atom]) -> Result<(), AttributeError> {
        let name = self.tag(name);
        self.node.attributes.lock().set(&name, values)?;
        self.outbox.push(Pending::AttributeChanged(name));
        Ok(())
    }

    /// Sends `message` to every node bound to the beacon `name`.
    pub fn beacon_send(&mut self, name: &str, message: impl Into<Vec<Atom>>) {
        let beacon = self.node.runtime.beacon(name);
        self.outbox.push(Pending::Beacon {
            beacon,
            message: message.into(),
        });
    }

    /// Binds this node to the beacon `name`.
    pub fn bind(&self, name: &str) {
        if let Some(node) = self.node.this.upgrade() {
            self.node.runtime.beacon(name).bind(&node);
        }
    }

    /// Unbinds this node from the beacon `name`.
    pub fn unbind(&self, name: &str) {
        self.node.runtime.beacon(name).unbind(self.node);
    }

    /// Weak handle to the node, for scheduling with a [`Clock`](crate::Clock).
    pub fn handle(&self) -> Weak<Node> {
        self.node.this.clone()
    }

    fn flush(self) {
        let node = self.node;
        for pending in self.outbox {
            match pending {
                Pending::Output { outlet, message } => node.emit(outlet, &message),
                Pending::Beacon { beacon, message } => beacon.send(&message),
                Pending::AttributeChanged(name) => node.attribute_changed(&name),
            }
        }
    }
}

/// Constituents of a node, gathered by a [`Builder`](crate::Builder).
pub(crate) struct Parts {
    pub inlets: Vec<InletKind>,
    pub outlets: Vec<OutletKind>,
    pub attributes: AttributeSet,
    pub object: Box<dyn Object>,
}

/// A node of a patcher.
pub struct Node {
    id: NodeId,
    name: Tag,
    text: String,
    runtime: Runtime,
    patcher: Weak<PatcherShared>,
    this: Weak<Node>,
    ports: RwLock<Ports>,
    attributes: Mutex<AttributeSet>,
    position: Mutex<Point>,
    object: Mutex<Box<dyn Object>>,
    depth: AtomicU32,
}

impl Node {
    pub(crate) fn new(
        id: NodeId,
        name: Tag,
        text: String,
        runtime: Runtime,
        patcher: Weak<PatcherShared>,
        parts: Parts,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            id,
            name,
            text,
            runtime,
            patcher,
            this: this.clone(),
            ports: RwLock::new(Ports::new(&parts.inlets, &parts.outlets)),
            attributes: Mutex::new(parts.attributes),
            position: Mutex::new(Point::default()),
            object: Mutex::new(parts.object),
            depth: AtomicU32::new(0),
        })
    }

    /// ID within the owning patcher.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Name of the node's type.
    pub fn name(&self) -> &Tag {
        &self.name
    }

    /// Textual invocation the node was created from, such as `+ 5`.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Runtime the node belongs to.
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Console attribution for messages about this node.
    pub fn origin(&self) -> Origin {
        Origin {
            id: self.id,
            name: self.name.clone(),
        }
    }

    /// Number of inlets.
    pub fn num_inlets(&self) -> usize {
        self.ports.read().inlets.len()
    }

    /// Number of outlets.
    pub fn num_outlets(&self) -> usize {
        self.ports.read().outlets.len()
    }

    /// Kind of inlet `index`.
    pub fn inlet_kind(&self, index: usize) -> Option<InletKind> {
        self.ports.read().inlets.get(index).map(|i| i.kind())
    }

    /// Kind of outlet `index`.
    pub fn outlet_kind(&self, index: usize) -> Option<OutletKind> {
        self.ports.read().outlets.get(index).map(|o| o.kind())
    }

    /// Receivers of outlet `index` in fan-out order.
    pub fn destinations(&self, outlet: usize) -> Vec<(NodeId, usize)> {
        self.ports
            .read()
            .outlets
            .get(outlet)
            .map(|o| o.destinations())
            .unwrap_or_default()
    }

    /// Canvas position.
    pub fn position(&self) -> Point {
        *self.position.lock()
    }

    pub(crate) fn set_position(&self, position: Point) {
        *self.position.lock() = position;
    }

    pub(crate) fn ports(&self) -> &RwLock<Ports> {
        &self.ports
    }

    pub(crate) fn has_signal(&self) -> bool {
        self.ports.read().has_signal()
    }

    /// Delivers `message` into `inlet` through the dispatch protocol.
    pub fn send(&self, inlet: usize, message: &[Atom]) {
        dispatch::deliver(self, inlet, message);
    }

    /// Current values of the attribute `name`, empty if it does not exist.
    pub fn attribute(&self, name: &Tag) -> Vec<Atom> {
        self.attributes.lock().values(name)
    }

    /// Names of the node's attributes in declaration order.
    pub fn attribute_names(&self) -> Vec<Tag> {
        self.attributes
            .lock()
            .iter()
            .map(|a| a.name().clone())
            .collect()
    }

    /// Sets the attribute `name` and runs the change hook.
    pub fn set_attribute(&self, name: &Tag, values: &[Atom]) -> Result<(), PatchError> {
        self.attributes.lock().set(name, values)?;
        self.attribute_changed(name);
        Ok(())
    }

    /// Runs `f` on the node's object if it is a `T`.
    ///
    /// Blocks while the object is handling a callback on another thread.
    pub fn inspect<T: Object, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let object = self.object.lock();
        AsAny::as_any(&**object).downcast_ref::<T>().map(f)
    }

    /// Writes the node dictionary: identity, ports, position, persisted
    /// attributes and whatever the object adds.
    pub fn write(&self) -> Dico {
        let tags = self.runtime.tags();
        let mut dico = Dico::new();
        dico.set_one(tags.intern("name"), self.name.clone());
        dico.set_one(tags.intern("id"), i64::from(self.id.index()));
        dico.set_one(tags.intern("text"), tags.intern(&self.text));
        dico.set_one(tags.intern("ninlets"), self.num_inlets());
        dico.set_one(tags.intern("noutlets"), self.num_outlets());
        let position = self.position();
        dico.set(
            tags.intern("position"),
            vec![Atom::from(position.x), Atom::from(position.y)],
        );
        for attribute in self.attributes.lock().iter() {
            if attribute.flags().contains(AttrFlags::PERSIST) {
                dico.set(attribute.name().clone(), attribute.get_all());
            }
        }
        self.object.lock().write(&mut dico, tags);
        dico
    }

    /// Hands a message scheduled by a [`Clock`](crate::Clock) to the object.
    pub(crate) fn tick(&self, message: &[Atom]) {
        self.callback(|object, ctx| object.tick(ctx, message));
    }

    pub(crate) fn loaded(&self) {
        self.callback(|object, ctx| object.loaded(ctx));
    }

    pub(crate) fn prepare_dsp(&self, sample_rate: f64, block_size: usize) -> Option<Box<dyn Process>> {
        self.object.lock().prepare_dsp(sample_rate, block_size)
    }

    pub(crate) fn depth(&self) -> &AtomicU32 {
        &self.depth
    }

    /// Applies persisted attribute values found in a node dictionary.
    pub(crate) fn restore_attributes(&self, dico: &Dico) {
        let errors: Vec<AttributeError> = {
            let mut attributes = self.attributes.lock();
            let names: Vec<Tag> = attributes
                .iter()
                .filter(|a| a.flags().contains(AttrFlags::PERSIST))
                .map(|a| a.name().clone())
                .collect();
            names
                .iter()
                .filter(|name| dico.has(name))
                .filter_map(|name| attributes.set(name, dico.get(name)).err())
                .collect()
        };
        for err in errors {
            self.report(Level::Warning, err.to_string());
        }
    }

    /// Runs `receive` and, when the message is not understood, the `@name`
    /// attribute fallback.
    pub(crate) fn dispatch(&self, inlet: usize, message: &[Atom]) {
        let mut ctx = Context::new(self);
        let handled = self.object.lock().receive(&mut ctx, inlet, message);
        if !handled && !self.attribute_fallback(&mut ctx, message) {
            let err = PatchError::UnhandledMessage {
                node: self.name.to_string(),
                message: MessageDisplay(message).to_string(),
            };
            self.report(Level::Error, err.to_string());
        }
        ctx.flush();
    }

    fn attribute_fallback(&self, ctx: &mut Context<'_>, message: &[Atom]) -> bool {
        let Some((Atom::Tag(selector), values)) = message.split_first() else {
            return false;
        };
        let Some(name) = selector.as_str().strip_prefix('@') else {
            return false;
        };
        if values.is_empty() {
            return false;
        }
        if self.attributes.lock().is_opaque(&ctx.tag(name)) {
            let err = AttributeError::Rejected(name.to_string());
            self.report(Level::Error, err.to_string());
            return true;
        }
        match ctx.set_attribute(name, values) {
            Ok(()) => true,
            Err(AttributeError::Unknown(_)) => false,
            Err(err) => {
                self.report(Level::Error, err.to_string());
                true
            }
        }
    }

    fn callback(&self, f: impl FnOnce(&mut dyn Object, &mut Context<'_>)) {
        let mut ctx = Context::new(self);
        f(&mut **self.object.lock(), &mut ctx);
        ctx.flush();
    }

    fn attribute_changed(&self, name: &Tag) {
        let mut propagate = true;
        self.callback(|object, ctx| propagate = object.attribute_changed(ctx, name));
        if !propagate {
            return;
        }
        if let Some(patcher) = self.patcher.upgrade() {
            patcher.notify(&PatcherEvent::AttributeChanged {
                node: self.id,
                name: name.clone(),
            });
        }
    }

    /// Sends `message` to every receiver of `outlet`, in fan-out order.
    fn emit(&self, outlet: usize, message: &[Atom]) {
        let targets: Vec<(Arc<Node>, usize)> = match self.ports.read().outlets.get(outlet) {
            Some(outlet) => outlet.targets().collect(),
            None => {
                self.report(Level::Error, format!("no outlet {outlet}"));
                return;
            }
        };
        for (target, inlet) in targets {
            dispatch::deliver(&target, inlet, message);
        }
    }

    pub(crate) fn report(&self, level: Level, text: impl Into<String>) {
        self.runtime.console().emit(Message {
            level,
            text: text.into(),
            origin: Some(self.origin()),
        });
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("text", &self.text)
            .field("depth", &self.depth.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
