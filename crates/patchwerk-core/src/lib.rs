//! Patchwerk Core - runtime of a visual dataflow patcher
//!
//! A patch is a graph of nodes joined by typed links. Control messages travel
//! synchronously from outlets to inlets; audio signals are handed to an
//! external engine. This crate builds, rewires, serializes and tears down such
//! graphs, and keeps message delivery bounded when nodes are wired in loops.
//!
//! # Core Abstractions
//!
//! ## Values
//!
//! - [`Tag`] / [`TagRegistry`] - Interned strings compared by identity
//! - [`Atom`] - Dynamic value exchanged in messages
//! - [`Dico`] - Ordered tag-keyed dictionary with a JSON text form
//!
//! ## Graph
//!
//! - [`Patcher`] - Owns nodes and links, allocates IDs, reads and writes documents
//! - [`Node`] - Identity, [`Inlet`]s, [`Outlet`]s and [`Attribute`]s around an [`Object`]
//! - [`Link`] - Validated outlet-to-inlet association
//! - [`Prototypes`] / [`Builder`] - Node-type table and constructor interface
//!
//! ## Side Channels
//!
//! - [`Beacon`] / [`BeaconRegistry`] - Name-addressed messaging without links
//! - [`Console`] - Diagnostic bus, mirrored to `tracing`
//! - [`Clock`] - Re-armable delayed callback
//!
//! ## Signal Engine Seam
//!
//! - [`Engine`], [`Process`], [`Connection`] - What a patcher hands to an engine
//! - [`BlockEngine`] - Reference engine running processes in topological order
//!
//! Every service lives in a [`Runtime`]; independent runtimes share nothing.
//!
//! # Example
//!
//! ```rust,ignore
//! use patchwerk_core::{Atom, Patcher, Runtime};
//!
//! let runtime = Runtime::new();
//! patchwerk_registry::install(&runtime);
//!
//! let patcher = Patcher::new(&runtime);
//! let add = patcher.create_from_text("+ 5")?;
//! let print = patcher.create_from_text("print sum")?;
//! patcher.connect(add, 0, print, 0)?;
//! patcher.send(add, 0, &[Atom::Int(3)])?; // posts "sum: 8"
//!
//! let document = patcher.write().to_text();
//! ```

pub mod atom;
pub mod attribute;
pub mod beacon;
pub mod clock;
pub mod console;
pub mod dico;
mod dispatch;
pub mod dsp;
pub mod error;
pub mod link;
pub mod node;
pub mod patcher;
pub mod port;
pub mod prototype;
pub mod runtime;
pub mod tag;

pub use atom::{Atom, AtomKind, MessageDisplay, parse_word, parse_words};
pub use attribute::{AttrFlags, AttrGetter, AttrSetter, AttrType, Attribute, AttributeSet};
pub use beacon::{Beacon, BeaconRegistry};
pub use clock::Clock;
pub use console::{Console, ConsoleHistory, ConsoleListener, Level, Message, Origin};
pub use dico::Dico;
pub use dispatch::{NESTING_LIMIT, STACK_LIMIT};
pub use dsp::{BlockEngine, CompileError, Connection, Engine, Process};
pub use error::{AttributeError, DicoError, PatchError};
pub use link::{Link, LinkId, LinkKind};
pub use node::{AsAny, Context, Node, NodeId, Object, Point};
pub use patcher::{Patcher, PatcherEvent, PatcherListener};
pub use port::{Inlet, InletKind, Outlet, OutletKind};
pub use prototype::{Builder, Constructor, Prototypes};
pub use runtime::Runtime;
pub use tag::{Tag, TagRegistry};
