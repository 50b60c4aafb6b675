//! Built-in node types for the patchwerk dataflow patcher.
//!
//! This crate provides the standard node library and a registry describing
//! it. Installing the registry into a [`Runtime`] makes every built-in type
//! creatable by name from patch documents and node text.
//!
//! # Features
//!
//! - **Node Discovery**: List all built-in types with metadata
//! - **Aliases**: Short names such as `s` and `r` resolve to their node type
//! - **Category System**: Types organized by role (math, messaging, time, signal)
//! - **Installation**: One call registers every constructor with a runtime
//!
//! # Example
//!
//! ```rust
//! use patchwerk_core::{Atom, ConsoleHistory, Patcher, Runtime};
//! use patchwerk_registry::{NodeCategory, NodeRegistry};
//! use std::sync::Arc;
//!
//! let runtime = Runtime::new();
//! patchwerk_registry::install(&runtime);
//! let history = Arc::new(ConsoleHistory::new());
//! runtime.console().add_listener(&history);
//!
//! let patcher = Patcher::new(&runtime);
//! let add = patcher.create_from_text("+ 5").unwrap();
//! let print = patcher.create_from_text("print sum").unwrap();
//! patcher.connect(add, 0, print, 0).unwrap();
//! patcher.send(add, 0, &[Atom::Int(3)]).unwrap();
//! assert!(history.contains("sum: 8"));
//!
//! // Filter by category
//! let registry = NodeRegistry::new();
//! for node in registry.nodes_in_category(NodeCategory::Signal) {
//!     println!("signal node: {}", node.id);
//! }
//! ```

mod beacon;
mod math;
mod message;
mod signal;
mod time;

use patchwerk_core::{Builder, Object, Runtime};

pub use math::Operator;
pub use message::Recorder;

/// Category of node type for organization and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    /// Arithmetic on control messages
    Math,
    /// Message inspection and storage (print, recorder)
    Message,
    /// Name-addressed messaging without links (send, receive)
    Messaging,
    /// Scheduling (delay)
    Time,
    /// Audio-rate nodes handed to the signal engine
    Signal,
}

impl NodeCategory {
    /// Every category, in listing order.
    pub const ALL: [NodeCategory; 5] = [
        NodeCategory::Math,
        NodeCategory::Message,
        NodeCategory::Messaging,
        NodeCategory::Time,
        NodeCategory::Signal,
    ];

    /// Returns a human-readable name for the category.
    pub const fn name(&self) -> &'static str {
        match self {
            NodeCategory::Math => "Math",
            NodeCategory::Message => "Message",
            NodeCategory::Messaging => "Messaging",
            NodeCategory::Time => "Time",
            NodeCategory::Signal => "Signal",
        }
    }

    /// Returns a description of the category.
    pub const fn description(&self) -> &'static str {
        match self {
            NodeCategory::Math => "Arithmetic operators with hot and cold operands",
            NodeCategory::Message => "Printing and recording of control messages",
            NodeCategory::Messaging => "Sending and receiving by name, without links",
            NodeCategory::Time => "Delayed and scheduled output",
            NodeCategory::Signal => "Constant sources and processors of audio signals",
        }
    }
}

/// Describes a node type in the registry.
#[derive(Debug, Clone)]
pub struct NodeDescriptor {
    /// Name the type is created under (first word of the node text).
    pub id: &'static str,
    /// Alternative names resolving to the same type.
    pub aliases: &'static [&'static str],
    /// Usage line shown in listings, e.g. `delay ms`.
    pub usage: &'static str,
    /// Brief description of the node's behavior.
    pub description: &'static str,
    /// Category for organization.
    pub category: NodeCategory,
    /// Number of inlets.
    pub inlets: usize,
    /// Number of outlets.
    pub outlets: usize,
}

impl NodeDescriptor {
    /// Returns `true` if `name` is the id or one of the aliases.
    pub fn answers_to(&self, name: &str) -> bool {
        self.id == name || self.aliases.contains(&name)
    }
}

/// Factory function type for creating node objects.
type NodeFactory = fn(&mut Builder<'_>) -> Result<Box<dyn Object>, String>;

/// Internal entry in the registry.
struct RegistryEntry {
    descriptor: NodeDescriptor,
    factory: NodeFactory,
}

/// Registry of all built-in node types.
pub struct NodeRegistry {
    entries: Vec<RegistryEntry>,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeRegistry {
    /// Create a new registry with all built-in node types registered.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::with_capacity(11),
        };
        registry.register_builtin_nodes();
        registry
    }

    /// Register all built-in node types.
    fn register_builtin_nodes(&mut self) {
        // Math
        self.register(
            NodeDescriptor {
                id: "+",
                aliases: &[],
                usage: "+ [right]",
                description: "Adds the right operand to the left",
                category: NodeCategory::Math,
                inlets: 2,
                outlets: 1,
            },
            |b| math::create(b, Operator::Add),
        );
        self.register(
            NodeDescriptor {
                id: "-",
                aliases: &[],
                usage: "- [right]",
                description: "Subtracts the right operand from the left",
                category: NodeCategory::Math,
                inlets: 2,
                outlets: 1,
            },
            |b| math::create(b, Operator::Subtract),
        );
        self.register(
            NodeDescriptor {
                id: "*",
                aliases: &[],
                usage: "* [right]",
                description: "Multiplies the left operand by the right",
                category: NodeCategory::Math,
                inlets: 2,
                outlets: 1,
            },
            |b| math::create(b, Operator::Multiply),
        );
        self.register(
            NodeDescriptor {
                id: "/",
                aliases: &[],
                usage: "/ [right]",
                description: "Divides the left operand by the right, zero on division by zero",
                category: NodeCategory::Math,
                inlets: 2,
                outlets: 1,
            },
            |b| math::create(b, Operator::Divide),
        );

        // Message
        self.register(
            NodeDescriptor {
                id: "print",
                aliases: &[],
                usage: "print [prefix]",
                description: "Posts incoming messages to the console",
                category: NodeCategory::Message,
                inlets: 1,
                outlets: 0,
            },
            message::create_print,
        );
        self.register(
            NodeDescriptor {
                id: "recorder",
                aliases: &[],
                usage: "recorder [capacity]",
                description: "Keeps incoming messages and passes them through",
                category: NodeCategory::Message,
                inlets: 1,
                outlets: 1,
            },
            message::create_recorder,
        );

        // Messaging
        self.register(
            NodeDescriptor {
                id: "send",
                aliases: &["s"],
                usage: "send name",
                description: "Forwards messages to every receive of the same name",
                category: NodeCategory::Messaging,
                inlets: 1,
                outlets: 0,
            },
            beacon::create_send,
        );
        self.register(
            NodeDescriptor {
                id: "receive",
                aliases: &["r"],
                usage: "receive name",
                description: "Outputs messages sent to its name",
                category: NodeCategory::Messaging,
                inlets: 1,
                outlets: 1,
            },
            beacon::create_receive,
        );

        // Time
        self.register(
            NodeDescriptor {
                id: "delay",
                aliases: &[],
                usage: "delay ms",
                description: "Outputs the last message received after a delay",
                category: NodeCategory::Time,
                inlets: 2,
                outlets: 1,
            },
            time::create_delay,
        );

        // Signal
        self.register(
            NodeDescriptor {
                id: "sig~",
                aliases: &[],
                usage: "sig~ value",
                description: "Constant signal set by numbers",
                category: NodeCategory::Signal,
                inlets: 1,
                outlets: 1,
            },
            signal::create_sig,
        );
        self.register(
            NodeDescriptor {
                id: "*~",
                aliases: &[],
                usage: "*~ factor",
                description: "Multiplies a signal by a factor",
                category: NodeCategory::Signal,
                inlets: 2,
                outlets: 1,
            },
            signal::create_multiply,
        );
    }

    /// Register a node type with the registry.
    fn register(&mut self, descriptor: NodeDescriptor, factory: NodeFactory) {
        self.entries.push(RegistryEntry {
            descriptor,
            factory,
        });
    }

    /// Returns descriptors for all registered node types.
    pub fn all_nodes(&self) -> Vec<&NodeDescriptor> {
        self.entries.iter().map(|e| &e.descriptor).collect()
    }

    /// Returns descriptors for node types in a specific category.
    pub fn nodes_in_category(&self, category: NodeCategory) -> Vec<&NodeDescriptor> {
        self.entries
            .iter()
            .filter(|e| e.descriptor.category == category)
            .map(|e| &e.descriptor)
            .collect()
    }

    /// Get a descriptor by name or alias.
    pub fn get(&self, name: &str) -> Option<&NodeDescriptor> {
        self.entries
            .iter()
            .find(|e| e.descriptor.answers_to(name))
            .map(|e| &e.descriptor)
    }

    /// Registers every node type, aliases included, with `runtime`.
    pub fn install(&self, runtime: &Runtime) {
        let prototypes = runtime.prototypes();
        for entry in &self.entries {
            let descriptor = &entry.descriptor;
            for name in std::iter::once(descriptor.id).chain(descriptor.aliases.iter().copied()) {
                prototypes.add_prototype(runtime.tag(name), entry.factory);
            }
        }
        tracing::debug!("registry_install: {} node types", self.entries.len());
    }

    /// Returns the number of registered node types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no node types are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Registers every built-in node type with `runtime`.
pub fn install(runtime: &Runtime) {
    NodeRegistry::new().install(runtime);
}
