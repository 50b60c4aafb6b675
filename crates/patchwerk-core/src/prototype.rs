//! The node-type table.
//!
//! Node types are registered by name with a constructor. When a patcher
//! creates a node, the constructor receives a [`Builder`] carrying the
//! creation arguments and the node dictionary; it declares the node's ports
//! and attributes on the builder and returns the [`Object`] implementing the
//! node's behavior.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::atom::Atom;
use crate::attribute::{Attribute, AttributeSet};
use crate::dico::Dico;
use crate::error::PatchError;
use crate::node::{Object, Parts};
use crate::port::{InletKind, OutletKind};
use crate::runtime::Runtime;
use crate::tag::Tag;

/// Builds the [`Object`] of a node type. An `Err` carries the reason the
/// arguments were refused.
pub type Constructor =
    Arc<dyn Fn(&mut Builder<'_>) -> Result<Box<dyn Object>, String> + Send + Sync>;

/// Creation arguments and port/attribute declarations of a node under
/// construction.
pub struct Builder<'a> {
    runtime: &'a Runtime,
    name: Tag,
    args: &'a [Atom],
    dico: &'a Dico,
    inlets: Vec<InletKind>,
    outlets: Vec<OutletKind>,
    attributes: AttributeSet,
}

impl<'a> Builder<'a> {
    pub(crate) fn new(runtime: &'a Runtime, name: Tag, args: &'a [Atom], dico: &'a Dico) -> Self {
        Self {
            runtime,
            name,
            args,
            dico,
            inlets: Vec::new(),
            outlets: Vec::new(),
            attributes: AttributeSet::new(),
        }
    }

    /// Runtime the node is created in.
    pub fn runtime(&self) -> &Runtime {
        self.runtime
    }

    /// Interns `text`.
    pub fn tag(&self, text: &str) -> Tag {
        self.runtime.tag(text)
    }

    /// Name the node is created under.
    pub fn name(&self) -> &Tag {
        &self.name
    }

    /// Arguments following the name in the node's text.
    pub fn args(&self) -> &[Atom] {
        self.args
    }

    /// Argument `index`, or [`Atom::Null`].
    pub fn arg(&self, index: usize) -> Atom {
        self.args.get(index).cloned().unwrap_or_default()
    }

    /// The node dictionary the node is created from.
    pub fn dico(&self) -> &Dico {
        self.dico
    }

    /// Declares the next inlet.
    pub fn inlet(&mut self, kind: InletKind) -> &mut Self {
        self.inlets.push(kind);
        self
    }

    /// Declares the next outlet.
    pub fn outlet(&mut self, kind: OutletKind) -> &mut Self {
        self.outlets.push(kind);
        self
    }

    /// Declares an attribute.
    pub fn attribute(&mut self, attribute: Attribute) -> &mut Self {
        self.attributes.insert(attribute);
        self
    }

    /// Sets a declared attribute to an initial value, for arguments that
    /// double as attribute values.
    pub fn init_attribute(&mut self, name: &str, values: &[Atom]) -> Result<(), String> {
        let name = self.tag(name);
        self.attributes.set(&name, values).map_err(|e| e.to_string())
    }

    fn finish(self, object: Box<dyn Object>) -> Parts {
        Parts {
            inlets: self.inlets,
            outlets: self.outlets,
            attributes: self.attributes,
            object,
        }
    }
}

/// Table of registered node types.
#[derive(Default)]
pub struct Prototypes {
    constructors: RwLock<HashMap<Tag, Constructor>>,
}

impl Prototypes {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `constructor` under `name`, replacing any previous one.
    pub fn add_prototype<F>(&self, name: Tag, constructor: F)
    where
        F: Fn(&mut Builder<'_>) -> Result<Box<dyn Object>, String> + Send + Sync + 'static,
    {
        tracing::debug!("prototype_add: {name}");
        self.constructors.write().insert(name, Arc::new(constructor));
    }

    /// Returns `true` if a constructor is registered under `name`.
    pub fn has(&self, name: &Tag) -> bool {
        self.constructors.read().contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<Tag> {
        let mut names: Vec<Tag> = self.constructors.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered node types.
    pub fn len(&self) -> usize {
        self.constructors.read().len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.constructors.read().is_empty()
    }

    /// Runs the constructor registered under `name`.
    pub(crate) fn create(
        &self,
        runtime: &Runtime,
        name: &Tag,
        args: &[Atom],
        dico: &Dico,
    ) -> Result<Parts, PatchError> {
        let constructor = self
            .constructors
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| PatchError::UnknownNodeType(name.to_string()))?;
        let mut builder = Builder::new(runtime, name.clone(), args, dico);
        let object = constructor(&mut builder)
            .map_err(|reason| PatchError::MalformedDocument(format!("{name}: {reason}")))?;
        Ok(builder.finish(object))
    }
}

impl fmt::Debug for Prototypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prototypes")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Context;

    struct Nothing;

    impl Object for Nothing {
        fn receive(&mut self, _ctx: &mut Context<'_>, _inlet: usize, _message: &[Atom]) -> bool {
            false
        }
    }

    #[test]
    fn create_collects_declarations() {
        let runtime = Runtime::new();
        let prototypes = runtime.prototypes();
        prototypes.add_prototype(runtime.tag("thing"), |b| {
            let size = b.arg(0).as_int();
            b.inlet(InletKind::Hot)
                .inlet(InletKind::Cold)
                .outlet(OutletKind::Data);
            let name = b.tag("size");
            b.attribute(Attribute::int(name, size));
            Ok(Box::new(Nothing))
        });
        assert!(prototypes.has(&runtime.tag("thing")));
        let parts = prototypes
            .create(&runtime, &runtime.tag("thing"), &[Atom::Int(7)], &Dico::new())
            .unwrap();
        assert_eq!(parts.inlets, [InletKind::Hot, InletKind::Cold]);
        assert_eq!(parts.outlets, [OutletKind::Data]);
        assert_eq!(parts.attributes.values(&runtime.tag("size")), [Atom::Int(7)]);
    }

    #[test]
    fn unknown_and_refused() {
        let runtime = Runtime::new();
        let prototypes = runtime.prototypes();
        prototypes.add_prototype(runtime.tag("picky"), |_| Err("needs an argument".to_string()));
        let unknown = prototypes.create(&runtime, &runtime.tag("nope"), &[], &Dico::new());
        assert!(matches!(unknown, Err(PatchError::UnknownNodeType(n)) if n == "nope"));
        let refused = prototypes.create(&runtime, &runtime.tag("picky"), &[], &Dico::new());
        assert!(matches!(refused, Err(PatchError::MalformedDocument(_))));
    }

    #[test]
    fn names_are_sorted() {
        let runtime = Runtime::new();
        for name in ["b", "a", "c"] {
            runtime
                .prototypes()
                .add_prototype(runtime.tag(name), |_| Ok(Box::new(Nothing)));
        }
        let names: Vec<String> = runtime
            .prototypes()
            .names()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
    }
}
