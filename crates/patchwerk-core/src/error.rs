//! Error types for graph, attribute and dictionary operations.
//!
//! Every rejected graph operation is also reported to the runtime's
//! [`Console`](crate::Console); the `Result` lets callers react programmatically.

use thiserror::Error;

use crate::atom::AtomKind;
use crate::link::LinkId;
use crate::node::NodeId;

/// Errors raised by [`Patcher`](crate::Patcher) and node operations.
#[derive(Debug, Error)]
pub enum PatchError {
    /// Creation names a node type that no constructor is registered for.
    #[error("unknown node type \"{0}\"")]
    UnknownNodeType(String),

    /// A dictionary lacks keys or holds values required for creation or linking.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// Kinds do not intersect, endpoints are invalid or the link already exists.
    #[error("cannot connect {from}:{outlet} to {to}:{inlet}: {reason}")]
    IncompatibleConnection {
        /// Source node.
        from: NodeId,
        /// Source outlet index.
        outlet: usize,
        /// Destination node.
        to: NodeId,
        /// Destination inlet index.
        inlet: usize,
        /// Why the connection was refused.
        reason: String,
    },

    /// The receiver rejected the message and no attribute fallback matched.
    #[error("{node} doesn't understand \"{message}\"")]
    UnhandledMessage {
        /// Name of the receiving node.
        node: String,
        /// Rendered message.
        message: String,
    },

    /// The per-node reentrancy guard tripped.
    #[error("stack overflow in {node}")]
    ReentrancyOverflow {
        /// Name of the node whose guard tripped.
        node: String,
    },

    /// The signal engine rejected the graph.
    #[error("dsp compile failed at {node}: {reason}")]
    CompileFailure {
        /// Offending node, rendered as `name (id)`.
        node: String,
        /// Engine-provided reason.
        reason: String,
    },

    /// The node does not belong to this patcher.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    /// The link does not belong to this patcher.
    #[error("link {0} not found")]
    LinkNotFound(LinkId),

    /// An attribute set was refused.
    #[error(transparent)]
    Attribute(#[from] AttributeError),
}

/// Errors raised by attribute sets.
#[derive(Debug, Error, PartialEq)]
pub enum AttributeError {
    /// No attribute of that name exists on the node.
    #[error("no attribute named \"{0}\"")]
    Unknown(String),

    /// Too many or too few values.
    #[error("attribute \"{name}\" takes 1 to {expected} values, got {got}")]
    Arity {
        /// Attribute name.
        name: String,
        /// Maximum number of values.
        expected: usize,
        /// Number of values received.
        got: usize,
    },

    /// A value does not match the declared type of its position.
    #[error("attribute \"{name}\" expects {expected} at position {position}, got {got}")]
    TypeMismatch {
        /// Attribute name.
        name: String,
        /// Zero-based value position.
        position: usize,
        /// Declared type name.
        expected: &'static str,
        /// Kind received.
        got: AtomKind,
    },

    /// A custom setter refused the values.
    #[error("attribute \"{0}\" rejected the value")]
    Rejected(String),
}

/// Errors raised while decoding a dictionary's text form.
#[derive(Debug, Error)]
pub enum DicoError {
    /// The text is not well-formed.
    #[error("syntax error at line {line}, column {column}: {source}")]
    Syntax {
        /// One-based line of the failure.
        line: usize,
        /// One-based column of the failure.
        column: usize,
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },

    /// The text is well-formed but is not a dictionary.
    #[error("expected a dictionary at the top level, found {found}")]
    NotAnObject {
        /// Kind of the top-level value.
        found: &'static str,
    },
}

impl DicoError {
    pub(crate) fn syntax(source: serde_json::Error) -> Self {
        DicoError::Syntax {
            line: source.line(),
            column: source.column(),
            source,
        }
    }
}

impl std::fmt::Display for AtomKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_node_type_display() {
        let err = PatchError::UnknownNodeType("zorg".to_string());
        assert_eq!(err.to_string(), "unknown node type \"zorg\"");
    }

    #[test]
    fn incompatible_connection_display() {
        let err = PatchError::IncompatibleConnection {
            from: NodeId::new(1),
            outlet: 0,
            to: NodeId::new(2),
            inlet: 1,
            reason: "link already exists".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "cannot connect 1:0 to 2:1: link already exists"
        );
    }

    #[test]
    fn attribute_error_converts() {
        let err: PatchError = AttributeError::Unknown("color".to_string()).into();
        assert_eq!(err.to_string(), "no attribute named \"color\"");
    }

    #[test]
    fn type_mismatch_display() {
        let err = AttributeError::TypeMismatch {
            name: "size".to_string(),
            position: 1,
            expected: "int",
            got: AtomKind::Tag,
        };
        assert_eq!(
            err.to_string(),
            "attribute \"size\" expects int at position 1, got tag"
        );
    }

    #[test]
    fn syntax_error_has_source() {
        use std::error::Error;
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = DicoError::syntax(source);
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("syntax error at line 1"));
    }
}
