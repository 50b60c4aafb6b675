//! Dynamic values exchanged as message content.
//!
//! An [`Atom`] is a closed sum type over the values the patcher understands.
//! Scalars are copied, composites (dictionaries and lists) are shared through
//! `Arc` and freed when the last holder releases them.
//!
//! Accessors never fail: asking for the wrong variant yields `0`, `false`, an
//! empty slice or `None`. Integer and float accessors coerce in both directions.

use std::fmt;
use std::sync::Arc;

use crate::dico::Dico;
use crate::node::NodeId;
use crate::tag::{Tag, TagRegistry};

/// Discriminant of an [`Atom`], used for type queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomKind {
    /// No value.
    Null,
    /// `true` / `false`.
    Bool,
    /// 64-bit signed integer.
    Int,
    /// 64-bit float.
    Float,
    /// Interned string.
    Tag,
    /// Reference to a node by id.
    Node,
    /// Nested dictionary.
    Dico,
    /// Ordered list of atoms.
    List,
}

impl AtomKind {
    /// Returns a lowercase name for diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            AtomKind::Null => "null",
            AtomKind::Bool => "bool",
            AtomKind::Int => "int",
            AtomKind::Float => "float",
            AtomKind::Tag => "tag",
            AtomKind::Node => "node",
            AtomKind::Dico => "dico",
            AtomKind::List => "list",
        }
    }
}

/// A dynamically typed value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Atom {
    /// No value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Interned string.
    Tag(Tag),
    /// Non-owning reference to a node of a patcher.
    Node(NodeId),
    /// Shared dictionary.
    Dico(Arc<Dico>),
    /// Shared list.
    List(Arc<[Atom]>),
}

impl Atom {
    /// Returns the variant discriminant.
    pub fn kind(&self) -> AtomKind {
        match self {
            Atom::Null => AtomKind::Null,
            Atom::Bool(_) => AtomKind::Bool,
            Atom::Int(_) => AtomKind::Int,
            Atom::Float(_) => AtomKind::Float,
            Atom::Tag(_) => AtomKind::Tag,
            Atom::Node(_) => AtomKind::Node,
            Atom::Dico(_) => AtomKind::Dico,
            Atom::List(_) => AtomKind::List,
        }
    }

    /// Returns `true` for [`Atom::Null`].
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Atom::Null)
    }

    /// Returns `true` for integers and floats.
    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, Atom::Int(_) | Atom::Float(_))
    }

    /// Boolean view. Numbers are `true` when non-zero, everything else `false`.
    pub fn as_bool(&self) -> bool {
        match self {
            Atom::Bool(b) => *b,
            Atom::Int(i) => *i != 0,
            Atom::Float(f) => *f != 0.0,
            _ => false,
        }
    }

    /// Integer view. Floats are truncated, booleans map to `0`/`1`.
    pub fn as_int(&self) -> i64 {
        match self {
            Atom::Int(i) => *i,
            Atom::Float(f) => *f as i64,
            Atom::Bool(b) => i64::from(*b),
            _ => 0,
        }
    }

    /// Float view. Integers are widened, booleans map to `0.0`/`1.0`.
    pub fn as_float(&self) -> f64 {
        match self {
            Atom::Float(f) => *f,
            Atom::Int(i) => *i as f64,
            Atom::Bool(b) => f64::from(u8::from(*b)),
            _ => 0.0,
        }
    }

    /// Tag view, `None` unless the atom is a tag.
    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            Atom::Tag(t) => Some(t),
            _ => None,
        }
    }

    /// Node reference view, `None` unless the atom is a node reference.
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Atom::Node(id) => Some(*id),
            _ => None,
        }
    }

    /// Dictionary view, `None` unless the atom is a dictionary.
    pub fn as_dico(&self) -> Option<&Arc<Dico>> {
        match self {
            Atom::Dico(d) => Some(d),
            _ => None,
        }
    }

    /// List view, empty unless the atom is a list.
    pub fn as_list(&self) -> &[Atom] {
        match self {
            Atom::List(items) => items,
            _ => &[],
        }
    }

    /// Returns `true` if the atom is the tag `text`.
    pub fn is_tag(&self, text: &str) -> bool {
        self.as_tag().is_some_and(|t| t.as_str() == text)
    }

    /// Builds a list atom.
    pub fn list(items: impl Into<Vec<Atom>>) -> Self {
        Atom::List(Arc::from(items.into()))
    }
}

impl From<bool> for Atom {
    fn from(value: bool) -> Self {
        Atom::Bool(value)
    }
}

impl From<i32> for Atom {
    fn from(value: i32) -> Self {
        Atom::Int(i64::from(value))
    }
}

impl From<i64> for Atom {
    fn from(value: i64) -> Self {
        Atom::Int(value)
    }
}

impl From<usize> for Atom {
    fn from(value: usize) -> Self {
        Atom::Int(value as i64)
    }
}

impl From<f32> for Atom {
    fn from(value: f32) -> Self {
        Atom::Float(f64::from(value))
    }
}

impl From<f64> for Atom {
    fn from(value: f64) -> Self {
        Atom::Float(value)
    }
}

impl From<Tag> for Atom {
    fn from(value: Tag) -> Self {
        Atom::Tag(value)
    }
}

impl From<&Tag> for Atom {
    fn from(value: &Tag) -> Self {
        Atom::Tag(value.clone())
    }
}

impl From<NodeId> for Atom {
    fn from(value: NodeId) -> Self {
        Atom::Node(value)
    }
}

impl From<Dico> for Atom {
    fn from(value: Dico) -> Self {
        Atom::Dico(Arc::new(value))
    }
}

impl From<Arc<Dico>> for Atom {
    fn from(value: Arc<Dico>) -> Self {
        Atom::Dico(value)
    }
}

impl From<Vec<Atom>> for Atom {
    fn from(value: Vec<Atom>) -> Self {
        Atom::list(value)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Null => f.write_str("null"),
            Atom::Bool(b) => write!(f, "{b}"),
            Atom::Int(i) => write!(f, "{i}"),
            Atom::Float(x) => write!(f, "{x}"),
            Atom::Tag(t) => f.write_str(t.as_str()),
            Atom::Node(id) => write!(f, "#{}", id.index()),
            Atom::Dico(d) => write!(f, "{}", d.to_text()),
            Atom::List(items) => {
                f.write_str("[")?;
                write_message(f, items)?;
                f.write_str("]")
            }
        }
    }
}

fn write_message(f: &mut fmt::Formatter<'_>, atoms: &[Atom]) -> fmt::Result {
    for (i, atom) in atoms.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{atom}")?;
    }
    Ok(())
}

/// Display adapter for a whole message (`1 2.5 foo`).
pub struct MessageDisplay<'a>(pub &'a [Atom]);

impl fmt::Display for MessageDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_message(f, self.0)
    }
}

/// Parses a single word into an atom: integer, then float, else tag.
pub fn parse_word(tags: &TagRegistry, word: &str) -> Atom {
    if let Ok(i) = word.parse::<i64>() {
        Atom::Int(i)
    } else if let Ok(x) = word.parse::<f64>()
        && word.bytes().any(|b| b.is_ascii_digit())
    {
        Atom::Float(x)
    } else {
        Atom::Tag(tags.intern(word))
    }
}

/// Splits a textual invocation on whitespace and parses every word.
///
/// ```rust
/// use patchwerk_core::{Atom, TagRegistry, parse_words};
///
/// let tags = TagRegistry::new();
/// let atoms = parse_words(&tags, "+ 5 2.5");
/// assert_eq!(atoms[1], Atom::Int(5));
/// assert_eq!(atoms[2], Atom::Float(2.5));
/// assert!(atoms[0].is_tag("+"));
/// ```
pub fn parse_words(tags: &TagRegistry, text: &str) -> Vec<Atom> {
    text.split_whitespace()
        .map(|word| parse_word(tags, word))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        let tags = TagRegistry::new();
        assert_eq!(Atom::Null.kind(), AtomKind::Null);
        assert_eq!(Atom::from(true).kind(), AtomKind::Bool);
        assert_eq!(Atom::from(3).kind(), AtomKind::Int);
        assert_eq!(Atom::from(3.0).kind(), AtomKind::Float);
        assert_eq!(Atom::from(tags.intern("x")).kind(), AtomKind::Tag);
        assert_eq!(Atom::from(Dico::new()).kind(), AtomKind::Dico);
        assert_eq!(Atom::list(vec![Atom::Int(1)]).kind(), AtomKind::List);
    }

    #[test]
    fn numeric_coercion() {
        assert_eq!(Atom::Float(3.9).as_int(), 3);
        assert_eq!(Atom::Float(-3.9).as_int(), -3);
        assert_eq!(Atom::Int(7).as_float(), 7.0);
        assert_eq!(Atom::Bool(true).as_int(), 1);
        assert!(Atom::Int(2).as_bool());
        assert!(!Atom::Float(0.0).as_bool());
    }

    #[test]
    fn wrong_variant_defaults() {
        let tags = TagRegistry::new();
        let tag = Atom::from(tags.intern("foo"));
        assert_eq!(tag.as_int(), 0);
        assert_eq!(tag.as_float(), 0.0);
        assert!(!tag.as_bool());
        assert!(tag.as_dico().is_none());
        assert!(tag.as_list().is_empty());
        assert!(tag.as_node().is_none());
        assert!(Atom::Int(1).as_tag().is_none());
        assert!(Atom::Null.as_list().is_empty());
    }

    #[test]
    fn composites_are_shared() {
        let list = Atom::list(vec![Atom::Int(1), Atom::Int(2)]);
        let copy = list.clone();
        if let (Atom::List(a), Atom::List(b)) = (&list, &copy) {
            assert!(Arc::ptr_eq(a, b));
        } else {
            panic!("expected lists");
        }
    }

    #[test]
    fn parse_words_mixed() {
        let tags = TagRegistry::new();
        let atoms = parse_words(&tags, "  delay 250  -3 1e3 inf ");
        assert!(atoms[0].is_tag("delay"));
        assert_eq!(atoms[1], Atom::Int(250));
        assert_eq!(atoms[2], Atom::Int(-3));
        assert_eq!(atoms[3], Atom::Float(1000.0));
        assert!(atoms[4].is_tag("inf"));
    }

    #[test]
    fn display_message() {
        let tags = TagRegistry::new();
        let msg = vec![
            Atom::from(tags.intern("set")),
            Atom::Int(1),
            Atom::Float(2.5),
            Atom::list(vec![Atom::Int(3), Atom::Int(4)]),
        ];
        assert_eq!(MessageDisplay(&msg).to_string(), "set 1 2.5 [3 4]");
    }
}
