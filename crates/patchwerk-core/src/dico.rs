//! Ordered tag-keyed dictionaries and their text form.
//!
//! A [`Dico`] maps [`Tag`] keys to non-empty lists of [`Atom`]s, preserving
//! insertion order. It is the document type used for messages, construction
//! arguments and patch persistence.
//!
//! # Text form
//!
//! The text form is JSON: objects become dictionaries, strings become tags and
//! a key holding exactly one value is written as a bare value instead of a
//! one-element array, unless that value is itself a list. Reading turns a
//! bare value back into a one-element list, so `from_text(to_text(d)) == d`
//! for every dictionary built from non-reference atoms.
//!
//! ```text
//! { "name": "+", "id": 3, "position": [40.0, 120.0] }
//! ```

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};

use crate::atom::{Atom, AtomKind};
use crate::error::DicoError;
use crate::tag::{Tag, TagRegistry};

/// Ordered map from tags to lists of atoms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dico {
    entries: IndexMap<Tag, Vec<Atom>>,
}

impl Dico {
    /// Creates an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the values stored under `key`, empty if absent.
    pub fn get(&self, key: &Tag) -> &[Atom] {
        self.entries.get(key).map_or(&[], Vec::as_slice)
    }

    /// Returns the first value stored under `key`, or [`Atom::Null`].
    pub fn get_first(&self, key: &Tag) -> Atom {
        self.get(key).first().cloned().unwrap_or_default()
    }

    /// Replaces the values under `key`.
    ///
    /// Assigning an empty list is a no-op, not a deletion; use
    /// [`remove`](Self::remove) to delete a key.
    pub fn set(&mut self, key: Tag, values: impl Into<Vec<Atom>>) {
        let values = values.into();
        if values.is_empty() {
            return;
        }
        self.entries.insert(key, values);
    }

    /// Replaces the values under `key` with a single value.
    pub fn set_one(&mut self, key: Tag, value: impl Into<Atom>) {
        self.entries.insert(key, vec![value.into()]);
    }

    /// Appends one value to the list under `key`, creating it if needed.
    pub fn append(&mut self, key: Tag, value: impl Into<Atom>) {
        self.entries.entry(key).or_default().push(value.into());
    }

    /// Appends several values to the list under `key`.
    ///
    /// An empty `values` leaves the dictionary untouched.
    pub fn append_all(&mut self, key: Tag, values: impl IntoIterator<Item = Atom>) {
        let mut values = values.into_iter().peekable();
        if values.peek().is_none() {
            return;
        }
        self.entries.entry(key).or_default().extend(values);
    }

    /// Returns `true` if `key` is present.
    pub fn has(&self, key: &Tag) -> bool {
        self.entries.contains_key(key)
    }

    /// Kind of the value under `key`.
    ///
    /// [`AtomKind::Null`] when absent, [`AtomKind::List`] when the key holds
    /// more than one value, otherwise the kind of the single value.
    pub fn kind(&self, key: &Tag) -> AtomKind {
        match self.get(key) {
            [] => AtomKind::Null,
            [single] => single.kind(),
            _ => AtomKind::List,
        }
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &Tag> {
        self.entries.keys()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Tag, &[Atom])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the dictionary has no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every key.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Removes `key`, returning its values.
    pub fn remove(&mut self, key: &Tag) -> Option<Vec<Atom>> {
        self.entries.shift_remove(key)
    }

    /// Renders the dictionary in its pretty-printed text form.
    pub fn to_text(&self) -> String {
        format!("{:#}", self.to_json())
    }

    /// Renders the dictionary on a single line.
    pub fn to_compact_text(&self) -> String {
        self.to_json().to_string()
    }

    /// Parses the text form, interning keys and strings in `tags`.
    ///
    /// Malformed input is rejected with the line and column of the failure.
    pub fn from_text(tags: &TagRegistry, text: &str) -> Result<Self, DicoError> {
        let value: Value = serde_json::from_str(text).map_err(DicoError::syntax)?;
        match value {
            Value::Object(map) => Ok(Self::from_map(tags, map)),
            other => Err(DicoError::NotAnObject {
                found: json_kind(&other),
            }),
        }
    }

    fn to_json(&self) -> Value {
        let mut map = Map::with_capacity(self.entries.len());
        for (key, values) in &self.entries {
            // A lone list stays wrapped so it reads back as one atom.
            let value = match values.as_slice() {
                [single] if !matches!(single, Atom::List(_)) => atom_to_json(single),
                many => Value::Array(many.iter().map(atom_to_json).collect()),
            };
            map.insert(key.as_str().to_owned(), value);
        }
        Value::Object(map)
    }

    fn from_map(tags: &TagRegistry, map: Map<String, Value>) -> Self {
        let mut dico = Dico::new();
        for (key, value) in map {
            let values = match value {
                Value::Array(items) => items.into_iter().map(|v| json_to_atom(tags, v)).collect(),
                other => vec![json_to_atom(tags, other)],
            };
            dico.set(tags.intern(&key), values);
        }
        dico
    }
}

impl FromIterator<(Tag, Vec<Atom>)> for Dico {
    fn from_iter<I: IntoIterator<Item = (Tag, Vec<Atom>)>>(iter: I) -> Self {
        let mut dico = Dico::new();
        for (key, values) in iter {
            dico.set(key, values);
        }
        dico
    }
}

fn atom_to_json(atom: &Atom) -> Value {
    match atom {
        // Node references are meaningless outside their patcher.
        Atom::Null | Atom::Node(_) => Value::Null,
        Atom::Bool(b) => Value::Bool(*b),
        Atom::Int(i) => Value::Number(Number::from(*i)),
        Atom::Float(x) => Number::from_f64(*x).map_or(Value::Null, Value::Number),
        Atom::Tag(t) => Value::String(t.as_str().to_owned()),
        Atom::Dico(d) => d.to_json(),
        Atom::List(items) => Value::Array(items.iter().map(atom_to_json).collect()),
    }
}

fn json_to_atom(tags: &TagRegistry, value: Value) -> Atom {
    match value {
        Value::Null => Atom::Null,
        Value::Bool(b) => Atom::Bool(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Atom::Int(i),
            None => Atom::Float(n.as_f64().unwrap_or(0.0)),
        },
        Value::String(s) => Atom::Tag(tags.intern(&s)),
        Value::Array(items) => Atom::list(
            items
                .into_iter()
                .map(|v| json_to_atom(tags, v))
                .collect::<Vec<_>>(),
        ),
        Value::Object(map) => Atom::Dico(Arc::new(Dico::from_map(tags, map))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(tags: &TagRegistry) -> Dico {
        let mut inner = Dico::new();
        inner.set_one(tags.intern("depth"), 2);
        let mut d = Dico::new();
        d.set_one(tags.intern("name"), tags.intern("+"));
        d.set_one(tags.intern("gain"), 0.5);
        d.set(tags.intern("position"), vec![Atom::Float(10.0), Atom::Float(20.0)]);
        d.set_one(tags.intern("enabled"), true);
        d.set_one(tags.intern("inner"), inner);
        d.set_one(tags.intern("quote"), tags.intern("say \"hi\"\n"));
        d
    }

    #[test]
    fn empty_set_is_noop() {
        let tags = TagRegistry::new();
        let key = tags.intern("k");
        let mut d = Dico::new();
        d.set_one(key.clone(), 1);
        d.set(key.clone(), Vec::<Atom>::new());
        assert_eq!(d.get(&key), &[Atom::Int(1)]);
        let other = tags.intern("other");
        d.set(other.clone(), Vec::<Atom>::new());
        assert!(!d.has(&other));
    }

    #[test]
    fn get_missing_is_empty() {
        let tags = TagRegistry::new();
        let d = Dico::new();
        assert!(d.get(&tags.intern("missing")).is_empty());
        assert_eq!(d.get_first(&tags.intern("missing")), Atom::Null);
        assert_eq!(d.kind(&tags.intern("missing")), AtomKind::Null);
    }

    #[test]
    fn append_and_kind() {
        let tags = TagRegistry::new();
        let key = tags.intern("xs");
        let mut d = Dico::new();
        d.append(key.clone(), 1);
        assert_eq!(d.kind(&key), AtomKind::Int);
        d.append(key.clone(), 2.0);
        assert_eq!(d.kind(&key), AtomKind::List);
        assert_eq!(d.get(&key).len(), 2);
        d.append_all(key.clone(), Vec::new());
        assert_eq!(d.get(&key).len(), 2);
    }

    #[test]
    fn keys_keep_insertion_order() {
        let tags = TagRegistry::new();
        let mut d = Dico::new();
        for name in ["z", "a", "m"] {
            d.set_one(tags.intern(name), 0);
        }
        let keys: Vec<&str> = d.keys().map(Tag::as_str).collect();
        assert_eq!(keys, ["z", "a", "m"]);
        d.remove(&tags.intern("a"));
        let keys: Vec<&str> = d.keys().map(Tag::as_str).collect();
        assert_eq!(keys, ["z", "m"]);
        d.clear();
        assert!(d.is_empty());
    }

    #[test]
    fn text_round_trip() {
        let tags = TagRegistry::new();
        let d = sample(&tags);
        let text = d.to_text();
        let back = Dico::from_text(&tags, &text).unwrap();
        assert_eq!(back, d);
        let compact = Dico::from_text(&tags, &d.to_compact_text()).unwrap();
        assert_eq!(compact, d);
    }

    #[test]
    fn single_element_collapses() {
        let tags = TagRegistry::new();
        let mut d = Dico::new();
        d.set_one(tags.intern("id"), 4);
        assert_eq!(d.to_compact_text(), r#"{"id":4}"#);
    }

    #[test]
    fn lone_lists_survive_the_text_form() {
        let tags = TagRegistry::new();
        let mut d = Dico::new();
        d.set_one(tags.intern("empty"), Atom::list(Vec::new()));
        d.set_one(tags.intern("pair"), Atom::list(vec![Atom::Int(1), Atom::Int(2)]));
        assert_eq!(d.to_compact_text(), r#"{"empty":[[]],"pair":[[1,2]]}"#);
        assert_eq!(Dico::from_text(&tags, &d.to_text()).unwrap(), d);
    }

    #[test]
    fn floats_stay_floats() {
        let tags = TagRegistry::new();
        let mut d = Dico::new();
        d.set_one(tags.intern("x"), 1.0);
        let back = Dico::from_text(&tags, &d.to_text()).unwrap();
        assert_eq!(back.get(&tags.intern("x")), &[Atom::Float(1.0)]);
    }

    #[test]
    fn nested_arrays_become_lists() {
        let tags = TagRegistry::new();
        let d = Dico::from_text(&tags, r#"{"m": [[1, 2], "a"]}"#).unwrap();
        let values = d.get(&tags.intern("m"));
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].as_list(), &[Atom::Int(1), Atom::Int(2)]);
        assert!(values[1].is_tag("a"));
    }

    #[test]
    fn malformed_input_reports_position() {
        let tags = TagRegistry::new();
        let err = Dico::from_text(&tags, "{\n  \"a\": 1,\n  \"b\": }").unwrap_err();
        match err {
            DicoError::Syntax { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(Dico::from_text(&tags, "{\"a\": [1, 2").is_err());
        assert!(Dico::from_text(&tags, "").is_err());
    }

    #[test]
    fn top_level_must_be_object() {
        let tags = TagRegistry::new();
        let err = Dico::from_text(&tags, "[1, 2]").unwrap_err();
        assert!(matches!(err, DicoError::NotAnObject { found: "array" }));
    }

    #[test]
    fn node_refs_are_written_as_null() {
        let tags = TagRegistry::new();
        let mut d = Dico::new();
        d.set_one(tags.intern("target"), crate::node::NodeId::new(3));
        assert_eq!(d.to_compact_text(), r#"{"target":null}"#);
    }
}
