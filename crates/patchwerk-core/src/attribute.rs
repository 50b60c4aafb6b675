//! Per-node dynamic properties.
//!
//! An [`Attribute`] is a named, typed slot owned by a node. Each value position
//! has a declared [`AttrType`]; incoming values are coerced/checked per position,
//! passed through an optional custom setter, clipped against the optional
//! bounds, then stored. Reads never fail: a slot that was never set holds its
//! default.
//!
//! Attributes are declared by node constructors through
//! [`Builder::attribute`](crate::Builder::attribute) and can be set from
//! messages of the form `@name value...`.
//!
//! # Example
//!
//! ```rust
//! use patchwerk_core::{Atom, Attribute, AttrType, TagRegistry};
//!
//! let tags = TagRegistry::new();
//! let mut size = Attribute::new(tags.intern("size"), vec![AttrType::Int], vec![Atom::Int(4)])
//!     .with_range(0.0, 10.0);
//!
//! size.set(&[Atom::Int(15)]).unwrap();
//! assert_eq!(size.get(0), Atom::Int(10));
//! ```

use std::fmt;
use std::sync::Arc;

use crate::atom::Atom;
use crate::error::AttributeError;
use crate::tag::Tag;

/// Declared type of one attribute value position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    /// Accepts booleans and numbers (non-zero is `true`).
    Bool,
    /// Accepts numbers, floats are truncated.
    Int,
    /// Accepts numbers, integers are widened.
    Float,
    /// Accepts tags only.
    Tag,
    /// Accepts any atom unchanged.
    Any,
}

impl AttrType {
    /// Returns a lowercase name for diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            AttrType::Bool => "bool",
            AttrType::Int => "int",
            AttrType::Float => "float",
            AttrType::Tag => "tag",
            AttrType::Any => "any",
        }
    }

    /// Coerces `value` to this type, `None` if it cannot be represented.
    pub fn coerce(self, value: &Atom) -> Option<Atom> {
        match (self, value) {
            (AttrType::Any, v) => Some(v.clone()),
            (AttrType::Bool, Atom::Bool(_) | Atom::Int(_) | Atom::Float(_)) => {
                Some(Atom::Bool(value.as_bool()))
            }
            (AttrType::Int, Atom::Int(_) | Atom::Float(_)) => Some(Atom::Int(value.as_int())),
            (AttrType::Float, Atom::Int(_) | Atom::Float(_)) => {
                Some(Atom::Float(value.as_float()))
            }
            (AttrType::Tag, Atom::Tag(_)) => Some(value.clone()),
            _ => None,
        }
    }
}

/// Attribute capability flags.
///
/// Use [`union`](Self::union) to combine.
///
/// ```rust
/// use patchwerk_core::AttrFlags;
///
/// let flags = AttrFlags::VISIBLE.union(AttrFlags::PERSIST);
/// assert!(flags.contains(AttrFlags::PERSIST));
/// assert!(!flags.contains(AttrFlags::OPAQUE));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrFlags(u8);

impl AttrFlags {
    /// No flags set.
    pub const NONE: Self = Self(0);
    /// Shown in inspectors.
    pub const VISIBLE: Self = Self(1 << 0);
    /// Read-only from messages: `@name` sets are refused.
    pub const OPAQUE: Self = Self(1 << 1);
    /// Written into and restored from the node dictionary.
    pub const PERSIST: Self = Self(1 << 2);

    /// Returns `true` if all bits in `other` are set in `self`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the union of two flag sets.
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns `self` without the bits of `other`.
    #[inline]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl Default for AttrFlags {
    fn default() -> Self {
        Self::VISIBLE.union(Self::PERSIST)
    }
}

/// Custom setter: maps checked values to the values to store, `None` rejects.
pub type AttrSetter = Arc<dyn Fn(&[Atom]) -> Option<Vec<Atom>> + Send + Sync>;

/// Custom getter: maps stored values to the values reported.
pub type AttrGetter = Arc<dyn Fn(&[Atom]) -> Vec<Atom> + Send + Sync>;

/// A named, typed, clipped property slot.
#[derive(Clone)]
pub struct Attribute {
    name: Tag,
    label: Option<Tag>,
    style: Option<Tag>,
    category: Option<Tag>,
    types: Vec<AttrType>,
    defaults: Vec<Atom>,
    values: Vec<Atom>,
    flags: AttrFlags,
    min: Option<f64>,
    max: Option<f64>,
    setter: Option<AttrSetter>,
    getter: Option<AttrGetter>,
}

impl Attribute {
    /// Creates an attribute with one declared type per value position.
    ///
    /// `defaults` is padded with [`Atom::Null`] (or truncated) to the number of
    /// positions.
    pub fn new(name: Tag, types: Vec<AttrType>, mut defaults: Vec<Atom>) -> Self {
        defaults.resize(types.len(), Atom::Null);
        Self {
            name,
            label: None,
            style: None,
            category: None,
            values: defaults.clone(),
            types,
            defaults,
            flags: AttrFlags::default(),
            min: None,
            max: None,
            setter: None,
            getter: None,
        }
    }

    /// Single integer attribute.
    pub fn int(name: Tag, default: i64) -> Self {
        Self::new(name, vec![AttrType::Int], vec![Atom::Int(default)])
    }

    /// Single float attribute.
    pub fn float(name: Tag, default: f64) -> Self {
        Self::new(name, vec![AttrType::Float], vec![Atom::Float(default)])
    }

    /// Single boolean attribute.
    pub fn boolean(name: Tag, default: bool) -> Self {
        Self::new(name, vec![AttrType::Bool], vec![Atom::Bool(default)])
    }

    /// Single tag attribute.
    pub fn tag(name: Tag, default: Tag) -> Self {
        Self::new(name, vec![AttrType::Tag], vec![Atom::Tag(default)])
    }

    /// Sets the lower bound.
    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Sets the upper bound.
    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Sets both bounds.
    pub fn with_range(self, min: f64, max: f64) -> Self {
        self.with_min(min).with_max(max)
    }

    /// Replaces the flags.
    pub fn with_flags(mut self, flags: AttrFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the inspector label.
    pub fn with_label(mut self, label: Tag) -> Self {
        self.label = Some(label);
        self
    }

    /// Sets the inspector style (e.g. `number`, `color`, `enum`).
    pub fn with_style(mut self, style: Tag) -> Self {
        self.style = Some(style);
        self
    }

    /// Sets the inspector category.
    pub fn with_category(mut self, category: Tag) -> Self {
        self.category = Some(category);
        self
    }

    /// Installs a custom setter, applied after the type check and before clipping.
    pub fn with_setter(
        mut self,
        setter: impl Fn(&[Atom]) -> Option<Vec<Atom>> + Send + Sync + 'static,
    ) -> Self {
        self.setter = Some(Arc::new(setter));
        self
    }

    /// Installs a custom getter.
    pub fn with_getter(
        mut self,
        getter: impl Fn(&[Atom]) -> Vec<Atom> + Send + Sync + 'static,
    ) -> Self {
        self.getter = Some(Arc::new(getter));
        self
    }

    /// Attribute name.
    pub fn name(&self) -> &Tag {
        &self.name
    }

    /// Inspector label, if any.
    pub fn label(&self) -> Option<&Tag> {
        self.label.as_ref()
    }

    /// Inspector style, if any.
    pub fn style(&self) -> Option<&Tag> {
        self.style.as_ref()
    }

    /// Inspector category, if any.
    pub fn category(&self) -> Option<&Tag> {
        self.category.as_ref()
    }

    /// Declared types per position.
    pub fn types(&self) -> &[AttrType] {
        &self.types
    }

    /// Flags.
    pub fn flags(&self) -> AttrFlags {
        self.flags
    }

    /// Lower bound, if set.
    pub fn min(&self) -> Option<f64> {
        self.min
    }

    /// Upper bound, if set.
    pub fn max(&self) -> Option<f64> {
        self.max
    }

    /// Default values.
    pub fn defaults(&self) -> &[Atom] {
        &self.defaults
    }

    /// Value at `index`, [`Atom::Null`] past the last position.
    pub fn get(&self, index: usize) -> Atom {
        match &self.getter {
            Some(getter) => getter(&self.values).get(index).cloned().unwrap_or_default(),
            None => self.values.get(index).cloned().unwrap_or_default(),
        }
    }

    /// All current values.
    pub fn get_all(&self) -> Vec<Atom> {
        match &self.getter {
            Some(getter) => getter(&self.values),
            None => self.values.clone(),
        }
    }

    /// Restores the defaults.
    pub fn reset(&mut self) {
        self.values.clone_from(&self.defaults);
    }

    /// Checks, clips and stores `values`.
    ///
    /// Positions not covered by `values` keep their current value.
    pub fn set(&mut self, values: &[Atom]) -> Result<(), AttributeError> {
        let arity = self.types.len();
        if values.is_empty() || values.len() > arity {
            return Err(AttributeError::Arity {
                name: self.name.to_string(),
                expected: arity,
                got: values.len(),
            });
        }

        let mut next = self.values.clone();
        for (position, (value, ty)) in values.iter().zip(&self.types).enumerate() {
            next[position] = ty.coerce(value).ok_or(AttributeError::TypeMismatch {
                name: self.name.to_string(),
                position,
                expected: ty.name(),
                got: value.kind(),
            })?;
        }

        if let Some(setter) = &self.setter {
            next = setter(&next).ok_or_else(|| AttributeError::Rejected(self.name.to_string()))?;
        }

        for value in &mut next {
            *value = self.clip(value);
        }
        self.values = next;
        Ok(())
    }

    /// Applies whichever of min/max is set. Integers clip as integers.
    fn clip(&self, value: &Atom) -> Atom {
        match value {
            Atom::Int(i) => {
                let mut v = *i;
                if let Some(min) = self.min {
                    v = v.max(min.ceil() as i64);
                }
                if let Some(max) = self.max {
                    v = v.min(max.floor() as i64);
                }
                Atom::Int(v)
            }
            Atom::Float(x) => {
                let mut v = *x;
                if let Some(min) = self.min {
                    v = v.max(min);
                }
                if let Some(max) = self.max {
                    v = v.min(max);
                }
                Atom::Float(v)
            }
            other => other.clone(),
        }
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("types", &self.types)
            .field("values", &self.values)
            .field("flags", &self.flags)
            .field("min", &self.min)
            .field("max", &self.max)
            .finish_non_exhaustive()
    }
}

/// The attributes of one node, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct AttributeSet {
    attributes: Vec<Attribute>,
}

impl AttributeSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute, replacing any previous one of the same name.
    pub fn insert(&mut self, attribute: Attribute) {
        match self.position(attribute.name()) {
            Some(index) => self.attributes[index] = attribute,
            None => self.attributes.push(attribute),
        }
    }

    /// Looks an attribute up by name.
    pub fn get(&self, name: &Tag) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name() == name)
    }

    /// Looks an attribute up by name for mutation.
    pub fn get_mut(&mut self, name: &Tag) -> Option<&mut Attribute> {
        self.attributes.iter_mut().find(|a| a.name() == name)
    }

    /// Current values of `name`, empty if the attribute does not exist.
    pub fn values(&self, name: &Tag) -> Vec<Atom> {
        self.get(name).map(Attribute::get_all).unwrap_or_default()
    }

    /// Sets `name`.
    ///
    /// Opaque attributes are set here too; only `@name` messages refuse them.
    pub fn set(&mut self, name: &Tag, values: &[Atom]) -> Result<(), AttributeError> {
        self.get_mut(name)
            .ok_or_else(|| AttributeError::Unknown(name.to_string()))?
            .set(values)
    }

    /// Returns `true` if `name` exists and is opaque.
    pub fn is_opaque(&self, name: &Tag) -> bool {
        self.get(name)
            .is_some_and(|a| a.flags().contains(AttrFlags::OPAQUE))
    }

    /// Attributes in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns `true` if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    fn position(&self, name: &Tag) -> Option<usize> {
        self.attributes.iter().position(|a| a.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::TagRegistry;

    #[test]
    fn clip_with_both_bounds() {
        let tags = TagRegistry::new();
        let mut attr = Attribute::int(tags.intern("n"), 5).with_range(0.0, 10.0);
        attr.set(&[Atom::Int(-5)]).unwrap();
        assert_eq!(attr.get(0), Atom::Int(0));
        attr.set(&[Atom::Int(15)]).unwrap();
        assert_eq!(attr.get(0), Atom::Int(10));
        attr.set(&[Atom::Int(7)]).unwrap();
        assert_eq!(attr.get(0), Atom::Int(7));
    }

    #[test]
    fn clip_with_min_only() {
        let tags = TagRegistry::new();
        let mut attr = Attribute::int(tags.intern("n"), 5).with_min(0.0);
        attr.set(&[Atom::Int(-5)]).unwrap();
        assert_eq!(attr.get(0), Atom::Int(0));
        attr.set(&[Atom::Int(1_000_000)]).unwrap();
        assert_eq!(attr.get(0), Atom::Int(1_000_000));
    }

    #[test]
    fn float_clips_as_float() {
        let tags = TagRegistry::new();
        let mut attr = Attribute::float(tags.intern("gain"), 0.5).with_range(0.0, 1.0);
        attr.set(&[Atom::Float(1.5)]).unwrap();
        assert_eq!(attr.get(0), Atom::Float(1.0));
        attr.set(&[Atom::Int(-2)]).unwrap();
        assert_eq!(attr.get(0), Atom::Float(0.0));
    }

    #[test]
    fn int_bounds_round_inward() {
        let tags = TagRegistry::new();
        let mut attr = Attribute::int(tags.intern("n"), 0).with_range(0.5, 9.5);
        attr.set(&[Atom::Int(0)]).unwrap();
        assert_eq!(attr.get(0), Atom::Int(1));
        attr.set(&[Atom::Int(20)]).unwrap();
        assert_eq!(attr.get(0), Atom::Int(9));
    }

    #[test]
    fn type_check_rejects_and_keeps_value() {
        let tags = TagRegistry::new();
        let mut attr = Attribute::int(tags.intern("n"), 3);
        let err = attr.set(&[Atom::Tag(tags.intern("x"))]).unwrap_err();
        assert!(matches!(err, AttributeError::TypeMismatch { position: 0, .. }));
        assert_eq!(attr.get(0), Atom::Int(3));
    }

    #[test]
    fn float_to_int_truncates() {
        let tags = TagRegistry::new();
        let mut attr = Attribute::int(tags.intern("n"), 0);
        attr.set(&[Atom::Float(4.8)]).unwrap();
        assert_eq!(attr.get(0), Atom::Int(4));
    }

    #[test]
    fn arity_is_checked() {
        let tags = TagRegistry::new();
        let mut attr = Attribute::int(tags.intern("n"), 0);
        assert!(matches!(attr.set(&[]), Err(AttributeError::Arity { got: 0, .. })));
        assert!(matches!(
            attr.set(&[Atom::Int(1), Atom::Int(2)]),
            Err(AttributeError::Arity { got: 2, .. })
        ));
    }

    #[test]
    fn partial_set_keeps_trailing_positions() {
        let tags = TagRegistry::new();
        let mut attr = Attribute::new(
            tags.intern("size"),
            vec![AttrType::Float, AttrType::Float],
            vec![Atom::Float(10.0), Atom::Float(20.0)],
        );
        attr.set(&[Atom::Float(1.0)]).unwrap();
        assert_eq!(attr.get_all(), vec![Atom::Float(1.0), Atom::Float(20.0)]);
        attr.reset();
        assert_eq!(attr.get_all(), attr.defaults());
    }

    #[test]
    fn get_past_end_is_null() {
        let tags = TagRegistry::new();
        let attr = Attribute::boolean(tags.intern("on"), true);
        assert_eq!(attr.get(0), Atom::Bool(true));
        assert_eq!(attr.get(5), Atom::Null);
    }

    #[test]
    fn custom_setter_and_getter() {
        let tags = TagRegistry::new();
        let mut attr = Attribute::int(tags.intern("even"), 0)
            .with_setter(|values| (values[0].as_int() % 2 == 0).then(|| values.to_vec()))
            .with_getter(|values| vec![Atom::Int(values[0].as_int() * 10)]);
        attr.set(&[Atom::Int(4)]).unwrap();
        assert_eq!(attr.get(0), Atom::Int(40));
        assert!(matches!(attr.set(&[Atom::Int(3)]), Err(AttributeError::Rejected(_))));
        assert_eq!(attr.get_all(), vec![Atom::Int(40)]);
    }

    #[test]
    fn set_lookup_and_opaque() {
        let tags = TagRegistry::new();
        let mut set = AttributeSet::new();
        set.insert(Attribute::int(tags.intern("a"), 1));
        set.insert(
            Attribute::int(tags.intern("b"), 2)
                .with_flags(AttrFlags::default().union(AttrFlags::OPAQUE)),
        );
        assert_eq!(set.len(), 2);
        set.set(&tags.intern("a"), &[Atom::Int(9)]).unwrap();
        assert_eq!(set.values(&tags.intern("a")), vec![Atom::Int(9)]);
        assert!(!set.is_opaque(&tags.intern("a")));
        assert!(set.is_opaque(&tags.intern("b")));
        set.set(&tags.intern("b"), &[Atom::Int(4)]).unwrap();
        assert_eq!(set.values(&tags.intern("b")), vec![Atom::Int(4)]);
        assert!(matches!(
            set.set(&tags.intern("zzz"), &[Atom::Int(9)]),
            Err(AttributeError::Unknown(_))
        ));
        assert!(set.values(&tags.intern("zzz")).is_empty());
    }

    #[test]
    fn metadata_builders() {
        let tags = TagRegistry::new();
        let attr = Attribute::float(tags.intern("gain"), 0.0)
            .with_label(tags.intern("Gain"))
            .with_style(tags.intern("number"))
            .with_category(tags.intern("Behavior"))
            .with_flags(AttrFlags::VISIBLE);
        assert_eq!(attr.label().map(Tag::as_str), Some("Gain"));
        assert_eq!(attr.style().map(Tag::as_str), Some("number"));
        assert_eq!(attr.category().map(Tag::as_str), Some("Behavior"));
        assert!(!attr.flags().contains(AttrFlags::PERSIST));
        assert_eq!(attr.types(), &[AttrType::Float]);
        assert_eq!(attr.min(), None);
    }
}
