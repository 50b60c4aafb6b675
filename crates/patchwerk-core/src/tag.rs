//! Interned string tokens.
//!
//! A [`Tag`] is the identity token used for message selectors, dictionary keys,
//! node names and beacon names. Tags are created by a [`TagRegistry`], which
//! canonicalizes each distinct string into exactly one shared allocation, so two
//! tags compare equal if and only if they came from the same registry entry.
//!
//! # Example
//!
//! ```rust
//! use patchwerk_core::TagRegistry;
//!
//! let tags = TagRegistry::new();
//! let a = tags.intern("bang");
//! let b = tags.intern("bang");
//! assert_eq!(a, b);
//! assert_ne!(a, tags.intern("set"));
//! ```

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::Mutex;

/// An interned, identity-comparable string token.
///
/// Cloning a tag is a reference-count increment. Equality and hashing use the
/// address of the interned allocation, never the text.
#[derive(Clone)]
pub struct Tag(Arc<str>);

impl Tag {
    /// Returns the text of the tag.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<u8>() as usize
    }
}

impl PartialEq for Tag {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Tag {}

impl Hash for Tag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl PartialOrd for Tag {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tag {
    /// Orders by text, then by identity for tags from different registries.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str()
            .cmp(other.as_str())
            .then_with(|| self.addr().cmp(&other.addr()))
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({:?})", self.as_str())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Canonicalizing table of [`Tag`]s.
///
/// Entries are never evicted: a tag lives as long as the registry or any clone
/// of it. The table is guarded by a single lock held only for the lookup.
#[derive(Default)]
pub struct TagRegistry {
    table: Mutex<HashSet<Arc<str>>>,
}

impl TagRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the unique tag for `text`, creating it on first use.
    pub fn intern(&self, text: &str) -> Tag {
        let mut table = self.table.lock();
        if let Some(existing) = table.get(text) {
            return Tag(Arc::clone(existing));
        }
        let entry: Arc<str> = Arc::from(text);
        table.insert(Arc::clone(&entry));
        Tag(entry)
    }

    /// Returns `true` if `text` has already been interned.
    pub fn contains(&self, text: &str) -> bool {
        self.table.lock().contains(text)
    }

    /// Number of distinct tags interned so far.
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    /// Returns `true` if nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for TagRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagRegistry")
            .field("len", &self.len())
            .finish()
    }
}
