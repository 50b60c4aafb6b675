//! The service bundle every patcher and node runs against.

use std::fmt;
use std::sync::Arc;

use crate::beacon::{Beacon, BeaconRegistry};
use crate::console::Console;
use crate::prototype::Prototypes;
use crate::tag::{Tag, TagRegistry};

#[derive(Default)]
struct Services {
    tags: TagRegistry,
    prototypes: Prototypes,
    beacons: BeaconRegistry,
    console: Console,
}

/// Shared handle to one tag registry, node-type table, beacon registry and
/// console.
///
/// Cloning is cheap. Independent runtimes share nothing; tags interned by one
/// never compare equal to tags of another. The services are torn down when the
/// last handle, including those held by nodes, is dropped.
#[derive(Clone, Default)]
pub struct Runtime {
    services: Arc<Services>,
}

impl Runtime {
    /// Creates a runtime with empty registries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag registry.
    pub fn tags(&self) -> &TagRegistry {
        &self.services.tags
    }

    /// Interns `text`.
    pub fn tag(&self, text: &str) -> Tag {
        self.services.tags.intern(text)
    }

    /// Node-type table.
    pub fn prototypes(&self) -> &Prototypes {
        &self.services.prototypes
    }

    /// Beacon registry.
    pub fn beacons(&self) -> &BeaconRegistry {
        &self.services.beacons
    }

    /// Returns the beacon called `name`.
    pub fn beacon(&self, name: &str) -> Arc<Beacon> {
        self.services.beacons.beacon(&self.tag(name))
    }

    /// Diagnostic console.
    pub fn console(&self) -> &Console {
        &self.services.console
    }

    /// Returns `true` if both handles refer to the same runtime.
    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Arc::ptr_eq(&self.services, &other.services)
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("tags", &self.services.tags.len())
            .field("prototypes", &self.services.prototypes.len())
            .field("beacons", &self.services.beacons.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtimes_are_independent() {
        let a = Runtime::new();
        let b = Runtime::new();
        assert_ne!(a.tag("bang"), b.tag("bang"));
        assert!(!a.ptr_eq(&b));
        assert!(a.ptr_eq(&a.clone()));
    }

    #[test]
    fn beacon_lookup_goes_through_tags() {
        let runtime = Runtime::new();
        let beacon = runtime.beacon("left");
        assert!(Arc::ptr_eq(&beacon, &runtime.beacon("left")));
        assert_eq!(runtime.beacons().len(), 1);
        assert!(runtime.tags().contains("left"));
    }
}
