//! Capabilities - the values a host hands to plugins through their context

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A named service or value the host exposes to plugins.
///
/// Capabilities are tagged so a plugin can tell a shared service object from
/// plain data without guessing. Cloning a `Service` clones the `Arc`, so every
/// context that received it observes the same object.
#[derive(Clone)]
pub enum Capability {
    /// Shared object; identity is preserved across contexts
    Service(Arc<dyn Any + Send + Sync>),
    /// Plain data
    Value(serde_json::Value),
    /// Placeholder handed out for modules the host does not provide
    Empty,
}

impl Capability {
    /// Wrap a value as a shared service
    pub fn service<T: Any + Send + Sync>(value: T) -> Self {
        Self::Service(Arc::new(value))
    }

    /// Wrap an existing `Arc` without re-allocating, keeping its identity
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self::Service(value)
    }

    /// Wrap plain data
    pub fn value(value: impl Into<serde_json::Value>) -> Self {
        Self::Value(value.into())
    }

    /// Get the service as `T`, if this is a service of that type.
    ///
    /// Trait objects are stored as `Arc<dyn Trait>` values, so ask for
    /// `T = Arc<dyn Trait>` to get them back.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            Self::Service(service) => Arc::clone(service).downcast::<T>().ok(),
            _ => None,
        }
    }

    /// Get the plain data, if this is a value
    pub fn as_value(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    /// True for the placeholder handed out for unresolved modules
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Identity comparison for services, equality for values
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        match (a, b) {
            (Self::Service(a), Self::Service(b)) => Arc::ptr_eq(a, b),
            (Self::Value(a), Self::Value(b)) => a == b,
            (Self::Empty, Self::Empty) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Service(_) => f.write_str("Service(..)"),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Empty => f.write_str("Empty"),
        }
    }
}

/// Name -> capability map with last-write-wins merging
#[derive(Debug, Clone, Default)]
pub struct CapabilityBag {
    entries: BTreeMap<String, Capability>,
}

impl CapabilityBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a capability
    pub fn with(mut self, name: impl Into<String>, capability: Capability) -> Self {
        self.insert(name, capability);
        self
    }

    /// Insert a capability, returning the one it replaced
    pub fn insert(&mut self, name: impl Into<String>, capability: Capability) -> Option<Capability> {
        self.entries.insert(name.into(), capability)
    }

    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Capability names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Capability)> {
        self.entries.iter().map(|(name, cap)| (name.as_str(), cap))
    }

    /// Shallow merge: every key of `other` overwrites the same key here
    pub fn merge(&mut self, other: &CapabilityBag) {
        for (name, capability) in &other.entries {
            self.entries.insert(name.clone(), capability.clone());
        }
    }
}

impl<S: Into<String>> FromIterator<(S, Capability)> for CapabilityBag {
    fn from_iter<I: IntoIterator<Item = (S, Capability)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(name, cap)| (name.into(), cap))
                .collect(),
        }
    }
}
