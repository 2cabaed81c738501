//! Generated resource record sets.

use std::collections::{HashMap, HashSet};

/// Record kind, used to pick a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Address records (A/AAAA); targets are IP literals or bare hosts.
    A,
    /// Service records; targets are `host:port`.
    Srv,
}

/// Targets of one name: insertion order plus a membership index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Targets {
    order: Vec<String>,
    seen: HashSet<String>,
}

/// Insertion-ordered, deduplicating map from a fully-qualified name to its
/// targets.
///
/// Target order is first-insertion order and is what resolvers serve.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rrs {
    entries: HashMap<String, Targets>,
}

impl Rrs {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `target` to `name` unless it is already present.
    ///
    /// Returns `true` when the target was added.
    pub fn insert(&mut self, name: &str, target: &str) -> bool {
        let targets = self.entries.entry(name.to_string()).or_default();
        if !targets.seen.insert(target.to_string()) {
            return false;
        }
        targets.order.push(target.to_string());
        true
    }

    /// Check whether `target` is recorded for `name`.
    pub fn exists(&self, name: &str, target: &str) -> bool {
        self.entries
            .get(name)
            .is_some_and(|targets| targets.seen.contains(target))
    }

    /// Targets for `name` in insertion order. Empty if unknown.
    pub fn lookup(&self, name: &str) -> &[String] {
        self.entries
            .get(name)
            .map(|targets| targets.order.as_slice())
            .unwrap_or(&[])
    }

    /// Check whether any target is recorded for `name`.
    pub fn contains_name(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no name has been inserted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of targets across all names.
    pub fn record_count(&self) -> usize {
        self.entries.values().map(|targets| targets.order.len()).sum()
    }

    /// Iterate over `(name, targets)` pairs in unspecified name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, targets)| (name.as_str(), targets.order.as_slice()))
    }
}

/// The complete output of one generation cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Records {
    /// Address records.
    pub a: Rrs,
    /// Service records.
    pub srv: Rrs,
}

impl Records {
    /// Create an empty record set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an address record.
    pub fn insert_a(&mut self, name: &str, target: &str) -> bool {
        self.a.insert(name, target)
    }

    /// Insert a service record.
    pub fn insert_srv(&mut self, name: &str, target: &str) -> bool {
        self.srv.insert(name, target)
    }

    /// Insert into the store selected by `kind`.
    pub fn insert(&mut self, kind: RecordKind, name: &str, target: &str) -> bool {
        self.store_mut(kind).insert(name, target)
    }

    /// Check membership in the store selected by `kind`.
    pub fn exists(&self, kind: RecordKind, name: &str, target: &str) -> bool {
        self.store(kind).exists(name, target)
    }

    /// Store for `kind`.
    pub fn store(&self, kind: RecordKind) -> &Rrs {
        match kind {
            RecordKind::A => &self.a,
            RecordKind::Srv => &self.srv,
        }
    }

    fn store_mut(&mut self, kind: RecordKind) -> &mut Rrs {
        match kind {
            RecordKind::A => &mut self.a,
            RecordKind::Srv => &mut self.srv,
        }
    }

    /// True if `name` exists in either store.
    pub fn has_name(&self, name: &str) -> bool {
        self.a.contains_name(name) || self.srv.contains_name(name)
    }

    /// True if nothing was generated.
    pub fn is_empty(&self) -> bool {
        self.a.is_empty() && self.srv.is_empty()
    }
}
