//! Core types for the tree metadata cache.
//!
//! Node names are interned for the life of the process; paths are immutable,
//! cheaply cloneable sequences of names from the root.

use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

/// Milliseconds since the Unix epoch
pub type TimeMillis = i64;

/// Current wall-clock time in milliseconds
pub fn now_millis() -> TimeMillis {
    chrono::Utc::now().timestamp_millis()
}

fn interner() -> &'static RwLock<HashSet<Arc<str>>> {
    static INTERNER: OnceLock<RwLock<HashSet<Arc<str>>>> = OnceLock::new();
    INTERNER.get_or_init(|| RwLock::new(HashSet::new()))
}

/// NodeName: one interned path segment
///
/// Equality, hashing and ordering are by text, never by allocation.
#[derive(Clone)]
pub struct NodeName(Arc<str>);

impl NodeName {
    /// Intern a segment name
    pub fn new(text: &str) -> Self {
        {
            let names = interner().read();
            if let Some(existing) = names.get(text) {
                return NodeName(existing.clone());
            }
        }

        let mut names = interner().write();
        // Double-check: another thread may have interned it meanwhile
        if let Some(existing) = names.get(text) {
            return NodeName(existing.clone());
        }
        let interned: Arc<str> = Arc::from(text);
        names.insert(interned.clone());
        NodeName(interned)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for NodeName {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || *self.0 == *other.0
    }
}

impl Eq for NodeName {}

impl Hash for NodeName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl PartialOrd for NodeName {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeName {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Debug for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeName {
    fn from(text: &str) -> Self {
        NodeName::new(text)
    }
}

impl Serialize for NodeName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NodeName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(NodeName::new(&text))
    }
}

/// NodeNamesPath: segments from the root to a node; empty is the root
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeNamesPath(Arc<[NodeName]>);

impl NodeNamesPath {
    pub fn root() -> Self {
        NodeNamesPath(Arc::from(Vec::new()))
    }

    pub fn from_names(names: Vec<NodeName>) -> Self {
        NodeNamesPath(Arc::from(names))
    }

    /// Parse a `/`-separated path; empty segments are skipped
    pub fn parse(text: &str) -> Self {
        let names: Vec<NodeName> = text
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(NodeName::new)
            .collect();
        NodeNamesPath::from_names(names)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&NodeName> {
        self.0.get(index)
    }

    pub fn names(&self) -> &[NodeName] {
        &self.0
    }

    /// Last segment, `None` for the root
    pub fn last(&self) -> Option<&NodeName> {
        self.0.last()
    }

    /// Path with one more segment appended
    pub fn child(&self, name: NodeName) -> Self {
        let mut names = Vec::with_capacity(self.0.len() + 1);
        names.extend_from_slice(&self.0);
        names.push(name);
        NodeNamesPath::from_names(names)
    }

    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            return None;
        }
        Some(NodeNamesPath::from_names(
            self.0[..self.0.len() - 1].to_vec(),
        ))
    }

    /// True if `prefix` is this path or one of its ancestors
    pub fn starts_with(&self, prefix: &NodeNamesPath) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }
}

impl Default for NodeNamesPath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for NodeNamesPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for name in self.0.iter() {
            write!(f, "/{}", name)?;
        }
        Ok(())
    }
}

impl fmt::Debug for NodeNamesPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeNamesPath({})", self)
    }
}

impl Serialize for NodeNamesPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

impl<'de> Deserialize<'de> for NodeNamesPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<NodeName>::deserialize(deserializer)?;
        Ok(NodeNamesPath::from_names(names))
    }
}

/// Node type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    File,
    Dir,
}
