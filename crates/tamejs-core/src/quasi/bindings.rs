//! Hole name to node(s) maps produced by matching and consumed by
//! substitution.

use crate::ast::Node;
use indexmap::IndexMap;
use std::slice;

/// What a single hole captured.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Node(Node),
    /// Captured by a multi-hole; may be empty.
    List(Vec<Node>),
}

impl Binding {
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Binding::Node(node) => Some(node),
            Binding::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Node]> {
        match self {
            Binding::List(nodes) => Some(nodes),
            Binding::Node(_) => None,
        }
    }

    /// The captured nodes, whichever way they were captured.
    pub fn nodes(&self) -> &[Node] {
        match self {
            Binding::Node(node) => slice::from_ref(node),
            Binding::List(nodes) => nodes,
        }
    }
}

impl From<Node> for Binding {
    fn from(node: Node) -> Self {
        Binding::Node(node)
    }
}

impl From<Vec<Node>> for Binding {
    fn from(nodes: Vec<Node>) -> Self {
        Binding::List(nodes)
    }
}

/// Bindings in insertion order, so expansion of entries is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    entries: IndexMap<String, Binding>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, name: &str, node: Node) -> Self {
        self.insert(name, Binding::Node(node));
        self
    }

    pub fn with_list(mut self, name: &str, nodes: Vec<Node>) -> Self {
        self.insert(name, Binding::List(nodes));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.entries.get(name)
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.get(name).and_then(Binding::as_node)
    }

    pub fn list(&self, name: &str) -> Option<&[Node]> {
        self.get(name).and_then(Binding::as_list)
    }

    /// Bind or rebind `name`, returning the previous binding.
    pub fn insert(&mut self, name: &str, binding: Binding) -> Option<Binding> {
        self.entries.insert(name.to_string(), binding)
    }

    pub fn remove(&mut self, name: &str) -> Option<Binding> {
        self.entries.shift_remove(name)
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

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Record a match. A name bound earlier in the same match must capture
    /// an equal tree.
    pub(crate) fn bind(&mut self, name: &str, binding: Binding) -> bool {
        match self.entries.get(name) {
            Some(existing) => *existing == binding,
            None => {
                self.entries.insert(name.to_string(), binding);
                true
            }
        }
    }
}

impl FromIterator<(String, Binding)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (String, Binding)>>(iter: I) -> Self {
        Bindings {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Bindings {
    type Item = (String, Binding);
    type IntoIter = indexmap::map::IntoIter<String, Binding>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
