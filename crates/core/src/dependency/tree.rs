//! Arena-backed n-ary dependency tree
//!
//! Nodes live in a flat vector and refer to their children by [`NodeId`], so
//! the tree is owned by a single value that is threaded through the analysis
//! instead of living in shared mutable state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Kind of a dependency declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// Root of one analysis run
    Root,
    Cartridge,
    /// Plain artifact, mostly jar files
    Artifact,
    /// Dependency declared through the component framework
    Component,
    Library,
    /// Runtime-only package dependency
    Package,
    Application,
    Unknown,
}

impl DependencyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DependencyKind::Root => "root",
            DependencyKind::Cartridge => "cartridge",
            DependencyKind::Artifact => "artifact",
            DependencyKind::Component => "component",
            DependencyKind::Library => "library",
            DependencyKind::Package => "package",
            DependencyKind::Application => "application",
            DependencyKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared dependency
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    /// File the dependency was declared in, if any
    pub artifact_ref: Option<String>,
    pub kind: DependencyKind,
}

impl Dependency {
    pub fn new(name: impl Into<String>, artifact_ref: Option<String>, kind: DependencyKind) -> Self {
        Self {
            name: name.into(),
            artifact_ref,
            kind,
        }
    }
}

/// Index of a node inside its [`DependencyTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
struct Node {
    value: Dependency,
    children: Vec<NodeId>,
}

/// Tree of dependencies rooted at a single [`DependencyKind::Root`] node
#[derive(Debug)]
pub struct DependencyTree {
    nodes: Vec<Node>,
    /// (parent, name, kind) → existing child, used to avoid duplicate children
    index: HashMap<(NodeId, String, DependencyKind), NodeId>,
}

/// Owned, nested view of a subtree; this is the JSON shape of the tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyNodeView {
    #[serde(flatten)]
    pub value: Dependency,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DependencyNodeView>,
}

impl DependencyTree {
    pub fn new(root: Dependency) -> Self {
        Self {
            nodes: vec![Node {
                value: root,
                children: Vec::new(),
            }],
            index: HashMap::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn get(&self, id: NodeId) -> &Dependency {
        &self.nodes[id.0].value
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Append `value` below `parent`
    ///
    /// When `parent` already has a child with the same name and kind, that
    /// child is returned and nothing is inserted.
    pub fn add_child(&mut self, parent: NodeId, value: Dependency) -> NodeId {
        let key = (parent, value.name.clone(), value.kind);
        if let Some(&existing) = self.index.get(&key) {
            return existing;
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            value,
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        self.index.insert(key, id);
        id
    }

    /// First node in depth-first order with the given name and kind
    pub fn find(&self, name: &str, kind: DependencyKind) -> Option<NodeId> {
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            let value = self.get(id);
            if value.name == name && value.kind == kind {
                return Some(id);
            }
            stack.extend(self.children(id).iter().rev());
        }
        None
    }

    pub fn view(&self, id: NodeId) -> DependencyNodeView {
        DependencyNodeView {
            value: self.get(id).clone(),
            children: self
                .children(id)
                .iter()
                .map(|&child| self.view(child))
                .collect(),
        }
    }

    /// Pretty-printed JSON of the whole tree
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.view(self.root()))
    }

    /// Indented text rendering, four spaces per level
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        self.render_node(self.root(), 0, &mut out);
        out
    }

    fn render_node(&self, id: NodeId, depth: usize, out: &mut String) {
        out.push_str(&"    ".repeat(depth));
        out.push_str(&self.get(id).name);
        out.push('\n');
        for &child in self.children(id) {
            self.render_node(child, depth + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cartridge(name: &str) -> Dependency {
        Dependency::new(name, None, DependencyKind::Cartridge)
    }

    #[test]
    fn test_add_child_deduplicates_by_name_and_kind() {
        let mut tree = DependencyTree::new(Dependency::new("project", None, DependencyKind::Root));
        let root = tree.root();

        let first = tree.add_child(root, cartridge("app_core"));
        let again = tree.add_child(
            root,
            Dependency::new("app_core", Some("build.gradle.kts".into()), DependencyKind::Cartridge),
        );
        let package = tree.add_child(root, Dependency::new("app_core", None, DependencyKind::Package));

        assert_eq!(first, again);
        assert_ne!(first, package);
        assert_eq!(tree.children(root).len(), 2);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_same_name_below_different_parents() {
        let mut tree = DependencyTree::new(Dependency::new("project", None, DependencyKind::Root));
        let a = tree.add_child(tree.root(), cartridge("a"));
        let b = tree.add_child(tree.root(), cartridge("b"));
        let under_a = tree.add_child(a, cartridge("shared"));
        let under_b = tree.add_child(b, cartridge("shared"));

        assert_ne!(under_a, under_b);
        assert_eq!(tree.find("shared", DependencyKind::Cartridge), Some(under_a));
        assert_eq!(tree.find("shared", DependencyKind::Package), None);
    }

    #[test]
    fn test_render_text() {
        let mut tree = DependencyTree::new(Dependency::new("project", None, DependencyKind::Root));
        let a = tree.add_child(tree.root(), cartridge("a"));
        tree.add_child(a, cartridge("b"));
        tree.add_child(tree.root(), cartridge("c"));

        assert_eq!(tree.render_text(), "project\n    a\n        b\n    c\n");
    }

    #[test]
    fn test_json_shape() {
        let mut tree = DependencyTree::new(Dependency::new("project", None, DependencyKind::Root));
        let a = tree.add_child(tree.root(), cartridge("a"));
        tree.add_child(a, Dependency::new("lib", Some("build.gradle.kts".into()), DependencyKind::Package));

        let json: serde_json::Value = serde_json::from_str(&tree.to_json().unwrap()).unwrap();
        assert_eq!(json["name"], "project");
        assert_eq!(json["kind"], "root");
        assert_eq!(json["children"][0]["name"], "a");
        assert_eq!(json["children"][0]["children"][0]["kind"], "package");
        assert_eq!(json["children"][0]["children"][0]["artifact_ref"], "build.gradle.kts");
        assert!(json["children"][0]["children"][0].get("children").is_none());
    }
}
