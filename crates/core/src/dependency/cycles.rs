//! Cycle detection over breadcrumb trails
//!
//! A trail such as `shop > app_core > platform` encodes a dependency path.
//! Every consecutive pair becomes a directed edge.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, info};

/// Directed graph of module names built from breadcrumb trails
#[derive(Debug, Default)]
pub struct TrailGraph {
    graph: DiGraph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
}

impl TrailGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from trail lines; whitespace around `>` is ignored
    pub fn from_trails<S: AsRef<str>>(trails: &[S]) -> Self {
        let mut graph = Self::new();
        for trail in trails {
            graph.add_trail(trail.as_ref());
        }
        graph
    }

    pub fn add_trail(&mut self, trail: &str) {
        let names: Vec<&str> = split_trail(trail).collect();
        for pair in names.windows(2) {
            let from = self.node(pair[0]);
            let to = self.node(pair[1]);
            self.graph.update_edge(from, to, ());
        }
    }

    fn node(&mut self, name: &str) -> NodeIndex {
        if let Some(&index) = self.nodes.get(name) {
            return index;
        }
        let index = self.graph.add_node(name.to_string());
        self.nodes.insert(name.to_string(), index);
        index
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Adjacency as `from → [to, ...]`, sorted for stable output
    pub fn edges(&self) -> BTreeMap<String, Vec<String>> {
        let mut edges: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for index in self.graph.node_indices() {
            let mut targets: Vec<String> = self
                .graph
                .neighbors(index)
                .map(|target| self.graph[target].clone())
                .collect();
            if targets.is_empty() {
                continue;
            }
            targets.sort();
            edges.insert(self.graph[index].clone(), targets);
        }
        edges
    }

    /// All cycles, each normalized to its sorted member names
    ///
    /// Normalization identifies which node sets are cyclic. Rotations of the
    /// same loop collapse into one entry, and the traversal order is lost.
    pub fn cycles(&self) -> BTreeSet<Vec<String>> {
        let mut cycles = BTreeSet::new();
        for start in self.graph.node_indices() {
            let mut visited = HashSet::new();
            let mut path = Vec::new();
            self.collect_cycles(start, start, &mut visited, &mut path, &mut cycles);
        }

        if cycles.is_empty() {
            debug!(nodes = self.node_count(), "no cycles found");
        } else {
            for cycle in &cycles {
                info!(cycle = %cycle.join(" -> "), "dependency cycle found");
            }
        }
        cycles
    }

    /// Depth-first search from `start`; `visited` and `path` belong to this search only
    fn collect_cycles(
        &self,
        start: NodeIndex,
        current: NodeIndex,
        visited: &mut HashSet<NodeIndex>,
        path: &mut Vec<NodeIndex>,
        cycles: &mut BTreeSet<Vec<String>>,
    ) {
        visited.insert(current);
        path.push(current);

        for neighbor in self.graph.neighbors(current) {
            if neighbor == start {
                let mut members: Vec<String> =
                    path.iter().map(|&index| self.graph[index].clone()).collect();
                members.sort();
                members.dedup();
                cycles.insert(members);
            } else if !visited.contains(&neighbor) {
                self.collect_cycles(start, neighbor, visited, path, cycles);
            }
        }

        path.pop();
    }

    pub fn has_cycles(&self) -> bool {
        !self.cycles().is_empty()
    }

    /// Whether `to` can be reached from `from`; every known node reaches itself
    pub fn is_reachable(&self, from: &str, to: &str) -> bool {
        let (Some(&start), Some(&target)) = (self.nodes.get(from), self.nodes.get(to)) else {
            return false;
        };
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(index) = dfs.next(&self.graph) {
            if index == target {
                return true;
            }
        }
        false
    }

    /// Pairs of distinct nodes that reach each other, each pair sorted
    pub fn mutual_dependencies(&self) -> BTreeSet<(String, String)> {
        let mut names: Vec<&String> = self.nodes.keys().collect();
        names.sort();

        let mut pairs = BTreeSet::new();
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                if self.is_reachable(a, b) && self.is_reachable(b, a) {
                    debug!(%a, %b, "mutual dependency");
                    pairs.insert(((*a).clone(), (*b).clone()));
                }
            }
        }
        pairs
    }
}

fn split_trail(trail: &str) -> impl Iterator<Item = &str> {
    trail.split('>').map(str::trim).filter(|name| !name.is_empty())
}

/// Build a graph from `trails` and report whether any cycle exists
pub fn has_cycles<S: AsRef<str>>(trails: &[S]) -> bool {
    TrailGraph::from_trails(trails).has_cycles()
}
