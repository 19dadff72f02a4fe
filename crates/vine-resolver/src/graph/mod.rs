//! Requirement graph built from a requirement table
//!
//! Nodes are package names (plus the project itself), edges point from the
//! requiring side to the required package. Only used for reporting: cycles
//! are legal in npm graphs and the collector already terminates on them.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::requirement::{Requirement, RequirementKind, RequirementTable};

/// Edge in the requirement graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementEdge {
    pub range: String,
    pub kind: RequirementKind,
    pub optional: bool,
}

impl From<&Requirement> for RequirementEdge {
    fn from(req: &Requirement) -> Self {
        Self {
            range: req.range.clone(),
            kind: req.kind,
            optional: req.optional,
        }
    }
}

/// A dependency cycle, starting at its alphabetically first package
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cycle {
    pub packages: Vec<String>,
}

impl Cycle {
    /// Format cycle as "a -> b -> a"
    pub fn display_path(&self) -> String {
        let mut names = self.packages.clone();
        if let Some(first) = self.packages.first() {
            names.push(first.clone());
        }
        names.join(" -> ")
    }

    pub fn contains(&self, package: &str) -> bool {
        self.packages.iter().any(|name| name == package)
    }
}

/// Directed graph of who requires whom
#[derive(Debug, Default)]
pub struct RequirementGraph {
    graph: DiGraph<String, RequirementEdge>,
    node_map: HashMap<String, NodeIndex>,
}

impl RequirementGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph from every requirement in `table`
    pub fn from_table(table: &RequirementTable) -> Self {
        let mut graph = Self::new();
        for requirement in table.requirements() {
            graph.add_requirement(requirement);
        }
        graph
    }

    fn node(&mut self, name: &str) -> NodeIndex {
        if let Some(index) = self.node_map.get(name) {
            return *index;
        }
        let index = self.graph.add_node(name.to_string());
        self.node_map.insert(name.to_string(), index);
        index
    }

    /// Add one requirement edge, creating nodes as needed
    pub fn add_requirement(&mut self, requirement: &Requirement) {
        let from = self.node(&requirement.required_by);
        let to = self.node(&requirement.package);
        self.graph.add_edge(from, to, RequirementEdge::from(requirement));
    }

    /// Packages `name` places requirements on, sorted
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        let Some(index) = self.node_map.get(name) else {
            return Vec::new();
        };
        let targets: BTreeSet<&str> = self
            .graph
            .edges(*index)
            .map(|edge| self.graph[edge.target()].as_str())
            .collect();
        targets.into_iter().collect()
    }

    /// Every cycle, one per strongly connected component, sorted
    pub fn cycles(&self) -> Vec<Cycle> {
        let mut cycles: Vec<Cycle> = tarjan_scc(&self.graph)
            .into_iter()
            .filter_map(|component| self.cycle_in(&component))
            .collect();
        cycles.sort();
        cycles
    }

    fn cycle_in(&self, component: &[NodeIndex]) -> Option<Cycle> {
        if component.len() == 1 {
            let node = component[0];
            let self_loop = self.graph.edges(node).any(|edge| edge.target() == node);
            return self_loop.then(|| Cycle {
                packages: vec![self.graph[node].clone()],
            });
        }

        let members: HashSet<NodeIndex> = component.iter().copied().collect();
        let start = component
            .iter()
            .copied()
            .min_by(|a, b| self.graph[*a].cmp(&self.graph[*b]))?;

        // Shortest way from `start` back to itself, staying inside the component
        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([start]);
        let mut closing = None;
        while let Some(node) = queue.pop_front() {
            let mut targets: Vec<NodeIndex> = self
                .graph
                .edges(node)
                .map(|edge| edge.target())
                .filter(|target| members.contains(target))
                .collect();
            targets.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
            targets.dedup();

            for target in targets {
                if target == start {
                    closing = Some(node);
                    break;
                }
                if !parent.contains_key(&target) {
                    parent.insert(target, node);
                    queue.push_back(target);
                }
            }
            if closing.is_some() {
                break;
            }
        }

        let mut path = Vec::new();
        let mut current = closing?;
        while current != start {
            path.push(self.graph[current].clone());
            current = *parent.get(&current)?;
        }
        path.push(self.graph[start].clone());
        path.reverse();
        Some(Cycle { packages: path })
    }

    pub fn package_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn requirement_count(&self) -> usize {
        self.graph.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn table(edges: &[(&str, &str)]) -> RequirementTable {
        let mut table = RequirementTable::new();
        for (from, to) in edges {
            table.add(Requirement::new(*to, "^1.0.0", *from, RequirementKind::Dependency));
        }
        table
    }

    #[test]
    fn test_graph_creation() {
        let graph = RequirementGraph::from_table(&table(&[("app", "a"), ("a", "b"), ("app", "b")]));
        assert_eq!(graph.package_count(), 3);
        assert_eq!(graph.requirement_count(), 3);
        assert_eq!(graph.dependencies_of("app"), vec!["a", "b"]);
        assert!(graph.dependencies_of("unknown").is_empty());
    }

    #[test]
    fn test_no_cycles() {
        let graph = RequirementGraph::from_table(&table(&[("app", "a"), ("a", "b"), ("app", "b")]));
        assert!(graph.cycles().is_empty());
    }

    #[test]
    fn test_peer_cycle() {
        let mut t = table(&[("app", "b")]);
        t.add(Requirement::new("b", "^1.0.0", "a", RequirementKind::Peer));
        t.add(Requirement::new("a", "^1.0.0", "b", RequirementKind::Peer));

        let cycles = RequirementGraph::from_table(&t).cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].packages, vec!["a", "b"]);
        assert_eq!(cycles[0].display_path(), "a -> b -> a");
        assert!(cycles[0].contains("b"));
        assert!(!cycles[0].contains("app"));
    }

    #[test]
    fn test_longer_cycle_and_self_loop() {
        let graph = RequirementGraph::from_table(&table(&[
            ("c", "a"),
            ("a", "b"),
            ("b", "c"),
            ("solo", "solo"),
        ]));

        let cycles = graph.cycles();
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0].display_path(), "a -> b -> c -> a");
        assert_eq!(cycles[1].display_path(), "solo -> solo");
    }

    proptest! {
        #[test]
        fn ring_is_reported_once(size in 2usize..12) {
            let names: Vec<String> = (0..size).map(|i| format!("pkg-{:02}", i)).collect();
            let mut t = RequirementTable::new();
            for i in 0..size {
                let next = &names[(i + 1) % size];
                t.add(Requirement::new(next.as_str(), "*", names[i].as_str(), RequirementKind::Dependency));
            }

            let cycles = RequirementGraph::from_table(&t).cycles();
            prop_assert_eq!(cycles.len(), 1);
            prop_assert_eq!(&cycles[0].packages, &names);
        }
    }
}
