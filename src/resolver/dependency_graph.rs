//! Chart-to-chart dependency graph.
//!
//! Local charts may depend on each other through `file://` dependencies, and
//! `helm dependency update` for a chart must only run once its dependencies
//! are up to date. This module provides the graph data structure, cycle
//! detection, and the global topological order used to serialize that work.

use std::collections::{HashMap, HashSet, VecDeque};

use anyhow::Result;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::core::TerraError;

/// Color states for cycle detection using DFS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Node has not been visited.
    White,
    /// Node is currently being visited (in the DFS stack).
    Gray,
    /// Node has been fully visited.
    Black,
}

/// Acyclic dependency graph over chart names.
///
/// Edges point from a chart to each of its dependencies. Construction fails
/// if the graph has a cycle; afterwards every query is infallible.
///
/// # Examples
///
/// ```rust
/// use std::collections::HashMap;
/// use terra_cli::resolver::dependency_graph::DependencyGraph;
///
/// # fn example() -> anyhow::Result<()> {
/// let deps = HashMap::from([
///     ("leonardo".to_string(), vec!["foundation".to_string()]),
///     ("foundation".to_string(), vec![]),
/// ]);
/// let graph = DependencyGraph::new(&deps)?;
///
/// let mut charts = vec!["leonardo".to_string(), "foundation".to_string()];
/// graph.topo_sort(&mut charts);
/// assert_eq!(charts, ["foundation", "leonardo"]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// The underlying directed graph.
    graph: DiGraph<String, ()>,
    /// Map from chart names to their graph indices.
    node_map: HashMap<String, NodeIndex>,
    /// Position of each chart in the global topological order.
    topo_index: HashMap<String, usize>,
}

impl DependencyGraph {
    /// Build a graph from a chart → dependencies mapping.
    ///
    /// Charts that only appear as dependencies become nodes too.
    ///
    /// # Errors
    ///
    /// Returns [`TerraError::CircularDependency`] naming the cycle, e.g.
    /// `cycle detected: a -> b -> a`.
    pub fn new(dependencies: &HashMap<String, Vec<String>>) -> Result<Self> {
        let mut graph = Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
            topo_index: HashMap::new(),
        };

        // Sorted insertion keeps cycle reports stable between runs
        let mut charts: Vec<&String> = dependencies.keys().collect();
        charts.sort();

        for chart in &charts {
            graph.ensure_node(chart);
        }
        for chart in charts {
            for dependency in &dependencies[chart] {
                graph.add_dependency(chart, dependency);
            }
        }

        graph.detect_cycles()?;
        graph.topo_index = graph.kahn_order()?;
        Ok(graph)
    }

    fn ensure_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&index) = self.node_map.get(name) {
            index
        } else {
            let index = self.graph.add_node(name.to_string());
            self.node_map.insert(name.to_string(), index);
            index
        }
    }

    /// `from` depends on `to`, so `to` must be processed first.
    fn add_dependency(&mut self, from: &str, to: &str) {
        let from_idx = self.ensure_node(from);
        let to_idx = self.ensure_node(to);
        if !self.graph.contains_edge(from_idx, to_idx) {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    fn detect_cycles(&self) -> Result<()> {
        let mut colors: HashMap<NodeIndex, Color> =
            self.graph.node_indices().map(|n| (n, Color::White)).collect();
        let mut path: Vec<NodeIndex> = Vec::new();

        for node in self.graph.node_indices() {
            if matches!(colors.get(&node), Some(Color::White))
                && let Some(cycle) = self.dfs_visit(node, &mut colors, &mut path)
            {
                let chain = cycle
                    .iter()
                    .map(|idx| self.graph[*idx].as_str())
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Err(TerraError::CircularDependency {
                    chain,
                }
                .into());
            }
        }

        Ok(())
    }

    /// DFS visit for cycle detection.
    ///
    /// Returns `Some(cycle_path)` if a cycle is reachable from `node`.
    fn dfs_visit(
        &self,
        node: NodeIndex,
        colors: &mut HashMap<NodeIndex, Color>,
        path: &mut Vec<NodeIndex>,
    ) -> Option<Vec<NodeIndex>> {
        colors.insert(node, Color::Gray);
        path.push(node);

        for neighbor in self.graph.neighbors(node) {
            match colors.get(&neighbor) {
                Some(Color::Gray) => {
                    let start = path.iter().position(|n| *n == neighbor).unwrap_or(0);
                    let mut cycle = path[start..].to_vec();
                    cycle.push(neighbor);
                    return Some(cycle);
                }
                Some(Color::White) => {
                    if let Some(cycle) = self.dfs_visit(neighbor, colors, path) {
                        return Some(cycle);
                    }
                }
                _ => {}
            }
        }

        path.pop();
        colors.insert(node, Color::Black);
        None
    }

    /// Kahn's algorithm with a FIFO queue, dependencies first.
    fn kahn_order(&self) -> Result<HashMap<String, usize>> {
        let mut remaining: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|n| (n, self.graph.neighbors_directed(n, Direction::Outgoing).count()))
            .collect();

        let mut queue: VecDeque<NodeIndex> =
            self.graph.node_indices().filter(|n| remaining[n] == 0).collect();
        let mut order = HashMap::with_capacity(self.graph.node_count());

        while let Some(node) = queue.pop_front() {
            order.insert(self.graph[node].clone(), order.len());
            for dependent in self.graph.neighbors_directed(node, Direction::Incoming) {
                if let Some(count) = remaining.get_mut(&dependent) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        if order.len() != self.graph.node_count() {
            return Err(TerraError::ProgrammerError {
                message: format!(
                    "topological sort left {} charts unordered after cycle check",
                    self.graph.node_count() - order.len()
                ),
            }
            .into());
        }

        Ok(order)
    }

    /// Reorder `names` in place so every chart follows its dependencies.
    ///
    /// Names unknown to the graph sort last. Ties keep no particular order.
    pub fn topo_sort(&self, names: &mut [String]) {
        names.sort_by_key(|name| self.topo_index.get(name).copied().unwrap_or(usize::MAX));
    }

    /// `names` plus every chart that transitively depends on any of them.
    ///
    /// Breadth-first; the result has no duplicates and no particular order.
    pub fn with_transitive_dependents(&self, names: &[String]) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut result = Vec::new();
        let mut queue = VecDeque::new();

        for name in names {
            if seen.insert(name.as_str()) {
                result.push(name.clone());
                if let Some(&idx) = self.node_map.get(name) {
                    queue.push_back(idx);
                }
            }
        }

        while let Some(current) = queue.pop_front() {
            for dependent in self.graph.neighbors_directed(current, Direction::Incoming) {
                let name = self.graph[dependent].as_str();
                if seen.insert(name) {
                    result.push(name.to_string());
                    queue.push_back(dependent);
                }
            }
        }

        result
    }

    /// Charts that directly depend on `name`.
    pub fn dependents(&self, name: &str) -> Vec<String> {
        self.node_map
            .get(name)
            .map(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .map(|n| self.graph[n].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    #[cfg(test)]
    fn contains(&self, name: &str) -> bool {
        self.node_map.contains_key(name)
    }

    #[cfg(test)]
    fn node_count(&self) -> usize {
        self.graph.node_count()
    }
}
