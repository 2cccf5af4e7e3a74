//! Class dependency graph.
//!
//! Nodes are class names; an edge `C -> D` means `C` imports, extends or
//! implements `D`. The graph is built once per run from the merged model and
//! is read-only afterwards.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;

use crate::analysis::text::last_segment;
use crate::analysis::LanguageClass;
use crate::classify::Language;

/// DFS steps allowed for cycle enumeration before giving up.
const CYCLE_STEP_BUDGET: usize = 200_000;
/// Enumeration stops after this many cycles.
const MAX_COUNTED_CYCLES: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassNode {
    pub name: String,
    pub package: String,
    pub language: Language,
    pub method_count: usize,
    pub complexity: f64,
    pub is_used: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Imports,
    Extends,
    Implements,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
}

/// Limits for the cycle search.
#[derive(Debug, Clone, Copy)]
pub struct CycleLimits {
    /// Cycles listed in `cycle_details`.
    pub max_reported: usize,
    /// Graphs with more nodes than this are not searched at all.
    pub max_search_nodes: usize,
}

impl Default for CycleLimits {
    fn default() -> Self {
        Self {
            max_reported: 5,
            max_search_nodes: 5_000,
        }
    }
}

/// Structural metrics of the dependency graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyMetrics {
    pub total_classes: usize,
    pub total_dependencies: usize,
    pub strongly_connected_components: usize,
    pub is_dag: bool,
    pub density: f64,
    pub average_clustering: f64,
    /// Elementary cycles found (bounded, see `cycle_search_truncated`).
    pub circular_dependencies: usize,
    /// Up to `max_reported` cycles, each starting at its smallest class name.
    pub cycle_details: Vec<Vec<String>>,
    pub cycle_search_truncated: bool,
}

pub struct DependencyGraph {
    graph: DiGraph<ClassNode, EdgeKind>,
    index: BTreeMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Build the graph. Nodes are inserted in name order, so node indices
    /// order the same way names do.
    pub fn build(classes: &[LanguageClass]) -> Self {
        let mut first_by_name: BTreeMap<&str, &LanguageClass> = BTreeMap::new();
        for class in classes {
            first_by_name.entry(class.name.as_str()).or_insert(class);
        }

        let mut graph = DiGraph::new();
        let mut index = BTreeMap::new();
        for (name, class) in &first_by_name {
            let node = graph.add_node(ClassNode {
                name: name.to_string(),
                package: class.package.clone(),
                language: class.language,
                method_count: class.methods.len(),
                complexity: class.complexity_score,
                is_used: class.is_used,
            });
            index.insert(name.to_string(), node);
        }

        let mut dependency_graph = Self { graph, index };
        for class in classes {
            for import in &class.imports {
                for target in import_targets(import) {
                    dependency_graph.link(&class.name, &target, EdgeKind::Imports);
                }
            }
            if let Some(parent) = &class.extends {
                dependency_graph.link(&class.name, parent, EdgeKind::Extends);
            }
            for interface in &class.implements {
                dependency_graph.link(&class.name, interface, EdgeKind::Implements);
            }
        }

        tracing::debug!(
            nodes = dependency_graph.node_count(),
            edges = dependency_graph.edge_count(),
            "dependency graph built"
        );
        dependency_graph
    }

    /// Add `from -> to` when both are known and the pair is not linked yet.
    fn link(&mut self, from: &str, to: &str, kind: EdgeKind) {
        let (Some(&a), Some(&b)) = (self.index.get(from), self.index.get(to)) else {
            return;
        };
        if self.graph.find_edge(a, b).is_none() {
            self.graph.add_edge(a, b, kind);
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn node(&self, name: &str) -> Option<&ClassNode> {
        self.index.get(name).map(|&n| &self.graph[n])
    }

    /// All edges, sorted.
    pub fn edges(&self) -> Vec<DependencyEdge> {
        let mut edges: Vec<DependencyEdge> = self
            .graph
            .edge_references()
            .map(|e| DependencyEdge {
                from: self.graph[e.source()].name.clone(),
                to: self.graph[e.target()].name.clone(),
                kind: *e.weight(),
            })
            .collect();
        edges.sort();
        edges
    }

    pub fn metrics(&self, limits: &CycleLimits) -> DependencyMetrics {
        let n = self.node_count();
        let m = self.edge_count();

        let sccs = tarjan_scc(&self.graph);
        let mut component = vec![0usize; n];
        for (i, scc) in sccs.iter().enumerate() {
            for node in scc {
                component[node.index()] = i;
            }
        }
        let has_self_loop = self.graph.edge_references().any(|e| e.source() == e.target());
        let is_dag = !has_self_loop && sccs.iter().all(|scc| scc.len() == 1);

        let density = if n > 1 {
            m as f64 / (n as f64 * (n as f64 - 1.0))
        } else {
            0.0
        };

        let mut metrics = DependencyMetrics {
            total_classes: n,
            total_dependencies: m,
            strongly_connected_components: sccs.len(),
            is_dag,
            density,
            average_clustering: self.average_clustering(),
            circular_dependencies: 0,
            cycle_details: Vec::new(),
            cycle_search_truncated: false,
        };

        if is_dag {
            return metrics;
        }
        if n > limits.max_search_nodes {
            tracing::warn!(nodes = n, limit = limits.max_search_nodes, "graph too large for cycle search");
            metrics.cycle_search_truncated = true;
            return metrics;
        }

        let search = CycleSearch::run(self, &component);
        let mut cycles = search.cycles;
        metrics.cycle_search_truncated = search.truncated;
        if cycles.is_empty() {
            // the budget ran out before any cycle closed
            cycles.extend(self.fallback_cycle(&sccs));
        }

        metrics.circular_dependencies = cycles.len();
        metrics.cycle_details = cycles
            .into_iter()
            .take(limits.max_reported)
            .map(|cycle| cycle.into_iter().map(|n| self.graph[n].name.clone()).collect())
            .collect();
        metrics
    }

    /// Mean local clustering coefficient of the undirected projection.
    fn average_clustering(&self) -> f64 {
        let n = self.node_count();
        if n == 0 {
            return 0.0;
        }

        let mut neighbors: Vec<HashSet<usize>> = vec![HashSet::new(); n];
        for edge in self.graph.edge_references() {
            let (a, b) = (edge.source().index(), edge.target().index());
            if a != b {
                neighbors[a].insert(b);
                neighbors[b].insert(a);
            }
        }

        let total: f64 = (0..n)
            .map(|v| {
                let adjacent: Vec<usize> = neighbors[v].iter().copied().collect();
                let k = adjacent.len();
                if k < 2 {
                    return 0.0;
                }
                let mut links = 0usize;
                for (i, &a) in adjacent.iter().enumerate() {
                    for &b in &adjacent[i + 1..] {
                        if neighbors[a].contains(&b) {
                            links += 1;
                        }
                    }
                }
                2.0 * links as f64 / (k as f64 * (k as f64 - 1.0))
            })
            .sum();
        total / n as f64
    }

    /// One cycle through the smallest node of the first cyclic component.
    fn fallback_cycle(&self, sccs: &[Vec<NodeIndex>]) -> Option<Vec<NodeIndex>> {
        if let Some(edge) = self
            .graph
            .edge_references()
            .filter(|e| e.source() == e.target())
            .min_by_key(|e| e.source().index())
        {
            return Some(vec![edge.source()]);
        }

        let scc = sccs.iter().filter(|scc| scc.len() > 1).min_by_key(|scc| {
            scc.iter().map(|n| n.index()).min().unwrap_or(usize::MAX)
        })?;
        let members: HashSet<NodeIndex> = scc.iter().copied().collect();
        let start = *scc.iter().min_by_key(|n| n.index())?;

        // shortest path start -> ... -> start inside the component
        let mut parent: BTreeMap<NodeIndex, NodeIndex> = BTreeMap::new();
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for next in self.sorted_successors(node) {
                if !members.contains(&next) {
                    continue;
                }
                if next == start {
                    let mut cycle = vec![node];
                    let mut cur = node;
                    while let Some(&p) = parent.get(&cur) {
                        cycle.push(p);
                        cur = p;
                    }
                    cycle.reverse();
                    return Some(cycle);
                }
                if next != start && !parent.contains_key(&next) {
                    parent.insert(next, node);
                    queue.push_back(next);
                }
            }
        }
        None
    }

    fn sorted_successors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut next: Vec<NodeIndex> = self.graph.neighbors(node).collect();
        next.sort_by_key(|n| n.index());
        next.dedup();
        next
    }
}

/// Bounded enumeration of elementary cycles. Each cycle is found once, from
/// its smallest node, by only stepping to larger nodes of the same component.
struct CycleSearch {
    cycles: Vec<Vec<NodeIndex>>,
    steps: usize,
    truncated: bool,
}

impl CycleSearch {
    fn run(graph: &DependencyGraph, component: &[usize]) -> Self {
        let mut search = CycleSearch {
            cycles: Vec::new(),
            steps: 0,
            truncated: false,
        };

        for start in graph.graph.node_indices() {
            let mut path = vec![start];
            let mut on_path = HashSet::from([start]);
            search.extend(graph, component, start, &mut path, &mut on_path);
            if search.truncated {
                break;
            }
        }
        search
    }

    fn extend(
        &mut self,
        graph: &DependencyGraph,
        component: &[usize],
        start: NodeIndex,
        path: &mut Vec<NodeIndex>,
        on_path: &mut HashSet<NodeIndex>,
    ) {
        let Some(&node) = path.last() else {
            return;
        };

        for next in graph.sorted_successors(node) {
            self.steps += 1;
            if self.steps > CYCLE_STEP_BUDGET || self.cycles.len() >= MAX_COUNTED_CYCLES {
                self.truncated = true;
                return;
            }
            if component[next.index()] != component[start.index()] || next.index() < start.index() {
                continue;
            }
            if next == start {
                self.cycles.push(path.clone());
            } else if !on_path.contains(&next) {
                path.push(next);
                on_path.insert(next);
                self.extend(graph, component, start, path, on_path);
                on_path.remove(&next);
                path.pop();
                if self.truncated {
                    return;
                }
            }
        }
    }
}

/// Class names an import string can refer to.
///
/// - `from m import A, B as C` -> `A`, `B`; `import a.b` -> `b`
/// - `./services/api.js` -> `api`
/// - `com.example.Foo` -> `Foo`
pub fn import_targets(import: &str) -> Vec<String> {
    let import = import.trim();

    if let Some(rest) = import.strip_prefix("from ") {
        let names = rest.split_once(" import ").map(|(_, names)| names).unwrap_or("");
        return split_names(names)
            .into_iter()
            .filter(|n| *n != "*")
            .map(str::to_string)
            .collect();
    }
    if let Some(rest) = import.strip_prefix("import ") {
        return split_names(rest)
            .into_iter()
            .map(|module| last_segment(module).to_string())
            .collect();
    }
    if import.contains('/') {
        let file = import.rsplit('/').next().unwrap_or(import);
        let stem = file.split('.').next().unwrap_or(file);
        return if stem.is_empty() { Vec::new() } else { vec![stem.to_string()] };
    }

    let target = last_segment(import);
    if target.is_empty() || target == "*" {
        Vec::new()
    } else {
        vec![target.to_string()]
    }
}

/// `(A, B as C)` -> `A`, `B`
fn split_names(list: &str) -> Vec<&str> {
    list.trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split(',')
        .filter_map(|part| part.split_whitespace().next())
        .collect()
}

/// Names of classes whose imports resolve to no known class.
pub fn external_dependencies(classes: &[LanguageClass]) -> Vec<String> {
    let known: BTreeSet<&str> = classes.iter().map(|c| c.name.as_str()).collect();
    let mut external = BTreeSet::new();
    for class in classes {
        for import in &class.imports {
            let targets = import_targets(import);
            if !targets.iter().any(|t| known.contains(t.as_str())) {
                external.insert(import.clone());
            }
        }
    }
    external.into_iter().collect()
}
