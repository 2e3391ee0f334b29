//! Classification-code relatedness graph.
//!
//! Edges are unordered and unweighted. Expansion walks the graph breadth-first
//! from every seed and stops after a fixed number of hops.

use crate::config::CodeRelation;
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Hand-maintained relations between the scheduling/IPC subgroups of G06F 9.
pub const DEFAULT_RELATIONS: &[(&str, &str)] = &[
    ("G06F9/50", "G06F9/52"),
    ("G06F9/52", "G06F9/54"),
    ("G06F9/54", "G06F9/56"),
    ("G06F9/48", "G06F9/50"),
];

/// Anything that can widen a set of codes to related codes.
pub trait CodeExpander: Send + Sync {
    /// Every code reachable from a seed within `hops` edges, seeds included.
    fn expand(&self, seeds: &BTreeSet<String>, hops: usize) -> BTreeSet<String>;
}

#[derive(Debug, Clone, Default)]
pub struct ClassificationGraph {
    graph: UnGraph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
}

impl ClassificationGraph {
    /// Build from unordered code pairs. Repeated edges collapse; a self pair
    /// only registers the code.
    pub fn build<I, A, B>(edges: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        let mut out = Self::default();
        for (a, b) in edges {
            let a = out.node(a.into());
            let b = out.node(b.into());
            if a != b {
                out.graph.update_edge(a, b, ());
            }
        }
        out
    }

    pub fn with_default_relations() -> Self {
        Self::build(DEFAULT_RELATIONS.iter().copied())
    }

    pub fn from_relations(relations: &[CodeRelation]) -> Self {
        Self::build(relations.iter().map(|r| (r.from.clone(), r.to.clone())))
    }

    fn node(&mut self, code: String) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(&code) {
            return idx;
        }
        let idx = self.graph.add_node(code.clone());
        self.nodes.insert(code, idx);
        idx
    }

    pub fn contains(&self, code: &str) -> bool {
        self.nodes.contains_key(code)
    }

    pub fn code_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn relation_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Direct neighbours of `code`; empty for unknown codes.
    pub fn related(&self, code: &str) -> BTreeSet<String> {
        let Some(&idx) = self.nodes.get(code) else {
            return BTreeSet::new();
        };
        self.graph
            .neighbors(idx)
            .map(|n| self.graph[n].clone())
            .collect()
    }

    pub fn expand(&self, seeds: &BTreeSet<String>, hops: usize) -> BTreeSet<String> {
        let mut expanded = seeds.clone();
        if hops == 0 {
            return expanded;
        }

        for seed in seeds {
            // Codes outside the graph expand to themselves only.
            let Some(&start) = self.nodes.get(seed.as_str()) else {
                continue;
            };

            let mut visited: HashSet<NodeIndex> = HashSet::new();
            let mut queue: VecDeque<(NodeIndex, usize)> = VecDeque::new();
            visited.insert(start);
            queue.push_back((start, 0));

            while let Some((current, dist)) = queue.pop_front() {
                if dist >= hops {
                    continue;
                }
                for neighbour in self.graph.neighbors(current) {
                    if visited.insert(neighbour) {
                        expanded.insert(self.graph[neighbour].clone());
                        queue.push_back((neighbour, dist + 1));
                    }
                }
            }
        }

        expanded
    }
}

impl CodeExpander for ClassificationGraph {
    fn expand(&self, seeds: &BTreeSet<String>, hops: usize) -> BTreeSet<String> {
        ClassificationGraph::expand(self, seeds, hops)
    }
}
