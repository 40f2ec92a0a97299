//! Weighted graph algorithms: shortest paths and minimum spanning trees.

use super::{check_len, check_magnitude, Algorithm, Trace};
use crate::error::{Error, Result};
use crate::store::LineRange;

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

const MAX_NODES: usize = 26;
const MAX_EDGES: usize = 128;

/// A weighted edge between two node indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: usize,
    pub to: usize,
    pub weight: i64,
}

impl Edge {
    pub const fn new(from: usize, to: usize, weight: i64) -> Self {
        Self { from, to, weight }
    }
}

/// Node labels plus a weighted edge list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<String>,
    pub edges: Vec<Edge>,
}

impl Graph {
    fn labelled(labels: &[&str], edges: &[Edge]) -> Self {
        Self {
            nodes: labels.iter().map(|l| l.to_string()).collect(),
            edges: edges.to_vec(),
        }
    }

    fn validate(&self) -> Result<()> {
        check_len("nodes", self.nodes.len(), 1, MAX_NODES)?;
        check_len("edges", self.edges.len(), 0, MAX_EDGES)?;
        let n = self.nodes.len();
        if let Some(edge) = self.edges.iter().find(|e| e.from >= n || e.to >= n) {
            return Err(Error::InvalidInput(format!(
                "edge {} -> {} references a node outside 0..{}",
                edge.from, edge.to, n
            )));
        }
        for edge in &self.edges {
            check_magnitude("edge weight", edge.weight)?;
        }
        Ok(())
    }

    fn check_source(&self, source: usize) -> Result<()> {
        if source >= self.nodes.len() {
            return Err(Error::InvalidInput(format!(
                "source {} outside 0..{}",
                source,
                self.nodes.len()
            )));
        }
        Ok(())
    }

    fn adjacency(&self, directed: bool) -> Vec<Vec<(usize, i64)>> {
        let mut adj = vec![Vec::new(); self.nodes.len()];
        for edge in &self.edges {
            adj[edge.from].push((edge.to, edge.weight));
            if !directed {
                adj[edge.to].push((edge.from, edge.weight));
            }
        }
        adj
    }

    /// Edge list with both directions for undirected graphs.
    fn arcs(&self, directed: bool) -> Vec<Edge> {
        let mut arcs = self.edges.clone();
        if !directed {
            arcs.extend(self.edges.iter().map(|e| Edge::new(e.to, e.from, e.weight)));
        }
        arcs
    }

    fn name(&self, index: usize) -> &str {
        &self.nodes[index]
    }

    fn describe(&self, distances: &[Option<i64>]) -> String {
        distances
            .iter()
            .enumerate()
            .map(|(i, d)| match d {
                Some(d) => format!("{}={}", self.name(i), d),
                None => format!("{}=unreachable", self.name(i)),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn describe_tree(&self, tree: &[Edge]) -> String {
        tree.iter()
            .map(|e| format!("{}-{}({})", self.name(e.from), self.name(e.to), e.weight))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for Graph {
    /// Six-node undirected demo graph.
    fn default() -> Self {
        Self::labelled(
            &["A", "B", "C", "D", "E", "F"],
            &[
                Edge::new(0, 1, 4),
                Edge::new(0, 2, 2),
                Edge::new(1, 2, 1),
                Edge::new(1, 3, 5),
                Edge::new(2, 3, 8),
                Edge::new(2, 4, 10),
                Edge::new(3, 4, 2),
                Edge::new(3, 5, 6),
                Edge::new(4, 5, 3),
            ],
        )
    }
}

/// Dijkstra's single-source shortest paths (non-negative weights).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Dijkstra {
    pub graph: Graph,
    pub source: usize,
    pub directed: bool,
}

const DIJKSTRA: &str = "\
dist[*] = inf; dist[s] = 0
pq.push((0, s))
while pq is not empty:
    (d, u) = pq.pop_min()
    if d > dist[u]: continue
    for (v, w) in adj[u]:
        if dist[u] + w < dist[v]:
            dist[v] = dist[u] + w; pq.push((dist[v], v))";

impl Algorithm for Dijkstra {
    fn source(&self) -> &'static str {
        DIJKSTRA
    }

    fn validate(&self) -> Result<()> {
        self.graph.validate()?;
        self.graph.check_source(self.source)?;
        if self.graph.edges.iter().any(|e| e.weight < 0) {
            return Err(Error::InvalidInput(
                "Dijkstra requires non-negative weights".to_string(),
            ));
        }
        Ok(())
    }

    fn trace(&self) -> Trace {
        let g = &self.graph;
        let adj = g.adjacency(self.directed);
        let mut dist: Vec<Option<i64>> = vec![None; g.nodes.len()];
        let mut t = Trace::new();

        dist[self.source] = Some(0);
        let mut queue = BinaryHeap::new();
        queue.push(Reverse((0i64, self.source)));
        t.span(
            LineRange::new(1, 2),
            format!("Start at {} with distance 0", g.name(self.source)),
        );

        while let Some(Reverse((d, u))) = queue.pop() {
            if dist[u].is_some_and(|best| d > best) {
                t.at(5, format!("Skip stale entry {} ({})", g.name(u), d));
                continue;
            }
            t.at(4, format!("Visit {} at distance {}", g.name(u), d));
            for &(v, w) in &adj[u] {
                let candidate = d + w;
                if dist[v].map_or(true, |current| candidate < current) {
                    dist[v] = Some(candidate);
                    queue.push(Reverse((candidate, v)));
                    t.span(
                        LineRange::new(7, 8),
                        format!(
                            "Relax {}-{}: distance of {} becomes {}",
                            g.name(u),
                            g.name(v),
                            g.name(v),
                            candidate
                        ),
                    );
                }
            }
        }

        t.note(format!(
            "Distances from {}: {}",
            g.name(self.source),
            g.describe(&dist)
        ));
        t
    }
}

/// Bellman-Ford single-source shortest paths with negative-cycle detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BellmanFord {
    pub graph: Graph,
    pub source: usize,
    pub directed: bool,
}

impl Default for BellmanFord {
    fn default() -> Self {
        Self {
            graph: Graph::labelled(
                &["s", "t", "x", "y", "z"],
                &[
                    Edge::new(0, 1, 6),
                    Edge::new(0, 3, 7),
                    Edge::new(1, 2, 5),
                    Edge::new(1, 3, 8),
                    Edge::new(1, 4, -4),
                    Edge::new(2, 1, -2),
                    Edge::new(3, 2, -3),
                    Edge::new(3, 4, 9),
                    Edge::new(4, 0, 2),
                    Edge::new(4, 2, 7),
                ],
            ),
            source: 0,
            directed: true,
        }
    }
}

const BELLMAN_FORD: &str = "\
dist[*] = inf; dist[s] = 0
repeat n - 1 times:
    for (u, v, w) in edges:
        if dist[u] + w < dist[v]:
            dist[v] = dist[u] + w
for (u, v, w) in edges:
    if dist[u] + w < dist[v]: report negative cycle";

impl Algorithm for BellmanFord {
    fn source(&self) -> &'static str {
        BELLMAN_FORD
    }

    fn validate(&self) -> Result<()> {
        self.graph.validate()?;
        self.graph.check_source(self.source)
    }

    fn trace(&self) -> Trace {
        let g = &self.graph;
        let arcs = g.arcs(self.directed);
        let n = g.nodes.len();
        let mut dist: Vec<Option<i64>> = vec![None; n];
        let mut t = Trace::new();

        dist[self.source] = Some(0);
        t.at(1, format!("Start at {} with distance 0", g.name(self.source)));

        for round in 1..n {
            t.at(2, format!("Round {}", round));
            let mut changed = false;
            for arc in &arcs {
                let Some(du) = dist[arc.from] else {
                    continue;
                };
                let candidate = du + arc.weight;
                if dist[arc.to].map_or(true, |dv| candidate < dv) {
                    dist[arc.to] = Some(candidate);
                    changed = true;
                    t.span(
                        LineRange::new(4, 5),
                        format!(
                            "Relax {}->{}: distance of {} becomes {}",
                            g.name(arc.from),
                            g.name(arc.to),
                            g.name(arc.to),
                            candidate
                        ),
                    );
                }
            }
            if !changed {
                t.at(2, format!("No change in round {}, stopping early", round));
                break;
            }
        }

        let cycle = arcs.iter().find(|arc| match (dist[arc.from], dist[arc.to]) {
            (Some(du), Some(dv)) => du + arc.weight < dv,
            (Some(_), None) => true,
            _ => false,
        });
        match cycle {
            Some(arc) => {
                t.at(
                    7,
                    format!(
                        "Edge {}->{} still relaxes: negative cycle",
                        g.name(arc.from),
                        g.name(arc.to)
                    ),
                );
                t.note(format!(
                    "Negative cycle reachable from {}",
                    g.name(self.source)
                ));
            }
            None => {
                t.span(LineRange::new(6, 7), "No negative cycle");
                t.note(format!(
                    "Distances from {}: {}",
                    g.name(self.source),
                    g.describe(&dist)
                ));
            }
        }
        t
    }
}

/// Union-find with path halving.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Returns `false` when both already share a set.
    fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        self.parent[rb] = ra;
        true
    }
}

/// Kruskal's minimum spanning tree (or forest).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Kruskal {
    pub graph: Graph,
}

const KRUSKAL: &str = "\
sort edges by weight
for (u, v, w) in edges:
    if find(u) != find(v):
        union(u, v); mst.add((u, v, w))
    else: skip, it would close a cycle";

fn summarize_tree(g: &Graph, tree: &[Edge], connected: bool) -> String {
    let weight: i64 = tree.iter().map(|e| e.weight).sum();
    let kind = if connected {
        "MST"
    } else {
        "Minimum spanning forest"
    };
    format!("{} weight {}: {}", kind, weight, g.describe_tree(tree))
}

impl Algorithm for Kruskal {
    fn source(&self) -> &'static str {
        KRUSKAL
    }

    fn validate(&self) -> Result<()> {
        self.graph.validate()
    }

    fn trace(&self) -> Trace {
        let g = &self.graph;
        let mut edges = g.edges.clone();
        edges.sort_by_key(|e| e.weight);
        let mut t = Trace::new();
        t.at(1, format!("Sorted edges: {}", g.describe_tree(&edges)));

        let mut sets = DisjointSet::new(g.nodes.len());
        let mut tree = Vec::new();
        for edge in edges {
            let label = format!("{}-{}({})", g.name(edge.from), g.name(edge.to), edge.weight);
            if sets.union(edge.from, edge.to) {
                tree.push(edge);
                t.span(LineRange::new(3, 4), format!("Take {}", label));
            } else {
                t.at(5, format!("Skip {}: would close a cycle", label));
            }
        }

        let connected = tree.len() + 1 == g.nodes.len();
        t.note(summarize_tree(g, &tree, connected));
        t
    }
}

/// Prim's minimum spanning tree grown from `source`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Prim {
    pub graph: Graph,
    pub source: usize,
}

const PRIM: &str = "\
in_tree = {s}; pq = edges leaving s
while pq is not empty:
    (w, u, v) = pq.pop_min()
    if v in in_tree: continue
    add v to in_tree; mst.add((u, v, w))
    for (x, w2) in adj[v] with x not in in_tree: pq.push((w2, v, x))";

impl Algorithm for Prim {
    fn source(&self) -> &'static str {
        PRIM
    }

    fn validate(&self) -> Result<()> {
        self.graph.validate()?;
        self.graph.check_source(self.source)
    }

    fn trace(&self) -> Trace {
        let g = &self.graph;
        let adj = g.adjacency(false);
        let mut in_tree = vec![false; g.nodes.len()];
        let mut queue = BinaryHeap::new();
        let mut tree = Vec::new();
        let mut t = Trace::new();

        in_tree[self.source] = true;
        for &(v, w) in &adj[self.source] {
            queue.push(Reverse((w, self.source, v)));
        }
        t.at(1, format!("Start tree at {}", g.name(self.source)));

        while let Some(Reverse((w, u, v))) = queue.pop() {
            if in_tree[v] {
                t.at(4, format!("Skip {}-{}: {} already in tree", g.name(u), g.name(v), g.name(v)));
                continue;
            }
            in_tree[v] = true;
            tree.push(Edge::new(u, v, w));
            t.span(
                LineRange::new(3, 5),
                format!("Take {}-{}({})", g.name(u), g.name(v), w),
            );
            for &(x, w2) in &adj[v] {
                if !in_tree[x] {
                    queue.push(Reverse((w2, v, x)));
                }
            }
        }

        let connected = in_tree.iter().all(|&inside| inside);
        t.note(summarize_tree(g, &tree, connected));
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dijkstra_demo() {
        let trace = Dijkstra::default().trace();
        assert_eq!(
            trace.last_message(),
            Some("Distances from A: A=0, B=3, C=2, D=8, E=10, F=13")
        );
    }

    #[test]
    fn test_dijkstra_unreachable() {
        let dijkstra = Dijkstra {
            graph: Graph::labelled(&["P", "Q", "R"], &[Edge::new(0, 1, 7)]),
            source: 0,
            directed: false,
        };
        assert_eq!(
            dijkstra.trace().last_message(),
            Some("Distances from P: P=0, Q=7, R=unreachable")
        );
    }

    #[test]
    fn test_dijkstra_rejects_negative_weights() {
        let dijkstra = Dijkstra {
            graph: Graph::labelled(&["P", "Q"], &[Edge::new(0, 1, -1)]),
            source: 0,
            directed: true,
        };
        assert!(dijkstra.validate().is_err());
    }

    #[test]
    fn test_graph_validation() {
        let bad_edge = Kruskal {
            graph: Graph::labelled(&["P"], &[Edge::new(0, 3, 1)]),
        };
        assert!(bad_edge.validate().is_err());

        let bad_source = Prim {
            graph: Graph::default(),
            source: 9,
        };
        assert!(bad_source.validate().is_err());
    }

    #[test]
    fn test_bellman_ford_demo() {
        let trace = BellmanFord::default().trace();
        assert_eq!(
            trace.last_message(),
            Some("Distances from s: s=0, t=2, x=4, y=7, z=-2")
        );
    }

    #[test]
    fn test_bellman_ford_negative_cycle() {
        let bellman_ford = BellmanFord {
            graph: Graph::labelled(
                &["a", "b", "c"],
                &[Edge::new(0, 1, 1), Edge::new(1, 2, -2), Edge::new(2, 1, 1)],
            ),
            source: 0,
            directed: true,
        };
        assert_eq!(
            bellman_ford.trace().last_message(),
            Some("Negative cycle reachable from a")
        );
    }

    #[test]
    fn test_bellman_ford_matches_dijkstra_on_positive_graph() {
        let bellman_ford = BellmanFord {
            graph: Graph::default(),
            source: 0,
            directed: false,
        };
        assert_eq!(
            bellman_ford.trace().last_message(),
            Dijkstra::default().trace().last_message()
        );
    }

    #[test]
    fn test_kruskal_demo() {
        let trace = Kruskal::default().trace();
        assert_eq!(
            trace.last_message(),
            Some("MST weight 13: B-C(1), A-C(2), D-E(2), E-F(3), B-D(5)")
        );
        assert!(trace.messages().any(|m| m == "Skip A-B(4): would close a cycle"));
    }

    #[test]
    fn test_prim_demo() {
        let trace = Prim::default().trace();
        assert_eq!(
            trace.last_message(),
            Some("MST weight 13: A-C(2), C-B(1), B-D(5), D-E(2), E-F(3)")
        );
    }

    #[test]
    fn test_spanning_forest() {
        let graph = Graph::labelled(&["P", "Q", "R"], &[Edge::new(0, 1, 4)]);
        let kruskal = Kruskal {
            graph: graph.clone(),
        };
        assert_eq!(
            kruskal.trace().last_message(),
            Some("Minimum spanning forest weight 4: P-Q(4)")
        );
        let prim = Prim { graph, source: 0 };
        assert_eq!(
            prim.trace().last_message(),
            Some("Minimum spanning forest weight 4: P-Q(4)")
        );
    }
}
