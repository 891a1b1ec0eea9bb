//! Graph container consumed by the force engine.
//!
//! Vertices are addressed by dense indices; the id index only serves lookups at the API
//! boundary. Edges are directed, but layout treats them as undirected through the paired
//! out/in adjacency lists.

use crate::error::{Error, Result};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub id: String,
    pub x: f64,
    pub y: f64,
    /// Displacement accumulated during one force iteration.
    pub dx: f64,
    pub dy: f64,
    /// Fixed vertices keep their coordinates through simulation and normalization.
    pub fixed: bool,
    /// Hidden vertices take part in simulation only; they never become Voronoi sites.
    pub hidden: bool,
}

impl Vertex {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            x: 0.0,
            y: 0.0,
            dx: 0.0,
            dy: 0.0,
            fixed: false,
            hidden: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
    /// Attraction multiplier.
    pub weight: f64,
    pub hidden: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    index: FxHashMap<String, usize>,
    out_edges: Vec<Vec<usize>>,
    in_edges: Vec<Vec<usize>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertices: usize, edges: usize) -> Self {
        let mut index = FxHashMap::default();
        index.reserve(vertices);
        Self {
            vertices: Vec::with_capacity(vertices),
            edges: Vec::with_capacity(edges),
            index,
            out_edges: Vec::with_capacity(vertices),
            in_edges: Vec::with_capacity(vertices),
        }
    }

    /// Adds a vertex at the origin.
    pub fn add_vertex(&mut self, id: impl Into<String>) -> Result<usize> {
        self.insert_vertex(Vertex::new(id))
    }

    pub fn insert_vertex(&mut self, vertex: Vertex) -> Result<usize> {
        if self.index.contains_key(&vertex.id) {
            return Err(Error::DuplicateVertex { id: vertex.id });
        }
        let idx = self.vertices.len();
        self.index.insert(vertex.id.clone(), idx);
        self.vertices.push(vertex);
        self.out_edges.push(Vec::new());
        self.in_edges.push(Vec::new());
        Ok(idx)
    }

    /// Adds an edge between two existing vertex indices.
    ///
    /// Panics if either index is out of range.
    pub fn add_edge(&mut self, source: usize, target: usize, weight: f64, hidden: bool) -> usize {
        let idx = self.edges.len();
        self.edges.push(Edge {
            source,
            target,
            weight,
            hidden,
        });
        self.out_edges[source].push(idx);
        self.in_edges[target].push(idx);
        idx
    }

    pub fn add_edge_by_id(&mut self, from: &str, to: &str, weight: f64) -> Result<usize> {
        let missing = |id: &str| Error::MissingEndpoint {
            from: from.to_string(),
            to: to.to_string(),
            missing: id.to_string(),
        };
        let source = self.index_of(from).ok_or_else(|| missing(from))?;
        let target = self.index_of(to).ok_or_else(|| missing(to))?;
        Ok(self.add_edge(source, target, weight, false))
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn vertex(&self, idx: usize) -> &Vertex {
        &self.vertices[idx]
    }

    pub fn vertex_mut(&mut self, idx: usize) -> &mut Vertex {
        &mut self.vertices[idx]
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn vertices_mut(&mut self) -> &mut [Vertex] {
        &mut self.vertices
    }

    /// Mutable vertices alongside the (read-only) edge list.
    pub fn split_mut(&mut self) -> (&mut [Vertex], &[Edge]) {
        (&mut self.vertices, &self.edges)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn out_edges(&self, v: usize) -> &[usize] {
        &self.out_edges[v]
    }

    pub fn in_edges(&self, v: usize) -> &[usize] {
        &self.in_edges[v]
    }

    /// Undirected neighbours of `v`, through both edge directions.
    pub fn neighbors(&self, v: usize) -> impl Iterator<Item = usize> + '_ {
        let out = self.out_edges[v].iter().map(|&e| self.edges[e].target);
        let inc = self.in_edges[v].iter().map(|&e| self.edges[e].source);
        out.chain(inc)
    }

    /// Indices of the non-hidden vertices, in insertion order.
    pub fn active_vertices(&self) -> Vec<usize> {
        (0..self.vertices.len())
            .filter(|&v| !self.vertices[v].hidden)
            .collect()
    }

    /// Connected components over the undirected adjacency, skipping hidden vertices.
    ///
    /// Components are listed in order of their first vertex; members in discovery order.
    pub fn components(&self) -> Vec<Vec<usize>> {
        let mut seen = vec![false; self.vertices.len()];
        let mut out: Vec<Vec<usize>> = Vec::new();
        let mut stack: Vec<usize> = Vec::new();
        for start in 0..self.vertices.len() {
            if seen[start] || self.vertices[start].hidden {
                continue;
            }
            seen[start] = true;
            stack.push(start);
            let mut comp = Vec::new();
            while let Some(v) = stack.pop() {
                comp.push(v);
                for w in self.neighbors(v) {
                    if !seen[w] && !self.vertices[w].hidden {
                        seen[w] = true;
                        stack.push(w);
                    }
                }
            }
            out.push(comp);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(ids: &[&str], edges: &[(&str, &str)]) -> Graph {
        let mut g = Graph::new();
        for id in ids {
            g.add_vertex(*id).expect("vertex");
        }
        for (a, b) in edges {
            g.add_edge_by_id(a, b, 1.0).expect("edge");
        }
        g
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut g = graph(&["a"], &[]);
        let err = g.add_vertex("a").unwrap_err();
        assert!(matches!(err, Error::DuplicateVertex { ref id } if id == "a"));
    }

    #[test]
    fn missing_endpoint_names_the_culprit() {
        let mut g = graph(&["a", "b"], &[]);
        match g.add_edge_by_id("a", "z", 1.0).unwrap_err() {
            Error::MissingEndpoint { from, to, missing } => {
                assert_eq!((from.as_str(), to.as_str(), missing.as_str()), ("a", "z", "z"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn components_follow_both_directions() {
        let g = graph(
            &["a", "b", "c", "d", "e"],
            &[("b", "a"), ("c", "b"), ("d", "e")],
        );
        let mut comps: Vec<Vec<usize>> = g
            .components()
            .into_iter()
            .map(|mut c| {
                c.sort_unstable();
                c
            })
            .collect();
        comps.sort();
        assert_eq!(comps, vec![vec![0, 1, 2], vec![3, 4]]);
    }

    #[test]
    fn hidden_vertices_break_components() {
        let mut g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        g.vertex_mut(1).hidden = true;
        assert_eq!(g.components().len(), 2);
        assert_eq!(g.active_vertices(), vec![0, 2]);
    }

    #[test]
    fn neighbors_include_incoming_edges() {
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("c", "a")]);
        let mut n: Vec<usize> = g.neighbors(0).collect();
        n.sort_unstable();
        assert_eq!(n, vec![1, 2]);
        assert_eq!(g.out_edges(0).len(), 1);
        assert_eq!(g.in_edges(0).len(), 1);
    }
}
