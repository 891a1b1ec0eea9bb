//! Fruchterman-Reingold spring-electrical placement.
//!
//! The simulation runs on a scratch copy of the caller's graph. Every connected component
//! gets one hidden center vertex, linked to its members and to all other centers by hidden
//! edges, so disjoint components cannot drift apart under pure repulsion. The scratch copy
//! (centers included) is dropped once positions have been written back.

use super::rng::XorShift64Star;
use crate::error::Result;
use crate::geom::{Point, Rect};
use crate::graph::{Graph, Vertex};

#[derive(Debug, Clone)]
pub struct ForceOptions {
    pub iterations: usize,
    /// Repulsion multiplier `R`.
    pub repulsion: f64,
    /// Attraction multiplier `A`.
    pub attraction: f64,
    /// Lower clamp for pair distances.
    pub min_separation: f64,
    pub preserve_aspect: bool,
    /// Fraction of the bounds kept free on every side after normalization.
    pub margin: f64,
    pub random_seed: u64,
}

impl Default for ForceOptions {
    fn default() -> Self {
        Self {
            iterations: 400,
            repulsion: 1.0,
            attraction: 1.0,
            min_separation: 0.01,
            preserve_aspect: true,
            margin: 0.05,
            random_seed: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceStats {
    pub components: usize,
    pub iterations: usize,
}

/// Scratch view of the graph: the non-hidden input vertices followed by one center per
/// component.
struct SimGraph {
    graph: Graph,
    /// Scratch index -> caller index, for the input vertices.
    origin: Vec<usize>,
    components: usize,
}

impl SimGraph {
    fn from_graph(src: &Graph) -> Result<Self> {
        let components = src.components();
        let active = src.active_vertices();
        let mut graph = Graph::with_capacity(
            active.len() + components.len(),
            src.edge_count() + active.len() + components.len() * components.len() / 2,
        );
        let mut to_sim = vec![usize::MAX; src.vertex_count()];
        let mut origin = Vec::with_capacity(active.len());
        for &v in &active {
            let vertex = src.vertex(v);
            to_sim[v] = graph.insert_vertex(Vertex {
                dx: 0.0,
                dy: 0.0,
                ..vertex.clone()
            })?;
            origin.push(v);
        }
        for e in src.edges() {
            let (s, t) = (to_sim[e.source], to_sim[e.target]);
            if s != usize::MAX && t != usize::MAX && s != t {
                graph.add_edge(s, t, e.weight, e.hidden);
            }
        }

        let mut centers = Vec::with_capacity(components.len());
        for (c, members) in components.iter().enumerate() {
            let mut id = format!("component-center-{c}");
            while graph.index_of(&id).is_some() {
                id.push('\'');
            }
            let center = graph.insert_vertex(Vertex {
                hidden: true,
                ..Vertex::new(id)
            })?;
            for &m in members {
                graph.add_edge(center, to_sim[m], 1.0, true);
            }
            centers.push(center);
        }
        for (i, &a) in centers.iter().enumerate() {
            for &b in &centers[i + 1..] {
                graph.add_edge(a, b, 1.0, true);
            }
        }

        Ok(Self {
            graph,
            origin,
            components: components.len(),
        })
    }

    fn place_randomly(&mut self, bounds: &Rect, rng: &mut XorShift64Star) {
        for v in self.graph.vertices_mut() {
            if v.fixed {
                continue;
            }
            v.x = bounds.left + rng.next_f64_unit() * bounds.width();
            v.y = bounds.top + rng.next_f64_unit() * bounds.height();
        }
    }

    fn step(&mut self, k: f64, temperature: f64, opts: &ForceOptions, rng: &mut XorShift64Star) {
        let eps = opts.min_separation.max(f64::MIN_POSITIVE);
        let k2 = k * k;
        let verts = self.graph.vertices_mut();
        for v in verts.iter_mut() {
            v.dx = 0.0;
            v.dy = 0.0;
        }

        let n = verts.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let (mut ddx, mut ddy) = (verts[i].x - verts[j].x, verts[i].y - verts[j].y);
                let mut dist = (ddx * ddx + ddy * ddy).sqrt();
                if dist < eps {
                    // Coincident pair: push apart along a random direction.
                    let a = rng.next_f64_unit() * std::f64::consts::TAU;
                    ddx = a.cos() * eps;
                    ddy = a.sin() * eps;
                    dist = eps;
                }
                let f = opts.repulsion * k2 / dist;
                let (fx, fy) = (ddx / dist * f, ddy / dist * f);
                verts[i].dx += fx;
                verts[i].dy += fy;
                verts[j].dx -= fx;
                verts[j].dy -= fy;
            }
        }

        let (verts, edges) = self.graph.split_mut();
        for e in edges {
            let (s, t) = (e.source, e.target);
            let (ddx, ddy) = (verts[s].x - verts[t].x, verts[s].y - verts[t].y);
            let raw = (ddx * ddx + ddy * ddy).sqrt();
            if raw == 0.0 {
                continue;
            }
            let dist = raw.max(eps);
            let f = opts.attraction * e.weight * dist * dist / k;
            let (fx, fy) = (ddx / raw * f, ddy / raw * f);
            verts[s].dx -= fx;
            verts[s].dy -= fy;
            verts[t].dx += fx;
            verts[t].dy += fy;
        }

        for v in self.graph.vertices_mut() {
            if v.fixed {
                continue;
            }
            let len = (v.dx * v.dx + v.dy * v.dy).sqrt();
            if len > 0.0 {
                let capped = len.min(temperature);
                v.x += v.dx / len * capped;
                v.y += v.dy / len * capped;
            }
        }
    }

    /// Rescales the free input vertices into `bounds` shrunk by the margin.
    fn normalize(&mut self, bounds: &Rect, opts: &ForceOptions) {
        let free: Vec<usize> = (0..self.origin.len())
            .filter(|&v| !self.graph.vertex(v).fixed)
            .collect();
        if free.is_empty() {
            return;
        }
        let mut min = Point::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &v in &free {
            let p = self.graph.vertex(v);
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }

        let target = bounds.expanded(-2.0 * opts.margin.clamp(0.0, 0.45));
        let (w, h) = (max.x - min.x, max.y - min.y);
        let mut sx = if w > 0.0 { target.width() / w } else { 0.0 };
        let mut sy = if h > 0.0 { target.height() / h } else { 0.0 };
        if opts.preserve_aspect {
            let s = match (w > 0.0, h > 0.0) {
                (true, true) => sx.min(sy),
                (true, false) => sx,
                (false, true) => sy,
                (false, false) => 0.0,
            };
            sx = s;
            sy = s;
        }
        let mid = Point::new((min.x + max.x) / 2.0, (min.y + max.y) / 2.0);
        let center = target.center();
        for &v in &free {
            let p = self.graph.vertex_mut(v);
            p.x = center.x + (p.x - mid.x) * sx;
            p.y = center.y + (p.y - mid.y) * sy;
        }
    }
}

/// Places every non-fixed, non-hidden vertex of `graph` inside `bounds`.
pub fn layout(graph: &mut Graph, bounds: &Rect, opts: &ForceOptions) -> Result<ForceStats> {
    let mut sim = SimGraph::from_graph(graph)?;
    let mut rng = XorShift64Star::new(opts.random_seed);
    sim.place_randomly(bounds, &mut rng);

    let k = (bounds.area() / 45.0).sqrt();
    let t0 = bounds.width() / 10.0;
    for i in 0..opts.iterations {
        let temperature = t0 * (1.0 - i as f64 / opts.iterations as f64);
        sim.step(k, temperature, opts, &mut rng);
    }
    sim.normalize(bounds, opts);

    for (s, &v) in sim.origin.iter().enumerate() {
        let p = sim.graph.vertex(s);
        if p.fixed {
            continue;
        }
        let dst = graph.vertex_mut(v);
        dst.x = p.x;
        dst.y = p.y;
        dst.dx = 0.0;
        dst.dy = 0.0;
    }

    tracing::debug!(
        vertices = sim.origin.len(),
        components = sim.components,
        iterations = opts.iterations,
        "force layout finished"
    );
    Ok(ForceStats {
        components: sim.components,
        iterations: opts.iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(n: usize) -> Graph {
        let mut g = Graph::new();
        for i in 0..n {
            g.add_vertex(format!("v{i}")).expect("vertex");
        }
        for i in 1..n {
            g.add_edge(i - 1, i, 1.0, false);
        }
        g
    }

    #[test]
    fn positions_land_inside_the_margin() {
        let mut g = path(6);
        let bounds = Rect::from_size(300.0, 200.0);
        layout(&mut g, &bounds, &ForceOptions::default()).expect("layout");
        let inner = bounds.expanded(-0.1);
        for v in g.vertices() {
            assert!(inner.contains(Point::new(v.x, v.y)), "{v:?}");
        }
    }

    #[test]
    fn same_seed_is_deterministic() {
        let bounds = Rect::from_size(100.0, 100.0);
        let opts = ForceOptions {
            random_seed: 9,
            iterations: 50,
            ..Default::default()
        };
        let mut a = path(5);
        let mut b = path(5);
        layout(&mut a, &bounds, &opts).expect("layout");
        layout(&mut b, &bounds, &opts).expect("layout");
        assert_eq!(a.vertices(), b.vertices());
    }

    #[test]
    fn fixed_vertices_stay_put() {
        let mut g = path(4);
        {
            let v = g.vertex_mut(2);
            v.fixed = true;
            v.x = 7.0;
            v.y = -3.0;
        }
        layout(&mut g, &Rect::from_size(50.0, 50.0), &ForceOptions::default()).expect("layout");
        assert_eq!((g.vertex(2).x, g.vertex(2).y), (7.0, -3.0));
    }

    #[test]
    fn component_centers_do_not_leak() {
        let mut g = path(3);
        let d = g.add_vertex("d").expect("vertex");
        let e = g.add_vertex("e").expect("vertex");
        g.add_edge(d, e, 1.0, false);
        let stats = layout(&mut g, &Rect::from_size(100.0, 100.0), &ForceOptions::default())
            .expect("layout");
        assert_eq!(stats.components, 2);
        assert_eq!(g.vertex_count(), 5);
        assert_eq!(g.edge_count(), 3);
    }

    #[test]
    fn adjacent_vertices_end_closer_than_distant_ones() {
        let mut g = path(8);
        let opts = ForceOptions {
            random_seed: 3,
            ..Default::default()
        };
        layout(&mut g, &Rect::from_size(400.0, 400.0), &opts).expect("layout");
        let d = |a: usize, b: usize| {
            let (p, q) = (g.vertex(a), g.vertex(b));
            Point::new(p.x, p.y).distance(Point::new(q.x, q.y))
        };
        assert!(d(0, 1) < d(0, 7));
    }
}
