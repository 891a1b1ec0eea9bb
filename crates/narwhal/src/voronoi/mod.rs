//! Planar Voronoi diagrams bounded by a rectangle (Fortune's sweep).
//!
//! The sweep line moves towards increasing `y`. The beachline and the circle-event queue are
//! both kept in [`rbtree::RbTree`]s: the beachline is ordered by the arcs' visual position,
//! recomputed from the directrix while descending, and the circle events by `(y, x)`.
//! After the sweep, open edges are connected to the rectangle, clipped, and every touched
//! cell is closed by walking the rectangle border.

mod diagram;
pub mod rbtree;

pub use diagram::{Cell, Diagram, Edge, Halfedge};

use crate::geom::{
    EPSILON, Point, Rect, equal_with_epsilon, greater_than_with_epsilon, less_than_with_epsilon,
};
use rbtree::{NodeId, RbTree};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DiagramError {
    #[error("bounding rectangle has no area: {0:?}")]
    EmptyBounds(Rect),
    #[error("cell {cell} cannot be closed against the bounding rectangle")]
    UnclosableCell { cell: usize },
    #[error("beachline lost the neighbours of a collapsing arc")]
    MalformedBeachline,
}

#[derive(Debug, Clone, Copy)]
struct Arc {
    cell: usize,
    /// Edge traced by this arc's left breakpoint.
    edge: Option<usize>,
    circle: Option<NodeId>,
}

#[derive(Debug, Clone, Copy)]
struct CircleEvent {
    arc: NodeId,
    x: f64,
    /// Sweep position at which the event fires (bottom of the circle).
    y: f64,
    y_center: f64,
}

#[derive(Debug, Clone, Copy)]
struct WorkEdge {
    left: usize,
    right: Option<usize>,
    start: Option<usize>,
    end: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
struct Retired {
    node: NodeId,
    cell: usize,
    edge: Option<usize>,
}

/// Reusable diagram builder. Storage handed back through [`Builder::recycle`] is reused by
/// the next [`Builder::compute`] call.
#[derive(Debug, Default)]
pub struct Builder {
    beachline: RbTree<Arc>,
    circles: RbTree<CircleEvent>,
    vertices: Vec<Point>,
    edges: Vec<WorkEdge>,
    cells: Vec<Cell>,
    out_edges: Vec<Edge>,
    spare_halfedges: Vec<Vec<Halfedge>>,
}

/// x-coordinate where the parabolas of `left` and `right` cross for the given directrix.
///
/// A focus lying on the directrix degenerates into a vertical half-line at its own `x`.
pub fn breakpoint_x(left: Point, right: Point, directrix: f64) -> f64 {
    let (rfocx, rfocy) = (right.x, right.y);
    let pby2 = rfocy - directrix;
    if pby2 == 0.0 {
        return rfocx;
    }
    let (lfocx, lfocy) = (left.x, left.y);
    let plby2 = lfocy - directrix;
    if plby2 == 0.0 {
        return lfocx;
    }
    let hl = lfocx - rfocx;
    let aby2 = 1.0 / pby2 - 1.0 / plby2;
    let b = hl / plby2;
    if aby2 != 0.0 {
        let disc = b * b
            - 2.0 * aby2 * (hl * hl / (-2.0 * plby2) - lfocy + plby2 / 2.0 + rfocy - pby2 / 2.0);
        return (-b + disc.max(0.0).sqrt()) / aby2 + rfocx;
    }
    (rfocx + lfocx) / 2.0
}

/// Computes the diagram in one shot with a throwaway builder.
pub fn compute(sites: &[Point], bbox: Rect) -> Result<Diagram, DiagramError> {
    Builder::new().compute(sites, bbox)
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands a previous diagram back so its storage backs the next computation.
    pub fn recycle(&mut self, diagram: Diagram) {
        let Diagram {
            mut vertices,
            mut edges,
            mut cells,
        } = diagram;
        if vertices.capacity() > self.vertices.capacity() {
            vertices.clear();
            self.vertices = vertices;
        }
        if edges.capacity() > self.out_edges.capacity() {
            edges.clear();
            self.out_edges = edges;
        }
        for cell in cells.drain(..) {
            let mut hes = cell.halfedges;
            hes.clear();
            self.spare_halfedges.push(hes);
        }
        if cells.capacity() > self.cells.capacity() {
            self.cells = cells;
        }
    }

    /// Builds the diagram of `sites` clipped to `bbox`.
    ///
    /// Sites with identical coordinates share one cell (the first in sweep order wins);
    /// non-finite sites are ignored. Every returned cell is closed by the rectangle.
    pub fn compute(&mut self, sites: &[Point], bbox: Rect) -> Result<Diagram, DiagramError> {
        if !bbox.is_valid() {
            return Err(DiagramError::EmptyBounds(bbox));
        }
        self.reset();

        // Sorted descending so the next site event pops from the end.
        let mut queue: Vec<usize> = (0..sites.len())
            .filter(|&i| sites[i].is_finite())
            .collect();
        queue.sort_by(|&a, &b| {
            sites[b]
                .y
                .total_cmp(&sites[a].y)
                .then(sites[b].x.total_cmp(&sites[a].x))
        });

        let mut last_site: Option<Point> = None;
        loop {
            let circle = self.circles.first().map(|c| *self.circles.get(c));
            let next_site = queue.last().copied();
            let take_site = match (next_site, circle) {
                (Some(i), Some(c)) => {
                    let s = sites[i];
                    s.y < c.y || (s.y == c.y && s.x < c.x)
                }
                (Some(_), None) => true,
                (None, _) => false,
            };

            if take_site {
                let Some(i) = queue.pop() else {
                    break;
                };
                let site = sites[i];
                if last_site != Some(site) {
                    let cell = self.create_cell(site, i);
                    self.add_beachsection(cell);
                    last_site = Some(site);
                }
            } else if let Some(c) = circle {
                self.remove_beachsection(c.arc)?;
            } else {
                break;
            }
        }

        self.clip_edges(&bbox);
        self.close_cells(&bbox)?;
        Ok(self.finish())
    }

    fn reset(&mut self) {
        self.beachline.clear();
        self.circles.clear();
        self.vertices.clear();
        self.edges.clear();
        self.out_edges.clear();
        for cell in self.cells.drain(..) {
            let mut hes = cell.halfedges;
            hes.clear();
            self.spare_halfedges.push(hes);
        }
    }

    fn create_cell(&mut self, site: Point, source: usize) -> usize {
        let halfedges = self.spare_halfedges.pop().unwrap_or_default();
        self.cells.push(Cell {
            site,
            source,
            halfedges,
            needs_closing: false,
        });
        self.cells.len() - 1
    }

    fn create_vertex(&mut self, p: Point) -> usize {
        self.vertices.push(p);
        self.vertices.len() - 1
    }

    fn create_edge(
        &mut self,
        left: usize,
        right: usize,
        start: Option<usize>,
        end: Option<usize>,
    ) -> usize {
        let e = self.edges.len();
        self.edges.push(WorkEdge {
            left,
            right: Some(right),
            start: None,
            end: None,
        });
        if let Some(v) = start {
            self.set_edge_start(e, left, right, v);
        }
        if let Some(v) = end {
            self.set_edge_start(e, right, left, v);
        }
        let (ls, rs) = (self.cells[left].site, self.cells[right].site);
        self.cells[left].halfedges.push(Halfedge {
            site: left,
            edge: e,
            angle: (rs.y - ls.y).atan2(rs.x - ls.x),
        });
        self.cells[right].halfedges.push(Halfedge {
            site: right,
            edge: e,
            angle: (ls.y - rs.y).atan2(ls.x - rs.x),
        });
        e
    }

    fn create_border_edge(&mut self, cell: usize, start: usize, end: usize) -> Halfedge {
        let e = self.edges.len();
        self.edges.push(WorkEdge {
            left: cell,
            right: None,
            start: Some(start),
            end: Some(end),
        });
        let (va, vb) = (self.vertices[start], self.vertices[end]);
        Halfedge {
            site: cell,
            edge: e,
            angle: (vb.x - va.x).atan2(va.y - vb.y),
        }
    }

    /// Sets the endpoint of `e` seen as the start when walking from `left` to `right`.
    fn set_edge_start(&mut self, e: usize, left: usize, right: usize, vertex: usize) {
        let edge = &mut self.edges[e];
        if edge.start.is_none() && edge.end.is_none() {
            edge.start = Some(vertex);
            edge.left = left;
            edge.right = Some(right);
        } else if edge.left == right {
            edge.end = Some(vertex);
        } else {
            edge.start = Some(vertex);
        }
    }

    fn arc_site(&self, arc: NodeId) -> Point {
        self.cells[self.beachline.get(arc).cell].site
    }

    fn left_break_point(&self, arc: NodeId, directrix: f64) -> f64 {
        let site = self.arc_site(arc);
        if site.y == directrix {
            return site.x;
        }
        match self.beachline.prev(arc) {
            Some(l) => breakpoint_x(self.arc_site(l), site, directrix),
            None => f64::NEG_INFINITY,
        }
    }

    fn right_break_point(&self, arc: NodeId, directrix: f64) -> f64 {
        if let Some(r) = self.beachline.next(arc) {
            return self.left_break_point(r, directrix);
        }
        let site = self.arc_site(arc);
        if site.y == directrix {
            site.x
        } else {
            f64::INFINITY
        }
    }

    fn add_beachsection(&mut self, cell: usize) {
        let site = self.cells[cell].site;
        let (x, directrix) = (site.x, site.y);

        let mut l_arc = None;
        let mut r_arc = None;
        let mut node = self.beachline.root();
        while let Some(n) = node {
            let dxl = self.left_break_point(n, directrix) - x;
            if dxl > EPSILON {
                node = self.beachline.left(n);
                continue;
            }
            let dxr = x - self.right_break_point(n, directrix);
            if dxr > EPSILON {
                match self.beachline.right(n) {
                    Some(r) => node = Some(r),
                    None => {
                        l_arc = Some(n);
                        break;
                    }
                }
                continue;
            }
            if dxl > -EPSILON {
                l_arc = self.beachline.prev(n);
                r_arc = Some(n);
            } else if dxr > -EPSILON {
                l_arc = Some(n);
                r_arc = self.beachline.next(n);
            } else {
                l_arc = Some(n);
                r_arc = Some(n);
            }
            break;
        }

        let new_arc = self.beachline.insert_successor(
            l_arc,
            Arc {
                cell,
                edge: None,
                circle: None,
            },
        );

        match (l_arc, r_arc) {
            (None, None) => {}
            (Some(l), Some(r)) if l == r => {
                // The new site splits an existing arc in two.
                self.detach_circle_event(l);
                let l_cell = self.beachline.get(l).cell;
                let r = self.beachline.insert_successor(
                    Some(new_arc),
                    Arc {
                        cell: l_cell,
                        edge: None,
                        circle: None,
                    },
                );
                let e = self.create_edge(l_cell, cell, None, None);
                self.beachline.get_mut(new_arc).edge = Some(e);
                self.beachline.get_mut(r).edge = Some(e);
                self.attach_circle_event(l);
                self.attach_circle_event(r);
            }
            (Some(l), None) => {
                let l_cell = self.beachline.get(l).cell;
                let e = self.create_edge(l_cell, cell, None, None);
                self.beachline.get_mut(new_arc).edge = Some(e);
            }
            (None, Some(r)) => {
                let r_cell = self.beachline.get(r).cell;
                let e = self.create_edge(cell, r_cell, None, None);
                self.beachline.get_mut(r).edge = Some(e);
            }
            (Some(l), Some(r)) => {
                // The new site lands exactly on a breakpoint: the old edge ends here.
                self.detach_circle_event(l);
                self.detach_circle_event(r);
                let l_cell = self.beachline.get(l).cell;
                let r_cell = self.beachline.get(r).cell;
                let ls = self.cells[l_cell].site;
                let rs = self.cells[r_cell].site;
                let (ax, ay) = (ls.x, ls.y);
                let (bx, by) = (site.x - ax, site.y - ay);
                let (cx, cy) = (rs.x - ax, rs.y - ay);
                let d = 2.0 * (bx * cy - by * cx);
                let hb = bx * bx + by * by;
                let hc = cx * cx + cy * cy;
                let vertex = self.create_vertex(Point::new(
                    (cy * hb - by * hc) / d + ax,
                    (bx * hc - cx * hb) / d + ay,
                ));
                if let Some(old) = self.beachline.get(r).edge {
                    self.set_edge_start(old, l_cell, r_cell, vertex);
                }
                let e_left = self.create_edge(l_cell, cell, None, Some(vertex));
                let e_right = self.create_edge(cell, r_cell, None, Some(vertex));
                self.beachline.get_mut(new_arc).edge = Some(e_left);
                self.beachline.get_mut(r).edge = Some(e_right);
                self.attach_circle_event(l);
                self.attach_circle_event(r);
            }
        }
    }

    fn retire(&self, node: NodeId) -> Retired {
        let arc = self.beachline.get(node);
        Retired {
            node,
            cell: arc.cell,
            edge: arc.edge,
        }
    }

    fn detach_beachsection(&mut self, arc: NodeId) {
        self.detach_circle_event(arc);
        self.beachline.remove(arc);
    }

    fn fires_at(&self, arc: NodeId, x: f64, y: f64) -> bool {
        self.beachline.get(arc).circle.is_some_and(|c| {
            let ev = self.circles.get(c);
            equal_with_epsilon(ev.x, x) && equal_with_epsilon(ev.y_center, y)
        })
    }

    fn remove_beachsection(&mut self, arc: NodeId) -> Result<(), DiagramError> {
        let Some(circle) = self.beachline.get(arc).circle else {
            return Err(DiagramError::MalformedBeachline);
        };
        let ev = *self.circles.get(circle);
        let (x, y) = (ev.x, ev.y_center);
        let vertex = self.create_vertex(Point::new(x, y));

        let mut previous = self.beachline.prev(arc);
        let mut next = self.beachline.next(arc);
        let mut disappearing: VecDeque<Retired> = VecDeque::new();
        disappearing.push_back(self.retire(arc));
        self.detach_beachsection(arc);

        // Neighbours collapsing onto the same point go together.
        let mut l_arc = previous.ok_or(DiagramError::MalformedBeachline)?;
        while self.fires_at(l_arc, x, y) {
            previous = self.beachline.prev(l_arc);
            disappearing.push_front(self.retire(l_arc));
            self.detach_beachsection(l_arc);
            l_arc = previous.ok_or(DiagramError::MalformedBeachline)?;
        }
        disappearing.push_front(self.retire(l_arc));
        self.detach_circle_event(l_arc);

        let mut r_arc = next.ok_or(DiagramError::MalformedBeachline)?;
        while self.fires_at(r_arc, x, y) {
            next = self.beachline.next(r_arc);
            disappearing.push_back(self.retire(r_arc));
            self.detach_beachsection(r_arc);
            r_arc = next.ok_or(DiagramError::MalformedBeachline)?;
        }
        disappearing.push_back(self.retire(r_arc));
        self.detach_circle_event(r_arc);

        for i in 1..disappearing.len() {
            let (l, r) = (disappearing[i - 1], disappearing[i]);
            if let Some(e) = r.edge {
                self.set_edge_start(e, l.cell, r.cell, vertex);
            }
        }

        let (first, last) = (disappearing[0], disappearing[disappearing.len() - 1]);
        let e = self.create_edge(first.cell, last.cell, None, Some(vertex));
        self.beachline.get_mut(last.node).edge = Some(e);

        self.attach_circle_event(first.node);
        self.attach_circle_event(last.node);
        Ok(())
    }

    fn attach_circle_event(&mut self, arc: NodeId) {
        let (Some(l), Some(r)) = (self.beachline.prev(arc), self.beachline.next(arc)) else {
            return;
        };
        if self.beachline.get(l).cell == self.beachline.get(r).cell {
            return;
        }
        let ls = self.arc_site(l);
        let cs = self.arc_site(arc);
        let rs = self.arc_site(r);

        let (bx, by) = (cs.x, cs.y);
        let (ax, ay) = (ls.x - bx, ls.y - by);
        let (cx, cy) = (rs.x - bx, rs.y - by);
        // Only converging breakpoints (clockwise triple) produce an event.
        let d = 2.0 * (ax * cy - ay * cx);
        if d >= -2e-12 {
            return;
        }
        let ha = ax * ax + ay * ay;
        let hc = cx * cx + cy * cy;
        let x = (cy * ha - ay * hc) / d;
        let y = (ax * hc - cx * ha) / d;
        let y_center = y + by;
        let event = CircleEvent {
            arc,
            x: x + bx,
            y: y_center + (x * x + y * y).sqrt(),
            y_center,
        };

        let mut predecessor = None;
        let mut node = self.circles.root();
        while let Some(n) = node {
            let other = self.circles.get(n);
            if event.y < other.y || (event.y == other.y && event.x <= other.x) {
                match self.circles.left(n) {
                    Some(l) => node = Some(l),
                    None => {
                        predecessor = self.circles.prev(n);
                        break;
                    }
                }
            } else {
                match self.circles.right(n) {
                    Some(r) => node = Some(r),
                    None => {
                        predecessor = Some(n);
                        break;
                    }
                }
            }
        }
        let id = self.circles.insert_successor(predecessor, event);
        self.beachline.get_mut(arc).circle = Some(id);
    }

    fn detach_circle_event(&mut self, arc: NodeId) {
        if let Some(c) = self.beachline.get_mut(arc).circle.take() {
            self.circles.remove(c);
        }
    }

    fn mark_needs_closing(&mut self, e: usize) {
        let edge = self.edges[e];
        self.cells[edge.left].needs_closing = true;
        if let Some(r) = edge.right {
            self.cells[r].needs_closing = true;
        }
    }

    /// Gives an edge missing an endpoint its intersection with the rectangle.
    fn connect_edge(&mut self, e: usize, bbox: &Rect) -> bool {
        let edge = self.edges[e];
        if edge.end.is_some() {
            return edge.start.is_some();
        }
        let Some(right) = edge.right else {
            return false;
        };
        let (xl, xr, yt, yb) = (bbox.left, bbox.right, bbox.top, bbox.bottom);
        let ls = self.cells[edge.left].site;
        let rs = self.cells[right].site;
        let (lx, ly, rx, ry) = (ls.x, ls.y, rs.x, rs.y);
        let fx = (lx + rx) / 2.0;
        let fy = (ly + ry) / 2.0;

        self.mark_needs_closing(e);

        let mut va = edge.start.map(|v| (v, self.vertices[v]));
        let vb;
        if ry == ly {
            // Vertical bisector.
            if fx < xl || fx >= xr {
                return false;
            }
            if lx > rx {
                match va {
                    Some((_, p)) if p.y >= yt => {
                        if p.y >= yb {
                            return false;
                        }
                    }
                    _ => va = Some((self.create_vertex(Point::new(fx, yt)), Point::new(fx, yt))),
                }
                vb = self.create_vertex(Point::new(fx, yb));
            } else {
                match va {
                    Some((_, p)) if p.y <= yb => {
                        if p.y < yt {
                            return false;
                        }
                    }
                    _ => va = Some((self.create_vertex(Point::new(fx, yb)), Point::new(fx, yb))),
                }
                vb = self.create_vertex(Point::new(fx, yt));
            }
        } else {
            let fm = (lx - rx) / (ry - ly);
            let fb = fy - fm * fx;
            if !(-1.0..=1.0).contains(&fm) {
                // Steep bisector: connect to top/bottom.
                if lx > rx {
                    match va {
                        Some((_, p)) if p.y >= yt => {
                            if p.y >= yb {
                                return false;
                            }
                        }
                        _ => {
                            let p = Point::new((yt - fb) / fm, yt);
                            va = Some((self.create_vertex(p), p));
                        }
                    }
                    vb = self.create_vertex(Point::new((yb - fb) / fm, yb));
                } else {
                    match va {
                        Some((_, p)) if p.y <= yb => {
                            if p.y < yt {
                                return false;
                            }
                        }
                        _ => {
                            let p = Point::new((yb - fb) / fm, yb);
                            va = Some((self.create_vertex(p), p));
                        }
                    }
                    vb = self.create_vertex(Point::new((yt - fb) / fm, yt));
                }
            } else if ly < ry {
                match va {
                    Some((_, p)) if p.x >= xl => {
                        if p.x >= xr {
                            return false;
                        }
                    }
                    _ => {
                        let p = Point::new(xl, fm * xl + fb);
                        va = Some((self.create_vertex(p), p));
                    }
                }
                vb = self.create_vertex(Point::new(xr, fm * xr + fb));
            } else {
                match va {
                    Some((_, p)) if p.x <= xr => {
                        if p.x < xl {
                            return false;
                        }
                    }
                    _ => {
                        let p = Point::new(xr, fm * xr + fb);
                        va = Some((self.create_vertex(p), p));
                    }
                }
                vb = self.create_vertex(Point::new(xl, fm * xl + fb));
            }
        }

        let edge = &mut self.edges[e];
        edge.start = va.map(|(v, _)| v);
        edge.end = Some(vb);
        true
    }

    /// Liang-Barsky clip of a connected edge against the rectangle.
    fn clip_edge(&mut self, e: usize, bbox: &Rect) -> bool {
        let edge = self.edges[e];
        let (Some(sa), Some(sb)) = (edge.start, edge.end) else {
            return false;
        };
        let a = self.vertices[sa];
        let b = self.vertices[sb];
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let mut t0: f64 = 0.0;
        let mut t1: f64 = 1.0;

        for (p, q) in [
            (-dx, a.x - bbox.left),
            (dx, bbox.right - a.x),
            (-dy, a.y - bbox.top),
            (dy, bbox.bottom - a.y),
        ] {
            if p == 0.0 {
                if q < 0.0 {
                    return false;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return false;
                }
                if r > t0 {
                    t0 = r;
                }
            } else {
                if r < t0 {
                    return false;
                }
                if r < t1 {
                    t1 = r;
                }
            }
        }

        if t0 > 0.0 {
            let v = self.create_vertex(Point::new(a.x + t0 * dx, a.y + t0 * dy));
            self.edges[e].start = Some(v);
        }
        if t1 < 1.0 {
            let v = self.create_vertex(Point::new(a.x + t1 * dx, a.y + t1 * dy));
            self.edges[e].end = Some(v);
        }
        if t0 > 0.0 || t1 < 1.0 {
            self.mark_needs_closing(e);
        }
        true
    }

    fn clip_edges(&mut self, bbox: &Rect) {
        for e in (0..self.edges.len()).rev() {
            let keep = self.connect_edge(e, bbox) && self.clip_edge(e, bbox) && {
                let edge = self.edges[e];
                match (edge.start, edge.end) {
                    (Some(a), Some(b)) => !self.vertices[a].approx_eq(self.vertices[b]),
                    _ => false,
                }
            };
            if !keep {
                let edge = &mut self.edges[e];
                edge.start = None;
                edge.end = None;
            }
        }
    }

    fn halfedge_vertices(&self, he: &Halfedge) -> Option<(usize, usize)> {
        let e = &self.edges[he.edge];
        let (s, t) = if e.left == he.site {
            (e.start?, e.end?)
        } else {
            (e.end?, e.start?)
        };
        Some((s, t))
    }

    fn close_cells(&mut self, bbox: &Rect) -> Result<(), DiagramError> {
        for c in (0..self.cells.len()).rev() {
            let mut hes = std::mem::take(&mut self.cells[c].halfedges);
            hes.retain(|he| {
                let e = &self.edges[he.edge];
                e.start.is_some() && e.end.is_some()
            });
            hes.sort_by(|a, b| b.angle.total_cmp(&a.angle));

            if hes.is_empty() {
                // No bisector reaches the rectangle, so the site inside it owns all of it.
                if bbox.contains(self.cells[c].site) {
                    self.close_enclosing_cell(c, bbox, &mut hes);
                }
            } else if self.cells[c].needs_closing {
                self.close_cell(c, bbox, &mut hes)?;
            }
            self.cells[c].halfedges = hes;
            self.cells[c].needs_closing = false;
        }
        Ok(())
    }

    /// Walks the rectangle border (left, bottom, right, top) wherever consecutive halfedges
    /// do not meet.
    fn close_cell(
        &mut self,
        c: usize,
        bbox: &Rect,
        hes: &mut Vec<Halfedge>,
    ) -> Result<(), DiagramError> {
        let (xl, xr, yt, yb) = (bbox.left, bbox.right, bbox.top, bbox.bottom);
        let unclosable = DiagramError::UnclosableCell { cell: c };

        let mut i = 0;
        while i < hes.len() {
            let n = hes.len();
            let (_, mut va_id) = self.halfedge_vertices(&hes[i]).ok_or(unclosable.clone())?;
            let (vz_id, _) = self
                .halfedge_vertices(&hes[(i + 1) % n])
                .ok_or(unclosable.clone())?;
            let va = self.vertices[va_id];
            let vz = self.vertices[vz_id];

            if !va.approx_eq(vz) {
                let start_side = if equal_with_epsilon(va.x, xl) && less_than_with_epsilon(va.y, yb)
                {
                    0
                } else if equal_with_epsilon(va.y, yb) && less_than_with_epsilon(va.x, xr) {
                    1
                } else if equal_with_epsilon(va.x, xr) && greater_than_with_epsilon(va.y, yt) {
                    2
                } else if equal_with_epsilon(va.y, yt) && greater_than_with_epsilon(va.x, xl) {
                    3
                } else {
                    return Err(unclosable);
                };

                let mut closed = false;
                for side in start_side..7 {
                    let (target, last) = match side % 4 {
                        0 => {
                            let last = equal_with_epsilon(vz.x, xl);
                            (Point::new(xl, if last { vz.y } else { yb }), last)
                        }
                        1 => {
                            let last = equal_with_epsilon(vz.y, yb);
                            (Point::new(if last { vz.x } else { xr }, yb), last)
                        }
                        2 => {
                            let last = equal_with_epsilon(vz.x, xr);
                            (Point::new(xr, if last { vz.y } else { yt }), last)
                        }
                        _ => {
                            let last = equal_with_epsilon(vz.y, yt);
                            (Point::new(if last { vz.x } else { xl }, yt), last)
                        }
                    };
                    let vb_id = if last {
                        vz_id
                    } else {
                        self.create_vertex(target)
                    };
                    let he = self.create_border_edge(c, va_id, vb_id);
                    i += 1;
                    hes.insert(i, he);
                    if last {
                        closed = true;
                        break;
                    }
                    va_id = vb_id;
                }
                if !closed {
                    return Err(unclosable);
                }
            }
            i += 1;
        }
        Ok(())
    }

    /// Closes a cell that owns the whole rectangle.
    fn close_enclosing_cell(&mut self, c: usize, bbox: &Rect, hes: &mut Vec<Halfedge>) {
        let corners = [
            Point::new(bbox.left, bbox.top),
            Point::new(bbox.left, bbox.bottom),
            Point::new(bbox.right, bbox.bottom),
            Point::new(bbox.right, bbox.top),
        ];
        let ids: Vec<usize> = corners.iter().map(|p| self.create_vertex(*p)).collect();
        for k in 0..ids.len() {
            let he = self.create_border_edge(c, ids[k], ids[(k + 1) % ids.len()]);
            hes.push(he);
        }
    }

    /// Drops discarded edges and hands out the finished diagram.
    fn finish(&mut self) -> Diagram {
        let mut remap: Vec<Option<usize>> = Vec::with_capacity(self.edges.len());
        let mut edges = std::mem::take(&mut self.out_edges);
        for e in &self.edges {
            match (e.start, e.end) {
                (Some(start), Some(end)) => {
                    remap.push(Some(edges.len()));
                    edges.push(Edge {
                        left: e.left,
                        right: e.right,
                        start,
                        end,
                    });
                }
                _ => remap.push(None),
            }
        }
        for cell in &mut self.cells {
            for he in &mut cell.halfedges {
                if let Some(e) = remap[he.edge] {
                    he.edge = e;
                }
            }
        }
        Diagram {
            vertices: std::mem::take(&mut self.vertices),
            edges,
            cells: std::mem::take(&mut self.cells),
        }
    }
}
