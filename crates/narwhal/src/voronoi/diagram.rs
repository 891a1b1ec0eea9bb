use crate::geom::{Point, polygon_centroid, polygon_signed_area};

/// A bisector between two cells, or a border segment (`right == None`) closing a cell
/// against the bounding rectangle. `start`/`end` index [`Diagram::vertices`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub left: usize,
    pub right: Option<usize>,
    pub start: usize,
    pub end: usize,
}

impl Edge {
    pub fn is_border(&self) -> bool {
        self.right.is_none()
    }
}

/// One cell's directed view of an [`Edge`]. `angle` orders the halfedges of a cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Halfedge {
    pub site: usize,
    pub edge: usize,
    pub angle: f64,
}

#[derive(Debug, Clone)]
pub struct Cell {
    /// Site position this cell was built around.
    pub site: Point,
    /// Index of the site in the slice handed to [`super::Builder::compute`].
    pub source: usize,
    /// Halfedges in angular order; consecutive halfedges share a vertex.
    pub halfedges: Vec<Halfedge>,
    pub(crate) needs_closing: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Diagram {
    pub vertices: Vec<Point>,
    pub edges: Vec<Edge>,
    pub cells: Vec<Cell>,
}

impl Diagram {
    pub fn halfedge_start(&self, he: &Halfedge) -> Point {
        let e = &self.edges[he.edge];
        if e.left == he.site {
            self.vertices[e.start]
        } else {
            self.vertices[e.end]
        }
    }

    pub fn halfedge_end(&self, he: &Halfedge) -> Point {
        let e = &self.edges[he.edge];
        if e.left == he.site {
            self.vertices[e.end]
        } else {
            self.vertices[e.start]
        }
    }

    /// Ordered vertex loop of a cell.
    pub fn cell_polygon(&self, cell: usize) -> Vec<Point> {
        self.cells[cell]
            .halfedges
            .iter()
            .map(|he| self.halfedge_start(he))
            .collect()
    }

    pub fn cell_area(&self, cell: usize) -> f64 {
        polygon_signed_area(&self.cell_polygon(cell)).abs()
    }

    /// Area centroid of the cell polygon; `None` when the cell has collapsed.
    pub fn cell_centroid(&self, cell: usize) -> Option<Point> {
        polygon_centroid(&self.cell_polygon(cell))
    }

    /// Cell indices adjacent to `cell` across a shared bisector.
    pub fn neighbors(&self, cell: usize) -> impl Iterator<Item = usize> + '_ {
        self.cells[cell].halfedges.iter().filter_map(move |he| {
            let e = &self.edges[he.edge];
            let other = if e.left == cell { e.right } else { Some(e.left) };
            other.filter(|o| *o != cell)
        })
    }

    /// `(left, right)` cell pairs of every non-border edge.
    pub fn site_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.edges
            .iter()
            .filter_map(|e| e.right.map(|r| (e.left, r)))
    }

    /// Number of adjacent cell pairs whose positions (indexed like [`Diagram::cells`]) are
    /// closer than `min_distance`.
    pub fn infractions(&self, positions: &[Point], min_distance: f64) -> usize {
        self.site_pairs()
            .filter(|&(l, r)| positions[l].distance(positions[r]) < min_distance)
            .count()
    }
}
