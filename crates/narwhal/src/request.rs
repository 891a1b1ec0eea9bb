//! JSON-facing request/result types.

use crate::error::{Error, Result};
use crate::geom::{Point, Rect};
use crate::graph::Graph;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    /// Component-wise maximum.
    pub fn max(self, other: Size) -> Size {
        Size::new(self.width.max(other.width), self.height.max(other.height))
    }
}

impl From<Rect> for Size {
    fn from(r: Rect) -> Self {
        Size::new(r.width(), r.height())
    }
}

/// Bounding-box growth per expansion level.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawExpandFactor", into = "RawExpandFactor")]
pub enum ExpandFactor {
    /// Derived from the minimum distance and the site density.
    #[default]
    Auto,
    Fixed(f64),
}

impl ExpandFactor {
    /// `clamp(0.05, 0.10, 0.5 * min_distance / sqrt(area / sites))` for [`ExpandFactor::Auto`].
    pub fn resolve(self, min_distance: f64, area: f64, sites: usize) -> f64 {
        match self {
            ExpandFactor::Fixed(f) => f,
            ExpandFactor::Auto => {
                let spacing = (area / sites.max(1) as f64).sqrt();
                let f = if spacing > 0.0 {
                    0.5 * min_distance / spacing
                } else {
                    0.10
                };
                if f.is_finite() {
                    f.clamp(0.05, 0.10)
                } else {
                    0.10
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawExpandFactor {
    Number(f64),
    Word(String),
}

impl TryFrom<RawExpandFactor> for ExpandFactor {
    type Error = String;

    fn try_from(raw: RawExpandFactor) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawExpandFactor::Number(f) => Ok(ExpandFactor::Fixed(f)),
            RawExpandFactor::Word(w) if w.eq_ignore_ascii_case("auto") => Ok(ExpandFactor::Auto),
            RawExpandFactor::Word(w) => {
                Err(format!("expandFactor must be a number or \"auto\", got {w:?}"))
            }
        }
    }
}

impl From<ExpandFactor> for RawExpandFactor {
    fn from(f: ExpandFactor) -> Self {
        match f {
            ExpandFactor::Auto => RawExpandFactor::Word("auto".to_string()),
            ExpandFactor::Fixed(v) => RawExpandFactor::Number(v),
        }
    }
}

/// An edge, written either as `["a", "b"]`, `["a", "b", 2.5]` or
/// `{"source": "a", "target": "b", "weight": 2.5}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawEdge")]
pub struct EdgeSpec {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

impl EdgeSpec {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            weight: 1.0,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEdge {
    Pair(String, String),
    Weighted(String, String, f64),
    Object {
        source: String,
        target: String,
        #[serde(default = "default_weight")]
        weight: f64,
    },
}

impl From<RawEdge> for EdgeSpec {
    fn from(raw: RawEdge) -> Self {
        let (source, target, weight) = match raw {
            RawEdge::Pair(s, t) => (s, t, default_weight()),
            RawEdge::Weighted(s, t, w) => (s, t, w),
            RawEdge::Object {
                source,
                target,
                weight,
            } => (source, target, weight),
        };
        Self {
            source,
            target,
            weight,
        }
    }
}

fn default_weight() -> f64 {
    1.0
}

fn default_force_iterations() -> u32 {
    400
}

fn default_partition_count() -> u32 {
    1
}

fn default_max_expand_iterations() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRequest {
    pub vertices: Vec<String>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
    pub bounds: Size,
    #[serde(default)]
    pub min_distance: f64,
    #[serde(default)]
    pub expand_factor: ExpandFactor,
    #[serde(default = "default_max_expand_iterations")]
    pub max_expand_iterations: u32,
    #[serde(default = "default_force_iterations")]
    pub force_iterations: u32,
    #[serde(default = "default_partition_count")]
    pub partition_count: u32,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_true")]
    pub preserve_aspect: bool,
}

impl LayoutRequest {
    pub fn new(vertices: Vec<String>, edges: Vec<EdgeSpec>, bounds: Size) -> Self {
        Self {
            vertices,
            edges,
            bounds,
            min_distance: 0.0,
            expand_factor: ExpandFactor::Auto,
            max_expand_iterations: default_max_expand_iterations(),
            force_iterations: default_force_iterations(),
            partition_count: default_partition_count(),
            seed: 0,
            preserve_aspect: true,
        }
    }

    /// Checks the numeric options. Graph-shape problems surface from [`LayoutRequest::to_graph`].
    pub fn validate(&self) -> Result<()> {
        let Size { width, height } = self.bounds;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(Error::InvalidBounds { width, height });
        }
        if !self.min_distance.is_finite() || self.min_distance < 0.0 {
            return Err(Error::InvalidOption {
                name: "minDistance",
                value: self.min_distance.to_string(),
            });
        }
        if let ExpandFactor::Fixed(f) = self.expand_factor {
            if !f.is_finite() || f <= 0.0 {
                return Err(Error::InvalidOption {
                    name: "expandFactor",
                    value: f.to_string(),
                });
            }
        }
        for e in &self.edges {
            if !e.weight.is_finite() {
                return Err(Error::InvalidOption {
                    name: "weight",
                    value: e.weight.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn to_graph(&self) -> Result<Graph> {
        let mut g = Graph::with_capacity(self.vertices.len(), self.edges.len());
        for id in &self.vertices {
            g.add_vertex(id.as_str())?;
        }
        for e in &self.edges {
            g.add_edge_by_id(&e.source, &e.target, e.weight)?;
        }
        Ok(g)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutResult {
    pub positions: IndexMap<String, Point>,
    pub expansions_used: u32,
    pub final_bounds: Size,
    /// Adjacent pairs still closer than the minimum distance.
    #[serde(default)]
    pub infractions: usize,
}
