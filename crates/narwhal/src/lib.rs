#![forbid(unsafe_code)]

//! Headless overlap-free graph layout.
//!
//! A force-directed pass places the vertices, then Voronoi centroid relaxation spreads them
//! until no two adjacent vertices are closer than the requested minimum distance (growing the
//! bounds when needed). Independent partitions can run in parallel with different seeds.

pub mod algo;
pub mod error;
pub mod geom;
pub mod graph;
pub mod overlap;
pub mod partition;
pub mod request;
pub mod voronoi;

pub use algo::{ForceOptions, ForceStats};
pub use error::{Error, Result};
pub use geom::{Point, Rect};
pub use graph::Graph;
pub use overlap::{OverlapOptions, OverlapOutcome};
pub use partition::PartitionPlan;
pub use request::{EdgeSpec, ExpandFactor, LayoutRequest, LayoutResult, Size};

use indexmap::IndexMap;

/// Headless layout entry point.
pub fn layout(request: &LayoutRequest) -> Result<LayoutResult> {
    request.validate()?;
    // Surface graph-shape errors once, before fanning out.
    let graph = request.to_graph()?;
    let plan = PartitionPlan::new(&request.vertices, request.partition_count as usize);
    tracing::debug!(
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        partitions = plan.partitions(),
        "layout requested"
    );

    let started = std::time::Instant::now();
    let results = plan.run(request.seed, |_, seed| layout_with_seed(request, seed))?;
    let merged = plan.merge(results);
    tracing::debug!(
        expansions = merged.expansions_used,
        infractions = merged.infractions,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "layout finished"
    );
    Ok(merged)
}

/// Runs the whole pipeline once over the full graph.
pub fn layout_with_seed(request: &LayoutRequest, seed: u64) -> Result<LayoutResult> {
    request.validate()?;
    let mut graph = request.to_graph()?;
    let bounds = request.bounds.rect();
    let active = graph.active_vertices();

    if active.len() <= 1 {
        let center = bounds.center();
        let positions = active
            .iter()
            .map(|&v| (graph.vertex(v).id.clone(), center))
            .collect();
        return Ok(LayoutResult {
            positions,
            expansions_used: 0,
            final_bounds: request.bounds,
            infractions: 0,
        });
    }

    let force = ForceOptions {
        iterations: request.force_iterations as usize,
        preserve_aspect: request.preserve_aspect,
        random_seed: seed,
        ..Default::default()
    };
    algo::force::layout(&mut graph, &bounds, &force)?;

    let sites: Vec<Point> = active
        .iter()
        .map(|&v| {
            let vx = graph.vertex(v);
            Point::new(vx.x, vx.y)
        })
        .collect();
    let overlap = OverlapOptions {
        min_distance: request.min_distance,
        expand_factor: request.expand_factor,
        max_expand_iterations: request.max_expand_iterations,
        ..Default::default()
    };
    let outcome = overlap::resolve(&sites, bounds, &overlap)?;

    let mut positions = IndexMap::with_capacity(active.len());
    for (&v, p) in active.iter().zip(&outcome.positions) {
        positions.insert(graph.vertex(v).id.clone(), *p);
    }
    Ok(LayoutResult {
        positions,
        expansions_used: outcome.expansions,
        final_bounds: Size::from(outcome.bounds),
        infractions: outcome.infractions,
    })
}
