//! Centroid relaxation with bounding-box expansion.
//!
//! Each round computes the Voronoi diagram of the current sites and moves every site to its
//! cell's area centroid. Rounds are grouped into expansion levels; a level ends early when
//! the layout has no infractions left or when a round fails to improve on the previous one.
//! Between levels the rectangle grows around its center and the sites are mapped onto it.

use rustc_hash::FxHashMap;

use crate::geom::{Point, Rect};
use crate::request::ExpandFactor;
use crate::voronoi::{Builder, DiagramError};

#[derive(Debug, Clone)]
pub struct OverlapOptions {
    pub min_distance: f64,
    pub expand_factor: ExpandFactor,
    pub max_expand_iterations: u32,
    /// Relaxation rounds per expansion level.
    pub rounds_per_level: usize,
}

impl Default for OverlapOptions {
    fn default() -> Self {
        Self {
            min_distance: 0.0,
            expand_factor: ExpandFactor::Auto,
            max_expand_iterations: 10,
            rounds_per_level: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlapOutcome {
    /// Indexed like the input sites.
    pub positions: Vec<Point>,
    pub bounds: Rect,
    /// Expansion level of the returned state. Levels tried after it that did no better are
    /// not counted.
    pub expansions: u32,
    pub infractions: usize,
}

/// Runs diagram computations for one relaxation and keeps the builder's storage around.
#[derive(Debug, Default)]
pub struct Relaxer {
    builder: Builder,
}

impl Relaxer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves every site to its cell centroid and returns the infractions of the moved sites.
    ///
    /// A site whose cell has no area keeps its position. A site dropped as a duplicate is
    /// placed next to the centroid its twin moved to and counts as an infraction when that
    /// offset is below `min_distance`.
    pub fn relax(
        &mut self,
        positions: &mut [Point],
        bounds: Rect,
        min_distance: f64,
    ) -> Result<usize, DiagramError> {
        let diagram = self.builder.compute(positions, bounds)?;
        let mut owner: FxHashMap<(u64, u64), usize> = FxHashMap::default();
        let mut covered = vec![false; positions.len()];
        let mut moved = Vec::with_capacity(diagram.cells.len());
        for (c, cell) in diagram.cells.iter().enumerate() {
            owner.insert(site_key(cell.site), c);
            covered[cell.source] = true;
            let p = diagram.cell_centroid(c).unwrap_or(cell.site);
            positions[cell.source] = p;
            moved.push(p);
        }
        let mut infractions = diagram.infractions(&moved, min_distance);

        let offset = if min_distance > 0.0 {
            min_distance * DUPLICATE_OFFSET
        } else {
            bounds.width().min(bounds.height()) * DUPLICATE_OFFSET * 1e-2
        };
        let mut dropped = 0u32;
        for (i, p) in positions.iter_mut().enumerate() {
            if covered[i] || !p.is_finite() {
                continue;
            }
            let Some(&c) = owner.get(&site_key(*p)) else {
                continue;
            };
            dropped += 1;
            let angle = f64::from(dropped) * GOLDEN_ANGLE;
            let twin = moved[c];
            *p = bounds.clamp(Point::new(
                twin.x + offset * angle.cos(),
                twin.y + offset * angle.sin(),
            ));
            if p.distance(twin) < min_distance {
                infractions += 1;
            }
        }
        if dropped > 0 {
            tracing::trace!(dropped, "separated duplicate sites");
        }

        self.builder.recycle(diagram);
        Ok(infractions)
    }
}

/// Fraction of the minimum distance a duplicate is moved off its twin.
const DUPLICATE_OFFSET: f64 = 0.1;
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

fn site_key(p: Point) -> (u64, u64) {
    (p.x.to_bits(), p.y.to_bits())
}

/// Relaxes `sites` inside `bounds` until no adjacent pair is closer than the minimum
/// distance or the expansion budget runs out. Running out is not an error; the latest state
/// with the fewest infractions is returned together with that count.
pub fn resolve(
    sites: &[Point],
    bounds: Rect,
    opts: &OverlapOptions,
) -> Result<OverlapOutcome, DiagramError> {
    let mut relaxer = Relaxer::new();
    let mut positions = sites.to_vec();
    let mut rect = bounds;
    let mut expansions = 0u32;

    let mut infractions = relaxer.relax(&mut positions, rect, opts.min_distance)?;
    let mut best = OverlapOutcome {
        positions: positions.clone(),
        bounds: rect,
        expansions,
        infractions,
    };
    if infractions == 0 {
        tracing::debug!(sites = sites.len(), "no infractions after first relaxation");
        return Ok(best);
    }

    let factor = opts
        .expand_factor
        .resolve(opts.min_distance, bounds.area(), sites.len());

    loop {
        let level_start = infractions;
        for round in 0..opts.rounds_per_level {
            let previous = infractions;
            infractions = relaxer.relax(&mut positions, rect, opts.min_distance)?;
            tracing::trace!(level = expansions, round, infractions, "relaxation round");
            if infractions <= best.infractions {
                best = OverlapOutcome {
                    positions: positions.clone(),
                    bounds: rect,
                    expansions,
                    infractions,
                };
            }
            if infractions == 0 || infractions >= previous {
                break;
            }
        }
        if infractions == 0 {
            break;
        }
        if expansions >= opts.max_expand_iterations {
            tracing::warn!(
                expansions,
                infractions = best.infractions,
                min_distance = opts.min_distance,
                "expansion budget exhausted with infractions left"
            );
            break;
        }

        let grown = rect.expanded(factor);
        for p in &mut positions {
            *p = rect.map_to(&grown, *p);
        }
        rect = grown;
        expansions += 1;
        tracing::trace!(
            level = expansions,
            level_start,
            infractions,
            width = rect.width(),
            height = rect.height(),
            "expanded bounds"
        );
    }

    tracing::debug!(
        sites = sites.len(),
        expansions = best.expansions,
        infractions = best.infractions,
        "overlap resolution finished"
    );
    Ok(best)
}
