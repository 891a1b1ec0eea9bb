//! Partition/merge protocol.
//!
//! Every partition lays out the full graph with its own seed and reports only the vertices
//! assigned to it. Assignments are disjoint and cover every vertex, so the merge is a plain
//! union.

use crate::algo::rng::mix;
use crate::error::Result;
use crate::request::{LayoutResult, Size};
use indexmap::IndexMap;
use rayon::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct PartitionPlan {
    /// Vertex id -> partition, in request order.
    assignment: IndexMap<String, usize>,
    partitions: usize,
}

impl PartitionPlan {
    /// Round-robin assignment; the partition count is clamped to `[1, vertices]`.
    pub fn new(vertices: &[String], requested: usize) -> Self {
        let partitions = requested.clamp(1, vertices.len().max(1));
        let assignment = vertices
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i % partitions))
            .collect();
        Self {
            assignment,
            partitions,
        }
    }

    pub fn partitions(&self) -> usize {
        self.partitions
    }

    pub fn partition_of(&self, id: &str) -> Option<usize> {
        self.assignment.get(id).copied()
    }

    pub fn members(&self, partition: usize) -> impl Iterator<Item = &str> + '_ {
        self.assignment
            .iter()
            .filter(move |(_, p)| **p == partition)
            .map(|(id, _)| id.as_str())
    }

    pub fn seed_for(&self, base: u64, partition: usize) -> u64 {
        mix(base, partition as u64)
    }

    /// Runs `job(partition, seed)` for every partition in parallel and waits for all of them.
    pub fn run<F>(&self, base_seed: u64, job: F) -> Result<Vec<LayoutResult>>
    where
        F: Fn(usize, u64) -> Result<LayoutResult> + Sync,
    {
        (0..self.partitions)
            .into_par_iter()
            .map(|p| job(p, self.seed_for(base_seed, p)))
            .collect()
    }

    /// Keeps from each result only the positions of its own vertices.
    ///
    /// `expansions_used`, `infractions` and `final_bounds` are the maxima over partitions.
    pub fn merge(&self, results: Vec<LayoutResult>) -> LayoutResult {
        let mut merged = LayoutResult {
            positions: IndexMap::with_capacity(self.assignment.len()),
            expansions_used: 0,
            final_bounds: Size::new(0.0, 0.0),
            infractions: 0,
        };
        for r in &results {
            merged.expansions_used = merged.expansions_used.max(r.expansions_used);
            merged.final_bounds = merged.final_bounds.max(r.final_bounds);
            merged.infractions = merged.infractions.max(r.infractions);
        }
        for (id, &p) in &self.assignment {
            if let Some(pos) = results.get(p).and_then(|r| r.positions.get(id)) {
                merged.positions.insert(id.clone(), *pos);
            }
        }
        merged
    }
}
