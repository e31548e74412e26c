// THEORY:
// The `CoverageOracle` is the fitness oracle of the whole engine. It is built
// once per cluster from the extractor's output and then answers thousands of
// "what if these nodes sleep" queries during one optimizer run, so its
// evaluation path has to be the fastest code in the crate.
//
// Key architectural principles:
// 1.  **Immutable Snapshot**: The oracle owns its exclusive table and overlap
//     list and never mutates them. Evaluating the same candidate twice yields
//     bit-identical results; callers can share one oracle across a whole run.
// 2.  **Resolution Independence**: Evaluation cost is
//     O(|overlap list| + |sleeping set|), independent of the grid precision
//     that produced the snapshot. The raster only pays its price once, at
//     build time.
// 3.  **Set Arithmetic, Not Geometry**: A sleeping node removes its exclusive
//     area outright. An overlapping region survives as long as one owner is
//     awake; it keeps counting as overlap only while two or more owners are
//     awake. A region left with exactly one awake owner is covered but no
//     longer redundant, so it moves into the exclusive-area figure instead.

use crate::core_modules::grid::NodeId;
use crate::core_modules::regions_converter::{ExclusiveTable, OverlapList};
use std::collections::HashSet;

/// Coverage and overlap figures for one sleep candidate. The `total_*`
/// fields are the no-sleep baseline of the snapshot; the `partial_*` fields
/// describe the evaluated candidate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CoverageInfo {
    /// Baseline covered area with every node awake.
    pub total_coverage: f64,
    /// Covered area once the candidate's sleeping nodes are removed.
    pub partial_coverage: f64,
    /// Baseline redundantly-covered area with every node awake.
    pub total_overlap: f64,
    /// Area still covered by two or more awake nodes under the candidate.
    pub partial_overlap: f64,
    /// Area covered by exactly one awake node under the candidate.
    pub exclusive_area: f64,
}

/// Immutable coverage snapshot for one cluster, queried by the optimizer.
pub struct CoverageOracle {
    total_coverage: f64,
    total_overlap: f64,
    exclusive: ExclusiveTable,
    overlapping: OverlapList,
}

impl CoverageOracle {
    pub fn new(exclusive: ExclusiveTable, overlapping: OverlapList) -> Self {
        let exclusive_total: f64 = exclusive.values().sum();
        let overlap_total: f64 = overlapping.iter().map(|(_, area)| area).sum();
        Self {
            total_coverage: exclusive_total + overlap_total,
            total_overlap: overlap_total,
            exclusive,
            overlapping,
        }
    }

    /// Baseline covered area with every node awake.
    pub fn total_coverage(&self) -> f64 {
        self.total_coverage
    }

    /// Baseline redundantly-covered area with every node awake.
    pub fn total_overlap(&self) -> f64 {
        self.total_overlap
    }

    /// Evaluates one candidate sleeping set. The hot path of the engine:
    /// one pass over the overlap list plus one lookup per sleeping node.
    pub fn evaluate(&self, sleeping: &HashSet<NodeId>) -> CoverageInfo {
        let mut partial_coverage = self.total_coverage;
        for id in sleeping {
            if let Some(area) = self.exclusive.get(id) {
                partial_coverage -= area;
            }
        }
        let mut exclusive_area = partial_coverage - self.total_overlap;

        let mut partial_overlap = 0.0;
        for (owners, area) in &self.overlapping {
            let awake_remains = owners
                .iter()
                .filter(|owner| !sleeping.contains(owner))
                .count();
            if awake_remains == 0 {
                // Every owner sleeps: the region goes uncovered.
                partial_coverage -= area;
            } else if awake_remains == 1 {
                // Covered, but no longer redundant.
                exclusive_area += area;
            } else {
                partial_overlap += area;
            }
        }

        CoverageInfo {
            total_coverage: self.total_coverage,
            partial_coverage,
            total_overlap: self.total_overlap,
            partial_overlap,
            exclusive_area,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::grid::Grid;
    use crate::core_modules::regions_converter::RegionsConverter;

    fn oracle_for(nodes: &[(NodeId, f64, f64, f64)]) -> CoverageOracle {
        let mut grid = Grid::new(100.0, 100.0, 1.0);
        for &(id, x, y, radius) in nodes {
            grid.add_node(id, x, y, radius);
        }
        let (exclusive, overlapping) = RegionsConverter::new(&grid).unwrap().convert();
        CoverageOracle::new(exclusive, overlapping)
    }

    fn sleeping(ids: &[NodeId]) -> HashSet<NodeId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn empty_sleeping_set_returns_the_baseline() {
        let oracle = oracle_for(&[
            (1, 40.0, 50.0, 10.0),
            (2, 50.0, 50.0, 10.0),
            (3, 80.0, 80.0, 5.0),
        ]);
        let info = oracle.evaluate(&sleeping(&[]));
        assert_eq!(info.partial_coverage, oracle.total_coverage());
        assert_eq!(info.partial_overlap, oracle.total_overlap());
    }

    #[test]
    fn all_nodes_sleeping_leaves_nothing_covered() {
        let oracle = oracle_for(&[(1, 40.0, 50.0, 10.0), (2, 50.0, 50.0, 10.0)]);
        let info = oracle.evaluate(&sleeping(&[1, 2]));
        assert!(info.partial_coverage.abs() < 1e-9);
        assert!(info.partial_overlap.abs() < 1e-9);
    }

    #[test]
    fn sleeping_more_nodes_never_increases_coverage_or_overlap() {
        let oracle = oracle_for(&[
            (1, 40.0, 50.0, 10.0),
            (2, 50.0, 50.0, 10.0),
            (3, 46.0, 55.0, 10.0),
            (4, 30.0, 30.0, 8.0),
        ]);
        let chains: [&[NodeId]; 4] = [&[], &[2], &[2, 3], &[2, 3, 4]];
        let mut last = oracle.evaluate(&sleeping(chains[0]));
        for ids in &chains[1..] {
            let info = oracle.evaluate(&sleeping(ids));
            assert!(info.partial_coverage <= last.partial_coverage + 1e-9);
            assert!(info.partial_overlap <= last.partial_overlap + 1e-9);
            last = info;
        }
    }

    #[test]
    fn evaluation_is_idempotent() {
        let oracle = oracle_for(&[(1, 40.0, 50.0, 10.0), (2, 50.0, 50.0, 10.0)]);
        let ids = sleeping(&[1]);
        let first = oracle.evaluate(&ids);
        let second = oracle.evaluate(&ids);
        assert_eq!(first, second);
    }

    #[test]
    fn sleeping_one_of_two_coincident_nodes_keeps_coverage_and_clears_overlap() {
        // Scenario: identical position and radius, so the footprints overlap
        // completely. Sleeping either node must not cost any coverage.
        let oracle = oracle_for(&[(1, 50.0, 50.0, 10.0), (2, 50.0, 50.0, 10.0)]);
        assert_eq!(oracle.total_overlap(), oracle.total_coverage());

        let info = oracle.evaluate(&sleeping(&[1]));
        assert!((info.partial_coverage - oracle.total_coverage()).abs() < 1e-9);
        assert!(info.partial_overlap.abs() < 1e-9);
        assert!((info.exclusive_area - oracle.total_coverage()).abs() < 1e-9);
    }

    #[test]
    fn unknown_ids_in_the_sleeping_set_change_nothing() {
        let oracle = oracle_for(&[(1, 40.0, 50.0, 10.0), (2, 50.0, 50.0, 10.0)]);
        let info = oracle.evaluate(&sleeping(&[99]));
        assert_eq!(info.partial_coverage, oracle.total_coverage());
        assert_eq!(info.partial_overlap, oracle.total_overlap());
    }
}
