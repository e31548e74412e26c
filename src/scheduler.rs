// THEORY:
// The `scheduler` module is the top-level API for one cluster's scheduling
// decision. It encapsulates the full stack — rasterizer, region extractor,
// coverage oracle, optimizer — behind a single call, so the routing layer
// never touches the internals.
//
// Key architectural principles:
// 1.  **Plain Numeric Boundary**: the driver translates `SensorNode` objects
//     into the optimizer's flat id/probability/energy arrays and translates
//     the winning candidate back into `is_sleeping` flags. The optimizer and
//     oracle never hold references to node objects.
// 2.  **Rebuild, Don't Patch**: the grid, regions, and oracle are rebuilt
//     from current member positions on every scheduling event. Nothing is
//     persisted across topology changes, so there is no cache to invalidate.
// 3.  **Head Pinning, Twice**: the cluster head gets sleep probability zero,
//     which pins its gene inside the optimizer — and the driver forces the
//     head awake again when writing results back, in case an optimizer
//     variant ever misbehaves.
// 4.  **Degenerate Clusters Short-Circuit**: with one alive member or fewer
//     there is nothing to decide; keeping the survivor awake is the only
//     valid assignment and is not an error.

use crate::core_modules::coverage_oracle::CoverageOracle;
use crate::core_modules::grid::{Grid, NodeId};
use crate::core_modules::optimizer::{build_optimizer, OptimizerConfig, SleepOptimizer};
use crate::core_modules::regions_converter::RegionsConverter;
use crate::error::CoverageError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Sleep probability given to every schedulable node. Heads, dead nodes, and
/// nodes with no overlapping neighbor stay at zero and are never put to sleep.
const DEFAULT_SLEEP_PROB: f64 = 0.5;

/// Configuration for the scheduling stack. Defaults mirror the reference
/// 250 m × 250 m field with 15 m sensing radius and 1 m grid precision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Horizontal extent of the sensing field, meters.
    pub field_width: f64,
    /// Vertical extent of the sensing field, meters.
    pub field_height: f64,
    /// Sensing radius shared by every node, meters.
    pub coverage_radius: f64,
    /// Rasterization cell side, meters. Smaller is more accurate and slower.
    pub grid_precision: f64,
    /// When set, regions below this fraction of total coverage are dropped
    /// before extraction. Off by default; it distorts coverage accounting.
    pub small_region_fraction: Option<f64>,
    pub optimizer: OptimizerConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            field_width: 250.0,
            field_height: 250.0,
            coverage_radius: 15.0,
            grid_precision: 1.0,
            small_region_fraction: None,
            optimizer: OptimizerConfig::default(),
        }
    }
}

/// The routing layer's view of one sensor node, as handed to the scheduler.
/// The driver owns the cluster slice exclusively for the duration of one
/// `schedule` call and writes `is_sleeping` back onto it.
#[derive(Debug, Clone)]
pub struct SensorNode {
    pub id: NodeId,
    pub pos_x: f64,
    pub pos_y: f64,
    /// Residual battery, Joules. Zero means the node is depleted.
    pub energy: f64,
    pub alive: bool,
    /// The designated cluster head. Never put to sleep.
    pub is_head: bool,
    pub is_sleeping: bool,
    /// Number of alive nodes whose footprint overlaps this one. Rebuilt by
    /// the driver at every scheduling event.
    pub nb_neighbors: usize,
    /// Probability used when drawing initial candidates. Rebuilt by the
    /// driver; zero pins the node awake.
    pub sleep_prob: f64,
}

impl SensorNode {
    pub fn new(id: NodeId, pos_x: f64, pos_y: f64, energy: f64) -> Self {
        Self {
            id,
            pos_x,
            pos_y,
            energy,
            alive: true,
            is_head: false,
            is_sleeping: false,
            nb_neighbors: 0,
            sleep_prob: 0.0,
        }
    }
}

/// Per-run diagnostics handed to the tracer layer. Never required for
/// correctness.
#[derive(Debug, Clone, Default)]
pub struct ScheduleLog {
    /// Best candidate's retained coverage, relative to the baseline.
    pub coverage_ratio: f64,
    /// Best candidate's remaining overlap, relative to the baseline.
    pub overlap_ratio: f64,
    /// Fraction of alive members put to sleep.
    pub sleeping_fraction: f64,
    pub initial_fitness: f64,
    pub final_fitness: f64,
    /// Best fitness at each generation.
    pub learning_trace: Vec<f64>,
}

/// Orchestrates one cluster's sleep scheduling decision per event.
pub struct SleepScheduler {
    config: SchedulerConfig,
}

impl SleepScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Decides which members of the cluster sleep this round and writes the
    /// flags back. Returns `None` for degenerate clusters (nothing to decide).
    pub fn schedule(
        &self,
        cluster: &mut [SensorNode],
    ) -> Result<Option<ScheduleLog>, CoverageError> {
        let nb_alive = cluster.iter().filter(|node| node.alive).count();
        if nb_alive <= 1 {
            // Keeping the sole survivor awake is the only valid decision.
            for node in cluster.iter_mut() {
                if node.alive {
                    node.is_sleeping = false;
                }
            }
            debug!(nb_alive, "degenerate cluster, skipping scheduling");
            return Ok(None);
        }

        self.update_sleep_probs(cluster);

        // Working set: alive members only. Dead nodes are excluded entirely,
        // they neither cover anything nor appear in the candidate.
        let members: Vec<usize> = (0..cluster.len()).filter(|&i| cluster[i].alive).collect();

        if members.iter().all(|&i| cluster[i].sleep_prob == 0.0) {
            // Every member is pinned (heads, lone coverers): nothing may
            // sleep, so there is no search to run.
            for &i in &members {
                cluster[i].is_sleeping = false;
            }
            debug!(nb_alive, "no schedulable member, keeping everyone awake");
            return Ok(None);
        }

        let mut grid = Grid::new(
            self.config.field_width,
            self.config.field_height,
            self.config.grid_precision,
        );
        for &i in &members {
            let node = &cluster[i];
            grid.add_node(node.id, node.pos_x, node.pos_y, self.config.coverage_radius);
        }
        let converter = RegionsConverter::with_pruning(&grid, self.config.small_region_fraction)?;
        let (exclusive, overlapping) = converter.convert();
        let oracle = CoverageOracle::new(exclusive, overlapping);

        let ids: Vec<NodeId> = members.iter().map(|&i| cluster[i].id).collect();
        let sleep_probs: Vec<f64> = members.iter().map(|&i| cluster[i].sleep_prob).collect();
        let energies: Vec<f64> = members.iter().map(|&i| cluster[i].energy).collect();

        let mut optimizer =
            build_optimizer(&oracle, ids, sleep_probs, self.config.optimizer.clone())?;
        let best = optimizer.run(&energies)?;

        // Write the winning assignment back. The head is forced awake even
        // if the optimizer produced something else.
        let mut nb_sleeping = 0usize;
        for (gene, &i) in members.iter().enumerate() {
            let node = &mut cluster[i];
            node.is_sleeping = !best[gene] && !node.is_head;
            if node.is_sleeping {
                nb_sleeping += 1;
            }
        }

        let trace = optimizer.learning_trace().to_vec();
        let log = ScheduleLog {
            coverage_ratio: optimizer.best_coverage(),
            overlap_ratio: optimizer.best_overlap(),
            sleeping_fraction: nb_sleeping as f64 / nb_alive as f64,
            initial_fitness: trace.first().copied().unwrap_or(0.0),
            final_fitness: trace.last().copied().unwrap_or(0.0),
            learning_trace: trace,
        };
        info!(
            nb_alive,
            nb_sleeping,
            coverage = log.coverage_ratio,
            overlap = log.overlap_ratio,
            "cluster scheduled"
        );
        Ok(Some(log))
    }

    /// Rebuilds neighbor counts and sleep probabilities for the cluster.
    /// Footprints overlap when centers are closer than twice the radius.
    /// Heads, dead nodes, and nodes without any overlapping neighbor keep
    /// probability zero — a lone coverer must not be offered for sleep.
    fn update_sleep_probs(&self, cluster: &mut [SensorNode]) {
        let diameter = 2.0 * self.config.coverage_radius;
        let diameter_sq = diameter * diameter;

        for i in 0..cluster.len() {
            if !cluster[i].alive {
                cluster[i].nb_neighbors = 0;
                cluster[i].sleep_prob = 0.0;
                continue;
            }
            let mut nb_neighbors = 0;
            for j in 0..cluster.len() {
                if i == j || !cluster[j].alive {
                    continue;
                }
                let dx = cluster[i].pos_x - cluster[j].pos_x;
                let dy = cluster[i].pos_y - cluster[j].pos_y;
                if dx * dx + dy * dy < diameter_sq {
                    nb_neighbors += 1;
                }
            }
            cluster[i].nb_neighbors = nb_neighbors;
            cluster[i].sleep_prob = if cluster[i].is_head || nb_neighbors == 0 {
                0.0
            } else {
                DEFAULT_SLEEP_PROB
            };
        }
    }
}
