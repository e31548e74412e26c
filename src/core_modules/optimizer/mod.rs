// THEORY:
// The optimizer module is the decision-making layer of the engine. It searches
// the space of binary awake/sleep assignments for one cluster, using the
// `CoverageOracle` as its fitness oracle. Four search variants exist; they
// share everything except their mutation/crossover operators, so the shared
// machinery lives here in `SearchState` and the variants are thin strategy
// structs behind the `SleepOptimizer` trait.
//
// Key architectural principles:
// 1.  **One Interface, Many Strategies**: The driver picks a variant from
//     configuration, constructs it once per cluster, and then only talks to
//     the `SleepOptimizer` trait. Dispatch happens once per cluster, never
//     inside the generation loop.
// 2.  **Borrowed Oracle**: The oracle owns its snapshot; the optimizer only
//     borrows it for the duration of a run and owns its own population
//     buffers. Nothing here mutates shared state.
// 3.  **Deterministic Search**: All randomness flows through a single seeded
//     `ChaCha8Rng` that is re-seeded at the start of every run. A fixed seed
//     therefore reproduces candidates and learning traces bit-for-bit.
// 4.  **Degenerate Inputs Are Not Errors**: Any fitness term with a zero
//     denominator contributes zero instead of failing. The only hard errors
//     are caller bugs: an empty candidate or a candidate with no mutable gene
//     fails fast instead of spinning forever looking for something to flip.

pub mod binary_pso;
pub mod ecca;
pub mod genetic_algorithm;
pub mod modified_pso;

use crate::core_modules::coverage_oracle::{CoverageInfo, CoverageOracle};
use crate::core_modules::grid::NodeId;
use crate::error::CoverageError;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use binary_pso::BinaryPso;
use ecca::Ecca;
use genetic_algorithm::GeneticAlgorithm;
use modified_pso::ModifiedPso;

/// One proposed sleep/wake assignment, one gene per cluster sensor node.
/// `true` means the node stays awake.
pub type Candidate = Vec<bool>;

/// Which search strategy drives a cluster's scheduling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Variant {
    ModifiedPso,
    GeneticAlgorithm,
    BinaryPso,
    Ecca,
}

/// Tunables for one optimizer instance. Weights and rates are policy decided
/// by the simulation layer; the engine only enforces their mechanics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    pub variant: Variant,
    /// Population size (individuals per generation).
    pub nb_individuals: usize,
    /// Fixed generation budget. There is no convergence-based early exit.
    pub max_generations: usize,
    /// Weight of the residual-energy term.
    pub fitness_alpha: f64,
    /// Weight of the coverage-retention term.
    pub fitness_beta: f64,
    /// Weight of the overlap-avoidance term.
    pub fitness_gamma: f64,
    /// Mutation-rate schedule bounds: the rate decreases linearly from
    /// `wmax` to `wmin` across the generation budget.
    pub wmax: f64,
    pub wmin: f64,
    /// Seed for the run's random stream. Reusing a seed reproduces the run.
    pub seed: u64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            variant: Variant::ModifiedPso,
            nb_individuals: 10,
            max_generations: 50,
            fitness_alpha: 0.34,
            fitness_beta: 0.33,
            fitness_gamma: 0.33,
            wmax: 0.6,
            wmin: 0.1,
            seed: 0,
        }
    }
}

/// Fitness of one candidate: the weighted total plus the individual terms,
/// kept separately for the per-term observability traces.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fitness {
    pub total: f64,
    pub term1: f64,
    pub term2: f64,
    pub coverage: CoverageInfo,
}

/// The strategy interface every optimizer variant implements. Constructed
/// once per cluster per scheduling event and discarded after the run.
pub trait SleepOptimizer {
    /// Runs the full generation budget and returns the best candidate found.
    fn run(&mut self, energies: &[f64]) -> Result<Candidate, CoverageError>;
    /// Best candidate of the last run.
    fn best_candidate(&self) -> &Candidate;
    /// Best candidate's coverage retention, relative to the baseline.
    fn best_coverage(&self) -> f64;
    /// Best candidate's remaining overlap, relative to the baseline.
    fn best_overlap(&self) -> f64;
    /// Best fitness at each generation of the last run.
    fn learning_trace(&self) -> &[f64];
    /// Energy term of the best fitness at each generation.
    fn term1_trace(&self) -> &[f64];
    /// Coverage term of the best fitness at each generation.
    fn term2_trace(&self) -> &[f64];
}

/// Builds the configured variant, bound to the cluster's oracle. `ids`,
/// `sleep_probs`, and the later `energies` slice are parallel per-node views
/// translated by the driver; the optimizer never touches node objects.
pub fn build_optimizer<'a>(
    oracle: &'a CoverageOracle,
    ids: Vec<NodeId>,
    sleep_probs: Vec<f64>,
    config: OptimizerConfig,
) -> Result<Box<dyn SleepOptimizer + 'a>, CoverageError> {
    let variant = config.variant;
    let state = SearchState::new(oracle, ids, sleep_probs, config)?;
    Ok(match variant {
        Variant::ModifiedPso => Box::new(ModifiedPso::new(state)),
        Variant::GeneticAlgorithm => Box::new(GeneticAlgorithm::new(state)),
        Variant::BinaryPso => Box::new(BinaryPso::new(state)),
        Variant::Ecca => Box::new(Ecca::new(state)),
    })
}

/// Population, elitism bookkeeping, and fitness machinery shared by every
/// variant. Variants own one of these and differ only in how they perturb
/// the population each generation.
pub struct SearchState<'a> {
    pub(crate) oracle: &'a CoverageOracle,
    pub(crate) ids: Vec<NodeId>,
    pub(crate) sleep_probs: Vec<f64>,
    pub(crate) config: OptimizerConfig,
    pub(crate) nb_nodes: usize,

    /// Gene indices the search may flip: nonzero sleep probability and a
    /// live battery. The pinned cluster head is never in here.
    pub(crate) can_sleep: Vec<usize>,

    pub(crate) population: Vec<Candidate>,
    pub(crate) best_locals: Vec<Candidate>,
    pub(crate) best_local_fitness: Vec<Fitness>,
    pub(crate) best_global: Candidate,
    pub(crate) best_global_fitness: Fitness,

    pub(crate) learning_trace: Vec<f64>,
    pub(crate) term1_trace: Vec<f64>,
    pub(crate) term2_trace: Vec<f64>,

    pub(crate) energies: Vec<f64>,
    pub(crate) total_energy: f64,

    pub(crate) rng: ChaCha8Rng,
}

impl<'a> SearchState<'a> {
    pub(crate) fn new(
        oracle: &'a CoverageOracle,
        ids: Vec<NodeId>,
        sleep_probs: Vec<f64>,
        config: OptimizerConfig,
    ) -> Result<Self, CoverageError> {
        let nb_nodes = ids.len();
        if nb_nodes == 0 {
            return Err(CoverageError::EmptyCandidate);
        }
        debug_assert_eq!(sleep_probs.len(), nb_nodes);

        let seed = config.seed;
        Ok(Self {
            oracle,
            ids,
            sleep_probs,
            nb_nodes,
            can_sleep: Vec::new(),
            population: Vec::new(),
            best_locals: Vec::new(),
            best_local_fitness: Vec::new(),
            best_global: vec![true; nb_nodes],
            best_global_fitness: Fitness {
                total: f64::NEG_INFINITY,
                ..Fitness::default()
            },
            learning_trace: Vec::with_capacity(config.max_generations),
            term1_trace: Vec::with_capacity(config.max_generations),
            term2_trace: Vec::with_capacity(config.max_generations),
            energies: Vec::new(),
            total_energy: 0.0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            config,
        })
    }

    /// Resets all per-run state: traces, random stream, session energies,
    /// the mutable-gene set, and a freshly drawn population with its fitness.
    pub(crate) fn begin_session(&mut self, energies: &[f64]) -> Result<(), CoverageError> {
        debug_assert_eq!(energies.len(), self.nb_nodes);
        self.learning_trace.clear();
        self.term1_trace.clear();
        self.term2_trace.clear();
        self.rng = ChaCha8Rng::seed_from_u64(self.config.seed);

        self.energies = energies.to_vec();
        self.total_energy = self.energies.iter().sum();

        self.can_sleep = (0..self.nb_nodes)
            .filter(|&idx| self.sleep_probs[idx] > 0.0 && self.energies[idx] > 0.0)
            .collect();
        if self.can_sleep.is_empty() {
            return Err(CoverageError::NoMutableGenes {
                nb_nodes: self.nb_nodes,
            });
        }

        self.best_global = vec![true; self.nb_nodes];
        self.best_global_fitness = Fitness {
            total: f64::NEG_INFINITY,
            ..Fitness::default()
        };
        self.create_population();
        self.update_fitness();
        Ok(())
    }

    /// Draws the initial population: a gene stays awake when a uniform draw
    /// exceeds the node's sleep probability. Pinned genes (probability zero)
    /// always come out awake and are additionally forced, so no random
    /// quirk can put the cluster head to sleep.
    fn create_population(&mut self) {
        let nb = self.config.nb_individuals;
        self.population = (0..nb)
            .map(|_| {
                (0..self.nb_nodes)
                    .map(|idx| {
                        let draw: f64 = self.rng.gen_range(0.0..1.0);
                        self.sleep_probs[idx] == 0.0 || draw > self.sleep_probs[idx]
                    })
                    .collect()
            })
            .collect();
        self.best_locals = self.population.clone();
        self.best_local_fitness = vec![
            Fitness {
                total: f64::NEG_INFINITY,
                ..Fitness::default()
            };
            nb
        ];
    }

    /// The fitness policy shared by all variants. Every term guards its own
    /// denominator: a term that cannot be computed contributes zero.
    pub(crate) fn evaluate(&self, candidate: &Candidate) -> Fitness {
        let mut sleeping: HashSet<NodeId> = HashSet::new();
        let mut awake_energy = 0.0;
        for (idx, &awake) in candidate.iter().enumerate() {
            if awake {
                awake_energy += self.energies[idx];
            } else {
                sleeping.insert(self.ids[idx]);
            }
        }
        let coverage = self.oracle.evaluate(&sleeping);

        let term1 = if self.total_energy != 0.0 {
            1.0 - awake_energy / self.total_energy
        } else {
            0.0
        };
        let term2 = if coverage.total_coverage != 0.0 {
            coverage.partial_coverage / coverage.total_coverage
        } else {
            0.0
        };
        let term3 = if coverage.partial_overlap != 0.0 {
            coverage.total_overlap / coverage.partial_overlap
        } else {
            0.0
        };

        let cfg = &self.config;
        Fitness {
            total: cfg.fitness_alpha * term1 + cfg.fitness_beta * term2 + cfg.fitness_gamma * term3,
            term1,
            term2,
            coverage,
        }
    }

    /// Re-evaluates the whole population and refreshes the personal and
    /// global bests (elitism).
    pub(crate) fn update_fitness(&mut self) {
        for idx in 0..self.population.len() {
            self.refresh_individual(idx);
        }
    }

    /// Re-evaluates one individual and folds it into the elitism records.
    pub(crate) fn refresh_individual(&mut self, idx: usize) {
        let fitness = self.evaluate(&self.population[idx]);
        if fitness.total > self.best_local_fitness[idx].total {
            self.best_locals[idx] = self.population[idx].clone();
            self.best_local_fitness[idx] = fitness;
        }
        if fitness.total > self.best_global_fitness.total {
            self.best_global = self.population[idx].clone();
            self.best_global_fitness = fitness;
        }
    }

    /// Mutation-rate schedule: linear from `wmax` down to `wmin`.
    pub(crate) fn mutation_rate(&self, generation: usize) -> f64 {
        let cfg = &self.config;
        cfg.wmax - (cfg.wmax - cfg.wmin) * generation as f64 / cfg.max_generations as f64
    }

    /// Flips one uniformly chosen mutable gene of the given individual.
    pub(crate) fn flip_random_gene(&mut self, idx: usize) {
        let pick = self.rng.gen_range(0..self.can_sleep.len());
        let gene = self.can_sleep[pick];
        self.population[idx][gene] = !self.population[idx][gene];
    }

    /// Flips `rate · |mutable genes|` distinct mutable genes of the given
    /// individual, sampling without replacement.
    pub(crate) fn mutate_many(&mut self, idx: usize, rate: f64) {
        let mut pool = self.can_sleep.clone();
        let nb_changes = (rate * pool.len() as f64) as usize;
        for _ in 0..nb_changes {
            let pick = self.rng.gen_range(0..pool.len());
            let gene = pool.swap_remove(pick);
            self.population[idx][gene] = !self.population[idx][gene];
        }
    }

    /// Appends the current global best to the observability traces. Called
    /// once per generation by every variant.
    pub(crate) fn record_generation(&mut self) {
        self.learning_trace.push(self.best_global_fitness.total);
        self.term1_trace.push(self.best_global_fitness.term1);
        self.term2_trace.push(self.best_global_fitness.term2);
    }

    pub(crate) fn best_coverage(&self) -> f64 {
        let coverage = &self.best_global_fitness.coverage;
        if coverage.total_coverage != 0.0 {
            coverage.partial_coverage / coverage.total_coverage
        } else {
            0.0
        }
    }

    pub(crate) fn best_overlap(&self) -> f64 {
        let coverage = &self.best_global_fitness.coverage;
        if coverage.total_overlap != 0.0 {
            coverage.partial_overlap / coverage.total_overlap
        } else {
            0.0
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core_modules::grid::Grid;
    use crate::core_modules::regions_converter::RegionsConverter;

    /// A five-node cluster with heavy redundancy around the center. Node 0
    /// plays the cluster head (sleep probability zero).
    pub(crate) fn test_oracle() -> CoverageOracle {
        let mut grid = Grid::new(100.0, 100.0, 1.0);
        grid.add_node(0, 50.0, 50.0, 15.0);
        grid.add_node(1, 52.0, 50.0, 15.0);
        grid.add_node(2, 48.0, 52.0, 15.0);
        grid.add_node(3, 50.0, 47.0, 15.0);
        grid.add_node(4, 75.0, 75.0, 15.0);
        let (exclusive, overlapping) = RegionsConverter::new(&grid).unwrap().convert();
        CoverageOracle::new(exclusive, overlapping)
    }

    pub(crate) fn test_setup() -> (Vec<NodeId>, Vec<f64>, Vec<f64>) {
        let ids = vec![0, 1, 2, 3, 4];
        let sleep_probs = vec![0.0, 0.5, 0.5, 0.5, 0.5];
        let energies = vec![2.0, 1.8, 1.5, 1.9, 1.2];
        (ids, sleep_probs, energies)
    }

    fn config(variant: Variant) -> OptimizerConfig {
        OptimizerConfig {
            variant,
            seed: 42,
            ..OptimizerConfig::default()
        }
    }

    #[test]
    fn empty_candidate_fails_fast() {
        let oracle = test_oracle();
        let result = build_optimizer(&oracle, vec![], vec![], config(Variant::ModifiedPso));
        assert!(matches!(result, Err(CoverageError::EmptyCandidate)));
    }

    #[test]
    fn all_pinned_cluster_fails_fast() {
        let oracle = test_oracle();
        let mut optimizer = build_optimizer(
            &oracle,
            vec![0, 1],
            vec![0.0, 0.0],
            config(Variant::ModifiedPso),
        )
        .unwrap();
        let result = optimizer.run(&[2.0, 2.0]);
        assert!(matches!(
            result,
            Err(CoverageError::NoMutableGenes { nb_nodes: 2 })
        ));
    }

    #[test]
    fn zero_overlap_baseline_is_not_an_error() {
        // Two disjoint footprints: no overlap anywhere, so the overlap term
        // must contribute zero instead of dividing by zero.
        let mut grid = Grid::new(100.0, 100.0, 1.0);
        grid.add_node(0, 20.0, 20.0, 5.0);
        grid.add_node(1, 80.0, 80.0, 5.0);
        let (exclusive, overlapping) = RegionsConverter::new(&grid).unwrap().convert();
        let oracle = CoverageOracle::new(exclusive, overlapping);

        let mut optimizer = build_optimizer(
            &oracle,
            vec![0, 1],
            vec![0.0, 0.5],
            config(Variant::ModifiedPso),
        )
        .unwrap();
        let best = optimizer.run(&[2.0, 2.0]).unwrap();
        assert_eq!(best.len(), 2);
        assert!(optimizer.best_overlap() >= 0.0);
    }

    #[test]
    fn every_variant_pins_the_head_awake() {
        let oracle = test_oracle();
        let (ids, sleep_probs, energies) = test_setup();
        for variant in [
            Variant::ModifiedPso,
            Variant::GeneticAlgorithm,
            Variant::BinaryPso,
            Variant::Ecca,
        ] {
            for seed in [1u64, 7, 99, 12345] {
                let cfg = OptimizerConfig {
                    variant,
                    seed,
                    ..OptimizerConfig::default()
                };
                let mut optimizer =
                    build_optimizer(&oracle, ids.clone(), sleep_probs.clone(), cfg).unwrap();
                let best = optimizer.run(&energies).unwrap();
                assert!(best[0], "head slept under {variant:?} seed {seed}");
            }
        }
    }

    #[test]
    fn fixed_seed_reproduces_candidate_and_trace() {
        let oracle = test_oracle();
        let (ids, sleep_probs, energies) = test_setup();

        let mut run_once = || {
            let mut optimizer = build_optimizer(
                &oracle,
                ids.clone(),
                sleep_probs.clone(),
                config(Variant::ModifiedPso),
            )
            .unwrap();
            let best = optimizer.run(&energies).unwrap();
            (best, optimizer.learning_trace().to_vec())
        };

        let (best_a, trace_a) = run_once();
        let (best_b, trace_b) = run_once();
        assert_eq!(best_a, best_b);
        assert_eq!(trace_a, trace_b);
        assert_eq!(trace_a.len(), OptimizerConfig::default().max_generations);
    }

    #[test]
    fn repeated_runs_on_one_instance_are_reproducible() {
        let oracle = test_oracle();
        let (ids, sleep_probs, energies) = test_setup();
        let mut optimizer =
            build_optimizer(&oracle, ids, sleep_probs, config(Variant::ModifiedPso)).unwrap();

        let first = optimizer.run(&energies).unwrap();
        let first_trace = optimizer.learning_trace().to_vec();
        let second = optimizer.run(&energies).unwrap();
        assert_eq!(first, second);
        assert_eq!(first_trace, optimizer.learning_trace());
    }
}
