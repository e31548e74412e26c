// THEORY:
// `GeneticAlgorithm` is the classic generational variant. Selection is
// implicit in the ranking: each generation the population is ranked by
// current fitness, the worst 60% are rebuilt, and the fittest 40% survive
// untouched (cloning-by-survival elitism).
//
// Operators:
// 1.  **Uniform Crossover**: a replaced individual draws a father and a
//     mother uniformly from the surviving fit fraction (possibly the same
//     individual) and takes each mutable gene from either parent with equal
//     probability. Crossover itself fires with probability `1 − g/G`, so late
//     generations mostly refine through mutation.
// 2.  **Multi-Gene Mutation**: flips `rate · |mutable genes|` distinct genes,
//     with the rate decaying linearly from `wmax` to `wmin`.
// Pinned genes are never crossed over nor mutated; both operators only walk
// the mutable-gene set.

use crate::core_modules::optimizer::{Candidate, SearchState, SleepOptimizer};
use crate::error::CoverageError;
use rand::Rng;

/// Fraction of the population replaced each generation.
const UNFIT_FRACTION: f64 = 0.6;

pub struct GeneticAlgorithm<'a> {
    state: SearchState<'a>,
}

impl<'a> GeneticAlgorithm<'a> {
    pub(crate) fn new(state: SearchState<'a>) -> Self {
        Self { state }
    }

    /// Ranks individuals by current fitness, worst first. Ties break on the
    /// index so the ordering stays deterministic.
    fn rank_population(state: &SearchState) -> Vec<usize> {
        let mut ranked: Vec<(usize, f64)> = state
            .population
            .iter()
            .enumerate()
            .map(|(idx, candidate)| (idx, state.evaluate(candidate).total))
            .collect();
        ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.into_iter().map(|(idx, _)| idx).collect()
    }
}

impl SleepOptimizer for GeneticAlgorithm<'_> {
    fn run(&mut self, energies: &[f64]) -> Result<Candidate, CoverageError> {
        let state = &mut self.state;
        state.begin_session(energies)?;

        let generations = state.config.max_generations;
        let nb_individuals = state.population.len();
        let nb_unfit = (UNFIT_FRACTION * nb_individuals as f64) as usize;

        for generation in 0..generations {
            let mutation_rate = state.mutation_rate(generation);
            let crossover_rate = 1.0 - generation as f64 / generations as f64;

            let ranked = Self::rank_population(state);
            for &idx in ranked.iter().take(nb_unfit) {
                if state.rng.gen_range(0.0..1.0) < crossover_rate {
                    // Parents come from the surviving fit fraction; father
                    // and mother may be the same individual.
                    let father_rank = state.rng.gen_range(nb_unfit..nb_individuals);
                    let mother_rank = state.rng.gen_range(nb_unfit..nb_individuals);
                    let father = state.population[ranked[father_rank]].clone();
                    let mother = state.population[ranked[mother_rank]].clone();

                    for k in 0..state.can_sleep.len() {
                        let gene = state.can_sleep[k];
                        let from_father = state.rng.gen_range(0.0..1.0) < 0.5;
                        state.population[idx][gene] =
                            if from_father { father[gene] } else { mother[gene] };
                    }
                }

                state.mutate_many(idx, mutation_rate);
                state.refresh_individual(idx);
            }
            state.record_generation();
        }
        Ok(state.best_global.clone())
    }

    fn best_candidate(&self) -> &Candidate {
        &self.state.best_global
    }

    fn best_coverage(&self) -> f64 {
        self.state.best_coverage()
    }

    fn best_overlap(&self) -> f64 {
        self.state.best_overlap()
    }

    fn learning_trace(&self) -> &[f64] {
        &self.state.learning_trace
    }

    fn term1_trace(&self) -> &[f64] {
        &self.state.term1_trace
    }

    fn term2_trace(&self) -> &[f64] {
        &self.state.term2_trace
    }
}

#[cfg(test)]
mod tests {
    use crate::core_modules::optimizer::tests::{test_oracle, test_setup};
    use crate::core_modules::optimizer::{build_optimizer, OptimizerConfig, SleepOptimizer, Variant};

    #[test]
    fn improves_over_the_generation_budget() {
        let oracle = test_oracle();
        let (ids, sleep_probs, energies) = test_setup();
        let config = OptimizerConfig {
            variant: Variant::GeneticAlgorithm,
            seed: 5,
            ..OptimizerConfig::default()
        };
        let mut optimizer = build_optimizer(&oracle, ids, sleep_probs, config).unwrap();
        optimizer.run(&energies).unwrap();

        let trace = optimizer.learning_trace();
        assert_eq!(trace.len(), 50);
        assert!(trace.last().unwrap() >= trace.first().unwrap());
        for window in trace.windows(2) {
            assert!(window[1] >= window[0]);
        }
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let oracle = test_oracle();
        let (ids, sleep_probs, energies) = test_setup();
        let config = OptimizerConfig {
            variant: Variant::GeneticAlgorithm,
            seed: 9,
            ..OptimizerConfig::default()
        };

        let mut first = build_optimizer(&oracle, ids.clone(), sleep_probs.clone(), config.clone())
            .unwrap();
        let mut second = build_optimizer(&oracle, ids, sleep_probs, config).unwrap();
        assert_eq!(
            first.run(&energies).unwrap(),
            second.run(&energies).unwrap()
        );
        assert_eq!(first.learning_trace(), second.learning_trace());
    }
}
