// THEORY:
// `Ecca` (energy-centric coverage-aware variant) replaces crossover with an
// *influence* operator: instead of splicing whole gene ranges, it copies
// individual differing genes from a better candidate with some probability.
// The pull is scheduled like the other variants — early generations listen to
// the personal best, late generations to the global best — and a *move* step
// then flips a scheduled share of mutable genes to keep exploring.
//
// The operators only ever touch the mutable-gene set, so pinned genes pass
// through every generation untouched.

use crate::core_modules::optimizer::{Candidate, SearchState, SleepOptimizer};
use crate::error::CoverageError;
use rand::Rng;

pub struct Ecca<'a> {
    state: SearchState<'a>,
}

impl<'a> Ecca<'a> {
    pub(crate) fn new(state: SearchState<'a>) -> Self {
        Self { state }
    }

    /// Copies each mutable gene where `original` and `influencer` disagree
    /// into `target` with probability `rate`.
    fn influence(
        state: &mut SearchState,
        original: &Candidate,
        influencer: &Candidate,
        target: &mut Candidate,
        rate: f64,
    ) {
        for k in 0..state.can_sleep.len() {
            let gene = state.can_sleep[k];
            if original[gene] != influencer[gene] && state.rng.gen_range(0.0..1.0) < rate {
                target[gene] = influencer[gene];
            }
        }
    }
}

impl SleepOptimizer for Ecca<'_> {
    fn run(&mut self, energies: &[f64]) -> Result<Candidate, CoverageError> {
        let state = &mut self.state;
        state.begin_session(energies)?;

        let generations = state.config.max_generations;
        for generation in 0..generations {
            // The move step reuses the mutation schedule as its step size.
            let acceleration = state.mutation_rate(generation);
            let local_pull = 1.0 - generation as f64 / generations as f64;
            let global_pull = 1.0 - local_pull;

            for idx in 0..state.population.len() {
                let original = state.population[idx].clone();
                let mut target = original.clone();

                let local_rate = local_pull * state.rng.gen_range(0.0..1.0);
                let personal_best = state.best_locals[idx].clone();
                Self::influence(state, &original, &personal_best, &mut target, local_rate);

                let global_rate = global_pull * state.rng.gen_range(0.0..1.0);
                let global_best = state.best_global.clone();
                Self::influence(state, &original, &global_best, &mut target, global_rate);

                state.population[idx] = target;
                state.mutate_many(idx, acceleration);
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
    fn influence_search_improves_and_reports_terms() {
        let oracle = test_oracle();
        let (ids, sleep_probs, energies) = test_setup();
        let config = OptimizerConfig {
            variant: Variant::Ecca,
            seed: 17,
            ..OptimizerConfig::default()
        };
        let mut optimizer = build_optimizer(&oracle, ids, sleep_probs, config).unwrap();
        optimizer.run(&energies).unwrap();

        let trace = optimizer.learning_trace();
        assert_eq!(trace.len(), 50);
        for window in trace.windows(2) {
            assert!(window[1] >= window[0]);
        }
        assert_eq!(optimizer.term1_trace().len(), 50);
        assert_eq!(optimizer.term2_trace().len(), 50);
        // Both terms are ratios in [0, 1].
        assert!(optimizer
            .term2_trace()
            .iter()
            .all(|&t| (0.0..=1.0).contains(&t)));
    }
}
