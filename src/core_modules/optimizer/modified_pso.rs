// THEORY:
// `ModifiedPso` is the workhorse variant and the one the FCM topology runs in
// production. It keeps the particle bookkeeping of a PSO (personal bests and
// one global best) but replaces velocity arithmetic with discrete operators
// that suit binary genes:
// 1.  **Scheduled Mutation**: with a rate that decays linearly from `wmax` to
//     `wmin`, flip exactly one mutable gene. Early generations explore, late
//     generations settle.
// 2.  **Splice Crossover**: build an offspring from a random prefix of the
//     current particle and the matching suffix of a donor, where the donor is
//     the personal best early in the run and increasingly the global best
//     toward the end.
// 3.  **Diversity Gate**: the offspring only replaces the particle when it
//     differs from the incumbent global best in more than half of its genes.
//     Offspring nearly identical to the best are discarded so the population
//     cannot collapse onto one point too early.
// 4.  **Elitism**: after every perturbation the particle is re-evaluated and
//     folded back into the personal/global best records.

use crate::core_modules::optimizer::{Candidate, SearchState, SleepOptimizer};
use crate::error::CoverageError;
use rand::Rng;

pub struct ModifiedPso<'a> {
    state: SearchState<'a>,
}

impl<'a> ModifiedPso<'a> {
    pub(crate) fn new(state: SearchState<'a>) -> Self {
        Self { state }
    }
}

impl SleepOptimizer for ModifiedPso<'_> {
    fn run(&mut self, energies: &[f64]) -> Result<Candidate, CoverageError> {
        let state = &mut self.state;
        state.begin_session(energies)?;

        let generations = state.config.max_generations;
        for generation in 0..generations {
            let mutation_rate = state.mutation_rate(generation);
            // Late generations are pulled harder toward the global best.
            let global_pull = generation as f64 / generations as f64;

            for idx in 0..state.population.len() {
                let draw: f64 = state.rng.gen_range(0.0..1.0);
                if draw < mutation_rate {
                    state.flip_random_gene(idx);
                }

                let donor = if state.rng.gen_range(0.0..1.0) < global_pull {
                    state.best_global.clone()
                } else {
                    state.best_locals[idx].clone()
                };
                let cut = state.rng.gen_range(0..=state.nb_nodes);
                let mut offspring = state.population[idx].clone();
                offspring[cut..].copy_from_slice(&donor[cut..]);

                // Diversity gate against the incumbent best.
                let differing = offspring
                    .iter()
                    .zip(&state.best_global)
                    .filter(|(a, b)| a != b)
                    .count();
                if differing * 2 > state.nb_nodes {
                    state.population[idx] = offspring;
                }

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
