// THEORY:
// `BinaryPso` is the textbook binary particle swarm. Every particle keeps a
// real-valued velocity per gene; each generation the velocity is pulled
// toward the particle's personal best and the global best, squashed through a
// sigmoid, and used as the probability that the gene comes out "sleeping".
//
// Unlike the discrete variants, the swarm constants are not scheduled: the
// canonical `φ1 = φ2 = 2` pull and unit inertia are fixed, which is how the
// algorithm is usually quoted. Genes are mapped to the sleeping indicator
// (1 = sleeping) for the velocity arithmetic so the update formulas read like
// the literature; pinned genes are simply never visited.

use crate::core_modules::optimizer::{Candidate, SearchState, SleepOptimizer};
use crate::error::CoverageError;
use rand::Rng;

const INERTIA: f64 = 1.0;
const PHI_GLOBAL: f64 = 2.0;
const PHI_LOCAL: f64 = 2.0;

pub struct BinaryPso<'a> {
    state: SearchState<'a>,
    /// Per-particle, per-gene velocities. Rebuilt at every run.
    velocities: Vec<Vec<f64>>,
}

impl<'a> BinaryPso<'a> {
    pub(crate) fn new(state: SearchState<'a>) -> Self {
        Self {
            state,
            velocities: Vec::new(),
        }
    }

    /// The sleeping indicator used by the velocity arithmetic.
    fn indicator(awake: bool) -> f64 {
        if awake {
            0.0
        } else {
            1.0
        }
    }
}

impl SleepOptimizer for BinaryPso<'_> {
    fn run(&mut self, energies: &[f64]) -> Result<Candidate, CoverageError> {
        let state = &mut self.state;
        state.begin_session(energies)?;

        let nb_individuals = state.population.len();
        self.velocities = (0..nb_individuals)
            .map(|_| {
                (0..state.nb_nodes)
                    .map(|_| state.rng.gen_range(-0.5..0.5))
                    .collect()
            })
            .collect();

        for _generation in 0..state.config.max_generations {
            for idx in 0..nb_individuals {
                for k in 0..state.can_sleep.len() {
                    let gene = state.can_sleep[k];
                    let r1: f64 = state.rng.gen_range(0.0..1.0);
                    let r2: f64 = state.rng.gen_range(0.0..1.0);
                    let r3: f64 = state.rng.gen_range(0.0..1.0);

                    let position = Self::indicator(state.population[idx][gene]);
                    let to_global = Self::indicator(state.best_global[gene]) - position;
                    let to_local = Self::indicator(state.best_locals[idx][gene]) - position;

                    let velocity = INERTIA * self.velocities[idx][gene]
                        + PHI_GLOBAL * r1 * to_global
                        + PHI_LOCAL * r2 * to_local;
                    self.velocities[idx][gene] = velocity;

                    let sleep_probability = 1.0 / (1.0 + (-velocity).exp());
                    state.population[idx][gene] = r3 >= sleep_probability;
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

#[cfg(test)]
mod tests {
    use crate::core_modules::optimizer::tests::{test_oracle, test_setup};
    use crate::core_modules::optimizer::{build_optimizer, OptimizerConfig, SleepOptimizer, Variant};

    #[test]
    fn swarm_improves_and_stays_reproducible() {
        let oracle = test_oracle();
        let (ids, sleep_probs, energies) = test_setup();
        let config = OptimizerConfig {
            variant: Variant::BinaryPso,
            seed: 21,
            ..OptimizerConfig::default()
        };

        let mut first = build_optimizer(&oracle, ids.clone(), sleep_probs.clone(), config.clone())
            .unwrap();
        let best = first.run(&energies).unwrap();
        let trace = first.learning_trace();
        assert_eq!(trace.len(), 50);
        for window in trace.windows(2) {
            assert!(window[1] >= window[0]);
        }

        let mut second = build_optimizer(&oracle, ids, sleep_probs, config).unwrap();
        assert_eq!(best, second.run(&energies).unwrap());
    }
}
