//! Toy models for testing and demonstrating the samplers.

use anyhow::{anyhow, bail, Result};
use rand::Rng;
use rand_distr::{Distribution, Exp};

use crate::problem::ForwardModel;

/// Stochastic degradation of a single chemical species, `A -> 0` at rate `k`.
///
/// Trajectories are drawn with the Gillespie algorithm, starting from
/// `initial_concentration` molecules, and read off as a step function at the
/// requested times.
#[derive(Debug, Clone, Copy)]
pub struct DegradationModel {
    initial_concentration: u64,
}

impl Default for DegradationModel {
    fn default() -> Self {
        Self {
            initial_concentration: 20,
        }
    }
}

impl DegradationModel {
    pub fn new(initial_concentration: u64) -> Result<Self> {
        if initial_concentration == 0 {
            bail!("Initial concentration must be positive");
        }
        Ok(Self {
            initial_concentration,
        })
    }

    pub fn initial_concentration(&self) -> u64 {
        self.initial_concentration
    }

    /// Expected number of molecules, `a0 * exp(-k t)`.
    pub fn mean(&self, k: f64, times: &[f64]) -> Result<Vec<f64>> {
        if k < 0. {
            bail!("Rate constant must be non-negative, got {k}");
        }
        let a0 = self.initial_concentration as f64;
        Ok(times.iter().map(|t| a0 * (-k * t).exp()).collect())
    }

    /// Event times and molecule counts of one simulated trajectory.
    pub fn simulate_raw<R: Rng + ?Sized>(&self, k: f64, rng: &mut R) -> Result<(Vec<f64>, Vec<u64>)> {
        if k < 0. {
            bail!("Rate constant must be non-negative, got {k}");
        }
        let mut time = 0f64;
        let mut count = self.initial_concentration;
        let mut event_times = vec![time];
        let mut counts = vec![count];
        if k == 0. {
            return Ok((event_times, counts));
        }
        while count > 0 {
            let rate = k * count as f64;
            let exp = Exp::new(rate).map_err(|err| anyhow!("Invalid reaction rate {rate}: {err}"))?;
            time += exp.sample(rng);
            count -= 1;
            event_times.push(time);
            counts.push(count);
        }
        Ok((event_times, counts))
    }
}

/// Value of the step function defined by `(event_times, counts)` at `t`.
fn step_value(event_times: &[f64], counts: &[u64], t: f64) -> f64 {
    let idx = event_times.partition_point(|&e| e <= t).saturating_sub(1);
    counts[idx] as f64
}

impl ForwardModel for DegradationModel {
    fn n_parameters(&self) -> usize {
        1
    }

    fn simulate(&self, parameters: &[f64], times: &[f64]) -> Result<Vec<f64>> {
        let [k] = parameters else {
            bail!("Degradation model takes one parameter, got {}", parameters.len());
        };
        if times.iter().any(|&t| t < 0.) {
            bail!("Negative times are not allowed");
        }
        let mut rng = rand::rng();
        let (event_times, counts) = self.simulate_raw(*k, &mut rng)?;
        Ok(times
            .iter()
            .map(|&t| step_value(&event_times, &counts, t))
            .collect())
    }
}
