//! Rejection ABC: propose from the prior, keep what scores below a threshold.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::{
    error::{AbcError, Result},
    log_prior::LogPrior,
    sampler::{AbcSampler, AbcSettings},
};

/// Settings for [`RejectionAbc`]
#[derive(Debug, Clone, Copy)]
pub struct RejectionAbcSettings {
    /// Proposals with an error strictly below this value are accepted.
    pub threshold: f64,
    /// Seed of the proposal rng. Seeded from the thread rng if `None`.
    pub seed: Option<u64>,
}

impl Default for RejectionAbcSettings {
    fn default() -> Self {
        Self {
            threshold: 1.,
            seed: None,
        }
    }
}

impl AbcSettings for RejectionAbcSettings {
    type Sampler<P: LogPrior + 'static> = RejectionAbc<P>;

    fn new_sampler<P: LogPrior + 'static>(&self, log_prior: P) -> Result<RejectionAbc<P>> {
        check_threshold(self.threshold)?;
        let rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };
        Ok(RejectionAbc {
            log_prior,
            threshold: self.threshold,
            rng,
            pending: None,
            n_proposed: 0,
            n_accepted: 0,
        })
    }
}

fn check_threshold(threshold: f64) -> Result<()> {
    if !(threshold > 0.) {
        return Err(AbcError::invalid("Threshold must be greater than zero."));
    }
    Ok(())
}

/// Rejection ABC sampler.
///
/// Every round draws the requested number of proposals from the prior and
/// accepts those whose error is below the threshold.
#[derive(Debug)]
pub struct RejectionAbc<P> {
    log_prior: P,
    threshold: f64,
    rng: ChaCha8Rng,
    pending: Option<Vec<Box<[f64]>>>,
    n_proposed: usize,
    n_accepted: usize,
}

impl<P: LogPrior + 'static> RejectionAbc<P> {
    /// Create a sampler with default settings.
    pub fn new(log_prior: P) -> Result<Self> {
        RejectionAbcSettings::default().new_sampler(log_prior)
    }

    pub fn log_prior(&self) -> &P {
        &self.log_prior
    }

    /// Total number of proposals that were scored.
    pub fn n_proposed(&self) -> usize {
        self.n_proposed
    }

    /// Total number of accepted proposals over all rounds.
    pub fn n_accepted(&self) -> usize {
        self.n_accepted
    }
}

impl<P: LogPrior + 'static> AbcSampler for RejectionAbc<P> {
    fn name(&self) -> &'static str {
        "Rejection ABC"
    }

    fn n_parameters(&self) -> usize {
        self.log_prior.n_parameters()
    }

    fn ask(&mut self, n: usize) -> Result<Vec<Box<[f64]>>> {
        if n == 0 {
            return Err(AbcError::invalid("Number of proposals must be positive."));
        }
        let batch = self.log_prior.sample(&mut self.rng, n);
        self.pending = Some(batch.clone());
        Ok(batch)
    }

    fn tell(&mut self, scores: &[f64]) -> Result<Vec<Box<[f64]>>> {
        let Some(batch) = self.pending.take() else {
            return Err(AbcError::TellBeforeAsk);
        };
        if batch.len() != scores.len() {
            let expected = batch.len();
            // Keep the batch so that a corrected tell can follow.
            self.pending = Some(batch);
            return Err(AbcError::ScoreCount {
                expected,
                got: scores.len(),
            });
        }

        self.n_proposed += batch.len();
        let accepted: Vec<_> = batch
            .into_iter()
            .zip(scores)
            .filter(|(_, &score)| score < self.threshold)
            .map(|(x, _)| x)
            .collect();
        self.n_accepted += accepted.len();
        Ok(accepted)
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn set_threshold(&mut self, threshold: f64) -> Result<()> {
        check_threshold(threshold)?;
        self.threshold = threshold;
        Ok(())
    }

    fn n_hyper_parameters(&self) -> usize {
        1
    }

    fn set_hyper_parameters(&mut self, x: &[f64]) -> Result<()> {
        let [threshold] = x else {
            return Err(AbcError::invalid(format!(
                "Expected 1 hyper-parameter, got {}.",
                x.len()
            )));
        };
        self.set_threshold(*threshold)
    }
}
