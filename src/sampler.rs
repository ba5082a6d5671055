use std::fmt::Debug;

use crate::{
    error::{AbcError, Result},
    log_prior::LogPrior,
};

/// The ask/tell interface every ABC acceptance algorithm implements.
///
/// A round consists of exactly one [`AbcSampler::ask`] followed by one
/// [`AbcSampler::tell`] with a score for every proposal of that batch, in the
/// same order. The controller drives rounds like this, but a sampler can also
/// be driven by hand.
pub trait AbcSampler: Send {
    /// Human readable name of the algorithm.
    fn name(&self) -> &'static str;

    /// Dimensionality of the proposed parameter vectors.
    fn n_parameters(&self) -> usize;

    /// Propose a batch of parameter vectors.
    ///
    /// `n` is a request; algorithms may return a different number of
    /// proposals. Calling `ask` again before `tell` replaces the pending batch.
    fn ask(&mut self, n: usize) -> Result<Vec<Box<[f64]>>>;

    /// Report the scores of the last batch and return the proposals of that
    /// batch that were accepted. Earlier rounds are never repeated.
    fn tell(&mut self, scores: &[f64]) -> Result<Vec<Box<[f64]>>>;

    fn threshold(&self) -> f64;

    /// Change the acceptance threshold. Takes effect at the next `tell`.
    fn set_threshold(&mut self, threshold: f64) -> Result<()>;

    /// Number of accepted samples after which the algorithm considers itself
    /// done, if it has such a notion.
    fn target_samples(&self) -> Option<usize> {
        None
    }

    /// Extra columns for the progress log, as `(header, value)` pairs.
    ///
    /// The set of headers must not change during a run.
    fn diagnostics(&self) -> Vec<(&'static str, f64)> {
        Vec::new()
    }

    fn n_hyper_parameters(&self) -> usize {
        0
    }

    fn set_hyper_parameters(&mut self, x: &[f64]) -> Result<()> {
        if x.len() != self.n_hyper_parameters() {
            return Err(AbcError::invalid(format!(
                "Expected {} hyper-parameters, got {}.",
                self.n_hyper_parameters(),
                x.len()
            )));
        }
        Ok(())
    }
}

impl<S: AbcSampler + ?Sized> AbcSampler for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn n_parameters(&self) -> usize {
        (**self).n_parameters()
    }

    fn ask(&mut self, n: usize) -> Result<Vec<Box<[f64]>>> {
        (**self).ask(n)
    }

    fn tell(&mut self, scores: &[f64]) -> Result<Vec<Box<[f64]>>> {
        (**self).tell(scores)
    }

    fn threshold(&self) -> f64 {
        (**self).threshold()
    }

    fn set_threshold(&mut self, threshold: f64) -> Result<()> {
        (**self).set_threshold(threshold)
    }

    fn target_samples(&self) -> Option<usize> {
        (**self).target_samples()
    }

    fn diagnostics(&self) -> Vec<(&'static str, f64)> {
        (**self).diagnostics()
    }

    fn n_hyper_parameters(&self) -> usize {
        (**self).n_hyper_parameters()
    }

    fn set_hyper_parameters(&mut self, x: &[f64]) -> Result<()> {
        (**self).set_hyper_parameters(x)
    }
}

/// Configuration of an ABC algorithm that knows how to build the sampler.
///
/// Passing settings instead of a ready sampler lets the controller build the
/// sampler from the prior it was given.
pub trait AbcSettings: Clone + Debug + Send + 'static {
    type Sampler<P: LogPrior + 'static>: AbcSampler;

    fn new_sampler<P: LogPrior + 'static>(&self, log_prior: P) -> Result<Self::Sampler<P>>;
}
