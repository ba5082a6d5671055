//! Forward models and the observed data they are compared against.

use anyhow::{bail, Result};

use crate::error::AbcError;

/// A (possibly stochastic) simulator producing one value per requested time.
///
/// Simulations may run on several worker threads at once, so implementations
/// must be thread-safe and keep any random state local to a call.
pub trait ForwardModel: Send + Sync {
    fn n_parameters(&self) -> usize;

    fn simulate(&self, parameters: &[f64], times: &[f64]) -> Result<Vec<f64>>;
}

/// A forward model together with a single observed time series.
#[derive(Debug, Clone)]
pub struct SingleOutputProblem<M> {
    model: M,
    times: Box<[f64]>,
    values: Box<[f64]>,
}

impl<M: ForwardModel> SingleOutputProblem<M> {
    pub fn new(
        model: M,
        times: impl Into<Vec<f64>>,
        values: impl Into<Vec<f64>>,
    ) -> Result<Self, AbcError> {
        let times = times.into();
        let values = values.into();
        if times.iter().any(|&t| !(t >= 0.)) {
            return Err(AbcError::invalid("Times cannot be negative."));
        }
        if times.windows(2).any(|w| w[1] < w[0]) {
            return Err(AbcError::invalid("Times must be non-decreasing."));
        }
        if times.len() != values.len() {
            return Err(AbcError::invalid(format!(
                "Values array must have the same length as times ({} != {}).",
                values.len(),
                times.len()
            )));
        }
        Ok(Self {
            model,
            times: times.into(),
            values: values.into(),
        })
    }

    pub fn n_parameters(&self) -> usize {
        self.model.n_parameters()
    }

    pub fn n_times(&self) -> usize {
        self.times.len()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Run the forward model at `parameters` for the problem's times.
    pub fn evaluate(&self, parameters: &[f64]) -> Result<Vec<f64>> {
        if parameters.len() != self.n_parameters() {
            bail!(
                "Expected {} parameters, got {}",
                self.n_parameters(),
                parameters.len()
            );
        }
        let simulated = self.model.simulate(parameters, &self.times)?;
        if simulated.len() != self.times.len() {
            bail!(
                "Forward model returned {} values for {} times",
                simulated.len(),
                self.times.len()
            );
        }
        Ok(simulated)
    }
}
