//! Discrepancy measures between simulated and observed data.

use anyhow::{bail, Result};

use crate::problem::{ForwardModel, SingleOutputProblem};

/// Scalar discrepancy of a parameter vector with respect to observed data.
///
/// Error measures are called from the worker threads of the parallel
/// evaluator and therefore need to be `Send + Sync`.
pub trait ErrorMeasure: Send + Sync {
    /// Number of parameters a vector passed to [`ErrorMeasure::evaluate`] must have.
    fn n_parameters(&self) -> usize;

    fn evaluate(&self, parameters: &[f64]) -> Result<f64>;
}

impl<E: ErrorMeasure + ?Sized> ErrorMeasure for &E {
    fn n_parameters(&self) -> usize {
        (**self).n_parameters()
    }

    fn evaluate(&self, parameters: &[f64]) -> Result<f64> {
        (**self).evaluate(parameters)
    }
}

impl<E: ErrorMeasure + ?Sized> ErrorMeasure for Box<E> {
    fn n_parameters(&self) -> usize {
        (**self).n_parameters()
    }

    fn evaluate(&self, parameters: &[f64]) -> Result<f64> {
        (**self).evaluate(parameters)
    }
}

fn squared_residuals<M: ForwardModel>(
    problem: &SingleOutputProblem<M>,
    parameters: &[f64],
) -> Result<f64> {
    let simulated = problem.evaluate(parameters)?;
    let total: f64 = simulated
        .iter()
        .zip(problem.values())
        .map(|(sim, obs)| (sim - obs) * (sim - obs))
        .sum();
    if total.is_nan() {
        bail!("Simulation produced NaN values");
    }
    Ok(total)
}

/// Sum of squared residuals.
#[derive(Debug, Clone)]
pub struct SumOfSquaresError<M> {
    problem: SingleOutputProblem<M>,
}

impl<M: ForwardModel> SumOfSquaresError<M> {
    pub fn new(problem: SingleOutputProblem<M>) -> Self {
        Self { problem }
    }
}

impl<M: ForwardModel> ErrorMeasure for SumOfSquaresError<M> {
    fn n_parameters(&self) -> usize {
        self.problem.n_parameters()
    }

    fn evaluate(&self, parameters: &[f64]) -> Result<f64> {
        squared_residuals(&self.problem, parameters)
    }
}

/// Mean of the squared residuals.
#[derive(Debug, Clone)]
pub struct MeanSquaredError<M> {
    problem: SingleOutputProblem<M>,
}

impl<M: ForwardModel> MeanSquaredError<M> {
    pub fn new(problem: SingleOutputProblem<M>) -> Self {
        Self { problem }
    }
}

impl<M: ForwardModel> ErrorMeasure for MeanSquaredError<M> {
    fn n_parameters(&self) -> usize {
        self.problem.n_parameters()
    }

    fn evaluate(&self, parameters: &[f64]) -> Result<f64> {
        let n = self.problem.n_times().max(1) as f64;
        Ok(squared_residuals(&self.problem, parameters)? / n)
    }
}

/// Square root of the mean squared residual.
#[derive(Debug, Clone)]
pub struct RootMeanSquaredError<M> {
    problem: SingleOutputProblem<M>,
}

impl<M: ForwardModel> RootMeanSquaredError<M> {
    pub fn new(problem: SingleOutputProblem<M>) -> Self {
        Self { problem }
    }

    pub fn problem(&self) -> &SingleOutputProblem<M> {
        &self.problem
    }
}

impl<M: ForwardModel> ErrorMeasure for RootMeanSquaredError<M> {
    fn n_parameters(&self) -> usize {
        self.problem.n_parameters()
    }

    fn evaluate(&self, parameters: &[f64]) -> Result<f64> {
        let n = self.problem.n_times().max(1) as f64;
        Ok((squared_residuals(&self.problem, parameters)? / n).sqrt())
    }
}
