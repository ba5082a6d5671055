//! Prior distributions over the parameter space.
//!
//! A prior fixes the dimensionality of the problem and serves as the default
//! proposal mechanism for ABC samplers.

use itertools::izip;
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

use crate::error::{AbcError, Result};

/// A (log) prior over parameter vectors.
///
/// The trait is thread-safe so that samplers owning a prior can be moved
/// across threads together with the controller.
pub trait LogPrior: Send + Sync {
    /// Dimensionality of the parameter space.
    fn n_parameters(&self) -> usize;

    /// Unnormalized log density at `x`, `-inf` outside of the support.
    fn log_density(&self, x: &[f64]) -> f64;

    /// Draw `n` independent parameter vectors.
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Vec<Box<[f64]>>;
}

/// Independent uniform priors on `[lower, upper)` for every parameter.
#[derive(Debug, Clone)]
pub struct UniformLogPrior {
    lower: Box<[f64]>,
    upper: Box<[f64]>,
    dists: Vec<Uniform<f64>>,
    log_density: f64,
}

impl UniformLogPrior {
    pub fn new(lower: impl Into<Vec<f64>>, upper: impl Into<Vec<f64>>) -> Result<Self> {
        let lower = lower.into();
        let upper = upper.into();
        if lower.len() != upper.len() {
            return Err(AbcError::invalid(
                "Lower and upper bounds must have the same length.",
            ));
        }
        if lower.is_empty() {
            return Err(AbcError::invalid("A prior needs at least one parameter."));
        }
        let dists = lower
            .iter()
            .zip(upper.iter())
            .map(|(&lo, &hi)| {
                Uniform::new(lo, hi).map_err(|_| {
                    AbcError::invalid(format!(
                        "Upper bound ({hi}) must be strictly larger than lower bound ({lo})."
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let log_density = -lower
            .iter()
            .zip(upper.iter())
            .map(|(lo, hi)| (hi - lo).ln())
            .sum::<f64>();
        Ok(Self {
            lower: lower.into(),
            upper: upper.into(),
            dists,
            log_density,
        })
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }
}

impl LogPrior for UniformLogPrior {
    fn n_parameters(&self) -> usize {
        self.lower.len()
    }

    fn log_density(&self, x: &[f64]) -> f64 {
        let inside = izip!(x, self.lower.iter(), self.upper.iter())
            .all(|(x, lo, hi)| lo <= x && x < hi);
        if x.len() == self.n_parameters() && inside {
            self.log_density
        } else {
            f64::NEG_INFINITY
        }
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Vec<Box<[f64]>> {
        (0..n)
            .map(|_| self.dists.iter().map(|dist| dist.sample(rng)).collect())
            .collect()
    }
}

/// Independent normal priors.
#[derive(Debug, Clone)]
pub struct GaussianLogPrior {
    mean: Box<[f64]>,
    sd: Box<[f64]>,
    dists: Vec<Normal<f64>>,
}

impl GaussianLogPrior {
    pub fn new(mean: impl Into<Vec<f64>>, sd: impl Into<Vec<f64>>) -> Result<Self> {
        let mean = mean.into();
        let sd = sd.into();
        if mean.len() != sd.len() {
            return Err(AbcError::invalid(
                "Means and standard deviations must have the same length.",
            ));
        }
        if mean.is_empty() {
            return Err(AbcError::invalid("A prior needs at least one parameter."));
        }
        let dists = mean
            .iter()
            .zip(sd.iter())
            .map(|(&mu, &sigma)| {
                if sigma <= 0. {
                    return Err(AbcError::invalid(format!(
                        "Standard deviation must be positive, got {sigma}."
                    )));
                }
                Normal::new(mu, sigma).map_err(|err| AbcError::invalid(err.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            mean: mean.into(),
            sd: sd.into(),
            dists,
        })
    }
}

impl LogPrior for GaussianLogPrior {
    fn n_parameters(&self) -> usize {
        self.mean.len()
    }

    fn log_density(&self, x: &[f64]) -> f64 {
        if x.len() != self.n_parameters() {
            return f64::NEG_INFINITY;
        }
        izip!(x, self.mean.iter(), self.sd.iter())
            .map(|(x, mu, sd)| {
                let z = (x - mu) / sd;
                -0.5 * z * z - sd.ln() - 0.5 * (2. * std::f64::consts::PI).ln()
            })
            .sum()
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Vec<Box<[f64]>> {
        (0..n)
            .map(|_| self.dists.iter().map(|dist| dist.sample(rng)).collect())
            .collect()
    }
}
