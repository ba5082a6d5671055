//! Approximate Bayesian computation.
//!
//! An [`AbcController`] repeatedly asks an [`AbcSampler`] for proposals,
//! scores them with an [`ErrorMeasure`] (optionally on a pool of worker
//! threads) and tells the sampler the scores, collecting every accepted
//! parameter vector until a stopping criterion is met.
//!
//! ```no_run
//! use abc_rs::{
//!     AbcController, AbcSampler, DegradationModel, RootMeanSquaredError,
//!     SingleOutputProblem, UniformLogPrior,
//! };
//!
//! # fn main() -> anyhow::Result<()> {
//! let model = DegradationModel::default();
//! let times: Vec<f64> = (0..10).map(|t| t as f64).collect();
//! let values = model.mean(0.1, &times)?;
//! let problem = SingleOutputProblem::new(model, times, values)?;
//!
//! let prior = UniformLogPrior::new([0.0], [0.3])?;
//! let mut abc = AbcController::new(RootMeanSquaredError::new(problem), prior)?;
//! abc.sampler_mut().set_threshold(1.5)?;
//! abc.set_n_samples(100)?;
//! abc.set_parallel(true);
//! let samples = abc.run()?;
//! println!("accepted {} samples", samples.len());
//! # Ok(())
//! # }
//! ```

pub(crate) mod controller;
pub(crate) mod error;
pub(crate) mod error_measure;
pub(crate) mod evaluator;
pub(crate) mod log_prior;
pub(crate) mod logger;
pub(crate) mod problem;
pub(crate) mod rejection;
pub(crate) mod sampler;
pub(crate) mod toy;

pub use controller::{AbcController, AbcProgress, ControllerStatus, ProgressCallback};
pub use error::{AbcError, Result};
pub use error_measure::{ErrorMeasure, MeanSquaredError, RootMeanSquaredError, SumOfSquaresError};
pub use evaluator::{cpu_count, Evaluator, ParallelEvaluator, Parallelism, SequentialEvaluator};
pub use log_prior::{GaussianLogPrior, LogPrior, UniformLogPrior};
pub use problem::{ForwardModel, SingleOutputProblem};
pub use rejection::{RejectionAbc, RejectionAbcSettings};
pub use sampler::{AbcSampler, AbcSettings};
pub use toy::DegradationModel;
