//! The controller running the ask/tell loop of an ABC sampler.

use std::{
    fmt::Display,
    io::Write,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use tracing::{debug, info};

use crate::{
    error::{AbcError, Result},
    error_measure::ErrorMeasure,
    evaluator::{Evaluator, ParallelEvaluator, Parallelism, SequentialEvaluator},
    log_prior::LogPrior,
    logger::{LogValue, ProgressLogger},
    rejection::{RejectionAbc, RejectionAbcSettings},
    sampler::{AbcSampler, AbcSettings},
};

/// Snapshot of a running controller, handed to the progress callback.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct AbcProgress {
    pub iteration: u64,
    pub evaluations: u64,
    pub accepted: usize,
    pub elapsed: Duration,
}

impl AbcProgress {
    pub fn acceptance_rate(&self) -> f64 {
        if self.evaluations == 0 {
            0.
        } else {
            self.accepted as f64 / self.evaluations as f64
        }
    }
}

pub struct ProgressCallback {
    pub callback: Box<dyn FnMut(&AbcProgress) + Send>,
    pub rate: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerStatus {
    /// Configured and waiting for `run`.
    Ready,
    /// Set for the duration of `run`. Since `run` holds the controller
    /// mutably, this is only visible to code that runs inside the loop.
    Running,
    /// The last run finished after meeting a stopping criterion.
    Completed,
    /// The last run was aborted by an error.
    Failed,
}

#[derive(Debug, Clone, Copy)]
enum Halt {
    MaxIterations(u64),
    TargetSamples(usize),
}

impl Display for Halt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Halt::MaxIterations(n) => {
                write!(f, "Halting: Maximum number of iterations ({}) reached.", n)
            }
            Halt::TargetSamples(n) => {
                write!(f, "Halting: target number of samples ({}) reached.", n)
            }
        }
    }
}

const DEFAULT_N_SAMPLES: usize = 500;
const DEFAULT_MAX_ITERATIONS: u64 = 10_000;
const DEFAULT_LOG_INTERVAL: u64 = 20;

/// Drives an [`AbcSampler`] until enough samples are accepted or the
/// iteration limit is reached.
///
/// Every iteration asks the sampler for one proposal per worker, scores the
/// batch with the error measure (on a worker pool if parallel evaluation is
/// enabled) and tells the sampler the scores. Accepted proposals are
/// collected and returned by [`AbcController::run`].
pub struct AbcController<E, S> {
    error_measure: E,
    sampler: S,
    n_samples: usize,
    max_iterations: Option<u64>,
    parallel: Parallelism,
    log_to_screen: bool,
    log_filename: Option<PathBuf>,
    log_csv: bool,
    log_interval: u64,
    log_stream: Box<dyn Write + Send>,
    progress_callback: Option<ProgressCallback>,
    status: ControllerStatus,
}

impl<E: ErrorMeasure, P: LogPrior + 'static> AbcController<E, RejectionAbc<P>> {
    /// Create a controller using rejection ABC with default settings.
    pub fn new(error_measure: E, log_prior: P) -> Result<Self> {
        Self::with_settings(error_measure, log_prior, RejectionAbcSettings::default())
    }
}

impl<E: ErrorMeasure, S: AbcSampler> AbcController<E, S> {
    /// Create a controller whose sampler is built from `settings` and the prior.
    pub fn with_settings<P, T>(error_measure: E, log_prior: P, settings: T) -> Result<Self>
    where
        P: LogPrior + 'static,
        T: AbcSettings<Sampler<P> = S>,
    {
        if log_prior.n_parameters() != error_measure.n_parameters() {
            return Err(AbcError::DimensionMismatch {
                prior: log_prior.n_parameters(),
                error_measure: error_measure.n_parameters(),
            });
        }
        let sampler = settings.new_sampler(log_prior)?;
        Self::with_sampler(error_measure, sampler)
    }

    /// Create a controller around an already constructed sampler.
    pub fn with_sampler(error_measure: E, sampler: S) -> Result<Self> {
        if sampler.n_parameters() != error_measure.n_parameters() {
            return Err(AbcError::SamplerDimension {
                expected: error_measure.n_parameters(),
                got: sampler.n_parameters(),
            });
        }
        Ok(Self {
            error_measure,
            sampler,
            n_samples: DEFAULT_N_SAMPLES,
            max_iterations: Some(DEFAULT_MAX_ITERATIONS),
            parallel: Parallelism::Off,
            log_to_screen: true,
            log_filename: None,
            log_csv: false,
            log_interval: DEFAULT_LOG_INTERVAL,
            log_stream: Box::new(std::io::stdout()),
            progress_callback: None,
            status: ControllerStatus::Ready,
        })
    }

    pub fn error_measure(&self) -> &E {
        &self.error_measure
    }

    pub fn sampler(&self) -> &S {
        &self.sampler
    }

    /// Mutable access to the sampler, to tune it or drive it by hand.
    pub fn sampler_mut(&mut self) -> &mut S {
        &mut self.sampler
    }

    pub fn status(&self) -> ControllerStatus {
        self.status
    }

    /// Number of accepted samples after which `run` stops.
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn set_n_samples(&mut self, n_samples: usize) -> Result<()> {
        if n_samples == 0 {
            return Err(AbcError::invalid("Number of samples must be at least 1."));
        }
        self.n_samples = n_samples;
        Ok(())
    }

    pub fn max_iterations(&self) -> Option<u64> {
        self.max_iterations
    }

    /// Limit the number of iterations. `None` removes the limit.
    pub fn set_max_iterations(&mut self, iterations: Option<i64>) -> Result<()> {
        self.max_iterations = match iterations {
            Some(n) if n < 0 => {
                return Err(AbcError::invalid(
                    "Maximum number of iterations cannot be negative.",
                ))
            }
            Some(n) => Some(n as u64),
            None => None,
        };
        Ok(())
    }

    /// Number of worker threads used for evaluation, 0 if evaluation is sequential.
    pub fn parallel(&self) -> usize {
        self.parallel.n_workers()
    }

    /// Enable or disable parallel evaluation.
    ///
    /// Accepts `true` (one worker per cpu), `false` or `0` (sequential), a
    /// worker count, or a [`Parallelism`]. Applies from the next `run`.
    pub fn set_parallel(&mut self, parallel: impl Into<Parallelism>) {
        self.parallel = parallel.into();
    }

    pub fn log_to_screen(&self) -> bool {
        self.log_to_screen
    }

    pub fn set_log_to_screen(&mut self, enabled: bool) {
        self.log_to_screen = enabled;
    }

    pub fn log_filename(&self) -> Option<&Path> {
        self.log_filename.as_deref()
    }

    pub fn log_csv(&self) -> bool {
        self.log_csv
    }

    /// Write progress rows to `filename`, or stop logging to file with `None`.
    ///
    /// With `csv` the file gets comma-separated values instead of the screen layout.
    pub fn set_log_to_file(&mut self, filename: Option<PathBuf>, csv: bool) {
        self.log_filename = filename;
        self.log_csv = csv;
    }

    pub fn log_interval(&self) -> u64 {
        self.log_interval
    }

    /// Log a progress row every `interval` iterations.
    pub fn set_log_interval(&mut self, interval: i64) -> Result<()> {
        if interval <= 0 {
            return Err(AbcError::invalid(
                "Logging interval must be greater than zero.",
            ));
        }
        self.log_interval = interval as u64;
        Ok(())
    }

    /// Replace the screen sink (standard output by default).
    pub fn set_log_stream(&mut self, stream: impl Write + Send + 'static) {
        self.log_stream = Box::new(stream);
    }

    pub fn set_progress_callback(&mut self, callback: Option<ProgressCallback>) {
        self.progress_callback = callback;
    }

    /// Run the sampler and return the accepted parameter vectors in the order
    /// they were accepted.
    ///
    /// Fails without evaluating anything if no stopping criterion is set. An
    /// error while evaluating or telling aborts the run; samples accepted
    /// before the error are discarded.
    pub fn run(&mut self) -> Result<Vec<Box<[f64]>>> {
        let has_stopping_criterion =
            self.max_iterations.is_some() || self.sampler.target_samples().is_some();
        if !has_stopping_criterion {
            return Err(AbcError::NoStoppingCriterion);
        }

        self.status = ControllerStatus::Running;
        let result = self.run_loop();
        self.status = match &result {
            Ok(_) => ControllerStatus::Completed,
            Err(err) => {
                debug!(error = %err, "ABC run failed");
                ControllerStatus::Failed
            }
        };
        result
    }

    fn run_loop(&mut self) -> Result<Vec<Box<[f64]>>> {
        let Self {
            error_measure,
            sampler,
            n_samples,
            max_iterations,
            parallel,
            log_to_screen,
            log_filename,
            log_csv,
            log_interval,
            log_stream,
            progress_callback,
            ..
        } = self;
        let (n_samples, max_iterations, log_interval) =
            (*n_samples, *max_iterations, *log_interval);

        // Dropping the evaluator at the end of this function joins the workers,
        // whether the run finished or failed.
        let n_workers = NonZeroUsize::new(parallel.n_workers());
        let evaluator: Box<dyn Evaluator + '_> = match n_workers {
            Some(n_workers) => Box::new(ParallelEvaluator::new(&*error_measure, n_workers)?),
            None => Box::new(SequentialEvaluator::new(&*error_measure)),
        };
        let batch_size = evaluator.n_workers();

        let screen: Option<&mut (dyn Write + Send)> = if *log_to_screen {
            Some(&mut **log_stream)
        } else {
            None
        };
        let mut logger = ProgressLogger::new(screen, log_filename.as_deref(), *log_csv)?;

        let max_iterations_guess = max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS);
        logger.add_counter("Iter.", max_iterations_guess);
        logger.add_counter("Eval.", max_iterations_guess.saturating_mul(batch_size as u64));
        logger.add_float("Acceptance rate");
        logger.add_counter("Accepted", n_samples as u64);
        let diagnostic_names: Vec<_> = sampler
            .diagnostics()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        for name in diagnostic_names.iter() {
            logger.add_float(name);
        }
        logger.add_time("Time m:s");

        logger.message(&format!("Using {}", sampler.name()))?;
        if parallel.is_parallel() {
            logger.message(&format!(
                "Running in parallel with {} worker threads.",
                batch_size
            ))?;
        } else {
            logger.message("Running in sequential mode.")?;
        }
        debug!(
            sampler = sampler.name(),
            n_workers = batch_size,
            n_samples,
            ?max_iterations,
            "starting ABC run"
        );

        let start = Instant::now();
        let mut last_progress = Instant::now();
        let mut progress = AbcProgress {
            iteration: 0,
            evaluations: 0,
            accepted: 0,
            elapsed: Duration::ZERO,
        };
        let mut samples: Vec<Box<[f64]>> = Vec::new();
        let mut last_logged = 0;

        let write_row = |logger: &mut ProgressLogger<'_>, sampler: &S, progress: &AbcProgress| {
            let mut row = vec![
                LogValue::Count(progress.iteration),
                LogValue::Count(progress.evaluations),
                LogValue::Float(progress.acceptance_rate()),
                LogValue::Count(progress.accepted as u64),
            ];
            let diagnostics = sampler.diagnostics();
            debug_assert_eq!(diagnostics.len(), diagnostic_names.len());
            row.extend(diagnostics.into_iter().map(|(_, value)| LogValue::Float(value)));
            row.push(LogValue::Time(progress.elapsed));
            logger.log(&row)
        };

        let halt = loop {
            if let Some(max) = max_iterations {
                if progress.iteration >= max {
                    break Halt::MaxIterations(max);
                }
            }
            if samples.len() >= n_samples {
                break Halt::TargetSamples(n_samples);
            }
            if let Some(target) = sampler.target_samples() {
                if samples.len() >= target {
                    break Halt::TargetSamples(target);
                }
            }

            let batch = sampler.ask(batch_size)?;
            let scores = evaluator.evaluate(&batch)?;
            let accepted = sampler.tell(&scores)?;

            samples.extend(accepted);
            progress.iteration += 1;
            progress.evaluations += batch.len() as u64;
            progress.accepted = samples.len();
            progress.elapsed = start.elapsed();

            if progress.iteration == 1 || progress.iteration % log_interval == 0 {
                write_row(&mut logger, sampler, &progress)?;
                last_logged = progress.iteration;
            }

            if let Some(ProgressCallback { callback, rate }) = progress_callback.as_mut() {
                if last_progress.elapsed() >= *rate {
                    callback(&progress);
                    last_progress = Instant::now();
                }
            }
        };

        if last_logged != progress.iteration {
            write_row(&mut logger, sampler, &progress)?;
        }
        logger.message(&halt.to_string())?;
        logger.flush()?;

        if let Some(ProgressCallback { callback, .. }) = progress_callback.as_mut() {
            callback(&progress);
        }
        info!(
            iterations = progress.iteration,
            evaluations = progress.evaluations,
            accepted = samples.len(),
            "{}",
            halt
        );

        Ok(samples)
    }
}
