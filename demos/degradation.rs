//! Rejection ABC on a stochastic degradation model
//!
//! Simulates one noisy trajectory of `A -> 0` with a known rate, then
//! recovers the rate with rejection ABC under a uniform prior, scoring
//! proposals by the root mean squared error between a fresh simulation and
//! the observed trajectory. Evaluation runs on all available cpus.

use std::time::{Duration, Instant};

use abc_rs::{
    cpu_count, AbcController, AbcProgress, DegradationModel, ForwardModel, ProgressCallback,
    RejectionAbcSettings, RootMeanSquaredError, SingleOutputProblem, UniformLogPrior,
};
use anyhow::Result;

fn main() -> Result<()> {
    let true_rate = 0.1;
    let model = DegradationModel::default();
    let times: Vec<f64> = (0..10).map(|i| i as f64 * 10. / 9.).collect();
    let observed = model.simulate(&[true_rate], &times)?;
    println!("Observed trajectory: {:?}", observed);

    let problem = SingleOutputProblem::new(model, times, observed)?;
    let error_measure = RootMeanSquaredError::new(problem);
    let log_prior = UniformLogPrior::new([0.0], [0.3])?;

    let settings = RejectionAbcSettings {
        threshold: 1.5,
        seed: Some(42),
    };
    let mut abc = AbcController::with_settings(error_measure, log_prior, settings)?;
    abc.set_n_samples(500)?;
    abc.set_max_iterations(Some(200_000))?;
    abc.set_log_interval(500)?;
    abc.set_parallel(true);
    abc.set_progress_callback(Some(ProgressCallback {
        callback: Box::new(|progress: &AbcProgress| {
            println!(
                "  {} accepted after {} evaluations ({:.1}%)",
                progress.accepted,
                progress.evaluations,
                100. * progress.acceptance_rate(),
            );
        }),
        rate: Duration::from_secs(1),
    }));

    println!("Sampling with {} worker threads", cpu_count());
    let start = Instant::now();
    let samples = abc.run()?;
    let elapsed = start.elapsed();

    let rates: Vec<f64> = samples.iter().map(|x| x[0]).collect();
    let n = rates.len() as f64;
    let mean = rates.iter().sum::<f64>() / n;
    let sd = (rates.iter().map(|k| (k - mean).powi(2)).sum::<f64>() / (n - 1.)).sqrt();

    println!("\nAccepted {} samples in {:?}", rates.len(), elapsed);
    println!("True rate:      {:.4}", true_rate);
    println!("Posterior mean: {:.4} (sd {:.4})", mean, sd);

    Ok(())
}
