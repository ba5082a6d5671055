//! Scoring of proposal batches, on the calling thread or on a worker pool.

use std::{
    any::Any,
    num::NonZeroUsize,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::mpsc::channel,
};

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::{
    error::{AbcError, Result},
    error_measure::ErrorMeasure,
};

/// Number of worker threads used to evaluate the error measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parallelism {
    /// Evaluate on the controlling thread.
    #[default]
    Off,
    /// One worker per available cpu.
    Auto,
    Workers(NonZeroUsize),
}

impl Parallelism {
    /// Worker count this setting resolves to, 0 when parallelism is off.
    pub fn n_workers(&self) -> usize {
        match self {
            Parallelism::Off => 0,
            Parallelism::Auto => cpu_count(),
            Parallelism::Workers(n) => n.get(),
        }
    }

    pub fn is_parallel(&self) -> bool {
        !matches!(self, Parallelism::Off)
    }
}

impl From<bool> for Parallelism {
    fn from(value: bool) -> Self {
        if value {
            Parallelism::Auto
        } else {
            Parallelism::Off
        }
    }
}

impl From<usize> for Parallelism {
    fn from(value: usize) -> Self {
        match NonZeroUsize::new(value) {
            Some(n) => Parallelism::Workers(n),
            None => Parallelism::Off,
        }
    }
}

/// Number of cpus available to this process, at least 1.
pub fn cpu_count() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Maps a batch of parameter vectors to their errors, in batch order.
pub trait Evaluator {
    fn evaluate(&self, batch: &[Box<[f64]>]) -> Result<Vec<f64>>;

    /// Number of workers scoring in parallel, 1 for sequential evaluation.
    fn n_workers(&self) -> usize;
}

/// Evaluates every proposal in order on the calling thread.
///
/// A panicking error measure is reported as [`AbcError::WorkerPanic`], the
/// same as on the worker pool.
pub struct SequentialEvaluator<'a, E: ?Sized> {
    error_measure: &'a E,
}

impl<'a, E: ErrorMeasure + ?Sized> SequentialEvaluator<'a, E> {
    pub fn new(error_measure: &'a E) -> Self {
        Self { error_measure }
    }
}

impl<E: ErrorMeasure + ?Sized> Evaluator for SequentialEvaluator<'_, E> {
    fn evaluate(&self, batch: &[Box<[f64]>]) -> Result<Vec<f64>> {
        batch
            .iter()
            .enumerate()
            .map(|(index, x)| {
                match catch_unwind(AssertUnwindSafe(|| self.error_measure.evaluate(x))) {
                    Ok(result) => result.map_err(|source| AbcError::Evaluation { index, source }),
                    Err(payload) => Err(AbcError::WorkerPanic {
                        index,
                        message: panic_message(payload.as_ref()),
                    }),
                }
            })
            .collect()
    }

    fn n_workers(&self) -> usize {
        1
    }
}

/// Evaluates proposals on a fixed-size thread pool.
///
/// The pool lives as long as the evaluator; dropping the evaluator joins the
/// worker threads.
pub struct ParallelEvaluator<'a, E: ?Sized> {
    error_measure: &'a E,
    pool: ThreadPool,
    n_workers: usize,
}

impl<'a, E: ErrorMeasure + ?Sized> ParallelEvaluator<'a, E> {
    pub fn new(error_measure: &'a E, n_workers: NonZeroUsize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(n_workers.get())
            .thread_name(|i| format!("abc-worker-{}", i))
            .build()
            .map_err(|err| AbcError::Pool(err.into()))?;
        Ok(Self {
            error_measure,
            pool,
            n_workers: n_workers.get(),
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl<E: ErrorMeasure + ?Sized> Evaluator for ParallelEvaluator<'_, E> {
    fn evaluate(&self, batch: &[Box<[f64]>]) -> Result<Vec<f64>> {
        let (results_tx, results_rx) = channel();
        let error_measure = self.error_measure;

        self.pool.scope_fifo(|scope| {
            for (index, x) in batch.iter().enumerate() {
                let results = results_tx.clone();
                scope.spawn_fifo(move |_| {
                    let result = catch_unwind(AssertUnwindSafe(|| error_measure.evaluate(x)));
                    // The receiver lives until all tasks of the scope are done
                    let _ = results.send((index, result));
                });
            }
        });
        drop(results_tx);

        let mut scores = vec![f64::NAN; batch.len()];
        let mut received = vec![false; batch.len()];
        let mut first_error: Option<AbcError> = None;
        for (index, result) in results_rx.iter() {
            let error = match result {
                Ok(Ok(score)) => {
                    scores[index] = score;
                    received[index] = true;
                    continue;
                }
                Ok(Err(source)) => AbcError::Evaluation { index, source },
                Err(payload) => AbcError::WorkerPanic {
                    index,
                    message: panic_message(payload.as_ref()),
                },
            };
            // Report the failure of the earliest proposal so errors are reproducible
            let replace = match &first_error {
                Some(AbcError::Evaluation { index: prev, .. })
                | Some(AbcError::WorkerPanic { index: prev, .. }) => index < *prev,
                _ => true,
            };
            if replace {
                first_error = Some(error);
            }
        }

        if let Some(error) = first_error {
            return Err(error);
        }
        if let Some(index) = received.iter().position(|&done| !done) {
            return Err(AbcError::WorkerPanic {
                index,
                message: "worker did not return a result".to_string(),
            });
        }
        Ok(scores)
    }

    fn n_workers(&self) -> usize {
        self.n_workers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    struct Weighted;

    impl ErrorMeasure for Weighted {
        fn n_parameters(&self) -> usize {
            3
        }

        fn evaluate(&self, x: &[f64]) -> anyhow::Result<f64> {
            Ok(x.iter().enumerate().map(|(i, v)| (i + 1) as f64 * v).sum())
        }
    }

    struct FailAbove(f64);

    impl ErrorMeasure for FailAbove {
        fn n_parameters(&self) -> usize {
            1
        }

        fn evaluate(&self, x: &[f64]) -> anyhow::Result<f64> {
            if x[0] > self.0 {
                bail!("value {} too large", x[0]);
            }
            Ok(x[0])
        }
    }

    struct PanicAbove(f64);

    impl ErrorMeasure for PanicAbove {
        fn n_parameters(&self) -> usize {
            1
        }

        fn evaluate(&self, x: &[f64]) -> anyhow::Result<f64> {
            if x[0] > self.0 {
                panic!("simulator crashed");
            }
            Ok(x[0])
        }
    }

    fn batch(values: &[f64]) -> Vec<Box<[f64]>> {
        values.iter().map(|&v| vec![v].into()).collect()
    }

    proptest! {
        #[test]
        fn evaluators_preserve_order(
            points in prop::collection::vec(prop::collection::vec(-10f64..10f64, 3), 1..40),
            workers in 1usize..6,
        ) {
            let batch: Vec<Box<[f64]>> = points.into_iter().map(|p| p.into()).collect();
            let expected: Vec<f64> = batch.iter().map(|x| Weighted.evaluate(x).unwrap()).collect();

            let sequential = SequentialEvaluator::new(&Weighted);
            prop_assert_eq!(sequential.evaluate(&batch).unwrap(), expected.clone());

            let parallel = ParallelEvaluator::new(&Weighted, NonZeroUsize::new(workers).unwrap()).unwrap();
            prop_assert_eq!(parallel.evaluate(&batch).unwrap(), expected);
        }
    }

    #[test]
    fn parallelism_conversions() {
        assert_eq!(Parallelism::from(false), Parallelism::Off);
        assert_eq!(Parallelism::from(0usize), Parallelism::Off);
        assert_eq!(Parallelism::from(true), Parallelism::Auto);
        assert_eq!(Parallelism::from(3usize).n_workers(), 3);
        assert_eq!(Parallelism::Off.n_workers(), 0);
        assert_eq!(Parallelism::Auto.n_workers(), cpu_count());
        assert!(cpu_count() >= 1);
    }

    #[test]
    fn sequential_error_keeps_index() {
        let evaluator = SequentialEvaluator::new(&FailAbove(1.));
        let err = evaluator.evaluate(&batch(&[0., 0.5, 2., 3.])).unwrap_err();
        assert!(matches!(err, AbcError::Evaluation { index: 2, .. }));
    }

    #[test]
    fn sequential_panic_is_reported() {
        let evaluator = SequentialEvaluator::new(&PanicAbove(1.));
        let err = evaluator.evaluate(&batch(&[0., 0.5, 5.])).unwrap_err();
        assert!(matches!(err, AbcError::WorkerPanic { index: 2, .. }));
        assert_eq!(evaluator.evaluate(&batch(&[0.25])).unwrap(), vec![0.25]);
    }

    #[test]
    fn parallel_error_is_fatal() {
        let measure = FailAbove(1.);
        let evaluator = ParallelEvaluator::new(&measure, NonZeroUsize::new(3).unwrap()).unwrap();
        let err = evaluator
            .evaluate(&batch(&[0., 5., 0.5, 2., 3.]))
            .unwrap_err();
        assert!(matches!(err, AbcError::Evaluation { index: 1, .. }));
    }

    #[test]
    fn parallel_panic_is_reported() {
        let measure = PanicAbove(1.);
        let evaluator = ParallelEvaluator::new(&measure, NonZeroUsize::new(2).unwrap()).unwrap();
        let err = evaluator.evaluate(&batch(&[0., 5.])).unwrap_err();
        match err {
            AbcError::WorkerPanic { index, message } => {
                assert_eq!(index, 1);
                assert_eq!(message, "simulator crashed");
            }
            other => panic!("unexpected error: {other}"),
        }
        // The pool survives a panicking task
        assert_eq!(evaluator.evaluate(&batch(&[0.25])).unwrap(), vec![0.25]);
    }
}
