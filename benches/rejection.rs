use abc_rs::{
    AbcController, AbcSampler, AbcSettings, DegradationModel, ErrorMeasure, ForwardModel, LogPrior,
    RejectionAbcSettings, RootMeanSquaredError, SingleOutputProblem, UniformLogPrior,
};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::SeedableRng;

fn make_error_measure(n_times: usize) -> RootMeanSquaredError<DegradationModel> {
    let model = DegradationModel::default();
    let times: Vec<f64> = (0..n_times).map(|i| i as f64 * 10. / n_times as f64).collect();
    let values = model.mean(0.1, &times).unwrap();
    RootMeanSquaredError::new(SingleOutputProblem::new(model, times, values).unwrap())
}

fn run_controller(parallel: usize, iterations: i64) -> usize {
    let log_prior = UniformLogPrior::new([0.0], [0.3]).unwrap();
    let settings = RejectionAbcSettings {
        threshold: 1.5,
        seed: Some(42),
    };
    let mut abc =
        AbcController::with_settings(make_error_measure(100), log_prior, settings).unwrap();
    abc.set_log_to_screen(false);
    abc.set_parallel(parallel);
    abc.set_n_samples(usize::MAX).unwrap();
    abc.set_max_iterations(Some(iterations)).unwrap();
    abc.run().unwrap().len()
}

fn criterion_benchmark(c: &mut Criterion) {
    let model = DegradationModel::default();
    let times: Vec<f64> = (0..100).map(|i| i as f64 * 0.1).collect();
    c.bench_function("simulate degradation 100", |b| {
        b.iter(|| model.simulate(black_box(&[0.1]), black_box(&times)).unwrap())
    });

    let error_measure = make_error_measure(100);
    c.bench_function("rmse degradation 100", |b| {
        b.iter(|| error_measure.evaluate(black_box(&[0.1])).unwrap())
    });

    let log_prior = UniformLogPrior::new(vec![0.; 10], vec![1.; 10]).unwrap();
    c.bench_function("uniform prior sample 10x100", |b| {
        b.iter_batched(
            || rand_chacha::ChaCha8Rng::seed_from_u64(42),
            |mut rng| log_prior.sample(&mut rng, 100),
            BatchSize::SmallInput,
        )
    });

    c.bench_function("rejection ask/tell 100", |b| {
        let mut sampler = RejectionAbcSettings::default()
            .new_sampler(UniformLogPrior::new([0.0], [0.3]).unwrap())
            .unwrap();
        let scores = vec![0.5; 100];
        b.iter(|| {
            sampler.ask(100).unwrap();
            sampler.tell(black_box(&scores)).unwrap()
        })
    });

    c.bench_function("controller sequential 1000", |b| {
        b.iter(|| run_controller(black_box(0), 1000))
    });
    c.bench_function("controller parallel 4x250", |b| {
        b.iter(|| run_controller(black_box(4), 250))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
