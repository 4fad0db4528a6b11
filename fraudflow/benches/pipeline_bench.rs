//! Benchmarks for the training stages.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fraudflow::model::{roc_auc, FitConfig, HyperParams, LogisticModel, Solver};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn synthetic(rows: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(1);
    let mut x = Vec::with_capacity(rows);
    let mut y = Vec::with_capacity(rows);
    for i in 0..rows {
        let label = f64::from(u8::from(i % 3 == 0));
        x.push(vec![
            rng.gen::<f64>() + 2.0 * label,
            rng.gen::<f64>(),
            rng.gen::<f64>() - label,
        ]);
        y.push(label);
    }
    (x, y)
}

fn model_benchmark(c: &mut Criterion) {
    let (x, y) = synthetic(400);

    c.bench_function("fit_lbfgs", |b| {
        b.iter(|| {
            let hyper = HyperParams {
                c: 1.0,
                solver: Solver::Lbfgs,
            };
            LogisticModel::fit(black_box(&x), black_box(&y), hyper, FitConfig::default()).unwrap()
        })
    });

    c.bench_function("fit_liblinear", |b| {
        b.iter(|| {
            let hyper = HyperParams {
                c: 1.0,
                solver: Solver::Liblinear,
            };
            LogisticModel::fit(black_box(&x), black_box(&y), hyper, FitConfig::default()).unwrap()
        })
    });

    let scores: Vec<f64> = x.iter().map(|row| row[0] / 3.0).collect();
    c.bench_function("roc_auc", |b| {
        b.iter(|| roc_auc(black_box(&y), black_box(&scores)))
    });
}

criterion_group!(benches, model_benchmark);
criterion_main!(benches);
