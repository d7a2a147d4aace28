use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use searchlab::config::TrainingSettings;
use searchlab::dataset::{DatasetStore, Example, Label};
use searchlab::features::FeatureEncoder;
use searchlab::ml::{Algorithm, ClassifierManager};

const EXAMPLE_COUNT: usize = 400;

fn setup() -> (DatasetStore, FeatureEncoder) {
    let mut encoder = FeatureEncoder::default();
    encoder.register_words("official~home~login~review~recipe~news~wiki~store");
    let mut store = DatasetStore::new();
    for i in 0..EXAMPLE_COUNT {
        let relevant = i % 3 == 0;
        let title = if relevant {
            format!("Company {i} official home")
        } else {
            format!("Review {i} news about company")
        };
        let example = Example::new(
            format!("https://site{i}.example"),
            title,
            "description text with a few words",
            format!("company {i}"),
            i % 10,
        )
        .with_label(if relevant {
            Label::Relevant
        } else {
            Label::Irrelevant
        });
        store.upsert(example);
    }
    (store, encoder)
}

fn bench_retrain(c: &mut Criterion) {
    let (store, encoder) = setup();
    for algorithm in Algorithm::ALL {
        c.bench_with_input(
            BenchmarkId::new("retrain", algorithm.tag()),
            &algorithm,
            |b, &algorithm| {
                let mut manager = ClassifierManager::new(TrainingSettings::default());
                manager.set_algorithm(algorithm);
                b.iter(|| black_box(manager.retrain(&store, &encoder)));
            },
        );
    }
}

criterion_group!(benches, bench_retrain);
criterion_main!(benches);
