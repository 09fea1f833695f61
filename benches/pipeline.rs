//! Benchmarks for shape validation, inference, and full pipeline runs.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::json;

use comply_reasoner::builder::{self, SystemDescription};
use comply_reasoner::config::ReasonerConfig;
use comply_reasoner::pipeline::Pipeline;

fn healthcare() -> SystemDescription {
    SystemDescription::new()
        .with("hasName", "Healthcare AI")
        .with("hasPurpose", json!(["HealthCare", "CandidateScreening"]))
        .with("hasDeploymentContext", json!(["HighVolumeProcessing", "PublicSpaces"]))
        .with("hasTrainingDataOrigin", json!(["PersonalData", "ScrapedWebData"]))
}

fn bench_pre_validation(c: &mut Criterion) {
    let pipeline = Pipeline::from_config(&ReasonerConfig::default()).unwrap();
    let built = builder::build(&healthcare()).unwrap();

    c.bench_function("pre_validation", |bench| {
        bench.iter(|| black_box(pipeline.validator().validate(&built.graph, pipeline.ontology())))
    });
}

fn bench_inference(c: &mut Criterion) {
    let pipeline = Pipeline::from_config(&ReasonerConfig::default()).unwrap();
    let built = builder::build(&healthcare()).unwrap();

    c.bench_function("inference", |bench| {
        bench.iter(|| black_box(pipeline.engine().infer(pipeline.ontology(), &built.graph).unwrap()))
    });
}

fn bench_full_pipeline(c: &mut Criterion) {
    let pipeline = Pipeline::from_config(&ReasonerConfig::default()).unwrap();
    let description = healthcare();

    c.bench_function("full_pipeline", |bench| {
        bench.iter(|| black_box(pipeline.run(&description).unwrap()))
    });
}

fn bench_batch(c: &mut Criterion) {
    let pipeline = Pipeline::from_config(&ReasonerConfig::default()).unwrap();
    let descriptions: Vec<SystemDescription> = (0..64)
        .map(|i| healthcare().with("hasName", format!("System {i}")))
        .collect();

    c.bench_function("batch_64", |bench| {
        bench.iter(|| black_box(pipeline.run_batch(&descriptions)))
    });
}

criterion_group!(
    benches,
    bench_pre_validation,
    bench_inference,
    bench_full_pipeline,
    bench_batch
);
criterion_main!(benches);
