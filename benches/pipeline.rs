use airfuse::imputation::ImputationEngine;
use airfuse::pipeline::{FusionPipeline, PipelineInputs};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use polars::prelude::*;

const PARAMETERS: [&str; 6] = ["pm25", "pm10", "no2", "co", "so2", "o3"];

fn create_inputs(n_locations: usize, n_hours: usize) -> PipelineInputs {
    let mut ids = Vec::new();
    let mut lats = Vec::new();
    let mut lons = Vec::new();
    let mut params = Vec::new();
    let mut values = Vec::new();
    let mut stamps = Vec::new();

    for loc in 0..n_locations {
        for hour in 0..n_hours {
            for (p, param) in PARAMETERS.iter().enumerate() {
                // leave roughly one reading in seven empty
                let seed = loc * 31 + hour * 7 + p;
                ids.push(format!("{}", 1000 + loc));
                lats.push(20.0 + loc as f64 * 0.01);
                lons.push(75.0 + loc as f64 * 0.01);
                params.push(param.to_string());
                values.push((seed % 7 != 0).then(|| (seed % 211) as f64));
                stamps.push(format!("2024-01-{:02}T{:02}:00:00Z", 1 + hour / 24, hour % 24));
            }
        }
    }

    let measurements = df!(
        "location_id" => &ids,
        "latitude" => &lats,
        "longitude" => &lons,
        "parameter" => &params,
        "value" => &values,
        "datetime" => &stamps
    )
    .unwrap();

    let weather_ids: Vec<String> = (0..n_locations).map(|loc| format!("{}", 1000 + loc)).collect();
    let humidity: Vec<f64> = (0..n_locations).map(|loc| 30.0 + (loc % 50) as f64).collect();
    let temperature: Vec<f64> = (0..n_locations).map(|loc| 15.0 + (loc % 20) as f64).collect();
    let weather = df!(
        "location_id" => &weather_ids,
        "temperature" => &temperature,
        "humidity" => &humidity,
        "api_timestamp" => &vec!["2024-01-01T12:00:00Z"; n_locations]
    )
    .unwrap();

    let roads: Vec<f64> = (0..n_locations).map(|loc| (loc % 10) as f64 * 0.2).collect();
    let geography = df!(
        "location_id" => &weather_ids,
        "roads_closest_km" => &roads
    )
    .unwrap();

    PipelineInputs {
        measurements,
        weather,
        geography: Some(geography),
    }
}

fn bench_fusion(c: &mut Criterion) {
    let mut group = c.benchmark_group("fusion");
    group.sample_size(10);

    for n_locations in [10, 50, 200].iter() {
        let inputs = create_inputs(*n_locations, 48);

        group.bench_with_input(BenchmarkId::new("run", n_locations), &inputs, |b, inputs| {
            b.iter(|| FusionPipeline::default().run(black_box(inputs.clone())).unwrap())
        });
    }

    group.finish();
}

fn bench_imputation(c: &mut Criterion) {
    let mut group = c.benchmark_group("imputation");

    let output = FusionPipeline::default().run(create_inputs(100, 48)).unwrap();
    let fused = output.processed;

    group.bench_function("impute", |b| {
        b.iter(|| ImputationEngine::default().impute(black_box(&fused)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_fusion, bench_imputation);
criterion_main!(benches);
