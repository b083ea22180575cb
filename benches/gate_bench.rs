//! Performance benchmarks for trackgate gating and accounting.
//!
//! Run with: cargo bench
//!
//! Benchmarks cover:
//! - Raw gating throughput at various stream lengths
//! - Filtered gating with the Kalman smoother in the loop
//! - Mixed-quality streams exercising the discard paths
//! - Kalman predict/update in isolation
//! - Ledger distance and elapsed totals

use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput,
};

use chrono::{DateTime, Duration, TimeZone, Utc};
use trackgate::{
    DistanceUnit, GateConfig, GeoPoint, KalmanSmoother, LocationSample, PositionEstimator,
    TrackRecorder,
};

const METERS_PER_DEGREE: f64 = 6_371_000.0 * std::f64::consts::PI / 180.0;

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

// =============================================================================
// Test Data Generators
// =============================================================================

/// Generate a steady eastward walk along the equator.
fn generate_walk(count: usize, spacing_m: f64, interval_ms: i64, accuracy: f64) -> Vec<LocationSample> {
    (0..count)
        .map(|i| {
            let point = GeoPoint::new(0.0, i as f64 * spacing_m / METERS_PER_DEGREE);
            let timestamp = epoch() + Duration::milliseconds(i as i64 * interval_ms);
            LocationSample::new(point, timestamp, accuracy)
        })
        .collect()
}

/// Generate a walk whose accuracy wanders between good and unusable.
fn generate_mixed_quality_walk(count: usize) -> Vec<LocationSample> {
    (0..count)
        .map(|i| {
            let point = GeoPoint::new(0.0, i as f64 * 3.0 / METERS_PER_DEGREE);
            let timestamp = epoch() + Duration::milliseconds(i as i64 * 1_000);
            // Deterministic pseudo-random accuracy in [5, 45].
            let accuracy = 5.0 + 40.0 * ((i as f64 * 12345.6789).sin().abs());
            LocationSample::new(point, timestamp, accuracy)
        })
        .collect()
}

fn feed_all(config: GateConfig, samples: &[LocationSample]) -> f64 {
    let mut recorder = TrackRecorder::new(config).unwrap();
    recorder.start_tracking(false, epoch());
    for sample in samples {
        recorder.push_sample(black_box(sample)).unwrap();
    }
    recorder.total_distance(DistanceUnit::Meters)
}

// =============================================================================
// Gate Benchmarks
// =============================================================================

fn bench_raw_gate(c: &mut Criterion) {
    let mut group = c.benchmark_group("raw_gate");

    for count in [100, 1_000, 10_000] {
        let samples = generate_walk(count, 3.0, 1_000, 8.0);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(
            BenchmarkId::new("steady_walk", format!("{}_fixes", count)),
            &samples,
            |b, samples| b.iter(|| feed_all(GateConfig::default(), samples)),
        );
    }

    group.finish();
}

fn bench_filtered_gate(c: &mut Criterion) {
    let mut group = c.benchmark_group("filtered_gate");

    let config = GateConfig {
        use_filter: true,
        ..GateConfig::default()
    };

    // Every fix clears the window and the accuracy bar: the smoother runs
    // on each one.
    for count in [100, 1_000, 10_000] {
        let samples = generate_walk(count, 3.0, 1_000, 8.0);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(
            BenchmarkId::new("all_accepted", format!("{}_fixes", count)),
            &samples,
            |b, samples| b.iter(|| feed_all(config.clone(), samples)),
        );
    }

    // Accuracy wanders, so the stream splits between accepts, rejects, and
    // the occasional staleness warning.
    for count in [1_000, 10_000] {
        let samples = generate_mixed_quality_walk(count);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(
            BenchmarkId::new("mixed_quality", format!("{}_fixes", count)),
            &samples,
            |b, samples| b.iter(|| feed_all(config.clone(), samples)),
        );
    }

    // A 10 Hz burst where almost everything lands inside the minimum window.
    let burst = generate_walk(1_000, 0.3, 100, 8.0);
    group.throughput(Throughput::Elements(1_000));
    group.bench_with_input(
        BenchmarkId::new("high_rate_burst", "1000_fixes"),
        &burst,
        |b, samples| b.iter(|| feed_all(config.clone(), samples)),
    );

    group.finish();
}

// =============================================================================
// Kalman Benchmarks
// =============================================================================

fn bench_kalman_smoother(c: &mut Criterion) {
    let mut group = c.benchmark_group("kalman_smoother");

    for count in [100, 1_000] {
        let samples = generate_walk(count, 3.0, 1_000, 8.0);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(
            BenchmarkId::new("process_stream", format!("{}_fixes", count)),
            &samples,
            |b, samples| {
                b.iter(|| {
                    let mut smoother = KalmanSmoother::default();
                    smoother.reset(&samples[0]);
                    for sample in samples {
                        black_box(smoother.process(black_box(sample)));
                    }
                    smoother
                })
            },
        );
    }

    group.finish();
}

// =============================================================================
// Ledger Benchmarks
// =============================================================================

fn bench_ledger_totals(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger_totals");

    // One long recorded session, read repeatedly.
    let samples = generate_walk(10_000, 3.0, 1_000, 8.0);
    let mut recorder = TrackRecorder::new(GateConfig::default()).unwrap();
    recorder.start_tracking(false, epoch());
    for sample in &samples {
        recorder.push_sample(sample).unwrap();
    }
    recorder.end_tracking(epoch() + Duration::seconds(10_000));

    group.bench_function("total_distance_meters", |b| {
        b.iter(|| recorder.total_distance(black_box(DistanceUnit::Meters)))
    });

    group.bench_function("total_distance_miles", |b| {
        b.iter(|| recorder.total_distance(black_box(DistanceUnit::Miles)))
    });

    let later = epoch() + Duration::seconds(20_000);
    group.bench_function("total_elapsed", |b| {
        b.iter(|| recorder.total_elapsed(black_box(later)))
    });

    group.finish();
}

fn bench_haversine(c: &mut Criterion) {
    let mut group = c.benchmark_group("haversine");

    let a = GeoPoint::new(37.4220, -122.0841);
    let b_pt = GeoPoint::new(37.4275, -122.1697);

    group.bench_function("distance_to", |b| {
        b.iter(|| black_box(&a).distance_to(black_box(&b_pt)))
    });

    group.finish();
}

// =============================================================================
// Criterion Groups and Main
// =============================================================================

criterion_group!(
    name = gate_benches;
    config = Criterion::default()
        .warm_up_time(std::time::Duration::from_millis(500))
        .measurement_time(std::time::Duration::from_secs(2));
    targets =
        bench_raw_gate,
        bench_filtered_gate
);

criterion_group!(
    name = estimator_benches;
    config = Criterion::default()
        .warm_up_time(std::time::Duration::from_millis(500))
        .measurement_time(std::time::Duration::from_secs(2));
    targets = bench_kalman_smoother
);

criterion_group!(
    name = ledger_benches;
    config = Criterion::default()
        .warm_up_time(std::time::Duration::from_millis(300))
        .measurement_time(std::time::Duration::from_secs(1));
    targets =
        bench_ledger_totals,
        bench_haversine
);

criterion_main!(gate_benches, estimator_benches, ledger_benches);
