//! Benchmarks for per-frame recognition cost

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pose_gesture_control::{
    classifier::PrimitiveClassifier,
    config::Config,
    pose_frame::{HandLandmarks, PoseFrame},
    session::GestureSession,
};
use std::time::Duration;

/// Ten seconds of 30 Hz head frames swaying through both tilt directions
fn swaying_head() -> Vec<PoseFrame> {
    (0..300_u32)
        .map(|i| {
            let t = f64::from(i) / 30.0;
            PoseFrame::head(Duration::from_secs_f64(t), 25.0 * (t * 1.3).sin())
        })
        .collect()
}

fn benchmark_classifier(c: &mut Criterion) {
    let mut group = c.benchmark_group("classifier");
    let classifier = PrimitiveClassifier::default();

    let head = PoseFrame::head(Duration::ZERO, 18.0);
    let hand = PoseFrame::hand(
        Duration::ZERO,
        HandLandmarks::new([0.7, 0.5, 0.0], [0.6, 0.5, 0.0], [0.5, 0.51, 0.0]),
    );

    group.bench_function("head", |b| b.iter(|| classifier.classify(black_box(&head))));
    group.bench_function("hand", |b| b.iter(|| classifier.classify(black_box(&hand))));

    group.finish();
}

fn benchmark_session(c: &mut Criterion) {
    let mut group = c.benchmark_group("session");
    let frames = swaying_head();

    for filter in ["none", "moving_average:5", "median:5", "exponential:0.5"] {
        let mut config = Config::default();
        config.classifier.roll_filter = filter.to_string();

        group.bench_with_input(BenchmarkId::new("process_300_frames", filter), &frames, |b, frames| {
            b.iter(|| {
                // A fresh session per iteration keeps cooldowns comparable
                let Ok(mut session) = GestureSession::from_config(&config) else {
                    return 0;
                };
                frames
                    .iter()
                    .filter(|frame| session.process_frame(black_box(frame)).event.is_some())
                    .count()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_classifier, benchmark_session);
criterion_main!(benches);
