// benches/bench_phase_plan_advance.rs
use criterion::{
    black_box, criterion_group, criterion_main, AxisScale, Criterion, PlotConfiguration,
};
use signal_controller::simulation_engine::detectors::{DetectorHandle, LatchedDetector};
use signal_controller::simulation_engine::phase_plans::{PhasePlan, PlanPolicy};
use signal_controller::simulation_engine::phases::Phase;
use signal_controller::simulation_engine::signals::State;
use signal_controller::simulation_engine::streams::StreamId;
use std::sync::Arc;
use std::time::Duration;

// A plan where phase `i` turns stream `i` green and holds every other stream red.
fn create_plan(policy: PlanPolicy, num_streams: usize, demand: bool) -> PhasePlan {
    let streams: Vec<StreamId> = (0..num_streams).map(StreamId).collect();
    let detector: DetectorHandle = Arc::new(LatchedDetector::new(demand));
    let mut plan = PhasePlan::new("bench", policy, streams.iter().copied());
    for &green in &streams {
        let mut phase = Phase::new(format!("{} go", green), "one stream green");
        for &stream in &streams {
            let state = if stream == green { State::Green } else { State::Red };
            phase.add_stream_with_detector(stream, state, Arc::clone(&detector));
        }
        phase
            .set_min_green_interval(2.0)
            .expect("valid minimum green");
        plan.add(phase).expect("complete phase");
    }
    plan
}

fn bench_advance(c: &mut Criterion) {
    let mut group = c.benchmark_group("phase_plan_advance");

    group.sample_size(100);
    group.measurement_time(Duration::from_secs(5));
    group.warm_up_time(Duration::from_secs(2));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Linear));

    for &size in [4, 16, 64].iter() {
        group.bench_function(format!("pretimed_streams_{}", size), |b| {
            let mut plan = create_plan(PlanPolicy::Pretimed, size, false);
            b.iter(|| {
                black_box(plan.advance(Duration::from_secs(1)).expect("non-empty plan"));
            });
        });
        // Continuous demand keeps the first phase green, so every call samples
        // all of its detectors.
        group.bench_function(format!("actuated_extended_streams_{}", size), |b| {
            let mut plan = create_plan(PlanPolicy::FullyActuated, size, true);
            b.iter(|| {
                black_box(plan.advance(Duration::from_secs(1)).expect("non-empty plan"));
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_advance);
criterion_main!(benches);
