//! End-to-end scenarios: building intersections by hand and from description
//! files, then ticking them.

use signal_controller::error::{AssemblyError, DetectorError, EngineError};
use signal_controller::loader::intersection_loader::IntersectionLoader;
use signal_controller::simulation_engine::detectors::{Detector, DetectorHandle, ScriptedDetector};
use signal_controller::simulation_engine::intersections::Intersection;
use signal_controller::simulation_engine::model_intersections::pretimed_intersection;
use signal_controller::simulation_engine::phase_plans::{PlanPolicy, PlanStep};
use signal_controller::simulation_engine::phases::Phase;
use signal_controller::simulation_engine::signals::{FaceType, State, TrafficDirection};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const ONE_SECOND: Duration = Duration::from_secs(1);

fn demo(file: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(file)
}

/// Steps the intersection `ticks` times and returns the 1-based ticks on
/// which the phase changed.
fn switch_ticks(intersection: &mut Intersection, ticks: u64) -> Vec<u64> {
    (1..=ticks)
        .filter(|_| {
            matches!(
                intersection.tick(ONE_SECOND).unwrap().step,
                PlanStep::Advanced { .. }
            )
        })
        .collect()
}

struct BrokenDetector;

impl Detector for BrokenDetector {
    fn sense(&self) -> Result<bool, DetectorError> {
        Err(DetectorError::Unavailable("loop cut".to_string()))
    }
}

#[test]
fn two_phase_pretimed_scenario() {
    let mut intersection = Intersection::new("scenario", "two phases");
    let x = intersection.add_stream("X", "only stream").unwrap();
    let face = intersection
        .add_signal_face(TrafficDirection::SouthWest, TrafficDirection::North, FaceType::Standard)
        .unwrap();
    intersection.subscribe(face, x).unwrap();

    let mut plan = intersection.new_plan("AB", PlanPolicy::Pretimed);
    let mut a = Phase::new("A", "X green");
    a.add_stream(x, State::Green);
    a.set_min_green_interval(5.0).unwrap();
    let mut b = Phase::new("B", "X red");
    b.add_stream(x, State::Red);
    b.set_min_green_interval(3.0).unwrap();
    plan.add(a).unwrap();
    plan.add(b).unwrap();
    intersection.add_plan(plan).unwrap();

    assert_eq!(switch_ticks(&mut intersection, 4), Vec::<u64>::new());
    assert_eq!(intersection.face(face).unwrap().current_state(), State::Green);
    assert_eq!(switch_ticks(&mut intersection, 1), vec![1]);
    assert_eq!(intersection.active_phase().unwrap().name(), "B");
    assert_eq!(intersection.face(face).unwrap().current_state(), State::Red);
    assert_eq!(switch_ticks(&mut intersection, 3), vec![3]);
    assert_eq!(intersection.active_phase().unwrap().name(), "A");
    assert_eq!(intersection.tick_count(), 8);
}

#[test]
fn single_phase_actuated_scenario() {
    let mut intersection = Intersection::new("scenario", "one actuated phase");
    let x = intersection.add_stream("X", "only stream").unwrap();
    let detector: DetectorHandle = Arc::new(ScriptedDetector::new([true, true, true, false]));
    intersection.add_detector(x, Arc::clone(&detector)).unwrap();

    let mut plan = intersection.new_plan("A", PlanPolicy::FullyActuated);
    let mut a = Phase::new("A", "X green");
    a.add_stream_with_detector(x, State::Green, detector);
    a.set_min_green_interval(2.0).unwrap();
    plan.add(a).unwrap();
    intersection.add_plan(plan).unwrap();

    let steps: Vec<PlanStep> = (0..4)
        .map(|_| intersection.tick(ONE_SECOND).unwrap().step)
        .collect();
    assert_eq!(
        steps,
        vec![
            PlanStep::Hold,
            PlanStep::Hold,
            PlanStep::Hold,
            PlanStep::Advanced { from: 0, to: 0 },
        ]
    );
}

#[test]
fn failing_detector_counts_as_no_demand() {
    let mut intersection = Intersection::new("scenario", "broken loop");
    let x = intersection.add_stream("X", "only stream").unwrap();
    let mut plan = intersection.new_plan("A", PlanPolicy::FullyActuated);
    let mut a = Phase::new("A", "X green");
    a.add_stream_with_detector(x, State::Green, Arc::new(BrokenDetector));
    a.set_min_green_interval(2.0).unwrap();
    let mut b = Phase::new("B", "X red");
    b.add_stream(x, State::Red);
    plan.add(a).unwrap();
    plan.add(b).unwrap();
    intersection.add_plan(plan).unwrap();

    assert_eq!(switch_ticks(&mut intersection, 2), vec![2]);
}

#[test]
fn phase_missing_a_stream_never_reaches_a_plan() {
    let mut intersection = Intersection::new("scenario", "three streams");
    let n = intersection.add_stream("N", "").unwrap();
    let s = intersection.add_stream("S", "").unwrap();
    let e = intersection.add_stream("E", "").unwrap();

    let mut plan = intersection.new_plan("P", PlanPolicy::Pretimed);
    let mut partial = Phase::new("NS", "east forgotten");
    partial.add_stream(n, State::Green).add_stream(s, State::Green);
    assert_eq!(
        plan.add(partial),
        Err(AssemblyError::IncompletePhase {
            phase: "NS".to_string(),
            missing: vec![e],
        })
    );
    assert!(plan.is_empty());
    assert_eq!(
        intersection.add_plan(plan),
        Err(AssemblyError::EmptyPlan("P".to_string()))
    );
    assert_eq!(
        intersection.tick(ONE_SECOND),
        Err(EngineError::NoPlans("scenario".to_string()))
    );
}

#[test]
fn loaded_pretimed_demo_matches_the_built_in_one() {
    let mut loaded = IntersectionLoader::new()
        .load_file(demo("pretimed_cross.txt"))
        .unwrap();
    let mut built = pretimed_intersection().unwrap();

    assert_eq!(loaded.name(), built.name());
    assert_eq!(loaded.faces().len(), built.faces().len());
    for _ in 0..40 {
        loaded.tick(ONE_SECOND).unwrap();
        built.tick(ONE_SECOND).unwrap();
        let (a, b) = (loaded.snapshot(), built.snapshot());
        assert_eq!(a.active_phase, b.active_phase);
        assert_eq!(a.elapsed_in_phase_ms, b.elapsed_in_phase_ms);
        for stream in &b.streams {
            assert_eq!(a.stream_state(&stream.name), Some(stream.state));
        }
    }
}

#[test]
fn loaded_actuated_demo_follows_its_detectors() {
    // East stays busy for its first 7 readings, everything else is quiet.
    let mut loader = IntersectionLoader::with_detector_factory(|name| -> DetectorHandle {
        if name == "E->N|S" {
            Arc::new(ScriptedDetector::new([true; 7]))
        } else {
            Arc::new(ScriptedDetector::new(Vec::<bool>::new()))
        }
    });
    let mut intersection = loader.load_file(demo("actuated_t.txt")).unwrap();
    assert_eq!(intersection.plans()[0].policy(), PlanPolicy::FullyActuated);
    assert!(intersection.streams().iter().all(|s| s.detector_count() == 1));

    // East Go (floor 5) holds through its seventh reading and ends on the eighth.
    assert_eq!(switch_ticks(&mut intersection, 8), vec![8]);
    assert_eq!(intersection.active_phase().unwrap().name(), "East Warning");
    assert_eq!(
        intersection.stream_by_name("E->N|S").unwrap().state(),
        State::Yellow
    );
}

#[test]
fn select_plan_restarts_the_chosen_plan() {
    let mut intersection = Intersection::new("two plans", "");
    let x = intersection.add_stream("X", "").unwrap();
    for (name, state) in [("day", State::Green), ("night", State::Yellow)] {
        let mut plan = intersection.new_plan(name, PlanPolicy::Pretimed);
        let mut first = Phase::new(format!("{} first", name), "");
        first.add_stream(x, state);
        first.set_min_green_interval(4.0).unwrap();
        let mut second = Phase::new(format!("{} second", name), "");
        second.add_stream(x, State::Red);
        second.set_min_green_interval(4.0).unwrap();
        plan.add(first).unwrap();
        plan.add(second).unwrap();
        intersection.add_plan(plan).unwrap();
    }

    assert_eq!(switch_ticks(&mut intersection, 4), vec![4]);
    intersection.select_plan(1).unwrap();

    let snapshot = intersection.snapshot();
    assert_eq!(snapshot.active_plan.as_deref(), Some("night"));
    assert_eq!(snapshot.active_phase.as_deref(), Some("night first"));
    assert_eq!(snapshot.elapsed_in_phase_ms, 0);
    assert_eq!(snapshot.stream_state("X"), Some(State::Yellow));
}
