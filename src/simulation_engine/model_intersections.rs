use crate::error::AssemblyError;
use crate::global_variables::DEFAULT_DETECTOR_PROBABILITY;
use crate::simulation_engine::detectors::{DetectorHandle, RandomDetector};
use crate::simulation_engine::intersections::Intersection;
use crate::simulation_engine::phase_plans::PlanPolicy;
use crate::simulation_engine::phases::Phase;
use crate::simulation_engine::signals::{FaceType, State, TrafficDirection};
use crate::simulation_engine::streams::StreamId;
use std::sync::Arc;

use FaceType::{RightArrow, Standard};
use State::{Green, Off, Red, Yellow};
use TrafficDirection::*;

/// Builds a phase from `(stream, state)` pairs.
fn phase(
    name: &str,
    description: &str,
    states: &[(StreamId, State)],
    min_green: f64,
) -> Result<Phase, AssemblyError> {
    let mut phase = Phase::new(name, description);
    for &(stream, state) in states {
        phase.add_stream(stream, state);
    }
    phase.set_min_green_interval(min_green)?;
    Ok(phase)
}

/// Builds a phase where every stream is bound to its detector.
fn actuated_phase(
    name: &str,
    description: &str,
    states: &[(StreamId, State, &DetectorHandle)],
    min_green: f64,
) -> Result<Phase, AssemblyError> {
    let mut phase = Phase::new(name, description);
    for &(stream, state, detector) in states {
        phase.add_stream_with_detector(stream, state, Arc::clone(detector));
    }
    phase.set_min_green_interval(min_green)?;
    Ok(phase)
}

fn add_faces(
    intersection: &mut Intersection,
    stream: StreamId,
    faces: &[(TrafficDirection, TrafficDirection, FaceType)],
) -> Result<(), AssemblyError> {
    for &(location, facing, face_type) in faces {
        let face = intersection.add_signal_face(location, facing, face_type)?;
        intersection.subscribe(face, stream)?;
    }
    Ok(())
}

/// A cross intersection with a protected right turn, run by a single
/// pretimed plan.
pub fn pretimed_intersection() -> Result<Intersection, AssemblyError> {
    let mut intersection =
        Intersection::new("Yaldhurst - Peer street", "Model of a pre-timed Cross Intersection");

    let n = intersection.add_stream("N->S|E|W", "North inbound, 3 outbound")?;
    let s = intersection.add_stream("S->N|E", "South inbound, N E outbound")?;
    let protected = intersection.add_stream("S->W", "South inbound, protected Left turn West")?;
    let e = intersection.add_stream("E->W|N|S", "East inbound, 3 outbound")?;
    let w = intersection.add_stream("W->E|N|S", "West inbound, 3 outbound")?;

    let mut plan = intersection.new_plan("Pretimed cross", PlanPolicy::Pretimed);
    plan.add(phase(
        "East/West Go",
        "EW streams green, NS streams red/off",
        &[(e, Green), (w, Green), (n, Red), (s, Red), (protected, Off)],
        10.0,
    )?)?;
    plan.add(phase(
        "East/West Warning",
        "EW streams yellow, NS streams red/off",
        &[(e, Yellow), (w, Yellow), (n, Red), (s, Red), (protected, Off)],
        3.0,
    )?)?;
    plan.add(phase(
        "All Stopped",
        "All streams Red/off",
        &[(e, Red), (w, Red), (n, Red), (s, Red), (protected, Off)],
        1.0,
    )?)?;
    plan.add(phase(
        "South Go",
        "S streams green, N|E|W streams red",
        &[(e, Red), (w, Red), (n, Red), (s, Green), (protected, Green)],
        8.0,
    )?)?;
    plan.add(phase(
        "North/South Go",
        "N|S streams green, E|W streams red",
        &[(e, Red), (w, Red), (n, Green), (s, Green), (protected, Off)],
        8.0,
    )?)?;
    plan.add(phase(
        "North/South Warning",
        "NS streams yellow, EW streams red",
        &[(e, Red), (w, Red), (n, Yellow), (s, Yellow), (protected, Off)],
        3.0,
    )?)?;
    plan.add(phase(
        "All Stopped",
        "All streams Red/off",
        &[(e, Red), (w, Red), (n, Red), (s, Red), (protected, Off)],
        1.0,
    )?)?;
    intersection.add_plan(plan)?;

    add_faces(
        &mut intersection,
        e,
        &[(SouthEast, East, Standard), (SouthWest, East, Standard), (NorthWest, East, Standard)],
    )?;
    add_faces(
        &mut intersection,
        w,
        &[(SouthWest, West, Standard), (NorthEast, West, Standard), (SouthEast, West, Standard)],
    )?;
    add_faces(
        &mut intersection,
        n,
        &[(SouthWest, North, Standard), (NorthEast, North, Standard), (SouthEast, North, Standard)],
    )?;
    add_faces(
        &mut intersection,
        s,
        &[(NorthEast, South, Standard), (SouthWest, South, Standard), (NorthWest, South, Standard)],
    )?;
    add_faces(&mut intersection, protected, &[(SouthEast, South, RightArrow)])?;

    Ok(intersection)
}

/// A north/south main road with an eastern side road, run by a fully
/// actuated plan. Each stream gets a random detector.
pub fn fully_actuated_intersection() -> Result<Intersection, AssemblyError> {
    let detectors: [DetectorHandle; 3] = [
        Arc::new(RandomDetector::new(DEFAULT_DETECTOR_PROBABILITY)),
        Arc::new(RandomDetector::new(DEFAULT_DETECTOR_PROBABILITY)),
        Arc::new(RandomDetector::new(DEFAULT_DETECTOR_PROBABILITY)),
    ];
    fully_actuated_intersection_with(detectors)
}

/// Same layout as [`fully_actuated_intersection`] with caller-supplied
/// detectors for the north, south and east streams.
pub fn fully_actuated_intersection_with(
    detectors: [DetectorHandle; 3],
) -> Result<Intersection, AssemblyError> {
    let [north_det, south_det, east_det] = detectors;
    let mut intersection =
        Intersection::new("Fully actuated", "N/S main road with east inbound connecting");

    let n = intersection.add_stream("N->S|E", "North inbound, 2 outbound")?;
    let s = intersection.add_stream("S->N|E", "South inbound, 2 outbound")?;
    let e = intersection.add_stream("E->N|S", "East inbound, 2 outbound")?;
    intersection.add_detector(n, Arc::clone(&north_det))?;
    intersection.add_detector(s, Arc::clone(&south_det))?;
    intersection.add_detector(e, Arc::clone(&east_det))?;

    let mut plan = intersection.new_plan("Actuated T", PlanPolicy::FullyActuated);
    plan.add(actuated_phase(
        "East Go",
        "E streams green, NS streams red",
        &[(e, Green, &east_det), (n, Red, &north_det), (s, Red, &south_det)],
        5.0,
    )?)?;
    plan.add(actuated_phase(
        "East Warning",
        "E streams yellow, NS streams red",
        &[(e, Yellow, &east_det), (n, Red, &north_det), (s, Red, &south_det)],
        3.0,
    )?)?;
    plan.add(actuated_phase(
        "All Stopped",
        "All streams Red",
        &[(e, Red, &east_det), (n, Red, &north_det), (s, Red, &south_det)],
        1.0,
    )?)?;
    plan.add(actuated_phase(
        "North/South Go",
        "NS streams green, E stream red",
        &[(e, Red, &east_det), (n, Green, &north_det), (s, Green, &south_det)],
        10.0,
    )?)?;
    plan.add(actuated_phase(
        "North/South Warning",
        "NS streams yellow, E stream red",
        &[(e, Red, &east_det), (n, Yellow, &north_det), (s, Yellow, &south_det)],
        3.0,
    )?)?;
    // Only the east detector stays bound for the closing all-red.
    let mut closing = phase(
        "All Stopped",
        "All streams Red",
        &[(n, Red), (s, Red)],
        1.0,
    )?;
    closing.add_stream_with_detector(e, Red, Arc::clone(&east_det));
    plan.add(closing)?;
    intersection.add_plan(plan)?;

    add_faces(&mut intersection, e, &[(SouthEast, East, Standard), (NorthEast, East, Standard)])?;
    add_faces(
        &mut intersection,
        n,
        &[(SouthWest, North, Standard), (NorthEast, North, Standard), (SouthEast, North, Standard)],
    )?;
    add_faces(
        &mut intersection,
        s,
        &[(NorthEast, South, Standard), (SouthWest, South, Standard), (NorthWest, South, Standard)],
    )?;

    Ok(intersection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation_engine::detectors::LatchedDetector;
    use crate::simulation_engine::phase_plans::PlanStep;
    use std::time::Duration;

    #[test]
    fn pretimed_demo_is_fully_wired() {
        let intersection = pretimed_intersection().unwrap();
        assert_eq!(intersection.streams().len(), 5);
        assert_eq!(intersection.faces().len(), 13);
        assert_eq!(intersection.plans()[0].len(), 7);
        assert!(intersection.faces().iter().all(|f| f.stream().is_some()));
    }

    #[test]
    fn pretimed_demo_completes_a_cycle_in_34_seconds() {
        let mut intersection = pretimed_intersection().unwrap();
        let mut advances = 0;
        for _ in 0..34 {
            if let PlanStep::Advanced { .. } = intersection.tick(Duration::from_secs(1)).unwrap().step {
                advances += 1;
            }
        }
        assert_eq!(advances, 7);
        assert_eq!(intersection.active_phase().unwrap().name(), "East/West Go");
        let east = intersection.stream_by_name("E->W|N|S").unwrap();
        assert_eq!(east.state(), State::Green);
    }

    #[test]
    fn actuated_demo_extends_east_green_while_occupied() {
        let east = Arc::new(LatchedDetector::new(true));
        let quiet: [DetectorHandle; 3] = [
            Arc::new(LatchedDetector::new(false)),
            Arc::new(LatchedDetector::new(false)),
            east.clone(),
        ];
        let mut intersection = fully_actuated_intersection_with(quiet).unwrap();

        for _ in 0..20 {
            intersection.tick(Duration::from_secs(1)).unwrap();
        }
        assert_eq!(intersection.active_phase().unwrap().name(), "East Go");

        east.set(false);
        intersection.tick(Duration::from_secs(1)).unwrap();
        assert_eq!(intersection.active_phase().unwrap().name(), "East Warning");
    }
}
