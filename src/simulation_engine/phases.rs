use crate::error::{AssemblyError, EngineError};
use crate::simulation_engine::detectors::DetectorHandle;
use crate::simulation_engine::signals::State;
use crate::simulation_engine::streams::StreamId;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// What a phase shows on one stream, plus the detector (if any) that may
/// extend the phase on that stream's behalf.
#[derive(Clone)]
pub struct Assignment {
    pub state: State,
    pub detector: Option<DetectorHandle>,
}

/// A named interval during which every stream shows a fixed state.
#[derive(Clone)]
pub struct Phase {
    name: String,
    description: String,
    assignments: BTreeMap<StreamId, Assignment>,
    min_green: Duration,
    min_green_set: bool,
}

impl Phase {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            assignments: BTreeMap::new(),
            min_green: Duration::ZERO,
            min_green_set: false,
        }
    }

    /// Assigns `state` to `stream` for this phase. Adding the same stream
    /// again replaces the earlier assignment.
    pub fn add_stream(&mut self, stream: StreamId, state: State) -> &mut Self {
        self.assignments.insert(
            stream,
            Assignment {
                state,
                detector: None,
            },
        );
        self
    }

    /// Like [`Phase::add_stream`], also binding the detector an actuated plan
    /// consults while this stream is green.
    pub fn add_stream_with_detector(
        &mut self,
        stream: StreamId,
        state: State,
        detector: DetectorHandle,
    ) -> &mut Self {
        self.assignments.insert(
            stream,
            Assignment {
                state,
                detector: Some(detector),
            },
        );
        self
    }

    /// Sets the minimum time the phase runs before it may end. Can only be
    /// set once; negative and non-finite values are rejected.
    pub fn set_min_green_interval(&mut self, seconds: f64) -> Result<(), AssemblyError> {
        if self.min_green_set {
            return Err(AssemblyError::MinGreenAlreadySet(self.name.clone()));
        }
        let interval =
            Duration::try_from_secs_f64(seconds).map_err(|_| AssemblyError::InvalidMinGreen {
                phase: self.name.clone(),
                seconds,
            })?;
        self.min_green = interval;
        self.min_green_set = true;
        Ok(())
    }

    pub fn min_green_interval(&self) -> Duration {
        self.min_green
    }

    pub fn state_for(&self, stream: StreamId) -> Result<State, EngineError> {
        self.assignments
            .get(&stream)
            .map(|a| a.state)
            .ok_or_else(|| EngineError::UnassignedStream {
                phase: self.name.clone(),
                stream,
            })
    }

    pub fn detector_for(&self, stream: StreamId) -> Option<&DetectorHandle> {
        self.assignments
            .get(&stream)
            .and_then(|a| a.detector.as_ref())
    }

    /// Streams this phase assigns a state to, in id order.
    pub fn streams(&self) -> impl Iterator<Item = StreamId> + '_ {
        self.assignments.keys().copied()
    }

    /// Detectors bound to the streams this phase shows GREEN. A detector
    /// shared by several green streams appears once.
    pub fn green_detectors(&self) -> Vec<&DetectorHandle> {
        let mut detectors: Vec<&DetectorHandle> = Vec::new();
        for detector in self
            .assignments
            .values()
            .filter(|a| a.state == State::Green)
            .filter_map(|a| a.detector.as_ref())
        {
            if !detectors.iter().any(|d| Arc::ptr_eq(d, detector)) {
                detectors.push(detector);
            }
        }
        detectors
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Debug for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let states: Vec<(StreamId, State)> = self
            .assignments
            .iter()
            .map(|(id, a)| (*id, a.state))
            .collect();
        f.debug_struct("Phase")
            .field("name", &self.name)
            .field("states", &states)
            .field("min_green", &self.min_green)
            .finish()
    }
}
