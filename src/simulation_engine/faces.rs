use crate::error::AssemblyError;
use crate::simulation_engine::signals::{FaceType, State, TrafficDirection};
use crate::simulation_engine::streams::StreamId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a signal face inside its intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FaceId(pub usize);

impl fmt::Display for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "face#{}", self.0)
    }
}

/// A physical lamp unit. It watches exactly one stream and shows whatever
/// that stream last told it.
#[derive(Debug, Clone)]
pub struct SignalFace {
    id: FaceId,
    /// Corner or side of the junction the face is mounted on.
    location: TrafficDirection,
    /// Direction the lamps point towards.
    facing: TrafficDirection,
    face_type: FaceType,
    state: State,
    /// Set once, when the face subscribes to a stream.
    stream: Option<StreamId>,
    updates: u64,
}

impl SignalFace {
    /// `id` is the face's index in its intersection's face table.
    pub(crate) fn new(
        id: FaceId,
        location: TrafficDirection,
        facing: TrafficDirection,
        face_type: FaceType,
    ) -> Self {
        Self {
            id,
            location,
            facing,
            face_type,
            state: State::default(),
            stream: None,
            updates: 0,
        }
    }

    /// Records the state pushed by the observed stream.
    pub(crate) fn update(&mut self, state: State) {
        self.state = state;
        self.updates += 1;
    }

    /// Attaches the face to `stream` and copies its current state.
    pub(crate) fn bind(&mut self, stream: StreamId, state: State) -> Result<(), AssemblyError> {
        if let Some(bound) = self.stream {
            return Err(AssemblyError::FaceAlreadyBound {
                face: self.id,
                stream: bound,
            });
        }
        self.stream = Some(stream);
        self.state = state;
        Ok(())
    }

    pub fn id(&self) -> FaceId {
        self.id
    }

    pub fn location(&self) -> TrafficDirection {
        self.location
    }

    pub fn facing(&self) -> TrafficDirection {
        self.facing
    }

    pub fn face_type(&self) -> FaceType {
        self.face_type
    }

    pub fn current_state(&self) -> State {
        self.state
    }

    pub fn stream(&self) -> Option<StreamId> {
        self.stream
    }

    /// How many notifications this face has received.
    pub fn update_count(&self) -> u64 {
        self.updates
    }
}
