use crate::error::AssemblyError;
use crate::simulation_engine::detectors::{read_presence, DetectorHandle};
use crate::simulation_engine::faces::{FaceId, SignalFace};
use crate::simulation_engine::signals::State;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a traffic stream inside its intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamId(pub usize);

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "stream#{}", self.0)
    }
}

/// A flow of vehicles through the junction that is given right of way as a
/// unit, e.g. "north inbound, all turns".
pub struct TrafficStream {
    id: StreamId,
    name: String,
    description: String,
    state: State,
    /// Subscription order is notification order.
    observers: Vec<FaceId>,
    detectors: Vec<DetectorHandle>,
}

impl TrafficStream {
    /// Streams start RED until the first phase is applied.
    pub(crate) fn new(id: StreamId, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            state: State::default(),
            observers: Vec::new(),
            detectors: Vec::new(),
        }
    }

    /// Replaces the current state and pushes it to every subscribed face, in
    /// subscription order, before returning. Returns the number of faces
    /// notified.
    ///
    /// `faces` is the intersection's face table, indexed by `FaceId`.
    pub(crate) fn set_state(&mut self, state: State, faces: &mut [SignalFace]) -> usize {
        self.state = state;
        let mut notified = 0;
        for face_id in &self.observers {
            if let Some(face) = faces.get_mut(face_id.0) {
                face.update(state);
                notified += 1;
            }
        }
        notified
    }

    /// Subscribes `face` to this stream. A face can only ever watch one
    /// stream, so a face that is already bound (here or elsewhere) is
    /// rejected.
    pub(crate) fn add_observer(&mut self, face: &mut SignalFace) -> Result<(), AssemblyError> {
        face.bind(self.id, self.state)?;
        self.observers.push(face.id());
        Ok(())
    }

    pub fn add_detector(&mut self, detector: DetectorHandle) {
        self.detectors.push(detector);
    }

    /// True if any attached detector currently reports a vehicle. A stream
    /// without detectors never reports demand.
    pub fn sense_presence(&self) -> bool {
        self.detectors.iter().any(|d| read_presence(d.as_ref()))
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn observers(&self) -> &[FaceId] {
        &self.observers
    }

    pub fn detector_count(&self) -> usize {
        self.detectors.len()
    }
}

impl fmt::Debug for TrafficStream {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TrafficStream")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("observers", &self.observers)
            .field("detectors", &self.detectors.len())
            .finish()
    }
}
