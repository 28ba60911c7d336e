use crate::error::{AssemblyError, EngineError};
use crate::shared_data::{current_timestamp, FaceSnapshot, IntersectionSnapshot, StreamSnapshot};
use crate::simulation_engine::detectors::DetectorHandle;
use crate::simulation_engine::faces::{FaceId, SignalFace};
use crate::simulation_engine::phase_plans::{PhasePlan, PlanPolicy, PlanStep};
use crate::simulation_engine::phases::Phase;
use crate::simulation_engine::signals::{FaceType, TrafficDirection};
use crate::simulation_engine::streams::{StreamId, TrafficStream};
use log::{debug, info};
use std::collections::BTreeSet;
use std::time::Duration;

/// What happened during one call to [`Intersection::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    /// 1-based count of completed ticks.
    pub tick: u64,
    pub step: PlanStep,
    /// Signal-face updates pushed during this tick.
    pub notified: usize,
}

/// A junction: its traffic streams, the signal faces watching them and the
/// phase plans that drive them.
///
/// Topology is assembled first (streams, faces, subscriptions, detectors,
/// plans). The first `start` or `tick` closes assembly; from then on only
/// states and plan progress change.
#[derive(Debug)]
pub struct Intersection {
    name: String,
    description: String,
    streams: Vec<TrafficStream>,
    faces: Vec<SignalFace>,
    plans: Vec<PhasePlan>,
    active_plan: usize,
    running: bool,
    ticks: u64,
}

impl Intersection {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            streams: Vec::new(),
            faces: Vec::new(),
            plans: Vec::new(),
            active_plan: 0,
            running: false,
            ticks: 0,
        }
    }

    fn ensure_assembling(&self) -> Result<(), AssemblyError> {
        if self.running {
            return Err(AssemblyError::AssemblyClosed(self.name.clone()));
        }
        Ok(())
    }

    pub fn add_stream(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<StreamId, AssemblyError> {
        self.ensure_assembling()?;
        let name = name.into();
        // Registered plans were checked against the current stream set.
        if !self.plans.is_empty() {
            return Err(AssemblyError::StreamAfterPlans {
                stream: name,
                intersection: self.name.clone(),
            });
        }
        if self.streams.iter().any(|s| s.name() == name) {
            return Err(AssemblyError::DuplicateStream(name));
        }
        let id = StreamId(self.streams.len());
        self.streams.push(TrafficStream::new(id, name, description));
        Ok(id)
    }

    pub fn add_signal_face(
        &mut self,
        location: TrafficDirection,
        facing: TrafficDirection,
        face_type: FaceType,
    ) -> Result<FaceId, AssemblyError> {
        self.ensure_assembling()?;
        let id = FaceId(self.faces.len());
        self.faces
            .push(SignalFace::new(id, location, facing, face_type));
        Ok(id)
    }

    /// Makes `face` mirror `stream`. Each face can be subscribed once.
    pub fn subscribe(&mut self, face: FaceId, stream: StreamId) -> Result<(), AssemblyError> {
        self.ensure_assembling()?;
        let face = self
            .faces
            .get_mut(face.0)
            .ok_or(AssemblyError::UnknownFace(face))?;
        let stream = self
            .streams
            .get_mut(stream.0)
            .ok_or(AssemblyError::UnknownStream(stream))?;
        stream.add_observer(face)
    }

    pub fn add_detector(
        &mut self,
        stream: StreamId,
        detector: DetectorHandle,
    ) -> Result<(), AssemblyError> {
        self.ensure_assembling()?;
        self.streams
            .get_mut(stream.0)
            .ok_or(AssemblyError::UnknownStream(stream))?
            .add_detector(detector);
        Ok(())
    }

    /// An empty plan that knows every stream added so far.
    pub fn new_plan(&self, name: impl Into<String>, policy: PlanPolicy) -> PhasePlan {
        PhasePlan::new(name, policy, self.streams.iter().map(|s| s.id()))
    }

    /// Registers a plan and returns its index. The first plan added is the
    /// active one.
    pub fn add_plan(&mut self, plan: PhasePlan) -> Result<usize, AssemblyError> {
        self.ensure_assembling()?;
        if plan.is_empty() {
            return Err(AssemblyError::EmptyPlan(plan.name().to_string()));
        }
        let ours: BTreeSet<StreamId> = self.streams.iter().map(|s| s.id()).collect();
        if plan.streams() != &ours {
            return Err(AssemblyError::PlanStreamMismatch {
                plan: plan.name().to_string(),
                intersection: self.name.clone(),
            });
        }
        self.plans.push(plan);
        Ok(self.plans.len() - 1)
    }

    /// Applies the active plan's current phase to every stream and closes
    /// assembly. Does nothing if already running.
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.running {
            return Ok(());
        }
        if self.plans.is_empty() {
            return Err(EngineError::NoPlans(self.name.clone()));
        }
        self.apply_active_phase()?;
        self.running = true;
        info!(
            "Intersection '{}' started on plan '{}', phase '{}'",
            self.name,
            self.plans[self.active_plan].name(),
            self.active_phase().map(|p| p.name()).unwrap_or("-")
        );
        Ok(())
    }

    /// Switches to another plan, restarting it from its first phase.
    pub fn select_plan(&mut self, index: usize) -> Result<(), EngineError> {
        if index >= self.plans.len() {
            return Err(EngineError::UnknownPlan(index));
        }
        let previous = (self.active_plan, self.plans[index].cursor());
        self.active_plan = index;
        self.plans[index].reset();
        if self.running {
            if let Err(e) = self.apply_active_phase() {
                self.active_plan = previous.0;
                self.plans[index].restore(previous.1);
                return Err(e);
            }
        }
        info!(
            "Intersection '{}' switched to plan '{}'",
            self.name,
            self.plans[index].name()
        );
        Ok(())
    }

    /// Moves the active plan's clock forward by `dt`. If the plan changes
    /// phase, every stream gets its new state (and notifies its faces) before
    /// this returns. If any state cannot be resolved nothing is applied and
    /// the plan is put back where it was.
    pub fn tick(&mut self, dt: Duration) -> Result<TickOutcome, EngineError> {
        self.start()?;
        let plan = &mut self.plans[self.active_plan];
        let saved = plan.cursor();
        let step = plan.advance(dt)?;

        let notified = match step {
            PlanStep::Hold => 0,
            PlanStep::Advanced { from, to } => match self.apply_active_phase() {
                Ok(notified) => {
                    let plan = &self.plans[self.active_plan];
                    info!(
                        "Intersection '{}' switching phase {} -> {} ('{}' -> '{}')",
                        self.name,
                        from,
                        to,
                        plan.phases()[from].name(),
                        plan.phases()[to].name()
                    );
                    notified
                }
                Err(e) => {
                    self.plans[self.active_plan].restore(saved);
                    return Err(e);
                }
            },
        };

        self.ticks += 1;
        debug!(
            "Intersection '{}' tick {}: {:?}, {} faces updated",
            self.name, self.ticks, step, notified
        );
        Ok(TickOutcome {
            tick: self.ticks,
            step,
            notified,
        })
    }

    /// Resolves every stream's state from the active phase first and only
    /// then applies them, so a phase is never half applied.
    fn apply_active_phase(&mut self) -> Result<usize, EngineError> {
        let plan = &self.plans[self.active_plan];
        let phase = plan
            .active_phase()
            .ok_or_else(|| EngineError::EmptyPlan(plan.name().to_string()))?;
        let states = self
            .streams
            .iter()
            .map(|s| phase.state_for(s.id()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut notified = 0;
        for (stream, state) in self.streams.iter_mut().zip(states) {
            notified += stream.set_state(state, &mut self.faces);
        }
        Ok(notified)
    }

    pub fn snapshot(&self) -> IntersectionSnapshot {
        let plan = self.active_plan();
        let phase = self.active_phase();
        IntersectionSnapshot {
            timestamp: current_timestamp(),
            tick: self.ticks,
            name: self.name.clone(),
            description: self.description.clone(),
            active_plan: plan.map(|p| p.name().to_string()),
            policy: plan.map(|p| p.policy()),
            active_phase: phase.map(|p| p.name().to_string()),
            active_phase_description: phase.map(|p| p.description().to_string()),
            elapsed_in_phase_ms: plan
                .map(|p| p.elapsed_in_phase().as_millis() as u64)
                .unwrap_or(0),
            streams: self
                .streams
                .iter()
                .map(|s| StreamSnapshot {
                    id: s.id(),
                    name: s.name().to_string(),
                    description: s.description().to_string(),
                    state: s.state(),
                })
                .collect(),
            faces: self
                .faces
                .iter()
                .map(|f| FaceSnapshot {
                    id: f.id(),
                    location: f.location(),
                    facing: f.facing(),
                    face_type: f.face_type(),
                    state: f.current_state(),
                    stream: f.stream(),
                })
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn streams(&self) -> &[TrafficStream] {
        &self.streams
    }

    pub fn stream(&self, id: StreamId) -> Option<&TrafficStream> {
        self.streams.get(id.0)
    }

    pub fn stream_by_name(&self, name: &str) -> Option<&TrafficStream> {
        self.streams.iter().find(|s| s.name() == name)
    }

    pub fn faces(&self) -> &[SignalFace] {
        &self.faces
    }

    pub fn face(&self, id: FaceId) -> Option<&SignalFace> {
        self.faces.get(id.0)
    }

    pub fn plans(&self) -> &[PhasePlan] {
        &self.plans
    }

    pub fn active_plan_index(&self) -> usize {
        self.active_plan
    }

    pub fn active_plan(&self) -> Option<&PhasePlan> {
        self.plans.get(self.active_plan)
    }

    pub fn active_phase(&self) -> Option<&Phase> {
        self.active_plan().and_then(|p| p.active_phase())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }
}
