use crate::error::{AssemblyError, EngineError};
use crate::simulation_engine::detectors::read_presence;
use crate::simulation_engine::phases::Phase;
use crate::simulation_engine::streams::StreamId;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// How a plan decides when the active phase ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanPolicy {
    /// Each phase runs for exactly its minimum green, regardless of demand.
    Pretimed,
    /// Each phase runs for at least its minimum green, then keeps going for
    /// as long as a detector on one of its green streams reports a vehicle.
    FullyActuated,
}

/// Result of one call to [`PhasePlan::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStep {
    Hold,
    Advanced { from: usize, to: usize },
}

/// Position of a plan in its cycle. Saved before a tick so a failed tick can
/// be rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanCursor {
    pub active: usize,
    pub elapsed: Duration,
}

/// An ordered, endlessly repeating sequence of phases.
#[derive(Debug, Clone)]
pub struct PhasePlan {
    name: String,
    policy: PlanPolicy,
    /// Every phase added must assign exactly these streams.
    streams: BTreeSet<StreamId>,
    phases: Vec<Phase>,
    active: usize,
    elapsed: Duration,
}

impl PhasePlan {
    pub fn new(
        name: impl Into<String>,
        policy: PlanPolicy,
        streams: impl IntoIterator<Item = StreamId>,
    ) -> Self {
        Self {
            name: name.into(),
            policy,
            streams: streams.into_iter().collect(),
            phases: Vec::new(),
            active: 0,
            elapsed: Duration::ZERO,
        }
    }

    pub fn pretimed(name: impl Into<String>, streams: impl IntoIterator<Item = StreamId>) -> Self {
        Self::new(name, PlanPolicy::Pretimed, streams)
    }

    pub fn fully_actuated(
        name: impl Into<String>,
        streams: impl IntoIterator<Item = StreamId>,
    ) -> Self {
        Self::new(name, PlanPolicy::FullyActuated, streams)
    }

    /// Appends a phase to the cycle. The phase must assign a state to every
    /// stream the plan knows and to no other stream.
    pub fn add(&mut self, phase: Phase) -> Result<(), AssemblyError> {
        if let Some(stream) = phase.streams().find(|s| !self.streams.contains(s)) {
            return Err(AssemblyError::UnknownPlanStream {
                plan: self.name.clone(),
                phase: phase.name().to_string(),
                stream,
            });
        }
        let assigned: BTreeSet<StreamId> = phase.streams().collect();
        let missing: Vec<StreamId> = self.streams.difference(&assigned).copied().collect();
        if !missing.is_empty() {
            return Err(AssemblyError::IncompletePhase {
                phase: phase.name().to_string(),
                missing,
            });
        }
        self.phases.push(phase);
        Ok(())
    }

    /// Moves the plan's clock forward by `dt` and decides whether the active
    /// phase ends. On `Advanced` the elapsed time restarts from zero.
    ///
    /// A zero-length step changes nothing and samples no detectors.
    pub fn advance(&mut self, dt: Duration) -> Result<PlanStep, EngineError> {
        if self.phases.is_empty() {
            return Err(EngineError::EmptyPlan(self.name.clone()));
        }
        if dt.is_zero() {
            return Ok(PlanStep::Hold);
        }

        self.elapsed = self.elapsed.saturating_add(dt);
        let phase = &self.phases[self.active];
        let floor_met = self.elapsed >= phase.min_green_interval();

        let ends = match self.policy {
            PlanPolicy::Pretimed => floor_met,
            PlanPolicy::FullyActuated => {
                // Every green detector is read once on every tick, floor or not.
                let demand = phase
                    .green_detectors()
                    .into_iter()
                    .filter(|d| read_presence(d.as_ref()))
                    .count()
                    > 0;
                if floor_met && demand {
                    debug!(
                        "Plan '{}' extending phase '{}' at {:?}: vehicles present",
                        self.name,
                        phase.name(),
                        self.elapsed
                    );
                }
                floor_met && !demand
            }
        };

        if !ends {
            return Ok(PlanStep::Hold);
        }
        let from = self.active;
        self.active = (self.active + 1) % self.phases.len();
        self.elapsed = Duration::ZERO;
        Ok(PlanStep::Advanced {
            from,
            to: self.active,
        })
    }

    /// Back to the first phase with a fresh clock.
    pub fn reset(&mut self) {
        self.active = 0;
        self.elapsed = Duration::ZERO;
    }

    pub fn cursor(&self) -> PlanCursor {
        PlanCursor {
            active: self.active,
            elapsed: self.elapsed,
        }
    }

    pub(crate) fn restore(&mut self, cursor: PlanCursor) {
        self.active = cursor.active;
        self.elapsed = cursor.elapsed;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> PlanPolicy {
        self.policy
    }

    pub fn streams(&self) -> &BTreeSet<StreamId> {
        &self.streams
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_phase(&self) -> Option<&Phase> {
        self.phases.get(self.active)
    }

    pub fn elapsed_in_phase(&self) -> Duration {
        self.elapsed
    }
}
