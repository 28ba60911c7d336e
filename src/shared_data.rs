// src/shared_data.rs

use crate::simulation_engine::faces::FaceId;
use crate::simulation_engine::phase_plans::PlanPolicy;
use crate::simulation_engine::signals::{FaceType, State, TrafficDirection};
use crate::simulation_engine::streams::StreamId;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// One stream as seen by a display after a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSnapshot {
    pub id: StreamId,
    pub name: String,
    pub description: String,
    pub state: State,
}

/// One signal face as seen by a display after a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceSnapshot {
    pub id: FaceId,
    pub location: TrafficDirection,
    pub facing: TrafficDirection,
    pub face_type: FaceType,
    pub state: State,
    pub stream: Option<StreamId>,
}

/// Immutable copy of everything a monitor reads, taken after a tick has
/// finished its notification cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntersectionSnapshot {
    pub timestamp: u64,
    pub tick: u64,
    pub name: String,
    pub description: String,
    pub active_plan: Option<String>,
    pub policy: Option<PlanPolicy>,
    pub active_phase: Option<String>,
    pub active_phase_description: Option<String>,
    pub elapsed_in_phase_ms: u64,
    pub streams: Vec<StreamSnapshot>,
    pub faces: Vec<FaceSnapshot>,
}

impl IntersectionSnapshot {
    pub fn stream_state(&self, name: &str) -> Option<State> {
        self.streams.iter().find(|s| s.name == name).map(|s| s.state)
    }
}
