//! Error types for intersection assembly, tick execution and detector reads.

use crate::simulation_engine::faces::FaceId;
use crate::simulation_engine::streams::StreamId;
use thiserror::Error;

/// Structural errors raised while an intersection is being assembled.
///
/// These are build-time defects: once an `Intersection` has been assembled
/// without one of these, ticking it cannot produce them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssemblyError {
    #[error("phase '{phase}' does not assign a state to streams {missing:?}")]
    IncompletePhase { phase: String, missing: Vec<StreamId> },

    #[error("phase '{phase}' assigns stream {stream} which plan '{plan}' does not know")]
    UnknownPlanStream {
        plan: String,
        phase: String,
        stream: StreamId,
    },

    #[error("minimum green for phase '{phase}' must be a non-negative number of seconds, got {seconds}")]
    InvalidMinGreen { phase: String, seconds: f64 },

    #[error("minimum green for phase '{0}' has already been set")]
    MinGreenAlreadySet(String),

    #[error("phase plan '{0}' has no phases")]
    EmptyPlan(String),

    #[error("phase plan '{plan}' does not cover the streams of intersection '{intersection}'")]
    PlanStreamMismatch { plan: String, intersection: String },

    #[error("stream '{stream}' cannot join intersection '{intersection}' after phase plans were added")]
    StreamAfterPlans { stream: String, intersection: String },

    #[error("a stream named '{0}' already exists")]
    DuplicateStream(String),

    #[error("unknown stream {0}")]
    UnknownStream(StreamId),

    #[error("unknown signal face {0}")]
    UnknownFace(FaceId),

    #[error("signal face {face} already observes stream {stream}")]
    FaceAlreadyBound { face: FaceId, stream: StreamId },

    #[error("intersection '{0}' is running; its topology can no longer change")]
    AssemblyClosed(String),
}

/// Invariant violations detected while the engine is running.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("phase plan '{0}' cannot advance without phases")]
    EmptyPlan(String),

    #[error("stream {stream} has no state in phase '{phase}'")]
    UnassignedStream { phase: String, stream: StreamId },

    #[error("intersection '{0}' has no phase plans")]
    NoPlans(String),

    #[error("unknown phase plan index {0}")]
    UnknownPlan(usize),
}

/// Invalid controller settings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControllerError {
    #[error("controller tick period must be greater than zero")]
    ZeroPeriod,
}

/// A detector could not produce a reading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectorError {
    #[error("detector unavailable: {0}")]
    Unavailable(String),

    #[error("detector script exhausted")]
    Exhausted,
}
