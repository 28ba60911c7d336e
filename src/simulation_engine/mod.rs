// simulation_engine/mod.rs
pub mod detectors;
pub mod faces;
pub mod intersections;
pub mod model_intersections;
pub mod phase_plans;
pub mod phases;
pub mod signals;
pub mod streams;
