use crate::error::{ControllerError, EngineError};
use crate::global_variables::{DEFAULT_TICK_MILLIS, DEFAULT_TICK_SECONDS};
use crate::shared_data::IntersectionSnapshot;
use crate::simulation_engine::intersections::{Intersection, TickOutcome};
use log::{error, info};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// How often the controller ticks and how much signal time each tick covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerTiming {
    /// Wall-clock time between ticks.
    pub period: Duration,
    /// Signal time handed to the intersection on every tick.
    pub tick_length: Duration,
}

impl Default for ControllerTiming {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(DEFAULT_TICK_MILLIS),
            tick_length: Duration::from_secs_f64(DEFAULT_TICK_SECONDS),
        }
    }
}

/// Drives one intersection and publishes a snapshot after every complete
/// tick. Readers get their own copy through [`SignalController::subscribe`].
pub struct SignalController {
    intersection: Intersection,
    timing: ControllerTiming,
    snapshots: watch::Sender<IntersectionSnapshot>,
}

impl SignalController {
    /// Fails if `timing.period` is zero.
    pub fn new(
        intersection: Intersection,
        timing: ControllerTiming,
    ) -> Result<Self, ControllerError> {
        if timing.period.is_zero() {
            return Err(ControllerError::ZeroPeriod);
        }
        let (snapshots, _) = watch::channel(intersection.snapshot());
        Ok(Self {
            intersection,
            timing,
            snapshots,
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<IntersectionSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn intersection(&self) -> &Intersection {
        &self.intersection
    }

    pub fn timing(&self) -> ControllerTiming {
        self.timing
    }

    /// Ticks the intersection once and publishes the resulting snapshot.
    pub fn step(&mut self) -> Result<TickOutcome, EngineError> {
        let outcome = self.intersection.tick(self.timing.tick_length)?;
        self.publish();
        Ok(outcome)
    }

    /// Switches the intersection to another plan and publishes the result.
    pub fn select_plan(&mut self, index: usize) -> Result<(), EngineError> {
        self.intersection.select_plan(index)?;
        self.publish();
        Ok(())
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.intersection.snapshot());
    }

    /// Ticks the controller every `timing.period` until `ticks` ticks have run,
    /// or forever when `ticks` is `None`. Returns the number of ticks run.
    pub async fn run_update_loop(
        controller: Arc<Mutex<Self>>,
        ticks: Option<u64>,
    ) -> Result<u64, EngineError> {
        let period = match controller.lock() {
            Ok(ctrl) => {
                info!(
                    "Controller for '{}' started: period {:?}, {:?} per tick",
                    ctrl.intersection.name(),
                    ctrl.timing.period,
                    ctrl.timing.tick_length
                );
                ctrl.timing.period
            }
            Err(poisoned) => poisoned.into_inner().timing.period,
        };
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut completed = 0;
        while ticks.map_or(true, |limit| completed < limit) {
            timer.tick().await;
            {
                let mut ctrl = controller.lock().unwrap_or_else(|p| p.into_inner());
                if let Err(e) = ctrl.step() {
                    error!(
                        "Controller for '{}' stopped after {} ticks: {}",
                        ctrl.intersection.name(),
                        completed,
                        e
                    );
                    return Err(e);
                }
            }
            completed += 1;
        }
        info!("Controller finished after {} ticks", completed);
        Ok(completed)
    }
}
