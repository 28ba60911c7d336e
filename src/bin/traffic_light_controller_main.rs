// traffic_light_controller_main.rs
use clap::{Parser, ValueEnum};
use log::info;
use signal_controller::control_system::traffic_light_controller::{
    ControllerTiming, SignalController,
};
use signal_controller::global_variables::{AMQP_URL, DEFAULT_TICK_MILLIS, DEFAULT_TICK_SECONDS};
use signal_controller::loader::intersection_loader::IntersectionLoader;
use signal_controller::monitoring::snapshot_publisher::spawn_snapshot_publisher;
use signal_controller::simulation_engine::model_intersections::{
    fully_actuated_intersection, pretimed_intersection,
};
use std::error::Error;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Demo {
    Pretimed,
    Actuated,
}

/// Runs a traffic signal controller for one intersection.
#[derive(Parser, Debug)]
#[command(name = "traffic_light_controller")]
struct Args {
    /// Intersection description file to load
    #[arg(long)]
    file: Option<PathBuf>,

    /// Built-in intersection to run when no file is given
    #[arg(long, value_enum, default_value_t = Demo::Pretimed)]
    demo: Demo,

    /// Number of ticks to run (0 runs until interrupted)
    #[arg(long, default_value_t = 0)]
    ticks: u64,

    /// Wall-clock milliseconds between ticks
    #[arg(long, default_value_t = DEFAULT_TICK_MILLIS, value_parser = clap::value_parser!(u64).range(1..))]
    tick_ms: u64,

    /// Signal seconds covered by each tick
    #[arg(long, default_value_t = DEFAULT_TICK_SECONDS)]
    tick_secs: f64,

    /// Forward every snapshot to RabbitMQ
    #[arg(long)]
    publish: bool,

    #[arg(long, default_value = AMQP_URL)]
    amqp_url: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let intersection = match &args.file {
        Some(path) => IntersectionLoader::new().load_file(path)?,
        None => match args.demo {
            Demo::Pretimed => pretimed_intersection()?,
            Demo::Actuated => fully_actuated_intersection()?,
        },
    };
    let timing = ControllerTiming {
        period: Duration::from_millis(args.tick_ms),
        tick_length: Duration::try_from_secs_f64(args.tick_secs)?,
    };
    info!("Starting traffic controller for '{}'", intersection.name());

    let controller = Arc::new(Mutex::new(SignalController::new(intersection, timing)?));
    let publisher = if args.publish {
        let receiver = controller
            .lock()
            .map_err(|_| "controller lock poisoned")?
            .subscribe();
        Some(spawn_snapshot_publisher(receiver, args.amqp_url.clone()))
    } else {
        None
    };

    let ticks = if args.ticks == 0 { None } else { Some(args.ticks) };
    let result = SignalController::run_update_loop(Arc::clone(&controller), ticks).await;
    // Closing the snapshot channel lets the publisher finish.
    drop(controller);

    if let Some(publisher) = publisher {
        publisher.await?;
    }
    result?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_tick_period_is_refused() {
        assert!(Args::try_parse_from(["controller", "--tick-ms", "0"]).is_err());
        let args = Args::try_parse_from(["controller", "--tick-ms", "250"]).unwrap();
        assert_eq!(args.tick_ms, 250);
    }
}
