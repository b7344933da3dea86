use structopt::StructOpt;
use tracing::{info, span, warn, Level};

mod settings;
mod simulation;
mod start_up;

use crate::{
    settings::{CommandLine, Settings},
    simulation::Simulation,
};

fn start() -> Result<(), start_up::Error> {
    let command_line = CommandLine::from_args();
    let settings = Settings::load(&command_line)?;
    let _guard = settings.log.init_log()?;

    let span = span!(Level::TRACE, "simulation", seed = settings.seed);
    let _enter = span.enter();
    for msg in &settings.log.overrides {
        warn!("{}", msg);
    }
    info!(
        stake_holders = settings.notes.len(),
        slots = settings.slots,
        "starting the simulation"
    );

    let mut simulation = Simulation::new(&settings)?;
    for report in simulation.run(settings.slots) {
        println!("{}", report);
    }
    Ok(())
}

fn main() {
    use std::error::Error;

    if let Err(error) = start() {
        eprintln!("{}", error);
        let mut source = error.source();
        while let Some(err) = source {
            eprintln!(" |-> {}", err);
            source = err.source();
        }

        std::process::exit(error.code());
    }
}
