use std::io;
use std::time::Duration;

use crossbeam_channel::{select, tick};
use log::LevelFilter;

use crate::utilities::config::Config;
use crate::utilities::debug::Debug;

use self::dispatch::Step;
use self::input::Command;
use self::scheduler::RequestScheduler;

pub mod dispatch;
pub mod input;
pub mod predictor;
pub mod scheduler;

fn print_steps(scheduler: &mut RequestScheduler) {
    for step in scheduler.process_requests() {
        if step != Step::NoRequests {
            println!("  {}", step);
        }
    }
}

pub fn run() -> io::Result<()> {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    // READ CONFIGURATION
    let config = Config::get().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    // INITIALIZE SCHEDULER
    let mut scheduler = RequestScheduler::new(config.scheduler.clone())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let mut debug = Debug::new(scheduler.num_floors());
    println!(
        "Elevator started at floor {} of {} (caching {})",
        scheduler.current_floor(),
        scheduler.num_floors(),
        if scheduler.caching_enabled() { "on" } else { "off" },
    );

    // INITIALIZE INPUT MODULE
    let command_rx = input::init()?;
    let timer = tick(Duration::from_millis(config.runtime.tick_millis));

    loop {
        select! {
            recv(command_rx) -> msg => {
                let command = match msg {
                    Ok(command) => command,
                    Err(_) => return Ok(()),
                };
                match command {
                    Command::Call { floor, origin, requester } => {
                        if !scheduler.admit_floor_number(floor, requester.as_deref(), origin) {
                            println!("Floor {} is not served by this elevator", floor);
                        }
                    },
                    Command::Go => print_steps(&mut scheduler),
                    Command::Status => debug.printstatus(&scheduler.status())?,
                    Command::Json => println!("{}", serde_json::to_string_pretty(&scheduler.status())?),
                    Command::Clear => scheduler.clear(),
                    Command::Quit => {
                        println!("STOPPING PROGRAM...");
                        return Ok(())
                    },
                }
            },
            recv(timer) -> _ => {
                // dispatches anything pending, otherwise gives the idle car a chance to reposition
                print_steps(&mut scheduler);
            },
        }
    }
}
