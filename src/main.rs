/* 3rd party libraries */
use clap::{Arg, ArgMatches, Command};
use log::info;
use std::path::Path;
use std::sync::Arc;

/* Custom libraries */
use building::Building;
use network::{Client, Server};
use shared::ConfigError;

/* Modules */
mod building;
mod config;
mod dispatcher;
mod elevator;
mod network;
mod shared;
mod worker;

/* Main */
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("server", args)) => run_server(args),
        Some(("client", args)) => run_client(args),
        _ => unreachable!("clap requires a subcommand"),
    }
}

fn cli() -> Command<'static> {
    let config_arg = Arg::new("config")
        .long("config")
        .takes_value(true)
        .default_value("config.toml")
        .help("Path to the TOML configuration file");

    Command::new("elevators")
        .about("Simulates a bank of elevators serving scheduled workers")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("server")
                .about("Runs the building simulation and accepts workers")
                .arg(
                    Arg::new("floors")
                        .long("floors")
                        .takes_value(true)
                        .allow_hyphen_values(true)
                        .required(true)
                        .help("Number of floors in the building"),
                )
                .arg(
                    Arg::new("elevators")
                        .long("elevators")
                        .takes_value(true)
                        .allow_hyphen_values(true)
                        .required(true)
                        .help("Number of elevators in the building"),
                )
                .arg(config_arg.clone()),
        )
        .subcommand(
            Command::new("client")
                .about("Registers one worker with a running server")
                .arg(
                    Arg::new("name")
                        .long("name")
                        .takes_value(true)
                        .required(true)
                        .help("Worker name"),
                )
                .arg(
                    Arg::new("schedule")
                        .long("schedule")
                        .takes_value(true)
                        .required(true)
                        .help("Trips as <floor>:<duration> separated by '_', e.g. 5:3_9:2"),
                )
                .arg(
                    Arg::new("address")
                        .long("address")
                        .takes_value(true)
                        .help("Server address, overrides the configuration file"),
                )
                .arg(config_arg),
        )
}

fn run_server(args: &ArgMatches) {
    let config = unwrap_or_exit!(config::load_config(Path::new(config_path(args))));

    let floors = args.value_of("floors").unwrap_or_default();
    let n_floors = unwrap_or_exit!(floors
        .trim()
        .parse::<i64>()
        .map_err(|_| ConfigError::InvalidFloorCount(floors.to_string())));
    let elevators = args.value_of("elevators").unwrap_or_default();
    let n_elevators = unwrap_or_exit!(elevators
        .trim()
        .parse::<i64>()
        .map_err(|_| ConfigError::InvalidElevatorCount(elevators.to_string())));

    let building = unwrap_or_exit!(Building::new(n_floors, n_elevators, &config.simulation, None));
    unwrap_or_exit!(building.start());

    let server = unwrap_or_exit!(Server::bind(&config.network.address, Arc::new(building)));
    info!(
        "Serving {} floors with {} elevators on {}",
        n_floors, n_elevators, config.network.address
    );
    server.run();
}

fn run_client(args: &ArgMatches) {
    let config = unwrap_or_exit!(config::load_config(Path::new(config_path(args))));
    let address = args
        .value_of("address")
        .map(str::to_string)
        .unwrap_or(config.network.address);
    let name = args.value_of("name").unwrap_or_default();
    let schedule = args.value_of("schedule").unwrap_or_default();

    let mut client = unwrap_or_exit!(Client::connect(&address));
    let message = unwrap_or_exit!(client.add_worker(name, schedule));
    info!("{} {}", message, schedule);
}

fn config_path(args: &ArgMatches) -> &str {
    args.value_of("config").unwrap_or("config.toml")
}
