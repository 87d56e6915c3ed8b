use std::env;
use std::fs;
use std::io;

use log::warn;
use thiserror::Error;

const CONFIG_FILE_PATH: &str = "config.json";
const FALLBACK_CONFIG_FILE_PATH: &str = "_config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read configuration file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("an elevator needs at least 2 floors, got {0}")]
    TooFewFloors(u8),
    #[error("starting floor {floor} is outside 1..={num_floors}")]
    StartingFloorOutOfRange { floor: u8, num_floors: u8 },
    #[error("max_history must be positive")]
    EmptyHistory,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct ElevatorSection {
    pub num_floors: u8,
    #[serde(default = "default_starting_floor")]
    pub starting_floor: u8,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct CacheSection {
    #[serde(default = "default_true")]
    pub enable_caching: bool,
    #[serde(default = "default_true")]
    pub pre_position: bool,
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    #[serde(default = "default_idle_threshold")]
    pub idle_threshold_seconds: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        CacheSection {
            enable_caching: true,
            pre_position: true,
            max_history: default_max_history(),
            idle_threshold_seconds: default_idle_threshold(),
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct RuntimeSection {
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        RuntimeSection { tick_millis: default_tick_millis() }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct ConfigFile {
    pub elevator: ElevatorSection,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub runtime: RuntimeSection,
}

fn default_true() -> bool { true }
fn default_starting_floor() -> u8 { 1 }
fn default_max_history() -> usize { 1000 }
fn default_idle_threshold() -> u64 { 30 }
fn default_tick_millis() -> u64 { 1000 }

/// Everything a `RequestScheduler` needs at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSettings {
    pub num_floors: u8,
    pub starting_floor: u8,
    pub enable_caching: bool,
    pub pre_position: bool,
    pub max_history: usize,
    pub idle_threshold_seconds: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        SchedulerSettings {
            num_floors: 10,
            starting_floor: 1,
            enable_caching: true,
            pre_position: true,
            max_history: default_max_history(),
            idle_threshold_seconds: default_idle_threshold(),
        }
    }
}

impl SchedulerSettings {
    pub fn new(num_floors: u8, starting_floor: u8) -> Self {
        SchedulerSettings {
            num_floors: num_floors,
            starting_floor: starting_floor,
            ..SchedulerSettings::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_floors < 2 {
            return Err(ConfigError::TooFewFloors(self.num_floors));
        }
        if self.starting_floor < 1 || self.starting_floor > self.num_floors {
            return Err(ConfigError::StartingFloorOutOfRange {
                floor: self.starting_floor,
                num_floors: self.num_floors,
            });
        }
        if self.max_history == 0 {
            return Err(ConfigError::EmptyHistory);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub tick_millis: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub scheduler: SchedulerSettings,
    pub runtime: RuntimeConfig,
}

impl Config {
    pub fn get() -> Result<Self, ConfigError> {
        let config_contents = read_config_file()?;
        let args: Vec<String> = env::args().collect();
        Self::parse(&config_contents, &args)
    }

    /// Builds a validated config from file contents and command-line arguments
    /// (program name included, as `env::args` yields them).
    pub fn parse(config_contents: &str, args: &[String]) -> Result<Self, ConfigError> {
        let config_file: ConfigFile = serde_json::from_str(config_contents)?;
        let mut scheduler = SchedulerSettings {
            num_floors: config_file.elevator.num_floors,
            starting_floor: config_file.elevator.starting_floor,
            enable_caching: config_file.cache.enable_caching,
            pre_position: config_file.cache.pre_position,
            max_history: config_file.cache.max_history,
            idle_threshold_seconds: config_file.cache.idle_threshold_seconds,
        };
        parse_env_args(&mut scheduler, args);
        scheduler.validate()?;

        Ok(Config {
            scheduler: scheduler,
            runtime: RuntimeConfig {
                tick_millis: config_file.runtime.tick_millis.max(1),
            },
        })
    }
}

fn read_config_file() -> Result<String, ConfigError> {
    match fs::read_to_string(CONFIG_FILE_PATH) {
        Ok(content) => Ok(content),
        Err(_) => {
            println!("No configuration file provided, using default settings...");
            fs::read_to_string(FALLBACK_CONFIG_FILE_PATH).map_err(|source| ConfigError::Read {
                path: FALLBACK_CONFIG_FILE_PATH.to_string(),
                source: source,
            })
        },
    }
}

fn parse_env_args(settings: &mut SchedulerSettings, args: &[String]) {
    for arg_pair in args.rchunks_exact(2) {
        match arg_pair[0].as_str() {
            "--floors" => match arg_pair[1].parse::<u8>() {
                Ok(num) => settings.num_floors = num,
                Err(_) => warn!("floors {} is not a number, skipping...", arg_pair[1]),
            },
            "--start" => match arg_pair[1].parse::<u8>() {
                Ok(num) => settings.starting_floor = num,
                Err(_) => warn!("start {} is not a number, skipping...", arg_pair[1]),
            },
            "--caching" => match arg_pair[1].parse::<bool>() {
                Ok(on) => settings.enable_caching = on,
                Err(_) => warn!("caching {} is not true/false, skipping...", arg_pair[1]),
            },
            "--idle" => match arg_pair[1].parse::<u64>() {
                Ok(seconds) => settings.idle_threshold_seconds = seconds,
                Err(_) => warn!("idle {} is not a number, skipping...", arg_pair[1]),
            },
            _ => warn!("illegal argument {}, skipping...", arg_pair[0]),
        }
    }
}
