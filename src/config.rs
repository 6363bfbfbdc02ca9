/***************************************/
/*        3rd party libraries          */
/***************************************/
use log::warn;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::shared::ConfigError;

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub network: NetworkConfig,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub tick_ms: u64,
    pub door_open_ms: u64,
    pub speed: f64,
    pub work_unit_ms: u64,
    pub seed: Option<u64>,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    pub address: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            tick_ms: 250,
            door_open_ms: 2000,
            speed: 0.25,
            work_unit_ms: 1000,
            seed: None,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            address: "127.0.0.1:1234".to_string(),
        }
    }
}

impl SimulationConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn door_open_time(&self) -> Duration {
        Duration::from_millis(self.door_open_ms)
    }

    pub fn work_unit(&self) -> Duration {
        Duration::from_millis(self.work_unit_ms)
    }
}

/***************************************/
/*             Public API              */
/***************************************/
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let config_str = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("{} not found, using default configuration", path.display());
            return Ok(Config::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            })
        }
    };
    parse_config(&config_str).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

pub fn parse_config(config_str: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(config_str)
}

/***************************************/
/*             Unit tests              */
/***************************************/
