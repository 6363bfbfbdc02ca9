/***************************************/
/*        3rd party libraries          */
/***************************************/
use thiserror::Error;

/***************************************/
/*             Error types             */
/***************************************/
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse configuration file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("missing valid floor count argument: {0}")]
    InvalidFloorCount(String),
    #[error("missing valid elevator count argument: {0}")]
    InvalidElevatorCount(String),
    #[error("elevator speed must be a positive number of floors per tick, got {0}")]
    InvalidSpeed(f64),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("introduced non-existent floor {floor} (building has floors 1..={n_floors})")]
    InvalidFloor { floor: i64, n_floors: u8 },
    #[error("failed to create activities for {name}, non-existent floors {floors:?}")]
    InvalidItinerary { name: String, floors: Vec<i64> },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed schedule trip {0:?}, expected <floor>:<duration>")]
    MalformedSchedule(String),
    #[error("connection closed before a response was received")]
    ConnectionClosed,
    #[error("server rejected the request: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
