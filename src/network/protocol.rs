/***************************************/
/*        3rd party libraries          */
/***************************************/
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use std::io::{BufRead, Write};

/***************************************/
/*           Local modules             */
/***************************************/
use crate::shared::{SchedulePair, TransportError};

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RegisterWorkerRequest {
    pub name: String,
    pub schedule: Vec<SchedulePair>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RegisterWorkerResponse {
    Started { message: String },
    Rejected { reason: String },
}

/***************************************/
/*             Public API              */
/***************************************/
/// Parses a schedule such as `5:3_9:2`: trips are separated by `_`, and each trip is
/// `<floor>:<duration>`. Floors are range-checked by the server, not here.
pub fn parse_schedule(schedule: &str) -> Result<Vec<SchedulePair>, TransportError> {
    schedule
        .trim()
        .split('_')
        .map(|trip| {
            let malformed = || TransportError::MalformedSchedule(trip.to_string());
            let (floor, seconds) = trip.split_once(':').ok_or_else(malformed)?;
            Ok(SchedulePair {
                floor: floor.trim().parse().map_err(|_| malformed())?,
                seconds: seconds.trim().parse().map_err(|_| malformed())?,
            })
        })
        .collect()
}

/// Writes one message as a single line of JSON.
pub fn write_message<W: Write, T: Serialize>(
    writer: &mut W,
    message: &T,
) -> Result<(), TransportError> {
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    writer.write_all(&line)?;
    writer.flush()?;
    Ok(())
}

/// Reads one line of JSON. Returns `None` once the peer has closed the connection.
pub fn read_message<R: BufRead, T: DeserializeOwned>(
    reader: &mut R,
) -> Result<Option<T>, TransportError> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line.trim_end())?))
}
