use std::io::BufReader;
use std::net::TcpStream;

use crate::network::protocol::{parse_schedule, read_message, write_message};
use crate::network::{RegisterWorkerRequest, RegisterWorkerResponse};
use crate::shared::TransportError;

/// A connection to a running simulation server.
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Client {
    pub fn connect(address: &str) -> Result<Client, TransportError> {
        let writer = TcpStream::connect(address)?;
        let reader = BufReader::new(writer.try_clone()?);
        Ok(Client { reader, writer })
    }

    /// Registers a worker with a schedule string such as `5:3_9:2` and returns the server's
    /// confirmation.
    pub fn add_worker(&mut self, name: &str, schedule: &str) -> Result<String, TransportError> {
        let request = RegisterWorkerRequest {
            name: name.to_string(),
            schedule: parse_schedule(schedule)?,
        };
        write_message(&mut self.writer, &request)?;

        match read_message(&mut self.reader)? {
            Some(RegisterWorkerResponse::Started { message }) => Ok(message),
            Some(RegisterWorkerResponse::Rejected { reason }) => {
                Err(TransportError::Rejected(reason))
            }
            None => Err(TransportError::ConnectionClosed),
        }
    }
}
