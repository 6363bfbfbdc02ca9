use std::io::BufReader;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::Builder;

use crate::building::Building;
use crate::network::protocol::{read_message, write_message};
use crate::network::{RegisterWorkerRequest, RegisterWorkerResponse};
use crate::shared::TransportError;
use log::{info, warn};

/**
 * Accepts worker registrations over TCP.
 *
 * Every connection is served on its own thread and may carry any number of newline-delimited
 * JSON `RegisterWorkerRequest`s, each answered by one `RegisterWorkerResponse`.
 *
 * # Fields
 * - `listener`:    Bound TCP listener.
 * - `building`:    Simulation the workers are registered with.
 */
pub struct Server {
    listener: TcpListener,
    building: Arc<Building>,
}

impl Server {
    pub fn bind(address: &str, building: Arc<Building>) -> Result<Server, TransportError> {
        let listener = TcpListener::bind(address)?;
        Ok(Server { listener, building })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves connections until the listener fails.
    pub fn run(self) {
        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let building = Arc::clone(&self.building);
            let connection_thread = Builder::new().name("connection".into());
            let spawned = connection_thread.spawn(move || {
                let peer = stream.peer_addr().ok();
                if let Err(e) = handle_connection(stream, &building) {
                    warn!("Connection {:?} closed with error: {}", peer, e);
                }
            });
            if let Err(e) = spawned {
                warn!("Failed to spawn connection thread: {}", e);
            }
        }
    }
}

fn handle_connection(stream: TcpStream, building: &Building) -> Result<(), TransportError> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = stream;

    while let Some(request) = read_message::<_, RegisterWorkerRequest>(&mut reader)? {
        info!("Registration request for {}", request.name);
        let response = match building.register_worker(&request.name, &request.schedule) {
            Ok(message) => RegisterWorkerResponse::Started { message },
            Err(e) => RegisterWorkerResponse::Rejected {
                reason: e.to_string(),
            },
        };
        write_message(&mut writer, &response)?;
    }
    Ok(())
}
