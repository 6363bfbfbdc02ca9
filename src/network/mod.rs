pub mod client;
pub mod protocol;
pub mod server;

pub use client::Client;
pub use protocol::{parse_schedule, RegisterWorkerRequest, RegisterWorkerResponse};
pub use server::Server;
