pub mod error;
pub mod macros;
pub mod structs;

pub use error::ConfigError;
pub use error::RegisterError;
pub use error::TransportError;
pub use error::ValidationError;
pub use structs::Activity;
pub use structs::Direction;
pub use structs::ElevatorBehaviour;
pub use structs::MoveRequest;
pub use structs::SchedulePair;
pub use structs::Transition;
pub use structs::WorkerBehaviour;
