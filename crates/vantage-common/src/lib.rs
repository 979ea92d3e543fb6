pub mod errors;
pub mod id;
pub mod protocol;

pub use errors::BrokerError;
pub use id::{new_session_token, ConnectionId};
pub use protocol::{ClientMessage, ControlCommand, MouseButton, ServerMessage};

pub type Result<T> = std::result::Result<T, BrokerError>;
