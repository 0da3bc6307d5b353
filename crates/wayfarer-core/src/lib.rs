pub mod error;
pub mod gateway;
pub mod message;
pub mod session;

// Re-export main types for convenience
pub use error::{ChatError, ConnectivityError};
pub use gateway::{ChatBackend, HealthOutcome, HttpGateway};
pub use message::{ChatRole, Message, MessageId};
pub use session::{BackendStatus, ChatTicket, Session, SessionEvent, SessionState};
