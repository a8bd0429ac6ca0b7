//! Repository of all error types for this crate using [thiserror]

use thiserror::Error;

/// Errors that occur while writing a message out on a client socket
#[derive(Error, Debug)]
pub enum SocketError {
    #[error("short write: wrote {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("socket error: {0}")]
    Io(String),
}

/// Errors that occur while turning a [`crate::message::Message`] into bytes or back
#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("failed to serialize message: {0}")]
    Encode(String),

    #[error("failed to deserialize message: {0}")]
    Decode(String),
}

/// Errors triggered while building a [`crate::gateway::Gateway`] using
/// [`crate::gateway::GatewayBuilder`]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum GatewayBuilderError {
    #[error("gateway_sender_queues must be at least 1")]
    NoSenderQueues,

    #[error("{0}")]
    UninitializedField(String),
}

impl From<derive_builder::UninitializedFieldError> for GatewayBuilderError {
    fn from(err: derive_builder::UninitializedFieldError) -> Self {
        GatewayBuilderError::UninitializedField(err.to_string())
    }
}

/// Errors raised while handing a message to the owning silo's message center
#[derive(Error, Debug)]
pub enum SiloLinkError {
    #[error("silo message center is unreachable: {0}")]
    Unreachable(String),
}
