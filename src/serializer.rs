//! Turns [`Message`]s into bytes for the wire
//!
//! The concrete framing (length prefix, etc) is handled by the socket's own
//! codec; a [`Serializer`] only owns the payload encoding, the same split
//! the rest of the runtime uses between `bincode::serialize` and
//! `tokio_util::codec::LengthDelimitedCodec`.

use crate::errors::SerializationError;
use crate::message::Message;

/// Per-message serialization error paired with the index of the offending
/// message inside a batch
#[derive(Debug)]
pub struct BatchSerializationError {
    pub index: usize,
    pub error: SerializationError,
}

pub trait Serializer: Send + Sync {
    fn serialize(&self, message: &Message) -> Result<Vec<u8>, SerializationError>;

    /// Serializes a batch of messages
    ///
    /// The batch processor only ever calls this with messages for a single
    /// `ClientId`; a serializer may assume that but is not required to
    /// validate it (see the batch-processing open question in the design).
    fn serialize_batch(&self, messages: &[Message]) -> Result<Vec<u8>, Vec<BatchSerializationError>>;
}

/// Default [`Serializer`], using `bincode` like the rest of the runtime's
/// wire protocol
#[derive(Default, Clone, Copy)]
pub struct BincodeSerializer;

impl Serializer for BincodeSerializer {
    fn serialize(&self, message: &Message) -> Result<Vec<u8>, SerializationError> {
        bincode::serialize(message).map_err(|err| SerializationError::Encode(err.to_string()))
    }

    fn serialize_batch(&self, messages: &[Message]) -> Result<Vec<u8>, Vec<BatchSerializationError>> {
        bincode::serialize(messages).map_err(|err| {
            vec![BatchSerializationError {
                index: 0,
                error: SerializationError::Encode(err.to_string()),
            }]
        })
    }
}
