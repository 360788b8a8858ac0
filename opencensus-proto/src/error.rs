/// Errors returned when a message is marshaled or unmarshaled.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The output buffer could not hold the encoded message.
    #[error("failed to encode message: {0}")]
    Encode(#[from] prost::EncodeError),

    /// The input bytes are not a valid encoding of the message.
    #[error("failed to decode message: {0}")]
    Decode(#[from] prost::DecodeError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
