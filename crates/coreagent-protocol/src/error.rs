/// Identifier generation failed
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    #[error("secure random source unavailable: {0}")]
    RandomSource(#[from] getrandom::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("failed to serialize message: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("payload of {0} bytes does not fit a 4-byte length prefix")]
    PayloadTooLarge(usize),
}
