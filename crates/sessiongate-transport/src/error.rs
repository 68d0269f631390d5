/// Errors that can occur at the transport boundary.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The call did not carry the named request parameter.
    #[error("missing request parameter: {0}")]
    MissingParameter(String),

    /// Writing the response body failed.
    #[error("write failed: {0}")]
    WriteFailed(#[source] std::io::Error),

    /// An attachment name contained control characters and cannot be
    /// placed in a header.
    #[error("invalid attachment filename: {0:?}")]
    InvalidFilename(String),

    /// The sink was already closed by an earlier delivery.
    #[error("response already delivered")]
    AlreadyDelivered,
}
