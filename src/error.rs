use thiserror::Error;

/// Failure taxonomy for the bridge.
///
/// Failures local to one of a call's three links never terminate the other
/// two: `ChannelUnavailable` degrades the call to no-recognition,
/// `TransmissionFailure` and `MalformedMessage` are logged and dropped, and
/// `GenerationFailure` is substituted with a fixed apology before it can
/// reach the caller. Only the registry errors abort anything (call setup).
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Recognition engine unreachable or handshake failed.
    #[error("recognition channel unavailable: {0}")]
    ChannelUnavailable(String),

    /// A send on one of the three connections failed.
    #[error("transmission failed on {link} link: {reason}")]
    TransmissionFailure { link: &'static str, reason: String },

    /// Undecodable frame from a peer.
    #[error("malformed message from {peer}: {detail}")]
    MalformedMessage { peer: &'static str, detail: String },

    /// Registry already holds a session with this id.
    #[error("session {0} already exists")]
    DuplicateSession(String),

    /// Registry lookup for an unknown id.
    #[error("session {0} not found")]
    SessionNotFound(String),

    /// The reply generator's remote call failed.
    #[error("reply generation failed: {0}")]
    GenerationFailure(String),
}
