use thiserror::Error;

/// Errors from the audio capture backend.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No capture API or input device exists on this host. Fatal to session
    /// start, no retry.
    #[error("device-unsupported: {0}")]
    DeviceUnsupported(String),

    /// The user or OS denied the microphone, or the device refused to open.
    /// Fatal to session start, no retry.
    #[error("device-denied: {0}")]
    DeviceDenied(String),

    /// The stream failed after it was successfully opened.
    #[error("audio stream error: {0}")]
    Stream(String),
}

/// Errors from the duplex transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection-failed: {0}")]
    ConnectionFailed(String),

    /// The backend connection dropped mid-session. Not retried here.
    #[error("connection-failed: transport dropped mid-session")]
    ConnectionDropped,

    #[error("send failed: {0}")]
    Send(String),
}

/// Errors from the persistence collaborator. Logged and retried on the next
/// debounce cycle; never fatal to a recording session.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("persistence-failed: could not create transcription record: {0}")]
    Create(String),

    #[error("persistence-failed: could not update transcription record {record_id}: {reason}")]
    Update { record_id: i64, reason: String },
}

/// Session-level errors surfaced to the caller of `start()`/`stop()`.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No auth token was supplied at start time.
    #[error("no auth token available at session start")]
    MissingToken,

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
