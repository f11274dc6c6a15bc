use serde::Serialize;

/// Session lifecycle.
///
/// `Idle → Starting → Recording → Stopping → Idle`, with `Error` reachable
/// from `Starting` (acquisition failure) and `Recording` (transport drop).
/// `Error` is exited only by a new `start()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Starting,
    Recording,
    Stopping,
    Error,
}
