//! Recording session management.
//!
//! The `SessionController` is the top-level state machine coordinating:
//! - Microphone capture into the shared capture buffer
//! - Periodic flushing of buffered audio to the transport
//! - Reconciliation of inbound partial/final results
//! - Debounced persistence of transcript state

mod config;
mod controller;
pub mod flush;
mod state;

pub use config::SessionConfig;
pub use controller::SessionController;
pub use state::SessionState;
