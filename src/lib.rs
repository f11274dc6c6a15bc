pub mod audio;
pub mod config;
pub mod error;
pub mod persist;
pub mod session;
pub mod transcript;
pub mod transport;

pub use audio::{AudioCapture, AudioFrame, CaptureBuffer, CaptureConfig, CaptureFactory};
pub use config::Config;
pub use error::{CaptureError, PersistenceError, SessionError, TransportError};
pub use persist::{HttpPersistence, PersistDebouncer, Persistence};
pub use session::{SessionConfig, SessionController, SessionState};
pub use transcript::{assemble_paragraphs, TranscriptReconciler, TranscriptSegment};
pub use transport::{ConnectParams, NatsTransportFactory, ResultEvent, Transport, TransportFactory};
