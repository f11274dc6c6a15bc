pub mod messages;
pub mod nats;

pub use messages::{AudioChunkMessage, ResultEvent, SessionStartMessage};
pub use nats::{NatsTransport, NatsTransportFactory};

use std::sync::Arc;

use crate::error::TransportError;
use tokio::sync::mpsc;

/// Connection-establishment parameters. Supplied once at connect time, never
/// renegotiated.
#[derive(Debug, Clone)]
pub struct ConnectParams {
    pub token: String,
    pub sample_rate: u32,
    pub chunk_size: usize,
}

/// Persistent duplex connection to the transcription backend.
///
/// Outbound audio is fire-and-forget; inbound result events arrive on the
/// channel returned by `subscribe_results`, which closes when the connection
/// drops. `close` is idempotent and safe to call on a connection that never
/// fully opened.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    fn is_connected(&self) -> bool;

    async fn send_audio(&self, pcm: &[i16]) -> Result<(), TransportError>;

    async fn subscribe_results(&self) -> Result<mpsc::Receiver<ResultEvent>, TransportError>;

    async fn close(&self) -> Result<(), TransportError>;
}

/// Creates a transport per session start; no reconnection happens inside a
/// session, but a fresh transport is always obtainable for the next one.
#[async_trait::async_trait]
pub trait TransportFactory: Send + Sync {
    async fn connect(&self, params: ConnectParams) -> Result<Arc<dyn Transport>, TransportError>;
}
