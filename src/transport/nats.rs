//! NATS-backed transport.
//!
//! One connection per recording session. Audio chunks go out on
//! `transcribe.audio.<session_id>`; result events come back on
//! `transcribe.result.<session_id>`. Segment identity across a dropped and
//! re-established connection is undefined: the backend may or may not reuse
//! result ids, so callers must not assume continuity (a new session clears
//! the reconciler instead).

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use base64::Engine;
use futures::stream::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::messages::{AudioChunkMessage, InboundResult, ResultEvent, SessionStartMessage};
use super::{ConnectParams, Transport, TransportFactory};
use crate::audio::pcm;
use crate::error::TransportError;

pub struct NatsTransportFactory {
    url: String,
}

impl NatsTransportFactory {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait::async_trait]
impl TransportFactory for NatsTransportFactory {
    async fn connect(&self, params: ConnectParams) -> Result<Arc<dyn Transport>, TransportError> {
        let transport = NatsTransport::connect(&self.url, params).await?;
        Ok(Arc::new(transport))
    }
}

pub struct NatsTransport {
    client: async_nats::Client,
    session_id: String,
    sequence: AtomicU32,
    closed: AtomicBool,
}

impl NatsTransport {
    pub async fn connect(url: &str, params: ConnectParams) -> Result<Self, TransportError> {
        info!("Connecting to transcription backend at {}", url);

        let client = async_nats::connect(url)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        let session_id = uuid::Uuid::new_v4().to_string();

        let start = SessionStartMessage {
            session_id: session_id.clone(),
            token: params.token,
            sample_rate: params.sample_rate,
            chunk_size: params.chunk_size,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let payload =
            serde_json::to_vec(&start).map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        client
            .publish("transcribe.session.start", payload.into())
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        info!("Transcription session announced: {}", session_id);

        Ok(Self {
            client,
            session_id,
            sequence: AtomicU32::new(0),
            closed: AtomicBool::new(false),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

#[async_trait::async_trait]
impl Transport for NatsTransport {
    fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
            && self.client.connection_state() == async_nats::connection::State::Connected
    }

    async fn send_audio(&self, samples: &[i16]) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Send("transport is closed".into()));
        }

        let subject = format!("transcribe.audio.{}", self.session_id);
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);

        let message = AudioChunkMessage {
            session_id: self.session_id.clone(),
            sequence,
            pcm: base64::engine::general_purpose::STANDARD.encode(pcm::to_le_bytes(samples)),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let payload =
            serde_json::to_vec(&message).map_err(|e| TransportError::Send(e.to_string()))?;

        self.client
            .publish(subject, payload.into())
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;

        debug!(sequence, samples = samples.len(), "Published audio chunk");

        Ok(())
    }

    async fn subscribe_results(&self) -> Result<mpsc::Receiver<ResultEvent>, TransportError> {
        let subject = format!("transcribe.result.{}", self.session_id);

        let mut subscriber = self
            .client
            .subscribe(subject.clone())
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        info!("Subscribed to results on {}", subject);

        let (tx, rx) = mpsc::channel(64);

        // Bridge NATS messages to result events. Ends when the subscription
        // does, which closes the channel and signals a transport drop to the
        // consumer.
        tokio::spawn(async move {
            while let Some(msg) = subscriber.next().await {
                match serde_json::from_slice::<InboundResult>(&msg.payload) {
                    Ok(inbound) => {
                        if tx.send(ResultEvent::from(inbound)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to parse result event: {}", e);
                    }
                }
            }
            debug!("Result subscription ended");
        });

        Ok(rx)
    }

    async fn close(&self) -> Result<(), TransportError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(()); // already closed
        }

        // Flush pending publishes; connection cleanup happens on drop.
        if let Err(e) = self.client.flush().await {
            warn!("Failed to flush transport on close: {}", e);
        }

        info!("Transport closed: {}", self.session_id);
        Ok(())
    }
}
