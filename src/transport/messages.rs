use serde::{Deserialize, Serialize};

/// Announces a new session to the backend, carrying the connection
/// parameters. Published once, immediately after connecting.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionStartMessage {
    pub session_id: String,
    pub token: String,
    pub sample_rate: u32,
    pub chunk_size: usize,
    pub timestamp: String, // RFC3339
}

/// One flushed chunk of encoded audio.
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioChunkMessage {
    pub session_id: String,
    pub sequence: u32,
    pub pcm: String, // Base64-encoded little-endian i16 samples
    pub timestamp: String,
}

/// A partial or final transcription result for one utterance span.
///
/// `result_id` groups all revisions of the span; a newer event for the same
/// id supersedes the older content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultEvent {
    pub result_id: String,
    pub alternatives: Vec<String>,
    pub is_partial: bool,
}

impl ResultEvent {
    /// Result id assigned to events from backends that stream plain
    /// transcript strings without span keys. All such events revise one
    /// implicit span.
    pub const IMPLICIT_ID: &'static str = "__unkeyed__";
}

/// Wire shape of an inbound result. Backends either send the keyed
/// partial/final contract or a bare `{"transcript": "..."}` stream; the
/// latter maps onto a single implicit result id.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum InboundResult {
    Keyed {
        result_id: String,
        alternatives: Vec<String>,
        #[serde(default)]
        is_partial: bool,
    },
    Plain {
        transcript: String,
    },
}

impl From<InboundResult> for ResultEvent {
    fn from(inbound: InboundResult) -> Self {
        match inbound {
            InboundResult::Keyed {
                result_id,
                alternatives,
                is_partial,
            } => ResultEvent {
                result_id,
                alternatives,
                is_partial,
            },
            InboundResult::Plain { transcript } => ResultEvent {
                result_id: ResultEvent::IMPLICIT_ID.to_string(),
                alternatives: vec![transcript],
                is_partial: true,
            },
        }
    }
}
