use std::time::Duration;

use crate::audio::CaptureConfig;
use crate::config::Config;

/// Knobs for one recording session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Input device name, or "default"
    pub device: String,

    /// Sample rate for capture and the wire format
    pub sample_rate: u32,

    /// Samples per capture callback
    pub chunk_size: usize,

    /// How often buffered audio is flushed to the transport
    pub flush_interval: Duration,

    /// Quiet interval before transcript changes are persisted
    pub debounce_quiet: Duration,

    /// Auth token, read at start time; start fails fast without one
    pub auth_token: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            device: "default".to_string(),
            sample_rate: 16000,
            chunk_size: 4096,
            flush_interval: Duration::from_millis(1000),
            debounce_quiet: Duration::from_millis(2000),
            auth_token: None,
        }
    }
}

impl SessionConfig {
    pub fn from_config(config: &Config, auth_token: Option<String>) -> Self {
        Self {
            device: config.audio.device.clone(),
            sample_rate: config.audio.sample_rate,
            chunk_size: config.audio.chunk_size,
            flush_interval: Duration::from_millis(config.stream.flush_interval_ms),
            debounce_quiet: Duration::from_millis(config.persist.debounce_ms),
            auth_token,
        }
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            device: self.device.clone(),
            sample_rate: self.sample_rate,
            chunk_size: self.chunk_size,
        }
    }
}
