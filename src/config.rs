use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub stream: StreamConfig,
    pub persist: PersistConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    /// Input device name, or "default" for the system default microphone
    pub device: String,
    pub sample_rate: u32,
    /// Samples delivered per capture callback
    pub chunk_size: usize,
}

#[derive(Debug, Deserialize)]
pub struct StreamConfig {
    pub nats_url: String,
    /// How often buffered audio is flushed to the backend
    pub flush_interval_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct PersistConfig {
    /// Base URL of the transcription record API
    pub api_url: String,
    /// Quiet interval before a transcript change is persisted
    pub debounce_ms: u64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
