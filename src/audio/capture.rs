use crate::error::CaptureError;
use tokio::sync::mpsc;

/// Normalized audio produced by one capture callback invocation.
///
/// Samples are mono f32 in [-1.0, 1.0]. Ownership moves from the capture
/// backend into the capture buffer.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
}

/// Configuration for a capture backend.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Input device name, or "default"
    pub device: String,
    /// Target sample rate in Hz (backend resamples if the device differs)
    pub sample_rate: u32,
    /// Samples per emitted frame
    pub chunk_size: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: "default".to_string(),
            sample_rate: 16000,
            chunk_size: 4096,
        }
    }
}

/// Audio capture backend.
///
/// `start` acquires the device and returns a channel receiver of frames;
/// `stop` releases the device deterministically. A backend that fails to
/// start must not hold any resource afterwards.
#[async_trait::async_trait]
pub trait AudioCapture: Send {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError>;

    async fn stop(&mut self) -> Result<(), CaptureError>;

    fn is_capturing(&self) -> bool;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Creates a capture backend per session start. The seam the session
/// controller (and tests) use to inject a backend.
pub trait CaptureFactory: Send + Sync {
    fn create(&self, config: &CaptureConfig) -> Result<Box<dyn AudioCapture>, CaptureError>;
}

/// Factory for the cpal microphone backend.
pub struct MicrophoneFactory;

impl CaptureFactory for MicrophoneFactory {
    fn create(&self, config: &CaptureConfig) -> Result<Box<dyn AudioCapture>, CaptureError> {
        Ok(Box::new(super::microphone::MicrophoneCapture::new(
            config.clone(),
        )))
    }
}
