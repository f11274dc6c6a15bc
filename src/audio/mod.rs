pub mod buffer;
pub mod capture;
pub mod microphone;
pub mod pcm;

pub use buffer::CaptureBuffer;
pub use capture::{AudioCapture, AudioFrame, CaptureConfig, CaptureFactory, MicrophoneFactory};
pub use microphone::MicrophoneCapture;
