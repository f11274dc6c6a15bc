//! cpal-based microphone capture.
//!
//! cpal streams are not `Send`, so the stream lives on a dedicated thread
//! that the async side talks to over channels. The callback mixes input to
//! mono f32, resamples to the target rate, and hands frames to the capture
//! task via a bounded channel.

use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::capture::{AudioCapture, AudioFrame, CaptureConfig};
use crate::error::CaptureError;

enum CaptureCommand {
    Stop,
}

pub struct MicrophoneCapture {
    config: CaptureConfig,
    cmd_tx: Option<std::sync::mpsc::Sender<CaptureCommand>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MicrophoneCapture {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            cmd_tx: None,
            thread_handle: None,
        }
    }

    fn find_device(&self, host: &cpal::Host) -> Result<cpal::Device, CaptureError> {
        if self.config.device == "default" {
            return host.default_input_device().ok_or_else(|| {
                CaptureError::DeviceUnsupported("no default input device on this host".into())
            });
        }

        let wanted = self.config.device.to_lowercase();
        let mut devices = host
            .input_devices()
            .map_err(|e| CaptureError::DeviceUnsupported(e.to_string()))?;

        devices
            .find(|d| {
                d.name()
                    .map(|n| n.to_lowercase().contains(&wanted))
                    .unwrap_or(false)
            })
            .ok_or_else(|| {
                CaptureError::DeviceDenied(format!(
                    "input device '{}' not found",
                    self.config.device
                ))
            })
    }
}

#[async_trait::async_trait]
impl AudioCapture for MicrophoneCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        let host = cpal::default_host();
        let device = self.find_device(&host)?;

        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        info!("Using input device: {}", device_name);

        let supported = device
            .default_input_config()
            .map_err(|e| CaptureError::DeviceDenied(e.to_string()))?;

        let source_rate = supported.sample_rate().0;
        let source_channels = supported.channels() as usize;
        let sample_format = supported.sample_format();
        let target_rate = self.config.sample_rate;
        let chunk_size = self.config.chunk_size;

        debug!(
            "Device config: {} Hz, {} channel(s), format {:?}",
            source_rate, source_channels, sample_format
        );

        let (frame_tx, frame_rx) = mpsc::channel(64);
        let (cmd_tx, cmd_rx) = std::sync::mpsc::channel::<CaptureCommand>();
        // Reports stream build/play outcome back to start() before the
        // thread parks on the command channel.
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<(), CaptureError>>();

        let thread_handle = thread::spawn(move || {
            let stream_config = cpal::StreamConfig {
                channels: supported.channels(),
                sample_rate: supported.sample_rate(),
                buffer_size: cpal::BufferSize::Default,
            };

            let err_fn = |err| error!("Audio stream error: {}", err);

            let params = FrameParams {
                tx: frame_tx,
                source_rate,
                target_rate,
                source_channels,
                chunk_size,
            };

            let stream_result = match sample_format {
                cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, params, err_fn),
                cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, params, err_fn),
                cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, params, err_fn),
                format => Err(CaptureError::DeviceUnsupported(format!(
                    "unsupported sample format: {:?}",
                    format
                ))),
            };

            let stream = match stream_result {
                Ok(s) => s,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(CaptureError::DeviceDenied(e.to_string())));
                return;
            }

            let _ = ready_tx.send(Ok(()));
            debug!("Audio capture thread started");

            // Park until stop; dropping the stream releases the device.
            let _ = cmd_rx.recv();
            drop(stream);
            debug!("Audio capture thread stopped");
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.cmd_tx = Some(cmd_tx);
                self.thread_handle = Some(thread_handle);
                Ok(frame_rx)
            }
            Ok(Err(e)) => {
                let _ = thread_handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread_handle.join();
                Err(CaptureError::DeviceDenied(
                    "capture thread exited before reporting readiness".into(),
                ))
            }
        }
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if let Some(cmd_tx) = self.cmd_tx.take() {
            let _ = cmd_tx.send(CaptureCommand::Stop);
        }

        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                warn!("Audio capture thread panicked during shutdown");
            }
        }

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.thread_handle.is_some()
    }

    fn name(&self) -> &str {
        "cpal-microphone"
    }
}

impl Drop for MicrophoneCapture {
    fn drop(&mut self) {
        if let Some(cmd_tx) = self.cmd_tx.take() {
            let _ = cmd_tx.send(CaptureCommand::Stop);
        }
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

struct FrameParams {
    tx: mpsc::Sender<AudioFrame>,
    source_rate: u32,
    target_rate: u32,
    source_channels: usize,
    chunk_size: usize,
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    params: FrameParams,
    err_fn: impl Fn(cpal::StreamError) + Send + 'static,
) -> Result<cpal::Stream, CaptureError>
where
    T: cpal::Sample + cpal::SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    let FrameParams {
        tx,
        source_rate,
        target_rate,
        source_channels,
        chunk_size,
    } = params;

    // Carries samples between callbacks so emitted frames hold chunk_size
    // samples regardless of the device's native buffer size.
    let mut pending: Vec<f32> = Vec::with_capacity(chunk_size * 2);

    let stream = device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let mono: Vec<f32> = data
                    .chunks(source_channels)
                    .map(|frame| {
                        let sum: f32 = frame
                            .iter()
                            .map(|&s| <f32 as cpal::FromSample<T>>::from_sample_(s))
                            .sum();
                        sum / source_channels as f32
                    })
                    .collect();

                let resampled = if source_rate != target_rate {
                    resample(&mono, source_rate, target_rate)
                } else {
                    mono
                };

                pending.extend_from_slice(&resampled);

                while pending.len() >= chunk_size {
                    let samples: Vec<f32> = pending.drain(..chunk_size).collect();
                    // Receiver lagging or gone; losing a frame here beats
                    // blocking the audio callback.
                    let _ = tx.try_send(AudioFrame { samples });
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| CaptureError::DeviceDenied(e.to_string()))?;

    Ok(stream)
}

/// Linear interpolation resampling.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let new_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(new_len);

    for i in 0..new_len {
        let src_idx = i as f64 / ratio;
        let idx = src_idx.floor() as usize;
        let frac = (src_idx - idx as f64) as f32;

        let sample = if idx + 1 < samples.len() {
            samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
        } else {
            samples.get(idx).copied().unwrap_or(0.0)
        };

        output.push(sample);
    }

    output
}
