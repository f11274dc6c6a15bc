//! Accumulates captured audio frames between flush ticks.
//!
//! The capture task appends and the flush task drains, concurrently. Both
//! operations take the same lock; the drain holds it only for the storage
//! swap, so an append never waits on the O(n) flatten.

use std::mem;
use std::sync::Mutex;

use super::capture::AudioFrame;

#[derive(Debug, Default)]
pub struct CaptureBuffer {
    frames: Mutex<Vec<AudioFrame>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one frame to the tail. O(1) amortized.
    pub fn append(&self, frame: AudioFrame) {
        let mut frames = self.frames.lock().expect("capture buffer lock poisoned");
        frames.push(frame);
    }

    /// Atomically take every buffered frame and return the flattened sample
    /// sequence. No frame is ever visible to two successive drains.
    pub fn drain_all(&self) -> Vec<f32> {
        let frames = {
            let mut guard = self.frames.lock().expect("capture buffer lock poisoned");
            mem::take(&mut *guard)
        };

        let total: usize = frames.iter().map(|f| f.samples.len()).sum();
        let mut flat = Vec::with_capacity(total);
        for frame in frames {
            flat.extend_from_slice(&frame.samples);
        }
        flat
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().expect("capture buffer lock poisoned").is_empty()
    }
}
