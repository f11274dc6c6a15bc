//! Periodic flush of buffered audio to the transport.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::audio::{pcm, CaptureBuffer};
use crate::transport::Transport;

/// Drain, encode, and send buffered audio once per interval until shutdown.
///
/// Audio drained while the transport is disconnected is discarded: losing
/// that tick's audio is the chosen tradeoff over unbounded buffering while
/// the backend is unreachable. Shutdown can only preempt between ticks, so an
/// in-flight send always completes.
pub async fn run_flush_loop(
    buffer: Arc<CaptureBuffer>,
    transport: Arc<dyn Transport>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                flush_once(&buffer, transport.as_ref()).await;
            }
        }
    }

    debug!("Flush loop stopped");
}

/// One flush tick. Also used for the forced final flush on stop.
pub async fn flush_once(buffer: &CaptureBuffer, transport: &dyn Transport) {
    let samples = buffer.drain_all();
    if samples.is_empty() {
        return;
    }

    if !transport.is_connected() {
        debug!(
            "Transport not connected; dropping {} buffered samples",
            samples.len()
        );
        return;
    }

    let chunk = pcm::encode(&samples);
    if let Err(e) = transport.send_audio(&chunk).await {
        warn!("Failed to send audio chunk: {}", e);
    }
}
