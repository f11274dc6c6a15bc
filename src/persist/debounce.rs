//! Debounced persistence of transcript state.
//!
//! Every transcript change re-arms a quiet-interval timer; only when no
//! further change arrives within the interval is the latest text persisted.
//! Session stop forces an immediate, unconditional persist so the final
//! state never sits behind a pending timer.
//!
//! The task also owns the Transcription Record id. The controller creates
//! the record on recording start; if that fails, creation is retried on each
//! persist attempt until it succeeds, and the id is cached from then on.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use super::Persistence;

enum Msg {
    /// Transcript changed; persist after the quiet interval.
    Update(String),
    /// Persist now, bypassing the debounce window. Acked when done.
    Flush(String, oneshot::Sender<()>),
}

pub struct PersistDebouncer {
    tx: mpsc::Sender<Msg>,
    task: JoinHandle<()>,
}

/// Cheap handle for reporting transcript changes from another task.
#[derive(Clone)]
pub struct DebounceSender {
    tx: mpsc::Sender<Msg>,
}

impl DebounceSender {
    pub async fn update(&self, text: String) {
        if self.tx.send(Msg::Update(text)).await.is_err() {
            warn!("Persistence debouncer is gone; dropping transcript update");
        }
    }
}

impl PersistDebouncer {
    pub fn spawn(
        persistence: Arc<dyn Persistence>,
        token: String,
        record_id: Option<i64>,
        quiet: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let task = tokio::spawn(run(rx, persistence, token, record_id, quiet));
        Self { tx, task }
    }

    /// Report a transcript change. Never blocks recording: if the debounce
    /// task has fallen behind, the newest state still wins on the next cycle.
    pub async fn update(&self, text: String) {
        if self.tx.send(Msg::Update(text)).await.is_err() {
            warn!("Persistence debouncer is gone; dropping transcript update");
        }
    }

    pub fn sender(&self) -> DebounceSender {
        DebounceSender { tx: self.tx.clone() }
    }

    /// Force an immediate persist and wait for it to complete.
    pub async fn flush(&self, text: String) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Msg::Flush(text, ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Persist anything still pending and stop the task.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            warn!("Persistence debouncer task panicked: {}", e);
        }
    }
}

async fn run(
    mut rx: mpsc::Receiver<Msg>,
    persistence: Arc<dyn Persistence>,
    token: String,
    mut record_id: Option<i64>,
    quiet: Duration,
) {
    let mut pending: Option<String> = None;
    let mut deadline = Instant::now();

    loop {
        tokio::select! {
            msg = rx.recv() => match msg {
                Some(Msg::Update(text)) => {
                    pending = Some(text);
                    deadline = Instant::now() + quiet;
                }
                Some(Msg::Flush(text, ack)) => {
                    pending = None;
                    persist(persistence.as_ref(), &token, &mut record_id, &text).await;
                    let _ = ack.send(());
                }
                None => {
                    if let Some(text) = pending.take() {
                        persist(persistence.as_ref(), &token, &mut record_id, &text).await;
                    }
                    break;
                }
            },
            _ = sleep_until(deadline), if pending.is_some() => {
                if let Some(text) = pending.take() {
                    persist(persistence.as_ref(), &token, &mut record_id, &text).await;
                }
            }
        }
    }

    debug!("Persistence debouncer stopped");
}

/// One persist attempt. Errors are logged and swallowed; the next cycle
/// retries with current state.
async fn persist(
    persistence: &dyn Persistence,
    token: &str,
    record_id: &mut Option<i64>,
    text: &str,
) {
    let id = match record_id {
        Some(id) => *id,
        None => match persistence.create_record(token).await {
            Ok(id) => {
                *record_id = Some(id);
                id
            }
            Err(e) => {
                warn!("{}", e);
                return;
            }
        },
    };

    if let Err(e) = persistence.update_record(token, id, text).await {
        warn!("{}", e);
    }
}
