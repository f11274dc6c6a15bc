use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::SessionConfig;
use super::flush;
use super::state::SessionState;
use crate::audio::{CaptureBuffer, CaptureFactory};
use crate::error::{SessionError, TransportError};
use crate::persist::{PersistDebouncer, Persistence};
use crate::transcript::{TranscriptReconciler, TranscriptSegment};
use crate::transport::{ConnectParams, Transport, TransportFactory};

/// Top-level coordinator for one recording session at a time.
///
/// `start()` acquires the transport and the microphone concurrently and wires
/// up the capture, flush, and result tasks; `stop()` tears everything down on
/// a single path, flushing remaining audio and forcing persistence before
/// declaring the session over. Failures during acquisition release whatever
/// was acquired and park the controller in `Error` until the next `start()`.
pub struct SessionController {
    config: SessionConfig,
    capture_factory: Box<dyn CaptureFactory>,
    transport_factory: Box<dyn TransportFactory>,
    persistence: Arc<dyn Persistence>,

    shared: Arc<StdMutex<Shared>>,

    /// True from successful start until stop is requested; gates the result
    /// task's drop detection and keeps tasks from outliving the session.
    active: Arc<AtomicBool>,

    reconciler: Arc<StdMutex<TranscriptReconciler>>,

    /// Live resources of the current session. `Option::take` in `stop()`
    /// guarantees teardown runs exactly once.
    inner: Mutex<Option<ActiveSession>>,
}

#[derive(Debug)]
struct Shared {
    state: SessionState,
    last_error: Option<String>,
}

struct ActiveSession {
    capture: Box<dyn crate::audio::AudioCapture>,
    transport: Arc<dyn Transport>,
    buffer: Arc<CaptureBuffer>,
    debouncer: PersistDebouncer,
    shutdown_tx: watch::Sender<bool>,
    capture_task: JoinHandle<()>,
    flush_task: JoinHandle<()>,
    result_task: JoinHandle<()>,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        capture_factory: Box<dyn CaptureFactory>,
        transport_factory: Box<dyn TransportFactory>,
        persistence: Arc<dyn Persistence>,
    ) -> Self {
        Self {
            config,
            capture_factory,
            transport_factory,
            persistence,
            shared: Arc::new(StdMutex::new(Shared {
                state: SessionState::Idle,
                last_error: None,
            })),
            active: Arc::new(AtomicBool::new(false)),
            reconciler: Arc::new(StdMutex::new(TranscriptReconciler::new())),
            inner: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock().expect("session state lock poisoned").state
    }

    pub fn last_error(&self) -> Option<String> {
        self.shared
            .lock()
            .expect("session state lock poisoned")
            .last_error
            .clone()
    }

    /// Current transcript segments, in first-appearance order.
    pub fn segments(&self) -> Vec<TranscriptSegment> {
        self.reconciler
            .lock()
            .expect("reconciler lock poisoned")
            .segments()
            .to_vec()
    }

    /// Paragraph view of the current transcript.
    pub fn paragraphs(&self) -> Vec<String> {
        self.reconciler
            .lock()
            .expect("reconciler lock poisoned")
            .paragraphs()
    }

    /// Start a recording session. A no-op if one is already active.
    pub async fn start(&self) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.is_some() {
            warn!("Recording already active; ignoring start");
            return Ok(());
        }

        self.set_state(SessionState::Starting, None);

        let token = match self.config.auth_token.as_deref() {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => return Err(self.fail(SessionError::MissingToken)),
        };

        self.reconciler
            .lock()
            .expect("reconciler lock poisoned")
            .clear();

        // Acquire the transport and the microphone concurrently; both must
        // succeed to reach Recording.
        let params = ConnectParams {
            token: token.clone(),
            sample_rate: self.config.sample_rate,
            chunk_size: self.config.chunk_size,
        };

        let connect_fut = self.transport_factory.connect(params);
        let capture_fut = async {
            let mut capture = self.capture_factory.create(&self.config.capture_config())?;
            let frames = capture.start().await?;
            Ok::<_, crate::error::CaptureError>((capture, frames))
        };

        let (transport_res, capture_res) = tokio::join!(connect_fut, capture_fut);

        let (transport, mut capture, frames_rx) = match (transport_res, capture_res) {
            (Ok(transport), Ok((capture, frames))) => (transport, capture, frames),
            (Ok(transport), Err(e)) => {
                if let Err(close_err) = transport.close().await {
                    warn!("Failed to release transport after capture failure: {}", close_err);
                }
                return Err(self.fail(e.into()));
            }
            (Err(e), Ok((mut capture, _frames))) => {
                if let Err(stop_err) = capture.stop().await {
                    warn!("Failed to release capture after connect failure: {}", stop_err);
                }
                return Err(self.fail(e.into()));
            }
            (Err(transport_err), Err(capture_err)) => {
                warn!("Capture also failed during aborted start: {}", capture_err);
                return Err(self.fail(transport_err.into()));
            }
        };

        let results_rx = match transport.subscribe_results().await {
            Ok(rx) => rx,
            Err(e) => {
                if let Err(close_err) = transport.close().await {
                    warn!("Failed to release transport: {}", close_err);
                }
                if let Err(stop_err) = capture.stop().await {
                    warn!("Failed to release capture: {}", stop_err);
                }
                return Err(self.fail(e.into()));
            }
        };

        info!("Recording starting (capture backend: {})", capture.name());

        // The durable record exists once per session. Creation failure is
        // tolerated here; the debouncer retries until it succeeds.
        let record_id = match self.persistence.create_record(&token).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("{}; will retry on next persist", e);
                None
            }
        };

        let debouncer = PersistDebouncer::spawn(
            Arc::clone(&self.persistence),
            token,
            record_id,
            self.config.debounce_quiet,
        );

        let buffer = Arc::new(CaptureBuffer::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.active.store(true, Ordering::SeqCst);

        // Capture task: move frames from the backend into the buffer. Ends
        // when the backend stops and the frame channel closes.
        let capture_task = {
            let buffer = Arc::clone(&buffer);
            let mut frames_rx = frames_rx;
            tokio::spawn(async move {
                while let Some(frame) = frames_rx.recv().await {
                    buffer.append(frame);
                }
                debug!("Capture task stopped");
            })
        };

        let flush_task = tokio::spawn(flush::run_flush_loop(
            Arc::clone(&buffer),
            Arc::clone(&transport),
            self.config.flush_interval,
            shutdown_rx.clone(),
        ));

        // Result task: apply each inbound event to the reconciler and report
        // the new transcript state to the debouncer. A closed result channel
        // while still active means the transport dropped.
        let result_task = {
            let reconciler = Arc::clone(&self.reconciler);
            let shared = Arc::clone(&self.shared);
            let active = Arc::clone(&self.active);
            let debounce = debouncer.sender();
            let mut results_rx = results_rx;
            let mut shutdown_rx = shutdown_rx;
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = shutdown_rx.changed() => break,
                        event = results_rx.recv() => match event {
                            Some(event) => {
                                let text = {
                                    let mut rec =
                                        reconciler.lock().expect("reconciler lock poisoned");
                                    rec.apply(event);
                                    rec.full_text()
                                };
                                debounce.update(text).await;
                            }
                            None => {
                                if active.load(Ordering::SeqCst) {
                                    let reason = TransportError::ConnectionDropped.to_string();
                                    warn!("{}; audio is discarded until stop", reason);
                                    let mut shared =
                                        shared.lock().expect("session state lock poisoned");
                                    shared.state = SessionState::Error;
                                    shared.last_error = Some(reason);
                                }
                                break;
                            }
                        }
                    }
                }
                debug!("Result task stopped");
            })
        };

        *inner = Some(ActiveSession {
            capture,
            transport,
            buffer,
            debouncer,
            shutdown_tx,
            capture_task,
            flush_task,
            result_task,
        });

        self.set_state(SessionState::Recording, None);
        info!("Recording session started");

        Ok(())
    }

    /// Stop the session: release the microphone, flush remaining audio,
    /// shut down the tasks, close the transport, and force persistence.
    /// Safe to call when idle.
    pub async fn stop(&self) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        let Some(session) = inner.take() else {
            warn!("No active session; ignoring stop");
            return Ok(());
        };

        // A transport drop parks the session in Error; stop still releases
        // everything but leaves that state visible afterwards.
        let had_error = self.state() == SessionState::Error;

        self.set_state(SessionState::Stopping, self.last_error());
        self.active.store(false, Ordering::SeqCst);

        let ActiveSession {
            mut capture,
            transport,
            buffer,
            debouncer,
            shutdown_tx,
            capture_task,
            flush_task,
            result_task,
        } = session;

        info!("Stopping recording session");

        // Release the microphone first so no new frames arrive, then let the
        // capture task drain out.
        if let Err(e) = capture.stop().await {
            warn!("Failed to stop capture: {}", e);
        }
        if let Err(e) = capture_task.await {
            warn!("Capture task panicked: {}", e);
        }

        // Remaining audio is flushed before the transport goes away.
        flush::flush_once(&buffer, transport.as_ref()).await;

        // Stop the periodic tasks; an in-flight send completes first.
        let _ = shutdown_tx.send(true);
        if let Err(e) = flush_task.await {
            warn!("Flush task panicked: {}", e);
        }
        if let Err(e) = result_task.await {
            warn!("Result task panicked: {}", e);
        }

        if let Err(e) = transport.close().await {
            warn!("Failed to close transport: {}", e);
        }

        // Forced persist of the final transcript, bypassing the debounce
        // window, then let the debouncer wind down.
        let final_text = self
            .reconciler
            .lock()
            .expect("reconciler lock poisoned")
            .full_text();
        debouncer.flush(final_text).await;
        debouncer.shutdown().await;

        if had_error {
            self.set_state(SessionState::Error, self.last_error());
        } else {
            self.set_state(SessionState::Idle, self.last_error());
        }

        info!("Recording session stopped");
        Ok(())
    }

    fn set_state(&self, state: SessionState, last_error: Option<String>) {
        let mut shared = self.shared.lock().expect("session state lock poisoned");
        shared.state = state;
        shared.last_error = last_error;
    }

    /// Record a start failure: remember the reason, park in `Error`.
    fn fail(&self, err: SessionError) -> SessionError {
        self.set_state(SessionState::Error, Some(err.to_string()));
        err
    }
}
