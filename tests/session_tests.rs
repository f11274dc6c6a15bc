// Session controller integration tests over mock capture, transport, and
// persistence collaborators: the full frames → chunks → results → persisted
// text pipeline, acquisition-failure resource release, transport drop
// handling, and the persistence debounce discipline.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use livescribe::audio::{pcm, AudioCapture, AudioFrame, CaptureConfig, CaptureFactory};
use livescribe::error::{CaptureError, PersistenceError, TransportError};
use livescribe::persist::{PersistDebouncer, Persistence};
use livescribe::transport::{ConnectParams, ResultEvent, Transport, TransportFactory};
use livescribe::{SessionConfig, SessionController, SessionState};
use tokio::sync::mpsc;
use tokio::time::sleep;

#[derive(Clone, Copy, PartialEq)]
enum CaptureMode {
    Working,
    Denied,
}

struct MockCapture {
    mode: CaptureMode,
    frame_tx: Arc<Mutex<Option<mpsc::Sender<AudioFrame>>>>,
    stops: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl AudioCapture for MockCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        match self.mode {
            CaptureMode::Denied => Err(CaptureError::DeviceDenied("simulated denial".into())),
            CaptureMode::Working => {
                let (tx, rx) = mpsc::channel(64);
                *self.frame_tx.lock().unwrap() = Some(tx);
                Ok(rx)
            }
        }
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        // Dropping the sender closes the frame channel.
        self.frame_tx.lock().unwrap().take();
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.frame_tx.lock().unwrap().is_some()
    }

    fn name(&self) -> &str {
        "mock-capture"
    }
}

struct MockCaptureFactory {
    mode: CaptureMode,
    frame_tx: Arc<Mutex<Option<mpsc::Sender<AudioFrame>>>>,
    stops: Arc<AtomicUsize>,
}

impl CaptureFactory for MockCaptureFactory {
    fn create(&self, _config: &CaptureConfig) -> Result<Box<dyn AudioCapture>, CaptureError> {
        Ok(Box::new(MockCapture {
            mode: self.mode,
            frame_tx: Arc::clone(&self.frame_tx),
            stops: Arc::clone(&self.stops),
        }))
    }
}

/// Shared view into the mock transport for assertions.
#[derive(Default)]
struct TransportProbe {
    connected: AtomicBool,
    connects: AtomicUsize,
    closes: AtomicUsize,
    sent: Mutex<Vec<Vec<i16>>>,
    result_tx: Mutex<Option<mpsc::Sender<ResultEvent>>>,
}

struct MockTransport {
    probe: Arc<TransportProbe>,
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    fn is_connected(&self) -> bool {
        self.probe.connected.load(Ordering::SeqCst)
    }

    async fn send_audio(&self, chunk: &[i16]) -> Result<(), TransportError> {
        self.probe.sent.lock().unwrap().push(chunk.to_vec());
        Ok(())
    }

    async fn subscribe_results(&self) -> Result<mpsc::Receiver<ResultEvent>, TransportError> {
        let (tx, rx) = mpsc::channel(64);
        *self.probe.result_tx.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
        self.probe.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

struct MockTransportFactory {
    probe: Arc<TransportProbe>,
    fail_connect: bool,
}

#[async_trait::async_trait]
impl TransportFactory for MockTransportFactory {
    async fn connect(&self, _params: ConnectParams) -> Result<Arc<dyn Transport>, TransportError> {
        self.probe.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect {
            return Err(TransportError::ConnectionFailed("simulated refusal".into()));
        }
        self.probe.connected.store(true, Ordering::SeqCst);
        Ok(Arc::new(MockTransport {
            probe: Arc::clone(&self.probe),
        }))
    }
}

#[derive(Default)]
struct MockPersistence {
    creates: AtomicUsize,
    fail_create: AtomicBool,
    updates: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl Persistence for MockPersistence {
    async fn create_record(&self, _token: &str) -> Result<i64, PersistenceError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(PersistenceError::Create("simulated outage".into()));
        }
        Ok(42)
    }

    async fn update_record(
        &self,
        _token: &str,
        record_id: i64,
        text: &str,
    ) -> Result<(), PersistenceError> {
        assert_eq!(record_id, 42);
        self.updates.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

struct Harness {
    controller: SessionController,
    frame_tx: Arc<Mutex<Option<mpsc::Sender<AudioFrame>>>>,
    capture_stops: Arc<AtomicUsize>,
    probe: Arc<TransportProbe>,
    persistence: Arc<MockPersistence>,
}

impl Harness {
    fn new(mode: CaptureMode, fail_connect: bool, config: SessionConfig) -> Self {
        let frame_tx = Arc::new(Mutex::new(None));
        let capture_stops = Arc::new(AtomicUsize::new(0));
        let probe = Arc::new(TransportProbe::default());
        let persistence = Arc::new(MockPersistence::default());

        let controller = SessionController::new(
            config,
            Box::new(MockCaptureFactory {
                mode,
                frame_tx: Arc::clone(&frame_tx),
                stops: Arc::clone(&capture_stops),
            }),
            Box::new(MockTransportFactory {
                probe: Arc::clone(&probe),
                fail_connect,
            }),
            Arc::clone(&persistence) as Arc<dyn Persistence>,
        );

        Self {
            controller,
            frame_tx,
            capture_stops,
            probe,
            persistence,
        }
    }

    fn push_frame(&self, samples: Vec<f32>) {
        let guard = self.frame_tx.lock().unwrap();
        guard
            .as_ref()
            .expect("capture not started")
            .try_send(AudioFrame { samples })
            .expect("frame channel full");
    }

    fn push_result(&self, id: &str, alternatives: &[&str], is_partial: bool) {
        let guard = self.probe.result_tx.lock().unwrap();
        guard
            .as_ref()
            .expect("results not subscribed")
            .try_send(ResultEvent {
                result_id: id.to_string(),
                alternatives: alternatives.iter().map(|s| s.to_string()).collect(),
                is_partial,
            })
            .expect("result channel full");
    }
}

fn fast_config() -> SessionConfig {
    SessionConfig {
        flush_interval: Duration::from_millis(50),
        debounce_quiet: Duration::from_secs(2),
        auth_token: Some("test-token".to_string()),
        ..SessionConfig::default()
    }
}

#[tokio::test]
async fn test_pipeline_frames_to_chunks_to_segments_to_persisted_text() -> Result<()> {
    let h = Harness::new(CaptureMode::Working, false, fast_config());

    h.controller.start().await?;
    assert_eq!(h.controller.state(), SessionState::Recording);

    // Captured audio reaches the transport as one encoded chunk per tick.
    h.push_frame(vec![0.5, 1.0, -1.0]);
    sleep(Duration::from_millis(200)).await;

    let first_chunk = {
        let sent = h.probe.sent.lock().unwrap();
        assert!(!sent.is_empty(), "flush tick should have sent a chunk");
        sent[0].clone()
    };
    assert_eq!(first_chunk, pcm::encode(&[0.5, 1.0, -1.0]));

    // Streaming results reconcile into ordered, revisable segments.
    h.push_result("a", &["hi"], true);
    h.push_result("b", &["yo"], true);
    h.push_result("a", &["hi there"], false);
    sleep(Duration::from_millis(100)).await;

    let segments = h.controller.segments();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].id, "a");
    assert_eq!(segments[0].content, "hi there");
    assert_eq!(segments[1].content, "yo");

    h.controller.stop().await?;
    assert_eq!(h.controller.state(), SessionState::Idle);

    // Stop forced exactly one persist with the final text; the record was
    // created exactly once at start.
    assert_eq!(h.persistence.creates.load(Ordering::SeqCst), 1);
    assert_eq!(
        *h.persistence.updates.lock().unwrap(),
        vec!["hi there yo".to_string()]
    );

    // All resources released exactly once.
    assert_eq!(h.capture_stops.load(Ordering::SeqCst), 1);
    assert_eq!(h.probe.closes.load(Ordering::SeqCst), 1);

    Ok(())
}

#[tokio::test]
async fn test_device_denied_never_records_and_releases_transport() -> Result<()> {
    let h = Harness::new(CaptureMode::Denied, false, fast_config());

    let err = h.controller.start().await.unwrap_err();
    assert!(err.to_string().contains("device-denied"));

    assert_eq!(h.controller.state(), SessionState::Error);
    assert!(h.controller.last_error().unwrap().contains("device-denied"));

    // The transport was acquired, so it must have been released; the capture
    // never held anything.
    assert_eq!(h.probe.connects.load(Ordering::SeqCst), 1);
    assert_eq!(h.probe.closes.load(Ordering::SeqCst), 1);
    assert_eq!(h.capture_stops.load(Ordering::SeqCst), 0);

    Ok(())
}

#[tokio::test]
async fn test_connect_failure_releases_acquired_capture() -> Result<()> {
    let h = Harness::new(CaptureMode::Working, true, fast_config());

    let err = h.controller.start().await.unwrap_err();
    assert!(err.to_string().contains("connection-failed"));
    assert_eq!(h.controller.state(), SessionState::Error);

    // The microphone was acquired concurrently and must be released.
    assert_eq!(h.capture_stops.load(Ordering::SeqCst), 1);
    assert_eq!(h.probe.closes.load(Ordering::SeqCst), 0);

    Ok(())
}

#[tokio::test]
async fn test_missing_token_fails_fast() -> Result<()> {
    let config = SessionConfig {
        auth_token: None,
        ..fast_config()
    };
    let h = Harness::new(CaptureMode::Working, false, config);

    let err = h.controller.start().await.unwrap_err();
    assert!(err.to_string().contains("auth token"));
    assert_eq!(h.controller.state(), SessionState::Error);

    // Nothing was acquired before the token check.
    assert_eq!(h.probe.connects.load(Ordering::SeqCst), 0);

    Ok(())
}

#[tokio::test]
async fn test_start_while_recording_is_a_noop() -> Result<()> {
    let h = Harness::new(CaptureMode::Working, false, fast_config());

    h.controller.start().await?;
    h.controller.start().await?;

    assert_eq!(h.controller.state(), SessionState::Recording);
    assert_eq!(h.probe.connects.load(Ordering::SeqCst), 1);

    h.controller.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_transport_drop_enters_error_and_drops_audio() -> Result<()> {
    let h = Harness::new(CaptureMode::Working, false, fast_config());

    h.controller.start().await?;

    // Simulate the backend connection dropping: the result stream ends and
    // the transport reports itself disconnected.
    h.probe.result_tx.lock().unwrap().take();
    h.probe.connected.store(false, Ordering::SeqCst);
    sleep(Duration::from_millis(100)).await;

    assert_eq!(h.controller.state(), SessionState::Error);
    assert!(h
        .controller
        .last_error()
        .unwrap()
        .contains("connection-failed"));

    // Audio captured after the drop is discarded, not queued.
    h.push_frame(vec![0.25; 128]);
    sleep(Duration::from_millis(150)).await;
    assert!(h.probe.sent.lock().unwrap().is_empty());

    // Stop still releases everything; the error state stays visible.
    h.controller.stop().await?;
    assert_eq!(h.controller.state(), SessionState::Error);
    assert_eq!(h.capture_stops.load(Ordering::SeqCst), 1);
    assert_eq!(h.probe.closes.load(Ordering::SeqCst), 1);

    Ok(())
}

#[tokio::test]
async fn test_stop_when_idle_is_a_noop() -> Result<()> {
    let h = Harness::new(CaptureMode::Working, false, fast_config());
    h.controller.stop().await?;
    assert_eq!(h.controller.state(), SessionState::Idle);
    Ok(())
}

#[tokio::test]
async fn test_debounced_burst_persists_once_with_final_text() -> Result<()> {
    let persistence = Arc::new(MockPersistence::default());
    let debouncer = PersistDebouncer::spawn(
        Arc::clone(&persistence) as Arc<dyn Persistence>,
        "test-token".to_string(),
        Some(42),
        Duration::from_millis(100),
    );

    for i in 1..=5 {
        debouncer.update(format!("text {}", i)).await;
        sleep(Duration::from_millis(10)).await;
    }

    sleep(Duration::from_millis(300)).await;
    assert_eq!(
        *persistence.updates.lock().unwrap(),
        vec!["text 5".to_string()]
    );

    debouncer.shutdown().await;
    // Nothing pending at shutdown, so still exactly one persist.
    assert_eq!(persistence.updates.lock().unwrap().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_forced_flush_mid_burst_persists_exactly_once() -> Result<()> {
    let persistence = Arc::new(MockPersistence::default());
    let debouncer = PersistDebouncer::spawn(
        Arc::clone(&persistence) as Arc<dyn Persistence>,
        "test-token".to_string(),
        Some(42),
        Duration::from_millis(200),
    );

    for i in 1..=5 {
        debouncer.update(format!("text {}", i)).await;
    }
    debouncer.flush("state at stop".to_string()).await;

    assert_eq!(
        *persistence.updates.lock().unwrap(),
        vec!["state at stop".to_string()]
    );

    // The forced flush cleared the pending timer: no trailing persist.
    sleep(Duration::from_millis(400)).await;
    assert_eq!(persistence.updates.lock().unwrap().len(), 1);

    debouncer.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_record_creation_is_retried_until_it_succeeds() -> Result<()> {
    let persistence = Arc::new(MockPersistence::default());
    persistence.fail_create.store(true, Ordering::SeqCst);

    let debouncer = PersistDebouncer::spawn(
        Arc::clone(&persistence) as Arc<dyn Persistence>,
        "test-token".to_string(),
        None,
        Duration::from_millis(50),
    );

    // First persist attempt: creation fails, update is skipped.
    debouncer.update("one".to_string()).await;
    sleep(Duration::from_millis(200)).await;
    assert!(persistence.creates.load(Ordering::SeqCst) >= 1);
    assert!(persistence.updates.lock().unwrap().is_empty());

    // Collaborator recovers: the next cycle creates the record and persists.
    persistence.fail_create.store(false, Ordering::SeqCst);
    debouncer.update("two".to_string()).await;
    sleep(Duration::from_millis(200)).await;
    assert_eq!(
        *persistence.updates.lock().unwrap(),
        vec!["two".to_string()]
    );

    debouncer.shutdown().await;
    Ok(())
}
