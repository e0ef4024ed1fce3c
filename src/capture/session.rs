use super::device::{CameraBackend, StreamConstraints, VideoStream};
use crate::{Error, Result};
use image::{DynamicImage, codecs::jpeg::JpegEncoder};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// JPEG quality used for captured stills.
pub const CAPTURE_JPEG_QUALITY: u8 = 95;

const PERMISSION_MESSAGE: &str = "Could not access the camera. Please check permissions and try again. You may need to grant permission in your device settings.";
const UNAVAILABLE_MESSAGE: &str =
    "No camera could be opened. Check that a camera is connected and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    Idle,
    Requesting,
    Streaming,
    Captured,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEvent {
    Open,
    StreamStarted,
    OpenFailed,
    FrameCaptured,
    Close,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaptureStatus {
    pub state: CaptureState,
    pub error: Option<String>,
}

/// Owns the camera stream for the lifetime of the capture view. At most one
/// stream is held; every exit path goes through [`CaptureSession::close`] or
/// `Drop`.
pub struct CaptureSession {
    backend: Arc<dyn CameraBackend>,
    constraints: StreamConstraints,
    state: CaptureState,
    stream: Option<Box<dyn VideoStream>>,
    last_error: Option<String>,
    attempt: u64,
}

/// A camera request in progress, detached from the session lock.
pub struct PendingOpen {
    attempt: u64,
    backend: Arc<dyn CameraBackend>,
    constraints: StreamConstraints,
}

impl PendingOpen {
    pub async fn acquire(&self) -> Result<Box<dyn VideoStream>> {
        self.backend.open(&self.constraints).await
    }
}

impl CaptureSession {
    pub fn new(backend: Arc<dyn CameraBackend>) -> Self {
        Self::with_constraints(backend, StreamConstraints::environment_video())
    }

    pub fn with_constraints(backend: Arc<dyn CameraBackend>, constraints: StreamConstraints) -> Self {
        Self {
            backend,
            constraints,
            state: CaptureState::Idle,
            stream: None,
            last_error: None,
            attempt: 0,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn status(&self) -> CaptureStatus {
        CaptureStatus {
            state: self.state,
            error: self.last_error.clone(),
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.state == CaptureState::Streaming && self.stream.is_some()
    }

    fn transition(&mut self, event: CaptureEvent) -> Result<()> {
        use CaptureEvent as E;
        use CaptureState as S;

        let new_state = match (self.state, event) {
            (S::Idle | S::Requesting | S::Captured | S::Closed, E::Open) => S::Requesting,
            (S::Requesting, E::StreamStarted) => S::Streaming,
            (S::Requesting, E::OpenFailed) => S::Idle,
            (S::Streaming, E::FrameCaptured) => S::Captured,
            (S::Requesting | S::Streaming, E::Close) => S::Closed,
            (state, E::Close) => state,
            (state, event) => {
                warn!("Invalid capture transition from {:?} with {:?}", state, event);
                return Err(Error::InvalidTransition {
                    current: format!("{state:?}"),
                    requested: format!("{event:?}"),
                });
            }
        };

        if new_state != self.state {
            debug!(
                "Capture state transition: {:?} -> {:?} (event: {:?})",
                self.state, new_state, event
            );
        }
        self.state = new_state;
        Ok(())
    }

    /// Requests the camera. Opening while a stream is live replaces it.
    pub async fn open(&mut self) -> Result<()> {
        let pending = self.begin_open()?;
        let result = pending.acquire().await;
        self.finish_open(pending, result)
    }

    /// Opens the camera without holding `session` locked while the backend
    /// is acquiring the stream, so a `close` in the meantime takes effect
    /// immediately.
    pub async fn open_shared(session: &Mutex<Self>) -> Result<()> {
        let pending = session.lock().await.begin_open()?;
        let result = pending.acquire().await;
        session.lock().await.finish_open(pending, result)
    }

    /// Releases any live stream and enters `Requesting`.
    pub fn begin_open(&mut self) -> Result<PendingOpen> {
        if self.stream.is_some() {
            info!("Camera already streaming, releasing previous stream");
            self.close();
        }

        self.transition(CaptureEvent::Open)?;
        self.last_error = None;
        self.attempt += 1;

        Ok(PendingOpen {
            attempt: self.attempt,
            backend: Arc::clone(&self.backend),
            constraints: self.constraints,
        })
    }

    /// Settles an open started by [`CaptureSession::begin_open`]. A stream
    /// that arrives after the request was closed or replaced is stopped
    /// straight away.
    pub fn finish_open(
        &mut self,
        pending: PendingOpen,
        result: Result<Box<dyn VideoStream>>,
    ) -> Result<()> {
        if pending.attempt != self.attempt || self.state != CaptureState::Requesting {
            info!(
                "Camera request {} superseded, now {:?}",
                pending.attempt, self.state
            );
            if let Ok(mut stream) = result {
                stream.stop();
            }
            return Ok(());
        }

        match result {
            Ok(stream) => {
                self.stream = Some(stream);
                self.transition(CaptureEvent::StreamStarted)?;
                info!("Camera stream started ({} facing)", self.constraints.facing);
                Ok(())
            }
            Err(e) => {
                warn!("Error accessing camera: {}", e);
                self.last_error = Some(user_message(&e).to_string());
                self.transition(CaptureEvent::OpenFailed)?;
                Err(e)
            }
        }
    }

    /// Grabs a still as JPEG and releases the stream.
    pub async fn capture(&mut self) -> Result<Vec<u8>> {
        if self.state != CaptureState::Streaming {
            return Err(Error::CaptureNotStreaming);
        }
        let stream = self.stream.as_mut().ok_or(Error::CaptureNotStreaming)?;

        let frame = stream.grab_frame().await?;
        let bytes = encode_jpeg(&frame)?;

        self.transition(CaptureEvent::FrameCaptured)?;
        self.release();
        info!("Captured {} byte still", bytes.len());

        Ok(bytes)
    }

    /// Idempotent; always releases the stream and cancels a pending open.
    pub fn close(&mut self) {
        self.attempt += 1;
        self.release();
        // Close is accepted from every state.
        let _ = self.transition(CaptureEvent::Close);
    }

    fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            debug!("Camera stream stopped");
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release();
    }
}

pub fn encode_jpeg(frame: &DynamicImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let rgb = DynamicImage::ImageRgb8(frame.to_rgb8());
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, CAPTURE_JPEG_QUALITY))?;
    Ok(bytes)
}

fn user_message(error: &Error) -> &'static str {
    match error {
        Error::PermissionDenied(_) => PERMISSION_MESSAGE,
        _ => UNAVAILABLE_MESSAGE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::{MediaType, image as normalizer};
    use async_trait::async_trait;
    use image::RgbImage;
    use pretty_assertions::assert_eq;
    use std::{
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };
    use tokio::sync::{Mutex as AsyncMutex, Notify};

    #[derive(Default)]
    struct FakeCamera {
        live: Arc<AtomicUsize>,
        opened: AtomicUsize,
        failure: Mutex<Option<Error>>,
        gate: Mutex<Option<Arc<Notify>>>,
        waiting: AtomicUsize,
    }

    struct FakeStream {
        live: Arc<AtomicUsize>,
        stopped: bool,
    }

    #[async_trait]
    impl CameraBackend for FakeCamera {
        async fn open(&self, _constraints: &StreamConstraints) -> Result<Box<dyn VideoStream>> {
            let gate = self.gate.lock().unwrap().clone();
            if let Some(gate) = gate {
                self.waiting.fetch_add(1, Ordering::SeqCst);
                gate.notified().await;
            }
            if let Some(err) = self.failure.lock().unwrap().take() {
                return Err(err);
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            self.live.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeStream {
                live: Arc::clone(&self.live),
                stopped: false,
            }))
        }
    }

    #[async_trait]
    impl VideoStream for FakeStream {
        async fn grab_frame(&mut self) -> Result<DynamicImage> {
            Ok(DynamicImage::ImageRgb8(RgbImage::new(16, 12)))
        }

        fn stop(&mut self) {
            if !self.stopped {
                self.stopped = true;
                self.live.fetch_sub(1, Ordering::SeqCst);
            }
        }

        fn is_live(&self) -> bool {
            !self.stopped
        }
    }

    fn session() -> (CaptureSession, Arc<FakeCamera>) {
        let camera = Arc::new(FakeCamera::default());
        (CaptureSession::new(camera.clone()), camera)
    }

    #[tokio::test]
    async fn test_open_then_capture() {
        let (mut session, camera) = session();
        assert_eq!(session.state(), CaptureState::Idle);

        session.open().await.unwrap();
        assert_eq!(session.state(), CaptureState::Streaming);
        assert_eq!(camera.live.load(Ordering::SeqCst), 1);

        let bytes = session.capture().await.unwrap();
        assert_eq!(session.state(), CaptureState::Captured);
        assert_eq!(camera.live.load(Ordering::SeqCst), 0);

        let payload = normalizer::encode(&bytes).unwrap();
        assert_eq!(payload.mime_type, MediaType::Jpeg);
        assert_eq!(normalizer::decode(&payload).unwrap(), bytes);
    }

    #[tokio::test]
    async fn test_second_open_replaces_stream() {
        let (mut session, camera) = session();

        session.open().await.unwrap();
        session.open().await.unwrap();

        assert_eq!(camera.opened.load(Ordering::SeqCst), 2);
        assert_eq!(camera.live.load(Ordering::SeqCst), 1);
        assert_eq!(session.state(), CaptureState::Streaming);
    }

    #[tokio::test]
    async fn test_capture_requires_streaming() {
        let (mut session, _camera) = session();
        assert!(matches!(
            session.capture().await,
            Err(Error::CaptureNotStreaming)
        ));

        session.open().await.unwrap();
        session.close();
        assert!(matches!(
            session.capture().await,
            Err(Error::CaptureNotStreaming)
        ));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (mut session, camera) = session();
        session.open().await.unwrap();

        session.close();
        session.close();
        assert_eq!(session.state(), CaptureState::Closed);
        assert_eq!(camera.live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_drop_releases_stream() {
        let (mut session, camera) = session();
        session.open().await.unwrap();
        assert_eq!(camera.live.load(Ordering::SeqCst), 1);

        drop(session);
        assert_eq!(camera.live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_permission_denied_returns_to_idle() {
        let (mut session, camera) = session();
        *camera.failure.lock().unwrap() = Some(Error::permission_denied("denied"));

        let result = session.open().await;
        assert!(matches!(result, Err(Error::PermissionDenied(_))));
        assert_eq!(session.state(), CaptureState::Idle);
        assert_eq!(session.last_error(), Some(PERMISSION_MESSAGE));
        assert_eq!(camera.live.load(Ordering::SeqCst), 0);

        // Retry after the user grants access.
        session.open().await.unwrap();
        assert_eq!(session.state(), CaptureState::Streaming);
        assert_eq!(session.last_error(), None);
    }

    #[tokio::test]
    async fn test_device_unavailable_message() {
        let (mut session, camera) = session();
        *camera.failure.lock().unwrap() = Some(Error::device_unavailable("no camera"));

        assert!(session.open().await.is_err());
        assert_eq!(session.status().error.as_deref(), Some(UNAVAILABLE_MESSAGE));
    }

    #[test]
    fn test_encode_jpeg_quality_output() {
        let frame = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let bytes = encode_jpeg(&frame).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn test_close_is_not_blocked_by_pending_open() {
        let camera = Arc::new(FakeCamera::default());
        let gate = Arc::new(Notify::new());
        *camera.gate.lock().unwrap() = Some(Arc::clone(&gate));
        let session = Arc::new(AsyncMutex::new(CaptureSession::new(camera.clone())));

        let opening = tokio::spawn({
            let session = Arc::clone(&session);
            async move { CaptureSession::open_shared(&session).await }
        });
        while camera.waiting.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        {
            let mut locked = tokio::time::timeout(Duration::from_millis(200), session.lock())
                .await
                .expect("session stays locked while the camera opens");
            assert_eq!(locked.state(), CaptureState::Requesting);
            locked.close();
            assert_eq!(locked.state(), CaptureState::Closed);
        }

        gate.notify_one();
        opening.await.unwrap().unwrap();

        let session = session.lock().await;
        assert_eq!(session.state(), CaptureState::Closed);
        assert!(!session.is_streaming());
        assert_eq!(camera.opened.load(Ordering::SeqCst), 1);
        assert_eq!(camera.live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_open_shared_streams_when_uncontended() {
        let (session, camera) = session();
        let session = AsyncMutex::new(session);

        CaptureSession::open_shared(&session).await.unwrap();
        assert!(session.lock().await.is_streaming());
        assert_eq!(camera.live.load(Ordering::SeqCst), 1);
    }
}
