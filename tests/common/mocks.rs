use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use plant_pal::{
    Error, Result,
    capture::{CameraBackend, StreamConstraints, VideoStream},
    llm::{Candidate, Content, GenerateContentRequest, GenerateContentResponse, LlmClient, Part},
};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

/// Mock model client: replays queued replies and records every request.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    pub responses: Arc<Mutex<Vec<GenerateContentResponse>>>,
    pub requests: Arc<Mutex<Vec<GenerateContentRequest>>>,
    pub error: Option<String>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text_response(self, text: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push(create_text_response(text));
        self
    }

    pub fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }

    pub fn get_requests(&self) -> Vec<GenerateContentRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn generate_content(
        &self,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        self.requests.lock().unwrap().push(request);

        if let Some(ref error) = self.error {
            return Err(Error::Api {
                status: 503,
                body: error.clone(),
            });
        }

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(Error::internal("No more mock responses available"));
        }

        Ok(responses.remove(0))
    }
}

/// Model client whose calls never return.
#[derive(Debug, Default)]
pub struct HangingLlmClient {
    calls: AtomicUsize,
}

impl HangingLlmClient {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for HangingLlmClient {
    async fn generate_content(
        &self,
        _request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

pub fn create_text_response(text: &str) -> GenerateContentResponse {
    GenerateContentResponse {
        candidates: vec![Candidate {
            content: Some(Content {
                role: Some("model".to_string()),
                parts: vec![Part::text(text)],
            }),
            finish_reason: Some("STOP".to_string()),
        }],
        usage_metadata: None,
    }
}

/// Camera double that counts live streams.
#[derive(Default)]
pub struct FakeCamera {
    pub live: Arc<AtomicUsize>,
    pub opened: AtomicUsize,
    pub deny: Mutex<bool>,
}

impl FakeCamera {
    pub fn live_streams(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn deny_permission(&self, deny: bool) {
        *self.deny.lock().unwrap() = deny;
    }
}

#[async_trait]
impl CameraBackend for FakeCamera {
    async fn open(&self, constraints: &StreamConstraints) -> Result<Box<dyn VideoStream>> {
        assert!(!constraints.audio, "camera must be opened without audio");
        if *self.deny.lock().unwrap() {
            return Err(Error::permission_denied("user dismissed the prompt"));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeStream {
            live: Arc::clone(&self.live),
            stopped: false,
        }))
    }
}

struct FakeStream {
    live: Arc<AtomicUsize>,
    stopped: bool,
}

#[async_trait]
impl VideoStream for FakeStream {
    async fn grab_frame(&mut self) -> Result<DynamicImage> {
        Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            32,
            24,
            Rgb([40, 160, 60]),
        )))
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
