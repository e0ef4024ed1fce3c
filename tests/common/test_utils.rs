use super::mocks::{FakeCamera, MockLlmClient};
use image::{ImageFormat, Rgb, RgbImage};
use plant_pal::{
    capture::CaptureSession,
    config::{Config, LlmConfig},
    controller::SessionRegistry,
    diagnosis::Diagnoser,
    preferences::{PreferenceStorage, Theme, ThemePreference},
    server::handlers::AppState,
};
use serde_json::{Value, json};
use std::{io::Cursor, sync::Arc};
use tokio::sync::Mutex;

/// Test configuration pointing the model client at `base_url`.
pub fn create_test_config(base_url: &str) -> Config {
    Config {
        llm: LlmConfig {
            base_url: base_url.to_string(),
            api_key: "test-api-key".to_string(),
            timeout_secs: 5,
            ..LlmConfig::default()
        },
        ..Config::default()
    }
}

/// A schema-conforming diagnosis as the model would return it.
pub fn sample_report_json() -> Value {
    json!({
        "possibleDiseases": [
            {
                "diseaseName": "Septoria Leaf Spot",
                "description": "Fungal spots with dark borders on lower leaves.",
                "remedies": ["Remove infected leaves", "Apply copper fungicide"],
                "prevention": ["Avoid overhead watering", "Mulch around the base"]
            },
            {
                "diseaseName": "Early Blight",
                "description": "Concentric brown rings on older foliage.",
                "remedies": ["Prune affected foliage"],
                "prevention": ["Rotate crops yearly"]
            }
        ],
        "summary": "This looks like a common leaf spot problem. With a little care your plant should recover!"
    })
}

/// Raw `generateContent` reply wrapping `text`.
pub fn gemini_reply(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 120, "candidatesTokenCount": 80, "totalTokenCount": 200}
    })
}

pub fn sample_png() -> Vec<u8> {
    let img = RgbImage::from_pixel(10, 10, Rgb([20, 120, 40]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

pub struct TestApp {
    pub state: AppState,
    pub llm: Arc<MockLlmClient>,
    pub camera: Arc<FakeCamera>,
}

/// Application state backed by mocks and an in-memory preference store.
pub async fn create_test_state(llm: MockLlmClient, system_theme: Option<Theme>) -> TestApp {
    let llm = Arc::new(llm);
    let camera = Arc::new(FakeCamera::default());
    let storage = PreferenceStorage::new(":memory:").await.unwrap();

    let state = AppState {
        sessions: Arc::new(SessionRegistry::new()),
        diagnoser: Arc::new(Diagnoser::new(llm.clone())),
        camera: Arc::new(Mutex::new(CaptureSession::new(camera.clone()))),
        theme: Arc::new(ThemePreference::new(storage, system_theme)),
    };

    TestApp { state, llm, camera }
}
