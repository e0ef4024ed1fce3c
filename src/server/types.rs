use crate::{
    capture::CaptureStatus,
    controller::{Outcome, SessionView},
    diagnosis::ImagePayload,
    preferences::Theme,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct UploadedImage {
    /// Base64, optionally as a `data:` URL.
    pub data: String,
    pub mime_type: String,
}

#[derive(Debug, Deserialize)]
pub struct DiagnoseRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub plant_type: Option<String>,
    /// Absent keeps the session's current image.
    #[serde(default)]
    pub image: Option<UploadedImage>,
}

#[derive(Debug, Serialize)]
pub struct DiagnoseResponse {
    pub session_id: String,
    pub outcome: Outcome,
    pub session: SessionView,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub session: SessionView,
}

#[derive(Debug, Serialize)]
pub struct PlantTypesResponse {
    pub plant_types: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct CaptureResponse {
    pub image: ImagePayload,
    pub camera: CaptureStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ThemeBody {
    pub theme: Theme,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
