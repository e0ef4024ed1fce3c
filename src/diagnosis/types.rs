use serde::{Deserialize, Serialize};
use std::fmt;

/// Image media types accepted from uploads and produced by the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/webp")]
    Webp,
}

impl MediaType {
    pub const ACCEPTED: [MediaType; 3] = [MediaType::Png, MediaType::Jpeg, MediaType::Webp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }

    /// One of [`MediaType::ACCEPTED`], matched case-insensitively.
    /// `image/jpg` is taken as JPEG.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        let mime = if mime == "image/jpg" { "image/jpeg" } else { mime.as_str() };
        Self::ACCEPTED
            .into_iter()
            .find(|accepted| accepted.as_str() == mime)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base64 image ready to embed in a request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub data: String,
    pub mime_type: MediaType,
}

/// Snapshot of the user's inputs for one diagnosis attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct SymptomRequest {
    pub description: String,
    pub plant_type: Option<String>,
    pub image: Option<ImagePayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisReport {
    pub possible_diseases: Vec<DiseaseInfo>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiseaseInfo {
    pub disease_name: String,
    pub description: String,
    pub remedies: Vec<String>,
    pub prevention: Vec<String>,
}

impl SymptomRequest {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            plant_type: None,
            image: None,
        }
    }

    pub fn with_plant_type(mut self, plant_type: impl Into<String>) -> Self {
        self.plant_type = Some(plant_type.into());
        self
    }

    pub fn with_image(mut self, image: ImagePayload) -> Self {
        self.image = Some(image);
        self
    }

    pub fn has_description(&self) -> bool {
        !self.description.trim().is_empty()
    }
}
