use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("Camera permission denied: {0}")]
    PermissionDenied(String),

    #[error("Camera unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Camera is not streaming")]
    CaptureNotStreaming,

    #[error("Unreadable image: {0}")]
    UnreadableImage(String),

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("A diagnosis is already in progress")]
    SubmissionInProgress,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Model API error: {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Address parse error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    #[error("Invalid state transition: {current} -> {requested}")]
    InvalidTransition { current: String, requested: String },

    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn device_unavailable(msg: impl Into<String>) -> Self {
        Self::DeviceUnavailable(msg.into())
    }

    pub fn unreadable_image(msg: impl Into<String>) -> Self {
        Self::UnreadableImage(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for failures of the outbound model call (transport or reply).
    pub fn is_diagnosis_failure(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::Api { .. }
                | Self::EmptyResponse
                | Self::MalformedResponse(_)
                | Self::UnreadableImage(_)
        )
    }
}
