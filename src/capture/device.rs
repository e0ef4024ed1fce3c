use crate::Result;
use async_trait::async_trait;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which way the requested camera faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    /// Rear camera, pointed away from the user.
    #[default]
    Environment,
    User,
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Environment => f.write_str("environment"),
            Self::User => f.write_str("user"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConstraints {
    pub facing: Facing,
    pub audio: bool,
}

impl StreamConstraints {
    /// Rear camera, video only.
    pub fn environment_video() -> Self {
        Self {
            facing: Facing::Environment,
            audio: false,
        }
    }
}

#[async_trait]
pub trait CameraBackend: Send + Sync {
    /// Acquires a live stream. Fails with `PermissionDenied` or
    /// `DeviceUnavailable`.
    async fn open(&self, constraints: &StreamConstraints) -> Result<Box<dyn VideoStream>>;
}

#[async_trait]
pub trait VideoStream: Send + Sync {
    async fn grab_frame(&mut self) -> Result<DynamicImage>;

    /// Releases the hardware. Must be safe to call more than once.
    fn stop(&mut self);

    fn is_live(&self) -> bool;
}
