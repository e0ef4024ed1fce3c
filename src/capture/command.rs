use super::device::{CameraBackend, Facing, StreamConstraints, VideoStream};
use crate::{Error, Result, config::CameraConfig};
use async_trait::async_trait;
use image::DynamicImage;
use std::{io::ErrorKind, path::PathBuf};
use tokio::{fs::File, process::Command};
use tracing::{debug, warn};

/// Camera backed by a device node and an external frame-grab command.
///
/// The device node is held open while the stream is live; each frame is
/// produced by running the grab command, which must write one encoded image
/// to stdout.
pub struct CommandCamera {
    device: PathBuf,
    facing: Facing,
    grab_command: Vec<String>,
}

impl CommandCamera {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            device: PathBuf::from(&config.device),
            facing: config.facing,
            grab_command: config.grab_command.clone(),
        }
    }
}

#[async_trait]
impl CameraBackend for CommandCamera {
    async fn open(&self, constraints: &StreamConstraints) -> Result<Box<dyn VideoStream>> {
        if constraints.facing != self.facing {
            return Err(Error::device_unavailable(format!(
                "no {} facing camera configured",
                constraints.facing
            )));
        }
        if constraints.audio {
            warn!("Audio capture requested but not supported, ignoring");
        }

        let handle = File::open(&self.device).await.map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => {
                Error::permission_denied(format!("{}: {}", self.device.display(), e))
            }
            _ => Error::device_unavailable(format!("{}: {}", self.device.display(), e)),
        })?;

        debug!("Opened camera device {}", self.device.display());

        let device = self.device.to_string_lossy();
        let args = self
            .grab_command
            .iter()
            .map(|arg| arg.replace("{device}", &device))
            .collect();

        Ok(Box::new(CommandStream {
            handle: Some(handle),
            args,
        }))
    }
}

struct CommandStream {
    handle: Option<File>,
    args: Vec<String>,
}

#[async_trait]
impl VideoStream for CommandStream {
    async fn grab_frame(&mut self) -> Result<DynamicImage> {
        if self.handle.is_none() {
            return Err(Error::CaptureNotStreaming);
        }
        let (program, args) = self
            .args
            .split_first()
            .ok_or_else(|| Error::config("camera.grab_command must not be empty"))?;

        let output = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::device_unavailable(format!("failed to run {program}: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::device_unavailable(format!(
                "{program} exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        image::load_from_memory(&output.stdout)
            .map_err(|e| Error::unreadable_image(format!("camera frame: {e}")))
    }

    fn stop(&mut self) {
        self.handle.take();
    }

    fn is_live(&self) -> bool {
        self.handle.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn camera_config(dir: &TempDir, grab_command: Vec<String>) -> CameraConfig {
        let device = dir.path().join("video0");
        std::fs::write(&device, b"").unwrap();
        CameraConfig {
            device: device.to_string_lossy().to_string(),
            facing: Facing::Environment,
            grab_command,
        }
    }

    fn write_frame(dir: &TempDir) -> String {
        let path = dir.path().join("frame.png");
        RgbImage::new(6, 4)
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();
        path.to_string_lossy().to_string()
    }

    #[tokio::test]
    async fn test_grab_frame_from_command() {
        let dir = TempDir::new().unwrap();
        let frame = write_frame(&dir);
        let camera = CommandCamera::new(&camera_config(&dir, vec!["cat".to_string(), frame]));

        let mut stream = camera
            .open(&StreamConstraints::environment_video())
            .await
            .unwrap();
        assert!(stream.is_live());

        let image = stream.grab_frame().await.unwrap();
        assert_eq!((image.width(), image.height()), (6, 4));

        stream.stop();
        stream.stop();
        assert!(!stream.is_live());
        assert!(matches!(
            stream.grab_frame().await,
            Err(Error::CaptureNotStreaming)
        ));
    }

    #[tokio::test]
    async fn test_device_placeholder_substitution() {
        let dir = TempDir::new().unwrap();
        let frame = write_frame(&dir);
        let mut config = camera_config(&dir, vec![]);
        // The device file itself is the frame source here.
        std::fs::copy(&frame, &config.device).unwrap();
        config.grab_command = vec!["cat".to_string(), "{device}".to_string()];

        let camera = CommandCamera::new(&config);
        let mut stream = camera
            .open(&StreamConstraints::environment_video())
            .await
            .unwrap();
        assert!(stream.grab_frame().await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_device_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let mut config = camera_config(&dir, vec!["true".to_string()]);
        config.device = dir.path().join("missing").to_string_lossy().to_string();

        let result = CommandCamera::new(&config)
            .open(&StreamConstraints::environment_video())
            .await;
        assert!(matches!(result, Err(Error::DeviceUnavailable(_))));
    }

    #[tokio::test]
    async fn test_wrong_facing_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let config = camera_config(&dir, vec!["true".to_string()]);
        let constraints = StreamConstraints {
            facing: Facing::User,
            audio: false,
        };

        let result = CommandCamera::new(&config).open(&constraints).await;
        assert!(matches!(result, Err(Error::DeviceUnavailable(_))));
    }

    #[tokio::test]
    async fn test_failing_command_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let camera = CommandCamera::new(&camera_config(&dir, vec!["false".to_string()]));
        let mut stream = camera
            .open(&StreamConstraints::environment_video())
            .await
            .unwrap();

        assert!(matches!(
            stream.grab_frame().await,
            Err(Error::DeviceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_non_image_output_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let camera = CommandCamera::new(&camera_config(
            &dir,
            vec!["echo".to_string(), "hello".to_string()],
        ));
        let mut stream = camera
            .open(&StreamConstraints::environment_video())
            .await
            .unwrap();

        assert!(matches!(
            stream.grab_frame().await,
            Err(Error::UnreadableImage(_))
        ));
    }
}
