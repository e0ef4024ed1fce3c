mod command;
mod device;
mod session;

pub use command::CommandCamera;
pub use device::{CameraBackend, Facing, StreamConstraints, VideoStream};
pub use session::{
    CAPTURE_JPEG_QUALITY, CaptureSession, CaptureState, CaptureStatus, PendingOpen, encode_jpeg,
};
