use plant_pal::{
    capture::{CaptureSession, CaptureState},
    diagnosis::{MediaType, image},
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

mod common;

use common::mocks::FakeCamera;

#[tokio::test]
async fn test_reopening_never_leaks_a_stream() {
    let camera = Arc::new(FakeCamera::default());
    let mut session = CaptureSession::new(camera.clone());

    for _ in 0..3 {
        session.open().await.unwrap();
        assert_eq!(camera.live_streams(), 1);
    }
    assert_eq!(session.state(), CaptureState::Streaming);

    session.close();
    assert_eq!(camera.live_streams(), 0);
}

#[tokio::test]
async fn test_dropping_session_releases_stream() {
    let camera = Arc::new(FakeCamera::default());
    {
        let mut session = CaptureSession::new(camera.clone());
        session.open().await.unwrap();
        assert_eq!(camera.live_streams(), 1);
    }
    assert_eq!(camera.live_streams(), 0);
}

#[tokio::test]
async fn test_captured_still_survives_normalization() {
    let camera = Arc::new(FakeCamera::default());
    let mut session = CaptureSession::new(camera.clone());
    session.open().await.unwrap();

    let bytes = session.capture().await.unwrap();
    assert_eq!(session.state(), CaptureState::Captured);
    assert_eq!(camera.live_streams(), 0);

    let payload = image::encode(&bytes).unwrap();
    assert_eq!(payload.mime_type, MediaType::Jpeg);
    assert_eq!(image::decode(&payload).unwrap(), bytes);
}

#[tokio::test]
async fn test_denied_permission_returns_to_idle() {
    let camera = Arc::new(FakeCamera::default());
    camera.deny_permission(true);
    let mut session = CaptureSession::new(camera.clone());

    assert!(session.open().await.is_err());
    assert_eq!(session.state(), CaptureState::Idle);
    assert!(session.last_error().is_some());
    assert!(session.capture().await.is_err());

    camera.deny_permission(false);
    session.open().await.unwrap();
    assert!(session.last_error().is_none());
    assert!(session.is_streaming());
}
