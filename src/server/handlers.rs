use super::types::*;
use crate::{
    Error, catalog,
    capture::CaptureSession,
    controller::{DIAGNOSIS_FAILED_MESSAGE, DiagnosisController, Outcome, SessionRegistry},
    diagnosis::{Diagnoser, image},
    preferences::ThemePreference,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    pub diagnoser: Arc<Diagnoser>,
    pub camera: Arc<Mutex<CaptureSession>>,
    pub theme: Arc<ThemePreference>,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Maps a library error to a status and a message safe to show the user.
pub fn api_error(e: Error) -> ApiError {
    let status = match &e {
        Error::Validation(_) | Error::UnreadableImage(_) => StatusCode::BAD_REQUEST,
        Error::SubmissionInProgress => StatusCode::CONFLICT,
        Error::PermissionDenied(_) => StatusCode::FORBIDDEN,
        Error::DeviceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::CaptureNotStreaming | Error::InvalidTransition { .. } => StatusCode::CONFLICT,
        Error::SessionNotFound { .. } => StatusCode::NOT_FOUND,
        e if e.is_diagnosis_failure() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let message = match &e {
        e if e.is_diagnosis_failure() && !matches!(e, Error::UnreadableImage(_)) => {
            DIAGNOSIS_FAILED_MESSAGE.to_string()
        }
        Error::Validation(msg) => msg.clone(),
        e if status == StatusCode::INTERNAL_SERVER_ERROR => {
            error!("Internal error: {}", e);
            "Internal server error".to_string()
        }
        e => e.to_string(),
    };

    (status, Json(ErrorResponse { error: message }))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn plant_types() -> Json<PlantTypesResponse> {
    Json(PlantTypesResponse {
        plant_types: catalog::PLANT_TYPES.to_vec(),
    })
}

pub async fn diagnose(
    State(state): State<AppState>,
    Json(request): Json<DiagnoseRequest>,
) -> Result<(StatusCode, Json<DiagnoseResponse>), ApiError> {
    // Every input is validated before the session is looked up.
    let plant_type = catalog::resolve(request.plant_type.as_deref()).map_err(api_error)?;
    let image = request
        .image
        .map(|upload| image::from_base64(&upload.data, &upload.mime_type))
        .transpose()
        .map_err(api_error)?;

    let session_id = request
        .session_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    info!("Received diagnosis request for session: {}", session_id);

    let controller = state.sessions.get_or_create(&session_id).map_err(api_error)?;

    {
        let mut controller = controller.lock().await;
        if controller.is_loading() {
            return Err(api_error(Error::SubmissionInProgress));
        }
        controller.set_description(request.description);
        controller.set_plant_type(plant_type).map_err(api_error)?;
        if let Some(payload) = image {
            controller.set_image(Some(payload)).map_err(api_error)?;
        }
    }

    let outcome = match DiagnosisController::submit(&controller, &state.diagnoser).await {
        Ok(outcome) => outcome,
        Err(Error::Validation(msg)) => {
            info!("Rejected submission for session {}: {}", session_id, msg);
            Outcome::Rejected
        }
        Err(e) => return Err(api_error(e)),
    };

    let status = match outcome {
        Outcome::Succeeded => StatusCode::OK,
        Outcome::Rejected => StatusCode::BAD_REQUEST,
        Outcome::Failed => {
            warn!("Diagnosis failed for session {}", session_id);
            StatusCode::BAD_GATEWAY
        }
    };

    let session = controller.lock().await.view();
    Ok((
        status,
        Json(DiagnoseResponse {
            session_id,
            outcome,
            session,
        }),
    ))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let controller = state.sessions.get(&session_id).map_err(api_error)?;
    let session = controller.lock().await.view();
    Ok(Json(SessionResponse {
        session_id,
        session,
    }))
}

pub async fn clear_image(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let controller = state.sessions.get(&session_id).map_err(api_error)?;
    let mut controller = controller.lock().await;
    controller.set_image(None).map_err(api_error)?;
    Ok(Json(SessionResponse {
        session_id,
        session: controller.view(),
    }))
}

pub async fn camera_status(State(state): State<AppState>) -> Json<crate::capture::CaptureStatus> {
    Json(state.camera.lock().await.status())
}

pub async fn camera_open(
    State(state): State<AppState>,
) -> Result<Json<crate::capture::CaptureStatus>, ApiError> {
    let result = CaptureSession::open_shared(&state.camera).await;
    let camera = state.camera.lock().await;
    match result {
        Ok(()) => Ok(Json(camera.status())),
        Err(e) => {
            let status = api_error(e).0;
            let message = camera
                .last_error()
                .unwrap_or("Could not access the camera.")
                .to_string();
            Err((status, Json(ErrorResponse { error: message })))
        }
    }
}

pub async fn camera_capture(
    State(state): State<AppState>,
) -> Result<Json<CaptureResponse>, ApiError> {
    let mut camera = state.camera.lock().await;
    let bytes = camera.capture().await.map_err(api_error)?;
    let image = image::encode(&bytes).map_err(api_error)?;
    Ok(Json(CaptureResponse {
        image,
        camera: camera.status(),
    }))
}

pub async fn camera_close(State(state): State<AppState>) -> Json<crate::capture::CaptureStatus> {
    let mut camera = state.camera.lock().await;
    camera.close();
    Json(camera.status())
}

pub async fn get_theme(State(state): State<AppState>) -> Result<Json<ThemeBody>, ApiError> {
    let theme = state.theme.load().await.map_err(api_error)?;
    Ok(Json(ThemeBody { theme }))
}

pub async fn put_theme(
    State(state): State<AppState>,
    Json(body): Json<ThemeBody>,
) -> Result<Json<ThemeBody>, ApiError> {
    let theme = state.theme.set(body.theme).await.map_err(api_error)?;
    Ok(Json(ThemeBody { theme }))
}

pub async fn toggle_theme(State(state): State<AppState>) -> Result<Json<ThemeBody>, ApiError> {
    let theme = state.theme.toggle().await.map_err(api_error)?;
    Ok(Json(ThemeBody { theme }))
}
