pub mod handlers;
pub mod types;

use crate::{
    Result,
    capture::{CaptureSession, CommandCamera},
    config::Config,
    controller::SessionRegistry,
    diagnosis::Diagnoser,
    llm::GeminiClient,
    preferences::{PreferenceStorage, ThemePreference},
};
use axum::{
    Router,
    routing::{delete, get, post},
};
use handlers::AppState;
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/plant-types", get(handlers::plant_types))
        .route("/api/diagnose", post(handlers::diagnose))
        .route("/api/sessions/:session_id", get(handlers::get_session))
        .route("/api/sessions/:session_id/image", delete(handlers::clear_image))
        .route("/api/camera", get(handlers::camera_status))
        .route("/api/camera/open", post(handlers::camera_open))
        .route("/api/camera/capture", post(handlers::camera_capture))
        .route("/api/camera/close", post(handlers::camera_close))
        .route(
            "/api/theme",
            get(handlers::get_theme).put(handlers::put_theme),
        )
        .route("/api/theme/toggle", post(handlers::toggle_theme))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

pub async fn run(config: Config) -> Result<()> {
    let storage = PreferenceStorage::new(&config.server.database_path).await?;
    let theme = ThemePreference::with_system_detection(storage);
    info!("Initial theme: {}", theme.load().await?);

    let llm_client = Arc::new(GeminiClient::new(config.llm.clone())?);
    info!("Using model {}", llm_client.model());
    let diagnoser = Diagnoser::new(llm_client).with_temperature(config.llm.temperature);

    let camera = CaptureSession::new(Arc::new(CommandCamera::new(&config.camera)));

    let app_state = AppState {
        sessions: Arc::new(SessionRegistry::with_limits(
            config.server.sessions.idle_ttl_secs,
            config.server.sessions.max_sessions,
        )),
        diagnoser: Arc::new(diagnoser),
        camera: Arc::new(Mutex::new(camera)),
        theme: Arc::new(theme),
    };

    let app = router(app_state);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
