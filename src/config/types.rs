use crate::{
    capture::Facing,
    controller::{DEFAULT_IDLE_TTL_SECS, DEFAULT_MAX_SESSIONS},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub camera: CameraConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Usually left empty in the file and supplied through `API_KEY`.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub logs: LogsConfig,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default)]
    pub sessions: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Sessions untouched for this long are dropped.
    #[serde(default = "default_session_idle_secs")]
    pub idle_ttl_secs: u64,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_camera_device")]
    pub device: String,
    #[serde(default)]
    pub facing: Facing,
    /// Frame grab command; `{device}` is replaced with `device`. Must write
    /// one encoded image to stdout.
    #[serde(default = "default_grab_command")]
    pub grab_command: Vec<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            logs: LogsConfig::default(),
            database_path: default_database_path(),
            sessions: SessionConfig::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: default_session_idle_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: default_camera_device(),
            facing: Facing::default(),
            grab_command: default_grab_command(),
        }
    }
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_temperature() -> f32 {
    0.5
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_database_path() -> String {
    "preferences.db".to_string()
}

fn default_session_idle_secs() -> u64 {
    DEFAULT_IDLE_TTL_SECS
}

fn default_max_sessions() -> usize {
    DEFAULT_MAX_SESSIONS
}

fn default_camera_device() -> String {
    "/dev/video0".to_string()
}

fn default_grab_command() -> Vec<String> {
    [
        "ffmpeg",
        "-loglevel",
        "error",
        "-f",
        "v4l2",
        "-i",
        "{device}",
        "-frames:v",
        "1",
        "-f",
        "image2pipe",
        "-vcodec",
        "png",
        "-",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
