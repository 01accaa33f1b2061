use common::{env_nonempty, env_positive};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub addr: String,
    pub database_url: String,
    pub otlp_endpoint: Option<String>,
    /// Buffered messages per streaming socket.
    pub channel_capacity: usize,
    /// Frames per detection commit on streaming sockets.
    pub stream_batch_frames: usize,
    pub keepalive: Duration,
    pub overlay_font_path: Option<PathBuf>,
    /// Camera index, stream URL or path behind `/ws/camera`.
    pub camera_source: String,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self {
            addr: env_nonempty("GATEWAY_ADDR").unwrap_or_else(|| "0.0.0.0:8000".to_string()),
            database_url: env_nonempty("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://videos.db".to_string()),
            otlp_endpoint: env_nonempty("OTEL_EXPORTER_OTLP_ENDPOINT"),
            channel_capacity: env_positive("CHANNEL_CAPACITY", 16),
            stream_batch_frames: env_positive("STREAM_BATCH_FRAMES", 30),
            keepalive: Duration::from_secs(env_positive("KEEPALIVE_SECS", 15)),
            overlay_font_path: env_nonempty("OVERLAY_FONT_PATH").map(PathBuf::from),
            camera_source: env_nonempty("CAMERA_SOURCE").unwrap_or_else(|| "0".to_string()),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8000".to_string(),
            database_url: "sqlite://videos.db".to_string(),
            otlp_endpoint: None,
            channel_capacity: 16,
            stream_batch_frames: 30,
            keepalive: Duration::from_secs(15),
            overlay_font_path: None,
            camera_source: "0".to_string(),
        }
    }
}
