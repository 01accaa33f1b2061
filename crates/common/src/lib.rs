pub mod config;
pub mod logging;
pub mod telemetry;

pub use config::{Environment, env_nonempty, env_or, env_positive};
pub use logging::setup_logging;
pub use telemetry::TelemetryGuard;
