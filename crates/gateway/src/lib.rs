//! HTTP and WebSocket surface for video annotation and freeze monitoring.

pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;
pub mod ws;

pub use config::GatewayConfig;
pub use error::AppError;
pub use server::{router, run_server};
pub use state::AppState;
