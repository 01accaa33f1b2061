use crate::config::Environment;
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber: pretty output for development, JSON for
/// production, filtered by `RUST_LOG` (default `info`).
///
/// The OpenTelemetry layer is always installed; it only exports once a global
/// tracer provider exists (see [`crate::TelemetryGuard`]).
pub fn setup_logging(environment: Environment) {
    install(environment, tracing_opentelemetry::layer().boxed());
}

pub(crate) fn install(environment: Environment, otel_layer: Box<dyn Layer<Registry> + Send + Sync>) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(otel_layer).with(env_filter);

    let result = match environment {
        Environment::Production => registry
            .with(tracing_subscriber::fmt::layer().json().with_level(true))
            .try_init(),
        Environment::Development => registry
            .with(tracing_subscriber::fmt::layer().pretty().with_ansi(true))
            .try_init(),
    };

    if let Err(e) = result {
        eprintln!("tracing subscriber already installed: {}", e);
    }
}
