//! Tracing subscriber setup: console output plus an optional rolling log file.

use crate::config::LoggingConfig;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps the non-blocking file writer alive. Dropping it flushes pending lines.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Builds the env filter. `RUST_LOG` wins over the configured level.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn rotation(config: &LoggingConfig) -> rolling::Rotation {
    match config.file_rotation.to_ascii_lowercase().as_str() {
        "minutely" => rolling::Rotation::MINUTELY,
        "hourly" => rolling::Rotation::HOURLY,
        "never" => rolling::Rotation::NEVER,
        _ => rolling::Rotation::DAILY,
    }
}

pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<LoggingGuard> {
    let mut layers: Vec<BoxedLayer> = Vec::new();

    let console: BoxedLayer = if config.json {
        fmt::layer().json().with_current_span(true).boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };
    layers.push(console);

    let file_guard = if config.file_enabled {
        std::fs::create_dir_all(&config.file_directory)?;
        let appender = rolling::RollingFileAppender::new(
            rotation(config),
            &config.file_directory,
            &config.file_prefix,
        );
        let (writer, guard) = tracing_appender::non_blocking(appender);
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
        );
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter(config))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
