use crate::models::config::LoggingConfig;
use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE: &str = "darkwatch.log";

/// Installs the global subscriber. Keep the returned guard alive for the
/// lifetime of the process or buffered file output is lost.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&config.directory)?;

    let file_appender = tracing_appender::rolling::daily(&config.directory, LOG_FILE);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{},tower_http=warn,hyper=warn,reqwest=warn", config.level))
    });

    let json_file = config.json.then(|| {
        fmt::layer()
            .with_writer(file_writer.clone())
            .with_ansi(false)
            .json()
    });
    let plain_file = (!config.json).then(|| {
        fmt::layer()
            .with_writer(file_writer)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .with_ansi(true),
        )
        .with(json_file)
        .with(plain_file)
        .try_init()?;

    info!(directory = %config.directory.display(), "Logging initialized");
    Ok(guard)
}
