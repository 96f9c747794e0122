use crate::modules::logger::{LocalTimer, LoggerError};
use crate::modules::settings::cli::Settings;
use std::sync::OnceLock;
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;

pub static LOG_WORKER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

pub fn setup_file_logger(settings: &Settings, level: Level) -> Result<(), LoggerError> {
    let (writer, guard) = log_writer(settings).map_err(LoggerError::Appender)?;
    // A second initialization keeps the first guard alive.
    let _ = LOG_WORKER_GUARD.set(guard);

    let layer = fmt::layer()
        .with_timer(LocalTimer)
        .with_ansi(false)
        .with_level(true)
        .with_writer(writer)
        .with_target(true);

    let subscriber = tracing_subscriber::registry()
        .with(LevelFilter::from_level(level))
        .with(layer);

    tracing::subscriber::set_global_default(subscriber).map_err(LoggerError::Subscriber)
}

fn log_writer(settings: &Settings) -> Result<(NonBlocking, WorkerGuard), InitError> {
    let rolling = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("coursemail")
        .max_log_files(settings.coursemail_max_log_files)
        .build(settings.log_dir())?;
    Ok(tracing_appender::non_blocking(rolling))
}
