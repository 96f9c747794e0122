use crate::modules::logger::file::setup_file_logger;
use crate::modules::settings::cli::Settings;
use chrono::Local;
use std::process;
use tracing::Level;
use tracing_subscriber::fmt::{format::Writer, time::FormatTime};

mod file;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

pub fn initialize_logging(settings: &Settings) {
    let level = validate_log_level(&settings.coursemail_log_level);
    let result = if settings.coursemail_log_to_file {
        setup_file_logger(settings, level)
    } else {
        setup_stdout_logger(settings, level)
    };
    if let Err(e) = result {
        eprintln!("Failed to install the global log subscriber: {}", e);
    }
}

#[derive(Debug)]
pub enum LoggerError {
    Appender(tracing_appender::rolling::InitError),
    Subscriber(tracing::dispatcher::SetGlobalDefaultError),
}

impl std::fmt::Display for LoggerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoggerError::Appender(e) => write!(f, "rolling file appender: {}", e),
            LoggerError::Subscriber(e) => write!(f, "{}", e),
        }
    }
}

fn setup_stdout_logger(settings: &Settings, level: Level) -> Result<(), LoggerError> {
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(settings.coursemail_ansi_logs)
        .with_writer(std::io::stdout)
        .with_level(true)
        .with_target(true)
        .with_timer(LocalTimer);

    let installed = if settings.coursemail_json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    installed.map_err(LoggerError::Subscriber)
}

fn validate_log_level(value: &str) -> Level {
    match value.parse::<Level>() {
        Ok(level) => level,
        Err(_) => {
            eprintln!(
                "Invalid log level specified. Use one of: error, warn, info, debug, trace. 
        The log level you currently specified is 'coursemail_log_level'='{}'",
                value
            );
            process::exit(1);
        }
    }
}
