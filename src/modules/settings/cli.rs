// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use clap::{builder::ValueParser, Parser};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[clap(
    name = "coursemail",
    about = "Course mail core: threaded multi-recipient messages, labels and mailbox search.",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Settings {
    /// coursemail log level (default: "info")
    #[clap(
        long,
        default_value = "info",
        env,
        help = "Set the log level for coursemail"
    )]
    pub coursemail_log_level: String,

    /// Enable ANSI logs (default: true)
    #[clap(long, default_value = "true", env, help = "Enable ANSI formatted logs")]
    pub coursemail_ansi_logs: bool,

    /// Enable JSON logs (default: false)
    #[clap(
        long,
        default_value = "false",
        env,
        help = "Enable JSON formatted logs"
    )]
    pub coursemail_json_logs: bool,

    /// Enable log file output (default: false)
    /// If false, logs will be printed to stdout
    #[clap(
        long,
        default_value = "false",
        env,
        help = "Enable log file output (otherwise logs go to stdout)"
    )]
    pub coursemail_log_to_file: bool,

    /// Maximum number of log files (default: 5)
    #[clap(
        long,
        default_value = "5",
        env,
        help = "Set the maximum number of log files"
    )]
    pub coursemail_max_log_files: usize,

    #[clap(
        long,
        env,
        help = "Set the data directory holding the coursemail database and logs",
        value_parser = ValueParser::new(|s: &str| {
            let path = PathBuf::from(s);
            if !path.is_absolute() {
                return Err("Path must be an absolute directory path".to_string());
            }
            if !path.exists() {
                return Err(format!("Path {:?} does not exist", path));
            }
            if !path.is_dir() {
                return Err(format!("Path {:?} is not a directory", path));
            }
            Ok(path)
        })
    )]
    pub coursemail_root_dir: Option<PathBuf>,

    #[clap(
        long,
        env,
        default_value = "false",
        help = "Keep the mail database in memory only (nothing is persisted)"
    )]
    pub coursemail_memory_mode_enabled: bool,

    #[clap(
        long,
        env,
        default_value = "134217728",
        help = "Set the cache size for the mail database in bytes"
    )]
    pub coursemail_database_cache_size: usize,

    #[clap(
        long,
        env,
        default_value = "100",
        help = "Number of messages processed per batch by bulk jobs (course purge, privacy export/deletion)",
        value_parser = clap::value_parser!(u32).range(1..=10000)
    )]
    pub coursemail_batch_size: u32,

    #[clap(
        long,
        env,
        default_value = "1000",
        help = "Maximum number of entries kept by the course and label caches",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub coursemail_cache_capacity: u32,

    #[clap(
        long,
        env,
        default_value = "300",
        help = "Time to live in seconds of course and label cache entries"
    )]
    pub coursemail_cache_ttl_secs: u64,

    #[clap(
        long,
        env,
        default_value = "20",
        help = "Default number of message ids returned per search page",
        value_parser = clap::value_parser!(u32).range(1..=1000)
    )]
    pub coursemail_search_page_size: u32,
}

impl Settings {
    pub const DATABASE_FILE: &'static str = "coursemail.db";

    pub fn database_path(&self) -> Option<PathBuf> {
        self.coursemail_root_dir
            .as_ref()
            .map(|dir| dir.join(Self::DATABASE_FILE))
    }

    pub fn log_dir(&self) -> PathBuf {
        self.coursemail_root_dir
            .as_ref()
            .map(|dir| dir.join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    }

    /// Default settings with no root directory: in-memory database, stdout logging.
    pub fn embedded() -> Self {
        Self {
            coursemail_log_level: "info".to_string(),
            coursemail_ansi_logs: false,
            coursemail_json_logs: false,
            coursemail_log_to_file: false,
            coursemail_max_log_files: 5,
            coursemail_root_dir: None,
            coursemail_memory_mode_enabled: true,
            coursemail_database_cache_size: 134217728,
            coursemail_batch_size: 100,
            coursemail_cache_capacity: 1000,
            coursemail_cache_ttl_secs: 300,
            coursemail_search_page_size: 20,
        }
    }

    #[cfg(test)]
    pub fn new_for_test() -> Self {
        Self {
            coursemail_batch_size: 3,
            coursemail_cache_capacity: 16,
            ..Self::embedded()
        }
    }
}
