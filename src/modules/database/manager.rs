// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::database::MAIL_MODELS;
use crate::modules::error::{code::ErrorCode, internal, CourseMailError, CourseMailResult};
use crate::modules::settings::cli::Settings;
use crate::raise_error;
use native_db::{Builder, Database};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

const MIN_CACHE_SIZE: usize = 67108864;

pub struct DatabaseManager;

impl DatabaseManager {
    /// Opens the mail database described by `settings`: in memory when memory
    /// mode is enabled, otherwise `<root_dir>/coursemail.db`.
    pub fn open(settings: &Settings) -> CourseMailResult<Arc<Database<'static>>> {
        if settings.coursemail_memory_mode_enabled {
            info!("Opening in-memory mail database");
            return Self::in_memory();
        }
        let path = settings.database_path().ok_or_else(|| {
            raise_error!(
                "'coursemail_root_dir' is required unless memory mode is enabled.".into(),
                ErrorCode::MissingConfiguration
            )
        })?;
        Self::open_file(&path, settings.coursemail_database_cache_size)
    }

    pub fn open_file(path: &Path, cache_size: usize) -> CourseMailResult<Arc<Database<'static>>> {
        info!("Initializing mail database at: {:?}", path);
        let mut database = Builder::new()
            .set_cache_size(cache_size.max(MIN_CACHE_SIZE))
            .create(&MAIL_MODELS, path)
            .map_err(Self::handle_database_error)?;
        database.compact().map_err(internal)?;
        Ok(Arc::new(database))
    }

    pub fn in_memory() -> CourseMailResult<Arc<Database<'static>>> {
        let database = Builder::new()
            .create_in_memory(&MAIL_MODELS)
            .map_err(Self::handle_database_error)?;
        Ok(Arc::new(database))
    }

    fn handle_database_error(error: native_db::db_type::Error) -> CourseMailError {
        match error {
            native_db::db_type::Error::RedbDatabaseError(database_error) => match database_error {
                redb::DatabaseError::DatabaseAlreadyOpen => {
                    raise_error!(
                        "Database is already open by another instance".into(),
                        ErrorCode::InternalError
                    )
                }
                other => {
                    raise_error!(
                        format!("Database error: {:?}", other),
                        ErrorCode::InternalError
                    )
                }
            },
            other => {
                raise_error!(
                    format!("Failed to create database: {:?}", other),
                    ErrorCode::InternalError
                )
            }
        }
    }
}
