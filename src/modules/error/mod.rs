// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use code::{ErrorCode, ErrorKind};
use snafu::{Location, Snafu};

use crate::raise_error;

pub mod code;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CourseMailError {
    #[snafu(display("{message}"))]
    Generic {
        message: String,
        #[snafu(implicit)]
        location: Location,
        code: ErrorCode,
    },
}

pub type CourseMailResult<T, E = CourseMailError> = std::result::Result<T, E>;

impl CourseMailError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CourseMailError::Generic { code, .. } => *code,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.code().kind()
    }
}

/// Wraps storage and runtime failures that callers cannot act upon.
pub fn internal<E: std::fmt::Debug>(error: E) -> CourseMailError {
    raise_error!(format!("{:#?}", error), ErrorCode::InternalError)
}

impl From<tokio::task::JoinError> for CourseMailError {
    fn from(e: tokio::task::JoinError) -> Self {
        internal(e)
    }
}
