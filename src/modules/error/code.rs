// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Serialize};

/// Coarse error categories exposed to callers of the mail core.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    Permission,
    NotFound,
    InvalidState,
    Internal,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[repr(u32)]
pub enum ErrorCode {
    // Client-side errors (10000–10999)
    InvalidParameter = 10000,
    NameConflict = 10010,
    MissingRecipients = 10020,
    MissingConfiguration = 10030,

    // Authorization errors (20000–20999)
    PermissionDenied = 20000,
    MailDisabled = 20010,

    // Resource errors (30000–30999)
    ResourceNotFound = 30000,

    // State machine errors (40000–40999)
    InvalidState = 40000,
    AlreadySent = 40010,

    // Internal system errors (70000–70999)
    InternalError = 70000,
}

impl ErrorCode {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ErrorCode::InvalidParameter
            | ErrorCode::NameConflict
            | ErrorCode::MissingRecipients
            | ErrorCode::MissingConfiguration
            | ErrorCode::MailDisabled => ErrorKind::Validation,
            ErrorCode::PermissionDenied => ErrorKind::Permission,
            ErrorCode::ResourceNotFound => ErrorKind::NotFound,
            ErrorCode::InvalidState | ErrorCode::AlreadySent => ErrorKind::InvalidState,
            ErrorCode::InternalError => ErrorKind::Internal,
        }
    }
}
