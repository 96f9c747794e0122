// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    base64_decode_url_safe, base64_encode_url_safe,
    modules::error::{code::ErrorCode, CourseMailError},
    raise_error,
};

/// Position of a message in search order, passed back opaquely between pages.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Cursor {
    pub time: i64,
    pub id: u64,
}

impl Cursor {
    pub fn new(time: i64, id: u64) -> Self {
        Self { time, id }
    }

    pub fn encode(&self) -> String {
        base64_encode_url_safe!(format!("{}:{}", self.time, self.id))
    }

    pub fn decode(token: &str) -> Result<Self, CourseMailError> {
        let invalid = || {
            raise_error!(
                format!("Invalid page token '{}'.", token),
                ErrorCode::InvalidParameter
            )
        };
        let bytes = base64_decode_url_safe!(token).map_err(|_| invalid())?;
        let text = String::from_utf8(bytes).map_err(|_| invalid())?;
        let (time, id) = text.split_once(':').ok_or_else(invalid)?;
        Ok(Self {
            time: time.parse().map_err(|_| invalid())?,
            id: id.parse().map_err(|_| invalid())?,
        })
    }
}

impl Ord for Cursor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time.cmp(&other.time).then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for Cursor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Cursor {
    type Err = CourseMailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
