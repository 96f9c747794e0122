// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use super::error::code::ErrorCode;
use crate::modules::error::CourseMailResult;

#[macro_export]
macro_rules! coursemail_version {
    () => {
        env!("CARGO_PKG_VERSION")
    };
}

#[macro_export]
macro_rules! utc_now {
    () => {{
        use chrono::Utc;
        Utc::now().timestamp_millis()
    }};
}

#[macro_export]
macro_rules! base64_decode_url_safe {
    ($key:expr) => {{
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, *};
        URL_SAFE_NO_PAD.decode($key)
    }};
}

#[macro_export]
macro_rules! base64_encode_url_safe {
    ($key:expr) => {{
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, *};
        URL_SAFE_NO_PAD.encode($key)
    }};
}

#[macro_export]
macro_rules! raise_error {
    ($msg:expr, $code:expr) => {
        $crate::modules::error::CourseMailError::Generic {
            message: $msg,
            location: snafu::Location::default(),
            code: $code,
        }
    };
}

#[macro_export]
macro_rules! validate_text {
    ($input:expr, $param_name:expr, $max_chars:expr) => {{
        $crate::modules::utils::validate_text_impl($input, $param_name, $max_chars)
    }};
}

/// Trims `input` and checks it is non-empty and at most `max_chars` characters.
pub fn validate_text_impl(
    input: &str,
    param_name: &str,
    max_chars: usize,
) -> CourseMailResult<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(raise_error!(
            format!("'{}' cannot be empty.", param_name),
            ErrorCode::InvalidParameter
        ));
    }
    if trimmed.chars().count() > max_chars {
        return Err(raise_error!(
            format!(
                "'{}' cannot be longer than {} characters.",
                param_name, max_chars
            ),
            ErrorCode::InvalidParameter
        ));
    }
    Ok(trimmed.to_string())
}

/// Zero-padded key segment, so lexicographic key order equals numeric order.
#[inline]
pub fn key_segment(value: u64) -> String {
    format!("{:020}", value)
}
