// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

pub mod common;
pub mod context;
pub mod course;
pub mod database;
pub mod directory;
pub mod error;
pub mod label;
pub mod logger;
pub mod message;
pub mod privacy;
pub mod settings;
pub mod user;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
