// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::{
    modules::{
        context::MailContext,
        directory::User,
        error::{code::ErrorCode, CourseMailResult},
    },
    raise_error,
};

pub mod search;

impl User {
    /// Resolves a user through the directory.
    pub fn get(ctx: &MailContext, user_id: u64) -> CourseMailResult<User> {
        ctx.directory.user(user_id)?.ok_or_else(|| {
            raise_error!(
                format!("User with id={} was not found.", user_id),
                ErrorCode::ResourceNotFound
            )
        })
    }

    /// Resolves several users, skipping unknown ids.
    pub fn get_many(ctx: &MailContext, user_ids: &[u64]) -> CourseMailResult<Vec<User>> {
        let mut users = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            if let Some(user) = ctx.directory.user(*user_id)? {
                users.push(user);
            }
        }
        Ok(users)
    }
}
