// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeSet;

use itertools::Itertools;
use serde::Serialize;
use tracing::{error, info};

use crate::modules::{
    context::MailContext,
    database::with_read_transaction,
    error::{internal, CourseMailResult},
    label::Label,
    message::{
        entity::{Addressee, MessageLabel, MessageLabelKey, MessageUserState, MessageUserStateKey},
        purge::BatchReport,
        search::MessageSearch,
        state::{DeletedState, MessageFormat, Role},
        Message,
    },
};

#[cfg(test)]
mod tests;

/// Everything the mail core stores about one user.
#[derive(Clone, Debug, Default, Serialize)]
pub struct UserExport {
    pub user_id: u64,
    pub labels: Vec<Label>,
    pub courses: Vec<CourseExport>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct CourseExport {
    pub course_id: u64,
    pub messages: Vec<ExportedMessage>,
}

/// A message as its exporting user sees it.
#[derive(Clone, Debug, Serialize)]
pub struct ExportedMessage {
    pub id: u64,
    pub subject: String,
    pub content: String,
    pub format: MessageFormat,
    pub attachments: u32,
    pub draft: bool,
    pub time: i64,
    pub sender: u64,
    /// BCC recipients appear only when the exporting user sent the message
    /// or is that recipient.
    pub recipients: Vec<Addressee>,
    pub role: Role,
    pub unread: bool,
    pub starred: bool,
    pub deleted: DeletedState,
    pub labels: Vec<u64>,
    pub references: Vec<u64>,
}

impl ExportedMessage {
    fn new(message: &Message, user_id: u64) -> Option<Self> {
        let state = message.state(user_id)?;
        Some(Self {
            id: message.id(),
            subject: message.subject_for(user_id).to_string(),
            content: message.content_for(user_id).to_string(),
            format: message.format(),
            attachments: message.attachments(),
            draft: message.draft(),
            time: message.time(),
            sender: message.sender(),
            recipients: message.visible_recipients(user_id),
            role: state.role,
            unread: state.unread,
            starred: state.starred,
            deleted: state.deleted,
            labels: message.get_labels(user_id),
            references: message.get_references().to_vec(),
        })
    }
}

/// Courses in which `user_id` has mail data, ascending.
pub async fn contexts_for_user(ctx: &MailContext, user_id: u64) -> CourseMailResult<Vec<u64>> {
    with_read_transaction(&ctx.db, move |r| {
        let rows: Vec<MessageUserState> = r
            .scan()
            .secondary(MessageUserStateKey::user_id)
            .map_err(internal)?
            .start_with(user_id)
            .map_err(internal)?
            .try_collect()
            .map_err(internal)?;
        let associations: Vec<MessageLabel> = r
            .scan()
            .secondary(MessageLabelKey::user_id)
            .map_err(internal)?
            .start_with(user_id)
            .map_err(internal)?
            .try_collect()
            .map_err(internal)?;
        let courses: BTreeSet<u64> = rows
            .iter()
            .map(|row| row.course_id)
            .chain(associations.iter().map(|association| association.course_id))
            .collect();
        Ok(courses.into_iter().collect())
    })
    .await
}

/// Users with mail data in `course_id`, ascending.
pub async fn users_in_course(ctx: &MailContext, course_id: u64) -> CourseMailResult<Vec<u64>> {
    with_read_transaction(&ctx.db, move |r| {
        let users: Vec<u64> = r
            .scan()
            .secondary::<MessageUserState>(MessageUserStateKey::course_id)
            .map_err(internal)?
            .start_with(course_id)
            .map_err(internal)?
            .map_ok(|row| row.user_id)
            .try_collect()
            .map_err(internal)?;
        Ok(users.into_iter().sorted().dedup().collect())
    })
    .await
}

pub async fn export_user_data(ctx: &MailContext, user_id: u64) -> CourseMailResult<UserExport> {
    let labels = Label::get_by_user(ctx, user_id).await?;
    let mut export = UserExport {
        user_id,
        labels: labels.as_ref().clone(),
        courses: vec![],
    };
    let rows = user_rows(ctx, user_id).await?;
    for course_id in contexts_for_user(ctx, user_id).await? {
        let mut messages = Vec::new();
        for deleted in [None, Some(true)] {
            let search = MessageSearch {
                course_id: Some(course_id),
                deleted,
                ..MessageSearch::new(user_id)
            };
            let mut batches = search.batches(ctx, ctx.batch_size);
            while let Some(ids) = batches.next().await? {
                for message in Message::get_many(ctx, ids).await? {
                    messages.extend(ExportedMessage::new(&message, user_id));
                }
            }
        }
        // Searches skip scrubbed copies; their metadata is still exported.
        let scrubbed = rows
            .iter()
            .filter(|row| row.course_id == course_id && row.deleted == DeletedState::DeletedContent)
            .map(|row| row.message_id)
            .collect_vec();
        for ids in scrubbed.chunks(ctx.batch_size.max(1)) {
            for message in Message::get_many(ctx, ids.to_vec()).await? {
                messages.extend(ExportedMessage::new(&message, user_id));
            }
        }
        messages.sort_by_key(|m| (m.time, m.id));
        export.courses.push(CourseExport {
            course_id,
            messages,
        });
    }
    info!(
        "Exported mail data of user_id={}: {} courses",
        user_id,
        export.courses.len()
    );
    Ok(export)
}

/// Honors a deletion request of `user_id` in `course_ids`: the user's sent
/// copies have their content deleted, every other copy is deleted forever.
/// Labels go too once every course of the user is targeted.
pub async fn delete_user_data(
    ctx: &MailContext,
    user_id: u64,
    course_ids: &[u64],
) -> CourseMailResult<BatchReport> {
    let contexts = contexts_for_user(ctx, user_id).await?;
    let targets: BTreeSet<u64> = course_ids.iter().copied().collect();
    let mut report = BatchReport::default();

    let rows = user_rows(ctx, user_id).await?;
    let pending = rows
        .into_iter()
        .filter(|row| targets.contains(&row.course_id))
        .collect_vec();
    for batch in pending.chunks(ctx.batch_size.max(1)) {
        for row in batch {
            let state = deletion_state(row);
            if row.deleted == state || row.deleted == DeletedState::DeletedForever {
                report.processed += 1;
                continue;
            }
            match Message::set_deleted(ctx, user_id, row.message_id, state).await {
                Ok(()) => report.processed += 1,
                Err(e) => {
                    error!(
                        "Failed to delete message_id={} for user_id={}: {:#?}",
                        row.message_id, user_id, e
                    );
                    report.fail(row.message_id, e.to_string());
                }
            }
        }
    }

    if contexts.iter().all(|c| targets.contains(c)) {
        Label::delete_all_for_user(ctx, user_id).await?;
    }
    info!(
        "Deleted mail data of user_id={}: {} messages, {} failures",
        user_id,
        report.processed,
        report.failures.len()
    );
    Ok(report)
}

/// Deletes the data of several users within one course.
pub async fn delete_users_data(
    ctx: &MailContext,
    course_id: u64,
    user_ids: &[u64],
) -> CourseMailResult<BatchReport> {
    let mut report = BatchReport::default();
    for user_id in user_ids {
        let partial = delete_user_data(ctx, *user_id, &[course_id]).await?;
        report.processed += partial.processed;
        report.failures.extend(partial.failures);
    }
    Ok(report)
}

pub async fn delete_course_data(ctx: &MailContext, course_id: u64) -> CourseMailResult<BatchReport> {
    Message::delete_course_data(ctx, course_id).await
}

fn deletion_state(row: &MessageUserState) -> DeletedState {
    if row.role == Role::From {
        DeletedState::DeletedContent
    } else {
        DeletedState::DeletedForever
    }
}

async fn user_rows(ctx: &MailContext, user_id: u64) -> CourseMailResult<Vec<MessageUserState>> {
    with_read_transaction(&ctx.db, move |r| {
        r.scan()
            .secondary(MessageUserStateKey::user_id)
            .map_err(internal)?
            .start_with(user_id)
            .map_err(internal)?
            .try_collect()
            .map_err(internal)
    })
    .await
}
