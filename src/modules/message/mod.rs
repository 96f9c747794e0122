// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use entity::{
    Addressee, MessageEntity, MessageLabel, MessageLabelKey, MessageReference,
    MessageReferenceKey, MessageUserState, MessageUserStateKey,
};
use itertools::Itertools;
use native_db::transaction::{RTransaction, RwTransaction};
use serde::Serialize;
use state::{DeletedState, MessageFormat, Role};

use crate::{
    modules::{
        common::text::{html_to_text, markdown_to_text, normalize_text},
        context::MailContext,
        database::with_read_transaction,
        error::{code::ErrorCode, internal, CourseMailError, CourseMailResult},
    },
    raise_error,
};

pub mod compose;
pub mod entity;
pub mod flags;
pub mod purge;
pub mod search;
pub mod state;
#[cfg(test)]
mod tests;

/// A message with every participant's state row, label associations and
/// reply ancestry, read from one snapshot.
#[derive(Clone, Debug, Serialize)]
pub struct Message {
    entity: MessageEntity,
    states: Vec<MessageUserState>,
    labels: Vec<MessageLabel>,
    references: Vec<u64>,
}

impl Message {
    pub async fn get(ctx: &MailContext, id: u64) -> CourseMailResult<Message> {
        with_read_transaction(&ctx.db, move |r| {
            load(r, id)?.ok_or_else(|| message_not_found(id))
        })
        .await
    }

    /// Loads a message as seen by `user_id`. Fails when the user has no
    /// row, the row is deleted forever, or it is another user's draft.
    pub async fn get_for_user(ctx: &MailContext, user_id: u64, id: u64) -> CourseMailResult<Message> {
        let message = Self::get(ctx, id).await?;
        if !message.is_visible_to(user_id) {
            return Err(message_not_found(id));
        }
        Ok(message)
    }

    /// Loads several messages in one snapshot, skipping ids that no longer exist.
    pub async fn get_many(ctx: &MailContext, ids: Vec<u64>) -> CourseMailResult<Vec<Message>> {
        with_read_transaction(&ctx.db, move |r| {
            let mut messages = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(message) = load(r, id)? {
                    messages.push(message);
                }
            }
            Ok(messages)
        })
        .await
    }

    pub fn id(&self) -> u64 {
        self.entity.id
    }

    pub fn course_id(&self) -> u64 {
        self.entity.course_id
    }

    /// Shared stored subject; use [`Message::subject_for`] for what a user may read.
    pub fn subject(&self) -> &str {
        &self.entity.subject
    }

    /// Shared stored content; use [`Message::content_for`] for what a user may read.
    pub fn content(&self) -> &str {
        &self.entity.content
    }

    pub fn format(&self) -> MessageFormat {
        self.entity.format
    }

    pub fn attachments(&self) -> u32 {
        self.entity.attachments
    }

    pub fn draft(&self) -> bool {
        self.entity.draft
    }

    pub fn time(&self) -> i64 {
        self.entity.time
    }

    /// Subject as read by `user_id`: blank once their copy had its content deleted.
    pub fn subject_for(&self, user_id: u64) -> &str {
        if self.deleted(user_id) == Some(DeletedState::DeletedContent) {
            ""
        } else {
            &self.entity.subject
        }
    }

    pub fn content_for(&self, user_id: u64) -> &str {
        if self.deleted(user_id) == Some(DeletedState::DeletedContent) {
            ""
        } else {
            &self.entity.content
        }
    }

    pub fn normalized_subject(&self) -> &str {
        &self.entity.normalized_subject
    }

    pub fn normalized_content(&self) -> &str {
        &self.entity.normalized_content
    }

    pub fn sender(&self) -> u64 {
        self.states
            .iter()
            .find(|s| s.role == Role::From)
            .map(|s| s.user_id)
            .unwrap_or_default()
    }

    /// Recipients in role order. Drafts report their pending addressees.
    pub fn recipients(&self) -> Vec<Addressee> {
        let mut recipients: Vec<Addressee> = if self.entity.draft {
            self.entity.addressees.clone()
        } else {
            self.states
                .iter()
                .filter(|s| s.role.is_recipient())
                .map(|s| Addressee::new(s.user_id, s.role))
                .collect()
        };
        recipients.sort_by_key(|a| (role_rank(a.role), a.user_id));
        recipients
    }

    pub fn recipients_with_role(&self, role: Role) -> Vec<u64> {
        self.recipients()
            .into_iter()
            .filter(|a| a.role == role)
            .map(|a| a.user_id)
            .collect()
    }

    /// Recipients `viewer` may know about: BCC addressees are only shown to
    /// the sender and to themselves.
    pub fn visible_recipients(&self, viewer: u64) -> Vec<Addressee> {
        let sender = self.sender();
        self.recipients()
            .into_iter()
            .filter(|a| a.role != Role::Bcc || viewer == sender || viewer == a.user_id)
            .collect()
    }

    pub fn state(&self, user_id: u64) -> Option<&MessageUserState> {
        self.states.iter().find(|s| s.user_id == user_id)
    }

    pub fn states(&self) -> &[MessageUserState] {
        &self.states
    }

    pub fn role(&self, user_id: u64) -> Option<Role> {
        self.state(user_id).map(|s| s.role)
    }

    pub fn unread(&self, user_id: u64) -> Option<bool> {
        self.state(user_id).map(|s| s.unread)
    }

    pub fn starred(&self, user_id: u64) -> Option<bool> {
        self.state(user_id).map(|s| s.starred)
    }

    pub fn deleted(&self, user_id: u64) -> Option<DeletedState> {
        self.state(user_id).map(|s| s.deleted)
    }

    /// Label ids `user_id` attached to this message, ascending.
    pub fn get_labels(&self, user_id: u64) -> Vec<u64> {
        self.labels
            .iter()
            .filter(|l| l.user_id == user_id)
            .map(|l| l.label_id)
            .sorted()
            .collect()
    }

    /// Ancestor ids, oldest first.
    pub fn get_references(&self) -> &[u64] {
        &self.references
    }

    pub fn is_visible_to(&self, user_id: u64) -> bool {
        match self.state(user_id) {
            Some(state) => {
                state.deleted != DeletedState::DeletedForever
                    && (!self.entity.draft || state.role == Role::From)
            }
            None => false,
        }
    }
}

pub(crate) fn message_not_found(id: u64) -> CourseMailError {
    raise_error!(
        format!("Message with id={} was not found.", id),
        ErrorCode::ResourceNotFound
    )
}

fn role_rank(role: Role) -> u8 {
    match role {
        Role::From => 0,
        Role::To => 1,
        Role::Cc => 2,
        Role::Bcc => 3,
    }
}

/// Text of `content` as indexed for substring search.
pub(crate) fn searchable_content(content: &str, format: MessageFormat) -> String {
    match format {
        MessageFormat::Plain => normalize_text(content),
        MessageFormat::Html => normalize_text(&html_to_text(content)),
        MessageFormat::Markdown => normalize_text(&markdown_to_text(content)),
    }
}

pub(crate) fn load(r: &RTransaction, id: u64) -> CourseMailResult<Option<Message>> {
    let Some(entity) = r.get().primary::<MessageEntity>(id).map_err(internal)? else {
        return Ok(None);
    };
    let mut states: Vec<MessageUserState> = r
        .scan()
        .secondary(MessageUserStateKey::message_id)
        .map_err(internal)?
        .start_with(id)
        .map_err(internal)?
        .try_collect()
        .map_err(internal)?;
    states.sort_by_key(|s| (role_rank(s.role), s.user_id));
    let labels: Vec<MessageLabel> = r
        .scan()
        .secondary(MessageLabelKey::message_id)
        .map_err(internal)?
        .start_with(id)
        .map_err(internal)?
        .try_collect()
        .map_err(internal)?;
    let references: Vec<MessageReference> = r
        .scan()
        .secondary(MessageReferenceKey::message_id)
        .map_err(internal)?
        .start_with(id)
        .map_err(internal)?
        .try_collect()
        .map_err(internal)?;
    let references = references
        .into_iter()
        .sorted_by_key(|r| r.position)
        .map(|r| r.reference)
        .collect();
    Ok(Some(Message {
        entity,
        states,
        labels,
        references,
    }))
}

pub(crate) fn entity_for_update(rw: &RwTransaction, id: u64) -> CourseMailResult<MessageEntity> {
    rw.get()
        .primary::<MessageEntity>(id)
        .map_err(internal)?
        .ok_or_else(|| message_not_found(id))
}

pub(crate) fn row_for_update(
    rw: &RwTransaction,
    id: u64,
    user_id: u64,
) -> CourseMailResult<Option<MessageUserState>> {
    rw.get()
        .primary::<MessageUserState>(entity::user_state_pk(id, user_id))
        .map_err(internal)
}

pub(crate) fn rows_for_update(rw: &RwTransaction, id: u64) -> CourseMailResult<Vec<MessageUserState>> {
    rw.scan()
        .secondary(MessageUserStateKey::message_id)
        .map_err(internal)?
        .start_with(id)
        .map_err(internal)?
        .try_collect()
        .map_err(internal)
}

pub(crate) fn labels_for_update(rw: &RwTransaction, id: u64) -> CourseMailResult<Vec<MessageLabel>> {
    rw.scan()
        .secondary(MessageLabelKey::message_id)
        .map_err(internal)?
        .start_with(id)
        .map_err(internal)?
        .try_collect()
        .map_err(internal)
}
