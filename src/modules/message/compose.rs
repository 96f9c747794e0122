// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use ahash::AHashSet;
use native_db::transaction::RwTransaction;
use tracing::{debug, info};

use crate::{
    modules::{
        common::text::normalize_text,
        context::MailContext,
        database::{next_id, with_transaction},
        directory::Directory,
        error::{code::ErrorCode, internal, CourseMailResult},
        message::{
            entity::{Addressee, MessageEntity, MessageReference, MessageUserState},
            entity_for_update, labels_for_update, message_not_found, row_for_update,
            searchable_content,
            state::{DeletedState, MessageFormat, Role},
            Message,
        },
    },
    raise_error, utc_now,
};

const MESSAGE_SEQUENCE: &str = "message";
const MAX_SUBJECT_CHARS: usize = 255;
const REPLY_PREFIX: &str = "Re: ";

/// Editable part of a draft.
#[derive(Clone, Debug, Default)]
pub struct DraftData {
    pub subject: String,
    pub content: String,
    pub format: MessageFormat,
    /// `None` reads the count from the attachment store.
    pub attachments: Option<u32>,
    pub addressees: Vec<Addressee>,
}

impl Message {
    /// Starts an empty draft of `sender` in `course_id`.
    pub async fn create(ctx: &MailContext, course_id: u64, sender: u64) -> CourseMailResult<Message> {
        ctx.courses.get(ctx.directory.as_ref(), course_id).await?;
        ensure_can_use_mail(ctx.directory.as_ref(), course_id, sender)?;

        let message = with_transaction(&ctx.db, move |rw| {
            insert_draft(rw, course_id, sender, String::new(), vec![], vec![])
        })
        .await?;
        debug!(
            "Draft created: id={}, course_id={}, sender={}",
            message.id(),
            course_id,
            sender
        );
        Ok(message)
    }

    /// Starts a draft answering `reference_id` on behalf of `user_id`.
    pub async fn reply(
        ctx: &MailContext,
        reference_id: u64,
        user_id: u64,
        all: bool,
    ) -> CourseMailResult<Message> {
        let reference = Self::get_for_user(ctx, user_id, reference_id).await?;
        if reference.draft() {
            return Err(raise_error!(
                format!("Message with id={} is a draft and cannot be answered.", reference_id),
                ErrorCode::InvalidState
            ));
        }
        let course_id = reference.course_id();
        ctx.courses.get(ctx.directory.as_ref(), course_id).await?;
        ensure_can_use_mail(ctx.directory.as_ref(), course_id, user_id)?;

        let subject = reply_subject(reference.subject());
        let addressees = reply_addressees(&reference, user_id, all);
        let mut references = reference.get_references().to_vec();
        references.push(reference.id());

        with_transaction(&ctx.db, move |rw| {
            insert_draft(rw, course_id, user_id, subject, addressees, references)
        })
        .await
    }

    /// Replaces the editable fields of a draft. Only its sender may edit it.
    pub async fn update_draft(
        ctx: &MailContext,
        user_id: u64,
        id: u64,
        data: DraftData,
    ) -> CourseMailResult<Message> {
        if data.subject.chars().count() > MAX_SUBJECT_CHARS {
            return Err(raise_error!(
                format!("'subject' cannot be longer than {} characters.", MAX_SUBJECT_CHARS),
                ErrorCode::InvalidParameter
            ));
        }
        validate_addressees(user_id, &data.addressees)?;
        let attachments = match data.attachments {
            Some(count) => count,
            None => ctx.attachments.count(id)?,
        };

        with_transaction(&ctx.db, move |rw| {
            let current = entity_for_update(rw, id)?;
            ensure_sender_draft(rw, &current, user_id)?;
            let time = utc_now!();
            let mut updated = current.clone();
            updated.normalized_subject = normalize_text(&data.subject);
            updated.normalized_content = searchable_content(&data.content, data.format);
            updated.subject = data.subject;
            updated.content = data.content;
            updated.format = data.format;
            updated.attachments = attachments;
            updated.addressees = data.addressees;
            updated.time = time;
            rw.update(current, updated).map_err(internal)?;
            touch_rows(rw, id, time, true)?;
            Ok(())
        })
        .await?;
        Self::get(ctx, id).await
    }

    /// Sends a draft now.
    pub async fn send(ctx: &MailContext, user_id: u64, id: u64) -> CourseMailResult<Message> {
        Self::send_at(ctx, user_id, id, utc_now!()).await
    }

    /// Sends a draft stamped with `time`. Recipient rows are created in the
    /// same transaction that clears the draft flag, so a concurrent second
    /// send observes the sent message and fails.
    pub async fn send_at(
        ctx: &MailContext,
        user_id: u64,
        id: u64,
        time: i64,
    ) -> CourseMailResult<Message> {
        let directory = ctx.directory.clone();
        let recipients = with_transaction(&ctx.db, move |rw| {
            let current = entity_for_update(rw, id)?;
            let sender = ensure_sender_draft(rw, &current, user_id)?;
            validate_for_send(directory, &current, user_id)?;

            let mut sent = current.clone();
            sent.draft = false;
            sent.time = time;
            sent.normalized_subject = normalize_text(&current.subject);
            sent.normalized_content = searchable_content(&current.content, current.format);
            sent.addressees = vec![];
            rw.update(current.clone(), sent).map_err(internal)?;

            let mut sender_row = sender.clone();
            sender_row.draft = false;
            sender_row.time = time;
            sender_row.unread = false;
            rw.update(sender, sender_row).map_err(internal)?;

            for addressee in &current.addressees {
                rw.insert(MessageUserState {
                    message_id: id,
                    user_id: addressee.user_id,
                    course_id: current.course_id,
                    draft: false,
                    time,
                    role: addressee.role,
                    unread: true,
                    starred: false,
                    deleted: DeletedState::NotDeleted,
                })
                .map_err(internal)?;
            }
            touch_labels(rw, id, time, false)?;
            Ok(current.addressees.len())
        })
        .await?;
        info!(
            "Message sent: id={}, sender={}, recipients={}",
            id, user_id, recipients
        );
        Self::get(ctx, id).await
    }
}

fn ensure_can_use_mail(directory: &dyn Directory, course_id: u64, user_id: u64) -> CourseMailResult<()> {
    if directory.can_use_mail(course_id, user_id)? {
        Ok(())
    } else {
        Err(raise_error!(
            format!(
                "User with id={} cannot use mail in course id={}.",
                user_id, course_id
            ),
            ErrorCode::MailDisabled
        ))
    }
}

fn insert_draft(
    rw: &RwTransaction,
    course_id: u64,
    sender: u64,
    subject: String,
    addressees: Vec<Addressee>,
    references: Vec<u64>,
) -> CourseMailResult<Message> {
    let id = next_id(rw, MESSAGE_SEQUENCE)?;
    let time = utc_now!();
    let entity = MessageEntity {
        id,
        course_id,
        normalized_subject: normalize_text(&subject),
        subject,
        draft: true,
        time,
        addressees,
        ..Default::default()
    };
    let row = MessageUserState {
        message_id: id,
        user_id: sender,
        course_id,
        draft: true,
        time,
        role: Role::From,
        unread: false,
        starred: false,
        deleted: DeletedState::NotDeleted,
    };
    rw.insert(entity.clone()).map_err(internal)?;
    rw.insert(row.clone()).map_err(internal)?;
    for (position, reference) in references.iter().enumerate() {
        rw.insert(MessageReference {
            message_id: id,
            position: position as u32,
            reference: *reference,
        })
        .map_err(internal)?;
    }
    Ok(Message {
        entity,
        states: vec![row],
        labels: vec![],
        references,
    })
}

/// Returns the sender row when `user_id` is the sender of a draft.
fn ensure_sender_draft(
    rw: &RwTransaction,
    entity: &MessageEntity,
    user_id: u64,
) -> CourseMailResult<MessageUserState> {
    let row = row_for_update(rw, entity.id, user_id)?
        .filter(|row| row.deleted.is_listable())
        .ok_or_else(|| message_not_found(entity.id))?;
    if row.role != Role::From {
        return Err(raise_error!(
            format!("Only the sender can change message id={}.", entity.id),
            ErrorCode::PermissionDenied
        ));
    }
    if !entity.draft {
        return Err(raise_error!(
            format!("Message with id={} has already been sent.", entity.id),
            ErrorCode::AlreadySent
        ));
    }
    Ok(row)
}

fn validate_addressees(sender: u64, addressees: &[Addressee]) -> CourseMailResult<()> {
    let mut seen = AHashSet::with_capacity(addressees.len());
    for addressee in addressees {
        if addressee.role == Role::From {
            return Err(raise_error!(
                "Recipients cannot have the 'from' role.".into(),
                ErrorCode::InvalidParameter
            ));
        }
        if addressee.user_id == sender {
            return Err(raise_error!(
                "The sender cannot be a recipient of their own message.".into(),
                ErrorCode::InvalidParameter
            ));
        }
        if !seen.insert(addressee.user_id) {
            return Err(raise_error!(
                format!("User with id={} is listed more than once.", addressee.user_id),
                ErrorCode::InvalidParameter
            ));
        }
    }
    Ok(())
}

fn validate_for_send(
    directory: Arc<dyn Directory>,
    entity: &MessageEntity,
    sender: u64,
) -> CourseMailResult<()> {
    if entity.addressees.is_empty() {
        return Err(raise_error!(
            format!("Message with id={} has no recipients.", entity.id),
            ErrorCode::MissingRecipients
        ));
    }
    if entity.subject.trim().is_empty() {
        return Err(raise_error!(
            "'subject' cannot be empty.".into(),
            ErrorCode::InvalidParameter
        ));
    }
    ensure_can_use_mail(directory.as_ref(), entity.course_id, sender)?;
    for addressee in &entity.addressees {
        let active = directory
            .participant(entity.course_id, addressee.user_id)?
            .is_some_and(|p| p.is_active());
        if !active {
            return Err(raise_error!(
                format!(
                    "User with id={} is not an active participant of course id={}.",
                    addressee.user_id, entity.course_id
                ),
                ErrorCode::InvalidParameter
            ));
        }
    }
    Ok(())
}

/// Copies `time` and `draft` onto every state row and label association of a message.
fn touch_rows(rw: &RwTransaction, id: u64, time: i64, draft: bool) -> CourseMailResult<()> {
    for row in super::rows_for_update(rw, id)? {
        let mut updated = row.clone();
        updated.time = time;
        updated.draft = draft;
        rw.update(row, updated).map_err(internal)?;
    }
    touch_labels(rw, id, time, draft)
}

fn touch_labels(rw: &RwTransaction, id: u64, time: i64, draft: bool) -> CourseMailResult<()> {
    for association in labels_for_update(rw, id)? {
        let mut updated = association.clone();
        updated.time = time;
        updated.draft = draft;
        rw.update(association, updated).map_err(internal)?;
    }
    Ok(())
}

pub(crate) fn reply_subject(subject: &str) -> String {
    let trimmed = subject.trim();
    let prefixed = trimmed
        .get(..REPLY_PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(REPLY_PREFIX));
    if prefixed {
        trimmed.to_string()
    } else {
        format!("{}{}", REPLY_PREFIX, trimmed)
    }
}

/// Recipients of a reply by `user_id`. The author of the reference is
/// answered, or its TO list when the responder wrote it. Reply-all adds the
/// other TO and CC recipients as CC. BCC recipients are never copied.
pub(crate) fn reply_addressees(reference: &Message, user_id: u64, all: bool) -> Vec<Addressee> {
    let sender = reference.sender();
    let mut seen = AHashSet::new();
    seen.insert(user_id);
    let mut addressees = Vec::new();

    let primary = if sender == user_id {
        reference.recipients_with_role(Role::To)
    } else {
        vec![sender]
    };
    for id in primary {
        if seen.insert(id) {
            addressees.push(Addressee::new(id, Role::To));
        }
    }
    if all {
        let others = reference
            .recipients()
            .into_iter()
            .filter(|a| matches!(a.role, Role::To | Role::Cc));
        for addressee in others {
            if seen.insert(addressee.user_id) {
                addressees.push(Addressee::new(addressee.user_id, Role::Cc));
            }
        }
    }
    addressees
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_subject_is_prefixed_once() {
        assert_eq!(reply_subject("Homework"), "Re: Homework");
        assert_eq!(reply_subject("Re: Homework"), "Re: Homework");
        assert_eq!(reply_subject("RE: Homework"), "RE: Homework");
        assert_eq!(reply_subject("  "), "Re: ");
        assert_eq!(reply_subject("Ré"), "Re: Ré");
    }

    #[test]
    fn addressees_reject_sender_and_duplicates() {
        assert!(validate_addressees(1, &[Addressee::new(2, Role::To)]).is_ok());
        assert!(validate_addressees(1, &[Addressee::new(1, Role::To)]).is_err());
        assert!(validate_addressees(1, &[Addressee::new(2, Role::From)]).is_err());
        assert!(validate_addressees(
            1,
            &[Addressee::new(2, Role::To), Addressee::new(2, Role::Cc)]
        )
        .is_err());
    }
}
