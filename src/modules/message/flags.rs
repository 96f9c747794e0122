// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeSet;

use native_db::transaction::RwTransaction;
use tracing::debug;

use crate::{
    modules::{
        context::MailContext,
        database::with_transaction,
        error::{code::ErrorCode, internal, CourseMailResult},
        label::load_owned,
        message::{
            entity::{MessageLabel, MessageUserState},
            entity_for_update, labels_for_update, row_for_update,
            rows_for_update,
            state::DeletedState,
            Message,
        },
    },
    raise_error,
};

impl Message {
    pub async fn set_unread(
        ctx: &MailContext,
        user_id: u64,
        id: u64,
        unread: bool,
    ) -> CourseMailResult<()> {
        update_row(ctx, user_id, id, move |row| {
            if row.unread == unread {
                return false;
            }
            row.unread = unread;
            true
        })
        .await
    }

    pub async fn set_starred(
        ctx: &MailContext,
        user_id: u64,
        id: u64,
        starred: bool,
    ) -> CourseMailResult<()> {
        update_row(ctx, user_id, id, move |row| {
            if row.starred == starred {
                return false;
            }
            row.starred = starred;
            true
        })
        .await
    }

    /// Moves the user's copy to `state`. Only the sender copy may have its
    /// content deleted; the stored text is blanked once no participant keeps
    /// a live copy.
    pub async fn set_deleted(
        ctx: &MailContext,
        user_id: u64,
        id: u64,
        state: DeletedState,
    ) -> CourseMailResult<()> {
        with_transaction(&ctx.db, move |rw| {
            let row = existing_row(rw, id, user_id)?;
            row.deleted.check_transition(state, row.role)?;
            if row.deleted == state {
                return Ok(());
            }
            let mut updated = row.clone();
            updated.deleted = state;
            rw.update(row, updated).map_err(internal)?;
            if matches!(
                state,
                DeletedState::DeletedForever | DeletedState::DeletedContent
            ) && !has_live_copy(rw, id)?
            {
                scrub_content(rw, id)?;
            }
            Ok(())
        })
        .await?;
        debug!(
            "Deleted state changed: message_id={}, user_id={}, state={:?}",
            id, user_id, state
        );
        Ok(())
    }

    /// Replaces the labels `user_id` attached to the message with `label_ids`.
    pub async fn set_labels(
        ctx: &MailContext,
        user_id: u64,
        id: u64,
        label_ids: &[u64],
    ) -> CourseMailResult<()> {
        let wanted: BTreeSet<u64> = label_ids.iter().copied().collect();
        with_transaction(&ctx.db, move |rw| {
            let row = visible_row(rw, id, user_id)?;
            for label_id in &wanted {
                load_owned(rw, user_id, *label_id)?;
            }
            for association in labels_for_update(rw, id)? {
                if association.user_id != user_id {
                    continue;
                }
                if !wanted.contains(&association.label_id) {
                    rw.remove(association).map_err(internal)?;
                }
            }
            let current: BTreeSet<u64> = labels_for_update(rw, id)?
                .into_iter()
                .filter(|l| l.user_id == user_id)
                .map(|l| l.label_id)
                .collect();
            for label_id in wanted.difference(&current) {
                rw.insert(MessageLabel::for_row(&row, *label_id))
                    .map_err(internal)?;
            }
            Ok(())
        })
        .await
    }
}

/// Applies `change` to the caller's visible row. `change` returns whether
/// anything was modified.
async fn update_row<F>(ctx: &MailContext, user_id: u64, id: u64, change: F) -> CourseMailResult<()>
where
    F: FnOnce(&mut MessageUserState) -> bool + Send + 'static,
{
    with_transaction(&ctx.db, move |rw| {
        let row = visible_row(rw, id, user_id)?;
        let mut updated = row.clone();
        if change(&mut updated) {
            rw.update(row, updated).map_err(internal)?;
        }
        Ok(())
    })
    .await
}

fn existing_row(rw: &RwTransaction, id: u64, user_id: u64) -> CourseMailResult<MessageUserState> {
    row_for_update(rw, id, user_id)?.ok_or_else(|| {
        raise_error!(
            format!(
                "User with id={} has no copy of message id={}.",
                user_id, id
            ),
            ErrorCode::ResourceNotFound
        )
    })
}

/// The caller's row unless it has been deleted forever.
fn visible_row(rw: &RwTransaction, id: u64, user_id: u64) -> CourseMailResult<MessageUserState> {
    let row = existing_row(rw, id, user_id)?;
    if row.deleted == DeletedState::DeletedForever {
        return Err(raise_error!(
            format!(
                "Message id={} was deleted forever by user id={}.",
                id, user_id
            ),
            ErrorCode::ResourceNotFound
        ));
    }
    Ok(row)
}

fn has_live_copy(rw: &RwTransaction, id: u64) -> CourseMailResult<bool> {
    Ok(rows_for_update(rw, id)?.iter().any(|row| row.deleted.is_listable()))
}

fn scrub_content(rw: &RwTransaction, id: u64) -> CourseMailResult<()> {
    let current = entity_for_update(rw, id)?;
    let mut scrubbed = current.clone();
    scrubbed.subject.clear();
    scrubbed.content.clear();
    scrubbed.normalized_subject.clear();
    scrubbed.normalized_content.clear();
    rw.update(current, scrubbed).map_err(internal)?;
    Ok(())
}
