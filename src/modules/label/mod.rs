// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use itertools::Itertools;
use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use transaction::RwTransaction;

use crate::{
    modules::{
        context::MailContext,
        database::{next_id, with_read_transaction, with_transaction},
        error::{code::ErrorCode, internal, CourseMailError, CourseMailResult},
        message::entity::{MessageLabel, MessageLabelKey},
        utils::key_segment,
    },
    raise_error, validate_text,
};

pub mod cache;

const LABEL_SEQUENCE: &str = "label";
const MAX_NAME_CHARS: usize = 100;

/// Accepted label colors. An empty color means the default one.
pub const LABEL_COLORS: [&str; 10] = [
    "blue", "indigo", "purple", "pink", "red", "orange", "yellow", "green", "teal", "cyan",
];

/// A private tag owned by one user.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[native_model(id = 1, version = 1)]
#[native_db(primary_key(pk -> u64), secondary_key(owner_name -> String, unique))]
pub struct Label {
    pub id: u64,
    #[secondary_key]
    pub user_id: u64,
    pub name: String,
    pub color: String,
}

/// Partial change applied by [`Label::update`]. `None` keeps the current value.
#[derive(Clone, Debug, Default)]
pub struct LabelUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
}

impl Label {
    fn pk(&self) -> u64 {
        self.id
    }

    fn owner_name(&self) -> String {
        owner_name_key(self.user_id, &self.name)
    }

    pub async fn create(
        ctx: &MailContext,
        user_id: u64,
        name: &str,
        color: &str,
    ) -> CourseMailResult<Label> {
        let name = validate_text!(name, "name", MAX_NAME_CHARS)?;
        let color = validate_color(color)?;
        ensure_user(ctx, user_id)?;

        let label = with_transaction(&ctx.db, move |rw| {
            ensure_name_available(rw, user_id, &name, None)?;
            let label = Label {
                id: next_id(rw, LABEL_SEQUENCE)?,
                user_id,
                name,
                color,
            };
            rw.insert(label.clone()).map_err(internal)?;
            Ok(label)
        })
        .await?;
        ctx.labels.purge(user_id).await;
        debug!("Label created: id={}, user_id={}", label.id, user_id);
        Ok(label)
    }

    pub async fn get(ctx: &MailContext, id: u64) -> CourseMailResult<Label> {
        with_read_transaction(&ctx.db, move |r| {
            r.get()
                .primary::<Label>(id)
                .map_err(internal)?
                .ok_or_else(|| label_not_found(id))
        })
        .await
    }

    /// Labels owned by `user_id`, sorted by name.
    pub async fn get_by_user(ctx: &MailContext, user_id: u64) -> CourseMailResult<Arc<Vec<Label>>> {
        ctx.labels.get(&ctx.db, user_id).await
    }

    pub async fn rename(
        ctx: &MailContext,
        user_id: u64,
        id: u64,
        name: &str,
    ) -> CourseMailResult<Label> {
        let update = LabelUpdate {
            name: Some(name.to_string()),
            color: None,
        };
        Self::update(ctx, user_id, id, update).await
    }

    pub async fn recolor(
        ctx: &MailContext,
        user_id: u64,
        id: u64,
        color: &str,
    ) -> CourseMailResult<Label> {
        let update = LabelUpdate {
            name: None,
            color: Some(color.to_string()),
        };
        Self::update(ctx, user_id, id, update).await
    }

    /// Owner-only change of name and/or color.
    pub async fn update(
        ctx: &MailContext,
        user_id: u64,
        id: u64,
        update: LabelUpdate,
    ) -> CourseMailResult<Label> {
        let name = update
            .name
            .as_deref()
            .map(|name| validate_text!(name, "name", MAX_NAME_CHARS))
            .transpose()?;
        let color = update.color.as_deref().map(validate_color).transpose()?;

        let label = with_transaction(&ctx.db, move |rw| {
            let current = load_owned(rw, user_id, id)?;
            let mut updated = current.clone();
            if let Some(name) = name {
                ensure_name_available(rw, user_id, &name, Some(id))?;
                updated.name = name;
            }
            if let Some(color) = color {
                updated.color = color;
            }
            if updated != current {
                rw.update(current, updated.clone()).map_err(internal)?;
            }
            Ok(updated)
        })
        .await?;
        ctx.labels.purge(user_id).await;
        Ok(label)
    }

    /// Removes the label and every message association using it.
    /// Messages themselves are untouched.
    pub async fn delete(ctx: &MailContext, user_id: u64, id: u64) -> CourseMailResult<()> {
        let detached = with_transaction(&ctx.db, move |rw| {
            let label = load_owned(rw, user_id, id)?;
            let detached = detach_label(rw, id)?;
            rw.remove(label).map_err(internal)?;
            Ok(detached)
        })
        .await?;
        ctx.labels.purge(user_id).await;
        debug!(
            "Label deleted: id={}, user_id={}, detached={}",
            id, user_id, detached
        );
        Ok(())
    }

    /// Removes every label of `user_id` with its associations. Returns the
    /// number of labels removed.
    pub async fn delete_all_for_user(ctx: &MailContext, user_id: u64) -> CourseMailResult<usize> {
        let removed = with_transaction(&ctx.db, move |rw| {
            let labels: Vec<Label> = rw
                .scan()
                .secondary(LabelKey::user_id)
                .map_err(internal)?
                .start_with(user_id)
                .map_err(internal)?
                .try_collect()
                .map_err(internal)?;
            let removed = labels.len();
            for label in labels {
                detach_label(rw, label.id)?;
                rw.remove(label).map_err(internal)?;
            }
            Ok(removed)
        })
        .await?;
        ctx.labels.purge(user_id).await;
        info!("Removed {} labels of user_id={}", removed, user_id);
        Ok(removed)
    }
}

fn owner_name_key(user_id: u64, name: &str) -> String {
    format!("{}_{}", key_segment(user_id), name)
}

fn label_not_found(id: u64) -> CourseMailError {
    raise_error!(
        format!("Label with id={} was not found.", id),
        ErrorCode::ResourceNotFound
    )
}

fn validate_color(color: &str) -> CourseMailResult<String> {
    let color = color.trim();
    if color.is_empty() || LABEL_COLORS.contains(&color) {
        Ok(color.to_string())
    } else {
        Err(raise_error!(
            format!(
                "Unknown label color '{}'. Expected one of: {}.",
                color,
                LABEL_COLORS.join(", ")
            ),
            ErrorCode::InvalidParameter
        ))
    }
}

fn ensure_user(ctx: &MailContext, user_id: u64) -> CourseMailResult<()> {
    match ctx.directory.user(user_id)? {
        Some(user) if !user.deleted => Ok(()),
        _ => Err(raise_error!(
            format!("User with id={} was not found.", user_id),
            ErrorCode::ResourceNotFound
        )),
    }
}

fn ensure_name_available(
    rw: &RwTransaction,
    user_id: u64,
    name: &str,
    except: Option<u64>,
) -> CourseMailResult<()> {
    let existing: Option<Label> = rw
        .get()
        .secondary(LabelKey::owner_name, owner_name_key(user_id, name))
        .map_err(internal)?;
    match existing {
        Some(label) if Some(label.id) != except => Err(raise_error!(
            format!("A label named '{}' already exists.", name),
            ErrorCode::NameConflict
        )),
        _ => Ok(()),
    }
}

/// Loads a label inside a write transaction, checking that `user_id` owns it.
pub(crate) fn load_owned(rw: &RwTransaction, user_id: u64, id: u64) -> CourseMailResult<Label> {
    let label = rw
        .get()
        .primary::<Label>(id)
        .map_err(internal)?
        .ok_or_else(|| label_not_found(id))?;
    if label.user_id != user_id {
        return Err(raise_error!(
            format!("Label with id={} belongs to another user.", id),
            ErrorCode::PermissionDenied
        ));
    }
    Ok(label)
}

fn detach_label(rw: &RwTransaction, label_id: u64) -> CourseMailResult<usize> {
    let associations: Vec<MessageLabel> = rw
        .scan()
        .secondary(MessageLabelKey::label_id)
        .map_err(internal)?
        .start_with(label_id)
        .map_err(internal)?
        .try_collect()
        .map_err(internal)?;
    let count = associations.len();
    for association in associations {
        rw.remove(association).map_err(internal)?;
    }
    Ok(count)
}
