// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use itertools::Itertools;
use native_db::transaction::RwTransaction;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::modules::{
    context::MailContext,
    database::{with_read_transaction, with_transaction},
    error::{internal, CourseMailResult},
    message::{
        entity::{MessageEntity, MessageEntityKey, MessageReference, MessageReferenceKey},
        labels_for_update, rows_for_update, Message,
    },
};

/// Outcome of a bulk operation that keeps going past individual failures.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BatchReport {
    pub processed: usize,
    pub failures: Vec<BatchFailure>,
}

#[derive(Clone, Debug, Serialize)]
pub struct BatchFailure {
    pub message_id: u64,
    pub error: String,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn fail(&mut self, message_id: u64, error: String) {
        self.failures.push(BatchFailure { message_id, error });
    }
}

impl Message {
    /// Removes every message of a course with its rows, labels, references
    /// and attachments, `batch_size` messages per transaction.
    pub async fn delete_course_data(ctx: &MailContext, course_id: u64) -> CourseMailResult<BatchReport> {
        let ids = course_message_ids(ctx, course_id).await?;
        let mut report = BatchReport::default();

        for chunk in ids.chunks(ctx.batch_size.max(1)) {
            let batch = chunk.to_vec();
            let removed = match with_transaction(&ctx.db, {
                let batch = batch.clone();
                move |rw| {
                    for id in &batch {
                        remove_message(rw, *id)?;
                    }
                    Ok(())
                }
            })
            .await
            {
                Ok(()) => batch,
                Err(e) => {
                    warn!(
                        "Batch purge of course_id={} failed, retrying one by one: {:#?}",
                        course_id, e
                    );
                    remove_individually(ctx, batch, &mut report).await
                }
            };

            for id in removed {
                match ctx.attachments.delete(id) {
                    Ok(()) => report.processed += 1,
                    Err(e) => {
                        error!("Failed to delete attachments of message_id={}: {:#?}", id, e);
                        report.fail(id, e.to_string());
                    }
                }
            }
        }
        ctx.courses.purge(course_id).await;
        info!(
            "Purged course_id={}: {} messages removed, {} failures",
            course_id,
            report.processed,
            report.failures.len()
        );
        Ok(report)
    }
}

async fn course_message_ids(ctx: &MailContext, course_id: u64) -> CourseMailResult<Vec<u64>> {
    with_read_transaction(&ctx.db, move |r| {
        let ids: Vec<u64> = r
            .scan()
            .secondary::<MessageEntity>(MessageEntityKey::course_id)
            .map_err(internal)?
            .start_with(course_id)
            .map_err(internal)?
            .map_ok(|e| e.id)
            .try_collect()
            .map_err(internal)?;
        Ok(ids.into_iter().sorted().collect())
    })
    .await
}

async fn remove_individually(ctx: &MailContext, batch: Vec<u64>, report: &mut BatchReport) -> Vec<u64> {
    let mut removed = Vec::with_capacity(batch.len());
    for id in batch {
        match with_transaction(&ctx.db, move |rw| remove_message(rw, id)).await {
            Ok(()) => removed.push(id),
            Err(e) => {
                error!("Failed to purge message_id={}: {:#?}", id, e);
                report.fail(id, e.to_string());
            }
        }
    }
    removed
}

pub(crate) fn remove_message(rw: &RwTransaction, id: u64) -> CourseMailResult<()> {
    for association in labels_for_update(rw, id)? {
        rw.remove(association).map_err(internal)?;
    }
    for row in rows_for_update(rw, id)? {
        rw.remove(row).map_err(internal)?;
    }
    let references: Vec<MessageReference> = rw
        .scan()
        .secondary(MessageReferenceKey::message_id)
        .map_err(internal)?
        .start_with(id)
        .map_err(internal)?
        .try_collect()
        .map_err(internal)?;
    for reference in references {
        rw.remove(reference).map_err(internal)?;
    }
    if let Some(entity) = rw.get().primary::<MessageEntity>(id).map_err(internal)? {
        rw.remove(entity).map_err(internal)?;
    }
    Ok(())
}
