// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;
use std::time::Duration;

use native_db::Database;

use crate::modules::{
    course::CourseCache, directory::Directory, error::CourseMailResult, label::cache::LabelCache,
    settings::cli::Settings,
};

/// Binary attachment storage keyed by message id. The mail core only keeps counts.
pub trait AttachmentStore: Send + Sync {
    fn count(&self, message_id: u64) -> CourseMailResult<u32>;

    fn delete(&self, message_id: u64) -> CourseMailResult<()>;
}

/// Attachment store for deployments without file storage.
pub struct NoAttachments;

impl AttachmentStore for NoAttachments {
    fn count(&self, _message_id: u64) -> CourseMailResult<u32> {
        Ok(0)
    }

    fn delete(&self, _message_id: u64) -> CourseMailResult<()> {
        Ok(())
    }
}

/// Collaborators shared by every mail operation of one process.
#[derive(Clone)]
pub struct MailContext {
    pub db: Arc<Database<'static>>,
    pub directory: Arc<dyn Directory>,
    pub attachments: Arc<dyn AttachmentStore>,
    pub courses: CourseCache,
    pub labels: LabelCache,
    pub batch_size: usize,
    pub page_size: usize,
}

impl MailContext {
    pub fn new(
        db: Arc<Database<'static>>,
        directory: Arc<dyn Directory>,
        settings: &Settings,
    ) -> Self {
        let capacity = settings.coursemail_cache_capacity as usize;
        let ttl = Duration::from_secs(settings.coursemail_cache_ttl_secs);
        Self {
            db,
            directory,
            attachments: Arc::new(NoAttachments),
            courses: CourseCache::new(capacity, ttl),
            labels: LabelCache::new(capacity, ttl),
            batch_size: settings.coursemail_batch_size as usize,
            page_size: settings.coursemail_search_page_size as usize,
        }
    }

    pub fn with_attachments(mut self, attachments: Arc<dyn AttachmentStore>) -> Self {
        self.attachments = attachments;
        self
    }
}
