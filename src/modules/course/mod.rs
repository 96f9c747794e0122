// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::{
    modules::{
        common::lru::TimedLruCache,
        directory::{Course, Directory},
        error::{code::ErrorCode, CourseMailResult},
    },
    raise_error,
};

/// Read-through cache of courses resolved from the directory.
#[derive(Clone)]
pub struct CourseCache {
    cache: TimedLruCache<u64, Course>,
}

impl CourseCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: TimedLruCache::new(capacity, ttl),
        }
    }

    pub async fn get(&self, directory: &dyn Directory, course_id: u64) -> CourseMailResult<Arc<Course>> {
        if let Some(course) = self.cache.get(&course_id).await {
            return Ok(course);
        }
        debug!("Course cache miss: course_id={}", course_id);
        let course = directory.course(course_id)?.ok_or_else(|| {
            raise_error!(
                format!("Course with id={} was not found.", course_id),
                ErrorCode::ResourceNotFound
            )
        })?;
        let course = Arc::new(course);
        self.cache.set(course_id, course.clone()).await;
        Ok(course)
    }

    /// Called by the owner of course data whenever a course changes.
    pub async fn purge(&self, course_id: u64) {
        self.cache.purge(&course_id).await;
    }
}
