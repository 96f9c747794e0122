// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use native_db::Database;
use tracing::debug;

use crate::modules::{
    common::lru::TimedLruCache, database::filter_by_secondary_key_impl, error::CourseMailResult,
    label::{Label, LabelKey},
};

/// Per-user label lists. Every label write path purges the owner's entry.
///
/// A fill that raced with a purge removes its own entry again, so a list
/// loaded before a write commits never outlives that write.
#[derive(Clone)]
pub struct LabelCache {
    cache: TimedLruCache<u64, Vec<Label>>,
    generation: Arc<AtomicU64>,
}

impl LabelCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: TimedLruCache::new(capacity, ttl),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Labels of `user_id` sorted by name, loaded from storage on a miss.
    pub async fn get(
        &self,
        database: &Arc<Database<'static>>,
        user_id: u64,
    ) -> CourseMailResult<Arc<Vec<Label>>> {
        if let Some(labels) = self.cache.get(&user_id).await {
            return Ok(labels);
        }
        debug!("Label cache miss: user_id={}", user_id);
        let generation = self.generation.load(Ordering::SeqCst);
        let mut labels: Vec<Label> =
            filter_by_secondary_key_impl(database, LabelKey::user_id, user_id).await?;
        labels.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        let labels = Arc::new(labels);
        self.fill(user_id, labels.clone(), generation).await;
        Ok(labels)
    }

    /// Stores a list loaded while the generation was `generation`.
    async fn fill(&self, user_id: u64, labels: Arc<Vec<Label>>, generation: u64) {
        self.cache.set(user_id, labels).await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Label cache fill raced a write: user_id={}", user_id);
            self.cache.purge(&user_id).await;
        }
    }

    pub async fn purge(&self, user_id: u64) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.purge(&user_id).await;
    }
}
