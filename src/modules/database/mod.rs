// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::error::{internal, CourseMailResult};
use crate::modules::label::Label;
use crate::modules::message::entity::{
    MessageEntity, MessageLabel, MessageReference, MessageUserState,
};
use db_type::{KeyOptions, ToKeyDefinition};
use itertools::Itertools;
use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use transaction::{RTransaction, RwTransaction};

pub mod manager;

pub static MAIL_MODELS: LazyLock<Models> = LazyLock::new(|| {
    let mut adapter = ModelsAdapter::new();
    adapter.register_mail_models();
    adapter.models
});

pub struct ModelsAdapter {
    pub models: Models,
}

impl ModelsAdapter {
    pub fn new() -> Self {
        ModelsAdapter {
            models: Models::new(),
        }
    }

    pub fn register_model<T: ToInput>(&mut self) {
        self.models.define::<T>().expect("failed to define model ");
    }

    pub fn register_mail_models(&mut self) {
        self.register_model::<Label>();
        self.register_model::<MessageEntity>();
        self.register_model::<MessageUserState>();
        self.register_model::<MessageLabel>();
        self.register_model::<MessageReference>();
        self.register_model::<Sequence>();
    }
}

impl Default for ModelsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Monotonic id counter, one row per entity kind.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[native_model(id = 6, version = 1)]
#[native_db]
pub struct Sequence {
    #[primary_key]
    pub name: String,
    pub value: u64,
}

/// Allocates the next id of `name` inside the caller's write transaction,
/// so the id is only consumed if the transaction commits.
pub fn next_id(rw: &RwTransaction, name: &str) -> CourseMailResult<u64> {
    let current: Option<Sequence> = rw.get().primary(name.to_string()).map_err(internal)?;
    match current {
        Some(sequence) => {
            let mut updated = sequence.clone();
            updated.value += 1;
            let value = updated.value;
            rw.update(sequence, updated).map_err(internal)?;
            Ok(value)
        }
        None => {
            rw.insert(Sequence {
                name: name.to_string(),
                value: 1,
            })
            .map_err(internal)?;
            Ok(1)
        }
    }
}

/// Runs `f` in one write transaction on the blocking pool and commits it
/// when `f` succeeds. An error drops the transaction, leaving storage unchanged.
pub async fn with_transaction<T, F>(database: &Arc<Database<'static>>, f: F) -> CourseMailResult<T>
where
    T: Send + 'static,
    F: FnOnce(&RwTransaction) -> CourseMailResult<T> + Send + 'static,
{
    let db = database.clone();
    tokio::task::spawn_blocking(move || {
        let rw = db.rw_transaction().map_err(internal)?;
        let result = f(&rw)?;
        rw.commit().map_err(internal)?;
        Ok(result)
    })
    .await?
}

/// Runs `f` against one read snapshot on the blocking pool.
pub async fn with_read_transaction<T, F>(
    database: &Arc<Database<'static>>,
    f: F,
) -> CourseMailResult<T>
where
    T: Send + 'static,
    F: FnOnce(&RTransaction) -> CourseMailResult<T> + Send + 'static,
{
    let db = database.clone();
    tokio::task::spawn_blocking(move || {
        let r = db.r_transaction().map_err(internal)?;
        f(&r)
    })
    .await?
}

pub async fn filter_by_secondary_key_impl<T: ToInput + Clone + Send + 'static>(
    database: &Arc<Database<'static>>,
    key_def: impl ToKeyDefinition<KeyOptions> + Send + 'static,
    start_with: impl ToKey + Send + 'static,
) -> CourseMailResult<Vec<T>> {
    with_read_transaction(database, move |r| {
        r.scan()
            .secondary(key_def)
            .map_err(internal)?
            .start_with(start_with)
            .map_err(internal)?
            .try_collect()
            .map_err(internal)
    })
    .await
}
