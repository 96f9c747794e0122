// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::ops::Bound;
use std::sync::Arc;

use ahash::AHashMap;
use itertools::{Either, Itertools};
use native_db::transaction::RTransaction;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    modules::{
        common::text::normalize_text,
        context::MailContext,
        database::with_read_transaction,
        directory::Directory,
        error::{code::ErrorCode, internal, CourseMailResult},
        label::Label,
        message::{
            entity::{
                timeline_key, user_state_pk, MessageLabel, MessageLabelKey, MessageUserState,
                MessageUserStateKey,
            },
            load, message_not_found,
            state::{DeletedState, Role},
        },
    },
    raise_error,
};

pub use cursor::Cursor;

pub mod cursor;

const MAX_PAGE_SIZE: usize = 1000;

/// Filter over the messages visible to one user.
///
/// Results are ordered by `(time, id)`, newest first unless `reverse` is set.
/// Rows deleted forever or with deleted content are never returned.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MessageSearch {
    pub user_id: u64,
    /// Empty matches every role.
    pub roles: Vec<Role>,
    pub draft: Option<bool>,
    pub unread: Option<bool>,
    pub starred: Option<bool>,
    /// `Some(true)` lists the trash, otherwise messages not deleted.
    pub deleted: Option<bool>,
    pub course_id: Option<u64>,
    pub label_id: Option<u64>,
    /// Matched against subject and content, ignoring case and accents.
    pub content: String,
    pub sender_name: String,
    pub recipient_name: String,
    pub with_files_only: bool,
    /// Inclusive upper bound on message time.
    pub max_time: Option<i64>,
    /// Results start strictly after this position in search order.
    pub start: Option<Cursor>,
    /// Results stop strictly before this position in search order.
    pub stop: Option<Cursor>,
    /// Like `start`, resolved from a message id.
    pub start_id: Option<u64>,
    /// Like `stop`, resolved from a message id.
    pub stop_id: Option<u64>,
    pub reverse: bool,
}

/// One page of search results. Searching again with `start = next`
/// continues the sequence.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub ids: Vec<u64>,
    pub next: Option<Cursor>,
}

impl MessageSearch {
    pub fn new(user_id: u64) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }

    pub fn inbox(user_id: u64) -> Self {
        Self {
            roles: vec![Role::To, Role::Cc, Role::Bcc],
            ..Self::new(user_id)
        }
    }

    pub fn sent(user_id: u64) -> Self {
        Self {
            roles: vec![Role::From],
            draft: Some(false),
            ..Self::new(user_id)
        }
    }

    pub fn drafts(user_id: u64) -> Self {
        Self {
            roles: vec![Role::From],
            draft: Some(true),
            ..Self::new(user_id)
        }
    }

    pub fn trash(user_id: u64) -> Self {
        Self {
            deleted: Some(true),
            ..Self::new(user_id)
        }
    }

    /// Up to `limit` matching ids from the current start position.
    pub async fn search(&self, ctx: &MailContext, limit: usize) -> CourseMailResult<SearchPage> {
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(raise_error!(
                format!("limit must be between 1 and {}.", MAX_PAGE_SIZE),
                ErrorCode::InvalidParameter
            ));
        }
        let matches = self.run(ctx, Some(limit)).await?;
        let next = if matches.len() == limit {
            matches.last().copied()
        } else {
            None
        };
        Ok(SearchPage {
            ids: matches.into_iter().map(|c| c.id).collect(),
            next,
        })
    }

    /// First page sized by the configured default page size.
    pub async fn page(&self, ctx: &MailContext) -> CourseMailResult<SearchPage> {
        self.search(ctx, ctx.page_size.clamp(1, MAX_PAGE_SIZE)).await
    }

    /// Every matching id, in search order.
    pub async fn all(&self, ctx: &MailContext) -> CourseMailResult<Vec<u64>> {
        Ok(self.run(ctx, None).await?.into_iter().map(|c| c.id).collect())
    }

    pub async fn count(&self, ctx: &MailContext) -> CourseMailResult<usize> {
        Ok(self.run(ctx, None).await?.len())
    }

    /// Walks the results `batch_size` ids at a time, each batch read from
    /// a fresh snapshot.
    pub fn batches(&self, ctx: &MailContext, batch_size: usize) -> SearchBatches {
        SearchBatches {
            ctx: ctx.clone(),
            search: self.clone(),
            batch_size: batch_size.clamp(1, MAX_PAGE_SIZE),
            done: false,
        }
    }

    async fn run(&self, ctx: &MailContext, limit: Option<usize>) -> CourseMailResult<Vec<Cursor>> {
        if self.is_impossible() {
            return Ok(vec![]);
        }
        let search = self.clone();
        let directory = ctx.directory.clone();
        let matches =
            with_read_transaction(&ctx.db, move |r| execute(r, directory, &search, limit)).await?;
        debug!(
            "Message search: user_id={}, matches={}",
            self.user_id,
            matches.len()
        );
        Ok(matches)
    }

    /// A draft only ever has a FROM row.
    fn is_impossible(&self) -> bool {
        self.draft == Some(true) && !self.roles.is_empty() && !self.roles.contains(&Role::From)
    }

    fn wanted_state(&self) -> DeletedState {
        if self.deleted == Some(true) {
            DeletedState::Deleted
        } else {
            DeletedState::NotDeleted
        }
    }

    fn matches_row(&self, row: &MessageUserState) -> bool {
        (self.roles.is_empty() || self.roles.contains(&row.role))
            && self.draft.is_none_or(|draft| row.draft == draft)
            && self.unread.is_none_or(|unread| row.unread == unread)
            && self.starred.is_none_or(|starred| row.starred == starred)
            && row.deleted == self.wanted_state()
            && self.course_id.is_none_or(|course_id| row.course_id == course_id)
            && self.max_time.is_none_or(|max_time| row.time <= max_time)
    }

    /// Whether `position` lies inside the start/stop window of the current direction.
    fn in_window(&self, position: Cursor, start: Option<Cursor>, stop: Option<Cursor>) -> bool {
        let after_start = start.is_none_or(|start| {
            if self.reverse {
                position > start
            } else {
                position < start
            }
        });
        let before_stop = stop.is_none_or(|stop| {
            if self.reverse {
                position < stop
            } else {
                position > stop
            }
        });
        after_start && before_stop
    }

    /// Key range of the viewer's timeline strictly inside the window.
    fn timeline_bounds(
        &self,
        start: Option<Cursor>,
        stop: Option<Cursor>,
    ) -> (Bound<String>, Bound<String>) {
        let (lower, upper) = if self.reverse {
            (start, stop)
        } else {
            (stop, start)
        };
        let key = |cursor: Cursor| timeline_key(self.user_id, cursor.time, cursor.id);
        let lower = match lower {
            Some(cursor) => Bound::Excluded(key(cursor)),
            None => Bound::Included(timeline_key(self.user_id, i64::MIN, 0)),
        };
        let upper = match upper {
            Some(cursor) => Bound::Excluded(key(cursor)),
            None => Bound::Included(timeline_key(self.user_id, i64::MAX, u64::MAX)),
        };
        (lower, upper)
    }
}

/// Batched walk over the results of a [`MessageSearch`].
pub struct SearchBatches {
    ctx: MailContext,
    search: MessageSearch,
    batch_size: usize,
    done: bool,
}

impl SearchBatches {
    pub async fn next(&mut self) -> CourseMailResult<Option<Vec<u64>>> {
        if self.done {
            return Ok(None);
        }
        let page = self.search.search(&self.ctx, self.batch_size).await?;
        match page.next {
            Some(next) => {
                self.search.start = Some(next);
                self.search.start_id = None;
            }
            None => self.done = true,
        }
        if page.ids.is_empty() {
            return Ok(None);
        }
        Ok(Some(page.ids))
    }
}

fn execute(
    r: &RTransaction,
    directory: Arc<dyn Directory>,
    search: &MessageSearch,
    limit: Option<usize>,
) -> CourseMailResult<Vec<Cursor>> {
    let start = tighter(
        search,
        search.start,
        resolve_cursor(r, search.user_id, search.start_id)?,
        true,
    );
    let stop = tighter(search, search.stop, resolve_cursor(r, search.user_id, search.stop_id)?, false);

    let mut filter = MessageFilter::new(search, directory);

    if let Some(label_id) = search.label_id {
        let rows = labelled_rows(r, search.user_id, label_id)?
            .into_iter()
            .filter(|row| search.in_window(Cursor::new(row.time, row.message_id), start, stop))
            .sorted_by_key(|row| Cursor::new(row.time, row.message_id));
        let rows = if search.reverse {
            Either::Left(rows)
        } else {
            Either::Right(rows.rev())
        };
        return collect_matches(r, &mut filter, rows.map(Ok), limit);
    }

    // The viewer's rows in (time, id) order, bounded by the window.
    let scan = r.scan();
    let timeline = scan
        .secondary::<MessageUserState>(MessageUserStateKey::timeline)
        .map_err(internal)?;
    let rows = timeline
        .range(search.timeline_bounds(start, stop))
        .map_err(internal)?;
    let rows = if search.reverse {
        Either::Left(rows)
    } else {
        Either::Right(rows.rev())
    };
    collect_matches(r, &mut filter, rows.map(|row| row.map_err(internal)), limit)
}

fn collect_matches(
    r: &RTransaction,
    filter: &mut MessageFilter,
    rows: impl Iterator<Item = CourseMailResult<MessageUserState>>,
    limit: Option<usize>,
) -> CourseMailResult<Vec<Cursor>> {
    let mut matches = Vec::new();
    for row in rows {
        if limit.is_some_and(|limit| matches.len() >= limit) {
            break;
        }
        let row = row?;
        if filter.search.matches_row(&row) && filter.accepts(r, &row)? {
            matches.push(Cursor::new(row.time, row.message_id));
        }
    }
    Ok(matches)
}

/// Of two bounds, keeps the one excluding more results in the current direction.
fn tighter(
    search: &MessageSearch,
    a: Option<Cursor>,
    b: Option<Cursor>,
    is_start: bool,
) -> Option<Cursor> {
    match (a, b) {
        (Some(a), Some(b)) => {
            let keep_smaller = search.reverse != is_start;
            Some(if keep_smaller { a.min(b) } else { a.max(b) })
        }
        (a, b) => a.or(b),
    }
}

/// Positions a window bound on the viewer's own copy of message `id`.
fn resolve_cursor(
    r: &RTransaction,
    user_id: u64,
    id: Option<u64>,
) -> CourseMailResult<Option<Cursor>> {
    let Some(id) = id else {
        return Ok(None);
    };
    let row: MessageUserState = r
        .get()
        .primary(user_state_pk(id, user_id))
        .map_err(internal)?
        .filter(|row: &MessageUserState| row.deleted.is_listable())
        .ok_or_else(|| message_not_found(id))?;
    Ok(Some(Cursor::new(row.time, row.message_id)))
}

/// Rows of `user_id` for messages carrying one of their own labels.
fn labelled_rows(
    r: &RTransaction,
    user_id: u64,
    label_id: u64,
) -> CourseMailResult<Vec<MessageUserState>> {
    let owned = r
        .get()
        .primary::<Label>(label_id)
        .map_err(internal)?
        .is_some_and(|label| label.user_id == user_id);
    if !owned {
        return Ok(vec![]);
    }
    let associations: Vec<MessageLabel> = r
        .scan()
        .secondary(MessageLabelKey::label_id)
        .map_err(internal)?
        .start_with(label_id)
        .map_err(internal)?
        .try_collect()
        .map_err(internal)?;
    let mut rows = Vec::with_capacity(associations.len());
    for association in associations {
        let row: Option<MessageUserState> = r
            .get()
            .primary(user_state_pk(association.message_id, user_id))
            .map_err(internal)?;
        rows.extend(row);
    }
    Ok(rows)
}

/// Filters that need the message row or participant names.
struct MessageFilter<'a> {
    search: &'a MessageSearch,
    directory: Arc<dyn Directory>,
    content: String,
    sender_name: String,
    recipient_name: String,
    names: AHashMap<u64, String>,
}

impl<'a> MessageFilter<'a> {
    fn new(search: &'a MessageSearch, directory: Arc<dyn Directory>) -> Self {
        Self {
            search,
            directory,
            content: normalize_text(&search.content),
            sender_name: normalize_text(&search.sender_name),
            recipient_name: normalize_text(&search.recipient_name),
            names: AHashMap::new(),
        }
    }

    fn is_trivial(&self) -> bool {
        !self.search.with_files_only
            && self.content.is_empty()
            && self.sender_name.is_empty()
            && self.recipient_name.is_empty()
    }

    fn accepts(&mut self, r: &RTransaction, row: &MessageUserState) -> CourseMailResult<bool> {
        if self.is_trivial() {
            return Ok(true);
        }
        let Some(message) = load(r, row.message_id)? else {
            return Ok(false);
        };
        if self.search.with_files_only && message.attachments() == 0 {
            return Ok(false);
        }
        if !self.content.is_empty()
            && !message.normalized_subject().contains(&self.content)
            && !message.normalized_content().contains(&self.content)
        {
            return Ok(false);
        }
        if !self.sender_name.is_empty() {
            let sender = self.name_of(message.sender())?;
            if !sender.contains(&self.sender_name) {
                return Ok(false);
            }
        }
        if !self.recipient_name.is_empty() {
            let mut found = false;
            for recipient in message.visible_recipients(self.search.user_id) {
                if self.name_of(recipient.user_id)?.contains(&self.recipient_name) {
                    found = true;
                    break;
                }
            }
            if !found {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn name_of(&mut self, user_id: u64) -> CourseMailResult<String> {
        if let Some(name) = self.names.get(&user_id) {
            return Ok(name.clone());
        }
        let name = self
            .directory
            .user(user_id)?
            .map(|user| normalize_text(&user.fullname()))
            .unwrap_or_default();
        self.names.insert(user_id, name.clone());
        Ok(name)
    }
}
