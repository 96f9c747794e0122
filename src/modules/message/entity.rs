// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};

use crate::modules::{
    message::state::{DeletedState, MessageFormat, Role},
    utils::key_segment,
};

/// A recipient recorded on a draft until it is sent.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Addressee {
    pub user_id: u64,
    pub role: Role,
}

impl Addressee {
    pub fn new(user_id: u64, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// Message metadata shared by every participant.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[native_model(id = 2, version = 1)]
#[native_db(primary_key(pk -> u64))]
pub struct MessageEntity {
    pub id: u64,
    #[secondary_key]
    pub course_id: u64,
    pub subject: String,
    pub content: String,
    pub format: MessageFormat,
    pub attachments: u32,
    pub draft: bool,
    /// Creation time while draft, send time afterwards (unix millis).
    pub time: i64,
    pub normalized_subject: String,
    pub normalized_content: String,
    /// Pending recipients of a draft. Cleared on send.
    pub addressees: Vec<Addressee>,
}

impl MessageEntity {
    fn pk(&self) -> u64 {
        self.id
    }
}

/// State of one participant's copy of a message.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[native_model(id = 3, version = 1)]
#[native_db(primary_key(pk -> String), secondary_key(timeline -> String))]
pub struct MessageUserState {
    #[secondary_key]
    pub message_id: u64,
    #[secondary_key]
    pub user_id: u64,
    #[secondary_key]
    pub course_id: u64,
    pub draft: bool,
    pub time: i64,
    pub role: Role,
    pub unread: bool,
    pub starred: bool,
    pub deleted: DeletedState,
}

impl MessageUserState {
    fn pk(&self) -> String {
        user_state_pk(self.message_id, self.user_id)
    }

    fn timeline(&self) -> String {
        timeline_key(self.user_id, self.time, self.message_id)
    }
}

pub fn user_state_pk(message_id: u64, user_id: u64) -> String {
    format!("{}_{}", key_segment(message_id), key_segment(user_id))
}

/// Orders a user's rows by `(time, message_id)`.
pub fn timeline_key(user_id: u64, time: i64, message_id: u64) -> String {
    // Flipping the sign bit keeps negative times before positive ones.
    let time = (time as u64) ^ (1 << 63);
    format!(
        "{}_{}_{}",
        key_segment(user_id),
        key_segment(time),
        key_segment(message_id)
    )
}

/// Association of a user's label with a message, with the columns
/// label views filter on copied from the user's state row.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[native_model(id = 4, version = 1)]
#[native_db(primary_key(pk -> String))]
pub struct MessageLabel {
    #[secondary_key]
    pub message_id: u64,
    #[secondary_key]
    pub label_id: u64,
    #[secondary_key]
    pub user_id: u64,
    pub course_id: u64,
    pub draft: bool,
    pub time: i64,
}

impl MessageLabel {
    fn pk(&self) -> String {
        format!(
            "{}_{}",
            key_segment(self.message_id),
            key_segment(self.label_id)
        )
    }

    pub fn for_row(row: &MessageUserState, label_id: u64) -> Self {
        Self {
            message_id: row.message_id,
            label_id,
            user_id: row.user_id,
            course_id: row.course_id,
            draft: row.draft,
            time: row.time,
        }
    }
}

/// One ancestor of a message in its reply thread. `position` 0 is the oldest.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[native_model(id = 5, version = 1)]
#[native_db(primary_key(pk -> String))]
pub struct MessageReference {
    #[secondary_key]
    pub message_id: u64,
    pub position: u32,
    pub reference: u64,
}

impl MessageReference {
    fn pk(&self) -> String {
        format!("{}_{:06}", key_segment(self.message_id), self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::timeline_key;

    #[test]
    fn timeline_keys_sort_by_time_then_id() {
        let ordered = [
            timeline_key(7, i64::MIN, 0),
            timeline_key(7, -5, 3),
            timeline_key(7, 0, 1),
            timeline_key(7, 10, 2),
            timeline_key(7, 10, 11),
            timeline_key(7, i64::MAX, u64::MAX),
        ];
        assert!(ordered.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(timeline_key(7, i64::MAX, u64::MAX) < timeline_key(8, i64::MIN, 0));
    }
}
