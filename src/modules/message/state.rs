// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    modules::error::{code::ErrorCode, CourseMailResult},
    raise_error,
};

/// Relationship of a participant to a message.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[default]
    From,
    To,
    Cc,
    Bcc,
}

impl Role {
    pub fn is_recipient(&self) -> bool {
        !matches!(self, Role::From)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::From => "from",
            Role::To => "to",
            Role::Cc => "cc",
            Role::Bcc => "bcc",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-user visibility of a message.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum DeletedState {
    #[default]
    NotDeleted,
    /// In the trash, restorable.
    Deleted,
    /// Terminal.
    DeletedForever,
    /// Sender copy scrubbed for a privacy request; metadata is kept.
    DeletedContent,
}

impl DeletedState {
    /// Validates the move of a row held with `role` from `self` to `to`.
    ///
    /// Staying in the same state is accepted and changes nothing.
    pub fn check_transition(self, to: DeletedState, role: Role) -> CourseMailResult<()> {
        use DeletedState::*;
        match (self, to) {
            (from, to) if from == to => Ok(()),
            (DeletedForever, _) => Err(raise_error!(
                format!("Cannot move a message deleted forever to {:?}.", to),
                ErrorCode::InvalidState
            )),
            (NotDeleted, Deleted) | (Deleted, NotDeleted) => Ok(()),
            (NotDeleted | Deleted | DeletedContent, DeletedForever) => Ok(()),
            (NotDeleted | Deleted, DeletedContent) => {
                if role == Role::From {
                    Ok(())
                } else {
                    Err(raise_error!(
                        "Only the sender copy of a message can have its content deleted.".into(),
                        ErrorCode::PermissionDenied
                    ))
                }
            }
            (DeletedContent, NotDeleted | Deleted) => Err(raise_error!(
                format!("Cannot move a message with deleted content to {:?}.", to),
                ErrorCode::InvalidState
            )),
            (NotDeleted, NotDeleted)
            | (Deleted, Deleted)
            | (DeletedContent, DeletedContent) => Ok(()),
        }
    }

    /// Rows listed by mailbox views (inbox, trash, ...).
    pub fn is_listable(&self) -> bool {
        matches!(self, DeletedState::NotDeleted | DeletedState::Deleted)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum MessageFormat {
    #[default]
    Plain,
    Html,
    Markdown,
}
