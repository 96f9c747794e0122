pub mod modules;

pub use modules::{
    context::{AttachmentStore, MailContext, NoAttachments},
    directory::{Course, Directory, GroupMode, Participant, StaticDirectory, User},
    error::{code::ErrorCode, code::ErrorKind, CourseMailError, CourseMailResult},
    label::Label,
    message::{
        compose::DraftData,
        search::{Cursor, MessageSearch, SearchPage},
        state::{DeletedState, MessageFormat, Role},
        Message,
    },
    user::search::UserSearch,
};
