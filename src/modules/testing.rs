// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use crate::modules::{
    context::MailContext,
    database::manager::DatabaseManager,
    directory::{Course, EnrolOptions, StaticDirectory, User},
    message::{
        compose::DraftData,
        entity::Addressee,
        state::{MessageFormat, Role},
        Message,
    },
    settings::cli::Settings,
};

pub const COURSE: u64 = 10;
pub const OTHER_COURSE: u64 = 20;

pub const SAM: u64 = 1;
pub const TINA: u64 = 2;
pub const CARL: u64 = 3;
pub const BEA: u64 = 4;
pub const OLGA: u64 = 5;

pub struct Fixture {
    pub ctx: MailContext,
    pub directory: Arc<StaticDirectory>,
}

/// Fresh in-memory mail context with one course where Sam, Tina, Carl and
/// Béatrice are enrolled. Olga exists but is only enrolled in the other course.
pub fn fixture() -> Fixture {
    let directory = Arc::new(StaticDirectory::new());
    directory.add_user(User::new(SAM, "Sam", "Sender"));
    directory.add_user(User::new(TINA, "Tina", "Torres"));
    directory.add_user(User::new(CARL, "Carl", "Cohen"));
    directory.add_user(User::new(BEA, "Béatrice", "Bishop"));
    directory.add_user(User::new(OLGA, "Olga", "Outsider"));
    for course_id in [COURSE, OTHER_COURSE] {
        directory.add_course(Course {
            id: course_id,
            shortname: format!("C{}", course_id),
            fullname: format!("Course {}", course_id),
            ..Default::default()
        });
    }
    for user_id in [SAM, TINA, CARL, BEA] {
        directory.enrol(COURSE, user_id, EnrolOptions::default());
    }
    for user_id in [SAM, OLGA] {
        directory.enrol(OTHER_COURSE, user_id, EnrolOptions::default());
    }

    let db = DatabaseManager::in_memory().unwrap();
    let ctx = MailContext::new(db, directory.clone(), &Settings::new_for_test());
    Fixture { ctx, directory }
}

pub fn draft_data(subject: &str, content: &str, addressees: &[(u64, Role)]) -> DraftData {
    DraftData {
        subject: subject.to_string(),
        content: content.to_string(),
        format: MessageFormat::Plain,
        attachments: Some(0),
        addressees: addressees
            .iter()
            .map(|(user_id, role)| Addressee::new(*user_id, *role))
            .collect(),
    }
}

/// Composes and sends a message at `time`, returning its id.
pub async fn send(
    ctx: &MailContext,
    course_id: u64,
    sender: u64,
    addressees: &[(u64, Role)],
    subject: &str,
    time: i64,
) -> u64 {
    let draft = Message::create(ctx, course_id, sender).await.unwrap();
    Message::update_draft(
        ctx,
        sender,
        draft.id(),
        draft_data(subject, &format!("Body of {}", subject), addressees),
    )
    .await
    .unwrap();
    Message::send_at(ctx, sender, draft.id(), time)
        .await
        .unwrap()
        .id()
}
