// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::{Arc, Mutex};

use crate::modules::{
    context::AttachmentStore,
    directory::EnrolOptions,
    error::{code::ErrorCode, code::ErrorKind, CourseMailResult},
    label::Label,
    message::{
        entity::Addressee,
        search::MessageSearch,
        state::{DeletedState, Role},
        Message,
    },
    testing::*,
};

#[tokio::test]
async fn draft_is_private_until_sent() {
    let Fixture { ctx, .. } = fixture();
    let draft = Message::create(&ctx, COURSE, SAM).await.unwrap();
    assert!(draft.draft());
    assert_eq!(draft.sender(), SAM);
    assert_eq!(draft.role(SAM), Some(Role::From));
    assert_eq!(draft.unread(SAM), Some(false));

    let draft = Message::update_draft(
        &ctx,
        SAM,
        draft.id(),
        draft_data("Exam", "See you", &[(TINA, Role::To), (CARL, Role::Cc)]),
    )
    .await
    .unwrap();
    assert_eq!(draft.states().len(), 1);
    assert_eq!(draft.role(TINA), None);
    assert_eq!(
        draft.recipients(),
        vec![Addressee::new(TINA, Role::To), Addressee::new(CARL, Role::Cc)]
    );
    assert!(MessageSearch::new(TINA).all(&ctx).await.unwrap().is_empty());
    assert_eq!(
        Message::get_for_user(&ctx, TINA, draft.id())
            .await
            .unwrap_err()
            .kind(),
        ErrorKind::NotFound
    );

    let sent = Message::send_at(&ctx, SAM, draft.id(), 1_000).await.unwrap();
    assert!(!sent.draft());
    assert_eq!(sent.time(), 1_000);
    assert_eq!(sent.role(TINA), Some(Role::To));
    assert_eq!(sent.unread(TINA), Some(true));
    assert_eq!(sent.role(CARL), Some(Role::Cc));
    assert_eq!(sent.unread(SAM), Some(false));
    assert!(sent.states().iter().all(|s| s.time == 1_000 && !s.draft));
    assert_eq!(
        MessageSearch::new(TINA).all(&ctx).await.unwrap(),
        vec![sent.id()]
    );
}

#[tokio::test]
async fn sent_message_has_exactly_one_sender_row() {
    let Fixture { ctx, .. } = fixture();
    let id = send(
        &ctx,
        COURSE,
        SAM,
        &[(TINA, Role::To), (CARL, Role::Cc), (BEA, Role::Bcc)],
        "Roles",
        10,
    )
    .await;
    let message = Message::get(&ctx, id).await.unwrap();
    let senders = message
        .states()
        .iter()
        .filter(|s| s.role == Role::From)
        .count();
    assert_eq!(senders, 1);
    assert_eq!(message.states().len(), 4);
}

#[tokio::test]
async fn second_send_is_rejected() {
    let Fixture { ctx, .. } = fixture();
    let id = send(&ctx, COURSE, SAM, &[(TINA, Role::To)], "Once", 10).await;
    let err = Message::send_at(&ctx, SAM, id, 20).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::AlreadySent);
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(Message::get(&ctx, id).await.unwrap().time(), 10);
}

#[tokio::test]
async fn concurrent_sends_materialize_recipients_once() {
    let Fixture { ctx, .. } = fixture();
    let draft = Message::create(&ctx, COURSE, SAM).await.unwrap();
    Message::update_draft(
        &ctx,
        SAM,
        draft.id(),
        draft_data("Race", "", &[(TINA, Role::To)]),
    )
    .await
    .unwrap();

    let (a, b) = tokio::join!(
        Message::send_at(&ctx, SAM, draft.id(), 5),
        Message::send_at(&ctx, SAM, draft.id(), 6)
    );
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let message = Message::get(&ctx, draft.id()).await.unwrap();
    assert_eq!(message.states().len(), 2);
}

#[tokio::test]
async fn send_validates_recipients_and_subject() {
    let Fixture { ctx, directory } = fixture();
    let draft = Message::create(&ctx, COURSE, SAM).await.unwrap();
    let err = Message::send(&ctx, SAM, draft.id()).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::MissingRecipients);
    assert_eq!(err.kind(), ErrorKind::Validation);

    Message::update_draft(&ctx, SAM, draft.id(), draft_data("  ", "", &[(BEA, Role::Bcc)]))
        .await
        .unwrap();
    let err = Message::send(&ctx, SAM, draft.id()).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidParameter);

    Message::update_draft(&ctx, SAM, draft.id(), draft_data("Hi", "", &[(OLGA, Role::To)]))
        .await
        .unwrap();
    let err = Message::send(&ctx, SAM, draft.id()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    directory.enrol(
        COURSE,
        BEA,
        EnrolOptions {
            suspended: true,
            ..Default::default()
        },
    );
    Message::update_draft(&ctx, SAM, draft.id(), draft_data("Hi", "", &[(BEA, Role::Bcc)]))
        .await
        .unwrap();
    assert!(Message::send(&ctx, SAM, draft.id()).await.is_err());
    assert!(Message::get(&ctx, draft.id()).await.unwrap().draft());
}

#[tokio::test]
async fn bcc_only_message_can_be_sent() {
    let Fixture { ctx, .. } = fixture();
    let id = send(&ctx, COURSE, SAM, &[(BEA, Role::Bcc)], "Quiet", 10).await;
    let message = Message::get(&ctx, id).await.unwrap();
    assert_eq!(message.role(BEA), Some(Role::Bcc));
    assert!(message.visible_recipients(TINA).is_empty());
    assert_eq!(message.visible_recipients(BEA).len(), 1);
    assert_eq!(message.visible_recipients(SAM).len(), 1);
}

#[tokio::test]
async fn only_sender_edits_draft() {
    let Fixture { ctx, .. } = fixture();
    let draft = Message::create(&ctx, COURSE, SAM).await.unwrap();
    let err = Message::update_draft(&ctx, TINA, draft.id(), draft_data("x", "", &[]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = Message::update_draft(&ctx, SAM, draft.id(), draft_data("x", "", &[(SAM, Role::To)]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let id = send(&ctx, COURSE, SAM, &[(TINA, Role::To)], "Sent", 10).await;
    let err = Message::update_draft(&ctx, TINA, id, draft_data("x", "", &[]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);
    let err = Message::update_draft(&ctx, SAM, id, draft_data("x", "", &[]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn create_requires_mail_capability() {
    let Fixture { ctx, .. } = fixture();
    let err = Message::create(&ctx, COURSE, OLGA).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::MailDisabled);
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = Message::create(&ctx, 999, SAM).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn reply_threads_subject_recipients_and_references() {
    let Fixture { ctx, .. } = fixture();
    let first = send(
        &ctx,
        COURSE,
        SAM,
        &[(TINA, Role::To), (CARL, Role::Cc), (BEA, Role::Bcc)],
        "Project",
        10,
    )
    .await;

    let reply = Message::reply(&ctx, first, TINA, false).await.unwrap();
    assert_eq!(reply.subject(), "Re: Project");
    assert_eq!(reply.recipients(), vec![Addressee::new(SAM, Role::To)]);
    assert_eq!(reply.get_references(), &[first]);
    assert_eq!(reply.course_id(), COURSE);

    let reply_all = Message::reply(&ctx, first, TINA, true).await.unwrap();
    assert_eq!(
        reply_all.recipients(),
        vec![Addressee::new(SAM, Role::To), Addressee::new(CARL, Role::Cc)]
    );

    let own = Message::reply(&ctx, first, SAM, true).await.unwrap();
    assert_eq!(
        own.recipients(),
        vec![Addressee::new(TINA, Role::To), Addressee::new(CARL, Role::Cc)]
    );

    Message::update_draft(
        &ctx,
        TINA,
        reply.id(),
        draft_data("Re: Project", "ok", &[(SAM, Role::To)]),
    )
    .await
    .unwrap();
    let second = Message::send_at(&ctx, TINA, reply.id(), 20).await.unwrap();
    let third = Message::reply(&ctx, second.id(), SAM, false).await.unwrap();
    assert_eq!(third.subject(), "Re: Project");
    assert_eq!(third.get_references(), &[first, second.id()]);
}

#[tokio::test]
async fn reply_requires_visible_sent_message() {
    let Fixture { ctx, .. } = fixture();
    let id = send(&ctx, COURSE, SAM, &[(TINA, Role::To)], "Hello", 10).await;
    let err = Message::reply(&ctx, id, CARL, false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let draft = Message::create(&ctx, COURSE, SAM).await.unwrap();
    let err = Message::reply(&ctx, draft.id(), SAM, false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn flags_are_private_and_idempotent() {
    let Fixture { ctx, .. } = fixture();
    let id = send(&ctx, COURSE, SAM, &[(TINA, Role::To), (CARL, Role::Cc)], "Flags", 10).await;

    Message::set_starred(&ctx, TINA, id, true).await.unwrap();
    let once = Message::get(&ctx, id).await.unwrap();
    Message::set_starred(&ctx, TINA, id, true).await.unwrap();
    let twice = Message::get(&ctx, id).await.unwrap();
    assert_eq!(once.states(), twice.states());
    assert_eq!(twice.starred(TINA), Some(true));
    assert_eq!(twice.starred(CARL), Some(false));

    Message::set_unread(&ctx, TINA, id, false).await.unwrap();
    let message = Message::get(&ctx, id).await.unwrap();
    assert_eq!(message.unread(TINA), Some(false));
    assert_eq!(message.unread(CARL), Some(true));

    let err = Message::set_unread(&ctx, OLGA, id, false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn deleted_forever_row_is_frozen() {
    let Fixture { ctx, .. } = fixture();
    let id = send(&ctx, COURSE, SAM, &[(TINA, Role::To)], "Gone", 10).await;
    Message::set_deleted(&ctx, TINA, id, DeletedState::DeletedForever)
        .await
        .unwrap();
    let before = Message::get(&ctx, id).await.unwrap();

    let err = Message::set_deleted(&ctx, TINA, id, DeletedState::NotDeleted)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    let err = Message::set_unread(&ctx, TINA, id, false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = Message::set_starred(&ctx, TINA, id, true).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = Message::set_labels(&ctx, TINA, id, &[]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let after = Message::get(&ctx, id).await.unwrap();
    assert_eq!(before.state(TINA), after.state(TINA));
    assert_eq!(after.subject(), "Gone");
}

#[tokio::test]
async fn deleted_draft_cannot_be_edited_or_sent() {
    let Fixture { ctx, .. } = fixture();
    for state in [DeletedState::DeletedForever, DeletedState::DeletedContent] {
        let draft = Message::create(&ctx, COURSE, SAM).await.unwrap();
        Message::set_deleted(&ctx, SAM, draft.id(), state).await.unwrap();

        let data = draft_data("Back", "again", &[(TINA, Role::To)]);
        let err = Message::update_draft(&ctx, SAM, draft.id(), data)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = Message::send(&ctx, SAM, draft.id()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let message = Message::get(&ctx, draft.id()).await.unwrap();
        assert_eq!(message.deleted(SAM), Some(state));
        assert!(message.draft());
        assert_eq!(message.role(TINA), None);
    }
}

#[tokio::test]
async fn trashed_draft_stays_in_trash_when_sent() {
    let Fixture { ctx, .. } = fixture();
    let draft = Message::create(&ctx, COURSE, SAM).await.unwrap();
    Message::update_draft(&ctx, SAM, draft.id(), draft_data("Later", "", &[(TINA, Role::To)]))
        .await
        .unwrap();
    Message::set_deleted(&ctx, SAM, draft.id(), DeletedState::Deleted)
        .await
        .unwrap();

    let sent = Message::send(&ctx, SAM, draft.id()).await.unwrap();
    assert_eq!(sent.deleted(SAM), Some(DeletedState::Deleted));
    assert_eq!(sent.deleted(TINA), Some(DeletedState::NotDeleted));
}

#[tokio::test]
async fn content_deletion_spares_recipient_copies() {
    let Fixture { ctx, .. } = fixture();
    let id = send(&ctx, COURSE, SAM, &[(TINA, Role::To)], "Private", 10).await;

    let err = Message::set_deleted(&ctx, TINA, id, DeletedState::DeletedContent)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);

    Message::set_deleted(&ctx, SAM, id, DeletedState::DeletedContent)
        .await
        .unwrap();
    let message = Message::get(&ctx, id).await.unwrap();
    assert_eq!(message.deleted(SAM), Some(DeletedState::DeletedContent));
    assert_eq!(message.subject_for(SAM), "");
    assert_eq!(message.content_for(SAM), "");
    assert_eq!(message.deleted(TINA), Some(DeletedState::NotDeleted));
    assert_eq!(message.subject_for(TINA), "Private");
    assert_eq!(message.content_for(TINA), "Body of Private");
    assert_eq!(message.recipients(), vec![Addressee::new(TINA, Role::To)]);

    Message::set_deleted(&ctx, TINA, id, DeletedState::DeletedForever)
        .await
        .unwrap();
    let message = Message::get(&ctx, id).await.unwrap();
    assert_eq!(message.subject(), "");
    assert_eq!(message.content(), "");
    assert_eq!(message.normalized_content(), "");
    assert_eq!(message.time(), 10);
}

#[tokio::test]
async fn labels_round_trip_and_stay_private() {
    let Fixture { ctx, .. } = fixture();
    let id = send(&ctx, COURSE, SAM, &[(TINA, Role::To)], "Tagged", 10).await;
    let work = Label::create(&ctx, TINA, "Work", "blue").await.unwrap();
    let later = Label::create(&ctx, TINA, "Later", "").await.unwrap();
    let mine = Label::create(&ctx, SAM, "Mine", "red").await.unwrap();

    Message::set_labels(&ctx, TINA, id, &[later.id, work.id, work.id])
        .await
        .unwrap();
    Message::set_labels(&ctx, SAM, id, &[mine.id]).await.unwrap();
    let message = Message::get(&ctx, id).await.unwrap();
    let mut expected = vec![work.id, later.id];
    expected.sort();
    assert_eq!(message.get_labels(TINA), expected);
    assert_eq!(message.get_labels(SAM), vec![mine.id]);

    Message::set_labels(&ctx, TINA, id, &[later.id]).await.unwrap();
    let message = Message::get(&ctx, id).await.unwrap();
    assert_eq!(message.get_labels(TINA), vec![later.id]);
    assert_eq!(message.get_labels(SAM), vec![mine.id]);

    let err = Message::set_labels(&ctx, TINA, id, &[mine.id]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);
    let message = Message::get(&ctx, id).await.unwrap();
    assert_eq!(message.get_labels(TINA), vec![later.id]);
}

#[derive(Default)]
struct RecordingAttachments {
    deleted: Mutex<Vec<u64>>,
}

impl AttachmentStore for RecordingAttachments {
    fn count(&self, _message_id: u64) -> CourseMailResult<u32> {
        Ok(2)
    }

    fn delete(&self, message_id: u64) -> CourseMailResult<()> {
        self.deleted.lock().unwrap().push(message_id);
        Ok(())
    }
}

#[tokio::test]
async fn attachment_count_comes_from_store() {
    let Fixture { ctx, .. } = fixture();
    let ctx = ctx.with_attachments(Arc::new(RecordingAttachments::default()));
    let draft = Message::create(&ctx, COURSE, SAM).await.unwrap();
    let mut data = draft_data("Files", "", &[(TINA, Role::To)]);
    data.attachments = None;
    let draft = Message::update_draft(&ctx, SAM, draft.id(), data).await.unwrap();
    assert_eq!(draft.attachments(), 2);
}

#[tokio::test]
async fn course_purge_removes_only_that_course() {
    let Fixture { ctx, .. } = fixture();
    let attachments = Arc::new(RecordingAttachments::default());
    let ctx = ctx.with_attachments(attachments.clone());
    let label = Label::create(&ctx, TINA, "Keep", "").await.unwrap();

    let mut purged = vec![];
    for time in 1..=7 {
        purged.push(send(&ctx, COURSE, SAM, &[(TINA, Role::To)], "Course", time).await);
    }
    Message::set_labels(&ctx, TINA, purged[0], &[label.id]).await.unwrap();
    let reply = Message::reply(&ctx, purged[0], TINA, false).await.unwrap();
    purged.push(reply.id());
    let kept = send(&ctx, OTHER_COURSE, SAM, &[(OLGA, Role::To)], "Other", 8).await;

    let report = Message::delete_course_data(&ctx, COURSE).await.unwrap();
    assert!(report.is_complete());
    assert_eq!(report.processed, purged.len());
    for id in &purged {
        assert_eq!(
            Message::get(&ctx, *id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }
    let mut deleted = attachments.deleted.lock().unwrap().clone();
    deleted.sort();
    assert_eq!(deleted, purged);
    assert!(Message::get(&ctx, kept).await.is_ok());
    assert!(Label::get(&ctx, label.id).await.is_ok());
    assert!(MessageSearch::new(TINA).all(&ctx).await.unwrap().is_empty());
}
