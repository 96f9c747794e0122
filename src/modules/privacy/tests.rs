// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::{
    label::Label,
    message::{
        search::MessageSearch,
        state::{DeletedState, Role},
        Message,
    },
    privacy::{
        contexts_for_user, delete_course_data, delete_user_data, delete_users_data,
        export_user_data, users_in_course,
    },
    testing::*,
};

#[tokio::test]
async fn contexts_and_users_follow_message_rows() {
    let Fixture { ctx, .. } = fixture();
    send(&ctx, COURSE, SAM, &[(TINA, Role::To)], "One", 10).await;
    send(&ctx, OTHER_COURSE, SAM, &[(OLGA, Role::To)], "Two", 20).await;
    Message::create(&ctx, COURSE, CARL).await.unwrap();

    assert_eq!(
        contexts_for_user(&ctx, SAM).await.unwrap(),
        vec![COURSE, OTHER_COURSE]
    );
    assert_eq!(contexts_for_user(&ctx, TINA).await.unwrap(), vec![COURSE]);
    assert!(contexts_for_user(&ctx, BEA).await.unwrap().is_empty());
    assert_eq!(
        users_in_course(&ctx, COURSE).await.unwrap(),
        vec![SAM, TINA, CARL]
    );
}

#[tokio::test]
async fn export_hides_bcc_from_other_recipients() {
    let Fixture { ctx, .. } = fixture();
    let id = send(
        &ctx,
        COURSE,
        SAM,
        &[(TINA, Role::To), (BEA, Role::Bcc)],
        "Export",
        10,
    )
    .await;
    let label = Label::create(&ctx, TINA, "Saved", "").await.unwrap();
    Message::set_labels(&ctx, TINA, id, &[label.id]).await.unwrap();

    let tina = export_user_data(&ctx, TINA).await.unwrap();
    assert_eq!(tina.labels.len(), 1);
    assert_eq!(tina.courses.len(), 1);
    let message = &tina.courses[0].messages[0];
    assert_eq!(message.id, id);
    assert_eq!(message.role, Role::To);
    assert_eq!(message.labels, vec![label.id]);
    assert!(message.recipients.iter().all(|r| r.role != Role::Bcc));
    let json = serde_json::to_string(&tina).unwrap();
    assert!(!json.contains("Bcc"));

    let sam = export_user_data(&ctx, SAM).await.unwrap();
    let message = &sam.courses[0].messages[0];
    assert!(message.recipients.iter().any(|r| r.role == Role::Bcc));
}

#[tokio::test]
async fn export_includes_trash_and_drafts_in_batches() {
    let Fixture { ctx, .. } = fixture();
    let mut ids = vec![];
    for time in 1..=5 {
        ids.push(send(&ctx, COURSE, SAM, &[(TINA, Role::To)], "Many", time).await);
    }
    Message::set_deleted(&ctx, TINA, ids[0], DeletedState::Deleted)
        .await
        .unwrap();
    Message::set_deleted(&ctx, TINA, ids[1], DeletedState::DeletedForever)
        .await
        .unwrap();
    let draft = Message::create(&ctx, COURSE, TINA).await.unwrap();

    let export = export_user_data(&ctx, TINA).await.unwrap();
    let exported: Vec<u64> = export.courses[0].messages.iter().map(|m| m.id).collect();
    assert_eq!(exported.len(), 5);
    assert!(exported.contains(&ids[0]));
    assert!(!exported.contains(&ids[1]));
    assert!(exported.contains(&draft.id()));
}

#[tokio::test]
async fn deletion_scrubs_sender_copy_and_hides_received_ones() {
    let Fixture { ctx, .. } = fixture();
    let sent = send(&ctx, COURSE, SAM, &[(TINA, Role::To)], "Mine", 10).await;
    let received = send(&ctx, COURSE, TINA, &[(SAM, Role::To)], "Theirs", 20).await;
    let elsewhere = send(&ctx, OTHER_COURSE, SAM, &[(OLGA, Role::To)], "Else", 30).await;
    let label = Label::create(&ctx, SAM, "Keep", "").await.unwrap();

    let report = delete_user_data(&ctx, SAM, &[COURSE]).await.unwrap();
    assert!(report.is_complete());
    assert_eq!(report.processed, 2);

    let message = Message::get(&ctx, sent).await.unwrap();
    assert_eq!(message.deleted(SAM), Some(DeletedState::DeletedContent));
    assert_eq!(message.subject_for(SAM), "");
    assert_eq!(message.deleted(TINA), Some(DeletedState::NotDeleted));
    assert_eq!(message.subject_for(TINA), "Mine");

    let message = Message::get(&ctx, received).await.unwrap();
    assert_eq!(message.deleted(SAM), Some(DeletedState::DeletedForever));
    assert_eq!(message.subject_for(TINA), "Theirs");

    assert_eq!(
        MessageSearch::new(SAM).all(&ctx).await.unwrap(),
        vec![elsewhere]
    );
    assert!(Label::get(&ctx, label.id).await.is_ok());

    let report = delete_user_data(&ctx, SAM, &[COURSE, OTHER_COURSE])
        .await
        .unwrap();
    assert!(report.is_complete());
    assert!(Label::get_by_user(&ctx, SAM).await.unwrap().is_empty());
    assert!(MessageSearch::new(SAM).all(&ctx).await.unwrap().is_empty());
}

#[tokio::test]
async fn course_wide_requests_delegate_to_messages() {
    let Fixture { ctx, .. } = fixture();
    let a = send(&ctx, COURSE, SAM, &[(TINA, Role::To)], "A", 10).await;
    let b = send(&ctx, COURSE, CARL, &[(TINA, Role::To)], "B", 20).await;

    let report = delete_users_data(&ctx, COURSE, &[TINA, CARL]).await.unwrap();
    assert!(report.is_complete());
    assert_eq!(
        Message::get(&ctx, a).await.unwrap().deleted(TINA),
        Some(DeletedState::DeletedForever)
    );
    assert_eq!(
        Message::get(&ctx, b).await.unwrap().deleted(CARL),
        Some(DeletedState::DeletedContent)
    );

    let report = delete_course_data(&ctx, COURSE).await.unwrap();
    assert_eq!(report.processed, 2);
    assert!(users_in_course(&ctx, COURSE).await.unwrap().is_empty());
}

#[tokio::test]
async fn export_keeps_metadata_of_scrubbed_sent_copies() {
    let Fixture { ctx, .. } = fixture();
    let sent = send(&ctx, COURSE, SAM, &[(TINA, Role::To)], "Audit me", 10).await;
    let kept = send(&ctx, COURSE, SAM, &[(TINA, Role::To)], "Visible", 20).await;
    Message::set_deleted(&ctx, SAM, sent, DeletedState::DeletedContent)
        .await
        .unwrap();

    let export = export_user_data(&ctx, SAM).await.unwrap();
    let messages = &export.courses[0].messages;
    assert_eq!(messages.iter().map(|m| m.id).collect::<Vec<_>>(), vec![sent, kept]);
    let scrubbed = &messages[0];
    assert_eq!(scrubbed.deleted, DeletedState::DeletedContent);
    assert_eq!(scrubbed.subject, "");
    assert_eq!(scrubbed.content, "");
    assert_eq!(scrubbed.role, Role::From);
    assert_eq!(scrubbed.recipients.len(), 1);
    assert_eq!(messages[1].subject, "Visible");

    let tina = export_user_data(&ctx, TINA).await.unwrap();
    assert_eq!(tina.courses[0].messages[0].subject, "Audit me");
}
