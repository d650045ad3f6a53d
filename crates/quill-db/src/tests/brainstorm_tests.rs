//! Brainstorm save/load tests, including the planning milestone hook.

use crate::test_fixtures::TestDatabase;
use quill_core::{Error, FiveW, SaveBrainEntryRequest};

fn five_w(all: bool) -> FiveW {
    FiveW {
        why: Some("curiosity".to_string()),
        what: Some("a study".to_string()),
        where_: Some("the lab".to_string()),
        when_: Some("this year".to_string()),
        who: if all { Some("me".to_string()) } else { None },
    }
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn save_then_load_latest() {
    let test_db = TestDatabase::new().await;
    let user = test_db.create_user().await;

    let request = SaveBrainEntryRequest {
        five_w: five_w(false),
        messages: vec![serde_json::json!({"role": "user", "text": "hi"})],
        overall_feedback: "promising".to_string(),
        completed: false,
    };
    test_db.db.save_brainstorm(user.id, &request).await.unwrap();

    let latest = test_db.db.brainstorm.latest(user.id).await.unwrap().unwrap();
    assert_eq!(latest.why.as_deref(), Some("curiosity"));
    assert_eq!(latest.overall_feedback, "promising");
    assert_eq!(latest.messages.as_array().unwrap().len(), 1);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn complete_five_w_records_planning_milestone() {
    let test_db = TestDatabase::new().await;
    let user = test_db.create_user().await;

    let request = SaveBrainEntryRequest {
        five_w: five_w(true),
        ..Default::default()
    };
    test_db.db.save_brainstorm(user.id, &request).await.unwrap();

    let timeline = test_db.db.planning.fetch_timeline(user.id).await.unwrap();
    let topic = timeline
        .iter()
        .find(|p| p.title == "Define Topic & Question")
        .expect("milestone phase created");
    assert_eq!(topic.tasks.len(), 1);
    assert_eq!(topic.tasks[0].description, "Brainstorm Complete");
    assert!(topic.tasks[0].completed);

    // Saving again does not duplicate the milestone.
    test_db.db.save_brainstorm(user.id, &request).await.unwrap();
    let timeline = test_db.db.planning.fetch_timeline(user.id).await.unwrap();
    let topic = timeline
        .iter()
        .find(|p| p.title == "Define Topic & Question")
        .unwrap();
    assert_eq!(topic.tasks.len(), 1);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn incomplete_five_w_skips_milestone() {
    let test_db = TestDatabase::new().await;
    let user = test_db.create_user().await;

    let request = SaveBrainEntryRequest {
        five_w: five_w(false),
        ..Default::default()
    };
    test_db.db.save_brainstorm(user.id, &request).await.unwrap();

    assert!(test_db.db.planning.fetch_timeline(user.id).await.unwrap().is_empty());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn progress_flag_updates_latest_entry() {
    let test_db = TestDatabase::new().await;
    let user = test_db.create_user().await;

    // No entry yet.
    let err = test_db.db.brainstorm.set_progress(user.id, true).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    test_db
        .db
        .save_brainstorm(user.id, &SaveBrainEntryRequest::default())
        .await
        .unwrap();
    test_db.db.brainstorm.set_progress(user.id, true).await.unwrap();

    let latest = test_db.db.brainstorm.latest(user.id).await.unwrap().unwrap();
    assert!(latest.completed);

    test_db.cleanup().await;
}
