//! Planning persistence tests: timeline replace, task toggle, overview.

use chrono::{Duration, NaiveDate};

use crate::test_fixtures::TestDatabase;
use quill_core::{
    reference_now, Error, PhaseDescriptor, PhaseStatus, TaskDescriptor, CANONICAL_PHASE_TITLES,
};

fn phase(title: &str, deadline: Option<NaiveDate>, tasks: Vec<(&str, bool)>) -> PhaseDescriptor {
    PhaseDescriptor {
        title: title.to_string(),
        start_date: None,
        end_date: None,
        deadline,
        tasks: tasks
            .into_iter()
            .map(|(description, completed)| TaskDescriptor {
                description: description.to_string(),
                completed,
            })
            .collect(),
    }
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn replace_and_fetch_timeline() {
    let test_db = TestDatabase::new().await;
    let user = test_db.create_user().await;

    let phases = vec![
        phase("Literature Review", None, vec![("Collect papers", true), ("Read", false)]),
        phase("Write & Revise", None, vec![]),
    ];
    test_db
        .db
        .replace_planning(user.id, &[], &phases)
        .await
        .unwrap();

    let timeline = test_db.db.planning.fetch_timeline(user.id).await.unwrap();
    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline[0].title, "Literature Review");
    assert_eq!(timeline[0].total_tasks, 2);
    assert_eq!(timeline[0].completed_tasks, 1);
    assert_eq!(timeline[1].total_tasks, 0);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn replace_planning_clears_sections_and_phases_together() {
    let test_db = TestDatabase::new().await;
    let user = test_db.create_user().await;

    test_db
        .db
        .replace_planning(user.id, &[], &[phase("Identify Gaps", None, vec![])])
        .await
        .unwrap();
    // Empty payload wipes the plan.
    test_db.db.replace_planning(user.id, &[], &[]).await.unwrap();

    assert!(test_db.db.planning.fetch_timeline(user.id).await.unwrap().is_empty());
    assert!(test_db.db.sections.list_forest(user.id).await.unwrap().is_empty());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn toggle_task_flips_and_returns_state() {
    let test_db = TestDatabase::new().await;
    let user = test_db.create_user().await;

    test_db
        .db
        .replace_planning(
            user.id,
            &[],
            &[phase("Plan Methodology", None, vec![("Choose design", false)])],
        )
        .await
        .unwrap();
    let timeline = test_db.db.planning.fetch_timeline(user.id).await.unwrap();
    let phase_id = timeline[0].id;
    let task_id = timeline[0].tasks[0].id;

    let completed = test_db
        .db
        .planning
        .toggle_task(user.id, phase_id, task_id)
        .await
        .unwrap();
    assert!(completed);
    let completed = test_db
        .db
        .planning
        .toggle_task(user.id, phase_id, task_id)
        .await
        .unwrap();
    assert!(!completed);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn toggle_task_under_wrong_phase_is_not_found() {
    let test_db = TestDatabase::new().await;
    let user = test_db.create_user().await;

    test_db
        .db
        .replace_planning(
            user.id,
            &[],
            &[
                phase("Identify Gaps", None, vec![("Gap list", false)]),
                phase("Write & Revise", None, vec![]),
            ],
        )
        .await
        .unwrap();
    let timeline = test_db.db.planning.fetch_timeline(user.id).await.unwrap();
    let task_id = timeline[0].tasks[0].id;
    let other_phase = timeline[1].id;

    let err = test_db
        .db
        .planning
        .toggle_task(user.id, other_phase, task_id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn delete_phase_cascades_tasks() {
    let test_db = TestDatabase::new().await;
    let user = test_db.create_user().await;

    test_db
        .db
        .replace_planning(
            user.id,
            &[],
            &[phase("Literature Review", None, vec![("Read", false)])],
        )
        .await
        .unwrap();
    let phase_id = test_db.db.planning.fetch_timeline(user.id).await.unwrap()[0].id;

    test_db.db.planning.delete_phase(user.id, phase_id).await.unwrap();
    assert!(test_db.db.planning.fetch_timeline(user.id).await.unwrap().is_empty());

    // Second delete is NotFound.
    let err = test_db
        .db
        .planning
        .delete_phase(user.id, phase_id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn overview_reflects_stored_phases() {
    let test_db = TestDatabase::new().await;
    let user = test_db.create_user().await;

    let now = reference_now();
    let soon = (now + Duration::days(2)).date_naive();
    test_db
        .db
        .replace_planning(
            user.id,
            &[],
            &[
                phase("Define Topic & Question", None, vec![("Pick topic", true)]),
                phase("Literature Review", Some(soon), vec![("Read", false)]),
            ],
        )
        .await
        .unwrap();

    let overview = test_db.db.planning.overview(user.id, now).await.unwrap();
    assert_eq!(overview.len(), 5);
    for (i, entry) in overview.iter().enumerate() {
        assert_eq!(entry.title, CANONICAL_PHASE_TITLES[i]);
        assert_eq!(entry.id, i as i64 + 1);
    }
    assert_eq!(overview[0].status, PhaseStatus::Completed);
    assert_eq!(overview[1].status, PhaseStatus::DeadlineApproaching);
    assert_eq!(overview[2].status, PhaseStatus::NotCompleted);

    test_db.cleanup().await;
}
