//! Reference and tag repository tests.

use crate::references::ReferenceSort;
use crate::test_fixtures::TestDatabase;
use quill_core::{CreateReferenceRequest, Error, UpdateReferenceRequest};

fn reference(title: &str, year: &str) -> CreateReferenceRequest {
    CreateReferenceRequest {
        title: title.to_string(),
        authors: "Smith, J.".to_string(),
        year: year.to_string(),
        source: "CVPR".to_string(),
        doi: None,
        url: None,
    }
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn create_list_and_sort_references() {
    let test_db = TestDatabase::new().await;
    let user = test_db.create_user().await;
    let refs = &test_db.db.references;

    refs.create(user.id, &reference("Beta paper", "2019")).await.unwrap();
    refs.create(user.id, &reference("Alpha paper", "2023")).await.unwrap();

    let by_title = refs.list(user.id, ReferenceSort::Title).await.unwrap();
    assert_eq!(by_title[0].title, "Alpha paper");

    let by_year = refs.list(user.id, ReferenceSort::Year).await.unwrap();
    assert_eq!(by_year[0].year, "2023");

    let by_created = refs.list(user.id, ReferenceSort::Created).await.unwrap();
    assert_eq!(by_created[0].title, "Alpha paper", "newest first");

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn update_is_partial_and_owner_scoped() {
    let test_db = TestDatabase::new().await;
    let alice = test_db.create_user().await;
    let bob = test_db.create_user().await;
    let refs = &test_db.db.references;

    let created = refs.create(alice.id, &reference("Draft", "2020")).await.unwrap();

    let updated = refs
        .update(
            alice.id,
            created.id,
            &UpdateReferenceRequest {
                year: Some("2021".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.year, "2021");
    assert_eq!(updated.title, "Draft", "untouched fields survive");

    let err = refs
        .update(bob.id, created.id, &UpdateReferenceRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn bulk_import_inserts_all_rows() {
    let test_db = TestDatabase::new().await;
    let user = test_db.create_user().await;

    let batch: Vec<CreateReferenceRequest> = (0..5)
        .map(|i| reference(&format!("Imported {}", i), "2022"))
        .collect();
    let created = test_db.db.references.create_many(user.id, &batch).await.unwrap();
    assert_eq!(created.len(), 5);

    let listed = test_db
        .db
        .references
        .list(user.id, ReferenceSort::Created)
        .await
        .unwrap();
    assert_eq!(listed.len(), 5);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn tag_assignment_and_stats() {
    let test_db = TestDatabase::new().await;
    let user = test_db.create_user().await;

    let r1 = test_db.db.references.create(user.id, &reference("One", "2020")).await.unwrap();
    let r2 = test_db.db.references.create(user.id, &reference("Two", "2021")).await.unwrap();

    test_db.db.tags.assign(user.id, r1.id, "method").await.unwrap();
    test_db.db.tags.assign(user.id, r2.id, "method").await.unwrap();
    test_db.db.tags.assign(user.id, r1.id, "theory").await.unwrap();
    // Re-assigning is a no-op, not an error.
    test_db.db.tags.assign(user.id, r1.id, "method").await.unwrap();

    let stats = test_db.db.tags.stats(user.id).await.unwrap();
    assert_eq!(stats[0].tag, "method");
    assert_eq!(stats[0].count, 2);
    assert_eq!(stats[1].tag, "theory");
    assert_eq!(stats[1].count, 1);

    let board = test_db.db.tags.references_with_tags(user.id).await.unwrap();
    assert_eq!(board.len(), 2);
    let one = board.iter().find(|r| r.title == "One").unwrap();
    assert_eq!(one.tags.len(), 2);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn removing_unattached_tag_is_invalid_input() {
    let test_db = TestDatabase::new().await;
    let user = test_db.create_user().await;

    let r = test_db.db.references.create(user.id, &reference("One", "2020")).await.unwrap();
    test_db.db.tags.get_or_create(user.id, "loose").await.unwrap();

    let err = test_db.db.tags.remove(user.id, r.id, "loose").await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn rename_and_delete_tag() {
    let test_db = TestDatabase::new().await;
    let user = test_db.create_user().await;

    let r = test_db.db.references.create(user.id, &reference("One", "2020")).await.unwrap();
    let tag = test_db.db.tags.assign(user.id, r.id, "mthod").await.unwrap();

    let renamed = test_db.db.tags.rename(user.id, tag.id, "method").await.unwrap();
    assert_eq!(renamed.name, "method");
    // Assignments survive the rename.
    let board = test_db.db.tags.references_with_tags(user.id).await.unwrap();
    assert_eq!(board[0].tags[0].name, "method");

    test_db.db.tags.delete(user.id, tag.id).await.unwrap();
    let board = test_db.db.tags.references_with_tags(user.id).await.unwrap();
    assert!(board[0].tags.is_empty());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn tags_are_unique_per_owner_not_global() {
    let test_db = TestDatabase::new().await;
    let alice = test_db.create_user().await;
    let bob = test_db.create_user().await;

    let a = test_db.db.tags.get_or_create(alice.id, "shared").await.unwrap();
    let b = test_db.db.tags.get_or_create(bob.id, "shared").await.unwrap();
    assert_ne!(a.id, b.id);

    // Same owner, same name: same row.
    let a2 = test_db.db.tags.get_or_create(alice.id, "shared").await.unwrap();
    assert_eq!(a.id, a2.id);

    test_db.cleanup().await;
}
