//! Cloud document versioning tests against real storage and Postgres.

use crate::test_fixtures::TestDatabase;
use quill_core::Error;

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn first_upload_is_v1_0_and_current() {
    let test_db = TestDatabase::new().await;
    let user = test_db.create_user().await;
    let docs = test_db.db.documents.as_ref().unwrap();

    let doc = docs
        .create_document(user.id, "Thesis", "thesis.docx", b"draft one")
        .await
        .unwrap();
    assert_eq!(doc.versions.len(), 1);
    assert_eq!(doc.versions[0].label(), "v1.0");
    assert!(doc.versions[0].is_current);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn uploads_advance_minor_and_move_current_flag() {
    let test_db = TestDatabase::new().await;
    let user = test_db.create_user().await;
    let docs = test_db.db.documents.as_ref().unwrap();

    let doc = docs
        .create_document(user.id, "Thesis", "thesis.docx", b"v1.0")
        .await
        .unwrap();
    let v11 = docs
        .upload_version(user.id, doc.id, "thesis.docx", b"v1.1")
        .await
        .unwrap();
    assert_eq!(v11.label(), "v1.1");
    assert!(v11.is_current);

    let doc = docs.get(user.id, doc.id).await.unwrap();
    assert_eq!(doc.versions.len(), 2);
    assert_eq!(doc.versions[0].label(), "v1.1", "newest first");
    assert!(!doc.versions[1].is_current);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn minor_nine_rolls_over_to_next_major() {
    let test_db = TestDatabase::new().await;
    let user = test_db.create_user().await;
    let docs = test_db.db.documents.as_ref().unwrap();

    let doc = docs
        .create_document(user.id, "Thesis", "t.docx", b"v1.0")
        .await
        .unwrap();
    let mut last = None;
    for i in 1..=10 {
        last = Some(
            docs.upload_version(user.id, doc.id, "t.docx", format!("rev {}", i).as_bytes())
                .await
                .unwrap(),
        );
    }
    assert_eq!(last.unwrap().label(), "v2.0");

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn download_returns_stored_bytes() {
    let test_db = TestDatabase::new().await;
    let user = test_db.create_user().await;
    let docs = test_db.db.documents.as_ref().unwrap();

    let doc = docs
        .create_document(user.id, "Notes", "notes.txt", b"original bytes")
        .await
        .unwrap();
    let version_id = doc.versions[0].id;

    let (version, data) = docs.download(user.id, doc.id, version_id).await.unwrap();
    assert_eq!(data, b"original bytes");
    assert_eq!(version.label(), "v1.0");

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn deleting_current_version_promotes_newest_remaining() {
    let test_db = TestDatabase::new().await;
    let user = test_db.create_user().await;
    let docs = test_db.db.documents.as_ref().unwrap();

    let doc = docs
        .create_document(user.id, "Thesis", "t.docx", b"v1.0")
        .await
        .unwrap();
    docs.upload_version(user.id, doc.id, "t.docx", b"v1.1").await.unwrap();
    let v12 = docs.upload_version(user.id, doc.id, "t.docx", b"v1.2").await.unwrap();

    docs.delete_version(user.id, doc.id, v12.id).await.unwrap();

    let doc = docs.get(user.id, doc.id).await.unwrap();
    assert_eq!(doc.versions.len(), 2);
    assert_eq!(doc.versions[0].label(), "v1.1");
    assert!(doc.versions[0].is_current, "newest remaining becomes current");

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn documents_are_owner_scoped() {
    let test_db = TestDatabase::new().await;
    let alice = test_db.create_user().await;
    let bob = test_db.create_user().await;
    let docs = test_db.db.documents.as_ref().unwrap();

    let doc = docs
        .create_document(alice.id, "Private", "p.docx", b"secret")
        .await
        .unwrap();

    let err = docs.get(bob.id, doc.id).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(docs.list(bob.id).await.unwrap().is_empty());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with migrated database
async fn delete_document_removes_everything() {
    let test_db = TestDatabase::new().await;
    let user = test_db.create_user().await;
    let docs = test_db.db.documents.as_ref().unwrap();

    let doc = docs
        .create_document(user.id, "Scratch", "s.txt", b"v1.0")
        .await
        .unwrap();
    docs.upload_version(user.id, doc.id, "s.txt", b"v1.1").await.unwrap();

    docs.delete_document(user.id, doc.id).await.unwrap();
    assert!(docs.list(user.id).await.unwrap().is_empty());

    test_db.cleanup().await;
}
