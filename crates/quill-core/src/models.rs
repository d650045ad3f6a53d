//! Domain models and request/response types.
//!
//! Entities mirror the database schema one-to-one; descriptor types mirror
//! the JSON payloads the HTTP layer accepts. Every entity except [`User`]
//! carries the owning `user_id` and is only ever read or written through
//! owner-scoped queries.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::phases::PhaseStatus;

// ---------------------------------------------------------------------------
// Users & settings
// ---------------------------------------------------------------------------

/// A registered account.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Argon2id PHC string. Never serialized.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at_utc: DateTime<Utc>,
}

/// Per-user preference row, auto-created with defaults on first read.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserSettings {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub language: String,
    pub theme: String,
    pub email_notifications: bool,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

/// Partial update for [`UserSettings`]. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSettingsRequest {
    pub language: Option<String>,
    pub theme: Option<String>,
    pub email_notifications: Option<bool>,
}

// ---------------------------------------------------------------------------
// Outline sections
// ---------------------------------------------------------------------------

/// A node in a per-user outline tree, as stored.
///
/// `parent_id == None` marks a root. `sort_order` is the position among
/// siblings, unique per sibling group but not globally.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Section {
    pub id: Uuid,
    pub user_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub title: String,
    pub summary: Option<String>,
    pub sort_order: i32,
    pub created_at_utc: DateTime<Utc>,
}

/// A section with its descendant subtree nested inline (read shape).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SectionNode {
    pub id: Uuid,
    pub title: String,
    pub summary: Option<String>,
    #[serde(rename = "order")]
    pub sort_order: i32,
    pub subsections: Vec<SectionNode>,
}

/// Client-supplied node descriptor for the outline save/replace operations.
///
/// Depth is unbounded; sibling order is the order of appearance.
#[derive(Debug, Clone, Deserialize)]
pub struct SectionDescriptor {
    pub title: String,
    pub summary: Option<String>,
    #[serde(default)]
    pub subsections: Vec<SectionDescriptor>,
}

/// Partial field edit for a single section. Absent fields are untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SectionPatch {
    pub title: Option<String>,
    pub summary: Option<String>,
    #[serde(rename = "order")]
    pub sort_order: Option<i32>,
}

// ---------------------------------------------------------------------------
// Planning: phases & tasks
// ---------------------------------------------------------------------------

/// A named stage of a research plan.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Phase {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub title: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    pub created_at_utc: DateTime<Utc>,
}

/// A unit of work under a phase.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub phase_id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub description: String,
    pub completed: bool,
    pub created_at_utc: DateTime<Utc>,
}

/// Client-supplied phase descriptor for the planning replace operation.
#[derive(Debug, Clone, Deserialize)]
pub struct PhaseDescriptor {
    pub title: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub tasks: Vec<TaskDescriptor>,
}

/// Client-supplied task descriptor.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskDescriptor {
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

/// A phase with its tasks and completion counts (planning read shape).
#[derive(Debug, Clone, Serialize)]
pub struct PhaseWithTasks {
    pub id: Uuid,
    pub title: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    pub tasks: Vec<Task>,
    pub total_tasks: usize,
    pub completed_tasks: usize,
}

/// One dashboard entry per canonical phase title.
///
/// `id` is the 1-based position in the fixed canonical order, not a storage
/// identifier. It is not stable across requests if the canonical list ever
/// changes.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PhaseOverviewEntry {
    pub id: i64,
    pub title: String,
    pub status: PhaseStatus,
}

// ---------------------------------------------------------------------------
// Brainstorming
// ---------------------------------------------------------------------------

/// A brainstorm session entry (5W answers + chat transcript).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BrainEntry {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub why: Option<String>,
    pub what: Option<String>,
    #[serde(rename = "where")]
    pub where_: Option<String>,
    #[serde(rename = "when")]
    pub when_: Option<String>,
    pub who: Option<String>,
    /// Chat transcript, stored as a JSON array.
    pub messages: serde_json::Value,
    pub overall_feedback: String,
    pub completed: bool,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

impl BrainEntry {
    /// True when every one of the five W answers is present and non-empty.
    /// This is what triggers the planning milestone hook.
    pub fn five_w_complete(&self) -> bool {
        [&self.why, &self.what, &self.where_, &self.when_, &self.who]
            .iter()
            .all(|field| field.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

/// Payload for saving a brainstorm session.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveBrainEntryRequest {
    #[serde(default, rename = "fiveW")]
    pub five_w: FiveW,
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
    #[serde(default, rename = "overallFeedback")]
    pub overall_feedback: String,
    #[serde(default)]
    pub completed: bool,
}

/// The five W answers of a brainstorm session.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FiveW {
    pub why: Option<String>,
    pub what: Option<String>,
    #[serde(rename = "where")]
    pub where_: Option<String>,
    #[serde(rename = "when")]
    pub when_: Option<String>,
    pub who: Option<String>,
}

// ---------------------------------------------------------------------------
// References & tags
// ---------------------------------------------------------------------------

/// A bibliographic reference owned by one user.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Reference {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub title: String,
    pub authors: String,
    pub year: String,
    pub source: String,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub completed: bool,
    pub created_at_utc: DateTime<Utc>,
}

/// Fields for creating a reference. `doi`/`url` are optional.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateReferenceRequest {
    pub title: String,
    pub authors: String,
    pub year: String,
    pub source: String,
    pub doi: Option<String>,
    pub url: Option<String>,
}

/// Partial update for a reference.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateReferenceRequest {
    pub title: Option<String>,
    pub authors: Option<String>,
    pub year: Option<String>,
    pub source: Option<String>,
    pub doi: Option<String>,
    pub url: Option<String>,
    pub completed: Option<bool>,
}

/// A user-scoped tag. Names are unique per owner.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Tag {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub name: String,
}

/// One row of the tag usage statistics (tag name -> reference count).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TagStat {
    pub tag: String,
    pub count: i64,
}

/// A reference with its tags attached (tag board read shape).
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceWithTags {
    pub id: Uuid,
    pub title: String,
    pub completed: bool,
    pub tags: Vec<Tag>,
}

// ---------------------------------------------------------------------------
// Cloud documents
// ---------------------------------------------------------------------------

/// A document tracked by the cloud versioning feature.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CloudDocument {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub title: String,
    pub created_at_utc: DateTime<Utc>,
}

/// One stored version of a cloud document.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DocumentVersion {
    pub id: Uuid,
    pub document_id: Uuid,
    pub major_version: i32,
    pub minor_version: i32,
    pub file_key: String,
    pub file_url: String,
    pub storage_provider: String,
    pub uploaded_by: Option<Uuid>,
    pub file_size: Option<i64>,
    pub uploaded_at_utc: DateTime<Utc>,
    pub is_current: bool,
}

impl DocumentVersion {
    /// The version label, e.g. `"v1.2"`.
    pub fn label(&self) -> String {
        crate::versioning::VersionNumber {
            major: self.major_version,
            minor: self.minor_version,
        }
        .label()
    }
}

/// A document with its versions, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentWithVersions {
    pub id: Uuid,
    pub title: String,
    pub created_at_utc: DateTime<Utc>,
    pub versions: Vec<DocumentVersion>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_node_serializes_order_field() {
        let node = SectionNode {
            id: Uuid::nil(),
            title: "Chapter 1".to_string(),
            summary: None,
            sort_order: 0,
            subsections: vec![],
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["order"], 0);
        assert!(json.get("sort_order").is_none());
    }

    #[test]
    fn section_descriptor_subsections_default_empty() {
        let desc: SectionDescriptor =
            serde_json::from_str(r#"{"title": "Intro"}"#).unwrap();
        assert!(desc.subsections.is_empty());
        assert!(desc.summary.is_none());
    }

    #[test]
    fn task_descriptor_completed_defaults_false() {
        let desc: TaskDescriptor =
            serde_json::from_str(r#"{"description": "Read papers"}"#).unwrap();
        assert!(!desc.completed);
    }

    #[test]
    fn five_w_complete_requires_all_answers() {
        let mut entry = BrainEntry {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            why: Some("because".into()),
            what: Some("a study".into()),
            where_: Some("lab".into()),
            when_: Some("2026".into()),
            who: None,
            messages: serde_json::json!([]),
            overall_feedback: String::new(),
            completed: false,
            created_at_utc: Utc::now(),
            updated_at_utc: Utc::now(),
        };
        assert!(!entry.five_w_complete());
        entry.who = Some("me".into());
        assert!(entry.five_w_complete());
        entry.what = Some("   ".into());
        assert!(!entry.five_w_complete(), "blank answers do not count");
    }

    #[test]
    fn brain_entry_renames_reserved_words() {
        let entry = BrainEntry {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            why: None,
            what: None,
            where_: Some("library".into()),
            when_: Some("June".into()),
            who: None,
            messages: serde_json::json!([]),
            overall_feedback: String::new(),
            completed: false,
            created_at_utc: Utc::now(),
            updated_at_utc: Utc::now(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["where"], "library");
        assert_eq!(json["when"], "June");
    }

    #[test]
    fn document_version_label() {
        let v = DocumentVersion {
            id: Uuid::nil(),
            document_id: Uuid::nil(),
            major_version: 2,
            minor_version: 7,
            file_key: String::new(),
            file_url: String::new(),
            storage_provider: "filesystem".into(),
            uploaded_by: None,
            file_size: None,
            uploaded_at_utc: Utc::now(),
            is_current: true,
        };
        assert_eq!(v.label(), "v2.7");
    }
}
