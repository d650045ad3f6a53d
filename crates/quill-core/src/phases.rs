//! Dashboard phase-status derivation.
//!
//! The dashboard always shows the same five research stages in the same
//! order, whether or not the user has created a matching [`Phase`] yet.
//! Status is derived from task completion first, then from deadline
//! proximity. The canonical title list is display vocabulary only; it is
//! never used as a storage key.
//!
//! [`Phase`]: crate::models::Phase

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime};
use serde::Serialize;

use crate::models::PhaseOverviewEntry;

/// The fixed, ordered vocabulary of research stages shown on the dashboard.
pub const CANONICAL_PHASE_TITLES: [&str; 5] = [
    "Define Topic & Question",
    "Literature Review",
    "Identify Gaps",
    "Plan Methodology",
    "Write & Revise",
];

/// Deadlines closer than this many days are flagged as approaching.
pub const DEADLINE_WARNING_DAYS: i64 = 7;

/// Reference time zone for deadline comparisons, as a fixed UTC offset
/// (UTC+10:00). Deadlines are dates; they expire at the end of that day in
/// this zone.
pub fn reference_offset() -> FixedOffset {
    FixedOffset::east_opt(10 * 3600).expect("static offset is in range")
}

/// Current time in the reference zone.
pub fn reference_now() -> DateTime<FixedOffset> {
    chrono::Utc::now().with_timezone(&reference_offset())
}

/// Display status of a dashboard phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PhaseStatus {
    NotCompleted,
    Completed,
    DeadlineApproaching,
    Overdue,
}

impl PhaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseStatus::NotCompleted => "NotCompleted",
            PhaseStatus::Completed => "Completed",
            PhaseStatus::DeadlineApproaching => "DeadlineApproaching",
            PhaseStatus::Overdue => "Overdue",
        }
    }
}

/// Derive the display status of one phase.
///
/// Rules, in order:
/// - at least one task and all tasks completed -> `Completed`. A phase with
///   zero tasks is never completed, even vacuously.
/// - otherwise, no deadline -> `NotCompleted`.
/// - otherwise the deadline is interpreted as end-of-day in the reference
///   zone: already passed -> `Overdue`, within the warning window ->
///   `DeadlineApproaching`, else `NotCompleted`.
pub fn derive_phase_status(
    task_flags: &[bool],
    deadline: Option<NaiveDate>,
    now: DateTime<FixedOffset>,
) -> PhaseStatus {
    if !task_flags.is_empty() && task_flags.iter().all(|&done| done) {
        return PhaseStatus::Completed;
    }

    let Some(deadline) = deadline else {
        return PhaseStatus::NotCompleted;
    };

    let end_of_day = deadline.and_time(NaiveTime::from_hms_opt(23, 59, 59).expect("valid time"));
    let Some(deadline_at) = end_of_day.and_local_timezone(now.timezone()).single() else {
        // Fixed offsets never produce ambiguous local times.
        return PhaseStatus::NotCompleted;
    };

    if deadline_at < now {
        PhaseStatus::Overdue
    } else if deadline_at - now <= Duration::days(DEADLINE_WARNING_DAYS) {
        PhaseStatus::DeadlineApproaching
    } else {
        PhaseStatus::NotCompleted
    }
}

/// Facts about one stored phase, as needed by the overview.
#[derive(Debug, Clone)]
pub struct PhaseFacts {
    pub title: String,
    pub deadline: Option<NaiveDate>,
    /// Completion flag of every task, in any order.
    pub task_flags: Vec<bool>,
}

/// Build the five-entry dashboard overview.
///
/// Output is always exactly [`CANONICAL_PHASE_TITLES`] in order; entries
/// whose title has no stored phase get `NotCompleted`. When a user somehow
/// has several phases with the same title, the first one wins. The `id`
/// field is the 1-based rank in the canonical order.
pub fn phase_overview(
    phases: &[PhaseFacts],
    now: DateTime<FixedOffset>,
) -> Vec<PhaseOverviewEntry> {
    CANONICAL_PHASE_TITLES
        .iter()
        .enumerate()
        .map(|(index, title)| {
            let status = phases
                .iter()
                .find(|p| p.title == *title)
                .map(|p| derive_phase_status(&p.task_flags, p.deadline, now))
                .unwrap_or(PhaseStatus::NotCompleted);
            PhaseOverviewEntry {
                id: index as i64 + 1,
                title: (*title).to_string(),
                status,
            }
        })
        .collect()
}
