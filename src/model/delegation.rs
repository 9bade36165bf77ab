//! Skill profiles, availability, and delegation requests.
//!
//! A delegation is an explicit offer to hand one task to another member.
//! Its status only moves forward; declined, expired and completed are terminal.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Skills
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillProfile {
    pub member_id: String,
    #[serde(default)]
    pub skills: BTreeMap<String, SkillEntry>,
    #[serde(default)]
    pub preferred_categories: BTreeSet<String>,
    #[serde(default)]
    pub learning_interests: BTreeSet<String>,
}

impl SkillProfile {
    pub fn new(member_id: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            ..Self::default()
        }
    }

    pub fn with_skill(mut self, name: impl Into<String>, level: f64) -> Self {
        self.skills.insert(
            name.into(),
            SkillEntry {
                level: level.clamp(0.0, 10.0),
                ..SkillEntry::default()
            },
        );
        self
    }

    pub fn prefers(mut self, category: impl Into<String>) -> Self {
        self.preferred_categories.insert(category.into());
        self
    }

    pub fn interested_in(mut self, category: impl Into<String>) -> Self {
        self.learning_interests.insert(category.into());
        self
    }

    /// Case-insensitive lookup of a skill entry.
    pub fn skill(&self, name: &str) -> Option<&SkillEntry> {
        self.skills
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillEntry {
    /// Clamped to [0, 10].
    pub level: f64,
    /// Accumulated, difficulty-weighted practice.
    #[serde(default)]
    pub experience: f64,
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
    /// Level gained by the most recent update.
    #[serde(default)]
    pub growth_rate: f64,
}

// ---------------------------------------------------------------------------
// Availability
// ---------------------------------------------------------------------------

/// A block of time a member has offered for chores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub member_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Minutes the member is willing to spend inside the window.
    pub capacity_minutes: u32,
    #[serde(default)]
    pub booked_minutes: u32,
}

// ---------------------------------------------------------------------------
// Delegation request
// ---------------------------------------------------------------------------

/// Newtype for delegation request IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DelegationId(pub Uuid);

impl DelegationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for DelegationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl Default for DelegationId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationStatus {
    /// Offered, awaiting a response.
    Pending,
    /// Recipient took the task.
    Accepted,
    /// Recipient refused. Terminal.
    Declined,
    /// Nobody answered before the deadline. Terminal.
    Expired,
    /// Task done and feedback recorded. Terminal.
    Completed,
}

impl DelegationStatus {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: DelegationStatus) -> bool {
        use DelegationStatus::*;
        matches!(
            (self, to),
            (Pending, Accepted) | (Pending, Declined) | (Pending, Expired) | (Accepted, Completed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DelegationStatus::Declined | DelegationStatus::Expired | DelegationStatus::Completed
        )
    }
}

impl std::fmt::Display for DelegationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DelegationStatus::Pending => "pending",
            DelegationStatus::Accepted => "accepted",
            DelegationStatus::Declined => "declined",
            DelegationStatus::Expired => "expired",
            DelegationStatus::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationRequest {
    pub id: DelegationId,
    pub task_id: String,
    pub from_member: String,
    pub to_member: String,
    pub reason: String,
    pub status: DelegationStatus,
    pub requested_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub responded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub feedback: Option<DelegationFeedback>,
}

/// Reported by the recipient once a delegated task is done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationFeedback {
    /// Recipient confirms they took the task on. Completion requires it.
    pub accepted: bool,
    /// 1 to 5.
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub time_to_complete_minutes: Option<u32>,
    #[serde(default)]
    pub comment: Option<String>,
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// One delegation outcome as remembered by the household.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationRecord {
    pub request_id: DelegationId,
    pub task_id: String,
    pub from_member: String,
    pub to_member: String,
    pub status: DelegationStatus,
    #[serde(default)]
    pub rating: Option<u8>,
    pub recorded_at: DateTime<Utc>,
}

/// Log of past delegation outcomes, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DelegationHistory {
    #[serde(default)]
    pub records: Vec<DelegationRecord>,
}

impl DelegationHistory {
    /// Remember the current status of a request. Pending requests are ignored.
    pub fn record(&mut self, request: &DelegationRequest, at: DateTime<Utc>) {
        if request.status == DelegationStatus::Pending {
            return;
        }
        self.records.push(DelegationRecord {
            request_id: request.id,
            task_id: request.task_id.clone(),
            from_member: request.from_member.clone(),
            to_member: request.to_member.clone(),
            status: request.status,
            rating: request.feedback.as_ref().and_then(|f| f.rating),
            recorded_at: at,
        });
    }

    /// Records where the member was either sender or recipient.
    pub fn for_member<'a>(
        &'a self,
        member_id: &'a str,
    ) -> impl Iterator<Item = &'a DelegationRecord> {
        self.records
            .iter()
            .filter(move |r| r.from_member == member_id || r.to_member == member_id)
    }

    /// How many requests `member_id` declined, from anyone.
    pub fn declines_by(&self, member_id: &str) -> usize {
        self.records
            .iter()
            .filter(|r| r.status == DelegationStatus::Declined && r.to_member == member_id)
            .count()
    }

    /// How many times `to` declined a request from `from`.
    pub fn declines_between(&self, from: &str, to: &str) -> usize {
        self.records
            .iter()
            .filter(|r| {
                r.status == DelegationStatus::Declined && r.from_member == from && r.to_member == to
            })
            .count()
    }
}
