//! Household members, task definitions, and completion history.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Capacity units a single task occupies when it is assigned.
pub const TASK_LOAD_UNITS: f64 = 1.0;

// ---------------------------------------------------------------------------
// Member
// ---------------------------------------------------------------------------

/// A caregiver in the household. Owned by household settings; read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub household_id: String,

    /// Declared weekly capacity, in load units.
    pub max_weekly_load: f64,

    /// Load units already assigned this week.
    #[serde(default)]
    pub current_load: f64,

    #[serde(default)]
    pub skills: BTreeSet<String>,

    #[serde(default)]
    pub preferences: Preferences,
}

impl MemberProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>, max_weekly_load: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            household_id: String::new(),
            max_weekly_load,
            current_load: 0.0,
            skills: BTreeSet::new(),
            preferences: Preferences::default(),
        }
    }

    pub fn household(mut self, household_id: impl Into<String>) -> Self {
        self.household_id = household_id.into();
        self
    }

    pub fn current_load(mut self, load: f64) -> Self {
        self.current_load = load;
        self
    }

    pub fn skill(mut self, skill: impl Into<String>) -> Self {
        self.skills.insert(skill.into());
        self
    }

    pub fn prefers(mut self, category: impl Into<String>) -> Self {
        self.preferences.preferred.insert(category.into());
        self
    }

    pub fn dislikes(mut self, category: impl Into<String>) -> Self {
        self.preferences.disliked.insert(category.into());
        self
    }

    pub fn blocks(mut self, category: impl Into<String>) -> Self {
        self.preferences.blocked.insert(category.into());
        self
    }

    /// Case-insensitive skill lookup.
    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills.iter().any(|s| s.eq_ignore_ascii_case(skill))
    }

    /// Remaining capacity before `max_weekly_load`, never negative.
    pub fn headroom(&self) -> f64 {
        (self.max_weekly_load - self.current_load).max(0.0)
    }
}

/// Category preferences. Matching is case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub preferred: BTreeSet<String>,
    #[serde(default)]
    pub disliked: BTreeSet<String>,
    /// Hard veto: never assign these categories.
    #[serde(default)]
    pub blocked: BTreeSet<String>,
}

impl Preferences {
    pub fn is_blocked(&self, category: &str) -> bool {
        contains_ignore_case(&self.blocked, category)
    }

    pub fn is_preferred(&self, category: &str) -> bool {
        contains_ignore_case(&self.preferred, category)
    }

    pub fn is_disliked(&self, category: &str) -> bool {
        contains_ignore_case(&self.disliked, category)
    }
}

pub(crate) fn contains_ignore_case(set: &BTreeSet<String>, needle: &str) -> bool {
    set.iter().any(|s| s.eq_ignore_ascii_case(needle))
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A chore to be assigned. Immutable; passed per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub estimated_minutes: u32,
    /// 1 (trivial) to 10 (hardest).
    pub difficulty: u8,
    #[serde(default)]
    pub required_skills: BTreeSet<String>,
    /// 1 (lowest) to 10 (most urgent).
    pub priority: u8,
}

impl TaskDefinition {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            estimated_minutes: 30,
            difficulty: 5,
            required_skills: BTreeSet::new(),
            priority: 5,
        }
    }

    pub fn minutes(mut self, minutes: u32) -> Self {
        self.estimated_minutes = minutes;
        self
    }

    pub fn difficulty(mut self, difficulty: u8) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn requires(mut self, skill: impl Into<String>) -> Self {
        self.required_skills.insert(skill.into());
        self
    }

    /// Load units committed to a member when this task is assigned.
    pub fn load_units(&self) -> f64 {
        TASK_LOAD_UNITS
    }
}

/// A task that currently has an assignee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedTask {
    pub task: TaskDefinition,
    pub assignee_id: String,
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Per-member completion history. Append-only, synthesized externally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalData {
    pub member_id: String,
    #[serde(default)]
    pub total_tasks: u32,
    #[serde(default)]
    pub total_minutes: u32,
    /// Oldest first.
    #[serde(default)]
    pub weekly_history: Vec<WeeklyRecord>,
}

/// One week of completed work for a member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyRecord {
    pub week_start: NaiveDate,
    pub task_count: u32,
    pub minutes_worked: u32,
    #[serde(default)]
    pub categories: BTreeMap<String, u32>,
}
