//! JSON interchange record for one household.
//!
//! Everything the engine needs for a pass arrives in a single snapshot.
//! Collaborators (settings, task service, analytics) fill in their parts;
//! missing sections default to empty.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::burnout::BurnoutPrevention;
use crate::delegation::DelegationCandidate;
use crate::error::{Error, Result};
use crate::model::{
    AssignedTask, AvailabilityWindow, DailyWorkload, DelegationHistory, DelegationRequest,
    HistoricalData, MemberProfile, MemberWorkloadState, SkillProfile, TaskDefinition,
    WorkloadDataPoint,
};
use crate::validate::{validate_members, validate_series, validate_task, validate_tasks};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HouseholdSnapshot {
    pub household_id: String,
    /// Evaluation time. Callers fall back to the wall clock when absent.
    pub as_of: Option<DateTime<Utc>>,
    pub members: Vec<MemberProfile>,
    /// Unassigned tasks awaiting a decision.
    pub tasks: Vec<TaskDefinition>,
    pub histories: Vec<HistoricalData>,
    /// Tasks that already have an assignee this week.
    pub assignments: Vec<AssignedTask>,
    /// Household-level daily series, oldest first.
    pub workload_series: Vec<WorkloadDataPoint>,
    /// Per-member daily load, keyed by member id.
    pub daily_workloads: BTreeMap<String, Vec<DailyWorkload>>,
    /// Last full rest day per member id.
    pub last_rest: BTreeMap<String, NaiveDate>,
    pub skill_profiles: Vec<SkillProfile>,
    pub availability: Vec<AvailabilityWindow>,
    pub delegation_history: DelegationHistory,
    pub delegations: Vec<DelegationRequest>,
}

impl HouseholdSnapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Every section well-formed, and every cross-reference names a known member.
    pub fn validate(&self) -> Result<()> {
        validate_members(&self.members)?;
        validate_tasks(&self.tasks)?;
        validate_series(&self.workload_series)?;

        let known: HashSet<&str> = self.members.iter().map(|m| m.id.as_str()).collect();
        let check = |id: &str, what: &str| -> Result<()> {
            if known.contains(id) {
                Ok(())
            } else {
                Err(Error::Validation(format!("{what} refers to unknown member {id}")))
            }
        };

        for assigned in &self.assignments {
            validate_task(&assigned.task)?;
            check(&assigned.assignee_id, "assignment")?;
        }
        for id in self.daily_workloads.keys() {
            check(id, "daily workload")?;
        }
        for id in self.last_rest.keys() {
            check(id, "rest date")?;
        }
        for profile in &self.skill_profiles {
            check(&profile.member_id, "skill profile")?;
        }
        for window in &self.availability {
            check(&window.member_id, "availability window")?;
            if window.end <= window.start {
                return Err(Error::Validation(format!(
                    "availability window for {} ends before it starts",
                    window.member_id
                )));
            }
        }
        Ok(())
    }

    pub fn member(&self, id: &str) -> Option<&MemberProfile> {
        self.members.iter().find(|m| m.id == id)
    }

    /// Pending or assigned task by id.
    pub fn task(&self, id: &str) -> Option<&TaskDefinition> {
        self.tasks
            .iter()
            .find(|t| t.id == id)
            .or_else(|| self.assignments.iter().map(|a| &a.task).find(|t| t.id == id))
    }

    pub fn skill_profile(&self, member_id: &str) -> Option<&SkillProfile> {
        self.skill_profiles.iter().find(|p| p.member_id == member_id)
    }

    /// One candidate per member, with their skill profile and calendar.
    pub fn delegation_candidates(&self) -> Vec<DelegationCandidate> {
        self.members
            .iter()
            .map(|m| DelegationCandidate {
                member: m.clone(),
                skill_profile: self.skill_profile(&m.id).cloned(),
                windows: self
                    .availability
                    .iter()
                    .filter(|w| w.member_id == m.id)
                    .cloned()
                    .collect(),
            })
            .collect()
    }

    /// Workload state for every member, in roster order.
    pub fn workload_states(&self, burnout: &BurnoutPrevention) -> Vec<MemberWorkloadState> {
        self.members
            .iter()
            .map(|m| {
                let daily = self
                    .daily_workloads
                    .get(&m.id)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                burnout.build_member_workload_state(m, daily, self.last_rest.get(&m.id).copied())
            })
            .collect()
    }
}
