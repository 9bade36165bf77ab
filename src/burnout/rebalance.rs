//! Household-wide auto-balancing.
//!
//! Tasks move from critical or burnout-risk members to healthy members who
//! sit below their proportional share of the household load. Lower-priority
//! tasks move first; high-priority tasks are only touched once every
//! lower-priority option is exhausted.
//!
//! A recipient never receives a category they block. Members who hold a
//! task's required skills are preferred, and high-priority tasks only go to
//! them.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{BurnoutPrevention, calculate_health_status, load_percentage};
use crate::error::{Error, Result};
use crate::model::{
    AssignedTask, HealthStatus, MemberProfile, MemberWorkloadState, TaskDefinition,
};
use crate::validate::validate_task;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Redistribution {
    pub task_id: String,
    pub from_member: String,
    pub to_member: String,
    pub priority: u8,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoBalanceResult {
    /// In the order the moves were decided.
    pub redistributed: Vec<Redistribution>,
    /// No member remains critical or worse.
    pub resolved: bool,
    pub remaining_overloaded: Vec<String>,
    /// Member states after every move was applied.
    pub states: Vec<MemberWorkloadState>,
}

impl BurnoutPrevention {
    /// Reassign tasks away from overloaded members in one sequential pass.
    ///
    /// Each move updates the running states before the next is chosen. Every
    /// state needs a matching profile in `members`, which supplies vetoes and
    /// skills. Inputs are validated first; an error means no move was made.
    pub fn auto_balance_workload(
        &self,
        states: &[MemberWorkloadState],
        members: &[MemberProfile],
        reassignable: &[AssignedTask],
    ) -> Result<AutoBalanceResult> {
        validate_states(states)?;
        let profiles: HashMap<&str, &MemberProfile> =
            members.iter().map(|m| (m.id.as_str(), m)).collect();
        let mut roster = Vec::with_capacity(states.len());
        for state in states {
            let profile = profiles.get(state.member_id.as_str()).ok_or_else(|| {
                Error::Validation(format!("no member profile for {}", state.member_id))
            })?;
            roster.push(*profile);
        }
        for assigned in reassignable {
            validate_task(&assigned.task)?;
            if !states.iter().any(|s| s.member_id == assigned.assignee_id) {
                return Err(Error::Validation(format!(
                    "task {} is assigned to unknown member {}",
                    assigned.task.id, assigned.assignee_id
                )));
            }
        }

        let mut working: Vec<MemberWorkloadState> = states.to_vec();
        let total_load: f64 = working.iter().map(|s| s.current_load).sum();
        let total_capacity: f64 = working.iter().map(|s| s.max_load).sum();
        let household_ratio = if total_capacity > 0.0 {
            total_load / total_capacity
        } else {
            0.0
        };

        let mut senders: Vec<usize> = (0..working.len())
            .filter(|&i| working[i].health_status.is_overloaded())
            .collect();
        senders.sort_by(|&a, &b| {
            working[b]
                .load_percentage
                .total_cmp(&working[a].load_percentage)
        });

        let high_priority = self.settings.high_priority;
        let mut moved: HashSet<&str> = HashSet::new();
        let mut redistributed = Vec::new();

        // Low-priority tasks first; high-priority ones only if overload persists.
        for keep_high in [true, false] {
            for &sender in &senders {
                let sender_id = working[sender].member_id.clone();
                let mut tasks: Vec<&AssignedTask> = reassignable
                    .iter()
                    .filter(|a| a.assignee_id == sender_id)
                    .filter(|a| !keep_high || a.task.priority < high_priority)
                    .collect();
                tasks.sort_by_key(|a| a.task.priority);

                for assigned in tasks {
                    if !working[sender].health_status.is_overloaded() {
                        break;
                    }
                    if moved.contains(assigned.task.id.as_str()) {
                        continue;
                    }
                    let units = assigned.task.load_units();
                    let candidate = Candidate {
                        task: &assigned.task,
                        units,
                        skilled_only: assigned.task.priority >= high_priority,
                    };
                    let Some(recipient) =
                        pick_recipient(&working, &roster, sender, &candidate, household_ratio)
                    else {
                        continue;
                    };

                    apply_load(&mut working[sender], -units);
                    apply_load(&mut working[recipient], units);
                    moved.insert(assigned.task.id.as_str());

                    let recipient_id = working[recipient].member_id.clone();
                    debug!(
                        task_id = %assigned.task.id,
                        from = %sender_id,
                        to = %recipient_id,
                        "task redistributed"
                    );
                    redistributed.push(Redistribution {
                        task_id: assigned.task.id.clone(),
                        from_member: sender_id.clone(),
                        to_member: recipient_id.clone(),
                        priority: assigned.task.priority,
                        reason: format!(
                            "{sender_id} is overloaded; {recipient_id} has spare capacity"
                        ),
                    });
                }
            }
        }

        let remaining_overloaded: Vec<String> = working
            .iter()
            .filter(|s| s.health_status.is_overloaded())
            .map(|s| s.member_id.clone())
            .collect();

        info!(
            moved = redistributed.len(),
            remaining = remaining_overloaded.len(),
            "auto-balance finished"
        );

        Ok(AutoBalanceResult {
            redistributed,
            resolved: remaining_overloaded.is_empty(),
            remaining_overloaded,
            states: working,
        })
    }
}

struct Candidate<'a> {
    task: &'a TaskDefinition,
    units: f64,
    /// Only members holding every required skill may take it.
    skilled_only: bool,
}

/// Healthy member below their share who stays healthy after taking the task
/// and does not block its category. Skilled members first, then least loaded.
fn pick_recipient(
    working: &[MemberWorkloadState],
    roster: &[&MemberProfile],
    sender: usize,
    candidate: &Candidate<'_>,
    household_ratio: f64,
) -> Option<usize> {
    let task = candidate.task;
    let skilled = |i: usize| task.required_skills.iter().all(|s| roster[i].has_skill(s));
    working
        .iter()
        .enumerate()
        .filter(|(i, s)| {
            *i != sender
                && !roster[*i].preferences.is_blocked(&task.category)
                && (!candidate.skilled_only || skilled(*i))
                && s.health_status == HealthStatus::Healthy
                && s.current_load < s.max_load * household_ratio
                && calculate_health_status(load_percentage(
                    s.current_load + candidate.units,
                    s.max_load,
                )) == HealthStatus::Healthy
        })
        .min_by(|a, b| {
            skilled(b.0)
                .cmp(&skilled(a.0))
                .then_with(|| a.1.load_percentage.total_cmp(&b.1.load_percentage))
                .then_with(|| a.0.cmp(&b.0))
        })
        .map(|(i, _)| i)
}

fn apply_load(state: &mut MemberWorkloadState, delta: f64) {
    state.current_load = (state.current_load + delta).max(0.0);
    state.load_percentage = load_percentage(state.current_load, state.max_load);
    state.health_status = calculate_health_status(state.load_percentage);
}

fn validate_states(states: &[MemberWorkloadState]) -> Result<()> {
    let mut seen = HashSet::new();
    for state in states {
        if state.member_id.trim().is_empty() {
            return Err(Error::Validation(
                "workload state has an empty member id".to_string(),
            ));
        }
        if !state.current_load.is_finite()
            || state.current_load < 0.0
            || !state.max_load.is_finite()
            || state.max_load < 0.0
        {
            return Err(Error::Validation(format!(
                "workload state for {} has invalid load or capacity",
                state.member_id
            )));
        }
        if !seen.insert(state.member_id.as_str()) {
            return Err(Error::Validation(format!(
                "duplicate workload state for {}",
                state.member_id
            )));
        }
    }
    Ok(())
}
