//! Fair-share task assignment.
//!
//! Every member gets a suitability score for a task, built from five
//! sub-scores on a 0-100 scale:
//!
//! - **load balance**: how far the member sits below or above their fair share
//! - **recent activity**: how little they have done over the last few weeks
//! - **preference**: preferred / disliked / blocked categories
//! - **skill**: coverage of the task's required skills
//! - **availability**: slack left before their weekly capacity
//!
//! The composite is a weighted sum with [`FairnessWeights`]. A blocked category
//! vetoes the member outright (composite 0) whatever the other dimensions say.

pub mod report;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::model::{HistoricalData, MemberProfile, TaskDefinition};
use crate::validate::{validate_members, validate_task, validate_tasks};

pub use report::{
    FairnessReport, LoadStatus, MemberShare, RebalanceSuggestion, calculate_gini_coefficient,
};

// ---------------------------------------------------------------------------
// Tuning constants
// ---------------------------------------------------------------------------

pub const LOAD_BALANCE_WEIGHT: f64 = 0.25;
pub const RECENT_ACTIVITY_WEIGHT: f64 = 0.10;
pub const PREFERENCE_WEIGHT: f64 = 0.25;
pub const SKILL_WEIGHT: f64 = 0.25;
pub const AVAILABILITY_WEIGHT: f64 = 0.15;

/// Score given when a dimension has nothing to say.
pub const NEUTRAL_SCORE: f64 = 50.0;
pub const MAX_SCORE: f64 = 100.0;

/// Added to the neutral preference score for a preferred category.
pub const PREFERRED_BONUS: f64 = 30.0;
/// Subtracted from the neutral preference score for a disliked category.
pub const DISLIKED_PENALTY: f64 = 30.0;

/// Weekly buckets averaged by the recent-activity score.
pub const RECENT_ACTIVITY_WEEKS: usize = 4;
/// Weekly task average at which the recent-activity score falls to 50.
pub const RECENT_ACTIVITY_MIDPOINT: f64 = 10.0;

/// Blend weights for the composite score. Must sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FairnessWeights {
    pub load_balance: f64,
    pub recent_activity: f64,
    pub preference: f64,
    pub skill: f64,
    pub availability: f64,
}

impl Default for FairnessWeights {
    fn default() -> Self {
        Self {
            load_balance: LOAD_BALANCE_WEIGHT,
            recent_activity: RECENT_ACTIVITY_WEIGHT,
            preference: PREFERENCE_WEIGHT,
            skill: SKILL_WEIGHT,
            availability: AVAILABILITY_WEIGHT,
        }
    }
}

impl FairnessWeights {
    pub fn sum(&self) -> f64 {
        self.load_balance + self.recent_activity + self.preference + self.skill + self.availability
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub load_balance: f64,
    pub recent_activity: f64,
    pub preference: f64,
    pub skill: f64,
    pub availability: f64,
}

/// One member's suitability for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairnessScore {
    pub member_id: String,
    /// Weighted composite, 0-100.
    pub total: f64,
    pub breakdown: ScoreBreakdown,
    /// The task's category is blocked for this member.
    pub vetoed: bool,
}

/// The chosen member for a task, with every candidate's score for context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub task_id: String,
    pub member_id: String,
    pub score: FairnessScore,
    /// All candidates, best first.
    pub candidates: Vec<FairnessScore>,
}

/// Result of a sequential batch pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchAssignment {
    /// In processing order (descending priority).
    pub assignments: Vec<Assignment>,
    /// Member loads after every assignment in the batch was committed.
    pub final_loads: BTreeMap<String, f64>,
}

// ---------------------------------------------------------------------------
// Sub-scores
// ---------------------------------------------------------------------------

/// Target share of household workload per member, in percent.
///
/// Proportional to declared capacity. Falls back to an equal split when every
/// capacity is zero; empty input yields an empty map.
pub fn calculate_fair_share(members: &[MemberProfile]) -> BTreeMap<String, f64> {
    if members.is_empty() {
        return BTreeMap::new();
    }
    let total_capacity: f64 = members.iter().map(|m| m.max_weekly_load.max(0.0)).sum();
    if total_capacity <= 0.0 {
        let equal = MAX_SCORE / members.len() as f64;
        return members.iter().map(|m| (m.id.clone(), equal)).collect();
    }
    members
        .iter()
        .map(|m| {
            (
                m.id.clone(),
                m.max_weekly_load.max(0.0) / total_capacity * 100.0,
            )
        })
        .collect()
}

/// 50 at fair share, rising to 100 when the member carries nothing and falling
/// to 0 when they carry everything. Neutral 50 when nothing is assigned yet.
pub fn calculate_load_balance_score(
    member: &MemberProfile,
    fair_share_pct: f64,
    total_assigned: f64,
) -> f64 {
    if total_assigned <= 0.0 {
        return NEUTRAL_SCORE;
    }
    let actual_pct = (member.current_load / total_assigned * 100.0).clamp(0.0, 100.0);
    if fair_share_pct <= 0.0 {
        return if actual_pct > 0.0 { 0.0 } else { NEUTRAL_SCORE };
    }

    let score = if actual_pct < fair_share_pct {
        NEUTRAL_SCORE + (fair_share_pct - actual_pct) / fair_share_pct * NEUTRAL_SCORE
    } else if fair_share_pct >= 100.0 {
        NEUTRAL_SCORE
    } else {
        NEUTRAL_SCORE - (actual_pct - fair_share_pct) / (100.0 - fair_share_pct) * NEUTRAL_SCORE
    };
    score.clamp(0.0, MAX_SCORE)
}

/// Favors members who have done little lately. No history scores 100 so new
/// members build a track record.
pub fn calculate_recent_activity_score(history: Option<&HistoricalData>) -> f64 {
    let Some(history) = history else {
        return MAX_SCORE;
    };
    if history.weekly_history.is_empty() {
        return MAX_SCORE;
    }
    let recent = &history.weekly_history
        [history.weekly_history.len().saturating_sub(RECENT_ACTIVITY_WEEKS)..];
    let avg = recent.iter().map(|w| f64::from(w.task_count)).sum::<f64>() / recent.len() as f64;
    (MAX_SCORE * RECENT_ACTIVITY_MIDPOINT / (RECENT_ACTIVITY_MIDPOINT + avg)).clamp(0.0, MAX_SCORE)
}

/// 0 for a blocked category, 80 preferred, 20 disliked, 50 otherwise.
pub fn calculate_preference_score(member: &MemberProfile, task: &TaskDefinition) -> f64 {
    let prefs = &member.preferences;
    if prefs.is_blocked(&task.category) {
        return 0.0;
    }
    let mut score = NEUTRAL_SCORE;
    if prefs.is_preferred(&task.category) {
        score += PREFERRED_BONUS;
    }
    if prefs.is_disliked(&task.category) {
        score -= DISLIKED_PENALTY;
    }
    score.clamp(0.0, MAX_SCORE)
}

/// Percentage of the task's required skills the member has.
pub fn calculate_skill_score(member: &MemberProfile, task: &TaskDefinition) -> f64 {
    if task.required_skills.is_empty() {
        return MAX_SCORE;
    }
    let matched = task
        .required_skills
        .iter()
        .filter(|s| member.has_skill(s))
        .count();
    matched as f64 / task.required_skills.len() as f64 * 100.0
}

/// Remaining slack before `max_weekly_load`, as a percentage of it.
pub fn calculate_availability_score(member: &MemberProfile) -> f64 {
    if member.max_weekly_load <= 0.0 {
        return 0.0;
    }
    (member.headroom() / member.max_weekly_load * 100.0).clamp(0.0, MAX_SCORE)
}

pub(crate) fn history_for<'a>(
    histories: &'a [HistoricalData],
    member_id: &str,
) -> Option<&'a HistoricalData> {
    histories.iter().find(|h| h.member_id == member_id)
}

// ---------------------------------------------------------------------------
// Algorithm
// ---------------------------------------------------------------------------

/// Stateless scorer holding only its blend weights.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FairnessAlgorithm {
    weights: FairnessWeights,
}

impl FairnessAlgorithm {
    pub fn new(weights: FairnessWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &FairnessWeights {
        &self.weights
    }

    /// Weighted composite of the five sub-scores for one member and task.
    pub fn calculate_fairness_score(
        &self,
        member: &MemberProfile,
        task: &TaskDefinition,
        history: Option<&HistoricalData>,
        fair_share_pct: f64,
        total_assigned: f64,
    ) -> FairnessScore {
        let breakdown = ScoreBreakdown {
            load_balance: calculate_load_balance_score(member, fair_share_pct, total_assigned),
            recent_activity: calculate_recent_activity_score(history),
            preference: calculate_preference_score(member, task),
            skill: calculate_skill_score(member, task),
            availability: calculate_availability_score(member),
        };
        let vetoed = member.preferences.is_blocked(&task.category);
        let total = if vetoed {
            0.0
        } else {
            let w = &self.weights;
            (breakdown.load_balance * w.load_balance
                + breakdown.recent_activity * w.recent_activity
                + breakdown.preference * w.preference
                + breakdown.skill * w.skill
                + breakdown.availability * w.availability)
                .clamp(0.0, MAX_SCORE)
        };
        FairnessScore {
            member_id: member.id.clone(),
            total,
            breakdown,
            vetoed,
        }
    }

    /// Score every member and pick the highest. Ties go to the lower current
    /// load, then to input order. `None` only when `members` is empty.
    pub fn find_best_assignment(
        &self,
        task: &TaskDefinition,
        members: &[MemberProfile],
        histories: &[HistoricalData],
        total_assigned: f64,
    ) -> Result<Option<Assignment>> {
        validate_task(task)?;
        validate_members(members)?;
        let fair_shares = calculate_fair_share(members);
        Ok(self.assign_one(task, members, histories, &fair_shares, total_assigned))
    }

    /// Assign tasks in descending priority, committing each task's load to the
    /// chosen member before the next task is scored.
    ///
    /// Later decisions see the load of earlier ones, so the result differs from
    /// scoring each task independently. Inputs are validated up front; on error
    /// no assignment is returned.
    pub fn assign_tasks_batch(
        &self,
        tasks: &[TaskDefinition],
        members: &[MemberProfile],
        histories: &[HistoricalData],
    ) -> Result<BatchAssignment> {
        validate_tasks(tasks)?;
        validate_members(members)?;

        let mut ordered: Vec<&TaskDefinition> = tasks.iter().collect();
        ordered.sort_by(|a, b| b.priority.cmp(&a.priority));

        let fair_shares = calculate_fair_share(members);
        let mut working: Vec<MemberProfile> = members.to_vec();
        let mut total_assigned: f64 = working.iter().map(|m| m.current_load).sum();
        let mut assignments = Vec::with_capacity(ordered.len());

        for task in ordered {
            let Some(assignment) =
                self.assign_one(task, &working, histories, &fair_shares, total_assigned)
            else {
                // No members: nothing can be assigned.
                break;
            };
            if let Some(member) = working.iter_mut().find(|m| m.id == assignment.member_id) {
                member.current_load += task.load_units();
            }
            total_assigned += task.load_units();
            debug!(
                task_id = %task.id,
                member_id = %assignment.member_id,
                score = assignment.score.total,
                "batch assignment committed"
            );
            assignments.push(assignment);
        }

        info!(
            tasks = tasks.len(),
            assigned = assignments.len(),
            "batch assignment finished"
        );

        Ok(BatchAssignment {
            assignments,
            final_loads: working
                .into_iter()
                .map(|m| (m.id, m.current_load))
                .collect(),
        })
    }

    fn assign_one(
        &self,
        task: &TaskDefinition,
        members: &[MemberProfile],
        histories: &[HistoricalData],
        fair_shares: &BTreeMap<String, f64>,
        total_assigned: f64,
    ) -> Option<Assignment> {
        let ranked = self.rank_candidates(task, members, histories, fair_shares, total_assigned);
        let best = ranked.first()?.clone();
        Some(Assignment {
            task_id: task.id.clone(),
            member_id: best.member_id.clone(),
            score: best,
            candidates: ranked,
        })
    }

    /// All candidates, best first.
    pub(crate) fn rank_candidates(
        &self,
        task: &TaskDefinition,
        members: &[MemberProfile],
        histories: &[HistoricalData],
        fair_shares: &BTreeMap<String, f64>,
        total_assigned: f64,
    ) -> Vec<FairnessScore> {
        let mut scored: Vec<(usize, f64, FairnessScore)> = members
            .iter()
            .enumerate()
            .map(|(idx, member)| {
                let share = fair_shares.get(&member.id).copied().unwrap_or(0.0);
                let score = self.calculate_fairness_score(
                    member,
                    task,
                    history_for(histories, &member.id),
                    share,
                    total_assigned,
                );
                (idx, member.current_load, score)
            })
            .collect();
        scored.sort_by(|a, b| compare_candidates((a.0, a.1, &a.2), (b.0, b.1, &b.2)));
        scored.into_iter().map(|(_, _, score)| score).collect()
    }
}

/// Higher score first, then lower load, then earlier input position.
fn compare_candidates(
    a: (usize, f64, &FairnessScore),
    b: (usize, f64, &FairnessScore),
) -> Ordering {
    b.2.total
        .total_cmp(&a.2.total)
        .then_with(|| a.1.total_cmp(&b.1))
        .then_with(|| a.0.cmp(&b.0))
}
