//! Household-level fairness: inequality measurement and rebalancing moves.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{FairnessAlgorithm, calculate_fair_share, history_for};
use crate::error::{Error, Result};
use crate::model::{AssignedTask, HistoricalData, MemberProfile, TaskDefinition};
use crate::validate::validate_members;

/// Percentage points a member may drift from fair share and still be balanced.
pub const REBALANCE_TOLERANCE_PCT: f64 = 10.0;
/// Households below this Gini are reported as fair.
pub const FAIR_GINI_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Underloaded,
    Balanced,
    Overloaded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberShare {
    pub member_id: String,
    pub fair_share: f64,
    pub actual_share: f64,
    /// `actual_share - fair_share`, positive when overloaded.
    pub deviation: f64,
    pub status: LoadStatus,
}

/// A proposed move of one task, for manual approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceSuggestion {
    pub task_id: String,
    pub from_user: String,
    pub to_user: String,
    pub reason: String,
    /// Recipient's fairness score for the task.
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairnessReport {
    pub gini: f64,
    pub is_fair: bool,
    pub total_load: f64,
    pub members: Vec<MemberShare>,
    pub suggestions: Vec<RebalanceSuggestion>,
}

/// 0 for an equal distribution, approaching 1 as one member carries everything.
pub fn calculate_gini_coefficient(loads: &[f64]) -> f64 {
    if loads.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f64> = loads.iter().map(|l| l.max(0.0)).collect();
    sorted.sort_by(f64::total_cmp);
    let sum: f64 = sorted.iter().sum();
    if sum <= 0.0 {
        return 0.0;
    }
    let n = sorted.len() as f64;
    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, x)| (i as f64 + 1.0) * x)
        .sum();
    (2.0 * weighted / (n * sum) - (n + 1.0) / n).clamp(0.0, 1.0)
}

fn member_shares(members: &[MemberProfile]) -> Vec<MemberShare> {
    let fair = calculate_fair_share(members);
    let total: f64 = members.iter().map(|m| m.current_load).sum();
    members
        .iter()
        .map(|m| {
            let fair_share = fair.get(&m.id).copied().unwrap_or(0.0);
            if total <= 0.0 {
                return MemberShare {
                    member_id: m.id.clone(),
                    fair_share,
                    actual_share: 0.0,
                    deviation: 0.0,
                    status: LoadStatus::Balanced,
                };
            }
            let actual_share = m.current_load / total * 100.0;
            let deviation = actual_share - fair_share;
            let status = if deviation > REBALANCE_TOLERANCE_PCT {
                LoadStatus::Overloaded
            } else if deviation < -REBALANCE_TOLERANCE_PCT {
                LoadStatus::Underloaded
            } else {
                LoadStatus::Balanced
            };
            MemberShare {
                member_id: m.id.clone(),
                fair_share,
                actual_share,
                deviation,
                status,
            }
        })
        .collect()
}

impl FairnessAlgorithm {
    /// Gini over current loads, per-member share breakdown, and rebalancing moves.
    pub fn generate_fairness_report(
        &self,
        members: &[MemberProfile],
        assignments: &[AssignedTask],
        histories: &[HistoricalData],
    ) -> Result<FairnessReport> {
        let suggestions = self.suggest_rebalancing(members, assignments, histories)?;
        let loads: Vec<f64> = members.iter().map(|m| m.current_load).collect();
        let gini = calculate_gini_coefficient(&loads);
        Ok(FairnessReport {
            gini,
            is_fair: gini < FAIR_GINI_THRESHOLD,
            total_load: loads.iter().sum(),
            members: member_shares(members),
            suggestions,
        })
    }

    /// Moves from members above fair share to better-fit members below it,
    /// best first.
    ///
    /// Lower-priority tasks are offered first. A move is only proposed when it
    /// keeps the recipient within tolerance of their own fair share, and moves
    /// stop once the sender is back within tolerance.
    pub fn suggest_rebalancing(
        &self,
        members: &[MemberProfile],
        assignments: &[AssignedTask],
        histories: &[HistoricalData],
    ) -> Result<Vec<RebalanceSuggestion>> {
        validate_members(members)?;
        for assigned in assignments {
            crate::validate::validate_task(&assigned.task)?;
            if !members.iter().any(|m| m.id == assigned.assignee_id) {
                return Err(Error::Validation(format!(
                    "task {} is assigned to unknown member {}",
                    assigned.task.id, assigned.assignee_id
                )));
            }
        }

        let fair = calculate_fair_share(members);
        let total: f64 = members.iter().map(|m| m.current_load).sum();
        if total <= 0.0 {
            return Ok(Vec::new());
        }

        let mut working: Vec<MemberProfile> = members.to_vec();
        let fair_of = |id: &str| fair.get(id).copied().unwrap_or(0.0);
        let deviation =
            |m: &MemberProfile| m.current_load / total * 100.0 - fair_of(m.id.as_str());

        let mut senders: Vec<usize> = (0..working.len())
            .filter(|&i| deviation(&working[i]) > REBALANCE_TOLERANCE_PCT)
            .collect();
        senders.sort_by(|&a, &b| deviation(&working[b]).total_cmp(&deviation(&working[a])));

        let mut suggestions = Vec::new();
        for sender in senders {
            let sender_id = working[sender].id.clone();
            let mut tasks: Vec<&TaskDefinition> = assignments
                .iter()
                .filter(|a| a.assignee_id == sender_id)
                .map(|a| &a.task)
                .collect();
            tasks.sort_by_key(|t| t.priority);

            for task in tasks {
                let over_by = deviation(&working[sender]);
                if over_by <= REBALANCE_TOLERANCE_PCT {
                    break;
                }
                let units = task.load_units();

                let best = working
                    .iter()
                    .enumerate()
                    .filter(|(i, m)| {
                        *i != sender
                            && deviation(*m) < 0.0
                            && !m.preferences.is_blocked(&task.category)
                            && (m.current_load + units) / total * 100.0 - fair_of(m.id.as_str())
                                <= REBALANCE_TOLERANCE_PCT
                    })
                    .map(|(i, m)| {
                        let score = self.calculate_fairness_score(
                            m,
                            task,
                            history_for(histories, &m.id),
                            fair_of(m.id.as_str()),
                            total,
                        );
                        (i, score.total)
                    })
                    .max_by(|a, b| a.1.total_cmp(&b.1).then_with(|| b.0.cmp(&a.0)));

                let Some((recipient, score)) = best else {
                    continue;
                };
                let recipient_id = working[recipient].id.clone();
                debug!(
                    task_id = %task.id,
                    from = %sender_id,
                    to = %recipient_id,
                    score,
                    "rebalancing move proposed"
                );
                suggestions.push(RebalanceSuggestion {
                    task_id: task.id.clone(),
                    from_user: sender_id.clone(),
                    to_user: recipient_id.clone(),
                    reason: format!(
                        "{sender_id} is {over_by:.1} points above fair share; \
                         {recipient_id} is below it and scores {score:.0} for {}",
                        task.category
                    ),
                    score,
                });
                working[sender].current_load -= units;
                working[recipient].current_load += units;
            }
        }

        suggestions.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(suggestions)
    }
}
