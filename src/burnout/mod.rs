//! Burnout prevention: health tiers, stress signals, alerts, and recovery.
//!
//! The health tier is a pure function of `load_percentage`. Stress indicators
//! come from the shape of recent daily load and shape alerts and recovery
//! advice, but never the tier itself.

pub mod rebalance;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::{
    DailyWorkload, HealthStatus, MemberProfile, MemberWorkloadState, StressIndicator,
    StressIndicatorKind, StressLevel,
};
use crate::predictor::stats;

pub use rebalance::{AutoBalanceResult, Redistribution};

// ---------------------------------------------------------------------------
// Tier boundaries (fixed)
// ---------------------------------------------------------------------------

/// Load percentage at which a member leaves `Healthy`.
pub const ELEVATED_THRESHOLD: f64 = 70.0;
pub const HIGH_THRESHOLD: f64 = 90.0;
pub const CRITICAL_THRESHOLD: f64 = 105.0;
/// Strictly above this is `BurnoutRisk`.
pub const BURNOUT_THRESHOLD: f64 = 120.0;
/// Reported for load against zero capacity.
pub const MAX_LOAD_PERCENTAGE: f64 = 1000.0;

pub const SEVERE_STRESS: f64 = 7.0;
pub const MODERATE_STRESS: f64 = 4.0;

// ---------------------------------------------------------------------------
// Tunable settings
// ---------------------------------------------------------------------------

pub const CONSECUTIVE_OVERLOAD_DAYS: u32 = 4;
pub const REST_WINDOW_DAYS: u32 = 7;
pub const HIGH_VARIANCE_CV: f64 = 0.5;
/// Tasks at or above this priority stay with their assignee when possible.
pub const HIGH_PRIORITY: u8 = 8;

/// Days of history needed before variance means anything.
const MIN_VARIANCE_DAYS: usize = 5;
/// Daily loads carried on a workload state.
const RECENT_WORKLOAD_DAYS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurnoutSettings {
    pub consecutive_overload_days: u32,
    pub rest_window_days: u32,
    pub high_variance_cv: f64,
    pub high_priority: u8,
}

impl Default for BurnoutSettings {
    fn default() -> Self {
        Self {
            consecutive_overload_days: CONSECUTIVE_OVERLOAD_DAYS,
            rest_window_days: REST_WINDOW_DAYS,
            high_variance_cv: HIGH_VARIANCE_CV,
            high_priority: HIGH_PRIORITY,
        }
    }
}

// ---------------------------------------------------------------------------
// Alerts and recovery
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Warning,
    Critical,
    Emergency,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
            AlertSeverity::Emergency => "emergency",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverloadAlert {
    pub member_id: String,
    pub health_status: HealthStatus,
    pub load_percentage: f64,
    pub stress_level: StressLevel,
    pub severity: AlertSeverity,
    pub message: String,
    pub recommended_actions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseholdOverload {
    pub alerts: Vec<OverloadAlert>,
    pub overloaded_members: Vec<String>,
    pub household_load_percentage: f64,
    /// Total load exceeds total capacity: rebalancing alone cannot fix it.
    pub over_capacity: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryType {
    ExtendedRest,
    LightDay,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryPlan {
    pub member_id: String,
    pub recovery_type: RecoveryType,
    pub rest_days: u32,
    /// Load the member should be brought down to.
    pub target_load: f64,
    pub load_reduction: f64,
    pub actions: Vec<String>,
}

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// `current / max * 100`, with zero capacity reported as 0 (idle) or
/// [`MAX_LOAD_PERCENTAGE`] (loaded).
pub fn load_percentage(current_load: f64, max_load: f64) -> f64 {
    if max_load <= 0.0 {
        return if current_load > 0.0 {
            MAX_LOAD_PERCENTAGE
        } else {
            0.0
        };
    }
    (current_load / max_load * 100.0).min(MAX_LOAD_PERCENTAGE)
}

/// Health tier for a load percentage. Tiers are exhaustive, mutually
/// exclusive, and non-decreasing in `load_percentage`.
pub fn calculate_health_status(load_percentage: f64) -> HealthStatus {
    if load_percentage > BURNOUT_THRESHOLD {
        HealthStatus::BurnoutRisk
    } else if load_percentage >= CRITICAL_THRESHOLD {
        HealthStatus::Critical
    } else if load_percentage >= HIGH_THRESHOLD {
        HealthStatus::High
    } else if load_percentage >= ELEVATED_THRESHOLD {
        HealthStatus::Elevated
    } else {
        HealthStatus::Healthy
    }
}

/// Driven by the most severe indicator present.
pub fn assess_stress_level(indicators: &[StressIndicator]) -> StressLevel {
    let max = indicators
        .iter()
        .map(|i| i.severity)
        .fold(0.0_f64, f64::max);
    if max >= SEVERE_STRESS {
        StressLevel::Severe
    } else if max >= MODERATE_STRESS {
        StressLevel::Moderate
    } else {
        StressLevel::Low
    }
}

/// Over-capacity days ending at the most recent entry.
fn trailing_overload_run(days: &[DailyWorkload]) -> u32 {
    let mut run = 0;
    let mut next_date: Option<NaiveDate> = None;
    for day in days.iter().rev() {
        let adjacent = next_date.is_none_or(|next| next - day.date == Duration::days(1));
        if !day.is_over_capacity() || !adjacent {
            break;
        }
        run += 1;
        next_date = Some(day.date);
    }
    run
}

/// Longest run of over-capacity days on consecutive dates.
fn longest_overload_run(days: &[DailyWorkload]) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;
    for day in days {
        if day.is_over_capacity() {
            let adjacent = prev.is_some_and(|p| day.date - p == Duration::days(1));
            run = if adjacent { run + 1 } else { 1 };
            prev = Some(day.date);
        } else {
            run = 0;
            prev = None;
        }
        longest = longest.max(run);
    }
    longest
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// Stateless overload watcher holding only its settings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BurnoutPrevention {
    settings: BurnoutSettings,
}

impl BurnoutPrevention {
    pub fn new(settings: BurnoutSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &BurnoutSettings {
        &self.settings
    }

    /// Consecutive overload, missing rest, and erratic load, each with a
    /// severity in [0, 10].
    pub fn detect_stress_indicators(
        &self,
        daily_workloads: &[DailyWorkload],
        last_rest_date: Option<NaiveDate>,
    ) -> Vec<StressIndicator> {
        let mut days = daily_workloads.to_vec();
        days.sort_by_key(|d| d.date);
        let Some(latest) = days.last().map(|d| d.date) else {
            return Vec::new();
        };
        let mut indicators = Vec::new();

        let run = longest_overload_run(&days);
        let needed = self.settings.consecutive_overload_days;
        if run >= needed {
            indicators.push(StressIndicator {
                kind: StressIndicatorKind::ConsecutiveOverload,
                severity: (f64::from(run) * 10.0 / f64::from(needed * 2)).min(10.0),
                description: format!("{run} consecutive days over capacity"),
            });
        }

        let window_days = i64::from(self.settings.rest_window_days);
        let window_start = latest - Duration::days(window_days - 1);
        let last_rest = days
            .iter()
            .filter(|d| d.is_rest_day())
            .map(|d| d.date)
            .chain(last_rest_date)
            .max();
        let rested_in_window = last_rest.is_some_and(|d| d >= window_start);
        let window_covered = last_rest.is_some() || days[0].date <= window_start;
        if !rested_in_window && window_covered {
            let days_since = match last_rest {
                Some(rest) => (latest - rest).num_days(),
                None => (latest - days[0].date).num_days() + 1,
            };
            indicators.push(StressIndicator {
                kind: StressIndicatorKind::NoRest,
                severity: (days_since as f64 / 2.0).clamp(0.0, 10.0),
                description: format!("no rest day in {days_since} days"),
            });
        }

        if days.len() >= MIN_VARIANCE_DAYS {
            let loads: Vec<f64> = days.iter().map(|d| d.load).collect();
            let cv = stats::coefficient_of_variation(&loads);
            if cv > self.settings.high_variance_cv {
                indicators.push(StressIndicator {
                    kind: StressIndicatorKind::HighVariance,
                    severity: (cv * 5.0).min(10.0),
                    description: format!(
                        "daily load varies by {:.0}% around its mean",
                        cv * 100.0
                    ),
                });
            }
        }

        indicators
    }

    /// Full snapshot for one member: load ratio, tier, and stress signals.
    pub fn build_member_workload_state(
        &self,
        member: &MemberProfile,
        daily_workloads: &[DailyWorkload],
        last_rest_date: Option<NaiveDate>,
    ) -> MemberWorkloadState {
        let mut days = daily_workloads.to_vec();
        days.sort_by_key(|d| d.date);

        let load_percentage = load_percentage(member.current_load, member.max_weekly_load);
        let stress_indicators = self.detect_stress_indicators(&days, last_rest_date);
        let stress_level = assess_stress_level(&stress_indicators);

        MemberWorkloadState {
            member_id: member.id.clone(),
            current_load: member.current_load,
            max_load: member.max_weekly_load,
            load_percentage,
            consecutive_high_load_days: trailing_overload_run(&days),
            recent_workload: days[days.len().saturating_sub(RECENT_WORKLOAD_DAYS)..]
                .iter()
                .map(|d| d.load)
                .collect(),
            health_status: calculate_health_status(load_percentage),
            stress_indicators,
            stress_level,
        }
    }

    /// Alert for a high-or-worse tier, or an elevated tier under severe stress.
    /// `None` otherwise, and always `None` for a healthy member.
    pub fn check_overload(&self, state: &MemberWorkloadState) -> Option<OverloadAlert> {
        let severity = match state.health_status {
            HealthStatus::Healthy => return None,
            HealthStatus::Elevated if state.stress_level == StressLevel::Severe => {
                AlertSeverity::Warning
            }
            HealthStatus::Elevated => return None,
            HealthStatus::High => AlertSeverity::Warning,
            HealthStatus::Critical => AlertSeverity::Critical,
            HealthStatus::BurnoutRisk => AlertSeverity::Emergency,
        };

        let mut recommended_actions = Vec::new();
        if state.health_status >= HealthStatus::High {
            recommended_actions.push("stop assigning new tasks this week".to_string());
        }
        if state.health_status.is_overloaded() {
            recommended_actions
                .push("move lower-priority tasks to members with spare capacity".to_string());
        }
        for indicator in &state.stress_indicators {
            let action = match indicator.kind {
                StressIndicatorKind::ConsecutiveOverload => "break up the run of overloaded days",
                StressIndicatorKind::NoRest => "schedule a full rest day",
                StressIndicatorKind::HighVariance => "spread tasks more evenly across the week",
            };
            recommended_actions.push(action.to_string());
        }
        match determine_recovery_type(state) {
            RecoveryType::ExtendedRest => {
                recommended_actions.push("plan several days of extended rest".to_string())
            }
            RecoveryType::LightDay => recommended_actions.push("plan a light day".to_string()),
            RecoveryType::None => {}
        }

        if state.health_status == HealthStatus::BurnoutRisk {
            warn!(
                member_id = %state.member_id,
                load_percentage = state.load_percentage,
                "member at burnout risk"
            );
        }

        Some(OverloadAlert {
            member_id: state.member_id.clone(),
            health_status: state.health_status,
            load_percentage: state.load_percentage,
            stress_level: state.stress_level,
            severity,
            message: format!(
                "{} is at {:.0}% of capacity ({})",
                state.member_id, state.load_percentage, state.health_status
            ),
            recommended_actions,
        })
    }

    /// Aggregate alert when at least one member alerts.
    pub fn check_household_overload(
        &self,
        states: &[MemberWorkloadState],
    ) -> Option<HouseholdOverload> {
        let alerts: Vec<OverloadAlert> =
            states.iter().filter_map(|s| self.check_overload(s)).collect();
        if alerts.is_empty() {
            return None;
        }
        let total_load: f64 = states.iter().map(|s| s.current_load).sum();
        let total_capacity: f64 = states.iter().map(|s| s.max_load).sum();
        let household_load_percentage = load_percentage(total_load, total_capacity);
        let over_capacity = household_load_percentage > 100.0;
        let overloaded_members: Vec<String> = alerts.iter().map(|a| a.member_id.clone()).collect();

        let message = if over_capacity {
            format!(
                "household is at {household_load_percentage:.0}% of total capacity; \
                 {} member(s) need relief and the load must shrink",
                overloaded_members.len()
            )
        } else {
            format!(
                "{} member(s) overloaded while the household is at \
                 {household_load_percentage:.0}% of capacity",
                overloaded_members.len()
            )
        };

        Some(HouseholdOverload {
            alerts,
            overloaded_members,
            household_load_percentage,
            over_capacity,
            message,
        })
    }

    /// Concrete recovery steps, or `None` when no recovery is indicated.
    pub fn generate_recovery_plan(&self, state: &MemberWorkloadState) -> Option<RecoveryPlan> {
        let recovery_type = determine_recovery_type(state);
        let (rest_days, target_pct, actions) = match recovery_type {
            RecoveryType::None => return None,
            RecoveryType::ExtendedRest => (
                3,
                ELEVATED_THRESHOLD - 10.0,
                vec![
                    "take three days without assigned chores".to_string(),
                    "hand all non-urgent tasks to other members".to_string(),
                    "review capacity before the next weekly plan".to_string(),
                ],
            ),
            RecoveryType::LightDay => (
                1,
                ELEVATED_THRESHOLD - 5.0,
                vec![
                    "keep one day this week to quick tasks only".to_string(),
                    "defer low-priority chores".to_string(),
                ],
            ),
        };
        let target_load = state.max_load * target_pct / 100.0;
        Some(RecoveryPlan {
            member_id: state.member_id.clone(),
            recovery_type,
            rest_days,
            target_load,
            load_reduction: (state.current_load - target_load).max(0.0),
            actions,
        })
    }
}

/// Extended rest for burnout risk under severe stress, a light day for
/// elevated or high load, nothing otherwise.
pub fn determine_recovery_type(state: &MemberWorkloadState) -> RecoveryType {
    match state.health_status {
        HealthStatus::BurnoutRisk if state.stress_level == StressLevel::Severe => {
            RecoveryType::ExtendedRest
        }
        HealthStatus::Elevated | HealthStatus::High => RecoveryType::LightDay,
        _ => RecoveryType::None,
    }
}

/// True exactly for burnout risk.
pub fn needs_immediate_intervention(state: &MemberWorkloadState) -> bool {
    state.health_status == HealthStatus::BurnoutRisk
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32, load: f64) -> DailyWorkload {
        DailyWorkload {
            date: NaiveDate::from_ymd_opt(2026, 3, d).unwrap(),
            load,
            capacity: 4.0,
        }
    }

    #[test]
    fn trailing_run_stops_at_gap() {
        let days = vec![day(1, 5.0), day(2, 5.0), day(4, 5.0), day(5, 6.0)];
        assert_eq!(trailing_overload_run(&days), 2);
        assert_eq!(longest_overload_run(&days), 2);
    }

    #[test]
    fn longest_run_ignores_normal_days() {
        let days = vec![day(1, 5.0), day(2, 5.0), day(3, 5.0), day(4, 1.0), day(5, 6.0)];
        assert_eq!(longest_overload_run(&days), 3);
        assert_eq!(trailing_overload_run(&days), 1);
    }
}
