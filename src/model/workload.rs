//! Workload observations and derived per-member health snapshots.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Time series
// ---------------------------------------------------------------------------

/// One historical observation of household load at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadDataPoint {
    pub timestamp: DateTime<Utc>,
    pub task_count: u32,
    #[serde(default)]
    pub total_minutes: u32,
    pub day_of_week: Weekday,
    #[serde(default)]
    pub categories: BTreeMap<String, u32>,
}

impl WorkloadDataPoint {
    pub fn new(timestamp: DateTime<Utc>, task_count: u32, total_minutes: u32) -> Self {
        Self {
            timestamp,
            task_count,
            total_minutes,
            day_of_week: timestamp.weekday(),
            categories: BTreeMap::new(),
        }
    }

    pub fn category(mut self, name: impl Into<String>, count: u32) -> Self {
        self.categories.insert(name.into(), count);
        self
    }
}

/// Load carried by one member on one day, against that day's capacity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyWorkload {
    pub date: NaiveDate,
    pub load: f64,
    pub capacity: f64,
}

impl DailyWorkload {
    pub fn is_over_capacity(&self) -> bool {
        self.load > self.capacity
    }

    pub fn is_rest_day(&self) -> bool {
        self.load <= 0.0
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

/// Health tier, strictly ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Elevated,
    High,
    Critical,
    BurnoutRisk,
}

impl HealthStatus {
    /// Critical or worse: tasks should be moved away.
    pub fn is_overloaded(self) -> bool {
        self >= HealthStatus::Critical
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Elevated => "elevated",
            HealthStatus::High => "high",
            HealthStatus::Critical => "critical",
            HealthStatus::BurnoutRisk => "burnout_risk",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressIndicatorKind {
    /// A run of consecutive over-capacity days.
    ConsecutiveOverload,
    /// No rest day inside the trailing window.
    NoRest,
    /// Erratic day-to-day swings in load.
    HighVariance,
}

impl std::fmt::Display for StressIndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StressIndicatorKind::ConsecutiveOverload => "consecutive_overload",
            StressIndicatorKind::NoRest => "no_rest",
            StressIndicatorKind::HighVariance => "high_variance",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressIndicator {
    pub kind: StressIndicatorKind,
    /// 0 (negligible) to 10 (severe).
    pub severity: f64,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressLevel {
    Low,
    Moderate,
    Severe,
}

/// Derived per-evaluation snapshot of one member. Never persisted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberWorkloadState {
    pub member_id: String,
    pub current_load: f64,
    pub max_load: f64,
    pub load_percentage: f64,
    pub consecutive_high_load_days: u32,
    /// Most recent daily loads, oldest first.
    pub recent_workload: Vec<f64>,
    pub health_status: HealthStatus,
    pub stress_indicators: Vec<StressIndicator>,
    pub stress_level: StressLevel,
}
