//! Workload prediction over historical data points.
//!
//! Patterns are found by grouping the series into cyclic buckets (hour of day,
//! day of week, month) and measuring how much of the total variance the
//! grouping explains, adjusted for the number of buckets so that noise scores
//! near zero. The adjusted fraction is the pattern's confidence, and each
//! bucket's mean relative to the overall mean becomes a multiplier that
//! forecasting applies to future dates.

pub mod anomaly;
pub mod forecast;
pub(crate) mod stats;

use std::collections::BTreeMap;

use chrono::{Datelike, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::model::WorkloadDataPoint;

pub use anomaly::{AnomalyType, WorkloadAnomaly};
pub use forecast::{MonthlyProfile, PredictionFactor, PredictionOptions, WorkloadPrediction};

// ---------------------------------------------------------------------------
// Tuning constants
// ---------------------------------------------------------------------------

/// Series shorter than this yield no patterns.
pub const MIN_PATTERN_POINTS: usize = 14;
/// Adjusted explained-variance fraction a grouping needs before it counts as
/// a pattern.
pub const MIN_PATTERN_CONFIDENCE: f64 = 0.3;
/// Every bucket of a grouping needs at least this many points.
pub const MIN_BUCKET_POINTS: usize = 3;
/// Weekend mean must differ from the weekday mean by this ratio to be named.
pub const WEEKEND_SHIFT_RATIO: f64 = 0.2;
/// Seasonal grouping needs the series to span at least this many days.
pub const MIN_SEASONAL_SPAN_DAYS: i64 = 60;

/// Most recent points fed to the trend regression.
pub const TREND_WINDOW: usize = 28;
/// Fewer points than this: stable with zero confidence.
pub const MIN_TREND_POINTS: usize = 7;
/// Relative change across the window needed to call a direction.
pub const TREND_CHANGE_THRESHOLD: f64 = 0.1;
/// Minimum r² before a direction is called; weaker fits are cycles or noise.
pub const MIN_TREND_FIT: f64 = 0.25;

pub const ANOMALY_WINDOW: usize = 7;
/// Deviation from the rolling baseline, in spreads, that flags an anomaly.
pub const ANOMALY_THRESHOLD: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionSettings {
    pub min_pattern_points: usize,
    pub trend_window: usize,
    pub anomaly_window: usize,
    pub anomaly_threshold: f64,
}

impl Default for PredictionSettings {
    fn default() -> Self {
        Self {
            min_pattern_points: MIN_PATTERN_POINTS,
            trend_window: TREND_WINDOW,
            anomaly_window: ANOMALY_WINDOW,
            anomaly_threshold: ANOMALY_THRESHOLD,
        }
    }
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Daily,
    Weekly,
    Seasonal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    WeekendReduction,
    WeekendPeak,
    WeeklyCycle,
    DailyPeak,
    SeasonalVariation,
}

impl PatternKind {
    pub fn pattern_type(self) -> PatternType {
        match self {
            PatternKind::WeekendReduction | PatternKind::WeekendPeak | PatternKind::WeeklyCycle => {
                PatternType::Weekly
            }
            PatternKind::DailyPeak => PatternType::Daily,
            PatternKind::SeasonalVariation => PatternType::Seasonal,
        }
    }
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PatternKind::WeekendReduction => "weekend_reduction",
            PatternKind::WeekendPeak => "weekend_peak",
            PatternKind::WeeklyCycle => "weekly_cycle",
            PatternKind::DailyPeak => "daily_peak",
            PatternKind::SeasonalVariation => "seasonal_variation",
        };
        write!(f, "{s}")
    }
}

/// A cyclic regularity in the series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadPattern {
    pub kind: PatternKind,
    pub pattern_type: PatternType,
    /// Fraction of variance explained by the cycle, 0-1.
    pub confidence: f64,
    pub description: String,
    /// Bucket with the highest mean (hour, weekday from Monday = 0, or month).
    pub peak_bucket: u32,
    /// Bucket mean divided by the overall mean.
    pub multipliers: BTreeMap<u32, f64>,
}

impl WorkloadPattern {
    /// Multiplier for a bucket, shrunk toward 1 by the pattern's confidence.
    pub fn weighted_multiplier(&self, bucket: u32) -> f64 {
        match self.multipliers.get(&bucket) {
            Some(m) => 1.0 + (m - 1.0) * self.confidence,
            None => 1.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Trend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Stable,
    Decreasing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadTrend {
    pub direction: TrendDirection,
    /// Tasks per day.
    pub slope: f64,
    /// Fitted change across the window relative to its mean.
    pub change_ratio: f64,
    pub confidence: f64,
    pub sample_size: usize,
}

impl WorkloadTrend {
    fn insufficient(sample_size: usize) -> Self {
        Self {
            direction: TrendDirection::Stable,
            slope: 0.0,
            change_ratio: 0.0,
            confidence: 0.0,
            sample_size,
        }
    }
}

// ---------------------------------------------------------------------------
// Predictor
// ---------------------------------------------------------------------------

/// Stateless forecaster holding only its window settings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorkloadPredictor {
    settings: PredictionSettings,
}

impl WorkloadPredictor {
    pub fn new(settings: PredictionSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &PredictionSettings {
        &self.settings
    }

    /// Trend window in points, never zero.
    fn trend_window(&self) -> usize {
        self.settings.trend_window.max(1)
    }

    /// Daily, weekly, and seasonal cycles with enough explained variance.
    /// Empty below the minimum series length or for a constant series.
    pub fn detect_patterns(&self, series: &[WorkloadDataPoint]) -> Vec<WorkloadPattern> {
        if series.len() < self.settings.min_pattern_points {
            return Vec::new();
        }
        let values: Vec<f64> = series.iter().map(|p| f64::from(p.task_count)).collect();
        if stats::variance(&values) <= f64::EPSILON {
            return Vec::new();
        }

        let mut patterns = Vec::new();

        let hours: Vec<u32> = series.iter().map(|p| p.timestamp.hour()).collect();
        if let Some(grouping) = CyclicGrouping::fit(&values, &hours) {
            let peak = grouping.peak_bucket;
            patterns.push(grouping.into_pattern(
                PatternKind::DailyPeak,
                format!("workload peaks around {peak:02}:00"),
            ));
        }

        let weekdays: Vec<u32> = series
            .iter()
            .map(|p| p.day_of_week.num_days_from_monday())
            .collect();
        if let Some(grouping) = CyclicGrouping::fit(&values, &weekdays) {
            patterns.push(weekly_pattern(grouping, &values, &weekdays));
        }

        let span_days = series
            .last()
            .zip(series.first())
            .map(|(last, first)| (last.timestamp - first.timestamp).num_days())
            .unwrap_or(0);
        if span_days >= MIN_SEASONAL_SPAN_DAYS {
            let months: Vec<u32> = series.iter().map(|p| p.timestamp.month()).collect();
            if let Some(grouping) = CyclicGrouping::fit(&values, &months) {
                let peak = grouping.peak_bucket;
                patterns.push(grouping.into_pattern(
                    PatternKind::SeasonalVariation,
                    format!("workload is highest in month {peak}"),
                ));
            }
        }

        patterns
    }

    /// Least-squares slope over the most recent window.
    pub fn analyze_workload_trend(&self, series: &[WorkloadDataPoint]) -> WorkloadTrend {
        let window = &series[series.len().saturating_sub(self.trend_window())..];
        if window.len() < MIN_TREND_POINTS {
            return WorkloadTrend::insufficient(window.len());
        }

        let origin = window[0].timestamp;
        let xs: Vec<f64> = window
            .iter()
            .map(|p| (p.timestamp - origin).num_seconds() as f64 / 86_400.0)
            .collect();
        let ys: Vec<f64> = window.iter().map(|p| f64::from(p.task_count)).collect();

        let Some(fit) = stats::linear_fit(&xs, &ys) else {
            return WorkloadTrend::insufficient(window.len());
        };

        let span = xs.last().copied().unwrap_or(0.0) - xs[0];
        let mean = stats::mean(&ys);
        let change_ratio = if mean > 0.0 {
            fit.slope * span / mean
        } else {
            0.0
        };

        let direction = if fit.r_squared < MIN_TREND_FIT {
            TrendDirection::Stable
        } else if change_ratio > TREND_CHANGE_THRESHOLD {
            TrendDirection::Increasing
        } else if change_ratio < -TREND_CHANGE_THRESHOLD {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        };
        // A stable verdict is confident when time explains little of the variance.
        let confidence = match direction {
            TrendDirection::Stable => 1.0 - fit.r_squared,
            _ => fit.r_squared,
        };

        WorkloadTrend {
            direction,
            slope: fit.slope,
            change_ratio,
            confidence: confidence.clamp(0.0, 1.0),
            sample_size: window.len(),
        }
    }
}

fn weekly_pattern(grouping: CyclicGrouping, values: &[f64], weekdays: &[u32]) -> WorkloadPattern {
    let is_weekend = |d: u32| {
        d == Weekday::Sat.num_days_from_monday() || d == Weekday::Sun.num_days_from_monday()
    };
    let (weekend, weekday): (Vec<(f64, u32)>, Vec<(f64, u32)>) = values
        .iter()
        .copied()
        .zip(weekdays.iter().copied())
        .partition(|(_, d)| is_weekend(*d));

    let weekend_mean = stats::mean(&weekend.iter().map(|(v, _)| *v).collect::<Vec<_>>());
    let weekday_mean = stats::mean(&weekday.iter().map(|(v, _)| *v).collect::<Vec<_>>());

    if !weekend.is_empty() && !weekday.is_empty() && weekday_mean > 0.0 {
        let ratio = weekend_mean / weekday_mean;
        if ratio < 1.0 - WEEKEND_SHIFT_RATIO {
            return grouping.into_pattern(
                PatternKind::WeekendReduction,
                format!("weekend workload runs at {:.0}% of weekdays", ratio * 100.0),
            );
        }
        if ratio > 1.0 + WEEKEND_SHIFT_RATIO {
            return grouping.into_pattern(
                PatternKind::WeekendPeak,
                format!("weekend workload runs at {:.0}% of weekdays", ratio * 100.0),
            );
        }
    }

    let peak = weekday_name(grouping.peak_bucket);
    grouping.into_pattern(PatternKind::WeeklyCycle, format!("workload peaks on {peak}"))
}

fn weekday_name(days_from_monday: u32) -> &'static str {
    match days_from_monday {
        0 => "Monday",
        1 => "Tuesday",
        2 => "Wednesday",
        3 => "Thursday",
        4 => "Friday",
        5 => "Saturday",
        _ => "Sunday",
    }
}

/// Values grouped by a cyclic key, with the variance the grouping explains.
struct CyclicGrouping {
    explained: f64,
    peak_bucket: u32,
    multipliers: BTreeMap<u32, f64>,
}

impl CyclicGrouping {
    /// `None` unless there are at least two buckets, each holding
    /// [`MIN_BUCKET_POINTS`], and the grouping explains enough variance.
    ///
    /// Explained variance is adjusted for degrees of freedom:
    /// `1 - (SS_within / (n - k)) / (SS_total / (n - 1))`.
    fn fit(values: &[f64], keys: &[u32]) -> Option<Self> {
        let mut buckets: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        for (value, key) in values.iter().zip(keys) {
            buckets.entry(*key).or_default().push(*value);
        }
        if buckets.len() < 2 || buckets.values().any(|vs| vs.len() < MIN_BUCKET_POINTS) {
            return None;
        }
        let n = values.len() as f64;
        let k = buckets.len() as f64;

        let overall = stats::mean(values);
        let ss_total: f64 = values.iter().map(|v| (v - overall).powi(2)).sum();
        if ss_total <= f64::EPSILON || overall <= 0.0 {
            return None;
        }
        let ss_within: f64 = buckets
            .values()
            .map(|vs| {
                let m = stats::mean(vs);
                vs.iter().map(|v| (v - m).powi(2)).sum::<f64>()
            })
            .sum();
        let explained = (1.0 - (ss_within / (n - k)) / (ss_total / (n - 1.0))).clamp(0.0, 1.0);
        if explained < MIN_PATTERN_CONFIDENCE {
            return None;
        }

        let multipliers: BTreeMap<u32, f64> = buckets
            .iter()
            .map(|(k, vs)| (*k, stats::mean(vs) / overall))
            .collect();
        let peak_bucket = multipliers
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(k, _)| *k)
            .unwrap_or(0);

        Some(Self {
            explained,
            peak_bucket,
            multipliers,
        })
    }

    fn into_pattern(self, kind: PatternKind, description: String) -> WorkloadPattern {
        WorkloadPattern {
            kind,
            pattern_type: kind.pattern_type(),
            confidence: self.explained,
            description,
            peak_bucket: self.peak_bucket,
            multipliers: self.multipliers,
        }
    }
}
