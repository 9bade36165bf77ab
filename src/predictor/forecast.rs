//! Point and range forecasts, plus the monthly seasonal profile.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{PatternType, TrendDirection, WorkloadPattern, WorkloadPredictor, WorkloadTrend, stats};
use crate::model::WorkloadDataPoint;

/// Prediction confidence halves roughly every three weeks of horizon.
pub const HORIZON_DECAY_DAYS: f64 = 30.0;
/// Pattern confidence assumed when no cycle was detected.
const NO_PATTERN_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionOptions {
    pub include_categories: bool,
    pub apply_trend: bool,
    pub apply_patterns: bool,
}

impl Default for PredictionOptions {
    fn default() -> Self {
        Self {
            include_categories: false,
            apply_trend: true,
            apply_patterns: true,
        }
    }
}

/// One contribution to a prediction, in tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionFactor {
    pub name: String,
    pub impact: f64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadPrediction {
    pub date: NaiveDate,
    pub predicted_task_count: f64,
    pub predicted_minutes: f64,
    pub confidence: f64,
    pub factors: Vec<PredictionFactor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_breakdown: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyProfile {
    /// 1-12.
    pub month: u32,
    pub avg_task_count: f64,
    pub avg_minutes: f64,
    pub sample_count: usize,
}

/// Everything a forecast needs that does not depend on the target date.
struct ForecastBasis {
    base: f64,
    minutes_per_task: f64,
    origin: NaiveDate,
    x_mean: f64,
    last_date: NaiveDate,
    trend: WorkloadTrend,
    patterns: Vec<WorkloadPattern>,
    category_shares: BTreeMap<String, f64>,
    sample_factor: f64,
}

impl WorkloadPredictor {
    /// Expected task count for `target`: recent baseline, projected along the
    /// trend, scaled by any weekly and seasonal cycle.
    pub fn predict_workload(
        &self,
        series: &[WorkloadDataPoint],
        target: NaiveDate,
        options: PredictionOptions,
    ) -> WorkloadPrediction {
        match self.basis(series) {
            Some(basis) => predict_from(&basis, target, options),
            None => empty_prediction(target),
        }
    }

    /// One prediction per day across the inclusive range. Empty when `end`
    /// precedes `start`.
    pub fn predict_workload_range(
        &self,
        series: &[WorkloadDataPoint],
        start: NaiveDate,
        end: NaiveDate,
        options: PredictionOptions,
    ) -> Vec<WorkloadPrediction> {
        if end < start {
            return Vec::new();
        }
        let basis = self.basis(series);
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .map(|date| match &basis {
                Some(basis) => predict_from(basis, date, options),
                None => empty_prediction(date),
            })
            .collect()
    }

    /// Sum of daily predictions over the inclusive range.
    ///
    /// Callers use this as an anticipated `total_assigned` when scoring ahead
    /// of a busy week.
    pub fn expected_load(
        &self,
        series: &[WorkloadDataPoint],
        start: NaiveDate,
        end: NaiveDate,
    ) -> f64 {
        self.predict_workload_range(series, start, end, PredictionOptions::default())
            .iter()
            .map(|p| p.predicted_task_count)
            .sum()
    }

    /// Average task count and minutes per calendar month, months ascending.
    pub fn build_seasonal_profile(&self, series: &[WorkloadDataPoint]) -> Vec<MonthlyProfile> {
        let mut months: BTreeMap<u32, (f64, f64, usize)> = BTreeMap::new();
        for point in series {
            let entry = months.entry(point.timestamp.month()).or_insert((0.0, 0.0, 0));
            entry.0 += f64::from(point.task_count);
            entry.1 += f64::from(point.total_minutes);
            entry.2 += 1;
        }
        months
            .into_iter()
            .map(|(month, (tasks, minutes, n))| MonthlyProfile {
                month,
                avg_task_count: tasks / n as f64,
                avg_minutes: minutes / n as f64,
                sample_count: n,
            })
            .collect()
    }

    fn basis(&self, series: &[WorkloadDataPoint]) -> Option<ForecastBasis> {
        let last = series.last()?;
        let window = &series[series.len().saturating_sub(self.trend_window())..];

        let counts: Vec<f64> = window.iter().map(|p| f64::from(p.task_count)).collect();
        let total_tasks: f64 = counts.iter().sum();
        let total_minutes: f64 = window.iter().map(|p| f64::from(p.total_minutes)).sum();

        let origin = window[0].timestamp.date_naive();
        let xs: Vec<f64> = window
            .iter()
            .map(|p| (p.timestamp.date_naive() - origin).num_days() as f64)
            .collect();

        let mut categories: BTreeMap<String, f64> = BTreeMap::new();
        for point in window {
            for (name, count) in &point.categories {
                *categories.entry(name.clone()).or_insert(0.0) += f64::from(*count);
            }
        }
        let category_total: f64 = categories.values().sum();
        let category_shares = if category_total > 0.0 {
            categories
                .into_iter()
                .map(|(k, v)| (k, v / category_total))
                .collect()
        } else {
            BTreeMap::new()
        };

        Some(ForecastBasis {
            base: stats::mean(&counts),
            minutes_per_task: if total_tasks > 0.0 {
                total_minutes / total_tasks
            } else {
                0.0
            },
            origin,
            x_mean: stats::mean(&xs),
            last_date: last.timestamp.date_naive(),
            trend: self.analyze_workload_trend(series),
            patterns: self.detect_patterns(series),
            category_shares,
            sample_factor: (window.len() as f64 / self.trend_window() as f64).min(1.0),
        })
    }
}

fn predict_from(
    basis: &ForecastBasis,
    target: NaiveDate,
    options: PredictionOptions,
) -> WorkloadPrediction {
    let mut factors = vec![PredictionFactor {
        name: "baseline".to_string(),
        impact: basis.base,
        description: "mean daily task count over the recent window".to_string(),
    }];
    let mut value = basis.base;

    if options.apply_trend && basis.trend.direction != TrendDirection::Stable {
        let x = (target - basis.origin).num_days() as f64;
        let projected = basis.base + basis.trend.slope * (x - basis.x_mean);
        factors.push(PredictionFactor {
            name: "trend".to_string(),
            impact: projected - value,
            description: format!(
                "{:?} trend of {:+.2} tasks/day",
                basis.trend.direction, basis.trend.slope
            )
            .to_lowercase(),
        });
        value = projected;
    }

    let mut pattern_confidences = Vec::new();
    if options.apply_patterns {
        for pattern in &basis.patterns {
            let bucket = match pattern.pattern_type {
                PatternType::Weekly => target.weekday().num_days_from_monday(),
                PatternType::Seasonal => target.month(),
                // Daily predictions have no hour to apply.
                PatternType::Daily => continue,
            };
            let multiplier = pattern.weighted_multiplier(bucket);
            let adjusted = value * multiplier;
            factors.push(PredictionFactor {
                name: pattern.kind.to_string(),
                impact: adjusted - value,
                description: pattern.description.clone(),
            });
            pattern_confidences.push(pattern.confidence);
            value = adjusted;
        }
    }

    let predicted = value.max(0.0);
    let pattern_confidence = if pattern_confidences.is_empty() {
        NO_PATTERN_CONFIDENCE
    } else {
        stats::mean(&pattern_confidences)
    };
    let days_ahead = ((target - basis.last_date).num_days() as f64).max(0.0);
    let confidence = ((0.5 * basis.sample_factor
        + 0.25 * basis.trend.confidence
        + 0.25 * pattern_confidence)
        * (-days_ahead / HORIZON_DECAY_DAYS).exp())
    .clamp(0.0, 1.0);

    let category_breakdown = (options.include_categories && !basis.category_shares.is_empty())
        .then(|| {
            basis
                .category_shares
                .iter()
                .map(|(k, share)| (k.clone(), predicted * share))
                .collect()
        });

    WorkloadPrediction {
        date: target,
        predicted_task_count: predicted,
        predicted_minutes: predicted * basis.minutes_per_task,
        confidence,
        factors,
        category_breakdown,
    }
}

fn empty_prediction(date: NaiveDate) -> WorkloadPrediction {
    WorkloadPrediction {
        date,
        predicted_task_count: 0.0,
        predicted_minutes: 0.0,
        confidence: 0.0,
        factors: vec![PredictionFactor {
            name: "insufficient_data".to_string(),
            impact: 0.0,
            description: "no historical data points".to_string(),
        }],
        category_breakdown: None,
    }
}
