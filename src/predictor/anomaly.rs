//! Spikes and drops against a rolling baseline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{WorkloadPredictor, stats};
use crate::model::WorkloadDataPoint;

/// Points needed before the baseline is trusted.
const MIN_BASELINE_POINTS: usize = 3;
/// Floor on the baseline spread, as a fraction of its mean.
const MIN_RELATIVE_SPREAD: f64 = 0.1;
/// Floor on the baseline spread, in tasks.
const MIN_ABSOLUTE_SPREAD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    Spike,
    Drop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadAnomaly {
    pub timestamp: DateTime<Utc>,
    pub anomaly_type: AnomalyType,
    pub actual: f64,
    pub expected: f64,
    /// Signed distance from the baseline, in spreads.
    pub deviation: f64,
    /// 0-10.
    pub severity: f64,
}

impl WorkloadPredictor {
    /// Points that stray beyond the threshold from the mean of the preceding
    /// window.
    ///
    /// The spread is floored so that a perfectly flat baseline still tolerates
    /// small wobble; a flat series therefore yields no anomalies.
    pub fn detect_anomalies(&self, series: &[WorkloadDataPoint]) -> Vec<WorkloadAnomaly> {
        let window = self.settings.anomaly_window;
        let threshold = self.settings.anomaly_threshold;
        let values: Vec<f64> = series.iter().map(|p| f64::from(p.task_count)).collect();

        let mut anomalies = Vec::new();
        for (i, point) in series.iter().enumerate() {
            let baseline = &values[i.saturating_sub(window)..i];
            if baseline.len() < MIN_BASELINE_POINTS {
                continue;
            }
            let expected = stats::mean(baseline);
            let spread = stats::std_dev(baseline)
                .max(expected * MIN_RELATIVE_SPREAD)
                .max(MIN_ABSOLUTE_SPREAD);
            let deviation = (values[i] - expected) / spread;
            if deviation.abs() <= threshold {
                continue;
            }
            anomalies.push(WorkloadAnomaly {
                timestamp: point.timestamp,
                anomaly_type: if deviation > 0.0 {
                    AnomalyType::Spike
                } else {
                    AnomalyType::Drop
                },
                actual: values[i],
                expected,
                deviation,
                severity: (deviation.abs() / threshold * 5.0).min(10.0),
            });
        }
        anomalies
    }
}
