//! Integration tests for pattern detection, trends, forecasts and anomalies.

use chorewheel::model::WorkloadDataPoint;
use chorewheel::predictor::*;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

/// Monday 2026-01-05, noon.
fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One point per day from `start()`, 15 minutes per task.
fn daily_series(counts: &[u32]) -> Vec<WorkloadDataPoint> {
    counts
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            WorkloadDataPoint::new(start() + Duration::days(i as i64), c, c * 15)
                .category("cleaning", c)
        })
        .collect()
}

/// Four weeks: 10 tasks on weekdays, 4 on weekends.
fn weekend_light_series() -> Vec<WorkloadDataPoint> {
    let counts: Vec<u32> = (0..28).map(|i| if i % 7 >= 5 { 4 } else { 10 }).collect();
    daily_series(&counts)
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

#[test]
fn weekend_reduction_is_detected() {
    let patterns = WorkloadPredictor::default().detect_patterns(&weekend_light_series());

    assert_eq!(patterns.len(), 1);
    let weekly = &patterns[0];
    assert_eq!(weekly.kind, PatternKind::WeekendReduction);
    assert_eq!(weekly.pattern_type, PatternType::Weekly);
    assert!((weekly.confidence - 1.0).abs() < 1e-9);
    assert!(weekly.multipliers[&5] < 1.0);
    assert!(weekly.multipliers[&0] > 1.0);
}

#[test]
fn weekend_peak_is_detected() {
    let counts: Vec<u32> = (0..28).map(|i| if i % 7 >= 5 { 12 } else { 3 }).collect();
    let patterns = WorkloadPredictor::default().detect_patterns(&daily_series(&counts));
    assert!(patterns.iter().any(|p| p.kind == PatternKind::WeekendPeak));
}

#[test]
fn flat_series_has_no_patterns() {
    let patterns = WorkloadPredictor::default().detect_patterns(&daily_series(&[6; 30]));
    assert!(patterns.is_empty());
}

#[test]
fn short_series_has_no_patterns() {
    let counts: Vec<u32> = (0..10).map(|i| if i % 7 >= 5 { 1 } else { 9 }).collect();
    let patterns = WorkloadPredictor::default().detect_patterns(&daily_series(&counts));
    assert!(patterns.is_empty());
}

/// Deterministic daily counts in 5..=9 from a 64-bit LCG.
fn noise_counts(seed: u64, days: usize) -> Vec<u32> {
    let mut state = seed;
    (0..days)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            5 + ((state >> 33) % 5) as u32
        })
        .collect()
}

#[test]
fn random_series_has_no_patterns() {
    let predictor = WorkloadPredictor::default();
    for seed in 1..=50 {
        let series = daily_series(&noise_counts(seed, 14));
        assert!(predictor.detect_patterns(&series).is_empty(), "seed {seed}, 14 days");
    }
    for seed in 1..=12 {
        let series = daily_series(&noise_counts(seed, 28));
        assert!(predictor.detect_patterns(&series).is_empty(), "seed {seed}, 28 days");
    }
}

#[test]
fn two_weeks_are_too_few_for_a_weekly_pattern() {
    let counts: Vec<u32> = (0..14).map(|i| if i % 7 >= 5 { 1 } else { 9 }).collect();
    let patterns = WorkloadPredictor::default().detect_patterns(&daily_series(&counts));
    assert!(patterns.is_empty());

    let counts: Vec<u32> = (0..21).map(|i| if i % 7 >= 5 { 1 } else { 9 }).collect();
    let patterns = WorkloadPredictor::default().detect_patterns(&daily_series(&counts));
    assert_eq!(patterns[0].kind, PatternKind::WeekendReduction);
}

#[test]
fn evening_peak_is_a_daily_pattern() {
    let mut series = Vec::new();
    for day in 0..10 {
        let base = start() - Duration::hours(12) + Duration::days(day);
        series.push(WorkloadDataPoint::new(base + Duration::hours(8), 2, 30));
        series.push(WorkloadDataPoint::new(base + Duration::hours(19), 8, 120));
    }
    let patterns = WorkloadPredictor::default().detect_patterns(&series);
    let daily = patterns
        .iter()
        .find(|p| p.kind == PatternKind::DailyPeak)
        .expect("daily peak");
    assert_eq!(daily.pattern_type, PatternType::Daily);
    assert_eq!(daily.peak_bucket, 19);
}

#[test]
fn seasonal_variation_needs_a_long_span() {
    // Quiet January, busy February and March.
    let counts: Vec<u32> = (0..84).map(|i| if i < 27 { 2 } else { 9 }).collect();
    let patterns = WorkloadPredictor::default().detect_patterns(&daily_series(&counts));
    let seasonal = patterns
        .iter()
        .find(|p| p.kind == PatternKind::SeasonalVariation)
        .expect("seasonal pattern");
    assert_eq!(seasonal.pattern_type, PatternType::Seasonal);
    assert!(seasonal.multipliers[&1] < 1.0);
}

// ---------------------------------------------------------------------------
// Trend
// ---------------------------------------------------------------------------

#[test]
fn rising_series_trends_up() {
    let counts: Vec<u32> = (0..28).map(|i| i + 5).collect();
    let trend = WorkloadPredictor::default().analyze_workload_trend(&daily_series(&counts));
    assert_eq!(trend.direction, TrendDirection::Increasing);
    assert!((trend.slope - 1.0).abs() < 1e-9);
    assert!(trend.confidence > 0.99);
    assert_eq!(trend.sample_size, 28);
}

#[test]
fn falling_series_trends_down() {
    let counts: Vec<u32> = (0..20).map(|i| 40 - 2 * i).collect();
    let trend = WorkloadPredictor::default().analyze_workload_trend(&daily_series(&counts));
    assert_eq!(trend.direction, TrendDirection::Decreasing);
    assert!(trend.slope < 0.0);
}

#[test]
fn weekly_cycle_is_not_mistaken_for_a_trend() {
    let trend = WorkloadPredictor::default().analyze_workload_trend(&weekend_light_series());
    assert_eq!(trend.direction, TrendDirection::Stable);
}

#[test]
fn too_few_points_is_stable_without_confidence() {
    let trend = WorkloadPredictor::default().analyze_workload_trend(&daily_series(&[1, 5, 9]));
    assert_eq!(trend.direction, TrendDirection::Stable);
    assert_eq!(trend.confidence, 0.0);
    assert_eq!(trend.sample_size, 3);
}

// ---------------------------------------------------------------------------
// Forecast
// ---------------------------------------------------------------------------

#[test]
fn forecast_applies_weekly_pattern() {
    let predictor = WorkloadPredictor::default();
    let series = weekend_light_series();

    let monday =
        predictor.predict_workload(&series, date(2026, 2, 2), PredictionOptions::default());
    let saturday =
        predictor.predict_workload(&series, date(2026, 2, 7), PredictionOptions::default());

    assert!((monday.predicted_task_count - 10.0).abs() < 1e-6);
    assert!((saturday.predicted_task_count - 4.0).abs() < 1e-6);
    assert!((monday.predicted_minutes - 150.0).abs() < 1e-6);
    assert!(monday.factors.iter().any(|f| f.name == "weekend_reduction"));
    assert!(saturday.confidence < monday.confidence);
}

#[test]
fn forecast_without_patterns_is_the_baseline() {
    let options = PredictionOptions {
        apply_patterns: false,
        ..PredictionOptions::default()
    };
    let prediction = WorkloadPredictor::default().predict_workload(
        &weekend_light_series(),
        date(2026, 2, 7),
        options,
    );
    assert!((prediction.predicted_task_count - 232.0 / 28.0).abs() < 1e-6);
}

#[test]
fn forecast_splits_by_category_on_request() {
    let options = PredictionOptions {
        include_categories: true,
        ..PredictionOptions::default()
    };
    let prediction = WorkloadPredictor::default().predict_workload(
        &daily_series(&[5; 20]),
        date(2026, 2, 1),
        options,
    );
    let breakdown = prediction.category_breakdown.expect("categories requested");
    assert!((breakdown["cleaning"] - prediction.predicted_task_count).abs() < 1e-9);

    let plain = WorkloadPredictor::default().predict_workload(
        &daily_series(&[5; 20]),
        date(2026, 2, 1),
        PredictionOptions::default(),
    );
    assert!(plain.category_breakdown.is_none());
}

#[test]
fn forecast_with_no_history_is_empty() {
    let prediction = WorkloadPredictor::default().predict_workload(
        &[],
        date(2026, 3, 1),
        PredictionOptions::default(),
    );
    assert_eq!(prediction.predicted_task_count, 0.0);
    assert_eq!(prediction.confidence, 0.0);
    assert_eq!(prediction.factors[0].name, "insufficient_data");
}

#[test]
fn forecast_range_covers_each_day() {
    let predictor = WorkloadPredictor::default();
    let series = weekend_light_series();
    let range = predictor.predict_workload_range(
        &series,
        date(2026, 2, 2),
        date(2026, 2, 8),
        PredictionOptions::default(),
    );
    assert_eq!(range.len(), 7);
    assert_eq!(range[0].date, date(2026, 2, 2));
    assert_eq!(range[6].date, date(2026, 2, 8));

    let week_total = predictor.expected_load(&series, date(2026, 2, 2), date(2026, 2, 8));
    assert!((week_total - 58.0).abs() < 1e-6);
}

#[test]
fn reversed_range_is_empty() {
    let range = WorkloadPredictor::default().predict_workload_range(
        &weekend_light_series(),
        date(2026, 2, 8),
        date(2026, 2, 2),
        PredictionOptions::default(),
    );
    assert!(range.is_empty());
}

#[test]
fn confidence_fades_with_horizon() {
    let predictor = WorkloadPredictor::default();
    let series = daily_series(&[5; 28]);
    let near = predictor.predict_workload(&series, date(2026, 2, 2), PredictionOptions::default());
    let far = predictor.predict_workload(&series, date(2026, 4, 2), PredictionOptions::default());
    assert!(far.confidence < near.confidence);
    assert!(far.confidence > 0.0);
}

#[test]
fn zero_trend_window_still_forecasts() {
    let predictor = WorkloadPredictor::new(PredictionSettings {
        trend_window: 0,
        ..PredictionSettings::default()
    });
    let series = weekend_light_series();

    let trend = predictor.analyze_workload_trend(&series);
    assert_eq!(trend.direction, TrendDirection::Stable);
    assert_eq!(trend.sample_size, 1);

    let prediction =
        predictor.predict_workload(&series, date(2026, 2, 2), PredictionOptions::default());
    assert!(prediction.predicted_task_count.is_finite());
    assert!(prediction.predicted_task_count > 0.0);
    assert!((0.0..=1.0).contains(&prediction.confidence));
}

#[test]
fn seasonal_profile_averages_each_month() {
    let counts: Vec<u32> = (0..40).map(|i| if i < 27 { 2 } else { 6 }).collect();
    let profile = WorkloadPredictor::default().build_seasonal_profile(&daily_series(&counts));
    assert_eq!(profile.len(), 2);
    assert_eq!(profile[0].month, 1);
    assert_eq!(profile[0].sample_count, 27);
    assert!((profile[0].avg_task_count - 2.0).abs() < 1e-9);
    assert!((profile[1].avg_task_count - 6.0).abs() < 1e-9);
    assert!((profile[1].avg_minutes - 90.0).abs() < 1e-9);
}

// ---------------------------------------------------------------------------
// Anomalies
// ---------------------------------------------------------------------------

#[test]
fn single_spike_is_flagged() {
    let mut counts = vec![5u32; 56];
    counts[30] = 50;
    let series = daily_series(&counts);
    let anomalies = WorkloadPredictor::default().detect_anomalies(&series);

    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].anomaly_type, AnomalyType::Spike);
    assert_eq!(anomalies[0].timestamp, series[30].timestamp);
    assert_eq!(anomalies[0].actual, 50.0);
    assert_eq!(anomalies[0].expected, 5.0);
    assert!(anomalies[0].severity <= 10.0);
}

#[test]
fn flat_month_has_no_anomalies() {
    let anomalies = WorkloadPredictor::default().detect_anomalies(&daily_series(&[7; 30]));
    assert!(anomalies.is_empty());
}

#[test]
fn sudden_quiet_day_is_a_drop() {
    let mut counts = vec![10u32; 21];
    counts[14] = 0;
    let anomalies = WorkloadPredictor::default().detect_anomalies(&daily_series(&counts));
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].anomaly_type, AnomalyType::Drop);
}

#[test]
fn lower_threshold_flags_smaller_swings() {
    let mut counts = vec![10u32; 21];
    counts[14] = 12;
    let strict = WorkloadPredictor::default().detect_anomalies(&daily_series(&counts));
    assert!(strict.is_empty());

    let sensitive = WorkloadPredictor::new(PredictionSettings {
        anomaly_threshold: 1.5,
        ..PredictionSettings::default()
    });
    assert_eq!(sensitive.detect_anomalies(&daily_series(&counts)).len(), 1);
}
