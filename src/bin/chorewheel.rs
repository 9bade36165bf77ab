//! chorewheel CLI: run the distribution engine over a household snapshot.
//!
//! Every subcommand reads a JSON snapshot and prints JSON to stdout. Logs go
//! to stderr.

use std::path::PathBuf;
use std::time::Instant;

use chorewheel::config::{Config, Tuning};
use chorewheel::delegation::get_expired_delegations;
use chorewheel::predictor::PredictionOptions;
use chorewheel::snapshot::HouseholdSnapshot;
use chorewheel::telemetry::pass::{record_pass_outcome, start_pass_span};
use chorewheel::telemetry::{TelemetryConfig, init_telemetry, metrics};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use opentelemetry::KeyValue;
use serde::Serialize;
use serde_json::json;

#[derive(Parser)]
#[command(name = "chorewheel", about = "Fair chore distribution for households")]
struct Cli {
    /// Household snapshot (JSON)
    #[arg(long, short, global = true, default_value = "household.json")]
    snapshot: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assign the snapshot's pending tasks
    Assign {
        /// Commit each assignment before scoring the next task
        #[arg(long)]
        batch: bool,
    },
    /// Fairness report with rebalancing suggestions
    Report,
    /// Forecast daily workload over an inclusive date range
    Forecast {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        /// Split each prediction by task category
        #[arg(long)]
        categories: bool,
    },
    /// Spikes and drops in the household series
    Anomalies,
    /// Member health, overload alerts and recovery plans
    Health {
        /// Also propose moves off overloaded members
        #[arg(long)]
        rebalance: bool,
    },
    /// Rank members who could take over a task
    Delegate {
        /// Task id (pending or assigned)
        #[arg(long)]
        task: String,
        /// Member handing the task off
        #[arg(long)]
        from: String,
    },
    /// Pending delegations that have lapsed
    Expired {
        #[arg(long, default_value_t = 72)]
        max_age_hours: u32,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Assign { .. } => "assign",
            Command::Report => "report",
            Command::Forecast { .. } => "forecast",
            Command::Anomalies => "anomalies",
            Command::Health { .. } => "health",
            Command::Delegate { .. } => "delegate",
            Command::Expired { .. } => "expired",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::from_env()?;
    let _guard = init_telemetry(TelemetryConfig::new(
        config.otel_endpoint.clone(),
        config.log_level.clone(),
    ))?;
    let tuning = config.tuning()?;

    let snapshot = HouseholdSnapshot::load(&cli.snapshot)
        .map_err(|e| anyhow::anyhow!("{}: {e}", cli.snapshot.display()))?;
    let now = snapshot.as_of.unwrap_or_else(Utc::now);

    let operation = cli.command.name();
    let span = start_pass_span(operation, &snapshot.household_id);
    let started = Instant::now();

    let decisions = span.in_scope(|| run(cli.command, &snapshot, &tuning, now))?;

    record_pass_outcome(&span, decisions);
    metrics::pass_duration_ms().record(
        started.elapsed().as_secs_f64() * 1000.0,
        &[KeyValue::new("operation", operation)],
    );
    Ok(())
}

/// Execute one subcommand and return how many decisions it produced.
fn run(
    command: Command,
    snapshot: &HouseholdSnapshot,
    tuning: &Tuning,
    now: DateTime<Utc>,
) -> anyhow::Result<usize> {
    match command {
        Command::Assign { batch } => cmd_assign(snapshot, tuning, batch),
        Command::Report => {
            let report = tuning.fairness().generate_fairness_report(
                &snapshot.members,
                &snapshot.assignments,
                &snapshot.histories,
            )?;
            print_json(&report)?;
            Ok(report.suggestions.len())
        }
        Command::Forecast {
            from,
            to,
            categories,
        } => {
            if to < from {
                anyhow::bail!("--to ({to}) is before --from ({from})");
            }
            let predictor = tuning.predictor();
            let series = &snapshot.workload_series;
            let options = PredictionOptions {
                include_categories: categories,
                ..PredictionOptions::default()
            };
            let predictions = predictor.predict_workload_range(series, from, to, options);
            let days = predictions.len();
            let expected_load: f64 = predictions.iter().map(|p| p.predicted_task_count).sum();
            print_json(&json!({
                "patterns": predictor.detect_patterns(series),
                "trend": predictor.analyze_workload_trend(series),
                "expected_load": expected_load,
                "predictions": predictions,
            }))?;
            Ok(days)
        }
        Command::Anomalies => {
            let anomalies = tuning.predictor().detect_anomalies(&snapshot.workload_series);
            print_json(&anomalies)?;
            Ok(anomalies.len())
        }
        Command::Health { rebalance } => cmd_health(snapshot, tuning, rebalance),
        Command::Delegate { task, from } => cmd_delegate(snapshot, tuning, &task, &from, now),
        Command::Expired { max_age_hours } => {
            let expired = get_expired_delegations(&snapshot.delegations, max_age_hours, now);
            print_json(&expired)?;
            Ok(expired.len())
        }
    }
}

fn cmd_assign(
    snapshot: &HouseholdSnapshot,
    tuning: &Tuning,
    batch: bool,
) -> anyhow::Result<usize> {
    let fairness = tuning.fairness();
    let assigned = metrics::assignments_made();

    if batch {
        let result =
            fairness.assign_tasks_batch(&snapshot.tasks, &snapshot.members, &snapshot.histories)?;
        assigned.add(
            result.assignments.len() as u64,
            &[KeyValue::new("mode", "batch")],
        );
        print_json(&result)?;
        return Ok(result.assignments.len());
    }

    let total_assigned: f64 = snapshot.members.iter().map(|m| m.current_load).sum();
    let mut assignments = Vec::with_capacity(snapshot.tasks.len());
    for task in &snapshot.tasks {
        if let Some(assignment) = fairness.find_best_assignment(
            task,
            &snapshot.members,
            &snapshot.histories,
            total_assigned,
        )? {
            assignments.push(assignment);
        }
    }
    assigned.add(
        assignments.len() as u64,
        &[KeyValue::new("mode", "single")],
    );
    print_json(&assignments)?;
    Ok(assignments.len())
}

fn cmd_health(
    snapshot: &HouseholdSnapshot,
    tuning: &Tuning,
    rebalance: bool,
) -> anyhow::Result<usize> {
    let burnout = tuning.burnout();
    let states = snapshot.workload_states(&burnout);
    let household = burnout.check_household_overload(&states);
    let recovery: Vec<_> = states
        .iter()
        .filter_map(|s| burnout.generate_recovery_plan(s))
        .collect();

    if let Some(overload) = &household {
        let alerts = metrics::alerts_raised();
        for alert in &overload.alerts {
            alerts.add(1, &[KeyValue::new("severity", alert.severity.to_string())]);
        }
    }

    let balance = if rebalance {
        Some(burnout.auto_balance_workload(
            &states,
            &snapshot.members,
            &snapshot.assignments,
        )?)
    } else {
        None
    };
    let decisions = household.as_ref().map_or(0, |h| h.alerts.len())
        + balance.as_ref().map_or(0, |b| b.redistributed.len());

    print_json(&json!({
        "states": states,
        "household": household,
        "recovery_plans": recovery,
        "rebalance": balance,
    }))?;
    Ok(decisions)
}

fn cmd_delegate(
    snapshot: &HouseholdSnapshot,
    tuning: &Tuning,
    task_id: &str,
    from: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<usize> {
    let task = snapshot
        .task(task_id)
        .ok_or_else(|| anyhow::anyhow!("no task with id '{task_id}'"))?;
    if snapshot.member(from).is_none() {
        anyhow::bail!("no member with id '{from}'");
    }

    let engine = tuning.delegation();
    let candidates = snapshot.delegation_candidates();
    let suggestions = engine.generate_delegation_suggestions(
        task,
        from,
        &candidates,
        &snapshot.delegation_history,
        now,
    )?;
    metrics::delegation_suggestions().add(suggestions.len() as u64, &[]);

    let recommended = engine.generate_smart_assignment(
        task,
        from,
        &candidates,
        &snapshot.delegation_history,
        now,
    )?;

    print_json(&json!({
        "suggestions": suggestions,
        "recommended": recommended,
    }))?;
    Ok(suggestions.len())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
