//! Boundary checks for caller-supplied records.
//!
//! Scoring functions assume well-formed input. Collection-level operations
//! run these first and fail fast with a descriptive `Error::Validation`.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::model::{MemberProfile, TaskDefinition, WorkloadDataPoint};

pub fn validate_member(member: &MemberProfile) -> Result<()> {
    if member.id.trim().is_empty() {
        return Err(Error::Validation(format!(
            "member {:?} has an empty id",
            member.name
        )));
    }
    if !member.max_weekly_load.is_finite() || member.max_weekly_load < 0.0 {
        return Err(Error::Validation(format!(
            "member {}: max_weekly_load must be a finite non-negative number, got {}",
            member.id, member.max_weekly_load
        )));
    }
    if !member.current_load.is_finite() || member.current_load < 0.0 {
        return Err(Error::Validation(format!(
            "member {}: current_load must be a finite non-negative number, got {}",
            member.id, member.current_load
        )));
    }
    Ok(())
}

/// Every member well-formed, ids unique.
pub fn validate_members(members: &[MemberProfile]) -> Result<()> {
    let mut seen = HashSet::new();
    for member in members {
        validate_member(member)?;
        if !seen.insert(member.id.as_str()) {
            return Err(Error::Validation(format!(
                "duplicate member id {}",
                member.id
            )));
        }
    }
    Ok(())
}

pub fn validate_task(task: &TaskDefinition) -> Result<()> {
    if task.id.trim().is_empty() {
        return Err(Error::Validation(format!(
            "task {:?} has an empty id",
            task.name
        )));
    }
    if !(1..=10).contains(&task.difficulty) {
        return Err(Error::Validation(format!(
            "task {}: difficulty must be within 1..=10, got {}",
            task.id, task.difficulty
        )));
    }
    if !(1..=10).contains(&task.priority) {
        return Err(Error::Validation(format!(
            "task {}: priority must be within 1..=10, got {}",
            task.id, task.priority
        )));
    }
    Ok(())
}

/// Every task well-formed, ids unique.
pub fn validate_tasks(tasks: &[TaskDefinition]) -> Result<()> {
    let mut seen = HashSet::new();
    for task in tasks {
        validate_task(task)?;
        if !seen.insert(task.id.as_str()) {
            return Err(Error::Validation(format!("duplicate task id {}", task.id)));
        }
    }
    Ok(())
}

/// Timestamps must be non-decreasing.
pub fn validate_series(series: &[WorkloadDataPoint]) -> Result<()> {
    for pair in series.windows(2) {
        if pair[1].timestamp < pair[0].timestamp {
            return Err(Error::Validation(format!(
                "workload series out of order: {} follows {}",
                pair[1].timestamp, pair[0].timestamp
            )));
        }
    }
    Ok(())
}
