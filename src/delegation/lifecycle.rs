//! Delegation request lifecycle: offer, response, expiry, completion.
//!
//! Expiry is lazy. A pending request past its deadline stays pending until
//! someone responds to it or sweeps it with [`DelegationEngine::expire_overdue`].

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{DelegationEngine, update_skill_profile};
use crate::error::{Error, Result};
use crate::model::{
    DelegationFeedback, DelegationHistory, DelegationId, DelegationRecord, DelegationRequest,
    DelegationStatus, SkillProfile, TaskDefinition,
};
use crate::validate::validate_task;

/// Per-member delegation outcomes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DelegationStats {
    pub member_id: String,
    /// Requests this member sent.
    pub sent: usize,
    /// Requests this member received and answered or let lapse.
    pub received: usize,
    /// Accepted and still in progress.
    pub accepted: usize,
    pub declined: usize,
    pub expired: usize,
    pub completed: usize,
    /// Accepted or completed over everything received, 0-1.
    pub acceptance_rate: f64,
    #[serde(default)]
    pub average_rating: Option<f64>,
}

impl DelegationRequest {
    /// A fresh pending offer that lapses after `expiry_hours`.
    pub fn new(
        task_id: impl Into<String>,
        from_member: impl Into<String>,
        to_member: impl Into<String>,
        reason: impl Into<String>,
        requested_at: DateTime<Utc>,
        expiry_hours: u32,
    ) -> Self {
        Self {
            id: DelegationId::new(),
            task_id: task_id.into(),
            from_member: from_member.into(),
            to_member: to_member.into(),
            reason: reason.into(),
            status: DelegationStatus::Pending,
            requested_at,
            expires_at: requested_at + Duration::hours(i64::from(expiry_hours)),
            responded_at: None,
            feedback: None,
        }
    }

    /// Pending and past its deadline at `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == DelegationStatus::Pending && now >= self.expires_at
    }

    /// Accept or decline. Responding after the deadline expires the request
    /// instead and fails.
    pub fn respond(&mut self, accept: bool, at: DateTime<Utc>) -> Result<()> {
        let to = if accept {
            DelegationStatus::Accepted
        } else {
            DelegationStatus::Declined
        };
        if self.is_overdue(at) {
            self.transition(DelegationStatus::Expired, at)?;
            return Err(Error::InvalidTransition {
                from: DelegationStatus::Expired,
                to,
            });
        }
        self.transition(to, at)
    }

    pub fn expire(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.transition(DelegationStatus::Expired, at)
    }

    /// Close an accepted request with the recipient's feedback.
    ///
    /// The feedback must confirm the recipient took the task on.
    pub fn complete(&mut self, feedback: DelegationFeedback, at: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(DelegationStatus::Completed) {
            return Err(Error::InvalidTransition {
                from: self.status,
                to: DelegationStatus::Completed,
            });
        }
        if !feedback.accepted {
            return Err(Error::Validation(format!(
                "delegation {}: completion feedback must confirm the task was accepted",
                self.id
            )));
        }
        if let Some(rating) = feedback.rating
            && !(1..=5).contains(&rating)
        {
            return Err(Error::Validation(format!(
                "delegation {}: rating must be 1 to 5, got {rating}",
                self.id
            )));
        }
        self.transition(DelegationStatus::Completed, at)?;
        self.feedback = Some(feedback);
        Ok(())
    }

    fn transition(&mut self, to: DelegationStatus, at: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(to) {
            return Err(Error::InvalidTransition {
                from: self.status,
                to,
            });
        }
        debug!(delegation = %self.id, from = %self.status, to = %to, "delegation transition");
        if self.status == DelegationStatus::Pending {
            self.responded_at = Some(at);
        }
        self.status = to;
        Ok(())
    }
}

impl DelegationEngine {
    /// Offer `task` from one member to another, expiring per settings.
    pub fn create_request(
        &self,
        task: &TaskDefinition,
        from_member: &str,
        to_member: &str,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<DelegationRequest> {
        validate_task(task)?;
        if from_member.trim().is_empty() || to_member.trim().is_empty() {
            return Err(Error::Validation(
                "delegation needs both a sender and a recipient".to_string(),
            ));
        }
        if from_member == to_member {
            return Err(Error::Validation(format!(
                "{from_member} cannot delegate {} to themselves",
                task.id
            )));
        }
        let request = DelegationRequest::new(
            task.id.clone(),
            from_member,
            to_member,
            reason,
            now,
            self.settings.expiry_hours,
        );
        info!(
            delegation = %request.id,
            task_id = %task.id,
            from = from_member,
            to = to_member,
            "delegation requested"
        );
        Ok(request)
    }

    /// Apply a response and log the outcome so later suggestions can see it.
    pub fn respond(
        &self,
        request: &mut DelegationRequest,
        accept: bool,
        history: &mut DelegationHistory,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let before = request.status;
        let outcome = request.respond(accept, at);
        // A late response still leaves an expired record behind.
        if request.status != before {
            history.record(request, at);
        }
        outcome
    }

    /// Expire every overdue request in place and log each one.
    /// Returns the ids that were expired.
    pub fn expire_overdue(
        &self,
        requests: &mut [DelegationRequest],
        history: &mut DelegationHistory,
        max_age_hours: u32,
        now: DateTime<Utc>,
    ) -> Vec<DelegationId> {
        let mut expired = Vec::new();
        for request in requests.iter_mut() {
            if !is_stale(request, max_age_hours, now) {
                continue;
            }
            if request.expire(now).is_ok() {
                history.record(request, now);
                expired.push(request.id);
            }
        }
        if !expired.is_empty() {
            warn!(count = expired.len(), "delegations expired without a response");
        }
        expired
    }

    /// Close an accepted request, log it, and credit the recipient's skills.
    ///
    /// Each required skill is exercised with the others as related skills.
    /// A task with no required skills exercises its category instead.
    pub fn apply_completion(
        &self,
        request: &mut DelegationRequest,
        feedback: DelegationFeedback,
        task: &TaskDefinition,
        recipient_profile: &SkillProfile,
        history: &mut DelegationHistory,
        at: DateTime<Utc>,
    ) -> Result<SkillProfile> {
        validate_task(task)?;
        if request.task_id != task.id {
            return Err(Error::Validation(format!(
                "delegation {} is for task {}, not {}",
                request.id, request.task_id, task.id
            )));
        }
        if recipient_profile.member_id != request.to_member {
            return Err(Error::Validation(format!(
                "skill profile belongs to {}, but delegation {} went to {}",
                recipient_profile.member_id, request.id, request.to_member
            )));
        }

        request.complete(feedback, at)?;
        history.record(request, at);

        let skills: Vec<String> = if task.required_skills.is_empty() {
            vec![task.category.clone()]
        } else {
            task.required_skills.iter().cloned().collect()
        };
        let mut profile = recipient_profile.clone();
        for skill in &skills {
            let related: Vec<String> = skills.iter().filter(|s| *s != skill).cloned().collect();
            profile = update_skill_profile(&profile, skill, &related, task.difficulty, at);
        }

        info!(
            delegation = %request.id,
            member = %request.to_member,
            skills = skills.len(),
            "delegation completed"
        );
        Ok(profile)
    }
}

fn is_stale(request: &DelegationRequest, max_age_hours: u32, now: DateTime<Utc>) -> bool {
    request.is_overdue(now)
        || (request.status == DelegationStatus::Pending
            && now - request.requested_at >= Duration::hours(i64::from(max_age_hours)))
}

/// Pending requests past their deadline, or older than `max_age_hours`.
pub fn get_expired_delegations(
    requests: &[DelegationRequest],
    max_age_hours: u32,
    now: DateTime<Utc>,
) -> Vec<&DelegationRequest> {
    requests
        .iter()
        .filter(|r| is_stale(r, max_age_hours, now))
        .collect()
}

/// Outcomes for one member, counting each request once at its latest status.
pub fn delegation_stats(history: &DelegationHistory, member_id: &str) -> DelegationStats {
    let mut latest: HashMap<DelegationId, &DelegationRecord> = HashMap::new();
    for record in history.for_member(member_id) {
        latest.insert(record.request_id, record);
    }

    let mut stats = DelegationStats {
        member_id: member_id.to_string(),
        ..DelegationStats::default()
    };
    let mut ratings = Vec::new();
    for record in latest.values() {
        if record.from_member == member_id {
            stats.sent += 1;
        }
        if record.to_member != member_id {
            continue;
        }
        stats.received += 1;
        match record.status {
            DelegationStatus::Accepted => stats.accepted += 1,
            DelegationStatus::Declined => stats.declined += 1,
            DelegationStatus::Expired => stats.expired += 1,
            DelegationStatus::Completed => {
                stats.completed += 1;
                if let Some(rating) = record.rating {
                    ratings.push(f64::from(rating));
                }
            }
            DelegationStatus::Pending => {}
        }
    }

    if stats.received > 0 {
        stats.acceptance_rate = (stats.accepted + stats.completed) as f64 / stats.received as f64;
    }
    stats.average_rating =
        (!ratings.is_empty()).then(|| ratings.iter().sum::<f64>() / ratings.len() as f64);
    stats
}
