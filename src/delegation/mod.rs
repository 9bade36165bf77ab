//! Skill- and availability-aware task handoffs.
//!
//! Candidates are ranked on three signals: how well their skills and
//! preferred categories fit the task, whether a calendar window can hold it,
//! and how much weekly capacity they have left. Pairings that were declined
//! before are pushed down the list.

pub mod lifecycle;

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::fairness::calculate_availability_score;
use crate::model::{
    AvailabilityWindow, DelegationHistory, MemberProfile, SkillEntry, SkillProfile, TaskDefinition,
    contains_ignore_case,
};
use crate::validate::{validate_member, validate_task};

pub use lifecycle::{DelegationStats, delegation_stats, get_expired_delegations};

// ---------------------------------------------------------------------------
// Tuning constants
// ---------------------------------------------------------------------------

pub const MAX_SKILL_LEVEL: f64 = 10.0;
/// Share of the skill-match score from skill levels; the rest is category fit.
pub const SKILL_COVERAGE_WEIGHT: f64 = 0.7;
pub const CATEGORY_ALIGNMENT_WEIGHT: f64 = 0.3;
/// Smaller bonus when the category is only a learning interest.
pub const LEARNING_INTEREST_BONUS: f64 = 10.0;

/// Experience at which a skill reaches ~63% of the maximum level.
pub const SKILL_CURVE_SCALE: f64 = 20.0;
/// Fraction of the experience gain credited to related skills.
pub const RELATED_EXPERIENCE_SHARE: f64 = 0.5;
/// Level assumed for a skill listed on a member without a skill profile.
pub const LISTED_SKILL_LEVEL: f64 = 5.0;

pub const SUGGESTION_SKILL_WEIGHT: f64 = 0.5;
pub const SUGGESTION_AVAILABILITY_WEIGHT: f64 = 0.3;
pub const SUGGESTION_CAPACITY_WEIGHT: f64 = 0.2;
/// Availability score for a member who shared no calendar.
pub const UNKNOWN_AVAILABILITY_SCORE: f64 = 50.0;

pub const DEFAULT_EXPIRY_HOURS: u32 = 48;
pub const DECLINE_PENALTY: f64 = 15.0;
pub const MAX_DECLINE_PENALTY: f64 = 45.0;

const WINDOW_SOONNESS_WEIGHT: f64 = 0.6;
const WINDOW_HEADROOM_WEIGHT: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelegationSettings {
    pub expiry_hours: u32,
    pub decline_penalty: f64,
    pub max_decline_penalty: f64,
}

impl Default for DelegationSettings {
    fn default() -> Self {
        Self {
            expiry_hours: DEFAULT_EXPIRY_HOURS,
            decline_penalty: DECLINE_PENALTY,
            max_decline_penalty: MAX_DECLINE_PENALTY,
        }
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A member who could take the task, with whatever skill and calendar data
/// the caller has for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationCandidate {
    pub member: MemberProfile,
    #[serde(default)]
    pub skill_profile: Option<SkillProfile>,
    #[serde(default)]
    pub windows: Vec<AvailabilityWindow>,
}

impl DelegationCandidate {
    pub fn new(member: MemberProfile) -> Self {
        Self {
            member,
            skill_profile: None,
            windows: Vec::new(),
        }
    }

    pub fn skill_profile(mut self, profile: SkillProfile) -> Self {
        self.skill_profile = Some(profile);
        self
    }

    pub fn window(mut self, window: AvailabilityWindow) -> Self {
        self.windows.push(window);
        self
    }

    /// The explicit profile, or one inferred from the member's listed skills.
    pub fn effective_profile(&self) -> SkillProfile {
        self.skill_profile
            .clone()
            .unwrap_or_else(|| profile_from_member(&self.member))
    }
}

fn profile_from_member(member: &MemberProfile) -> SkillProfile {
    SkillProfile {
        member_id: member.id.clone(),
        skills: member
            .skills
            .iter()
            .map(|s| {
                (
                    s.clone(),
                    SkillEntry {
                        level: LISTED_SKILL_LEVEL,
                        ..SkillEntry::default()
                    },
                )
            })
            .collect(),
        preferred_categories: member.preferences.preferred.clone(),
        learning_interests: BTreeSet::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedWindow {
    pub window: AvailabilityWindow,
    pub remaining_minutes: u32,
    /// 0-1, higher is better.
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionFactor {
    pub name: String,
    pub score: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationSuggestion {
    pub member_id: String,
    /// 0-100.
    pub score: f64,
    /// 0-1.
    pub confidence: f64,
    pub factors: Vec<SuggestionFactor>,
    #[serde(default)]
    pub best_window: Option<AvailabilityWindow>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartAssignment {
    pub task_id: String,
    pub recommended_member: String,
    pub score: f64,
    pub confidence: f64,
    pub reasoning: Vec<String>,
    /// Runners-up, best first.
    pub alternatives: Vec<String>,
}

// ---------------------------------------------------------------------------
// Skills
// ---------------------------------------------------------------------------

/// Level of a skill, 0 if the member has never used it.
pub fn get_skill_level(profile: &SkillProfile, skill: &str) -> f64 {
    profile.skill(skill).map(|e| e.level).unwrap_or(0.0)
}

/// Blend of skill-level coverage and preferred-category fit, 0-100.
///
/// A category that is only a learning interest earns a smaller, separate
/// bonus so members get a chance to grow into new chores.
pub fn calculate_skill_match_score(
    profile: &SkillProfile,
    required_skills: &BTreeSet<String>,
    category: &str,
) -> f64 {
    let coverage = if required_skills.is_empty() {
        1.0
    } else {
        required_skills
            .iter()
            .map(|s| get_skill_level(profile, s) / MAX_SKILL_LEVEL)
            .sum::<f64>()
            / required_skills.len() as f64
    };
    let aligned = contains_ignore_case(&profile.preferred_categories, category);
    let alignment = if aligned { 1.0 } else { 0.0 };

    let mut score =
        (coverage * SKILL_COVERAGE_WEIGHT + alignment * CATEGORY_ALIGNMENT_WEIGHT) * 100.0;
    if !aligned && contains_ignore_case(&profile.learning_interests, category) {
        score += LEARNING_INTEREST_BONUS;
    }
    score.clamp(0.0, 100.0)
}

/// Level reached after `experience` units of practice. Monotonic, bounded by
/// [`MAX_SKILL_LEVEL`].
pub fn skill_level_for_experience(experience: f64) -> f64 {
    (MAX_SKILL_LEVEL * (1.0 - (-experience.max(0.0) / SKILL_CURVE_SCALE).exp()))
        .clamp(0.0, MAX_SKILL_LEVEL)
}

/// Credit practice on `skill` (and a share of it on `related_skills`).
///
/// Harder tasks earn more experience. Levels never decrease and stay within
/// [0, 10].
pub fn update_skill_profile(
    profile: &SkillProfile,
    skill: &str,
    related_skills: &[String],
    difficulty: u8,
    at: DateTime<Utc>,
) -> SkillProfile {
    let mut updated = profile.clone();
    let gain = 0.5 + f64::from(difficulty.clamp(1, 10)) / 10.0;
    exercise(&mut updated, skill, gain, at);
    for related in related_skills {
        if related.eq_ignore_ascii_case(skill) {
            continue;
        }
        exercise(&mut updated, related, gain * RELATED_EXPERIENCE_SHARE, at);
    }
    updated
}

fn exercise(profile: &mut SkillProfile, skill: &str, gain: f64, at: DateTime<Utc>) {
    let key = profile
        .skills
        .keys()
        .find(|k| k.eq_ignore_ascii_case(skill))
        .cloned()
        .unwrap_or_else(|| skill.to_string());
    let entry = profile.skills.entry(key).or_default();
    let before = entry.level.clamp(0.0, MAX_SKILL_LEVEL);
    entry.experience += gain;
    entry.level = before
        .max(skill_level_for_experience(entry.experience))
        .clamp(0.0, MAX_SKILL_LEVEL);
    entry.growth_rate = entry.level - before;
    entry.last_used = Some(at);
}

// ---------------------------------------------------------------------------
// Availability
// ---------------------------------------------------------------------------

/// Windows that can still hold `duration_minutes`, soonest-with-most-headroom
/// first. Windows that have already ended are dropped.
pub fn find_best_windows(
    windows: &[AvailabilityWindow],
    duration_minutes: u32,
    now: DateTime<Utc>,
) -> Vec<RankedWindow> {
    let mut ranked: Vec<RankedWindow> = windows
        .iter()
        .filter_map(|w| {
            if w.end <= now {
                return None;
            }
            let usable_start = w.start.max(now);
            let span = (w.end - usable_start).num_minutes().max(0);
            let open = i64::from(w.capacity_minutes.saturating_sub(w.booked_minutes));
            let remaining = u32::try_from(span.min(open)).unwrap_or(0);
            if remaining < duration_minutes || remaining == 0 {
                return None;
            }
            let hours_until = (usable_start - now).num_minutes() as f64 / 60.0;
            let soonness = 1.0 / (1.0 + hours_until / 24.0);
            let headroom = f64::from(remaining - duration_minutes) / f64::from(remaining);
            Some(RankedWindow {
                window: w.clone(),
                remaining_minutes: remaining,
                score: WINDOW_SOONNESS_WEIGHT * soonness + WINDOW_HEADROOM_WEIGHT * headroom,
            })
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.window.start.cmp(&b.window.start))
    });
    ranked
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Stateless delegation matcher holding only its settings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DelegationEngine {
    settings: DelegationSettings,
}

impl DelegationEngine {
    pub fn new(settings: DelegationSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &DelegationSettings {
        &self.settings
    }

    /// Rank every candidate except `from_member`, best first.
    ///
    /// Candidates who block the task's category are left out.
    pub fn generate_delegation_suggestions(
        &self,
        task: &TaskDefinition,
        from_member: &str,
        candidates: &[DelegationCandidate],
        history: &DelegationHistory,
        now: DateTime<Utc>,
    ) -> Result<Vec<DelegationSuggestion>> {
        validate_task(task)?;
        for candidate in candidates {
            validate_member(&candidate.member)?;
        }

        let expires_at = now + Duration::hours(i64::from(self.settings.expiry_hours));
        let mut suggestions: Vec<DelegationSuggestion> = candidates
            .iter()
            .filter(|c| c.member.id != from_member)
            .filter(|c| !c.member.preferences.is_blocked(&task.category))
            .map(|c| self.suggest(task, from_member, c, history, now, expires_at))
            .collect();
        suggestions.sort_by(|a, b| b.score.total_cmp(&a.score));

        debug!(
            task_id = %task.id,
            from = from_member,
            candidates = suggestions.len(),
            "delegation suggestions ranked"
        );
        Ok(suggestions)
    }

    /// Best member for the task with human-readable reasoning. `None` when
    /// there are no candidates or every candidate blocks the category.
    ///
    /// Ranked exactly like [`Self::generate_delegation_suggestions`]. An empty
    /// `from_member` means nobody is handing the task off; every past decline
    /// by a candidate then counts against them.
    pub fn generate_smart_assignment(
        &self,
        task: &TaskDefinition,
        from_member: &str,
        candidates: &[DelegationCandidate],
        history: &DelegationHistory,
        now: DateTime<Utc>,
    ) -> Result<Option<SmartAssignment>> {
        if candidates.is_empty() {
            return Ok(None);
        }
        let suggestions =
            self.generate_delegation_suggestions(task, from_member, candidates, history, now)?;
        let mut ranked = suggestions.into_iter();
        let Some(top) = ranked.next() else {
            return Ok(None);
        };

        let mut reasoning: Vec<String> = top
            .factors
            .iter()
            .map(|f| match f.name.as_str() {
                "skill_match" => format!("skill match {:.0}/100", f.score),
                "availability" => match &top.best_window {
                    Some(w) => format!("free from {}", w.start.format("%a %H:%M")),
                    None => format!("availability {:.0}/100", f.score),
                },
                "capacity" => format!("{:.0}% of weekly capacity left", f.score),
                other => format!("{other} {:.0}", f.score),
            })
            .collect();
        if top.confidence < 0.5 {
            reasoning.push("limited data: treat as a tentative match".to_string());
        }

        Ok(Some(SmartAssignment {
            task_id: task.id.clone(),
            recommended_member: top.member_id,
            score: top.score,
            confidence: top.confidence,
            reasoning,
            alternatives: ranked.take(3).map(|s| s.member_id).collect(),
        }))
    }

    fn suggest(
        &self,
        task: &TaskDefinition,
        from_member: &str,
        candidate: &DelegationCandidate,
        history: &DelegationHistory,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> DelegationSuggestion {
        let profile = candidate.effective_profile();
        let skill = calculate_skill_match_score(&profile, &task.required_skills, &task.category);

        let best_window = find_best_windows(&candidate.windows, task.estimated_minutes, now)
            .into_iter()
            .next();
        let availability = match (&best_window, candidate.windows.is_empty()) {
            (_, true) => UNKNOWN_AVAILABILITY_SCORE,
            (Some(ranked), false) => ranked.score * 100.0,
            (None, false) => 0.0,
        };
        let capacity = calculate_availability_score(&candidate.member);

        let declines = if from_member.is_empty() {
            history.declines_by(&candidate.member.id)
        } else {
            history.declines_between(from_member, &candidate.member.id)
        };
        let penalty = (declines as f64 * self.settings.decline_penalty)
            .min(self.settings.max_decline_penalty);

        let raw = skill * SUGGESTION_SKILL_WEIGHT
            + availability * SUGGESTION_AVAILABILITY_WEIGHT
            + capacity * SUGGESTION_CAPACITY_WEIGHT;
        let score = (raw - penalty).clamp(0.0, 100.0);

        let mut confidence = 0.4;
        if candidate.skill_profile.is_some() {
            confidence += 0.3;
        }
        if !candidate.windows.is_empty() {
            confidence += 0.3;
        }
        confidence = (confidence - 0.1 * declines as f64).clamp(0.1, 1.0);

        let mut factors = vec![
            SuggestionFactor {
                name: "skill_match".to_string(),
                score: skill,
                weight: SUGGESTION_SKILL_WEIGHT,
            },
            SuggestionFactor {
                name: "availability".to_string(),
                score: availability,
                weight: SUGGESTION_AVAILABILITY_WEIGHT,
            },
            SuggestionFactor {
                name: "capacity".to_string(),
                score: capacity,
                weight: SUGGESTION_CAPACITY_WEIGHT,
            },
        ];
        if penalty > 0.0 {
            factors.push(SuggestionFactor {
                name: "prior_declines".to_string(),
                score: -penalty,
                weight: 1.0,
            });
        }

        DelegationSuggestion {
            member_id: candidate.member.id.clone(),
            score,
            confidence,
            factors,
            best_window: best_window.map(|r| r.window),
            expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listed_skills_become_a_mid_level_profile() {
        let member = MemberProfile::new("a", "A", 10.0)
            .skill("ironing")
            .prefers("laundry");
        let profile = profile_from_member(&member);
        assert_eq!(profile.member_id, "a");
        assert_eq!(get_skill_level(&profile, "ironing"), LISTED_SKILL_LEVEL);
        assert!(profile.preferred_categories.contains("laundry"));
        assert!(profile.learning_interests.is_empty());
    }

    #[test]
    fn exercise_tracks_growth_of_the_last_update() {
        let mut profile = SkillProfile::new("a");
        exercise(&mut profile, "mopping", 20.0, Utc::now());
        let first = profile.skills["mopping"].growth_rate;
        exercise(&mut profile, "mopping", 20.0, Utc::now());
        let second = profile.skills["mopping"].growth_rate;
        assert!(first > second);
        assert!(second > 0.0);
    }
}
