//! Integration tests for skill matching, availability, suggestions and the
//! delegation request lifecycle.

use chorewheel::delegation::*;
use chorewheel::error::Error;
use chorewheel::model::*;
use chrono::{DateTime, Duration, TimeZone, Utc};

/// Monday 2026-03-02, 09:00.
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

fn window(member: &str, start_in_hours: i64, hours: i64, capacity: u32) -> AvailabilityWindow {
    let start = now() + Duration::hours(start_in_hours);
    AvailabilityWindow {
        member_id: member.to_string(),
        start,
        end: start + Duration::hours(hours),
        capacity_minutes: capacity,
        booked_minutes: 0,
    }
}

fn dinner() -> TaskDefinition {
    TaskDefinition::new("dinner", "Cook dinner", "cooking")
        .requires("cooking")
        .minutes(45)
        .difficulty(6)
}

fn candidates() -> Vec<DelegationCandidate> {
    vec![
        DelegationCandidate::new(MemberProfile::new("alice", "Alice", 10.0).current_load(6.0)),
        DelegationCandidate::new(MemberProfile::new("bob", "Bob", 10.0).current_load(2.0))
            .skill_profile(SkillProfile::new("bob").with_skill("cooking", 8.0).prefers("cooking"))
            .window(window("bob", 25, 2, 120)),
        DelegationCandidate::new(MemberProfile::new("carol", "Carol", 10.0).current_load(1.0)),
        DelegationCandidate::new(
            MemberProfile::new("dan", "Dan", 10.0)
                .skill("cooking")
                .blocks("cooking"),
        ),
    ]
}

fn declines(from: &str, to: &str, count: usize) -> DelegationHistory {
    let mut history = DelegationHistory::default();
    for _ in 0..count {
        let mut request = DelegationRequest::new("dinner", from, to, "busy", now(), 48);
        request.respond(false, now()).unwrap();
        history.record(&request, now());
    }
    history
}

// ---------------------------------------------------------------------------
// Skills
// ---------------------------------------------------------------------------

#[test]
fn skill_match_blends_level_and_category() {
    let profile = SkillProfile::new("bob").with_skill("Cooking", 8.0).prefers("cooking");
    let score = calculate_skill_match_score(&profile, &dinner().required_skills, "cooking");
    assert!((score - 86.0).abs() < 1e-9);
}

#[test]
fn learning_interest_earns_a_small_bonus() {
    let curious = SkillProfile::new("c").interested_in("cooking");
    let indifferent = SkillProfile::new("d");
    let required = dinner().required_skills;
    assert!((calculate_skill_match_score(&curious, &required, "cooking") - 10.0).abs() < 1e-9);
    assert_eq!(calculate_skill_match_score(&indifferent, &required, "cooking"), 0.0);
}

#[test]
fn missing_skill_has_level_zero() {
    let profile = SkillProfile::new("a").with_skill("laundry", 4.0);
    assert_eq!(get_skill_level(&profile, "LAUNDRY"), 4.0);
    assert_eq!(get_skill_level(&profile, "gardening"), 0.0);
}

#[test]
fn practice_raises_skill_and_related_skills() {
    let profile = SkillProfile::new("a");
    let updated = update_skill_profile(&profile, "cooking", &["baking".to_string()], 10, now());

    let cooking = updated.skill("cooking").expect("cooking added");
    let baking = updated.skill("baking").expect("baking added");
    assert!((cooking.experience - 1.5).abs() < 1e-9);
    assert!((baking.experience - 0.75).abs() < 1e-9);
    assert!(cooking.level > baking.level);
    assert!((cooking.growth_rate - cooking.level).abs() < 1e-9);
    assert_eq!(cooking.last_used, Some(now()));
}

#[test]
fn skill_levels_never_drop_and_stay_bounded() {
    let mut profile = SkillProfile::new("a").with_skill("cooking", 8.0);
    let mut previous = 8.0;
    for _ in 0..200 {
        profile = update_skill_profile(&profile, "cooking", &[], 10, now());
        let level = get_skill_level(&profile, "cooking");
        assert!(level >= previous);
        assert!(level <= MAX_SKILL_LEVEL);
        previous = level;
    }
    assert!(previous > 9.9);
}

#[test]
fn update_matches_existing_skill_case_insensitively() {
    let profile = SkillProfile::new("a").with_skill("Cooking", 2.0);
    let updated = update_skill_profile(&profile, "cooking", &[], 5, now());
    assert_eq!(updated.skills.len(), 1);
    assert!(updated.skills.contains_key("Cooking"));
}

#[test]
fn experience_curve_is_monotonic() {
    let mut previous = 0.0;
    for step in 0..100 {
        let level = skill_level_for_experience(f64::from(step));
        assert!(level >= previous);
        assert!(level < MAX_SKILL_LEVEL + 1e-9);
        previous = level;
    }
    assert_eq!(skill_level_for_experience(0.0), 0.0);
}

// ---------------------------------------------------------------------------
// Availability
// ---------------------------------------------------------------------------

#[test]
fn soonest_roomy_window_ranks_first() {
    let windows = vec![
        window("b", 25, 2, 120),
        window("b", 1, 1, 60),
        window("b", -30, 2, 120),
        AvailabilityWindow {
            end: now() + Duration::minutes(60),
            ..window("b", 0, 1, 30)
        },
    ];
    let ranked = find_best_windows(&windows, 45, now());

    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].window.start, now() + Duration::hours(1));
    assert!(ranked[0].score > ranked[1].score);
}

#[test]
fn window_in_progress_only_counts_remaining_time() {
    let in_progress = window("b", -1, 2, 120);
    let ranked = find_best_windows(&[in_progress.clone()], 45, now());
    assert_eq!(ranked[0].remaining_minutes, 60);
    assert!(find_best_windows(&[in_progress], 90, now()).is_empty());
}

#[test]
fn booked_minutes_reduce_room() {
    let mut busy = window("b", 2, 3, 60);
    busy.booked_minutes = 30;
    assert!(find_best_windows(&[busy], 45, now()).is_empty());
}

// ---------------------------------------------------------------------------
// Suggestions
// ---------------------------------------------------------------------------

#[test]
fn suggestions_rank_skilled_available_member_first() {
    let engine = DelegationEngine::default();
    let suggestions = engine
        .generate_delegation_suggestions(
            &dinner(),
            "alice",
            &candidates(),
            &DelegationHistory::default(),
            now(),
        )
        .unwrap();

    let ids: Vec<&str> = suggestions.iter().map(|s| s.member_id.as_str()).collect();
    assert_eq!(ids, vec!["bob", "carol"]);
    assert!(suggestions[0].score > suggestions[1].score);
    assert!(suggestions[0].confidence > suggestions[1].confidence);
    assert!(suggestions[0].best_window.is_some());
    assert_eq!(suggestions[0].expires_at, now() + Duration::hours(48));
}

#[test]
fn repeated_declines_push_a_pairing_down() {
    let engine = DelegationEngine::default();
    let fresh = engine
        .generate_delegation_suggestions(
            &dinner(),
            "alice",
            &candidates(),
            &DelegationHistory::default(),
            now(),
        )
        .unwrap();
    let burned = engine
        .generate_delegation_suggestions(
            &dinner(),
            "alice",
            &candidates(),
            &declines("alice", "bob", 3),
            now(),
        )
        .unwrap();

    assert_eq!(burned[0].member_id, "carol");
    let bob_before = fresh.iter().find(|s| s.member_id == "bob").unwrap();
    let bob_after = burned.iter().find(|s| s.member_id == "bob").unwrap();
    assert!((bob_before.score - bob_after.score - DECLINE_PENALTY * 3.0).abs() < 1e-9);
    assert!(bob_after.factors.iter().any(|f| f.name == "prior_declines"));
}

#[test]
fn decline_penalty_is_capped() {
    let engine = DelegationEngine::default();
    let score_with = |count| {
        engine
            .generate_delegation_suggestions(
                &dinner(),
                "alice",
                &candidates(),
                &declines("alice", "bob", count),
                now(),
            )
            .unwrap()
            .into_iter()
            .find(|s| s.member_id == "bob")
            .unwrap()
            .score
    };
    assert!((score_with(3) - score_with(6)).abs() < 1e-9);
}

#[test]
fn declines_from_someone_else_do_not_count() {
    let engine = DelegationEngine::default();
    let suggestions = engine
        .generate_delegation_suggestions(
            &dinner(),
            "alice",
            &candidates(),
            &declines("carol", "bob", 3),
            now(),
        )
        .unwrap();
    assert_eq!(suggestions[0].member_id, "bob");
}

#[test]
fn smart_assignment_explains_its_pick() {
    let engine = DelegationEngine::default();
    let history = DelegationHistory::default();
    let pick = engine
        .generate_smart_assignment(&dinner(), "alice", &candidates(), &history, now())
        .unwrap()
        .expect("bob and carol are eligible");

    assert_eq!(pick.recommended_member, "bob");
    assert_eq!(pick.alternatives, vec!["carol"]);
    assert!(pick.reasoning.iter().any(|r| r.starts_with("skill match")));
}

#[test]
fn smart_assignment_agrees_with_ranked_suggestions() {
    let engine = DelegationEngine::default();
    let history = declines("alice", "bob", 3);
    let suggestions = engine
        .generate_delegation_suggestions(&dinner(), "alice", &candidates(), &history, now())
        .unwrap();
    let pick = engine
        .generate_smart_assignment(&dinner(), "alice", &candidates(), &history, now())
        .unwrap()
        .unwrap();

    assert_eq!(pick.recommended_member, "carol");
    assert_eq!(pick.recommended_member, suggestions[0].member_id);
    assert!((pick.score - suggestions[0].score).abs() < 1e-9);
    assert_eq!(pick.alternatives, vec!["bob"]);
}

#[test]
fn smart_assignment_without_sender_counts_every_decline() {
    let engine = DelegationEngine::default();
    let pick = engine
        .generate_smart_assignment(
            &dinner(),
            "",
            &candidates()[1..],
            &declines("alice", "bob", 3),
            now(),
        )
        .unwrap()
        .unwrap();
    assert_eq!(pick.recommended_member, "carol");
}

#[test]
fn smart_assignment_without_eligible_members_is_none() {
    let engine = DelegationEngine::default();
    let history = DelegationHistory::default();
    assert!(engine
        .generate_smart_assignment(&dinner(), "alice", &[], &history, now())
        .unwrap()
        .is_none());
    assert!(engine
        .generate_smart_assignment(&dinner(), "alice", &candidates()[3..], &history, now())
        .unwrap()
        .is_none());
}

#[test]
fn suggestions_validate_the_task() {
    let bad = TaskDefinition::new("", "Nameless", "cooking");
    let result = DelegationEngine::default().generate_delegation_suggestions(
        &bad,
        "alice",
        &candidates(),
        &DelegationHistory::default(),
        now(),
    );
    assert!(matches!(result, Err(Error::Validation(_))));
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn request_accept_then_complete() {
    let engine = DelegationEngine::default();
    let mut history = DelegationHistory::default();
    let mut request = engine
        .create_request(&dinner(), "alice", "bob", "late shift", now())
        .unwrap();
    assert_eq!(request.status, DelegationStatus::Pending);
    assert_eq!(request.expires_at, now() + Duration::hours(48));

    engine
        .respond(&mut request, true, &mut history, now() + Duration::hours(1))
        .unwrap();
    assert_eq!(request.status, DelegationStatus::Accepted);
    assert_eq!(request.responded_at, Some(now() + Duration::hours(1)));

    let profile = SkillProfile::new("bob").with_skill("cooking", 3.0);
    let feedback = DelegationFeedback {
        accepted: true,
        rating: Some(5),
        time_to_complete_minutes: Some(50),
        comment: None,
    };
    let updated = engine
        .apply_completion(
            &mut request,
            feedback,
            &dinner(),
            &profile,
            &mut history,
            now() + Duration::hours(5),
        )
        .unwrap();

    assert_eq!(request.status, DelegationStatus::Completed);
    assert!(get_skill_level(&updated, "cooking") >= 3.0);
    assert!(updated.skill("cooking").unwrap().experience > 0.0);
    assert_eq!(history.records.len(), 2);
    assert_eq!(history.records[1].rating, Some(5));
}

#[test]
fn cannot_delegate_to_yourself() {
    let result = DelegationEngine::default().create_request(&dinner(), "bob", "bob", "", now());
    assert!(matches!(result, Err(Error::Validation(_))));
}

#[test]
fn declined_request_cannot_complete() {
    let mut request = DelegationRequest::new("dinner", "alice", "bob", "", now(), 48);
    request.respond(false, now()).unwrap();
    assert!(request.status.is_terminal());

    let feedback = DelegationFeedback {
        accepted: false,
        rating: None,
        time_to_complete_minutes: None,
        comment: None,
    };
    let err = request.complete(feedback, now()).unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidTransition {
            from: DelegationStatus::Declined,
            to: DelegationStatus::Completed,
        }
    ));
}

#[test]
fn pending_request_cannot_skip_to_completed() {
    let mut request = DelegationRequest::new("dinner", "alice", "bob", "", now(), 48);
    let feedback = DelegationFeedback {
        accepted: true,
        rating: Some(4),
        time_to_complete_minutes: None,
        comment: None,
    };
    assert!(request.complete(feedback, now()).is_err());
    assert_eq!(request.status, DelegationStatus::Pending);
}

#[test]
fn completion_must_confirm_acceptance() {
    let mut request = DelegationRequest::new("dinner", "alice", "bob", "", now(), 48);
    request.respond(true, now()).unwrap();
    let feedback = DelegationFeedback {
        accepted: false,
        rating: Some(3),
        time_to_complete_minutes: None,
        comment: Some("never got to it".to_string()),
    };
    assert!(matches!(request.complete(feedback, now()), Err(Error::Validation(_))));
    assert_eq!(request.status, DelegationStatus::Accepted);
    assert!(request.feedback.is_none());
}

#[test]
fn out_of_range_rating_is_rejected() {
    let mut request = DelegationRequest::new("dinner", "alice", "bob", "", now(), 48);
    request.respond(true, now()).unwrap();
    let feedback = DelegationFeedback {
        accepted: true,
        rating: Some(9),
        time_to_complete_minutes: None,
        comment: None,
    };
    assert!(matches!(request.complete(feedback, now()), Err(Error::Validation(_))));
    assert_eq!(request.status, DelegationStatus::Accepted);
}

#[test]
fn late_response_expires_the_request() {
    let engine = DelegationEngine::default();
    let mut history = DelegationHistory::default();
    let mut request = DelegationRequest::new("dinner", "alice", "bob", "", now(), 24);

    let result = engine.respond(&mut request, true, &mut history, now() + Duration::hours(30));
    assert!(matches!(
        result,
        Err(Error::InvalidTransition {
            from: DelegationStatus::Expired,
            to: DelegationStatus::Accepted,
        })
    ));
    assert_eq!(request.status, DelegationStatus::Expired);
    assert_eq!(history.records.len(), 1);
    assert_eq!(history.records[0].status, DelegationStatus::Expired);
}

#[test]
fn expired_delegations_are_found_lazily() {
    let overdue = DelegationRequest::new("a", "alice", "bob", "", now() - Duration::hours(50), 48);
    let fresh = DelegationRequest::new("b", "alice", "bob", "", now() - Duration::hours(1), 48);
    let mut answered =
        DelegationRequest::new("c", "alice", "bob", "", now() - Duration::hours(100), 48);
    answered.respond(true, now() - Duration::hours(99)).unwrap();
    let requests = vec![overdue, fresh, answered];

    let expired = get_expired_delegations(&requests, 72, now());
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].task_id, "a");

    let strict = get_expired_delegations(&requests, 1, now());
    assert_eq!(strict.len(), 2);
}

#[test]
fn sweeping_expires_and_records() {
    let engine = DelegationEngine::default();
    let mut history = DelegationHistory::default();
    let mut requests = vec![
        DelegationRequest::new("a", "alice", "bob", "", now() - Duration::hours(50), 48),
        DelegationRequest::new("b", "alice", "bob", "", now() - Duration::hours(1), 48),
    ];

    let expired = engine.expire_overdue(&mut requests, &mut history, 72, now());
    assert_eq!(expired, vec![requests[0].id]);
    assert_eq!(requests[0].status, DelegationStatus::Expired);
    assert_eq!(requests[1].status, DelegationStatus::Pending);
    assert_eq!(history.records.len(), 1);

    // Already expired: nothing more to do.
    assert!(engine.expire_overdue(&mut requests, &mut history, 72, now()).is_empty());
}

#[test]
fn stats_count_each_request_once() {
    let engine = DelegationEngine::default();
    let mut history = DelegationHistory::default();

    let mut done = DelegationRequest::new("dinner", "alice", "bob", "", now(), 48);
    engine.respond(&mut done, true, &mut history, now()).unwrap();
    engine
        .apply_completion(
            &mut done,
            DelegationFeedback {
                accepted: true,
                rating: Some(4),
                time_to_complete_minutes: None,
                comment: None,
            },
            &dinner(),
            &SkillProfile::new("bob"),
            &mut history,
            now(),
        )
        .unwrap();

    let mut refused = DelegationRequest::new("laundry", "alice", "bob", "", now(), 48);
    engine.respond(&mut refused, false, &mut history, now()).unwrap();

    let mut ignored = vec![DelegationRequest::new("trash", "alice", "bob", "", now(), 1)];
    engine.expire_overdue(&mut ignored, &mut history, 72, now() + Duration::hours(2));

    let bob = delegation_stats(&history, "bob");
    assert_eq!(bob.received, 3);
    assert_eq!(bob.completed, 1);
    assert_eq!(bob.accepted, 0);
    assert_eq!(bob.declined, 1);
    assert_eq!(bob.expired, 1);
    assert!((bob.acceptance_rate - 1.0 / 3.0).abs() < 1e-9);
    assert_eq!(bob.average_rating, Some(4.0));

    let alice = delegation_stats(&history, "alice");
    assert_eq!(alice.sent, 3);
    assert_eq!(alice.received, 0);
    assert_eq!(alice.acceptance_rate, 0.0);
}

#[test]
fn completion_for_the_wrong_task_is_rejected() {
    let engine = DelegationEngine::default();
    let mut history = DelegationHistory::default();
    let mut request = DelegationRequest::new("laundry", "alice", "bob", "", now(), 48);
    request.respond(true, now()).unwrap();

    let result = engine.apply_completion(
        &mut request,
        DelegationFeedback {
            accepted: true,
            rating: None,
            time_to_complete_minutes: None,
            comment: None,
        },
        &dinner(),
        &SkillProfile::new("bob"),
        &mut history,
        now(),
    );
    assert!(matches!(result, Err(Error::Validation(_))));
    assert_eq!(request.status, DelegationStatus::Accepted);
}
