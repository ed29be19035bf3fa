//! Milestone achievements unlocked from a profile and its history.

use std::collections::BTreeSet;

use crate::domain::{LiftType, Unit, WorkoutSession};
use crate::history::relevant_history;
use crate::profile::TrainingProfile;

pub const FIRST_BLOOD: &str = "first_blood";
pub const CONSISTENCY: &str = "consistency";
pub const COMMITTED: &str = "committed";
pub const CYCLE_COMPLETE: &str = "cycle_complete";
pub const SQUAT_225: &str = "squat_225";
pub const BENCH_135: &str = "bench_135";
pub const DEADLIFT_315: &str = "deadlift_315";
pub const HEAVY_HITTER: &str = "heavy_hitter";

/// Inputs shared by every predicate.
struct Context<'a> {
    profile: &'a TrainingProfile,
    sessions: usize,
}

/// A milestone in the catalog.
pub struct Achievement {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    unlocked: fn(&Context<'_>) -> bool,
}

impl std::fmt::Debug for Achievement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Achievement").field("id", &self.id).finish()
    }
}

/// Plate milestones for squat, bench, deadlift and the four-lift total.
struct Thresholds {
    squat: f64,
    bench: f64,
    deadlift: f64,
    total: f64,
}

fn thresholds(unit: Unit) -> Thresholds {
    match unit {
        Unit::Lbs => Thresholds {
            squat: 225.0,
            bench: 135.0,
            deadlift: 315.0,
            total: 1000.0,
        },
        Unit::Kg => Thresholds {
            squat: 100.0,
            bench: 60.0,
            deadlift: 140.0,
            total: 450.0,
        },
    }
}

static CATALOG: [Achievement; 8] = [
    Achievement {
        id: FIRST_BLOOD,
        title: "First Blood",
        description: "Log your first session",
        unlocked: |ctx| ctx.sessions >= 1,
    },
    Achievement {
        id: CONSISTENCY,
        title: "Consistency",
        description: "Log 10 sessions",
        unlocked: |ctx| ctx.sessions >= 10,
    },
    Achievement {
        id: COMMITTED,
        title: "Committed",
        description: "Log 50 sessions",
        unlocked: |ctx| ctx.sessions >= 50,
    },
    Achievement {
        id: CYCLE_COMPLETE,
        title: "Cycle Complete",
        description: "Finish your first full cycle",
        unlocked: |ctx| ctx.profile.current_cycle > 1,
    },
    Achievement {
        id: SQUAT_225,
        title: "Two Plate Squat",
        description: "Reach a 225 lb (100 kg) squat",
        unlocked: |ctx| {
            ctx.profile.one_rep_max(LiftType::Squat) >= thresholds(ctx.profile.unit).squat
        },
    },
    Achievement {
        id: BENCH_135,
        title: "Plate Bench",
        description: "Reach a 135 lb (60 kg) bench press",
        unlocked: |ctx| {
            ctx.profile.one_rep_max(LiftType::BenchPress) >= thresholds(ctx.profile.unit).bench
        },
    },
    Achievement {
        id: DEADLIFT_315,
        title: "Three Plate Pull",
        description: "Reach a 315 lb (140 kg) deadlift",
        unlocked: |ctx| {
            ctx.profile.one_rep_max(LiftType::Deadlift) >= thresholds(ctx.profile.unit).deadlift
        },
    },
    Achievement {
        id: HEAVY_HITTER,
        title: "Heavy Hitter",
        description: "Total 1000 lb (450 kg) across all four lifts",
        unlocked: |ctx| {
            let total: f64 = LiftType::all()
                .iter()
                .map(|lift| ctx.profile.one_rep_max(*lift))
                .sum();
            total >= thresholds(ctx.profile.unit).total
        },
    },
];

/// Returns every achievement definition, in evaluation order.
pub fn catalog() -> &'static [Achievement] {
    &CATALOG
}

/// Looks up an achievement definition by id.
pub fn find(id: &str) -> Option<&'static Achievement> {
    CATALOG.iter().find(|a| a.id == id)
}

/// Result of an achievement evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementEvaluation {
    /// Complete unlocked set: the profile's existing ids plus new ones.
    pub achievements: BTreeSet<String>,
    /// One newly unlocked id for notification (the last in catalog order).
    pub newly_unlocked: Option<String>,
}

/// Evaluates the catalog against a profile and its share of the history.
///
/// Already-unlocked ids are kept and never re-reported, so calling this
/// twice with unchanged inputs reports nothing new the second time.
pub fn evaluate_achievements(
    profile: &TrainingProfile,
    history: &[WorkoutSession],
) -> AchievementEvaluation {
    let ctx = Context {
        profile,
        sessions: relevant_history(history, &profile.id).count(),
    };

    let mut achievements = profile.achievements.clone();
    let mut newly_unlocked = None;

    for achievement in CATALOG.iter() {
        if achievements.contains(achievement.id) || !(achievement.unlocked)(&ctx) {
            continue;
        }
        log::info!("Profile {} unlocked {}", profile.id, achievement.id);
        achievements.insert(achievement.id.to_string());
        newly_unlocked = Some(achievement.id.to_string());
    }

    AchievementEvaluation {
        achievements,
        newly_unlocked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SessionLift, SessionType};
    use chrono::{TimeZone, Utc};

    fn make_sessions(count: usize, profile_id: Option<&str>) -> Vec<WorkoutSession> {
        (0..count)
            .map(|i| WorkoutSession {
                id: format!("s{i}"),
                date: Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap(),
                title: String::new(),
                cycle: 1,
                week: 1,
                lift: SessionLift::Conditioning,
                session_type: SessionType::Conditioning,
                exercises: Vec::new(),
                duration_seconds: 600,
                profile_id: profile_id.map(str::to_string),
                notes: None,
            })
            .collect()
    }

    #[test]
    fn test_empty_history_unlocks_nothing() {
        let evaluation = evaluate_achievements(&TrainingProfile::new("root"), &[]);
        assert!(evaluation.achievements.is_empty());
        assert!(evaluation.newly_unlocked.is_none());
    }

    #[test]
    fn test_first_blood() {
        let evaluation = evaluate_achievements(&TrainingProfile::new("root"), &make_sessions(1, None));
        assert!(evaluation.achievements.contains(FIRST_BLOOD));
        assert_eq!(evaluation.newly_unlocked.as_deref(), Some(FIRST_BLOOD));
    }

    #[test]
    fn test_session_count_milestones() {
        let profile = TrainingProfile::new("root");
        let evaluation = evaluate_achievements(&profile, &make_sessions(10, Some("root")));
        assert!(evaluation.achievements.contains(CONSISTENCY));
        assert!(!evaluation.achievements.contains(COMMITTED));

        let evaluation = evaluate_achievements(&profile, &make_sessions(50, None));
        assert!(evaluation.achievements.contains(COMMITTED));
    }

    #[test]
    fn test_idempotent() {
        let mut profile = TrainingProfile::new("root");
        profile.one_rep_maxes.insert(LiftType::Squat, 250.0);
        let history = make_sessions(12, None);

        let first = evaluate_achievements(&profile, &history);
        assert!(first.newly_unlocked.is_some());

        let updated = profile.with_unlocked_achievements(&first.achievements);
        let second = evaluate_achievements(&updated, &history);
        assert_eq!(second.achievements, first.achievements);
        assert!(second.newly_unlocked.is_none());

        let third = evaluate_achievements(&updated, &history);
        assert_eq!(third, second);
    }

    #[test]
    fn test_multi_unlock_reports_complete_set() {
        let mut profile = TrainingProfile::new("root");
        profile.current_cycle = 2;
        profile.one_rep_maxes.insert(LiftType::Squat, 405.0);
        profile.one_rep_maxes.insert(LiftType::BenchPress, 275.0);
        profile.one_rep_maxes.insert(LiftType::Deadlift, 500.0);
        profile.one_rep_maxes.insert(LiftType::OverheadPress, 160.0);

        let evaluation = evaluate_achievements(&profile, &make_sessions(1, None));
        for id in [
            FIRST_BLOOD,
            CYCLE_COMPLETE,
            SQUAT_225,
            BENCH_135,
            DEADLIFT_315,
            HEAVY_HITTER,
        ] {
            assert!(evaluation.achievements.contains(id), "missing {id}");
        }
        let notified = evaluation.newly_unlocked.unwrap();
        assert!(evaluation.achievements.contains(&notified));
    }

    #[test]
    fn test_kg_thresholds() {
        let mut profile = TrainingProfile::new("root");
        profile.unit = Unit::Kg;
        profile.one_rep_maxes.insert(LiftType::Squat, 100.0);
        profile.one_rep_maxes.insert(LiftType::BenchPress, 59.0);

        let evaluation = evaluate_achievements(&profile, &[]);
        assert!(evaluation.achievements.contains(SQUAT_225));
        assert!(!evaluation.achievements.contains(BENCH_135));

        // 130 kg deadlift misses 140 kg; the 459 kg total clears 450 kg
        profile.one_rep_maxes.insert(LiftType::Deadlift, 130.0);
        profile.one_rep_maxes.insert(LiftType::OverheadPress, 170.0);
        let evaluation = evaluate_achievements(&profile, &[]);
        assert!(!evaluation.achievements.contains(DEADLIFT_315));
        assert!(evaluation.achievements.contains(HEAVY_HITTER));
    }

    #[test]
    fn test_sessions_without_profile_id_count_for_root_only() {
        let history = make_sessions(1, None);

        let root = evaluate_achievements(&TrainingProfile::new("root"), &history);
        assert!(root.achievements.contains(FIRST_BLOOD));

        let client = evaluate_achievements(&TrainingProfile::new("client-1"), &history);
        assert!(!client.achievements.contains(FIRST_BLOOD));
    }

    #[test]
    fn test_existing_achievements_never_removed() {
        let mut profile = TrainingProfile::new("root");
        profile.achievements.insert(COMMITTED.to_string());
        let evaluation = evaluate_achievements(&profile, &[]);
        assert!(evaluation.achievements.contains(COMMITTED));
        assert!(evaluation.newly_unlocked.is_none());
    }

    #[test]
    fn test_catalog_lookup() {
        assert_eq!(catalog().len(), 8);
        assert_eq!(find(HEAVY_HITTER).unwrap().title, "Heavy Hitter");
        assert!(find("unknown").is_none());
    }
}
