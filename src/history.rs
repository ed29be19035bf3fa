//! Queries over a lifter's session history.
//!
//! History is chronological (oldest first). Only completed sets count toward
//! records and volume.

use std::collections::HashMap;

use serde::Serialize;

use crate::domain::{LiftType, SessionType, WorkoutSession};
use crate::formulas::estimate_one_rep_max;
use crate::schedule::AMRAP_WEEK;

/// Sessions attributed to a profile, in history order.
pub fn relevant_history<'a>(
    history: &'a [WorkoutSession],
    profile_id: &'a str,
) -> impl Iterator<Item = &'a WorkoutSession> + 'a {
    history.iter().filter(move |s| s.belongs_to(profile_id))
}

/// Most recent completed weight a profile used for an exercise name.
///
/// Searches the profile's sessions newest first and returns the first
/// completed set with a positive weight on an exercise with exactly this name.
pub fn last_weight_used(
    history: &[WorkoutSession],
    profile_id: &str,
    exercise_name: &str,
) -> Option<f64> {
    history.iter().rev().filter(|s| s.belongs_to(profile_id)).find_map(|session| {
        session
            .exercises
            .iter()
            .filter(|e| e.name == exercise_name)
            .flat_map(|e| e.completed_sets())
            .find(|s| s.weight > 0.0)
            .map(|s| s.weight)
    })
}

/// Latest strength session for `lift` in the given cycle and week.
pub fn find_session<'a>(
    history: &'a [WorkoutSession],
    profile_id: &str,
    lift: LiftType,
    cycle: u32,
    week: u32,
) -> Option<&'a WorkoutSession> {
    history.iter().rev().find(|s| {
        s.belongs_to(profile_id)
            && s.strength_lift() == Some(lift)
            && s.cycle == cycle
            && s.week == week
    })
}

/// Latest week-3 ("1+") session for `lift` in the given cycle.
pub fn amrap_week_session<'a>(
    history: &'a [WorkoutSession],
    profile_id: &str,
    lift: LiftType,
    cycle: u32,
) -> Option<&'a WorkoutSession> {
    find_session(history, profile_id, lift, cycle, AMRAP_WEEK)
}

/// Best estimated one-rep max from a session's completed main sets.
pub fn best_estimate(session: &WorkoutSession) -> Option<f64> {
    session
        .main_exercise()?
        .completed_sets()
        .map(|s| estimate_one_rep_max(s.weight, s.performed_reps()))
        .filter(|e| *e > 0.0)
        .reduce(f64::max)
}

/// Best estimated one-rep max per lift over a profile's history.
pub fn personal_records(history: &[WorkoutSession], profile_id: &str) -> HashMap<LiftType, f64> {
    let mut records: HashMap<LiftType, f64> = HashMap::new();

    for session in relevant_history(history, profile_id) {
        if let Some(lift) = session.strength_lift()
            && let Some(estimate) = best_estimate(session)
        {
            let best = records.entry(lift).or_insert(0.0);
            *best = best.max(estimate);
        }
    }

    records
}

/// Aggregate numbers for a profile's history.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub sessions: usize,
    pub strength_sessions: usize,
    pub conditioning_sessions: usize,
    pub total_volume: f64,
    pub personal_records: HashMap<LiftType, f64>,
}

impl HistorySummary {
    pub fn from_history(history: &[WorkoutSession], profile_id: &str) -> Self {
        let mut summary = Self {
            personal_records: personal_records(history, profile_id),
            ..Self::default()
        };

        for session in relevant_history(history, profile_id) {
            summary.sessions += 1;
            match session.session_type {
                SessionType::Strength => summary.strength_sessions += 1,
                SessionType::Conditioning => summary.conditioning_sessions += 1,
            }
            summary.total_volume += session.volume();
        }

        summary
    }
}
