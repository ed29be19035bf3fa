//! Cycle-to-cycle training max progression.
//!
//! A transition is two steps: [`propose_cycle_transition`] suggests new
//! training maxes, the lifter may edit them, and [`confirm_cycle_transition`]
//! applies whatever was accepted.

use std::collections::HashMap;

use serde::Serialize;

use crate::completion::evaluate_isolated;
use crate::domain::{LiftType, ProgressionScheme, Unit, WorkoutSession};
use crate::error::EngineError;
use crate::formulas::TRAINING_MAX_FRACTION;
use crate::history::amrap_week_session;
use crate::profile::TrainingProfile;
use crate::schedule::DELOAD_WEEK;

/// Default reps needed on the week-3 top set to earn an increment.
pub const DEFAULT_PASS_REPS: u32 = 3;

/// Tunable parts of the performance scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressionRules {
    pub pass_reps: u32,
}

impl Default for ProgressionRules {
    fn default() -> Self {
        Self {
            pass_reps: DEFAULT_PASS_REPS,
        }
    }
}

/// Training max increment per cycle for a lift.
pub fn increment(unit: Unit, lift: LiftType) -> f64 {
    match (unit, lift.is_lower_body()) {
        (Unit::Lbs, true) => 10.0,
        (Unit::Lbs, false) => 5.0,
        (Unit::Kg, true) => 5.0,
        (Unit::Kg, false) => 2.5,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiftPerformance {
    /// Best reps on a qualifying set; `None` when the week-3 session was skipped.
    pub reps_achieved: Option<u32>,
    pub passed: bool,
}

/// Suggested training maxes for the next cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleProposal {
    pub proposed_training_maxes: HashMap<LiftType, f64>,
    /// Empty under the standard scheme.
    pub per_lift_performance: HashMap<LiftType, LiftPerformance>,
}

/// Proposes next-cycle training maxes with the default rules.
pub fn propose_cycle_transition(
    profile: &TrainingProfile,
    history: &[WorkoutSession],
) -> CycleProposal {
    propose_cycle_transition_with(profile, history, &ProgressionRules::default())
}

/// Proposes next-cycle training maxes.
///
/// Only lifts with a positive training max are included. Under the
/// performance scheme a lift that missed the pass threshold is held flat; a
/// lift with no week-3 session this cycle passes.
pub fn propose_cycle_transition_with(
    profile: &TrainingProfile,
    history: &[WorkoutSession],
    rules: &ProgressionRules,
) -> CycleProposal {
    let mut proposal = CycleProposal {
        proposed_training_maxes: HashMap::new(),
        per_lift_performance: HashMap::new(),
    };

    for lift in LiftType::all().iter().copied() {
        let training_max = profile.training_max(lift);
        if training_max <= 0.0 || !training_max.is_finite() {
            continue;
        }

        let passed = match profile.progression_scheme {
            ProgressionScheme::Standard => true,
            ProgressionScheme::Performance => {
                let performance = lift_performance(profile, history, lift, rules);
                proposal.per_lift_performance.insert(lift, performance);
                performance.passed
            }
        };

        let next = if passed {
            training_max + increment(profile.unit, lift)
        } else {
            log::info!(
                "{} held at {} for profile {}: missed {} reps",
                lift,
                training_max,
                profile.id,
                rules.pass_reps
            );
            training_max
        };
        proposal.proposed_training_maxes.insert(lift, next);
    }

    proposal
}

/// Grades the lift's week-3 session in the current cycle.
fn lift_performance(
    profile: &TrainingProfile,
    history: &[WorkoutSession],
    lift: LiftType,
    rules: &ProgressionRules,
) -> LiftPerformance {
    let Some(session) = amrap_week_session(history, &profile.id, lift, profile.current_cycle)
    else {
        return LiftPerformance {
            reps_achieved: None,
            passed: true,
        };
    };

    let heavy = profile.training_max(lift) * TRAINING_MAX_FRACTION;
    let best = session
        .main_exercise()
        .into_iter()
        .flat_map(|main| main.completed_sets())
        .filter(|s| !s.is_warmup && (s.is_amrap || s.weight >= heavy))
        .map(|s| s.performed_reps())
        .max()
        .unwrap_or(0);

    LiftPerformance {
        reps_achieved: Some(best),
        passed: best >= rules.pass_reps,
    }
}

/// Profile after a confirmed transition.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub profile: TrainingProfile,
    pub newly_unlocked: Option<String>,
}

/// Applies accepted training maxes and moves to week 1 of `next_cycle`.
///
/// # Errors
/// Returns `InvalidDomainValue` when `next_cycle` is zero.
pub fn confirm_cycle_transition(
    profile: &TrainingProfile,
    history: &[WorkoutSession],
    new_training_maxes: &HashMap<LiftType, f64>,
    next_cycle: u32,
) -> Result<TransitionOutcome, EngineError> {
    if next_cycle == 0 {
        return Err(EngineError::invalid("cycle", next_cycle));
    }

    let updated = profile
        .with_training_maxes(new_training_maxes)
        .with_advanced_cycle(next_cycle);
    log::info!(
        "Profile {} moved from cycle {} to cycle {}",
        profile.id,
        profile.current_cycle,
        next_cycle
    );

    Ok(match evaluate_isolated(&updated, history) {
        Some(evaluation) => TransitionOutcome {
            profile: updated.with_unlocked_achievements(&evaluation.achievements),
            newly_unlocked: evaluation.newly_unlocked,
        },
        None => TransitionOutcome {
            profile: updated,
            newly_unlocked: None,
        },
    })
}

/// Result of moving a profile forward one week.
#[derive(Debug, Clone)]
pub enum WeekAdvance {
    Advanced(TrainingProfile),
    /// The deload week is done; a cycle transition is due.
    CycleComplete,
}

/// Moves the profile to the next week of its cycle.
///
/// # Errors
/// Returns `InvalidDomainValue` if the current week is outside 1..=4.
pub fn advance_week(profile: &TrainingProfile) -> Result<WeekAdvance, EngineError> {
    match profile.current_week {
        DELOAD_WEEK => Ok(WeekAdvance::CycleComplete),
        week @ 1..DELOAD_WEEK => Ok(WeekAdvance::Advanced(profile.with_week(week + 1))),
        week => Err(EngineError::invalid("week", week)),
    }
}
