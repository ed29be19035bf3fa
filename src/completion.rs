//! Folding a finished session into a profile and its history.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use crate::achievements::{AchievementEvaluation, evaluate_achievements};
use crate::domain::{LiftType, WorkoutSession};
use crate::history::best_estimate;
use crate::profile::TrainingProfile;

/// A one-rep max raised by a finished session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxUpdate {
    pub lift: LiftType,
    pub previous: f64,
    pub estimated: f64,
}

/// Updated state after a finished session.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub profile: TrainingProfile,
    pub history: Vec<WorkoutSession>,
    pub newly_unlocked: Option<String>,
    pub max_update: Option<MaxUpdate>,
}

/// Appends a finished session to history and updates the profile.
///
/// The session is attributed to `profile`. Completed main sets may raise
/// the stored one-rep max for the session's lift; they never lower it.
/// Achievements are evaluated against the updated profile and history. If
/// evaluation fails, the session and max update are still returned.
pub fn process_finished_session(
    profile: &TrainingProfile,
    history: &[WorkoutSession],
    session: WorkoutSession,
) -> SessionOutcome {
    process_with(evaluate_achievements, profile, history, session)
}

fn process_with<F>(
    evaluate: F,
    profile: &TrainingProfile,
    history: &[WorkoutSession],
    mut session: WorkoutSession,
) -> SessionOutcome
where
    F: FnOnce(&TrainingProfile, &[WorkoutSession]) -> AchievementEvaluation,
{
    session.profile_id = Some(profile.id.clone());

    let max_update = raised_max(profile, &session);
    let updated = match max_update {
        Some(update) => {
            log::info!(
                "{} one-rep max for profile {}: {} -> {}",
                update.lift,
                profile.id,
                update.previous,
                update.estimated
            );
            profile.with_updated_maxes(&HashMap::from([(update.lift, update.estimated)]))
        }
        None => profile.clone(),
    };

    let mut history = history.to_vec();
    history.push(session);

    let (profile, newly_unlocked) = match evaluate_isolated_with(evaluate, &updated, &history) {
        Some(evaluation) => (
            updated.with_unlocked_achievements(&evaluation.achievements),
            evaluation.newly_unlocked,
        ),
        None => (updated, None),
    };

    SessionOutcome {
        profile,
        history,
        newly_unlocked,
        max_update,
    }
}

/// Best estimate from the session's main exercise, if it beats the stored max.
fn raised_max(profile: &TrainingProfile, session: &WorkoutSession) -> Option<MaxUpdate> {
    let lift = session.strength_lift()?;
    let estimated = best_estimate(session)?;
    let previous = profile.one_rep_max(lift);

    (estimated > previous).then_some(MaxUpdate {
        lift,
        previous,
        estimated,
    })
}

/// Runs achievement evaluation, turning a panic into "nothing unlocked".
pub(crate) fn evaluate_isolated(
    profile: &TrainingProfile,
    history: &[WorkoutSession],
) -> Option<AchievementEvaluation> {
    evaluate_isolated_with(evaluate_achievements, profile, history)
}

fn evaluate_isolated_with<F>(
    evaluate: F,
    profile: &TrainingProfile,
    history: &[WorkoutSession],
) -> Option<AchievementEvaluation>
where
    F: FnOnce(&TrainingProfile, &[WorkoutSession]) -> AchievementEvaluation,
{
    match panic::catch_unwind(AssertUnwindSafe(|| evaluate(profile, history))) {
        Ok(evaluation) => Some(evaluation),
        Err(_) => {
            log::error!(
                "Achievement evaluation failed for profile {}; skipping",
                profile.id
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievements::FIRST_BLOOD;
    use crate::domain::{Program, SetData};
    use crate::generator::generate_workout_at;
    use chrono::{TimeZone, Utc};

    fn make_profile() -> TrainingProfile {
        let mut profile = TrainingProfile::new("root");
        profile.selected_program = Program::Original;
        profile.training_maxes.insert(LiftType::Squat, 300.0);
        profile.one_rep_maxes.insert(LiftType::Squat, 320.0);
        profile
    }

    fn finished_squat(profile: &TrainingProfile, reps: u32) -> WorkoutSession {
        let mut session = generate_workout_at(
            profile,
            LiftType::Squat,
            &[],
            Utc.with_ymd_and_hms(2024, 7, 1, 18, 0, 0).unwrap(),
        )
        .unwrap();
        for exercise in session.exercises.iter_mut() {
            for set in exercise.sets.iter_mut() {
                set.completed = true;
            }
        }
        // Top set: 255 for `reps`
        let main = &mut session.exercises[0];
        let last = main.sets.len() - 1;
        main.sets[last].actual_reps = Some(reps);
        session
    }

    #[test]
    fn test_history_appended_with_profile_id() {
        let mut profile = make_profile();
        profile.id = "client-9".to_string();
        let mut session = finished_squat(&profile, 5);
        session.profile_id = None;

        let outcome = process_finished_session(&profile, &[], session);
        assert_eq!(outcome.history.len(), 1);
        assert_eq!(outcome.history[0].profile_id.as_deref(), Some("client-9"));
    }

    #[test]
    fn test_max_raised_from_completed_sets() {
        let profile = make_profile();
        // 255 × (1 + 8/30) = 323
        let outcome = process_finished_session(&profile, &[], finished_squat(&profile, 8));

        assert_eq!(outcome.profile.one_rep_max(LiftType::Squat), 323.0);
        assert_eq!(
            outcome.max_update,
            Some(MaxUpdate {
                lift: LiftType::Squat,
                previous: 320.0,
                estimated: 323.0
            })
        );
        // Input profile untouched
        assert_eq!(profile.one_rep_max(LiftType::Squat), 320.0);
    }

    #[test]
    fn test_max_never_lowered() {
        let profile = make_profile();
        let outcome = process_finished_session(&profile, &[], finished_squat(&profile, 1));

        assert_eq!(outcome.profile.one_rep_max(LiftType::Squat), 320.0);
        assert!(outcome.max_update.is_none());
        for lift in LiftType::all() {
            assert!(outcome.profile.one_rep_max(*lift) >= profile.one_rep_max(*lift));
        }
    }

    #[test]
    fn test_incomplete_sets_ignored() {
        let profile = make_profile();
        let mut session = finished_squat(&profile, 5);
        let main = &mut session.exercises[0];
        let last = main.sets.len() - 1;
        main.sets[last] = SetData {
            actual_reps: Some(20),
            ..SetData::prescribed(400.0, 5)
        };

        let outcome = process_finished_session(&profile, &[], session);
        assert_eq!(outcome.profile.one_rep_max(LiftType::Squat), 320.0);
    }

    #[test]
    fn test_first_max_recorded_for_new_lift() {
        let mut profile = make_profile();
        profile.one_rep_maxes.clear();
        let outcome = process_finished_session(&profile, &[], finished_squat(&profile, 5));
        // 255 × (1 + 5/30) = 297.5 -> 298
        assert_eq!(outcome.profile.one_rep_max(LiftType::Squat), 298.0);
    }

    #[test]
    fn test_achievements_folded_in() {
        let profile = make_profile();
        let outcome = process_finished_session(&profile, &[], finished_squat(&profile, 5));

        assert!(outcome.profile.achievements.contains(FIRST_BLOOD));
        assert!(outcome.newly_unlocked.is_some());

        let again = process_finished_session(
            &outcome.profile,
            &outcome.history,
            finished_squat(&outcome.profile, 5),
        );
        assert_eq!(again.history.len(), 2);
        assert!(again.newly_unlocked.is_none());
    }

    #[test]
    fn test_failed_evaluation_keeps_session_and_max() {
        let profile = make_profile();
        let failing = |_: &TrainingProfile, _: &[WorkoutSession]| -> AchievementEvaluation {
            panic!("catalog predicate failed")
        };
        let outcome = process_with(failing, &profile, &[], finished_squat(&profile, 8));

        assert_eq!(outcome.history.len(), 1);
        assert_eq!(outcome.profile.one_rep_max(LiftType::Squat), 323.0);
        assert!(outcome.max_update.is_some());
        assert!(outcome.newly_unlocked.is_none());
        assert!(outcome.profile.achievements.is_empty());
    }

    #[test]
    fn test_evaluate_isolated_passes_through() {
        let profile = make_profile();
        let history = vec![finished_squat(&profile, 5)];
        let evaluation = evaluate_isolated(&profile, &history).unwrap();
        assert!(evaluation.achievements.contains(FIRST_BLOOD));
    }
}
