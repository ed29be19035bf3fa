//! Workout generation: turns a profile into a prescribed session.
//!
//! A session is built in a fixed order: the main exercise (warmups followed
//! by the three work sets), the program's supplemental exercise if it has
//! one, then assistance work.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Exercise, ExerciseType, LiftType, Program, SessionLift, SessionType, SetData, WorkoutSession,
};
use crate::error::EngineError;
use crate::formulas::calculate_weight;
use crate::history::{find_session, last_weight_used};
use crate::profile::TrainingProfile;
use crate::schedule::EffectiveSchedule;

/// Percentage of training max used for Boring But Big sets.
pub const BBB_PERCENTAGE: f64 = 0.5;

/// Supplemental work prescribed by a program variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupplementalPrescription {
    pub label: &'static str,
    pub percentage: f64,
    pub sets: u32,
    pub reps: u32,
}

/// Builds a program's supplemental prescription for a lift and week.
pub type SupplementalRule = fn(LiftType, &EffectiveSchedule) -> SupplementalPrescription;

/// Supplemental rule per program. Programs absent here (Original) get none.
const SUPPLEMENTAL_RULES: &[(Program, SupplementalRule)] = &[
    (Program::Bbb, boring_but_big),
    (Program::Fsl, first_set_last),
    (Program::Beginner, first_set_last),
    (Program::Bbs, boring_but_strong),
    (Program::Monolith, monolith),
];

/// Looks up the supplemental rule for a program.
pub fn supplemental_rule(program: Program) -> Option<SupplementalRule> {
    SUPPLEMENTAL_RULES
        .iter()
        .find(|(p, _)| *p == program)
        .map(|(_, rule)| *rule)
}

/// 5×10 at 50% of training max.
fn boring_but_big(_lift: LiftType, _schedule: &EffectiveSchedule) -> SupplementalPrescription {
    SupplementalPrescription {
        label: "BBB",
        percentage: BBB_PERCENTAGE,
        sets: 5,
        reps: 10,
    }
}

/// 5×5 at the week's first-set percentage.
fn first_set_last(_lift: LiftType, schedule: &EffectiveSchedule) -> SupplementalPrescription {
    SupplementalPrescription {
        label: "FSL",
        percentage: schedule.first_set_percentage(),
        sets: 5,
        reps: 5,
    }
}

/// 10×5 at the week's first-set percentage.
fn boring_but_strong(_lift: LiftType, schedule: &EffectiveSchedule) -> SupplementalPrescription {
    SupplementalPrescription {
        label: "BBS",
        percentage: schedule.first_set_percentage(),
        sets: 10,
        reps: 5,
    }
}

/// FSL 5×5, cut to 3×5 on deadlift.
fn monolith(lift: LiftType, schedule: &EffectiveSchedule) -> SupplementalPrescription {
    SupplementalPrescription {
        label: "Monolith FSL",
        percentage: schedule.first_set_percentage(),
        sets: if lift == LiftType::Deadlift { 3 } else { 5 },
        reps: 5,
    }
}

/// Generates the prescribed session for `lift` at the profile's current
/// cycle and week.
///
/// Premium entitlement is not checked here; see
/// [`TrainingProfile::ensure_program_access`].
///
/// # Errors
/// Returns `InvalidDomainValue` if the profile's week is outside 1..=4.
pub fn generate_workout(
    profile: &TrainingProfile,
    lift: LiftType,
    history: &[WorkoutSession],
) -> Result<WorkoutSession, EngineError> {
    generate_workout_at(profile, lift, history, Utc::now())
}

/// Same as [`generate_workout`] with an explicit session timestamp.
pub fn generate_workout_at(
    profile: &TrainingProfile,
    lift: LiftType,
    history: &[WorkoutSession],
    date: DateTime<Utc>,
) -> Result<WorkoutSession, EngineError> {
    let schedule = EffectiveSchedule::resolve(profile)?;
    let training_max = profile.training_max(lift);

    let mut exercises = vec![main_exercise(lift, training_max, &schedule)];
    if let Some(supplemental) =
        supplemental_exercise(profile.selected_program, lift, training_max, &schedule)
    {
        exercises.push(supplemental);
    }
    exercises.extend(assistance_exercises(&profile.id, lift, &schedule, history));

    log::debug!(
        "Generated {} week {} for profile {} ({} exercises, TM {})",
        lift,
        schedule.week,
        profile.id,
        exercises.len(),
        training_max
    );

    Ok(WorkoutSession {
        id: Uuid::new_v4().to_string(),
        date,
        title: session_title(profile.current_cycle, schedule.week, lift),
        cycle: profile.current_cycle,
        week: schedule.week,
        lift: SessionLift::Barbell(lift),
        session_type: SessionType::Strength,
        exercises,
        duration_seconds: 0,
        profile_id: Some(profile.id.clone()),
        notes: None,
    })
}

pub fn session_title(cycle: u32, week: u32, lift: LiftType) -> String {
    format!("Cycle {} · Week {} · {}", cycle, week, lift.display_name())
}

/// Warmup sets followed by the three main sets, as one exercise.
fn main_exercise(lift: LiftType, training_max: f64, schedule: &EffectiveSchedule) -> Exercise {
    let warmups = schedule
        .warmups
        .iter()
        .map(|w| SetData::warmup(calculate_weight(training_max, w.percentage, schedule.rounding), w.reps));

    let work_sets = schedule.main_sets.iter().enumerate().map(|(index, scheme)| SetData {
        is_amrap: schedule.is_amrap(index),
        ..SetData::prescribed(
            calculate_weight(training_max, scheme.percentage, schedule.rounding),
            scheme.reps,
        )
    });

    Exercise::new(lift.display_name(), ExerciseType::Main, warmups.chain(work_sets).collect())
}

fn supplemental_exercise(
    program: Program,
    lift: LiftType,
    training_max: f64,
    schedule: &EffectiveSchedule,
) -> Option<Exercise> {
    let rule = supplemental_rule(program)?;
    let prescription = rule(lift, schedule);
    let weight = calculate_weight(training_max, prescription.percentage, schedule.rounding);
    let sets = (0..prescription.sets)
        .map(|_| SetData::prescribed(weight, prescription.reps))
        .collect();

    Some(Exercise::new(
        format!("{} ({})", lift.display_name(), prescription.label),
        ExerciseType::Supplemental,
        sets,
    ))
}

/// Assistance exercises at the profile's last weight for each name, 0 if new.
fn assistance_exercises(
    profile_id: &str,
    lift: LiftType,
    schedule: &EffectiveSchedule,
    history: &[WorkoutSession],
) -> Vec<Exercise> {
    let settings = schedule.assistance_settings;

    schedule
        .assistance_for(lift)
        .iter()
        .map(|name| {
            let weight = last_weight_used(history, profile_id, name).unwrap_or(0.0);
            let sets = (0..settings.sets)
                .map(|_| SetData::prescribed(weight, settings.reps))
                .collect();
            Exercise::new(name.clone(), ExerciseType::Assistance, sets)
        })
        .collect()
}

/// First lift in the profile's order not yet trained this cycle and week.
///
/// Returns `None` once every lift has a session for the current week.
pub fn next_lift(
    profile: &TrainingProfile,
    history: &[WorkoutSession],
) -> Result<Option<LiftType>, EngineError> {
    let schedule = EffectiveSchedule::resolve(profile)?;
    Ok(schedule.lift_order.iter().copied().find(|lift| {
        find_session(
            history,
            &profile.id,
            *lift,
            profile.current_cycle,
            profile.current_week,
        )
        .is_none()
    }))
}

/// Builds a conditioning session, which carries no exercises.
pub fn conditioning_session(
    profile: &TrainingProfile,
    duration_seconds: u64,
    notes: Option<String>,
    date: DateTime<Utc>,
) -> WorkoutSession {
    WorkoutSession {
        id: Uuid::new_v4().to_string(),
        date,
        title: format!(
            "Cycle {} · Week {} · Conditioning",
            profile.current_cycle, profile.current_week
        ),
        cycle: profile.current_cycle,
        week: profile.current_week,
        lift: SessionLift::Conditioning,
        session_type: SessionType::Conditioning,
        exercises: Vec::new(),
        duration_seconds,
        profile_id: Some(profile.id.clone()),
        notes,
    }
}
