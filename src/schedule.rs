//! Set schedule tables and resolution of a profile's effective schedule.
//!
//! Every fallback from profile customizations to the built-in tables happens
//! here, once, so set generation works from a fully-resolved record.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{LiftType, Program};
use crate::error::EngineError;
use crate::profile::{AssistanceSettings, TrainingProfile};

/// Week whose final main set is the AMRAP "plus" set.
pub const AMRAP_WEEK: u32 = 3;

/// Reduced-intensity recovery week closing each cycle.
pub const DELOAD_WEEK: u32 = 4;

/// Number of main work sets per session.
pub const MAIN_SET_COUNT: usize = 3;

/// A percentage of training max paired with a rep target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetScheme {
    pub percentage: f64,
    pub reps: u32,
}

impl SetScheme {
    pub const fn new(percentage: f64, reps: u32) -> Self {
        Self { percentage, reps }
    }
}

const MAIN_PERCENTAGES: [[f64; MAIN_SET_COUNT]; 4] = [
    [0.65, 0.75, 0.85],
    [0.70, 0.80, 0.90],
    [0.75, 0.85, 0.95],
    [0.40, 0.50, 0.60],
];

const MAIN_REPS: [[u32; MAIN_SET_COUNT]; 4] = [[5, 5, 5], [3, 3, 3], [5, 3, 1], [5, 5, 5]];

/// Default warmup: 40/50/60% for 5/5/3.
pub const DEFAULT_WARMUP: [SetScheme; 3] = [
    SetScheme::new(0.40, 5),
    SetScheme::new(0.50, 5),
    SetScheme::new(0.60, 3),
];

/// Lift order used when the profile does not set one.
pub const DEFAULT_LIFT_ORDER: [LiftType; 4] = [
    LiftType::OverheadPress,
    LiftType::Deadlift,
    LiftType::BenchPress,
    LiftType::Squat,
];

/// Built-in accessory templates per lift.
pub fn default_assistance(lift: LiftType) -> &'static [&'static str] {
    match lift {
        LiftType::Squat => &["Leg Press", "Hanging Leg Raise", "Bulgarian Split Squat"],
        LiftType::BenchPress => &["Dumbbell Row", "Dips", "Face Pull"],
        LiftType::Deadlift => &["Good Morning", "Ab Wheel", "Back Extension"],
        LiftType::OverheadPress => &["Chin-Up", "Dumbbell Bench Press", "Face Pull"],
    }
}

/// Minimum number of assistance exercises for a program.
pub fn assistance_base_count(program: Program) -> usize {
    match program {
        Program::Original | Program::Bbs => 2,
        Program::Monolith => 3,
        Program::Bbb | Program::Fsl | Program::Beginner => 1,
    }
}

/// Default main-set scheme for a week.
///
/// # Errors
/// Returns `InvalidDomainValue` for a week outside 1..=4.
pub fn main_week_scheme(week: u32) -> Result<[SetScheme; MAIN_SET_COUNT], EngineError> {
    let index = week_index(week)?;
    let percentages = MAIN_PERCENTAGES[index];
    let reps = MAIN_REPS[index];
    Ok(std::array::from_fn(|i| SetScheme::new(percentages[i], reps[i])))
}

fn week_index(week: u32) -> Result<usize, EngineError> {
    match week {
        1..=DELOAD_WEEK => Ok((week - 1) as usize),
        _ => Err(EngineError::invalid("week", week)),
    }
}

/// A profile's schedule with every default applied.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveSchedule {
    pub week: u32,
    pub main_sets: [SetScheme; MAIN_SET_COUNT],
    pub warmups: Vec<SetScheme>,
    pub assistance: HashMap<LiftType, Vec<String>>,
    pub assistance_settings: AssistanceSettings,
    pub rounding: f64,
    pub lift_order: Vec<LiftType>,
}

impl EffectiveSchedule {
    /// Resolves the profile's current week.
    pub fn resolve(profile: &TrainingProfile) -> Result<Self, EngineError> {
        Self::resolve_week(profile, profile.current_week)
    }

    /// Resolves an arbitrary week against the profile's customizations.
    pub fn resolve_week(profile: &TrainingProfile, week: u32) -> Result<Self, EngineError> {
        let defaults = main_week_scheme(week)?;

        let percentages = profile
            .custom_percentages
            .get(&week)
            .filter(|p| p.len() == MAIN_SET_COUNT && p.iter().all(|v| v.is_finite()));
        let reps = profile
            .custom_reps
            .get(&week)
            .filter(|r| r.len() == MAIN_SET_COUNT);

        let main_sets = std::array::from_fn(|i| SetScheme {
            percentage: percentages.map_or(defaults[i].percentage, |p| p[i]),
            reps: reps.map_or(defaults[i].reps, |r| r[i]),
        });

        let warmups = match &profile.warmup_settings {
            Some(custom) if !custom.is_empty() => custom.clone(),
            _ => DEFAULT_WARMUP.to_vec(),
        };

        let base_count = assistance_base_count(profile.selected_program);
        let assistance = LiftType::all()
            .iter()
            .map(|&lift| (lift, resolve_assistance(profile, lift, base_count)))
            .collect();

        Ok(Self {
            week,
            main_sets,
            warmups,
            assistance,
            assistance_settings: profile.assistance_settings.unwrap_or_default(),
            rounding: profile.rounding_increment(),
            lift_order: resolve_lift_order(profile.lift_order.as_deref()),
        })
    }

    /// Returns true if the main set at `index` is the AMRAP set.
    pub fn is_amrap(&self, index: usize) -> bool {
        self.week == AMRAP_WEEK && index == MAIN_SET_COUNT - 1
    }

    /// Percentage of the week's first main set, reused by FSL-style work.
    pub fn first_set_percentage(&self) -> f64 {
        self.main_sets[0].percentage
    }

    /// Assistance exercise names for a lift, already trimmed to count.
    pub fn assistance_for(&self, lift: LiftType) -> &[String] {
        self.assistance.get(&lift).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A user-configured list is kept whole. The built-in list is cut to the
/// base count.
fn resolve_assistance(profile: &TrainingProfile, lift: LiftType, base_count: usize) -> Vec<String> {
    match profile.custom_assistance.get(&lift) {
        Some(custom) if !custom.is_empty() => custom.clone(),
        _ => default_assistance(lift)
            .iter()
            .take(base_count)
            .map(|name| name.to_string())
            .collect(),
    }
}

fn resolve_lift_order(custom: Option<&[LiftType]>) -> Vec<LiftType> {
    let mut order: Vec<LiftType> = Vec::with_capacity(LiftType::all().len());
    for lift in custom.unwrap_or(&[]).iter().chain(DEFAULT_LIFT_ORDER.iter()) {
        if !order.contains(lift) {
            order.push(*lift);
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_week_schemes() {
        let week1 = main_week_scheme(1).unwrap();
        assert_eq!(week1[2], SetScheme::new(0.85, 5));

        let week3 = main_week_scheme(3).unwrap();
        let reps: Vec<u32> = week3.iter().map(|s| s.reps).collect();
        assert_eq!(reps, vec![5, 3, 1]);
        assert_eq!(week3[2].percentage, 0.95);

        let deload = main_week_scheme(DELOAD_WEEK).unwrap();
        assert_eq!(deload[0], SetScheme::new(0.40, 5));
    }

    #[test]
    fn test_invalid_week_rejected() {
        for week in [0, 5, 52] {
            let err = main_week_scheme(week).unwrap_err();
            assert_eq!(err, EngineError::invalid("week", week));
        }

        let profile = TrainingProfile::new("p").with_week(7);
        assert!(EffectiveSchedule::resolve(&profile).is_err());
    }

    #[test]
    fn test_custom_percentages_and_reps_override_independently() {
        let mut profile = TrainingProfile::new("p").with_week(2);
        profile.custom_percentages.insert(2, vec![0.60, 0.70, 0.80]);
        profile.custom_reps.insert(1, vec![8, 8, 8]);

        let schedule = EffectiveSchedule::resolve(&profile).unwrap();
        assert_eq!(schedule.main_sets[0], SetScheme::new(0.60, 3));
        assert_eq!(schedule.main_sets[2], SetScheme::new(0.80, 3));

        let week1 = EffectiveSchedule::resolve_week(&profile, 1).unwrap();
        assert_eq!(week1.main_sets[0], SetScheme::new(0.65, 8));
    }

    #[test]
    fn test_partial_override_ignored() {
        let mut profile = TrainingProfile::new("p");
        profile.custom_percentages.insert(1, vec![0.5, 0.6]);
        profile.custom_reps.insert(1, Vec::new());

        let schedule = EffectiveSchedule::resolve(&profile).unwrap();
        assert_eq!(schedule.main_sets, main_week_scheme(1).unwrap());
    }

    #[test]
    fn test_warmup_override() {
        let mut profile = TrainingProfile::new("p");
        assert_eq!(
            EffectiveSchedule::resolve(&profile).unwrap().warmups,
            DEFAULT_WARMUP.to_vec()
        );

        profile.warmup_settings = Some(vec![SetScheme::new(0.3, 10), SetScheme::new(0.5, 5)]);
        let schedule = EffectiveSchedule::resolve(&profile).unwrap();
        assert_eq!(schedule.warmups.len(), 2);
        assert_eq!(schedule.warmups[0].reps, 10);

        profile.warmup_settings = Some(Vec::new());
        let schedule = EffectiveSchedule::resolve(&profile).unwrap();
        assert_eq!(schedule.warmups.len(), 3);
    }

    #[test]
    fn test_amrap_only_last_set_of_week_three() {
        let profile = TrainingProfile::new("p");
        for week in 1..=4 {
            let schedule = EffectiveSchedule::resolve_week(&profile, week).unwrap();
            for index in 0..MAIN_SET_COUNT {
                assert_eq!(schedule.is_amrap(index), week == 3 && index == 2);
            }
        }
    }

    #[test]
    fn test_default_assistance_cut_to_base_count() {
        let mut profile = TrainingProfile::new("p");
        profile.selected_program = Program::Bbb;
        let schedule = EffectiveSchedule::resolve(&profile).unwrap();
        assert_eq!(schedule.assistance_for(LiftType::Squat), ["Leg Press"]);

        profile.selected_program = Program::Monolith;
        let schedule = EffectiveSchedule::resolve(&profile).unwrap();
        assert_eq!(schedule.assistance_for(LiftType::Squat).len(), 3);

        profile.selected_program = Program::Original;
        let schedule = EffectiveSchedule::resolve(&profile).unwrap();
        assert_eq!(schedule.assistance_for(LiftType::BenchPress).len(), 2);
    }

    #[test]
    fn test_custom_assistance_never_truncated() {
        let mut profile = TrainingProfile::new("p");
        profile.selected_program = Program::Fsl;
        profile.custom_assistance.insert(
            LiftType::Deadlift,
            vec!["Kettlebell Swing".into(), "Pull-Up".into(), "Plank".into()],
        );

        let schedule = EffectiveSchedule::resolve(&profile).unwrap();
        assert_eq!(
            schedule.assistance_for(LiftType::Deadlift),
            ["Kettlebell Swing", "Pull-Up", "Plank"]
        );
        // Other lifts still use the defaults.
        assert_eq!(schedule.assistance_for(LiftType::Squat), ["Leg Press"]);
    }

    #[test]
    fn test_custom_assistance_kept_as_written() {
        let mut profile = TrainingProfile::new("p");
        profile.selected_program = Program::Monolith;
        profile
            .custom_assistance
            .insert(LiftType::Squat, vec!["Walking Lunge".into()]);
        profile.custom_assistance.insert(LiftType::BenchPress, Vec::new());

        let schedule = EffectiveSchedule::resolve(&profile).unwrap();
        assert_eq!(schedule.assistance_for(LiftType::Squat), ["Walking Lunge"]);
        // An empty list falls back to the defaults.
        assert_eq!(schedule.assistance_for(LiftType::BenchPress).len(), 3);
    }

    #[test]
    fn test_lift_order_resolution() {
        let schedule = EffectiveSchedule::resolve(&TrainingProfile::new("p")).unwrap();
        assert_eq!(schedule.lift_order, DEFAULT_LIFT_ORDER.to_vec());

        let mut profile = TrainingProfile::new("p");
        profile.lift_order = Some(vec![LiftType::Squat, LiftType::Squat, LiftType::BenchPress]);
        let schedule = EffectiveSchedule::resolve(&profile).unwrap();
        assert_eq!(
            schedule.lift_order,
            vec![
                LiftType::Squat,
                LiftType::BenchPress,
                LiftType::OverheadPress,
                LiftType::Deadlift
            ]
        );
    }
}
