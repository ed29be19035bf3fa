//! Lifter profile and its copy-on-write update functions.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::domain::{LiftType, Program, ProgressionScheme, ROOT_PROFILE_ID, Unit};
use crate::error::EngineError;
use crate::formulas::training_max_from_one_rep_max;
use crate::schedule::SetScheme;

/// Sets and reps applied uniformly to every assistance exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistanceSettings {
    pub sets: u32,
    pub reps: u32,
}

impl Default for AssistanceSettings {
    fn default() -> Self {
        Self { sets: 3, reps: 10 }
    }
}

/// A lifter's program state.
///
/// Every setting has a serde default so documents written by older versions
/// still load; missing values fall back during schedule resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingProfile {
    #[serde(default = "default_profile_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub training_maxes: HashMap<LiftType, f64>,
    #[serde(default)]
    pub one_rep_maxes: HashMap<LiftType, f64>,
    #[serde(default = "first")]
    pub current_cycle: u32,
    #[serde(default = "first")]
    pub current_week: u32,
    #[serde(default)]
    pub selected_program: Program,
    #[serde(default)]
    pub progression_scheme: ProgressionScheme,
    /// Week number -> three main-set percentages.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom_percentages: HashMap<u32, Vec<f64>>,
    /// Week number -> three main-set rep targets.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom_reps: HashMap<u32, Vec<u32>>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom_assistance: HashMap<LiftType, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistance_settings: Option<AssistanceSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warmup_settings: Option<Vec<SetScheme>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lift_order: Option<Vec<LiftType>>,
    /// Rounding increment; zero means the unit default.
    #[serde(default)]
    pub rounding: f64,
    #[serde(default)]
    pub unit: Unit,
    #[serde(default)]
    pub achievements: BTreeSet<String>,
    #[serde(default)]
    pub is_premium: bool,
}

fn default_profile_id() -> String {
    ROOT_PROFILE_ID.to_string()
}

fn first() -> u32 {
    1
}

impl Default for TrainingProfile {
    fn default() -> Self {
        Self::new(ROOT_PROFILE_ID)
    }
}

impl TrainingProfile {
    /// Creates a profile at cycle 1, week 1 with no maxes recorded.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            training_maxes: HashMap::new(),
            one_rep_maxes: HashMap::new(),
            current_cycle: 1,
            current_week: 1,
            selected_program: Program::default(),
            progression_scheme: ProgressionScheme::default(),
            custom_percentages: HashMap::new(),
            custom_reps: HashMap::new(),
            custom_assistance: HashMap::new(),
            assistance_settings: None,
            warmup_settings: None,
            lift_order: None,
            rounding: 0.0,
            unit: Unit::default(),
            achievements: BTreeSet::new(),
            is_premium: false,
        }
    }

    /// Onboards a lifter from their one-rep maxes; training maxes are seeded
    /// at 90% and rounded to the unit's increment.
    pub fn from_one_rep_maxes(
        id: impl Into<String>,
        unit: Unit,
        program: Program,
        one_rep_maxes: HashMap<LiftType, f64>,
    ) -> Self {
        let increment = unit.default_rounding();
        let training_maxes = one_rep_maxes
            .iter()
            .map(|(lift, orm)| (*lift, training_max_from_one_rep_max(*orm, increment)))
            .collect();

        Self {
            unit,
            selected_program: program,
            rounding: increment,
            training_maxes,
            one_rep_maxes,
            ..Self::new(id)
        }
    }

    /// Training max for a lift, 0 when missing.
    pub fn training_max(&self, lift: LiftType) -> f64 {
        self.training_maxes.get(&lift).copied().unwrap_or(0.0)
    }

    /// Stored one-rep max for a lift, 0 when missing.
    pub fn one_rep_max(&self, lift: LiftType) -> f64 {
        self.one_rep_maxes.get(&lift).copied().unwrap_or(0.0)
    }

    /// Rounding increment, falling back to the unit default.
    pub fn rounding_increment(&self) -> f64 {
        if self.rounding.is_finite() && self.rounding > 0.0 {
            self.rounding
        } else {
            self.unit.default_rounding()
        }
    }

    /// Checks the premium entitlement for the selected program.
    ///
    /// Callers run this before generating a workout; the generator itself
    /// never checks entitlements.
    pub fn ensure_program_access(&self) -> Result<(), EngineError> {
        if self.selected_program.requires_premium() && !self.is_premium {
            return Err(EngineError::PremiumRequired(self.selected_program));
        }
        Ok(())
    }

    /// Returns a copy with the given one-rep maxes replaced.
    pub fn with_updated_maxes(&self, maxes: &HashMap<LiftType, f64>) -> Self {
        let mut next = self.clone();
        next.one_rep_maxes
            .extend(maxes.iter().map(|(lift, value)| (*lift, *value)));
        next
    }

    /// Returns a copy with the given training maxes merged in.
    pub fn with_training_maxes(&self, maxes: &HashMap<LiftType, f64>) -> Self {
        let mut next = self.clone();
        next.training_maxes
            .extend(maxes.iter().map(|(lift, value)| (*lift, *value)));
        next
    }

    /// Returns a copy positioned at week 1 of `next_cycle`.
    pub fn with_advanced_cycle(&self, next_cycle: u32) -> Self {
        Self {
            current_cycle: next_cycle,
            current_week: 1,
            ..self.clone()
        }
    }

    pub fn with_week(&self, week: u32) -> Self {
        Self {
            current_week: week,
            ..self.clone()
        }
    }

    /// Returns a copy with the achievement ids added. Never removes any.
    pub fn with_unlocked_achievements<'a>(&self, ids: impl IntoIterator<Item = &'a String>) -> Self {
        let mut next = self.clone();
        next.achievements.extend(ids.into_iter().cloned());
        next
    }
}
